//! Transcript assembly and JSONL parsing (spec.md §4.2).

pub mod assembler;

pub use assembler::{
    assemble_chunks, parse_transcript_lines, TranscriptAssembler, AGENT_FILE_PREFIX,
};
