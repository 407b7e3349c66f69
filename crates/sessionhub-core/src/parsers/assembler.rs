//! Transcript assembler (spec.md §4.2).
//!
//! Merges object-store chunks into an ordered byte stream and parses the
//! result as JSONL. Circuit breakers (`MAX_LINE_SIZE`, `MAX_LINES`) and the
//! graceful-degradation-on-malformed-line behavior are carried over from the
//! teacher's `SessionContentParser::parse_session_lines`.

use crate::error::{AssemblyReport, CoreError, StoreError};
use crate::models::SessionLine;
use sessionhub_types::UserId;
use tracing::warn;

/// Filename prefix for agent transcript files: `agent-<id>.jsonl` (spec.md §4.2).
pub const AGENT_FILE_PREFIX: &str = "agent-";

/// Maximum line size in bytes (10MB) - OOM protection.
const MAX_LINE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum lines to parse (circuit breaker for malformed/infinite files).
const MAX_LINES: usize = 50_000;

/// A byte-range chunk as returned by the object store's `list_chunks`
/// (spec.md §4.9), ordered by `start`.
#[derive(Debug, Clone)]
pub struct ChunkRef {
    pub start: u64,
    pub end: u64,
    pub bytes: Vec<u8>,
}

/// Assembles transcript/agent files from object-store chunks
/// (spec.md §4.2 `assemble`).
pub struct TranscriptAssembler;

impl TranscriptAssembler {
    /// Extract the agent id from a filename matching `agent-<id>.jsonl`,
    /// or `None` if `filename` isn't an agent file (spec.md §4.2).
    pub fn agent_id(filename: &str) -> Option<&str> {
        filename
            .strip_prefix(AGENT_FILE_PREFIX)
            .and_then(|rest| rest.strip_suffix(".jsonl"))
    }
}

/// Sort chunks by `start`, verify the merged ranges are gap-free, and
/// concatenate bytes. Overlapping ranges resolve in favor of the
/// later-`start` chunk for the overlapping bytes (spec.md §4.2).
///
/// Returns `Ok(None)` if `chunks` is empty — a session may legitimately
/// have no transcript.
pub fn assemble_chunks(mut chunks: Vec<ChunkRef>) -> Result<Option<Vec<u8>>, CoreError> {
    if chunks.is_empty() {
        return Ok(None);
    }
    chunks.sort_by_key(|c| c.start);

    let mut out: Vec<u8> = Vec::new();
    let mut covered_up_to: Option<u64> = None;

    for chunk in chunks {
        match covered_up_to {
            None => {
                out.extend_from_slice(&chunk.bytes);
                covered_up_to = Some(chunk.end);
            }
            Some(covered) if chunk.start > covered => {
                return Err(CoreError::CorruptTranscript(format!(
                    "gap between line {covered} and {}",
                    chunk.start
                )));
            }
            Some(covered) => {
                // Overlap: this chunk's start falls within already-covered
                // range. Only the bytes past `covered` are new; the rest was
                // already appended by an earlier chunk, so trim the
                // already-covered prefix before extending. A same-range
                // re-upload trims to an empty slice, making it a no-op.
                let overlap = (covered - chunk.start + 1) as usize;
                let trim = overlap.min(chunk.bytes.len());
                out.extend_from_slice(&chunk.bytes[trim..]);
                covered_up_to = Some(chunk.end.max(covered));
            }
        }
    }

    Ok(Some(out))
}

/// Parse assembled bytes as JSONL. Malformed lines are counted in the
/// returned `AssemblyReport` but do not abort parsing (spec.md §4.2).
pub fn parse_transcript_lines(bytes: &[u8]) -> (Vec<SessionLine>, AssemblyReport) {
    let mut report = AssemblyReport::new();
    let mut lines = Vec::new();
    let text = String::from_utf8_lossy(bytes);

    for (idx, raw_line) in text.lines().enumerate() {
        let line_num = idx + 1;
        if line_num > MAX_LINES {
            warn!(line_num, "transcript exceeds MAX_LINES, stopping parse");
            report.add_warning(line_num, format!("truncated after {MAX_LINES} lines"));
            break;
        }
        if raw_line.len() > MAX_LINE_SIZE {
            warn!(line_num, size = raw_line.len(), "skipping oversized line");
            report.add_warning(line_num, "line exceeds MAX_LINE_SIZE, skipped");
            continue;
        }
        if raw_line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SessionLine>(raw_line) {
            Ok(line) => lines.push(line),
            Err(e) => {
                warn!(line_num, error = %e, "failed to parse transcript line, skipping");
                report.add_warning(line_num, format!("malformed json: {e}"));
            }
        }
    }

    (lines, report)
}

/// Build the object-store key prefix for a user's session files
/// (spec.md §3 "Chunk", §4.9).
pub fn chunk_prefix(user: UserId, external_id: &str, filename: &str) -> String {
    format!("u/{user}/s/{external_id}/{filename}/")
}

/// Returns a [`StoreError`] for a chunk key whose `<start>-<end>` suffix
/// cannot be parsed as two integers (spec.md §4.9 "Keys embed numeric start
/// and end line indices").
pub fn parse_chunk_range(key: &str) -> Result<(u64, u64), StoreError> {
    let range = key
        .rsplit('/')
        .next()
        .ok_or_else(|| StoreError::MalformedChunkKey { key: key.to_string() })?;
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| StoreError::MalformedChunkKey { key: key.to_string() })?;
    let start: u64 = start
        .parse()
        .map_err(|_| StoreError::MalformedChunkKey { key: key.to_string() })?;
    let end: u64 = end
        .parse()
        .map_err(|_| StoreError::MalformedChunkKey { key: key.to_string() })?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_chunks_empty_returns_none() {
        assert!(assemble_chunks(vec![]).unwrap().is_none());
    }

    #[test]
    fn assemble_chunks_concatenates_in_start_order() {
        let chunks = vec![
            ChunkRef { start: 50, end: 99, bytes: b"second".to_vec() },
            ChunkRef { start: 0, end: 49, bytes: b"first".to_vec() },
        ];
        let out = assemble_chunks(chunks).unwrap().unwrap();
        assert_eq!(out, b"firstsecond");
    }

    #[test]
    fn assemble_chunks_trims_overlap_to_non_covered_suffix() {
        let chunks = vec![
            ChunkRef { start: 0, end: 9, bytes: b"0123456789".to_vec() },
            ChunkRef { start: 5, end: 14, bytes: b"56789ABCDE".to_vec() },
        ];
        let out = assemble_chunks(chunks).unwrap().unwrap();
        assert_eq!(out, b"0123456789ABCDE");
    }

    #[test]
    fn assemble_chunks_same_range_reupload_is_idempotent() {
        let chunks = vec![
            ChunkRef { start: 0, end: 9, bytes: b"0123456789".to_vec() },
            ChunkRef { start: 0, end: 9, bytes: b"0123456789".to_vec() },
        ];
        let out = assemble_chunks(chunks).unwrap().unwrap();
        assert_eq!(out, b"0123456789");
    }

    #[test]
    fn assemble_chunks_detects_gap() {
        let chunks = vec![
            ChunkRef { start: 0, end: 10, bytes: b"a".to_vec() },
            ChunkRef { start: 20, end: 30, bytes: b"b".to_vec() },
        ];
        let err = assemble_chunks(chunks).unwrap_err();
        assert!(matches!(err, CoreError::CorruptTranscript(_)));
    }

    #[test]
    fn agent_id_extracts_identifier_from_filename() {
        assert_eq!(TranscriptAssembler::agent_id("agent-abc123.jsonl"), Some("abc123"));
        assert_eq!(TranscriptAssembler::agent_id("transcript.jsonl"), None);
    }

    #[test]
    fn parse_transcript_lines_skips_malformed_but_counts_them() {
        let bytes = b"{\"type\":\"user\"}\nnot json\n{\"type\":\"assistant\"}\n";
        let (lines, report) = parse_transcript_lines(bytes);
        assert_eq!(lines.len(), 2);
        assert_eq!(report.validation_error_count(), 1);
    }

    #[test]
    fn parse_chunk_range_reads_numeric_start_and_end() {
        let (start, end) = parse_chunk_range("u/abc/s/ext/transcript.jsonl/100-199").unwrap();
        assert_eq!((start, end), (100, 199));
    }

    #[test]
    fn parse_chunk_range_rejects_non_numeric_suffix() {
        assert!(parse_chunk_range("u/abc/s/ext/transcript.jsonl/bad").is_err());
    }
}
