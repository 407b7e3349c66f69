//! Domain and event models.

pub mod domain;
pub mod event_log;

pub use domain::{ChunkKey, FileType, QuotaRow, Recipient, Session, Share, SyncFile};
pub use event_log::{
    extract_tool_result_blocks, extract_tool_use_blocks, CompactMetadata, SessionLine,
    SessionMessage, TokenUsage, ToolResultBlock, ToolUseBlock,
};
