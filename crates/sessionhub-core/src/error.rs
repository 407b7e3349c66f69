//! Error types for sessionhub-core
//!
//! Provides a typed error hierarchy with thiserror (spec.md §7 "Error
//! taxonomy"): a structured `CoreError` enum for collaborators, with
//! free-form `anyhow` reserved for the bin crate's edge.

use thiserror::Error;

/// Core error type returned by pipeline collaborators.
///
/// Variants map directly onto spec.md §7's error taxonomy kinds; the
/// endpoint (in `sessionhub-web`) is the only place that knows how to turn
/// these into HTTP status codes.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("session not found: {0}")]
    NotFound(String),

    #[error("session owner is inactive")]
    OwnerInactive,

    #[error("no access")]
    NoAccess,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("transcript is corrupt: {0}")]
    CorruptTranscript(String),

    #[error("generation lock held by another request")]
    LockConflict,

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Errors raised by the metadata store / object store adapters
/// (spec.md §4.8, §4.9).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("object store transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("object store returned status {status} for {key}")]
    ObjectStoreStatus { key: String, status: u16 },

    #[error("object key has malformed line range: {key}")]
    MalformedChunkKey { key: String },
}

/// Errors raised by the LLM client (spec.md §4.6).
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse model response: {0}")]
    Parse(String),

    #[error("upstream model error: {0}")]
    Upstream(String),
}

/// Severity of a non-fatal error encountered while assembling a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Warning,
    Error,
}

/// A single non-fatal problem recorded while assembling/parsing a transcript.
#[derive(Debug, Clone)]
pub struct AssemblyIssue {
    pub line_number: usize,
    pub message: String,
    pub severity: ErrorSeverity,
}

/// Report of non-fatal issues found while assembling + parsing a transcript
/// (spec.md §4.2 "malformed lines are counted as validation errors but do
/// not abort", §4.3 "validation_error_count").
///
/// A graceful-degradation pattern: collaborators append issues instead of
/// failing, and the endpoint decides whether the count is worth surfacing.
#[derive(Debug, Clone, Default)]
pub struct AssemblyReport {
    pub issues: Vec<AssemblyIssue>,
}

impl AssemblyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, line_number: usize, message: impl Into<String>) {
        self.issues.push(AssemblyIssue {
            line_number,
            message: message.into(),
            severity: ErrorSeverity::Warning,
        });
    }

    pub fn validation_error_count(&self) -> u64 {
        self.issues.len() as u64
    }

    pub fn merge(&mut self, other: AssemblyReport) {
        self.issues.extend(other.issues);
    }
}
