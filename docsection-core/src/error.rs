//! Typed error taxonomy for parse-stage boundaries.
//!
//! Internal plumbing (file IO, (de)serialization, regex compilation) keeps
//! using `anyhow::Result` the way every pipeline module does; a `ParseError`
//! is only constructed at the edges the orchestrator (C8) exposes to a
//! caller, or recorded into `metadata` without escaping (see §7 propagation
//! policy).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("input is missing, unreadable, or an unsupported type: {0}")]
    InvalidInput(String),

    #[error("page {page} yielded no extractable text")]
    NoExtractableText { page: u32 },

    #[error("OCR provider unavailable: {0}")]
    OCRUnavailable(String),

    #[error("layout classification produced contradictory peaks on page {page}")]
    LayoutAmbiguous { page: u32 },

    #[error("no sections were produced")]
    NoSections,

    #[error("section database commit failed: {0}")]
    DatabaseWriteFailed(String),

    #[error("stage '{stage}' exceeded its {limit_ms}ms timeout")]
    StageTimeout { stage: &'static str, limit_ms: u64 },

    #[error("parse was cancelled")]
    Cancelled,

    #[error("all strategies exhausted with quality below threshold and zero sections")]
    ParseFailed,
}

impl ParseError {
    /// Errors that escape to the caller per §7's propagation policy.
    /// Everything else is caught at the stage boundary, logged into
    /// `metadata`, and does not raise.
    pub fn escapes(&self) -> bool {
        matches!(
            self,
            ParseError::InvalidInput(_) | ParseError::ParseFailed | ParseError::Cancelled
        )
    }
}
