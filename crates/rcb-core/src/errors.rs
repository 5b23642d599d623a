use std::path::PathBuf;

use crate::messaging::types::SendFailure;

/// Core error type for the conversion bot.
///
/// Adapter crates map their specific errors into this type so the upload pipeline
/// can turn any failure into one user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot classify file name: {file_name}")]
    Unclassified { file_name: String },

    #[error("file name {file_name} does not match {expected}")]
    NameMismatch { file_name: String, expected: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("source sheet has no data rows")]
    EmptySource,

    #[error("no column at position {}", .index + 1)]
    MissingColumn { index: usize },

    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("delivery failed: {0}")]
    Delivery(#[from] SendFailure),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
