use std::path::Path;

/// Reply keyboard shown under the input field (one button per row).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplyKeyboard {
    pub rows: Vec<Vec<String>>,
}

impl ReplyKeyboard {
    pub fn one_per_row(labels: &[&str]) -> Self {
        Self {
            rows: labels.iter().map(|l| vec![l.to_string()]).collect(),
        }
    }
}

/// Outgoing attachment.
///
/// `body` is opened by the caller for exactly one send attempt and is dropped with it.
#[derive(Debug)]
pub struct DocumentUpload {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: tokio::fs::File,
}

/// Content type inferred from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("csv") => "text/csv",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Failure signal of an outbound messenger call.
///
/// Only the shape matters to the core: an optional status code, an optional
/// server-provided retry-after hint and whether the failure happened on the wire.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SendFailure {
    pub status: Option<u16>,
    pub retry_after: Option<u64>,
    pub network: bool,
    pub message: String,
}

impl SendFailure {
    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            status: Some(429),
            retry_after: Some(retry_after),
            network: false,
            message: format!("too many requests, retry after {retry_after}s"),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            status: None,
            retry_after: None,
            network: true,
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            retry_after: None,
            network: false,
            message: message.into(),
        }
    }
}

/// Capabilities / feature flags of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    pub supports_documents: bool,
    pub supports_reply_keyboards: bool,
}
