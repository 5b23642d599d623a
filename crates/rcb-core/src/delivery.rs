//! Sequential artifact delivery with retry on rate limits and transient failures.

use std::{path::Path, time::Duration};

use tokio::time::sleep;

use crate::{
    domain::ChatId,
    errors::Error,
    messaging::{
        port::MessagingPort,
        types::{content_type_for, DocumentUpload, SendFailure},
    },
    Result,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff for transient failures: base, 2x base, 4x base, ... capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// How a failed send should be handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryClass {
    /// The server asked us to wait this long.
    RateLimited(Duration),
    Transient,
    Permanent,
}

pub fn classify_failure(failure: &SendFailure) -> RetryClass {
    match (failure.status, failure.retry_after) {
        (Some(429), Some(secs)) => RetryClass::RateLimited(Duration::from_secs(secs + 1)),
        (Some(status), _) if status >= 500 => RetryClass::Transient,
        _ if failure.network => RetryClass::Transient,
        _ => RetryClass::Permanent,
    }
}

/// Send one file, opening it afresh for every attempt.
pub async fn send_with_retry(
    messenger: &dyn MessagingPort,
    chat_id: ChatId,
    path: &Path,
    policy: RetryPolicy,
) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let content_type = content_type_for(path);

    let mut attempt = 0u32;
    loop {
        attempt += 1;

        // Dropped at the end of this iteration whatever the outcome.
        let body = tokio::fs::File::open(path).await?;
        let upload = DocumentUpload {
            file_name: file_name.clone(),
            content_type,
            body,
        };

        let failure = match messenger.send_document(chat_id, upload).await {
            Ok(()) => {
                tracing::debug!(file = %file_name, attempt, "document delivered");
                return Ok(());
            }
            Err(f) => f,
        };

        let wait = match classify_failure(&failure) {
            RetryClass::Permanent => {
                tracing::warn!(file = %file_name, error = %failure, "document rejected");
                return Err(Error::Delivery(failure));
            }
            _ if attempt >= policy.max_attempts => {
                tracing::warn!(file = %file_name, attempt, error = %failure, "giving up on document");
                return Err(Error::Delivery(failure));
            }
            RetryClass::RateLimited(wait) => wait,
            RetryClass::Transient => policy.backoff(attempt),
        };

        tracing::info!(
            file = %file_name,
            attempt,
            wait_ms = wait.as_millis() as u64,
            error = %failure,
            "retrying document"
        );
        sleep(wait).await;
    }
}

/// Deliver `paths` one after another, then `summary`.
///
/// Stops at the first artifact that cannot be delivered; anything already sent stays sent.
pub async fn deliver_all(
    messenger: &dyn MessagingPort,
    chat_id: ChatId,
    paths: &[impl AsRef<Path>],
    summary: &str,
    policy: RetryPolicy,
) -> Result<()> {
    for path in paths {
        send_with_retry(messenger, chat_id, path.as_ref(), policy).await?;
    }
    messenger.send_text(chat_id, summary).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMessenger;
    use tokio::time::Instant;

    fn csv_file(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
        let p = dir.join(name);
        std::fs::write(&p, body).unwrap();
        p
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy::default();
        let secs: Vec<u64> = (1..=7).map(|a| p.backoff(a).as_secs()).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 16, 30, 30]);
        assert_eq!(p.backoff(40), Duration::from_secs(30));
    }

    #[test]
    fn failures_are_classified() {
        assert_eq!(
            classify_failure(&SendFailure::rate_limited(2)),
            RetryClass::RateLimited(Duration::from_secs(3))
        );
        assert_eq!(
            classify_failure(&SendFailure::status(502, "bad gateway")),
            RetryClass::Transient
        );
        assert_eq!(
            classify_failure(&SendFailure::network("connection reset")),
            RetryClass::Transient
        );
        assert_eq!(
            classify_failure(&SendFailure::status(400, "bad request")),
            RetryClass::Permanent
        );
        // 429 without a hint is not something we know how to wait for.
        assert_eq!(
            classify_failure(&SendFailure::status(429, "slow down")),
            RetryClass::Permanent
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_retry_after_plus_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), "a_crm.csv", "user_id\n1\n");
        let m = RecordingMessenger::default();
        m.fail_documents(vec![SendFailure::rate_limited(2)]);

        let start = Instant::now();
        send_with_retry(&m, ChatId(1), &path, RetryPolicy::default())
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert_eq!(m.document_attempts(), 2);
        assert_eq!(m.documents(), vec![("a_crm.csv".to_string(), "user_id\n1\n".to_string())]);
        assert_eq!(m.content_types(), vec!["text/csv", "text/csv"]);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_back_off_exponentially() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), "b.csv", "user_id\n");
        let m = RecordingMessenger::default();
        m.fail_documents(vec![
            SendFailure::network("timeout"),
            SendFailure::status(503, "unavailable"),
        ]);

        let start = Instant::now();
        send_with_retry(&m, ChatId(1), &path, RetryPolicy::default())
            .await
            .unwrap();
        // 1s + 2s
        assert!(start.elapsed() >= Duration::from_secs(3));
        assert!(start.elapsed() < Duration::from_secs(4));
        assert_eq!(m.document_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), "c.csv", "user_id\n");
        let m = RecordingMessenger::default();
        m.fail_documents(vec![SendFailure::status(400, "bad request")]);

        let err = send_with_retry(&m, ChatId(1), &path, RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Delivery(f) if f.status == Some(400)));
        assert_eq!(m.document_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let path = csv_file(dir.path(), "d.csv", "user_id\n");
        let m = RecordingMessenger::default();
        m.fail_documents((0..10).map(|_| SendFailure::network("reset")).collect());

        let err = send_with_retry(&m, ChatId(1), &path, RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Delivery(f) if f.network));
        assert_eq!(m.document_attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_file_fails_without_sending() {
        let dir = tempfile::tempdir().unwrap();
        let m = RecordingMessenger::default();
        let err = send_with_retry(&m, ChatId(1), &dir.path().join("gone.csv"), RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(m.document_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_in_order_then_summary() {
        let dir = tempfile::tempdir().unwrap();
        let a = csv_file(dir.path(), "1.csv", "a\n");
        let b = csv_file(dir.path(), "2.csv", "b\n");
        let m = RecordingMessenger::default();

        deliver_all(&m, ChatId(9), &[a, b], "done", RetryPolicy::default())
            .await
            .unwrap();
        let names: Vec<String> = m.documents().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["1.csv", "2.csv"]);
        assert_eq!(m.texts(), vec!["done"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_artifact_stops_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let a = csv_file(dir.path(), "1.csv", "a\n");
        let b = csv_file(dir.path(), "2.csv", "b\n");
        let m = RecordingMessenger::default();
        m.fail_documents(vec![SendFailure::status(403, "forbidden")]);

        assert!(deliver_all(&m, ChatId(9), &[a, b], "done", RetryPolicy::default())
            .await
            .is_err());
        assert!(m.documents().is_empty());
        assert!(m.texts().is_empty());
    }
}
