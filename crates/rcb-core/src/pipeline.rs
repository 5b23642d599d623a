//! Per-upload pipeline: decode, build extracts, write them, send them back.
//!
//! Every failure ends here and is turned into a single user-facing message for the
//! upload's category.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    classify::Classification,
    config::Config,
    delivery::{self, RetryPolicy},
    domain::{Category, ChatId, UserId},
    errors::Error,
    extract::{self, Artifact, ExtractSpec},
    messaging::port::MessagingPort,
    utils::{AuditEvent, AuditLogger},
    writer, Result,
};

/// Only uploads with this suffix are accepted.
pub const SOURCE_SUFFIX: &str = ".xlsx";

/// Explicit per-process context handed to every upload.
#[derive(Clone)]
pub struct PipelineContext {
    pub output_dir: PathBuf,
    pub retry: RetryPolicy,
    pub messenger: Arc<dyn MessagingPort>,
    pub audit: Arc<AuditLogger>,
}

impl PipelineContext {
    pub fn from_config(
        cfg: &Config,
        messenger: Arc<dyn MessagingPort>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            output_dir: cfg.output_dir.clone(),
            retry: cfg.retry_policy(),
            messenger,
            audit,
        }
    }
}

/// An upload already saved to the input directory.
#[derive(Clone, Debug)]
pub struct Upload {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub username: String,
    pub file_name: String,
    pub path: PathBuf,
}

pub fn is_source_file(file_name: &str) -> bool {
    file_name.ends_with(SOURCE_SUFFIX)
}

pub fn summary_message(category: Category) -> &'static str {
    match category {
        Category::Casino => "✅ Done! Here are your files.",
        Category::Aviator => "✅ Done! Here are your aviator files.",
        Category::Sport => "✅ Done! Here are your sport files.",
    }
}

/// User-facing text for a failed upload.
pub fn failure_message(category: Option<Category>, err: &Error) -> String {
    match (err, category) {
        (Error::Unclassified { .. }, _) => "❌ Could not determine the file type.\n\n\
             The name must contain Casino, Aviator or Sport."
            .to_string(),
        (Error::NameMismatch { .. }, _) => "❌ The file name does not match the expected format \
             (Linear_Retention_<step>_Sport)."
            .to_string(),
        (Error::EmptySource, Some(Category::Casino)) => "⚠️ No data to process.".to_string(),
        (Error::EmptySource, _) => "⚠️ The file is empty or contains no data.".to_string(),
        (Error::Decode(_), _) => {
            "❌ The file is empty or is not a readable .xlsx spreadsheet.".to_string()
        }
        (Error::MissingColumn { index }, _) => {
            format!("❌ The file has no column {}.", index + 1)
        }
        (_, Some(c)) => format!("❌ Error while processing the {} file.", c.label()),
        (_, None) => "❌ Error while processing the file.".to_string(),
    }
}

/// Process one classified upload end to end. Never fails: errors are logged, audited and
/// reported to the chat.
pub async fn run(ctx: &PipelineContext, upload: &Upload, classification: Classification) {
    let category = classification.category;
    tracing::info!(
        file = %upload.file_name,
        category = %category,
        step = %classification.step,
        "processing upload"
    );

    match process(ctx, upload, classification).await {
        Ok(paths) => {
            let names: Vec<String> = paths
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
                .collect();
            tracing::info!(file = %upload.file_name, artifacts = names.len(), "upload done");
            ctx.audit.record(AuditEvent::upload(
                upload.user_id.0,
                &upload.username,
                &upload.file_name,
                category.label(),
                &names,
            ));
        }
        Err(e) => report_failure(ctx, upload, Some(category), &e).await,
    }
}

/// Log, audit and tell the user about a failure.
///
/// A sheet without data is an expected outcome: it is audited as an upload that produced
/// nothing rather than as an error.
pub async fn report_failure(
    ctx: &PipelineContext,
    upload: &Upload,
    category: Option<Category>,
    err: &Error,
) {
    match (err, category) {
        (Error::EmptySource, Some(category)) => {
            tracing::info!(file = %upload.file_name, "upload has no data");
            ctx.audit.record(AuditEvent::upload(
                upload.user_id.0,
                &upload.username,
                &upload.file_name,
                category.label(),
                &[],
            ));
        }
        _ => {
            tracing::error!(file = %upload.file_name, error = %err, "upload failed");
            ctx.audit.record(AuditEvent::error(
                upload.user_id.0,
                &upload.username,
                &err.to_string(),
                Some(upload.file_name.as_str()),
            ));
        }
    }
    if let Err(e) = ctx
        .messenger
        .send_text(upload.chat_id, &failure_message(category, err))
        .await
    {
        tracing::warn!(error = %e, "failed to send failure message");
    }
}

async fn process(
    ctx: &PipelineContext,
    upload: &Upload,
    classification: Classification,
) -> Result<Vec<PathBuf>> {
    let category = classification.category;
    let spec = ExtractSpec::today(classification);

    let path = upload.path.clone();
    let artifacts = tokio::task::spawn_blocking(move || extract::build_from_file(&spec, &path))
        .await
        .map_err(|e| Error::External(format!("extract task failed: {e}")))??;

    if artifacts.is_empty() {
        return Err(Error::EmptySource);
    }

    publish(ctx, upload, category, artifacts).await
}

/// Write `artifacts` to the output directory and deliver them.
///
/// Artifacts that were written are delivered even when a sibling failed to write; the
/// first write failure is then returned instead of sending the summary.
pub async fn publish(
    ctx: &PipelineContext,
    upload: &Upload,
    category: Category,
    artifacts: Vec<Artifact>,
) -> Result<Vec<PathBuf>> {
    if !ctx.messenger.capabilities().supports_documents {
        return Err(Error::External(
            "messenger cannot send documents".to_string(),
        ));
    }

    let dir = ctx.output_dir.clone();
    let report = tokio::task::spawn_blocking(move || writer::write_all(&dir, &artifacts))
        .await
        .map_err(|e| Error::External(format!("write task failed: {e}")))?;

    for e in &report.failed {
        ctx.audit.record(AuditEvent::error(
            upload.user_id.0,
            &upload.username,
            &e.to_string(),
            Some("artifact write"),
        ));
    }

    let chat_id = upload.chat_id;
    let messenger = ctx.messenger.as_ref();
    if let Some(first) = report.failed.into_iter().next() {
        for path in &report.written {
            delivery::send_with_retry(messenger, chat_id, path, ctx.retry).await?;
        }
        return Err(first);
    }

    delivery::deliver_all(
        messenger,
        chat_id,
        &report.written,
        summary_message(category),
        ctx.retry,
    )
    .await?;
    Ok(report.written)
}

/// Where an upload named `file_name` is stored inside `input_dir`.
pub fn upload_path(input_dir: &Path, file_name: &str) -> PathBuf {
    input_dir.join(sanitize_filename(file_name))
}

fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.trim_matches('.').is_empty() {
        "upload.xlsx".to_string()
    } else {
        out
    }
}
