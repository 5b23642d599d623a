use std::{path::Path, sync::Arc};

use teloxide::{net::Download, prelude::*};

use rcb_core::{
    classify::classify,
    domain::{ChatId, UserId},
    errors::Error,
    pipeline::{self, Upload},
};

use crate::router::AppState;

async fn download_document(bot: &Bot, file_id: &str, dst_path: &Path) -> anyhow::Result<()> {
    let file = bot.get_file(file_id.to_string()).await?;
    if let Some(dir) = dst_path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut dst = tokio::fs::File::create(dst_path).await?;
    bot.download_file(&file.path, &mut dst).await?;
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{} KB", bytes.div_ceil(1024))
    }
}

pub async fn handle_document(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(doc) = msg.document() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);
    let (user_id, username) = msg
        .from()
        .map(|u| {
            (
                u.id.0 as i64,
                u.username.clone().unwrap_or_else(|| "unknown".to_string()),
            )
        })
        .unwrap_or((0, "unknown".to_string()));

    let file_name = doc.file_name.clone().unwrap_or_default();
    let size = u64::from(doc.file.size);
    tracing::info!(chat_id = chat_id.0, user_id, file = %file_name, size, "file received");

    let reply = |text: String| {
        let messenger = state.messenger.clone();
        async move {
            if let Err(e) = messenger.send_text(chat_id, &text).await {
                tracing::warn!(chat_id = chat_id.0, error = %e, "failed to reply");
            }
        }
    };

    if !pipeline::is_source_file(&file_name) {
        reply("❌ Please send an .xlsx file.".to_string()).await;
        return Ok(());
    }
    if size > state.cfg.max_file_size {
        reply(format!(
            "❌ File too large ({}). The limit is {}.",
            format_size(size),
            format_size(state.cfg.max_file_size)
        ))
        .await;
        return Ok(());
    }

    let upload = Upload {
        chat_id,
        user_id: UserId(user_id),
        username,
        path: pipeline::upload_path(&state.cfg.input_dir, &file_name),
        file_name,
    };

    // Reject by name before spending a download on it.
    let classification = match classify(&upload.file_name) {
        Ok(c) => c,
        Err(e) => {
            pipeline::report_failure(&state.pipeline, &upload, None, &e).await;
            return Ok(());
        }
    };

    if let Err(e) = download_document(&bot, &doc.file.id, &upload.path).await {
        let err = Error::External(format!("download failed: {e}"));
        pipeline::report_failure(&state.pipeline, &upload, Some(classification.category), &err)
            .await;
        return Ok(());
    }

    reply("📥 File received. Processing...".to_string()).await;
    pipeline::run(&state.pipeline, &upload, classification).await;
    Ok(())
}
