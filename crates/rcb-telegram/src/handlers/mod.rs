//! Telegram update handlers.
//!
//! Every message passes the allow-list first. Commands and menu buttons answer directly;
//! documents run the conversion pipeline under a per-chat lock.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use rcb_core::{domain::ChatId, utils::AuditEvent};

use crate::router::AppState;
mod commands;
mod document;

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = ChatId(msg.chat.id.0);
    let user = msg.from();
    let user_id = user.map(|u| u.id.0 as i64);

    if !state.cfg.is_user_allowed(user_id) {
        let username = user
            .and_then(|u| u.username.clone())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::warn!(chat_id = chat_id.0, user_id = ?user_id, "unauthorized user");
        state
            .audit
            .record(AuditEvent::auth(user_id.unwrap_or(0), &username, false));
        if let Err(e) = state
            .messenger
            .send_text(
                chat_id,
                "⛔ Unauthorized. Contact the bot owner for access.",
            )
            .await
        {
            tracing::warn!(error = %e, "failed to send refusal");
        }
        return Ok(());
    }

    if msg.document().is_some() {
        let _guard = state.chat_locks.lock_chat(chat_id.0).await;
        return document::handle_document(bot, msg, state).await;
    }

    let Some(text) = msg.text() else {
        return Ok(());
    };

    if text.starts_with('/') {
        return commands::handle_command(msg, state).await;
    }

    if let Some(category) = commands::button_category(text) {
        commands::handle_button(chat_id, category, state).await;
        return Ok(());
    }

    if let Err(e) = state
        .messenger
        .send_text(chat_id, "Send an .xlsx file or use /help.")
        .await
    {
        tracing::warn!(error = %e, "failed to send hint");
    }
    Ok(())
}
