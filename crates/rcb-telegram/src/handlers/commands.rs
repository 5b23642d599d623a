use std::sync::Arc;

use rcb_core::{
    domain::{Category, ChatId},
    messaging::types::ReplyKeyboard,
};
use teloxide::prelude::*;

use crate::router::AppState;

pub const CASINO_BUTTON: &str = "🎰 Casino files";
pub const AVIATOR_BUTTON: &str = "✈️ Aviator files";
pub const SPORT_BUTTON: &str = "⚽ Sport files";

const HELP_TEXT: &str = "📋 How it works\n\n\
Send an .xlsx export and you get the CRM CSV files back.\n\
The file name decides how it is processed:\n\n\
🎰 Casino: the name contains \"Casino\". One CSV per value of column I.\n\
   e.g. Linear_Retention_2_Casino.xlsx\n\
✈️ Aviator: the name contains \"Aviator\". A user list plus a bet amount file.\n\
   e.g. Aviator_3.xlsx\n\
⚽ Sport: the name must look like Linear_Retention_<N>_Sport.\n\
   Step 1 gives one sorted user list, other steps one CSV per value of column J.\n\n\
/start - Show the menu\n\
/help - Show this message";

/// Lowercased command name; Telegram may send `/cmd@botname ...`. Arguments are ignored.
pub(crate) fn parse_command(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or("")
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

pub(crate) fn main_menu() -> ReplyKeyboard {
    ReplyKeyboard::one_per_row(&[CASINO_BUTTON, AVIATOR_BUTTON, SPORT_BUTTON])
}

/// Category selected by a menu button press.
pub(crate) fn button_category(text: &str) -> Option<Category> {
    match text.trim() {
        CASINO_BUTTON => Some(Category::Casino),
        AVIATOR_BUTTON => Some(Category::Aviator),
        SPORT_BUTTON => Some(Category::Sport),
        _ => None,
    }
}

pub(crate) fn upload_instruction(category: Category) -> &'static str {
    match category {
        Category::Casino => {
            "📤 Send the casino .xlsx file.\n\
             The name must contain \"Casino\", e.g. Linear_Retention_2_Casino.xlsx"
        }
        Category::Aviator => {
            "📤 Send the aviator .xlsx file.\n\
             The name must contain \"Aviator\", e.g. Aviator_3.xlsx"
        }
        Category::Sport => {
            "📤 Send the sport .xlsx file.\n\
             The name must look like Linear_Retention_<N>_Sport.xlsx"
        }
    }
}

pub async fn handle_command(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let chat_id = ChatId(msg.chat.id.0);
    let cmd = parse_command(text);
    tracing::debug!(chat_id = chat_id.0, command = %cmd, "command");

    let sent = match cmd.as_str() {
        "start" => {
            let name = msg
                .from()
                .map(|u| u.first_name.clone())
                .unwrap_or_else(|| "there".to_string());
            let greeting = format!(
                "👋 Hi, {name}!\n\nPick a file type below or just send an .xlsx file. /help explains the naming rules."
            );
            if state.messenger.capabilities().supports_reply_keyboards {
                state.messenger.send_menu(chat_id, &greeting, main_menu()).await
            } else {
                state.messenger.send_text(chat_id, &greeting).await
            }
        }
        "help" => state.messenger.send_text(chat_id, HELP_TEXT).await,
        _ => {
            state
                .messenger
                .send_text(chat_id, "Unknown command. Try /help.")
                .await
        }
    };

    if let Err(e) = sent {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to answer command");
    }
    Ok(())
}

pub async fn handle_button(chat_id: ChatId, category: Category, state: Arc<AppState>) {
    if let Err(e) = state
        .messenger
        .send_text(chat_id, upload_instruction(category))
        .await
    {
        tracing::warn!(chat_id = chat_id.0, error = %e, "failed to send upload instruction");
    }
}
