//! Telegram adapter (teloxide).
//!
//! Implements the `rcb-core` MessagingPort over the Telegram Bot API and hosts the update
//! handlers.

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InputFile, KeyboardButton, KeyboardMarkup},
    ApiError, RequestError,
};

pub mod handlers;
pub mod router;

use rcb_core::{
    domain::ChatId,
    messaging::{
        port::MessagingPort,
        types::{DocumentUpload, MessagingCapabilities, ReplyKeyboard, SendFailure},
    },
};

#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }
}

/// Reduce a teloxide error to the shape the delivery layer classifies on.
///
/// The Bot API does not surface HTTP status codes through teloxide, so gateway errors are
/// recognised by their description.
pub fn send_failure(e: RequestError) -> SendFailure {
    match e {
        RequestError::RetryAfter(d) => SendFailure::rate_limited(d.as_secs()),
        RequestError::Network(e) => SendFailure::network(e.to_string()),
        RequestError::Io(e) => SendFailure::network(e.to_string()),
        other @ RequestError::InvalidJson { .. } => SendFailure::network(other.to_string()),
        RequestError::Api(ApiError::Unknown(desc)) => match gateway_status(&desc) {
            Some(status) => SendFailure::status(status, desc),
            None => SendFailure::status(400, desc),
        },
        other => SendFailure::status(400, other.to_string()),
    }
}

fn gateway_status(description: &str) -> Option<u16> {
    [
        ("Internal Server Error", 500),
        ("Bad Gateway", 502),
        ("Service Unavailable", 503),
        ("Gateway Timeout", 504),
    ]
    .into_iter()
    .find(|(needle, _)| description.contains(needle))
    .map(|(_, status)| status)
}

fn keyboard_markup(keyboard: ReplyKeyboard) -> KeyboardMarkup {
    let rows: Vec<Vec<KeyboardButton>> = keyboard
        .rows
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect())
        .collect();
    KeyboardMarkup::new(rows)
}

#[async_trait]
impl MessagingPort for TelegramMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_documents: true,
            supports_reply_keyboards: true,
        }
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), SendFailure> {
        self.bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .await
            .map_err(send_failure)?;
        Ok(())
    }

    async fn send_menu(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: ReplyKeyboard,
    ) -> Result<(), SendFailure> {
        self.bot
            .send_message(Self::tg_chat(chat_id), text.to_string())
            .reply_markup(keyboard_markup(keyboard))
            .await
            .map_err(send_failure)?;
        Ok(())
    }

    // Telegram infers the content type from the file name; `document.content_type` is
    // informational here.
    async fn send_document(
        &self,
        chat_id: ChatId,
        document: DocumentUpload,
    ) -> Result<(), SendFailure> {
        let input = InputFile::read(document.body).file_name(document.file_name);
        self.bot
            .send_document(Self::tg_chat(chat_id), input)
            .await
            .map_err(send_failure)?;
        Ok(())
    }
}
