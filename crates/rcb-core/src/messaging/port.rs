use async_trait::async_trait;

use crate::{
    domain::ChatId,
    messaging::types::{DocumentUpload, MessagingCapabilities, ReplyKeyboard, SendFailure},
};

/// Cross-messenger port.
///
/// Telegram is the only implementation today. Calls report failures as [`SendFailure`] so the
/// delivery layer can decide whether to retry.
#[async_trait]
pub trait MessagingPort: Send + Sync {
    fn capabilities(&self) -> MessagingCapabilities;

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), SendFailure>;

    async fn send_menu(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: ReplyKeyboard,
    ) -> Result<(), SendFailure>;

    async fn send_document(
        &self,
        chat_id: ChatId,
        document: DocumentUpload,
    ) -> Result<(), SendFailure>;
}
