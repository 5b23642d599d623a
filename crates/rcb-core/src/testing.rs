//! In-memory messenger and workbook fixtures used by unit tests.

use std::{collections::VecDeque, path::Path, sync::Mutex};

use async_trait::async_trait;
use rust_xlsxwriter::Workbook;
use tokio::io::AsyncReadExt;

use crate::{
    domain::ChatId,
    messaging::{
        port::MessagingPort,
        types::{DocumentUpload, MessagingCapabilities, ReplyKeyboard, SendFailure},
    },
};

#[derive(Default)]
pub struct RecordingMessenger {
    texts: Mutex<Vec<String>>,
    documents: Mutex<Vec<(String, String)>>,
    content_types: Mutex<Vec<&'static str>>,
    document_failures: Mutex<VecDeque<SendFailure>>,
}

impl RecordingMessenger {
    /// Queue failures returned by the next `send_document` calls, in order.
    pub fn fail_documents(&self, failures: Vec<SendFailure>) {
        self.document_failures.lock().unwrap().extend(failures);
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    /// Successfully delivered documents as `(file name, content)`.
    pub fn documents(&self) -> Vec<(String, String)> {
        self.documents.lock().unwrap().clone()
    }

    /// Content type of every attempt, failed ones included.
    pub fn content_types(&self) -> Vec<&'static str> {
        self.content_types.lock().unwrap().clone()
    }

    pub fn document_attempts(&self) -> usize {
        self.content_types.lock().unwrap().len()
    }
}

#[async_trait]
impl MessagingPort for RecordingMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            supports_documents: true,
            supports_reply_keyboards: true,
        }
    }

    async fn send_text(&self, _chat_id: ChatId, text: &str) -> Result<(), SendFailure> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_menu(
        &self,
        _chat_id: ChatId,
        text: &str,
        _keyboard: ReplyKeyboard,
    ) -> Result<(), SendFailure> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_document(
        &self,
        _chat_id: ChatId,
        mut document: DocumentUpload,
    ) -> Result<(), SendFailure> {
        self.content_types
            .lock()
            .unwrap()
            .push(document.content_type);

        let failure = self.document_failures.lock().unwrap().pop_front();
        if let Some(f) = failure {
            return Err(f);
        }

        let mut body = String::new();
        document
            .body
            .read_to_string(&mut body)
            .await
            .map_err(|e| SendFailure::network(e.to_string()))?;
        self.documents
            .lock()
            .unwrap()
            .push((document.file_name, body));
        Ok(())
    }
}

/// Write `rows` to the first sheet of a new workbook, starting at column `first_col`.
///
/// Values that parse as numbers are stored as numbers; empty strings stay blank.
pub fn write_workbook(path: &Path, first_col: u16, rows: &[&[&str]]) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let (r, c) = (r as u32, first_col + c as u16);
            match value.parse::<f64>() {
                Ok(n) => sheet.write_number(r, c, n).unwrap(),
                Err(_) => sheet.write_string(r, c, *value).unwrap(),
            };
        }
    }
    workbook.save(path).unwrap();
}
