use std::{collections::HashMap, sync::Arc};

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::{Mutex, OwnedMutexGuard};

use rcb_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use rcb_core::{
    config::Config, messaging::port::MessagingPort, pipeline::PipelineContext, utils::AuditLogger,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub messenger: Arc<dyn MessagingPort>,
    pub pipeline: PipelineContext,
    pub chat_locks: Arc<ChatLocks>,
    pub audit: Arc<AuditLogger>,
}

impl AppState {
    pub fn new(cfg: Arc<Config>, messenger: Arc<dyn MessagingPort>) -> Self {
        let audit = Arc::new(AuditLogger::new(
            cfg.audit_log_path.clone(),
            cfg.audit_log_json,
        ));
        let pipeline = PipelineContext::from_config(&cfg, messenger.clone(), audit.clone());
        Self {
            cfg,
            messenger,
            pipeline,
            chat_locks: Arc::new(ChatLocks::default()),
            audit,
        }
    }
}

/// One upload at a time per chat; different chats proceed independently.
#[derive(Default)]
pub struct ChatLocks {
    inner: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl ChatLocks {
    pub async fn lock_chat(&self, chat_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(chat_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

pub async fn run_polling(cfg: Arc<Config>) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    match bot.get_me().await {
        Ok(me) => tracing::info!(bot = %me.username(), "bot started"),
        Err(e) => tracing::warn!(error = %e, "get_me failed"),
    }
    tracing::info!(
        input_dir = %cfg.input_dir.display(),
        output_dir = %cfg.output_dir.display(),
        allowed_users = cfg.telegram_allowed_users.len(),
        "ready"
    );
    if cfg.telegram_allowed_users.is_empty() {
        tracing::warn!("TELEGRAM_ALLOWED_USERS is empty; every user is allowed");
    }

    // Space outbound calls so a large batch of documents does not trip flood control.
    // Delivery still retries the 429s that get through.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let state = Arc::new(AppState::new(cfg, messenger));

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    tracing::info!("dispatcher stopped");
    Ok(())
}
