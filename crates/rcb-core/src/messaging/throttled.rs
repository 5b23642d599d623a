use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::ChatId,
    messaging::{
        port::MessagingPort,
        types::{DocumentUpload, MessagingCapabilities, ReplyKeyboard, SendFailure},
    },
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* Telegram API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between calls per chat (Telegram 1 msg/sec style limits).
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// MessagingPort decorator that spaces outbound calls.
///
/// Best-effort defense against Telegram 429s when a single upload fans out into many
/// documents. The delivery layer still handles the 429s that get through.
pub struct ThrottledMessenger {
    inner: Arc<dyn MessagingPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<i64, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledMessenger {
    pub fn new(inner: Arc<dyn MessagingPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: i64) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: i64) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        self.inner.capabilities()
    }

    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<(), SendFailure> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_text(chat_id, text).await
    }

    async fn send_menu(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: ReplyKeyboard,
    ) -> Result<(), SendFailure> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_menu(chat_id, text, keyboard).await
    }

    async fn send_document(
        &self,
        chat_id: ChatId,
        document: DocumentUpload,
    ) -> Result<(), SendFailure> {
        self.throttle_chat(chat_id.0).await;
        self.inner.send_document(chat_id, document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMessenger;

    #[tokio::test(start_paused = true)]
    async fn spaces_calls_to_the_same_chat() {
        let inner = Arc::new(RecordingMessenger::default());
        let throttled = ThrottledMessenger::new(
            inner.clone(),
            ThrottleConfig {
                global_min_interval: Duration::from_millis(10),
                per_chat_min_interval: Duration::from_millis(500),
            },
        );

        let start = Instant::now();
        throttled.send_text(ChatId(1), "a").await.unwrap();
        throttled.send_text(ChatId(1), "b").await.unwrap();
        throttled.send_text(ChatId(1), "c").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert_eq!(inner.texts(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn other_chats_only_pay_the_global_interval() {
        let inner = Arc::new(RecordingMessenger::default());
        let throttled = ThrottledMessenger::new(
            inner.clone(),
            ThrottleConfig {
                global_min_interval: Duration::from_millis(10),
                per_chat_min_interval: Duration::from_millis(500),
            },
        );

        let start = Instant::now();
        throttled.send_text(ChatId(1), "a").await.unwrap();
        throttled.send_text(ChatId(2), "b").await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}
