pub mod client;
pub mod format;
pub mod handler;

pub use client::TelegramClient;
pub use handler::BotHandler;

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use client::Update;

/// Delay before polling again after a failed getUpdates call.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-poll Telegram forever, handing each message to `handler` on its own
/// task so a slow `/predictions` run doesn't block other chats.
pub async fn run_bot(client: TelegramClient, handler: Arc<BotHandler>, poll_timeout_secs: u64) {
    info!("Telegram bot started, polling for updates");
    let mut offset: Option<i64> = None;

    loop {
        let updates = match client.get_updates(offset, poll_timeout_secs).await {
            Ok(u) => u,
            Err(e) => {
                error!("Failed to poll Telegram updates: {:#}", e);
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        let (next, _) = dispatch_updates(updates, &handler);
        if next.is_some() {
            offset = next;
        }
    }
}

/// Spawn a handler task for every update that carries a message. Returns
/// the offset that acknowledges the whole batch (`None` for an empty one).
fn dispatch_updates(
    updates: Vec<Update>,
    handler: &Arc<BotHandler>,
) -> (Option<i64>, Vec<JoinHandle<()>>) {
    let mut next = None;
    let mut tasks = Vec::new();
    for update in updates {
        next = Some(update.update_id + 1);
        let Some(msg) = update.message else {
            continue;
        };
        let handler = Arc::clone(handler);
        tasks.push(tokio::spawn(async move {
            if let Err(e) = handler.handle_message(&msg).await {
                error!("Failed to handle message in chat {}: {:#}", msg.chat.id, e);
            }
        }));
    }
    (next, tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leagues;
    use crate::predictor::fixtures::FakeSource;
    use crate::predictor::{BasicModel, MatchPredictor};
    use anyhow::Result;
    use async_trait::async_trait;
    use super::client::{Chat, ChatApi, Message};
    use std::sync::Mutex;

    #[derive(Default)]
    struct SentLog(Mutex<Vec<i64>>);

    #[async_trait]
    impl ChatApi for SentLog {
        async fn send_message(&self, chat_id: i64, _text: &str, _markdown: bool) -> Result<i64> {
            self.0.lock().unwrap().push(chat_id);
            Ok(1)
        }

        async fn delete_message(&self, _chat_id: i64, _message_id: i64) -> Result<()> {
            Ok(())
        }
    }

    fn update(update_id: i64, chat_id: i64, text: Option<&str>) -> Update {
        Update {
            update_id,
            message: text.map(|t| Message {
                message_id: update_id,
                chat: Chat { id: chat_id },
                from: None,
                text: Some(t.to_string()),
            }),
        }
    }

    fn handler(chat: Arc<SentLog>) -> Arc<BotHandler> {
        let predictor = MatchPredictor::new(Arc::new(FakeSource::default()), Box::new(BasicModel), 10);
        let leagues = leagues::all().to_vec();
        Arc::new(BotHandler::new(chat, Arc::new(predictor), leagues, 7, None))
    }

    #[tokio::test]
    async fn batch_advances_offset_past_last_update() {
        let chat = Arc::new(SentLog::default());
        let h = handler(chat.clone());
        let updates = vec![
            update(10, 1, Some("/start")),
            update(11, 2, None),
            update(12, 3, Some("/help")),
        ];

        let (next, tasks) = dispatch_updates(updates, &h);
        assert_eq!(next, Some(13));
        assert_eq!(tasks.len(), 2);
        for t in tasks {
            t.await.unwrap();
        }
        let mut chats = chat.0.lock().unwrap().clone();
        chats.sort();
        assert_eq!(chats, vec![1, 3]);
    }

    #[tokio::test]
    async fn update_without_message_still_moves_offset() {
        let h = handler(Arc::new(SentLog::default()));
        let (next, tasks) = dispatch_updates(vec![update(41, 1, None)], &h);
        assert_eq!(next, Some(42));
        assert!(tasks.is_empty());

        let (next, _) = dispatch_updates(vec![], &h);
        assert_eq!(next, None);
    }
}
