use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::db::Database;
use crate::leagues::League;
use crate::predictor::MatchPredictor;
use crate::report::build_reports;

use super::client::{ChatApi, Message};
use super::format::{self, MAX_MESSAGE_LEN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Predictions,
    Leagues,
    Unknown,
}

impl Command {
    /// Map incoming text to a command. Slash commands may carry an
    /// `@botname` suffix; those addressed to another bot give `None`.
    /// Free text is matched on keywords.
    pub fn parse(text: &str, bot_username: &str) -> Option<Command> {
        let text = text.trim();
        if let Some(rest) = text.strip_prefix('/') {
            let word = rest.split_whitespace().next().unwrap_or("");
            let (name, target) = match word.split_once('@') {
                Some((name, target)) => (name, Some(target)),
                None => (word, None),
            };
            if let Some(target) = target {
                if !bot_username.is_empty() && !target.eq_ignore_ascii_case(bot_username) {
                    return None;
                }
            }
            return Some(match name.to_ascii_lowercase().as_str() {
                "start" => Command::Start,
                "help" => Command::Help,
                "predictions" => Command::Predictions,
                "leagues" => Command::Leagues,
                _ => Command::Unknown,
            });
        }

        let lower = text.to_lowercase();
        Some(if lower.contains("predict") {
            Command::Predictions
        } else if lower.contains("league") {
            Command::Leagues
        } else if lower.contains("help") {
            Command::Help
        } else {
            Command::Unknown
        })
    }
}

/// Answers chat commands using a shared predictor.
pub struct BotHandler {
    chat: Arc<dyn ChatApi>,
    predictor: Arc<MatchPredictor>,
    leagues: Vec<League>,
    days_ahead: u32,
    db: Option<Database>,
    username: String,
}

impl BotHandler {
    pub fn new(
        chat: Arc<dyn ChatApi>,
        predictor: Arc<MatchPredictor>,
        leagues: Vec<League>,
        days_ahead: u32,
        db: Option<Database>,
    ) -> Self {
        BotHandler {
            chat,
            predictor,
            leagues,
            days_ahead,
            db,
            username: String::new(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub async fn handle_message(&self, msg: &Message) -> Result<()> {
        let Some(text) = msg.text.as_deref() else {
            return Ok(());
        };
        let Some(command) = Command::parse(text, &self.username) else {
            debug!("Ignoring command for another bot: {}", text);
            return Ok(());
        };
        let chat_id = msg.chat.id;
        info!(
            "{:?} from user {} in chat {}",
            command,
            msg.from.as_ref().map_or(0, |u| u.id),
            chat_id
        );

        match command {
            Command::Start => {
                let name = msg.from.as_ref().map(|u| u.first_name.as_str());
                self.chat
                    .send_message(chat_id, &format::start_text(name), true)
                    .await?;
            }
            Command::Help => {
                self.chat
                    .send_message(chat_id, &format::help_text(), true)
                    .await?;
            }
            Command::Leagues => {
                self.chat
                    .send_message(chat_id, &format::leagues_text(&self.leagues), true)
                    .await?;
            }
            Command::Predictions => {
                if let Err(e) = self.send_predictions(chat_id).await {
                    error!("Error in predictions command: {:#}", e);
                    self.chat.send_message(chat_id, format::ERROR_TEXT, false).await?;
                }
            }
            Command::Unknown => {
                self.chat
                    .send_message(chat_id, &format::unknown_text(), false)
                    .await?;
            }
        }
        Ok(())
    }

    async fn send_predictions(&self, chat_id: i64) -> Result<()> {
        let waiting_id = self
            .chat
            .send_message(chat_id, format::WAITING_TEXT, false)
            .await?;

        let today = Utc::now().date_naive();
        let predictions = self
            .predictor
            .analyze(&self.leagues, self.days_ahead, today)
            .await;

        if predictions.is_empty() {
            self.chat
                .send_message(chat_id, format::NO_PREDICTIONS_TEXT, false)
                .await?;
            return Ok(());
        }

        let reports = build_reports(&predictions);
        if let Some(db) = &self.db {
            if let Err(e) = db.store_all(&reports) {
                warn!("Failed to store predictions: {:#}", e);
            }
        }

        if let Err(e) = self.chat.delete_message(chat_id, waiting_id).await {
            debug!("Could not delete waiting message: {:#}", e);
        }

        self.chat
            .send_message(chat_id, &format::summary_text(reports.len()), true)
            .await?;

        for report in &reports {
            let text = format::format_prediction_message(report);
            for chunk in format::split_message(&text, MAX_MESSAGE_LEN) {
                if let Err(e) = self.chat.send_message(chat_id, &chunk, true).await {
                    error!("Error sending prediction for {}: {:#}", report.title(), e);
                }
            }
        }

        self.chat.send_message(chat_id, format::DONE_TEXT, false).await?;
        info!("Sent {} prediction(s) to chat {}", reports.len(), chat_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leagues;
    use crate::predictor::fixtures::{fixture, stats, FakeSource};
    use crate::predictor::BasicModel;
    use crate::telegram::client::{Chat, User};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingChat {
        sent: Mutex<Vec<(String, bool)>>,
        deleted: Mutex<Vec<i64>>,
        next_id: AtomicI64,
        fail_delete: bool,
    }

    #[async_trait]
    impl ChatApi for RecordingChat {
        async fn send_message(&self, _chat_id: i64, text: &str, markdown: bool) -> Result<i64> {
            self.sent.lock().unwrap().push((text.to_string(), markdown));
            Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 100)
        }

        async fn delete_message(&self, _chat_id: i64, message_id: i64) -> Result<()> {
            if self.fail_delete {
                anyhow::bail!("message can't be deleted");
            }
            self.deleted.lock().unwrap().push(message_id);
            Ok(())
        }
    }

    fn message(text: &str) -> Message {
        Message {
            message_id: 1,
            chat: Chat { id: 5 },
            from: Some(User {
                id: 8,
                first_name: "Sam".into(),
            }),
            text: Some(text.into()),
        }
    }

    fn handler(chat: Arc<RecordingChat>, source: FakeSource) -> BotHandler {
        let predictor = MatchPredictor::new(Arc::new(source), Box::new(BasicModel), 10);
        let leagues = vec![*leagues::by_key("premier_league").unwrap()];
        BotHandler::new(chat, Arc::new(predictor), leagues, 7, None).with_username("predictor_bot")
    }

    /// One upcoming fixture with stats for both sides.
    fn one_fixture() -> FakeSource {
        let mut src = FakeSource::default();
        let mut game = fixture(1, 1, 2);
        game.date = Some(Utc::now() + chrono::Duration::days(1));
        src.fixtures.insert(39, vec![game]);
        src.stats.insert(1, stats(1, 10, 15, 10, 2, 2, "WWDLW"));
        src.stats.insert(2, stats(2, 10, 10, 15, 1, 3, "LDLLW"));
        src
    }

    #[test]
    fn parses_commands_and_keywords() {
        assert_eq!(Command::parse("/start", "bot"), Some(Command::Start));
        assert_eq!(Command::parse("/predictions@Bot now", "bot"), Some(Command::Predictions));
        assert_eq!(Command::parse("/leagues@other_bot", "bot"), None);
        assert_eq!(Command::parse("/nope", "bot"), Some(Command::Unknown));
        assert_eq!(Command::parse("Can you PREDICT games?", "bot"), Some(Command::Predictions));
        assert_eq!(Command::parse("which leagues", "bot"), Some(Command::Leagues));
        assert_eq!(Command::parse("help me", "bot"), Some(Command::Help));
        assert_eq!(Command::parse("hello", "bot"), Some(Command::Unknown));
    }

    #[tokio::test]
    async fn start_uses_first_name() {
        let chat = Arc::new(RecordingChat::default());
        let h = handler(chat.clone(), FakeSource::default());
        h.handle_message(&message("/start")).await.unwrap();
        let sent = chat.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].0.starts_with("Hi Sam!"));
        assert!(sent[0].1);
    }

    #[tokio::test]
    async fn predictions_flow_sends_each_prediction() {
        let chat = Arc::new(RecordingChat::default());
        let h = handler(chat.clone(), one_fixture());
        h.handle_message(&message("/predictions")).await.unwrap();

        let sent = chat.sent.lock().unwrap();
        let texts: Vec<&str> = sent.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts.len(), 4);
        assert_eq!(texts[0], format::WAITING_TEXT);
        assert!(texts[1].contains("Found 1 upcoming matches"));
        assert!(texts[2].contains("Team 1 vs Team 2"));
        assert_eq!(texts[3], format::DONE_TEXT);
        // the waiting message (first id handed out) is removed
        assert_eq!(*chat.deleted.lock().unwrap(), vec![100]);
    }

    #[tokio::test]
    async fn failed_delete_does_not_stop_the_flow() {
        let chat = Arc::new(RecordingChat {
            fail_delete: true,
            ..Default::default()
        });
        let h = handler(chat.clone(), one_fixture());
        h.handle_message(&message("predict please")).await.unwrap();
        let sent = chat.sent.lock().unwrap();
        assert_eq!(sent.last().unwrap().0, format::DONE_TEXT);
    }

    #[tokio::test]
    async fn no_predictions_sends_failure() {
        let chat = Arc::new(RecordingChat::default());
        let h = handler(chat.clone(), FakeSource::default());
        h.handle_message(&message("/predictions")).await.unwrap();
        let sent = chat.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].0, format::NO_PREDICTIONS_TEXT);
    }
}
