use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Envelope every Bot API method answers with.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
}

/// Outgoing side of a chat: what the command handlers need to reply.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Send `text`, parsed as Markdown when `markdown` is set. Returns the
    /// new message's ID.
    async fn send_message(&self, chat_id: i64, text: &str, markdown: bool) -> Result<i64>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;
}

/// Minimal Telegram Bot API client over HTTPS long polling.
#[derive(Clone)]
pub struct TelegramClient {
    http: Client,
    /// `{api_url}/bot{token}`
    base_url: String,
}

impl TelegramClient {
    /// `poll_timeout_secs` is the longest getUpdates wait; the HTTP timeout
    /// is set comfortably above it.
    pub fn new(api_url: &str, token: &str, poll_timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(TelegramClient {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        let url = format!("{}/{}", self.base_url, method);
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Telegram {} request failed", method))?;

        let status = resp.status();
        let parsed: ApiResponse<T> = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse Telegram {} response ({})", method, status))?;

        if !parsed.ok {
            anyhow::bail!(
                "Telegram {} error {}: {}",
                method,
                status,
                parsed.description.unwrap_or_default()
            );
        }
        parsed
            .result
            .with_context(|| format!("Telegram {} returned no result", method))
    }

    /// Long-poll for updates with ID >= `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut body = serde_json::json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message"],
        });
        if let Some(offset) = offset {
            body["offset"] = offset.into();
        }
        let updates: Vec<Update> = self.call("getUpdates", body).await?;
        if !updates.is_empty() {
            debug!("Received {} Telegram update(s)", updates.len());
        }
        Ok(updates)
    }

    /// Bot username, used to recognise `/command@botname`.
    pub async fn get_me(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Me {
            username: Option<String>,
        }
        let me: Me = self.call("getMe", serde_json::json!({})).await?;
        Ok(me.username.unwrap_or_default())
    }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn send_message(&self, chat_id: i64, text: &str, markdown: bool) -> Result<i64> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if markdown {
            body["parse_mode"] = "Markdown".into();
        }
        let sent: Message = self.call("sendMessage", body).await?;
        Ok(sent.message_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let _: bool = self
            .call(
                "deleteMessage",
                serde_json::json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn parses_updates_and_sends_offset() {
        let app = Router::new().route(
            "/bottok/getUpdates",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["offset"], 11);
                assert_eq!(body["timeout"], 0);
                Json(json!({
                    "ok": true,
                    "result": [{
                        "update_id": 11,
                        "message": {
                            "message_id": 5,
                            "chat": { "id": 99, "type": "private" },
                            "from": { "id": 7, "is_bot": false, "first_name": "Sam" },
                            "text": "/start"
                        }
                    }, { "update_id": 12 }]
                }))
            }),
        );
        let base = serve(app).await;
        let client = TelegramClient::new(&base, "tok", 0).unwrap();
        let updates = client.get_updates(Some(11), 0).await.unwrap();
        assert_eq!(updates.len(), 2);
        let msg = updates[0].message.as_ref().unwrap();
        assert_eq!(msg.chat.id, 99);
        assert_eq!(msg.from.as_ref().unwrap().first_name, "Sam");
        assert!(updates[1].message.is_none());
    }

    #[tokio::test]
    async fn send_message_sets_parse_mode() {
        let app = Router::new().route(
            "/bottok/:method",
            post(|Path(method): Path<String>, Json(body): Json<Value>| async move {
                match method.as_str() {
                    "sendMessage" => {
                        assert_eq!(body["parse_mode"], "Markdown");
                        Json(json!({
                            "ok": true,
                            "result": { "message_id": 42, "chat": { "id": body["chat_id"] } }
                        }))
                    }
                    _ => Json(json!({ "ok": false, "description": "Bad Request: message can't be deleted" })),
                }
            }),
        );
        let base = serve(app).await;
        let client = TelegramClient::new(&base, "tok", 0).unwrap();
        assert_eq!(client.send_message(1, "*hi*", true).await.unwrap(), 42);

        let err = client.delete_message(1, 42).await.unwrap_err();
        assert!(err.to_string().contains("can't be deleted"));
    }
}
