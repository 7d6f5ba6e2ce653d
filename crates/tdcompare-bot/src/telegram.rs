//! Minimal Telegram Bot API client.
//!
//! Covers the handful of methods the bot needs: long polling with
//! `getUpdates`, `sendMessage`, multipart `sendDocument`, and file
//! download through `getFile`. Every call goes through [`TelegramClient::call`],
//! which unwraps the `{"ok": ..., "result": ...}` envelope.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client as HttpClient;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tdcompare_core::{ChatId, CompareResult, Messenger};
use tracing::debug;

use crate::config::BotConfig;
use crate::dispatcher::FileSource;
use crate::error::{BotError, BotResult};
use crate::poller::UpdateSource;

/// Longest text Telegram accepts in one message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Slack on top of the long-poll timeout before the HTTP request gives up.
const REQUEST_TIMEOUT_MARGIN_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Bot API client. The token never appears in `Debug` output or errors.
pub struct TelegramClient {
    http: HttpClient,
    token: SecretString,
    api_url: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(config: &BotConfig) -> BotResult<Self> {
        let http = HttpClient::builder()
            .user_agent(concat!("tdcompare-bot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(
                u64::from(config.poll_timeout_secs) + REQUEST_TIMEOUT_MARGIN_SECS,
            ))
            .build()?;

        Ok(Self {
            http,
            token: SecretString::new(config.telegram_token.expose_secret().clone()),
            api_url: config.api_url.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token.expose_secret(), method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.api_url,
            self.token.expose_secret(),
            file_path
        )
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: serde_json::Value,
    ) -> BotResult<T> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await?;
        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        method: &'static str,
        response: reqwest::Response,
    ) -> BotResult<T> {
        let status = response.status().as_u16();
        let payload = response.text().await?;
        parse_envelope(method, status, &payload)
    }

    /// Check the token; returns the bot account.
    pub async fn get_me(&self) -> BotResult<User> {
        self.call("getMe", json!({})).await
    }

    /// Long-poll for new messages after `offset`.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout_secs: u32,
    ) -> BotResult<Vec<Update>> {
        let mut body = json!({ "timeout": timeout_secs, "allowed_updates": ["message"] });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", body).await
    }

    pub async fn send_message(&self, chat: ChatId, text: &str) -> BotResult<Message> {
        self.call(
            "sendMessage",
            json!({ "chat_id": chat.0, "text": truncate_message(text) }),
        )
        .await
    }

    /// Upload the file at `path` so it shows up as `file_name` in the chat.
    pub async fn upload_document(
        &self,
        chat: ChatId,
        file_name: &str,
        path: &Path,
    ) -> BotResult<Message> {
        let content = tokio::fs::read(path).await?;
        let size = content.len();
        let part = Part::bytes(content).file_name(file_name.to_string());
        let form = Form::new()
            .text("chat_id", chat.0.to_string())
            .part("document", part);

        let response = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        let message = Self::unwrap_response("sendDocument", response).await?;
        debug!(chat_id = %chat, file_name, bytes = size, "Document sent");
        Ok(message)
    }

    /// Resolve `file_id` with `getFile` and download its content.
    pub async fn download_file(&self, file_id: &str) -> BotResult<Vec<u8>> {
        let file: File = self.call("getFile", json!({ "file_id": file_id })).await?;
        let file_path = file.file_path.ok_or_else(|| BotError::Api {
            method: "getFile",
            status: None,
            description: format!("no file_path for {}", file.file_id),
            retry_after: None,
        })?;

        let response = self.http.get(self.file_url(&file_path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BotError::Api {
                method: "file download",
                status: Some(status.as_u16()),
                description: status.canonical_reason().unwrap_or("download failed").to_string(),
                retry_after: None,
            });
        }
        let bytes = response.bytes().await?;
        debug!(file_id, bytes = bytes.len(), "File downloaded");
        Ok(bytes.to_vec())
    }
}

/// Decode a Bot API envelope into its `result`.
fn parse_envelope<T: DeserializeOwned>(
    method: &'static str,
    status: u16,
    payload: &str,
) -> BotResult<T> {
    let envelope: ApiResponse<T> = serde_json::from_str(payload).map_err(|e| BotError::Api {
        method,
        status: Some(status),
        description: format!("unreadable response: {e}"),
        retry_after: None,
    })?;

    if !envelope.ok {
        return Err(BotError::Api {
            method,
            status: envelope.error_code.or(Some(status)),
            description: envelope
                .description
                .unwrap_or_else(|| "unknown error".to_string()),
            retry_after: envelope.parameters.and_then(|p| p.retry_after),
        });
    }

    envelope.result.ok_or_else(|| BotError::Api {
        method,
        status: Some(status),
        description: "missing result".to_string(),
        retry_after: None,
    })
}

/// Cut `text` to what fits in a single message.
pub fn truncate_message(text: &str) -> &str {
    match text.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat: ChatId, text: &str) -> CompareResult<()> {
        self.send_message(chat, text)
            .await
            .map(drop)
            .map_err(BotError::into_send_error)
    }

    async fn send_document(&self, chat: ChatId, file_name: &str, path: &Path) -> CompareResult<()> {
        self.upload_document(chat, file_name, path)
            .await
            .map(drop)
            .map_err(BotError::into_send_error)
    }
}

#[async_trait]
impl FileSource for TelegramClient {
    async fn download(&self, file_id: &str) -> CompareResult<Vec<u8>> {
        self.download_file(file_id)
            .await
            .map_err(BotError::into_download_error)
    }
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn updates(&self, offset: Option<i64>, timeout_secs: u32) -> BotResult<Vec<Update>> {
        self.get_updates(offset, timeout_secs).await
    }
}
