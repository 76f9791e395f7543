// src/notify/telegram.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ChatApi;
use crate::error::TelegramError;

pub const PARSE_MODE_MARKDOWN: &str = "Markdown";

/// Where every outbound call goes. Injected into each request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Destination {
    pub chat_id: String,
    pub thread_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessage {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
    #[serde(default)]
    pub disable_web_page_preview: bool,
}

impl SendMessage {
    /// Markdown text with link previews off.
    pub fn markdown(dest: &Destination, text: impl Into<String>) -> Self {
        Self {
            chat_id: dest.chat_id.clone(),
            message_thread_id: dest.thread_id,
            text: text.into(),
            parse_mode: Some(PARSE_MODE_MARKDOWN.to_string()),
            disable_web_page_preview: true,
        }
    }

    /// No parse mode: the text is shown verbatim.
    pub fn plain(dest: &Destination, text: impl Into<String>) -> Self {
        Self {
            parse_mode: None,
            ..Self::markdown(dest, text)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendPhoto {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    pub photo: String,
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
}

impl SendPhoto {
    pub fn new(dest: &Destination, photo: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            chat_id: dest.chat_id.clone(),
            message_thread_id: dest.thread_id,
            photo: photo.into(),
            caption: caption.into(),
            parse_mode: Some(PARSE_MODE_MARKDOWN.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMediaPhoto {
    #[serde(rename = "type")]
    pub kind: String,
    pub media: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<String>,
}

impl InputMediaPhoto {
    pub fn photo(url: impl Into<String>) -> Self {
        Self {
            kind: "photo".to_string(),
            media: url.into(),
            caption: None,
            parse_mode: None,
        }
    }
}

/// `media` travels as a JSON string inside the form body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMediaGroup {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_thread_id: Option<i64>,
    pub media: String,
}

impl SendMediaGroup {
    pub fn new(dest: &Destination, items: &[InputMediaPhoto]) -> Result<Self, TelegramError> {
        Ok(Self {
            chat_id: dest.chat_id.clone(),
            message_thread_id: dest.thread_id,
            media: serde_json::to_string(items)?,
        })
    }

    pub fn items(&self) -> Result<Vec<InputMediaPhoto>, TelegramError> {
        Ok(serde_json::from_str(&self.media)?)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Bot API client speaking form-encoded POSTs.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
    timeout: Duration,
    media_timeout: Duration,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: "https://api.telegram.org".to_string(),
            token: token.into(),
            timeout: Duration::from_secs(10),
            media_timeout: Duration::from_secs(15),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    async fn call<T: Serialize + Sync>(
        &self,
        method: &str,
        body: &T,
        timeout: Duration,
    ) -> Result<(), TelegramError> {
        let url = format!("{}/bot{}/{}", self.api_base, self.token, method);
        let resp = self
            .client
            .post(&url)
            .timeout(timeout)
            .form(body)
            .send()
            .await
            // reqwest puts the URL (and so the token) into its Display output
            .map_err(|e| TelegramError::Http(e.without_url()))?;

        let status = resp.status();
        let parsed = resp.json::<ApiResponse>().await.ok();
        match parsed {
            Some(r) if status.is_success() && r.ok => Ok(()),
            None if status.is_success() => Ok(()),
            other => Err(TelegramError::Api {
                status: status.as_u16(),
                description: other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| status.to_string()),
            }),
        }
    }
}

#[async_trait]
impl ChatApi for TelegramClient {
    async fn send_message(&self, req: &SendMessage) -> Result<(), TelegramError> {
        self.call("sendMessage", req, self.timeout).await
    }

    async fn send_photo(&self, req: &SendPhoto) -> Result<(), TelegramError> {
        self.call("sendPhoto", req, self.timeout).await
    }

    async fn send_media_group(&self, req: &SendMediaGroup) -> Result<(), TelegramError> {
        self.call("sendMediaGroup", req, self.media_timeout).await
    }

    fn has_credentials(&self) -> bool {
        !self.token.trim().is_empty()
    }
}
