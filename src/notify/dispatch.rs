// src/notify/dispatch.rs
use metrics::counter;
use std::sync::Arc;

use super::telegram::{
    Destination, InputMediaPhoto, SendMediaGroup, SendMessage, SendPhoto, PARSE_MODE_MARKDOWN,
};
use super::ChatApi;
use crate::error::{DispatchError, TelegramError};

/// Telegram rejects media groups with more items than this.
pub const MEDIA_GROUP_CAP: usize = 10;

/// Escape legacy-Markdown control characters so stray `_`/`*` in hashtags or
/// names don't open styling spans that never close.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if is_markdown_control(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Telegram's caption limit, counted after escaping.
pub const CAPTION_LIMIT: usize = 1024;

fn is_markdown_control(c: char) -> bool {
    matches!(c, '_' | '*' | '`' | '[')
}

/// Split after `at` characters (not bytes).
pub fn split_message(text: &str, at: usize) -> (&str, &str) {
    match text.char_indices().nth(at) {
        Some((idx, _)) => text.split_at(idx),
        None => (text, ""),
    }
}

/// Like [`split_message`], but the head is pulled back further if escaping
/// it would push it past `limit` characters.
pub fn split_for_caption(text: &str, at: usize, limit: usize) -> (&str, &str) {
    let mut escaped = 0;
    for (n, (idx, c)) in text.char_indices().enumerate() {
        let width = if is_markdown_control(c) { 2 } else { 1 };
        if n == at || escaped + width > limit {
            return text.split_at(idx);
        }
        escaped += width;
    }
    (text, "")
}

/// How the primary part of a post was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Text,
    Photo,
    MediaGroup(usize),
    /// Photo or media group was rejected; the caption went out as text.
    TextFallback,
}

pub struct Dispatcher {
    api: Arc<dyn ChatApi>,
    dest: Destination,
    split_at: usize,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn ChatApi>, dest: Destination, split_at: usize) -> Self {
        Self {
            api,
            dest,
            split_at: split_at.max(1),
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.dest
    }

    /// Send one post.
    ///
    /// The first `split_at` characters are escaped and go out as the text or
    /// caption, cut shorter if escaping would exceed `CAPTION_LIMIT`;
    /// whatever is left follows as a plain message. Only the primary
    /// send decides success: a lost follow-up is logged, not retried.
    pub async fn dispatch(
        &self,
        text: &str,
        image_urls: &[String],
    ) -> Result<DispatchMode, DispatchError> {
        if !self.api.has_credentials() {
            tracing::error!("no TELEGRAM_BOT_TOKEN set; skipping send");
            return Err(DispatchError::MissingCredentials("bot token"));
        }
        if self.dest.chat_id.trim().is_empty() {
            tracing::error!("no TELEGRAM_CHAT_ID set; skipping send");
            return Err(DispatchError::MissingCredentials("chat id"));
        }

        let (head, tail) = split_for_caption(text, self.split_at, CAPTION_LIMIT);
        let primary = escape_markdown(head);

        let mode = match self.send_primary(&primary, image_urls).await {
            Ok(mode) => mode,
            Err(e) => {
                counter!("relay_dispatch_failures_total").increment(1);
                tracing::warn!(error = %e, "telegram send failed");
                return Err(DispatchError::Delivery(e));
            }
        };

        if !tail.is_empty() {
            let follow_up = SendMessage::plain(&self.dest, tail);
            if let Err(e) = self.api.send_message(&follow_up).await {
                tracing::warn!(error = %e, chars = tail.chars().count(), "follow-up message failed");
            }
        }

        Ok(mode)
    }

    async fn send_primary(
        &self,
        primary: &str,
        image_urls: &[String],
    ) -> Result<DispatchMode, TelegramError> {
        let attempt = match image_urls {
            [] => {
                let req = SendMessage::markdown(&self.dest, primary);
                return self.api.send_message(&req).await.map(|_| DispatchMode::Text);
            }
            [only] => {
                let req = SendPhoto::new(&self.dest, only.as_str(), primary);
                self.api.send_photo(&req).await.map(|_| DispatchMode::Photo)
            }
            many => {
                let kept = &many[..many.len().min(MEDIA_GROUP_CAP)];
                let items = kept
                    .iter()
                    .enumerate()
                    .map(|(i, url)| {
                        let mut item = InputMediaPhoto::photo(url.as_str());
                        if i == 0 {
                            item.caption = Some(primary.to_string());
                            item.parse_mode = Some(PARSE_MODE_MARKDOWN.to_string());
                        }
                        item
                    })
                    .collect::<Vec<_>>();
                match SendMediaGroup::new(&self.dest, &items) {
                    Ok(req) => self
                        .api
                        .send_media_group(&req)
                        .await
                        .map(|_| DispatchMode::MediaGroup(kept.len())),
                    Err(e) => Err(e),
                }
            }
        };

        match attempt {
            Ok(mode) => Ok(mode),
            Err(e) => {
                tracing::warn!(error = %e, images = image_urls.len(), "media send failed; falling back to text");
                let req = SendMessage::markdown(&self.dest, primary);
                self.api
                    .send_message(&req)
                    .await
                    .map(|_| DispatchMode::TextFallback)
            }
        }
    }
}
