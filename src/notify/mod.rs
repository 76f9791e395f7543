// src/notify/mod.rs
//! Outbound delivery to the chat service.

pub mod dispatch;
pub mod telegram;

use crate::error::TelegramError;

pub use dispatch::{
    escape_markdown, split_for_caption, split_message, DispatchMode, Dispatcher, CAPTION_LIMIT,
    MEDIA_GROUP_CAP,
};
pub use telegram::{
    Destination, InputMediaPhoto, SendMediaGroup, SendMessage, SendPhoto, TelegramClient,
};

/// The three Bot API calls the relay needs. `TelegramClient` is the real one;
/// tests plug in recorders.
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_message(&self, req: &SendMessage) -> Result<(), TelegramError>;
    async fn send_photo(&self, req: &SendPhoto) -> Result<(), TelegramError>;
    async fn send_media_group(&self, req: &SendMediaGroup) -> Result<(), TelegramError>;

    /// False when no bot token is configured.
    fn has_credentials(&self) -> bool;
}
