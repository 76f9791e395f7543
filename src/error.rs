// src/error.rs
//! Error types shared across the relay.
//!
//! Each stage gets its own enum so the worker can tell a retryable network
//! hiccup from a post that will never go through.

use thiserror::Error;

/// Failures while fetching or parsing the feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Network-level failure (connect, timeout, body read).
    #[error("feed request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed host answered with a non-2xx status.
    #[error("feed returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// The body is neither RSS 2.0 nor Atom.
    #[error("feed parse error: {0}")]
    Parse(String),
}

impl FeedError {
    /// Transient errors are expected to clear up on their own; the others
    /// need someone to look at the feed or the config.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::Http(_) => true,
            FeedError::Status(s) => s.is_server_error() || s.as_u16() == 429,
            FeedError::Parse(_) => false,
        }
    }
}

/// Errors from a single Telegram Bot API call.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("telegram request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("telegram API error (HTTP {status}): {description}")]
    Api { status: u16, description: String },

    #[error("could not encode media group: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outcome of a whole dispatch (primary send plus fallback).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Bot token or chat id not configured; nothing was sent.
    #[error("telegram credentials missing: {0}")]
    MissingCredentials(&'static str),

    /// Primary send and the text fallback both failed.
    #[error("delivery failed: {0}")]
    Delivery(#[from] TelegramError),
}

/// Cursor persistence failures.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("cursor file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "postgres")]
    #[error("cursor database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no cursor backend accepted the write")]
    AllBackendsFailed,
}
