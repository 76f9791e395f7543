// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod cursor;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod worker;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::BotConfig;
pub use crate::extract::{extract_post, format_message, ExtractedPost};
pub use crate::ingest::{FeedEntry, FeedSource, RssFeedProvider};
pub use crate::notify::{ChatApi, Destination, Dispatcher, TelegramClient};
pub use crate::worker::{Backoff, CycleReport, WorkerActor, WorkerContext, WorkerHandle};

use std::sync::Arc;
use std::time::Duration;

use crate::cursor::{CursorStore, FileCursor};

/// Dispatcher talking to the real Bot API, as configured.
pub fn build_dispatcher(cfg: &BotConfig) -> Arc<Dispatcher> {
    let client = TelegramClient::new(cfg.bot_token.clone()).with_api_base(cfg.api_base.clone());
    let dest = Destination {
        chat_id: cfg.chat_id.clone(),
        thread_id: cfg.thread_id,
    };
    Arc::new(Dispatcher::new(Arc::new(client), dest, cfg.split_at))
}

/// File cursor plus the database mirror when `DATABASE_URL` is set and the
/// crate was built with `postgres`. An unreachable database is logged and
/// the file carries on alone.
pub async fn build_cursor_store(cfg: &BotConfig) -> CursorStore {
    let store = CursorStore::new(FileCursor::new(cfg.last_id_file.clone()));

    let Some(url) = cfg.database_url.as_deref() else {
        return store;
    };

    #[cfg(feature = "postgres")]
    {
        match cursor::PgCursor::connect(url).await {
            Ok(pg) => store.with_kv(Box::new(pg)),
            Err(e) => {
                tracing::warn!(error = %e, "could not init Postgres; using file storage");
                store
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    {
        let _ = url;
        tracing::warn!("DATABASE_URL set but built without the `postgres` feature; using file storage");
        store
    }
}

/// Worker context wired from config: HTTP feed, Telegram, cursor store.
pub async fn build_worker_context(
    cfg: &BotConfig,
    dispatcher: Arc<Dispatcher>,
) -> anyhow::Result<WorkerContext> {
    let feed = RssFeedProvider::from_url(cfg.rss_url.clone())?;
    let cursor = build_cursor_store(cfg).await;
    Ok(WorkerContext::new(
        Box::new(feed),
        dispatcher,
        cursor,
        cfg.post_header.clone(),
        cfg.max_posts_per_check,
    )
    .await)
}

pub fn backoff_for(cfg: &BotConfig) -> Backoff {
    Backoff::new(
        Duration::from_secs(cfg.check_interval_secs),
        Duration::from_secs(cfg.backoff_max_secs),
    )
}
