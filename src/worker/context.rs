// src/worker/context.rs
use metrics::{counter, gauge};
use std::sync::Arc;
use tokio::sync::watch;

use crate::cursor::CursorStore;
use crate::error::FeedError;
use crate::extract::{entry_id, extract_post, format_message};
use crate::ingest::{newest, FeedSource};
use crate::metrics::ensure_metrics_described;
use crate::notify::Dispatcher;

/// What one check did. Also the body of the manual-trigger response.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct CycleReport {
    pub entries: usize,
    pub candidates: usize,
    pub sent: usize,
    pub failed: usize,
    pub skipped_without_id: usize,
    pub cursor: String,
    pub persisted: bool,
}

/// Everything a cycle needs, built once in `main`.
///
/// Delivery is at-least-once: the in-memory cursor advances right after a
/// confirmed send and is persisted at the end of the cycle, so a crash in
/// between re-sends that post after restart.
pub struct WorkerContext {
    feed: Box<dyn FeedSource>,
    dispatcher: Arc<Dispatcher>,
    cursor: CursorStore,
    last_id: String,
    persisted_id: String,
    header: String,
    max_posts: usize,
    cursor_tx: watch::Sender<String>,
}

impl WorkerContext {
    /// Loads the persisted cursor.
    pub async fn new(
        feed: Box<dyn FeedSource>,
        dispatcher: Arc<Dispatcher>,
        cursor: CursorStore,
        header: impl Into<String>,
        max_posts: usize,
    ) -> Self {
        ensure_metrics_described();
        let last_id = cursor.load().await;
        tracing::info!(last_id = %last_id, feed = feed.name(), "loaded cursor");
        let (cursor_tx, _) = watch::channel(last_id.clone());
        Self {
            feed,
            dispatcher,
            cursor,
            persisted_id: last_id.clone(),
            last_id,
            header: header.into(),
            max_posts: max_posts.max(1),
            cursor_tx,
        }
    }

    pub fn last_id(&self) -> &str {
        &self.last_id
    }

    /// Read side of the cursor for the status endpoint.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.cursor_tx.subscribe()
    }

    pub async fn run_cycle(&mut self) -> Result<CycleReport, FeedError> {
        counter!("relay_cycles_total").increment(1);
        let entries = self.feed.fetch_entries().await.inspect_err(|_| {
            counter!("relay_cycle_errors_total").increment(1);
        })?;
        gauge!("relay_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);

        let mut report = CycleReport {
            entries: entries.len(),
            ..Default::default()
        };
        if entries.is_empty() {
            tracing::warn!(feed = self.feed.name(), "no feed entries");
        }

        // newest first until we hit what was already forwarded
        let mut candidates = Vec::new();
        for entry in newest(&entries, self.max_posts) {
            let id = entry_id(entry);
            if id.is_empty() {
                report.skipped_without_id += 1;
                tracing::debug!(title = ?entry.title, "entry has neither id nor link; skipping");
                continue;
            }
            if id == self.last_id {
                break;
            }
            candidates.push(entry);
        }
        report.candidates = candidates.len();

        // oldest first; stop at the first failure so nothing newer jumps the queue
        for entry in candidates.into_iter().rev() {
            let post = extract_post(entry);
            let message = format_message(&post, &self.header);
            match self.dispatcher.dispatch(&message, &post.image_urls).await {
                Ok(mode) => {
                    counter!("relay_posts_sent_total").increment(1);
                    tracing::info!(
                        post_id = %post.id,
                        title = %post.title,
                        images = post.image_urls.len(),
                        mode = ?mode,
                        "sent new post"
                    );
                    self.last_id = post.id;
                    report.sent += 1;
                }
                Err(e) => {
                    tracing::warn!(post_id = %post.id, error = %e, "post not delivered; retrying next cycle");
                    report.failed += 1;
                    break;
                }
            }
        }

        if self.last_id != self.persisted_id {
            self.cursor_tx.send_replace(self.last_id.clone());
            match self.cursor.save(&self.last_id).await {
                Ok(()) => {
                    self.persisted_id = self.last_id.clone();
                    report.persisted = true;
                }
                Err(e) => {
                    tracing::error!(error = %e, cursor = %self.last_id, "could not persist cursor; will retry")
                }
            }
        } else if report.sent == 0 {
            tracing::debug!("no new posts");
        }

        report.cursor = self.last_id.clone();
        Ok(report)
    }
}
