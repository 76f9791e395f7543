// src/ingest/types.rs
use crate::error::FeedError;

/// One syndicated item as it came off the wire. Rebuilt on every poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FeedEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    /// Raw HTML from `description` / `summary` / `content`.
    pub summary_html: Option<String>,
    pub published_at: Option<u64>, // unix seconds
}

#[async_trait::async_trait]
pub trait FeedSource: Send + Sync {
    /// Entries in feed order, newest first.
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, FeedError>;
    fn name(&self) -> &str;
}
