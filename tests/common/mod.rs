// tests/common/mod.rs
//
// Shared fakes for integration tests: a recording chat API and an in-memory
// feed whose entries can be swapped between cycles.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rss_telegram_relay::cursor::{CursorStore, FileCursor};
use rss_telegram_relay::error::{FeedError, TelegramError};
use rss_telegram_relay::notify::{
    ChatApi, Destination, Dispatcher, SendMediaGroup, SendMessage, SendPhoto,
};
use rss_telegram_relay::{FeedEntry, FeedSource, WorkerContext};

#[derive(Debug, Clone)]
pub enum Call {
    Message(SendMessage),
    Photo(SendPhoto),
    Group(SendMediaGroup),
}

#[derive(Default)]
pub struct RecordingApi {
    pub calls: Mutex<Vec<Call>>,
    pub fail_messages: Mutex<bool>,
    pub fail_media: Mutex<bool>,
    pub no_token: bool,
}

impl RecordingApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn without_token() -> Arc<Self> {
        Arc::new(Self {
            no_token: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<SendMessage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Message(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn set_fail_messages(&self, v: bool) {
        *self.fail_messages.lock().unwrap() = v;
    }

    pub fn set_fail_media(&self, v: bool) {
        *self.fail_media.lock().unwrap() = v;
    }

    fn rejected() -> TelegramError {
        TelegramError::Api {
            status: 400,
            description: "Bad Request: wrong file identifier".into(),
        }
    }
}

#[async_trait::async_trait]
impl ChatApi for RecordingApi {
    async fn send_message(&self, req: &SendMessage) -> Result<(), TelegramError> {
        if *self.fail_messages.lock().unwrap() {
            return Err(Self::rejected());
        }
        self.calls.lock().unwrap().push(Call::Message(req.clone()));
        Ok(())
    }

    async fn send_photo(&self, req: &SendPhoto) -> Result<(), TelegramError> {
        if *self.fail_media.lock().unwrap() {
            return Err(Self::rejected());
        }
        self.calls.lock().unwrap().push(Call::Photo(req.clone()));
        Ok(())
    }

    async fn send_media_group(&self, req: &SendMediaGroup) -> Result<(), TelegramError> {
        if *self.fail_media.lock().unwrap() {
            return Err(Self::rejected());
        }
        self.calls.lock().unwrap().push(Call::Group(req.clone()));
        Ok(())
    }

    fn has_credentials(&self) -> bool {
        !self.no_token
    }
}

/// Feed whose entries tests replace between cycles.
#[derive(Clone, Default)]
pub struct StaticFeed {
    entries: Arc<Mutex<Vec<FeedEntry>>>,
    fail: Arc<Mutex<bool>>,
}

impl StaticFeed {
    pub fn new(entries: Vec<FeedEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            fail: Arc::default(),
        }
    }

    pub fn set(&self, entries: Vec<FeedEntry>) {
        *self.entries.lock().unwrap() = entries;
    }

    pub fn set_fail(&self, v: bool) {
        *self.fail.lock().unwrap() = v;
    }
}

#[async_trait::async_trait]
impl FeedSource for StaticFeed {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, FeedError> {
        if *self.fail.lock().unwrap() {
            return Err(FeedError::Parse("not a feed".into()));
        }
        Ok(self.entries.lock().unwrap().clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

pub fn dest() -> Destination {
    Destination {
        chat_id: "-1001234".into(),
        thread_id: Some(30),
    }
}

pub fn dispatcher(api: Arc<RecordingApi>) -> Arc<Dispatcher> {
    Arc::new(Dispatcher::new(api, dest(), 900))
}

pub fn entry(id: &str, title: &str, summary: &str) -> FeedEntry {
    FeedEntry {
        id: Some(id.into()),
        title: Some(title.into()),
        link: Some(format!("http://site/{id}")),
        summary_html: Some(summary.into()),
        published_at: None,
    }
}

pub const HEADER: &str = "📢 New post from the school page:";

pub async fn context(
    feed: StaticFeed,
    api: Arc<RecordingApi>,
    cursor_path: &std::path::Path,
    max_posts: usize,
) -> WorkerContext {
    let store = CursorStore::new(FileCursor::new(cursor_path));
    WorkerContext::new(Box::new(feed), dispatcher(api), store, HEADER, max_posts).await
}
