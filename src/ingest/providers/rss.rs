// src/ingest/providers/rss.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime, UtcOffset,
};

use crate::error::FeedError;
use crate::ingest::scrub_html_entities_for_xml;
use crate::ingest::types::{FeedEntry, FeedSource};

const FETCH_TIMEOUT_SECS: u64 = 20;
const USER_AGENT: &str = concat!("rss-telegram-relay/", env!("CARGO_PKG_VERSION"));

// --- RSS 2.0 ---

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    guid: Option<Text>,
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

// --- Atom ---

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<Text>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<Text>,
    content: Option<Text>,
    updated: Option<String>,
    published: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Element whose attributes we ignore (`<guid isPermaLink>`, `<title type>`).
#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

fn parse_rfc3339_to_unix(ts: &str) -> Option<u64> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .map(|dt| dt.unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
}

#[derive(Debug, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Atom,
}

/// Peek at the document element to pick a schema.
fn detect_kind(xml: &str) -> Result<FeedKind, FeedError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"rss" => Ok(FeedKind::Rss),
                    b"feed" => Ok(FeedKind::Atom),
                    other => Err(FeedError::Parse(format!(
                        "unsupported root element <{}>",
                        String::from_utf8_lossy(other)
                    ))),
                };
            }
            Ok(Event::Eof) => return Err(FeedError::Parse("empty document".into())),
            Ok(_) => continue,
            Err(e) => return Err(FeedError::Parse(e.to_string())),
        }
    }
}

/// Parse an RSS 2.0 or Atom document into entries, preserving feed order.
pub fn parse_feed(body: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(body);

    let entries = match detect_kind(&xml)? {
        FeedKind::Rss => {
            let rss: Rss = from_str(&xml).map_err(|e| FeedError::Parse(e.to_string()))?;
            rss.channel
                .item
                .into_iter()
                .map(|it| FeedEntry {
                    id: non_empty(it.guid.map(|g| g.value)),
                    title: non_empty(it.title).map(|t| html_escape::decode_html_entities(&t).into_owned()),
                    link: non_empty(it.link),
                    summary_html: non_empty(it.description),
                    published_at: it.pub_date.as_deref().and_then(parse_rfc2822_to_unix),
                })
                .collect::<Vec<_>>()
        }
        FeedKind::Atom => {
            let feed: AtomFeed = from_str(&xml).map_err(|e| FeedError::Parse(e.to_string()))?;
            feed.entry
                .into_iter()
                .map(|it| {
                    // rel="alternate" is the default when rel is absent
                    let link = it
                        .links
                        .iter()
                        .find(|l| l.rel.as_deref().is_none_or(|r| r == "alternate"))
                        .or_else(|| it.links.first())
                        .and_then(|l| l.href.clone());
                    FeedEntry {
                        id: non_empty(it.id),
                        title: non_empty(it.title.map(|t| t.value))
                            .map(|t| html_escape::decode_html_entities(&t).into_owned()),
                        link: non_empty(link),
                        summary_html: non_empty(it.summary.map(|t| t.value))
                            .or_else(|| non_empty(it.content.map(|t| t.value))),
                        published_at: it
                            .published
                            .as_deref()
                            .or(it.updated.as_deref())
                            .and_then(parse_rfc3339_to_unix),
                    }
                })
                .collect::<Vec<_>>()
        }
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("relay_feed_parse_ms").record(ms);
    Ok(entries)
}

/// Feed provider backed either by an HTTP URL or by an in-memory document.
pub struct RssFeedProvider {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: Client },
}

impl RssFeedProvider {
    pub fn from_fixture(s: &str) -> Self {
        Self {
            mode: Mode::Fixture(s.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }
}

#[async_trait]
impl FeedSource for RssFeedProvider {
    async fn fetch_entries(&self) -> Result<Vec<FeedEntry>, FeedError> {
        match &self.mode {
            Mode::Fixture(s) => parse_feed(s),
            Mode::Http { url, client } => {
                let resp = client.get(url).send().await.inspect_err(|e| {
                    tracing::warn!(error = %e, url = %url, "feed http error");
                    counter!("relay_feed_http_errors_total").increment(1);
                })?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(FeedError::Status(status));
                }
                let body = resp.text().await?;
                parse_feed(&body)
            }
        }
    }

    fn name(&self) -> &str {
        match &self.mode {
            Mode::Fixture(_) => "fixture",
            Mode::Http { url, .. } => url,
        }
    }
}
