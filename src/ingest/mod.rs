// src/ingest/mod.rs
//! Feed polling: wire types, the `FeedSource` seam and the RSS/Atom provider.

pub mod providers;
pub mod types;

pub use providers::rss::RssFeedProvider;
pub use types::{FeedEntry, FeedSource};

/// The newest `n` entries, still newest first.
pub fn newest(entries: &[FeedEntry], n: usize) -> &[FeedEntry] {
    &entries[..entries.len().min(n)]
}

/// quick-xml only knows the five XML entities; feeds built from HTML pages
/// routinely leak a few more into titles and descriptions.
pub(crate) fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str) -> FeedEntry {
        FeedEntry {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    #[test]
    fn newest_caps_at_available_entries() {
        let all = vec![entry("c"), entry("b"), entry("a")];
        assert_eq!(newest(&all, 2).len(), 2);
        assert_eq!(newest(&all, 2)[0].id.as_deref(), Some("c"));
        assert_eq!(newest(&all, 10).len(), 3);
        assert!(newest(&[], 1).is_empty());
    }

    #[test]
    fn scrub_replaces_html_only_entities() {
        let out = scrub_html_entities_for_xml("a&nbsp;b &amp; c&mdash;d");
        assert_eq!(out, "a b &amp; c-d");
    }
}
