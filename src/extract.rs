// src/extract.rs
//! Turns a raw feed entry into the pieces a chat message is built from.

use scraper::{node::Node, Html};

use crate::ingest::FeedEntry;

pub const NO_TITLE: &str = "(No title)";

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExtractedPost {
    /// Entry id, else its link, else empty.
    pub id: String,
    pub title: String,
    pub link: String,
    pub summary_text: String,
    /// `<img src>` values in document order, duplicates kept.
    pub image_urls: Vec<String>,
    /// `<a href>` values in document order.
    pub related_links: Vec<String>,
}

/// Stable identifier for dedup: native id, else link, else "".
pub fn entry_id(entry: &FeedEntry) -> String {
    entry
        .id
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(entry.link.as_deref())
        .unwrap_or_default()
        .to_string()
}

pub fn extract_post(entry: &FeedEntry) -> ExtractedPost {
    let (summary_text, image_urls, related_links) =
        split_summary(entry.summary_html.as_deref().unwrap_or_default());

    ExtractedPost {
        id: entry_id(entry),
        title: entry.title.clone().unwrap_or_else(|| NO_TITLE.to_string()),
        link: entry.link.clone().unwrap_or_default(),
        summary_text,
        image_urls,
        related_links,
    }
}

/// Walk the summary fragment once: collect `img@src` and `a@href`, and keep
/// only the text that is not inside a linking anchor. An `<a>` without
/// `href` is just markup; its text stays.
///
/// The HTML parser is lenient, so garbage input just yields less content.
fn split_summary(html: &str) -> (String, Vec<String>, Vec<String>) {
    if html.trim().is_empty() {
        return (String::new(), Vec::new(), Vec::new());
    }

    let fragment = Html::parse_fragment(html);
    let mut text = String::new();
    let mut images = Vec::new();
    let mut links = Vec::new();

    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Element(el) => match el.name() {
                "img" => {
                    if let Some(src) = el.attr("src").filter(|s| !s.is_empty()) {
                        images.push(src.to_string());
                    }
                }
                "a" => {
                    if let Some(href) = el.attr("href").filter(|s| !s.is_empty()) {
                        links.push(href.to_string());
                    }
                }
                _ => {}
            },
            Node::Text(t) => {
                let in_anchor = node.ancestors().any(|a| {
                    a.value().as_element().is_some_and(|el| {
                        el.name() == "a" && el.attr("href").is_some_and(|h| !h.is_empty())
                    })
                });
                if !in_anchor {
                    text.push_str(t);
                }
            }
            _ => {}
        }
    }

    (text.trim().to_string(), images, links)
}

/// Render the outgoing message body (before any markup escaping).
pub fn format_message(post: &ExtractedPost, header: &str) -> String {
    let mut msg = format!("{header}\n\n{}", post.title);
    if !post.summary_text.is_empty() {
        msg.push_str("\n\n");
        msg.push_str(&post.summary_text);
    }
    msg.push_str("\n\n🔗 Post URL: ");
    msg.push_str(&post.link);
    for href in &post.related_links {
        msg.push_str("\n🔗 Link: ");
        msg.push_str(href);
    }
    msg
}
