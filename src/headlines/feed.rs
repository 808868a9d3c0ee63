// src/headlines/feed.rs
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::PipelineError;

pub const DEFAULT_FEED_BASE: &str = "https://news.google.com/rss";
pub const ENV_FEED_BASE: &str = "NEWS_FEED_BASE_URL";

const FEED_TIMEOUT: Duration = Duration::from_secs(15);
// Some feed providers reject default library agents.
const FEED_USER_AGENT: &str = "Mozilla/5.0 (compatible; treasury-lens/0.1)";

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
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
}

/// One raw entry of the feed, text fields already HTML-unescaped and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub link: String,
}

/// Transport seam for the headline fetcher. Returns the raw feed body.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, PipelineError>;
    fn name(&self) -> &'static str;
}

/// Live feed over HTTP.
pub struct HttpFeedSource {
    client: reqwest::Client,
}

impl HttpFeedSource {
    pub fn new() -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .user_agent(FEED_USER_AGENT)
            .timeout(FEED_TIMEOUT)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn get(&self, url: &str) -> Result<String, PipelineError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;
        let resp = resp
            .error_for_status()
            .map_err(|e| PipelineError::Transport(e.to_string()))?;
        resp.text()
            .await
            .map_err(|e| PipelineError::Transport(format!("reading feed body: {e}")))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Feed base from `$NEWS_FEED_BASE_URL`, else the public news search feed.
pub fn feed_base_from_env() -> String {
    std::env::var(ENV_FEED_BASE)
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_FEED_BASE.to_string())
}

/// `<base>/search?q=<query>&hl=en-US&gl=US&ceid=US:en`, query form-encoded
/// (spaces become `+`).
pub fn search_url(base: &str, query: &str) -> String {
    let q: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
    format!(
        "{}/search?q={}&hl=en-US&gl=US&ceid=US:en",
        base.trim_end_matches('/'),
        q
    )
}

/// Parse an RSS body into feed items in document order.
pub fn parse_feed(body: &str) -> Result<Vec<FeedItem>, PipelineError> {
    let xml = scrub_html_entities_for_xml(body);
    let rss: Rss = from_str(&xml).map_err(|e| PipelineError::Parse(format!("feed xml: {e}")))?;

    Ok(rss
        .channel
        .item
        .into_iter()
        .map(|it| FeedItem {
            title: unescape(it.title.as_deref()),
            description: unescape(it.description.as_deref()),
            link: it.link.as_deref().unwrap_or_default().trim().to_string(),
        })
        .collect())
}

fn unescape(s: Option<&str>) -> String {
    html_escape::decode_html_entities(s.unwrap_or_default().trim()).to_string()
}

// HTML named entities are not valid XML; swap the usual suspects before parsing.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
