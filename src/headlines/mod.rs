// src/headlines/mod.rs
pub mod classify;
pub mod feed;

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{cache_key, ExpiringCache, KeyedLocks, MemoryCache, DEFAULT_TTL};
use crate::error::Reported;

pub use classify::classify;
pub use feed::{FeedItem, FeedSource, HttpFeedSource};

/// Publisher names trusted for filtering. Ordered so it hashes the same way every time.
pub type AllowList = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub source: String,
    pub url: String,
}

impl Article {
    /// Text handed to the sentiment model for this article.
    pub fn snippet(&self) -> String {
        format!("{} — {}", self.title, self.description)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub articles: Vec<Article>,
    pub used_fallback: bool,
}

impl FetchResult {
    pub fn empty_fallback() -> Self {
        Self {
            articles: Vec::new(),
            used_fallback: true,
        }
    }

    pub fn snippets(&self) -> Vec<String> {
        self.articles.iter().map(Article::snippet).collect()
    }
}

/// The two search flavors the dashboard uses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadlineQuery {
    /// General FX market news from the last day.
    Market,
    /// News for one currency pair from the last week.
    Pair(String),
}

impl HeadlineQuery {
    pub fn search_text(&self) -> String {
        match self {
            HeadlineQuery::Market => "forex market news when:1d".to_string(),
            HeadlineQuery::Pair(pair) => format!("{} forex news when:7d", pair.trim()),
        }
    }
}

/// Currency pairs offered for per-instrument analysis.
pub const SUPPORTED_PAIRS: [&str; 11] = [
    "EUR/USD", "EUR/GBP", "USD/GBP", "EUR/JPY", "EUR/AUD", "EUR/CAD", "EUR/INR", "USD/CNH",
    "EUR/CHF", "EUR/NOK", "EUR/NZD",
];

/// Canonical spelling of a supported pair (`"eur/usd "` -> `"EUR/USD"`).
pub fn canonical_pair(raw: &str) -> Option<&'static str> {
    let wanted = raw.trim().to_ascii_uppercase();
    SUPPORTED_PAIRS.iter().copied().find(|p| *p == wanted)
}

/// Built-in trusted publishers, used when no allow-list config is found.
pub fn default_allowed_sources() -> AllowList {
    [
        "Bloomberg",
        "Reuters",
        "CNBC",
        "Financial Times",
        "Guardian",
        "Yahoo Finance",
        "Barrons",
        "BBC",
        "Forex Live",
        "FXStreet",
        "Market Watch",
        "Economist",
        "Nikkei",
        "Fed",
        "ECB",
        "Zero Hedge",
        "Yahoo",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Dedup, classify and filter feed items.
///
/// Scanning stops as soon as `desired` allow-listed articles are found, so the
/// unfiltered set used for fallback is cut at the same point.
pub fn select_articles<I>(items: I, desired: usize, allowed: &AllowList) -> FetchResult
where
    I: IntoIterator<Item = FeedItem>,
{
    let mut all = Vec::new();
    let mut filtered = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    if desired == 0 {
        return FetchResult {
            articles: Vec::new(),
            used_fallback: false,
        };
    }

    for it in items {
        if it.link.is_empty() || !seen.insert(it.link.clone()) {
            continue;
        }
        let source = classify(&it.title, &it.link);
        let article = Article {
            title: it.title,
            description: it.description,
            source,
            url: it.link,
        };
        if allowed.contains(&article.source) {
            filtered.push(article.clone());
        }
        all.push(article);
        if filtered.len() >= desired {
            break;
        }
    }

    if filtered.len() >= desired {
        filtered.truncate(desired);
        FetchResult {
            articles: filtered,
            used_fallback: false,
        }
    } else {
        all.truncate(desired);
        FetchResult {
            articles: all,
            used_fallback: true,
        }
    }
}

/// Fetches headlines through a [`FeedSource`], memoizing successful results.
pub struct HeadlineFetcher {
    source: Arc<dyn FeedSource>,
    cache: Arc<dyn ExpiringCache<FetchResult>>,
    locks: KeyedLocks,
    feed_base: String,
    ttl: std::time::Duration,
}

impl HeadlineFetcher {
    pub fn new(source: Arc<dyn FeedSource>, feed_base: impl Into<String>) -> Self {
        Self::with_cache(source, feed_base, Arc::new(MemoryCache::new()))
    }

    pub fn with_cache(
        source: Arc<dyn FeedSource>,
        feed_base: impl Into<String>,
        cache: Arc<dyn ExpiringCache<FetchResult>>,
    ) -> Self {
        Self {
            source,
            cache,
            locks: KeyedLocks::new(),
            feed_base: feed_base.into(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn fetch_query(
        &self,
        query: &HeadlineQuery,
        desired: usize,
        allowed: &AllowList,
    ) -> Reported<FetchResult> {
        self.fetch(&query.search_text(), desired, allowed).await
    }

    /// Fetch up to `desired` articles for `query`, preferring allow-listed publishers.
    /// Failures degrade to an empty fallback result and are not cached.
    pub async fn fetch(
        &self,
        query: &str,
        desired: usize,
        allowed: &AllowList,
    ) -> Reported<FetchResult> {
        if desired == 0 {
            return Reported::ok(select_articles(Vec::<FeedItem>::new(), 0, allowed));
        }

        let key = fetch_key(query, desired, allowed);
        if let Some(hit) = self.cache.get(&key) {
            counter!("headlines_cache_hits_total").increment(1);
            return Reported::ok(hit);
        }

        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;
        if let Some(hit) = self.cache.get(&key) {
            counter!("headlines_cache_hits_total").increment(1);
            return Reported::ok(hit);
        }

        counter!("headlines_fetch_total").increment(1);
        let url = feed::search_url(&self.feed_base, query);
        debug!(target: "headlines", %url, desired, source = self.source.name(), "fetching feed");

        let body = self.source.get(&url).await;
        let items = match body.and_then(|b| feed::parse_feed(&b)) {
            Ok(items) => items,
            Err(e) => {
                warn!(target: "headlines", error = %e, query, "headline fetch failed");
                counter!("headlines_errors_total", "kind" => e.kind()).increment(1);
                return Reported::degraded(FetchResult::empty_fallback(), e);
            }
        };

        let result = select_articles(items, desired, allowed);
        if result.used_fallback {
            counter!("headlines_fallback_total").increment(1);
        }
        debug!(
            target: "headlines",
            kept = result.articles.len(),
            fallback = result.used_fallback,
            query,
            "feed processed"
        );

        self.cache.put(&key, result.clone(), Instant::now() + self.ttl);
        Reported::ok(result)
    }
}

fn fetch_key(query: &str, desired: usize, allowed: &AllowList) -> String {
    let count = desired.to_string();
    let parts = [query, count.as_str()]
        .into_iter()
        .chain(allowed.iter().map(String::as_str));
    cache_key("headlines", parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, link: &str) -> FeedItem {
        FeedItem {
            title: title.to_string(),
            description: format!("desc of {title}"),
            link: link.to_string(),
        }
    }

    fn allow(names: &[&str]) -> AllowList {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn quota_met_returns_filtered_without_fallback() {
        let items = vec![
            item("A - Reuters", "https://x/1"),
            item("B - Blog", "https://x/2"),
            item("C - Bloomberg", "https://x/3"),
        ];
        let r = select_articles(items, 2, &allow(&["Reuters", "Bloomberg"]));
        assert!(!r.used_fallback);
        let sources: Vec<_> = r.articles.iter().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, vec!["Reuters", "Bloomberg"]);
    }

    #[test]
    fn quota_missed_returns_all_in_feed_order() {
        let items = vec![
            item("A - Blog", "https://x/1"),
            item("B - Reuters", "https://x/2"),
            item("C - Other", "https://x/3"),
        ];
        let r = select_articles(items, 2, &allow(&["Reuters"]));
        assert!(r.used_fallback);
        let urls: Vec<_> = r.articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x/1", "https://x/2"]);
    }

    #[test]
    fn duplicate_and_empty_links_are_skipped() {
        let items = vec![
            item("A - Reuters", "https://x/1"),
            item("A again - Reuters", "https://x/1"),
            item("No link - Reuters", ""),
            item("A - Reuters", "https://x/2"),
        ];
        let r = select_articles(items, 5, &allow(&["Reuters"]));
        assert!(r.used_fallback);
        assert_eq!(r.articles.len(), 2);
        // same title on a different link is a different article
        assert_eq!(r.articles[0].title, r.articles[1].title);
    }

    #[test]
    fn early_exit_truncates_the_unfiltered_set() {
        // quota 1 met on the first item; nothing after it is looked at
        let items = vec![item("A - Reuters", "https://x/1"), item("B - Blog", "https://x/2")];
        let r = select_articles(items, 1, &allow(&["Reuters"]));
        assert!(!r.used_fallback);
        assert_eq!(r.articles.len(), 1);
    }

    #[test]
    fn zero_desired_is_empty_and_not_fallback() {
        let r = select_articles(vec![item("A - Reuters", "https://x/1")], 0, &allow(&["Reuters"]));
        assert!(r.articles.is_empty());
        assert!(!r.used_fallback);
    }

    #[test]
    fn pairs_are_matched_case_insensitively() {
        assert_eq!(canonical_pair(" eur/usd "), Some("EUR/USD"));
        assert_eq!(canonical_pair("USD/CNH"), Some("USD/CNH"));
        assert_eq!(canonical_pair("BTC/USD"), None);
        assert_eq!(canonical_pair(""), None);
    }

    #[test]
    fn query_variants() {
        assert_eq!(HeadlineQuery::Market.search_text(), "forex market news when:1d");
        assert_eq!(
            HeadlineQuery::Pair(" EUR/USD ".into()).search_text(),
            "EUR/USD forex news when:7d"
        );
    }

    #[test]
    fn fetch_key_depends_on_every_parameter() {
        let a = allow(&["Reuters"]);
        let b = allow(&["Reuters", "BBC"]);
        let k = fetch_key("q", 10, &a);
        assert_eq!(k, fetch_key("q", 10, &a));
        assert_ne!(k, fetch_key("q", 11, &a));
        assert_ne!(k, fetch_key("q2", 10, &a));
        assert_ne!(k, fetch_key("q", 10, &b));
    }

    #[test]
    fn snippet_joins_title_and_description() {
        let a = Article {
            title: "T".into(),
            description: "D".into(),
            source: "S".into(),
            url: "u".into(),
        };
        assert_eq!(a.snippet(), "T — D");
    }
}
