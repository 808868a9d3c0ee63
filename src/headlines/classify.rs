// src/headlines/classify.rs
//! Publisher detection for feed items.
//!
//! Aggregated feeds append the publisher to the title (`"Dollar Gains - Reuters"`).
//! When that suffix is missing we fall back to a host lookup on the article link.

use once_cell::sync::Lazy;
use std::collections::HashMap;

const TITLE_SEPARATOR: &str = " - ";

static HOST_TABLE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("www.bloomberg.com", "Bloomberg"),
        ("bloomberg.com", "Bloomberg"),
        ("www.reuters.com", "Reuters"),
        ("reuters.com", "Reuters"),
        ("www.cnbc.com", "CNBC"),
        ("cnbc.com", "CNBC"),
        ("www.ft.com", "Financial Times"),
        ("ft.com", "Financial Times"),
        ("www.theguardian.com", "Guardian"),
        ("theguardian.com", "Guardian"),
        ("finance.yahoo.com", "Yahoo Finance"),
        ("www.barrons.com", "Barrons"),
        ("www.bbc.co.uk", "BBC"),
        ("www.bbc.com", "BBC"),
        ("www.marketwatch.com", "Market Watch"),
        ("www.economist.com", "Economist"),
        ("asia.nikkei.com", "Nikkei"),
        ("www.ecb.europa.eu", "ECB"),
        ("www.federalreserve.gov", "Fed"),
        ("www.fxstreet.com", "FXStreet"),
        ("www.forexlive.com", "Forex Live"),
        ("www.zerohedge.com", "Zero Hedge"),
    ])
});

/// Canonical publisher name for an article. Pure; never fails.
pub fn classify(title: &str, link: &str) -> String {
    if let Some((_, tail)) = title.rsplit_once(TITLE_SEPARATOR) {
        let len = tail.chars().count();
        if (2..=40).contains(&len) {
            return tail.trim().to_string();
        }
    }

    let host = link_host(link);
    match HOST_TABLE.get(host.as_str()) {
        Some(name) => (*name).to_string(),
        None if host.is_empty() => "Unknown".to_string(),
        None => host,
    }
}

/// Lower-cased host of `link`, or empty when the link has none.
fn link_host(link: &str) -> String {
    url::Url::parse(link.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_title_segment_wins() {
        assert_eq!(
            classify("Dollar Gains - Reuters", "https://example.com/x"),
            "Reuters"
        );
        // only the last separator counts
        assert_eq!(
            classify("Euro - yen cross slips - Financial Times", ""),
            "Financial Times"
        );
    }

    #[test]
    fn segment_length_bounds_apply() {
        // one char: too short, fall through to host
        assert_eq!(classify("Rates - X", "https://www.cnbc.com/a"), "CNBC");
        let long = format!("Headline - {}", "y".repeat(41));
        assert_eq!(classify(&long, "https://www.ft.com/a"), "Financial Times");
        let edge = format!("Headline - {}", "z".repeat(40));
        assert_eq!(classify(&edge, ""), "z".repeat(40));
    }

    #[test]
    fn host_table_lookup() {
        assert_eq!(
            classify("Some Title", "https://www.bloomberg.com/x"),
            "Bloomberg"
        );
        assert_eq!(
            classify("Some Title", "https://WWW.ForexLive.com/news/1"),
            "Forex Live"
        );
    }

    #[test]
    fn unknown_host_and_missing_link() {
        assert_eq!(
            classify("Some Title", "https://news.example.org/a"),
            "news.example.org"
        );
        assert_eq!(classify("Some Title", ""), "Unknown");
        assert_eq!(classify("Some Title", "not a url"), "Unknown");
    }
}
