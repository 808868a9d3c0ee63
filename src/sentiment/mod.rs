// src/sentiment/mod.rs
//! Model-backed sentiment extraction over a set of headline snippets.
//!
//! `analyze` never fails: every problem (missing key, model error, unparseable
//! reply) degrades to a neutral zero-count record with an explanation naming
//! the failure, and the error travels next to it in [`Reported`].

pub mod parse;
pub mod prompt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::ai_adapter::DynChatModel;
use crate::cache::{cache_key, ExpiringCache, KeyedLocks, MemoryCache, DEFAULT_TTL};
use crate::error::{PipelineError, Reported};
use crate::text::clean_text;

use parse::{Reply, ReplyError};

pub const DEFAULT_SENTIMENT: &str = "neutral";
pub const DEFAULT_EXPLANATION: &str = "No explanation provided.";

pub const NO_HEADLINES: &str = "No headlines available to analyze.";
pub const NO_API_KEY: &str = "No analysis (missing API key).";
pub const API_FAILED: &str = "No explanation (API error).";
pub const EMPTY_REPLY: &str = "No explanation (empty response).";
pub const NON_JSON_REPLY: &str = "No explanation (non-JSON response).";
pub const BAD_JSON_REPLY: &str = "No explanation (JSON parse error).";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub positive: u32,
    pub neutral: u32,
    pub negative: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub bullets: Vec<String>,
    /// Free text from the model, normally one of the five labels.
    pub overall_sentiment: String,
    pub counts: SentimentCounts,
    pub explanation: String,
}

/// Coarse tone of a free-text sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Positive,
    Neutral,
    Negative,
}

impl SentimentRecord {
    pub fn neutral(explanation: &str) -> Self {
        Self {
            bullets: Vec::new(),
            overall_sentiment: DEFAULT_SENTIMENT.to_string(),
            counts: SentimentCounts::default(),
            explanation: explanation.to_string(),
        }
    }

    /// "Trending Negative" counts as negative, "Trending Positive" as positive.
    pub fn tone(&self) -> Tone {
        let s = self.overall_sentiment.trim().to_lowercase();
        if s.contains("negative") {
            Tone::Negative
        } else if s.contains("positive") {
            Tone::Positive
        } else {
            Tone::Neutral
        }
    }

    /// Copy with bullets and explanation passed through [`clean_text`].
    pub fn cleaned(&self) -> Self {
        Self {
            bullets: self.bullets.iter().map(|b| clean_text(b)).collect(),
            overall_sentiment: self.overall_sentiment.clone(),
            counts: self.counts,
            explanation: clean_text(&self.explanation),
        }
    }
}

pub struct SentimentExtractor {
    model: Option<DynChatModel>,
    cache: Arc<dyn ExpiringCache<SentimentRecord>>,
    locks: KeyedLocks,
    ttl: Duration,
    missing_key_logged: AtomicBool,
}

impl SentimentExtractor {
    /// `model = None` means no client is configured; analysis then reports a
    /// configuration error instead of calling out.
    pub fn new(model: Option<DynChatModel>) -> Self {
        Self::with_cache(model, Arc::new(MemoryCache::new()))
    }

    pub fn with_cache(
        model: Option<DynChatModel>,
        cache: Arc<dyn ExpiringCache<SentimentRecord>>,
    ) -> Self {
        Self {
            model,
            cache,
            locks: KeyedLocks::new(),
            ttl: DEFAULT_TTL,
            missing_key_logged: AtomicBool::new(false),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.model.is_some()
    }

    /// Summarize `snippets` into a sentiment record. One model call at most,
    /// no retries.
    pub async fn analyze(&self, snippets: &[String]) -> Reported<SentimentRecord> {
        if snippets.is_empty() {
            return Reported::ok(SentimentRecord::neutral(NO_HEADLINES));
        }

        let Some(model) = self.model.as_ref() else {
            if !self.missing_key_logged.swap(true, Ordering::SeqCst) {
                warn!(target: "sentiment", "model client is not configured; sentiment analysis disabled");
            }
            counter!("sentiment_errors_total", "kind" => "configuration").increment(1);
            return Reported::degraded(
                SentimentRecord::neutral(NO_API_KEY),
                PipelineError::Configuration(
                    "model client is not configured; set OPENAI_API_KEY".to_string(),
                ),
            );
        };

        let key = cache_key("sentiment", snippets);
        if let Some(hit) = self.cache.get(&key) {
            counter!("sentiment_cache_hits_total").increment(1);
            return Reported::ok(hit);
        }

        let lock = self.locks.lock_for(&key);
        let _guard = lock.lock().await;
        if let Some(hit) = self.cache.get(&key) {
            counter!("sentiment_cache_hits_total").increment(1);
            return Reported::ok(hit);
        }

        let req = prompt::build_request(snippets);
        counter!("sentiment_model_calls_total").increment(1);
        debug!(
            target: "sentiment",
            provider = model.provider_name(),
            snippets = snippets.len(),
            "calling model"
        );

        let raw = match model.complete(&req).await {
            Ok(raw) => raw,
            Err(e) => return self.fail(API_FAILED, e),
        };

        let record = match parse::interpret(&raw) {
            Ok(Reply::Record(r)) => r,
            Ok(Reply::Refusal(sentence)) => {
                info!(target: "sentiment", "model refused off-topic input");
                SentimentRecord::neutral(&sentence)
            }
            Err(ReplyError::Empty) => {
                return self.fail(
                    EMPTY_REPLY,
                    PipelineError::Parse("model returned an empty response".to_string()),
                )
            }
            Err(ReplyError::NoJson) => {
                return self.fail(
                    NON_JSON_REPLY,
                    PipelineError::Parse("no JSON object found in model reply".to_string()),
                )
            }
            Err(ReplyError::BadJson(msg)) => {
                return self.fail(
                    BAD_JSON_REPLY,
                    PipelineError::Parse(format!("model JSON: {msg}")),
                )
            }
        };

        self.cache.put(&key, record.clone(), Instant::now() + self.ttl);
        Reported::ok(record)
    }

    fn fail(&self, explanation: &str, error: PipelineError) -> Reported<SentimentRecord> {
        warn!(target: "sentiment", error = %error, "sentiment analysis degraded");
        counter!("sentiment_errors_total", "kind" => error.kind()).increment(1);
        Reported::degraded(SentimentRecord::neutral(explanation), error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: &str) -> SentimentRecord {
        SentimentRecord {
            overall_sentiment: label.to_string(),
            ..SentimentRecord::neutral("x")
        }
    }

    #[test]
    fn tone_follows_label_substrings() {
        assert_eq!(record("Trending Negative").tone(), Tone::Negative);
        assert_eq!(record("Positive").tone(), Tone::Positive);
        assert_eq!(record("trending positive").tone(), Tone::Positive);
        assert_eq!(record("Neutral").tone(), Tone::Neutral);
        assert_eq!(record("mixed").tone(), Tone::Neutral);
    }

    #[test]
    fn cleaned_touches_bullets_and_explanation_only() {
        let r = SentimentRecord {
            bullets: vec!["****Euro****  gains 5billion".into()],
            overall_sentiment: "Trending Positive".into(),
            counts: SentimentCounts {
                positive: 1,
                neutral: 0,
                negative: 0,
            },
            explanation: " inflowsRise ".into(),
        };
        let c = r.cleaned();
        assert_eq!(c.bullets, vec!["**Euro**  gains 5 billion".to_string()]);
        assert_eq!(c.explanation, "inflows Rise");
        assert_eq!(c.overall_sentiment, r.overall_sentiment);
        assert_eq!(c.counts, r.counts);
    }

    #[tokio::test]
    async fn empty_snippets_short_circuit() {
        let ex = SentimentExtractor::new(None);
        let out = ex.analyze(&[]).await;
        assert!(!out.is_degraded());
        assert_eq!(out.value, SentimentRecord::neutral(NO_HEADLINES));
    }

    #[tokio::test]
    async fn missing_client_is_a_configuration_error() {
        let ex = SentimentExtractor::new(None);
        let out = ex.analyze(&["Dollar up".to_string()]).await;
        assert_eq!(out.value.explanation, NO_API_KEY);
        assert_eq!(out.error.as_ref().map(|e| e.kind()), Some("configuration"));
        assert!(!ex.is_configured());
    }
}
