//! AI adapter: provider abstraction over a single chat-completion call.
//!
//! The sentiment extractor only ever talks to [`ChatModel`]. Concrete providers
//! are the OpenAI Chat Completions API and a scripted mock used by tests and
//! `AI_TEST_MODE=mock` runs.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ai::AiConfig;
use crate::error::PipelineError;

pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
pub const ENV_OPENAI_BASE: &str = "OPENAI_BASE_URL";

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// One chat-completion request: system + user messages and sampling knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Trait object used by the sentiment extractor (and tests).
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the raw reply text.
    fn complete<'a>(
        &'a self,
        req: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, PipelineError>> + Send + 'a>>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynChatModel = Arc<dyn ChatModel>;

/// Factory: build a client according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a mock replying with a canned analysis.
/// * Else if disabled, unknown provider or no key, returns `None` (not configured).
/// * Else builds the OpenAI provider.
pub fn build_chat_model(config: &AiConfig) -> Option<DynChatModel> {
    if std::env::var("AI_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Some(Arc::new(MockChatModel::repeating(MOCK_REPLY)));
    }

    if !config.enabled || !config.has_key() {
        return None;
    }

    match config.provider.as_str() {
        "openai" => OpenAiChatModel::new(config)
            .ok()
            .map(|m| Arc::new(m) as DynChatModel),
        _ => None,
    }
}

// ------------------------------------------------------------
// OpenAI provider
// ------------------------------------------------------------

/// OpenAI provider (Chat Completions API).
pub struct OpenAiChatModel {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiChatModel {
    pub fn new(config: &AiConfig) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .user_agent("treasury-lens/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| PipelineError::Configuration(format!("http client: {e}")))?;
        let base_url = std::env::var(ENV_OPENAI_BASE)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string());
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl ChatModel for OpenAiChatModel {
    fn complete<'a>(
        &'a self,
        req: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, PipelineError>> + Send + 'a>> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Req<'r> {
                model: &'r str,
                messages: &'r [ChatMessage],
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: Option<String>,
            }

            let body = Req {
                model: &self.model,
                messages: &req.messages,
                temperature: req.temperature,
                max_tokens: req.max_tokens,
            };

            let resp = self
                .http
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|e| PipelineError::Model(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                // 401/429 and friends; the body is not echoed back to users.
                return Err(PipelineError::Model(format!("HTTP {status}")));
            }

            let parsed: Resp = resp
                .json()
                .await
                .map_err(|e| PipelineError::Model(format!("decoding completion: {e}")))?;
            Ok(parsed
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default())
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

// ------------------------------------------------------------
// Mock provider
// ------------------------------------------------------------

const MOCK_REPLY: &str = r#"{"summary_points":["**Mock insight** Deterministic reply for local runs."],"overall_sentiment":"Neutral","sentiment_explainer":"Mock mode is active.","counts":{"positive":0,"neutral":1,"negative":0}}"#;

/// Scripted provider: pops replies in order, repeating the last one.
/// Records every request so tests can inspect prompts and count calls.
pub struct MockChatModel {
    replies: Mutex<VecDeque<Result<String, PipelineError>>>,
    last: Mutex<Option<Result<String, PipelineError>>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ChatRequest>>,
}

impl MockChatModel {
    pub fn scripted(replies: Vec<Result<String, PipelineError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(reply: &str) -> Self {
        Self::scripted(vec![Ok(reply.to_string())])
    }

    pub fn failing(error: PipelineError) -> Self {
        Self::scripted(vec![Err(error)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.seen.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn next_reply(&self) -> Result<String, PipelineError> {
        let popped = self.replies.lock().ok().and_then(|mut q| q.pop_front());
        let mut last = match self.last.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        };
        if let Some(r) = popped {
            *last = Some(r);
        }
        last.clone().unwrap_or_else(|| Ok(String::new()))
    }
}

impl ChatModel for MockChatModel {
    fn complete<'a>(
        &'a self,
        req: &'a ChatRequest,
    ) -> Pin<Box<dyn Future<Output = Result<String, PipelineError>> + Send + 'a>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(req.clone());
        }
        let out = self.next_reply();
        Box::pin(async move { out })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> ChatRequest {
        ChatRequest {
            messages: vec![ChatMessage::system("s"), ChatMessage::user("u")],
            temperature: 0.0,
            max_tokens: 10,
        }
    }

    #[tokio::test]
    async fn mock_replays_script_then_repeats_last() {
        let m = MockChatModel::scripted(vec![Ok("a".into()), Ok("b".into())]);
        let r = req();
        assert_eq!(m.complete(&r).await.unwrap(), "a");
        assert_eq!(m.complete(&r).await.unwrap(), "b");
        assert_eq!(m.complete(&r).await.unwrap(), "b");
        assert_eq!(m.calls(), 3);
        assert_eq!(m.requests()[0].messages[1].content, "u");
    }

    #[test]
    fn not_configured_without_key() {
        let cfg = AiConfig {
            api_key: String::new(),
            ..AiConfig::default()
        };
        if std::env::var("AI_TEST_MODE").ok().as_deref() != Some("mock") {
            assert!(build_chat_model(&cfg).is_none());
        }
    }

    #[test]
    fn openai_client_builds_with_key() {
        let cfg = AiConfig {
            api_key: "sk-x".into(),
            ..AiConfig::default()
        };
        let m = build_chat_model(&cfg).expect("configured");
        assert!(matches!(m.provider_name(), "openai" | "mock"));
    }
}
