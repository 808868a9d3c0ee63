// src/lib.rs
// Public library surface for integration tests (and the binary).

pub mod ai_adapter;
pub mod ai_bootstrap;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod followup;
pub mod headlines;
pub mod sentiment;
pub mod telemetry;
pub mod text;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::error::{PipelineError, Reported};
pub use crate::followup::{FollowUpAssistant, Session};
pub use crate::headlines::{classify, Article, FetchResult, HeadlineFetcher, HeadlineQuery};
pub use crate::sentiment::{SentimentCounts, SentimentExtractor, SentimentRecord};
pub use crate::text::clean_text;
