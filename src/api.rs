use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::ai_bootstrap::AiRuntime;
use crate::config::sources::load_allowed_default;
use crate::followup::{FollowUpAssistant, Session, Turn};
use crate::headlines::{
    canonical_pair, default_allowed_sources, feed, AllowList, Article, FetchResult,
    HeadlineFetcher, HeadlineQuery, HttpFeedSource, SUPPORTED_PAIRS,
};
use crate::sentiment::{SentimentExtractor, SentimentRecord, Tone};

pub const DEFAULT_COUNT: usize = 10;
pub const MAX_COUNT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub headlines: Arc<HeadlineFetcher>,
    pub sentiment: Arc<SentimentExtractor>,
    pub followup: Arc<FollowUpAssistant>,
    pub allowed: Arc<AllowList>,
}

impl AppState {
    pub fn new(
        headlines: HeadlineFetcher,
        sentiment: SentimentExtractor,
        followup: FollowUpAssistant,
        allowed: AllowList,
    ) -> Self {
        Self {
            headlines: Arc::new(headlines),
            sentiment: Arc::new(sentiment),
            followup: Arc::new(followup),
            allowed: Arc::new(allowed),
        }
    }

    /// Live wiring: HTTP feed, model from `config/ai.json` / env, allow-list from config.
    pub fn from_env() -> anyhow::Result<Self> {
        let source = HttpFeedSource::new()?;
        let fetcher = HeadlineFetcher::new(Arc::new(source), feed::feed_base_from_env());

        let ai = AiRuntime::from_env();
        let extractor = SentimentExtractor::new(ai.model.clone());
        let followup = FollowUpAssistant::new(ai.model);

        let allowed = load_allowed_default().unwrap_or_else(|e| {
            warn!(error = ?e, "allowed sources config unreadable; using built-in list");
            default_allowed_sources()
        });
        info!(allowed = allowed.len(), "allowed sources loaded");

        Ok(Self::new(fetcher, extractor, followup, allowed))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/pairs", get(pairs))
        .route("/headlines/market", get(headlines_market))
        .route("/headlines/pair", get(headlines_pair))
        .route("/sentiment", post(sentiment))
        .route("/followup", post(followup))
        .route("/insights/market", get(insights_market))
        .route("/insights/pair", get(insights_pair))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
struct CountQuery {
    #[serde(default)]
    count: Option<usize>,
}

#[derive(Deserialize)]
struct PairQuery {
    #[serde(default)]
    pair: String,
    #[serde(default)]
    count: Option<usize>,
}

#[derive(Deserialize)]
struct SentimentReq {
    snippets: Vec<String>,
}

#[derive(Deserialize)]
struct FollowUpReq {
    #[serde(flatten)]
    session: Session,
    question: String,
}

#[derive(Serialize)]
struct FollowUpResp {
    answer: Option<String>,
    history: Vec<Turn>,
    error: Option<String>,
}

#[derive(Serialize)]
struct HeadlinesResp {
    articles: Vec<Article>,
    used_fallback: bool,
    error: Option<String>,
}

#[derive(Serialize)]
struct SentimentResp {
    #[serde(flatten)]
    record: SentimentRecord,
    tone: Tone,
    error: Option<String>,
}

#[derive(Serialize)]
struct InsightsResp {
    query: String,
    articles: Vec<Article>,
    used_fallback: bool,
    sentiment: SentimentRecord,
    tone: Tone,
    /// User-visible messages: fallback note first, then errors.
    notices: Vec<String>,
    fetched_at: DateTime<Utc>,
}

type ApiError = (StatusCode, String);

fn clamp_count(c: Option<usize>) -> usize {
    c.unwrap_or(DEFAULT_COUNT).clamp(1, MAX_COUNT)
}

fn pair_or_400(raw: &str) -> Result<&'static str, ApiError> {
    canonical_pair(raw).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("unsupported currency pair: '{}'", raw.trim()),
        )
    })
}

async fn pairs() -> Json<Vec<&'static str>> {
    Json(SUPPORTED_PAIRS.to_vec())
}

async fn headlines_market(
    State(state): State<AppState>,
    Query(q): Query<CountQuery>,
) -> Json<HeadlinesResp> {
    let out = state
        .headlines
        .fetch_query(&HeadlineQuery::Market, clamp_count(q.count), &state.allowed)
        .await;
    let error = out.message();
    Json(HeadlinesResp {
        articles: out.value.articles,
        used_fallback: out.value.used_fallback,
        error,
    })
}

async fn headlines_pair(
    State(state): State<AppState>,
    Query(q): Query<PairQuery>,
) -> Result<Json<HeadlinesResp>, ApiError> {
    let pair = pair_or_400(&q.pair)?;
    let out = state
        .headlines
        .fetch_query(
            &HeadlineQuery::Pair(pair.to_string()),
            clamp_count(q.count),
            &state.allowed,
        )
        .await;
    let error = out.message();
    Ok(Json(HeadlinesResp {
        articles: out.value.articles,
        used_fallback: out.value.used_fallback,
        error,
    }))
}

async fn sentiment(
    State(state): State<AppState>,
    Json(body): Json<SentimentReq>,
) -> Json<SentimentResp> {
    let out = state.sentiment.analyze(&body.snippets).await;
    let error = out.message();
    let tone = out.value.tone();
    Json(SentimentResp {
        record: out.value,
        tone,
        error,
    })
}

async fn followup(
    State(state): State<AppState>,
    Json(body): Json<FollowUpReq>,
) -> Result<Json<FollowUpResp>, ApiError> {
    if body.question.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "question must not be empty".to_string(),
        ));
    }
    let out = state.followup.ask(&body.session, &body.question).await;
    let error = out.message();
    Ok(Json(FollowUpResp {
        answer: out.value.answer,
        history: out.value.history,
        error,
    }))
}

async fn insights_market(
    State(state): State<AppState>,
    Query(q): Query<CountQuery>,
) -> Json<InsightsResp> {
    let note = "Not enough trusted news sources (e.g., Bloomberg, Reuters) were found. \
                Analysis is based on broader sources."
        .to_string();
    Json(run_insights(&state, HeadlineQuery::Market, clamp_count(q.count), note).await)
}

async fn insights_pair(
    State(state): State<AppState>,
    Query(q): Query<PairQuery>,
) -> Result<Json<InsightsResp>, ApiError> {
    let pair = pair_or_400(&q.pair)?;
    let note =
        format!("Not enough trusted news sources for {pair}. Using broader news coverage instead.");
    let query = HeadlineQuery::Pair(pair.to_string());
    Ok(Json(
        run_insights(&state, query, clamp_count(q.count), note).await,
    ))
}

/// Fetch, analyze, clean for display. Never fails; problems become notices.
async fn run_insights(
    state: &AppState,
    query: HeadlineQuery,
    count: usize,
    fallback_note: String,
) -> InsightsResp {
    let fetched = state
        .headlines
        .fetch_query(&query, count, &state.allowed)
        .await;
    let FetchResult {
        articles,
        used_fallback,
    } = fetched.value.clone();

    let snippets = fetched.value.snippets();
    let analyzed = state.sentiment.analyze(&snippets).await;

    let mut notices = Vec::new();
    if used_fallback {
        notices.push(fallback_note);
    }
    notices.extend(fetched.message());
    notices.extend(analyzed.message());

    let sentiment = analyzed.value.cleaned();
    let tone = sentiment.tone();
    InsightsResp {
        query: query.search_text(),
        articles,
        used_fallback,
        sentiment,
        tone,
        notices,
        fetched_at: Utc::now(),
    }
}
