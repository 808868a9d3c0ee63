use anyhow::Context;
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use shuttle_axum::axum::{routing::get, Router};

use crate::cache::DEFAULT_TTL;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe the pipeline series.
    /// Fails if a global recorder is already installed.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("headlines_fetch_total", "Feed requests sent (cache misses).");
        describe_counter!("headlines_cache_hits_total", "Headline fetches served from cache.");
        describe_counter!(
            "headlines_fallback_total",
            "Fetches that fell back to unfiltered sources."
        );
        describe_counter!("headlines_errors_total", "Feed transport/parse failures.");
        describe_counter!("sentiment_model_calls_total", "Model completions requested.");
        describe_counter!("sentiment_cache_hits_total", "Analyses served from cache.");
        describe_counter!(
            "sentiment_errors_total",
            "Analyses degraded to the neutral fallback record."
        );

        describe_counter!("followup_calls_total", "Follow-up completions requested.");
        describe_counter!("followup_errors_total", "Follow-up questions left unanswered.");

        // Static gauge with the memoization horizon (absolute TTL, no sliding refresh)
        gauge!("pipeline_cache_ttl_secs").set(DEFAULT_TTL.as_secs() as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
