// src/metrics.rs
use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_all);
}

/// Descriptions go to whichever recorder is installed at call time.
fn describe_all() {
    describe_counter!("relay_cycles_total", "Poll cycles started.");
    describe_counter!(
        "relay_cycle_errors_total",
        "Cycles that failed to fetch or parse the feed."
    );
    describe_counter!("relay_posts_sent_total", "Posts delivered to the chat.");
    describe_counter!(
        "relay_dispatch_failures_total",
        "Posts whose primary send and fallback both failed."
    );
    describe_counter!(
        "relay_cursor_persist_errors_total",
        "Cursor writes that no backend accepted."
    );
    describe_counter!("relay_feed_http_errors_total", "Feed HTTP request failures.");
    describe_histogram!("relay_feed_parse_ms", "Feed parse time in milliseconds.");
    describe_gauge!("relay_last_cycle_ts", "Unix ts of the last successful fetch.");
}

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already set.
    /// Call before anything records, or those early samples are lost.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe_all();
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
