//! `GET /metrics`: Prometheus exposition via `metrics` +
//! `metrics-exporter-prometheus`. No CPU/heap profiling endpoint here;
//! that's deploy-specific tooling this service doesn't need.

use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder once, at process start.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full(
                "http_request_duration_seconds".to_string(),
            ),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("failed to set buckets for http_request_duration_seconds")
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let _ = METRICS_HANDLE.set(handle.clone());
    handle
}

async fn render() -> impl IntoResponse {
    match METRICS_HANDLE.get() {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/metrics", get(render))
}
