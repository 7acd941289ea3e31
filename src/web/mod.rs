//! Axum app assembly: shared `AppState`, a permissive CORS layer, and
//! a request-logging middleware. This exposes an API and a websocket,
//! not a web frontend.

pub mod dto;
pub mod error;
pub mod health;
pub mod metrics;
pub mod packets;
pub mod ws;

use crate::dedup::DedupCache;
use crate::fanout::Fanout;
use crate::store::postgres::PgPool;
use crate::store::Store;
use anyhow::Result;
use axum::body::Body;
use axum::http::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

/// State shared across every handler. `pool` is kept alongside `store`
/// purely so `/health` can run a raw `SELECT 1` liveness probe; ordinary
/// reads and writes go through the `Store` trait.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub fanout: Arc<Fanout>,
    pub dedup: Arc<DedupCache>,
    pub pool: Option<PgPool>,
}

async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string()[..8].to_string();
    let start = Instant::now();

    info!(%method, %path, request_id, "request started");
    let response = next.run(request).await;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let status = response.status();

    metrics::counter!("http.requests_total", "path" => path.clone(), "status" => status.as_u16().to_string())
        .increment(1);
    metrics::histogram!("http_request_duration_seconds", "path" => path.clone()).record(elapsed_ms / 1000.0);

    info!(%method, %path, request_id, status = status.as_u16(), elapsed_ms, "request completed");
    response
}

pub fn build_router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/packets", get(packets::search_packets))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_router)
        .route("/hubs/packets", get(ws::packets_websocket))
        .route("/health", get(health::health))
        .with_state(state)
        .merge(metrics::router())
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
}

pub async fn start_web_server(bind: &str, state: AppState) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(%bind, "web server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
