//! `GET /health`: liveness of the database and the dedup cache.

use super::AppState;
use crate::dedup::DedupCache;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use diesel::prelude::*;
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct HealthBody {
    database: bool,
    cache: bool,
}

async fn database_is_reachable(pool: crate::store::postgres::PgPool) -> bool {
    tokio::task::spawn_blocking(move || {
        let mut conn = match pool.get() {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "health check: failed to obtain a database connection");
                return false;
            }
        };
        match diesel::sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "health check: database query failed");
                false
            }
        }
    })
    .await
    .unwrap_or(false)
}

async fn cache_roundtrips(dedup: &DedupCache) -> bool {
    let probe = DedupCache::fingerprint("__health_check__", "probe");
    dedup.record(probe).await;
    dedup.contains(probe).await
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.pool {
        Some(pool) => database_is_reachable(pool.clone()).await,
        None => true,
    };
    let cache = cache_roundtrips(&state.dedup).await;

    let status = if database && cache {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(HealthBody { database, cache }))
}
