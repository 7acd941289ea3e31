use anyhow::{Context, Result};
use aprsis_ingest::config::Cli;
use aprsis_ingest::dedup::DedupCache;
use aprsis_ingest::fanout::Fanout;
use aprsis_ingest::pipeline::Pipeline;
use aprsis_ingest::store::postgres::{PgPool, PostgresStore};
use aprsis_ingest::store::Store;
use aprsis_ingest::stream_client::StreamClientConfig;
use aprsis_ingest::web::{self, AppState};
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_pool(database_url: &str) -> Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .build(manager)
        .context("failed to build the Postgres connection pool")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::load();
    init_tracing(&cli.log_level);
    web::metrics::init_metrics();

    info!(version = env!("CARGO_PKG_VERSION"), "starting aprsis-ingest");

    let pool = build_pool(&cli.database_url)?;
    let store: Arc<dyn Store> = Arc::new(PostgresStore::new(pool.clone()));
    let fanout = Arc::new(Fanout::new());
    let dedup = Arc::new(DedupCache::new(Duration::from_secs(cli.cache_ttl_seconds)));
    let clock = Arc::new(aprsis_ingest::clock::SystemClock);

    let stream_config = StreamClientConfig {
        server: cli.server.clone(),
        port: cli.port,
        callsign: cli.callsign.clone(),
        password: cli.password.clone(),
        filter: cli.filter.clone(),
        archive_dir: cli.archive_dir.clone(),
    };

    let pipeline = Pipeline::new(stream_config, store.clone(), fanout.clone(), dedup.clone(), clock);

    let cancel = CancellationToken::new();

    let pipeline_handle = tokio::spawn(pipeline.run(cancel.clone()));

    let web_state = AppState {
        store,
        fanout,
        dedup,
        pool: Some(pool),
    };
    let http_bind = cli.http_bind.clone();
    let web_cancel = cancel.clone();
    let web_handle = tokio::spawn(async move {
        tokio::select! {
            result = web::start_web_server(&http_bind, web_state) => {
                if let Err(e) = result {
                    error!(error = %e, "web server exited with an error");
                }
            }
            _ = web_cancel.cancelled() => {}
        }
    });

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown signal received");
    cancel.cancel();

    let _ = pipeline_handle.await;
    let _ = web_handle.await;

    info!("aprsis-ingest stopped");
    Ok(())
}
