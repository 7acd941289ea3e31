//! Configuration loading: environment variables via `dotenvy`,
//! overridable by CLI flags via `clap`'s `derive`+`env` pattern.

use clap::Parser;
use tracing::warn;

/// The callsign the stream client logs in with if nothing else is
/// configured. Logged as a warning at startup since it can only
/// ever receive in listen-only mode.
pub const DEFAULT_CALLSIGN: &str = "N0CALL";

#[derive(Debug, Clone, Parser)]
#[command(name = "aprsis-ingest", version, about = "APRS-IS ingestion, storage, and fan-out service")]
pub struct Cli {
    /// APRS-IS login callsign.
    #[arg(long, env = "APRS_CALLSIGN", default_value = DEFAULT_CALLSIGN)]
    pub callsign: String,

    /// APRS-IS login passcode. `-1` logs in receive-only.
    #[arg(long, env = "APRS_PASSWORD", default_value = "-1")]
    pub password: String,

    /// APRS-IS server-side filter string.
    #[arg(long, env = "APRS_FILTER", default_value = "r/52/21/500")]
    pub filter: Option<String>,

    /// APRS-IS server hostname.
    #[arg(long, env = "APRS_SERVER", default_value = "rotate.aprs2.net")]
    pub server: String,

    /// APRS-IS server port.
    #[arg(long, env = "APRS_PORT", default_value_t = 14580)]
    pub port: u16,

    /// Directory to archive raw, pre-parse lines into, one file per day.
    #[arg(long, env = "APRS_ARCHIVE_DIR")]
    pub archive_dir: Option<std::path::PathBuf>,

    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Dedup fingerprint cache TTL, in seconds.
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value_t = 30)]
    pub cache_ttl_seconds: u64,

    /// HTTP bind address for the query API, websocket, health, and metrics.
    #[arg(long, env = "HTTP_BIND", default_value = "0.0.0.0:8080")]
    pub http_bind: String,

    /// Minimum log level, overriding `RUST_LOG` when set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Parse CLI flags, falling back to environment variables (loaded from
    /// a `.env` file first, if present) for anything not passed explicitly.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        let cli = Cli::parse();
        if cli.callsign == DEFAULT_CALLSIGN {
            warn!(
                "APRS_CALLSIGN left at default '{}'; this connection can only receive, never validate an uplink identity",
                DEFAULT_CALLSIGN
            );
        }
        cli
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_match_section_6_6() {
        let cli = Cli::parse_from(["aprsis-ingest", "--database-url", "postgres://x"]);
        assert_eq!(cli.callsign, "N0CALL");
        assert_eq!(cli.password, "-1");
        assert_eq!(cli.filter.as_deref(), Some("r/52/21/500"));
        assert_eq!(cli.cache_ttl_seconds, 30);
        assert_eq!(cli.http_bind, "0.0.0.0:8080");
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "aprsis-ingest",
            "--database-url",
            "postgres://x",
            "--callsign",
            "KF6ABC-9",
            "--cache-ttl-seconds",
            "60",
        ]);
        assert_eq!(cli.callsign, "KF6ABC-9");
        assert_eq!(cli.cache_ttl_seconds, 60);
    }
}
