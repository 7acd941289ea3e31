use crate::error::{Error, Result};
use std::fs::{create_dir_all, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Raw-line archive, rotated daily. Optional: every line is logged
/// pre-parse, before dispatch to the raw-message channel.
struct MessageArchive {
    base_dir: PathBuf,
    current_file: Mutex<Option<(String, std::fs::File)>>,
}

impl MessageArchive {
    fn new(base_dir: PathBuf) -> Self {
        MessageArchive {
            base_dir,
            current_file: Mutex::new(None),
        }
    }

    fn log_message(&self, message: &str) {
        let now = chrono::Utc::now();
        let date = now.format("%Y-%m-%d").to_string();

        let mut slot = self.current_file.lock().unwrap();
        if slot.as_ref().map(|(d, _)| d) != Some(&date) {
            if let Err(e) = create_dir_all(&self.base_dir) {
                warn!(error = %e, dir = %self.base_dir.display(), "failed to create archive directory");
                return;
            }
            let path = self.base_dir.join(format!("{date}.log"));
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => *slot = Some((date, file)),
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "failed to open archive log file");
                    return;
                }
            }
        }

        if let Some((_, file)) = slot.as_mut() {
            let timestamp = now.format("%H:%M:%S").to_string();
            if let Err(e) = writeln!(file, "[{timestamp}] {message}") {
                warn!(error = %e, "failed to write to archive log file");
            }
        }
    }
}

/// Configuration for a single APRS-IS connection.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    pub server: String,
    pub port: u16,
    pub callsign: String,
    pub password: String,
    pub filter: Option<String>,
    pub archive_dir: Option<PathBuf>,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        StreamClientConfig {
            server: "rotate.aprs2.net".to_string(),
            port: 14580,
            callsign: "N0CALL".to_string(),
            password: "-1".to_string(),
            filter: Some("r/52/21/500".to_string()),
            archive_dir: None,
        }
    }
}

fn build_login_command(config: &StreamClientConfig) -> String {
    let mut cmd = format!(
        "user {} pass {} vers aprsis-ingest {}",
        config.callsign,
        config.password,
        env!("CARGO_PKG_VERSION")
    );
    if let Some(filter) = &config.filter {
        cmd.push_str(" filter ");
        cmd.push_str(filter);
    }
    cmd.push_str("\r\n");
    cmd
}

/// The three event channels a stream client surfaces to one consumer each:
/// raw messages, login validation, and disconnects.
pub struct StreamEvents {
    pub raw_messages: flume::Receiver<String>,
    pub validated: flume::Receiver<bool>,
    pub disconnected: flume::Receiver<()>,
}

/// Long-lived, single-connection APRS-IS TCP client.
///
/// `connect` performs the TCP handshake and login synchronously, then
/// launches the line-reading loop as a background task; reconnect policy
/// (fixed 5s backoff, no retry cap) lives one layer up in the ingestion
/// pipeline's supervisor, not here.
pub struct StreamClient {
    config: StreamClientConfig,
    connected: AtomicBool,
    raw_tx: flume::Sender<String>,
    validated_tx: flume::Sender<bool>,
    disconnected_tx: flume::Sender<()>,
    archive: Option<MessageArchive>,
}

impl StreamClient {
    pub fn new(config: StreamClientConfig) -> (Arc<Self>, StreamEvents) {
        let (raw_tx, raw_messages) = flume::unbounded();
        let (validated_tx, validated) = flume::unbounded();
        let (disconnected_tx, disconnected) = flume::unbounded();
        let archive = config.archive_dir.clone().map(MessageArchive::new);

        let client = Arc::new(StreamClient {
            config,
            connected: AtomicBool::new(false),
            raw_tx,
            validated_tx,
            disconnected_tx,
            archive,
        });
        (client, StreamEvents { raw_messages, validated, disconnected })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Connect and log in, then hand the read loop to a background task.
    /// Returns once login has been sent, not once the connection ends.
    /// Fails immediately with `InvalidState` if already connected.
    pub async fn connect(self: &Arc<Self>, cancel: CancellationToken) -> Result<()> {
        if self.connected.swap(true, Ordering::SeqCst) {
            return Err(Error::InvalidState(
                "stream client is already connected".to_string(),
            ));
        }

        match self.open_and_login().await {
            Ok(reader) => {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    this.read_loop(reader, cancel).await;
                    this.connected.store(false, Ordering::SeqCst);
                    let _ = this.disconnected_tx.send(());
                    info!("APRS-IS connection closed");
                });
                Ok(())
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn open_and_login(&self) -> Result<BufReader<OwnedReadHalf>> {
        let addr = format!("{}:{}", self.config.server, self.config.port);
        info!(%addr, "connecting to APRS-IS");

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        let (reader, mut writer) = stream.into_split();

        let login = build_login_command(&self.config);
        writer
            .write_all(login.as_bytes())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;
        writer.flush().await.map_err(|e| Error::Internal(e.to_string()))?;
        debug!(command = login.trim(), "sent login command");

        Ok(BufReader::new(reader))
    }

    async fn read_loop(&self, mut reader: BufReader<OwnedReadHalf>, cancel: CancellationToken) {
        let mut line = String::new();
        loop {
            line.clear();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("stream client cancelled, closing connection");
                    return;
                }
                read = reader.read_line(&mut line) => {
                    let n = match read {
                        Ok(n) => n,
                        Err(e) => {
                            warn!(error = %e, "APRS-IS read error");
                            return;
                        }
                    };
                    if n == 0 {
                        warn!("APRS-IS server closed the connection");
                        return;
                    }

                    let trimmed = line.trim_end_matches(['\r', '\n']);
                    if trimmed.is_empty() {
                        continue;
                    }

                    if let Some(archive) = &self.archive {
                        archive.log_message(trimmed);
                    }

                    if let Some(server_message) = trimmed.strip_prefix('#') {
                        self.handle_server_message(server_message);
                    } else {
                        let _ = self.raw_tx.send(trimmed.to_string());
                    }
                }
            }
        }
    }

    fn handle_server_message(&self, message: &str) {
        debug!(message, "server message");
        if message.contains("logresp") {
            let verified = message.to_lowercase().contains("verified");
            if verified {
                info!("APRS-IS login verified");
            } else {
                warn!("APRS-IS login unverified, continuing in receive-only mode");
            }
            let _ = self.validated_tx.send(verified);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_command_includes_filter() {
        let config = StreamClientConfig {
            server: "test.aprs.net".to_string(),
            port: 14580,
            callsign: "TEST123".to_string(),
            password: "12345".to_string(),
            filter: Some("r/47.0/-122.0/100".to_string()),
            archive_dir: None,
        };
        let cmd = build_login_command(&config);
        assert_eq!(
            cmd,
            format!(
                "user TEST123 pass 12345 vers aprsis-ingest {} filter r/47.0/-122.0/100\r\n",
                env!("CARGO_PKG_VERSION")
            )
        );
    }

    #[test]
    fn login_command_without_filter() {
        let config = StreamClientConfig {
            server: "test.aprs.net".to_string(),
            port: 14580,
            callsign: "TEST123".to_string(),
            password: "-1".to_string(),
            filter: None,
            archive_dir: None,
        };
        let cmd = build_login_command(&config);
        assert_eq!(
            cmd,
            format!("user TEST123 pass -1 vers aprsis-ingest {}\r\n", env!("CARGO_PKG_VERSION"))
        );
    }

    #[tokio::test]
    async fn second_connect_while_connected_fails_with_invalid_state() {
        let (client, _events) = StreamClient::new(StreamClientConfig::default());
        client.connected.store(true, Ordering::SeqCst);

        let err = client.connect(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn connect_to_unreachable_port_fails_and_resets_connected_flag() {
        let (client, _events) = StreamClient::new(StreamClientConfig {
            server: "127.0.0.1".to_string(),
            port: 1, // nothing listens here
            ..StreamClientConfig::default()
        });

        assert!(client.connect(CancellationToken::new()).await.is_err());
        assert!(!client.is_connected());
    }

    #[test]
    fn archive_writes_raw_lines_to_a_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let archive = MessageArchive::new(dir.path().to_path_buf());
        archive.log_message("N0CALL>APRS:>hello");

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let contents = std::fs::read_to_string(dir.path().join(format!("{today}.log"))).unwrap();
        assert!(contents.contains("N0CALL>APRS:>hello"));
    }
}
