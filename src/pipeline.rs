use crate::clock::Clock;
use crate::dedup::DedupCache;
use crate::domain::Packet;
use crate::fanout::Fanout;
use crate::parser;
use crate::queue::IngestQueue;
use crate::store::Store;
use crate::stream_client::{StreamClient, StreamClientConfig, StreamEvents};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Bounded queue capacity.
const QUEUE_CAPACITY: usize = 10_000;
/// Concurrent packet-processor workers.
const NUM_WORKERS: usize = 4;
/// Supervisor idle poll interval while connected.
const SUPERVISOR_IDLE_SECS: u64 = 30;
/// Backoff after a failed connection attempt.
const RECONNECT_BACKOFF_SECS: u64 = 5;
/// Queue-depth warning threshold, as a fraction of capacity.
const QUEUE_WARN_THRESHOLD: f64 = 0.5;
/// Max time the supervisor waits for workers to drain the queue on shutdown.
const DRAIN_TIMEOUT_SECS: u64 = 30;

/// Wires the stream client, dedup cache, store, and fan-out broadcaster into
/// the ingestion pipeline: a connection supervisor, a worker pool, and a
/// drain-on-shutdown sequence.
pub struct Pipeline {
    stream: Arc<StreamClient>,
    events: StreamEvents,
    queue: Arc<IngestQueue<Packet>>,
    store: Arc<dyn Store>,
    fanout: Arc<Fanout>,
    dedup: Arc<DedupCache>,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(
        stream_config: StreamClientConfig,
        store: Arc<dyn Store>,
        fanout: Arc<Fanout>,
        dedup: Arc<DedupCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (stream, events) = StreamClient::new(stream_config);
        Pipeline {
            stream,
            events,
            queue: Arc::new(IngestQueue::new(QUEUE_CAPACITY)),
            store,
            fanout,
            dedup,
            clock,
        }
    }

    /// Run the pipeline until `cancel` fires, then drain the queue (up to
    /// 30s) before returning.
    pub async fn run(self, cancel: CancellationToken) {
        let Pipeline { stream, events, queue, store, fanout, dedup, clock } = self;

        let producer = tokio::spawn(run_producer(events.raw_messages, queue.clone(), clock));
        let validated_logger = tokio::spawn(log_validated_events(events.validated));
        let disconnect_logger = tokio::spawn(log_disconnect_events(events.disconnected));

        let workers: Vec<JoinHandle<()>> = (0..NUM_WORKERS)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    queue.clone(),
                    store.clone(),
                    fanout.clone(),
                    dedup.clone(),
                ))
            })
            .collect();

        run_supervisor(&stream, &queue, cancel.clone()).await;

        info!("pipeline cancelled, waiting for the ingest queue to drain");
        let deadline = Instant::now() + Duration::from_secs(DRAIN_TIMEOUT_SECS);
        while queue.depth() > 0 && Instant::now() < deadline {
            sleep(Duration::from_secs(1)).await;
        }
        if queue.depth() > 0 {
            warn!(depth = queue.depth(), "pipeline shutting down with packets still queued");
        }

        producer.abort();
        validated_logger.abort();
        disconnect_logger.abort();
        for worker in workers {
            worker.abort();
        }
        info!("pipeline stopped");
    }
}

async fn run_supervisor(stream: &Arc<StreamClient>, queue: &Arc<IngestQueue<Packet>>, cancel: CancellationToken) {
    info!("pipeline supervisor started");
    while !cancel.is_cancelled() {
        if !stream.is_connected() {
            if let Err(e) = stream.connect(cancel.clone()).await {
                error!(error = %e, "stream client failed to connect");
                tokio::select! {
                    _ = sleep(Duration::from_secs(RECONNECT_BACKOFF_SECS)) => {}
                    _ = cancel.cancelled() => break,
                }
                continue;
            }
        }

        let load_factor = queue.load_factor();
        if load_factor > QUEUE_WARN_THRESHOLD {
            warn!(
                depth = queue.depth(),
                capacity = queue.capacity(),
                load_factor,
                "ingest queue above 50% capacity"
            );
        }

        tokio::select! {
            _ = sleep(Duration::from_secs(SUPERVISOR_IDLE_SECS)) => {}
            _ = cancel.cancelled() => break,
        }
    }
    info!("pipeline supervisor stopped");
}

async fn run_producer(raw_messages: flume::Receiver<String>, queue: Arc<IngestQueue<Packet>>, clock: Arc<dyn Clock>) {
    info!("pipeline producer started");
    while let Ok(line) = raw_messages.recv_async().await {
        let now = clock.now();
        match parser::parse(&line, clock.as_ref(), now) {
            Ok(packet) => {
                if queue.push(packet).is_some() {
                    metrics::counter!("ingest.queue.dropped_total").increment(1);
                    debug!("ingest queue full, dropped oldest packet");
                }
            }
            Err(e) => {
                metrics::counter!("ingest.parse.failed_total").increment(1);
                debug!(error = %e, line, "failed to parse raw APRS-IS line");
            }
        }
    }
    info!("pipeline producer stopped");
}

async fn log_validated_events(validated: flume::Receiver<bool>) {
    while let Ok(ok) = validated.recv_async().await {
        if ok {
            info!("APRS-IS login verified");
        } else {
            warn!("APRS-IS login unverified; continuing in receive-only mode");
        }
    }
}

async fn log_disconnect_events(disconnected: flume::Receiver<()>) {
    while disconnected.recv_async().await.is_ok() {
        warn!("stream client disconnected");
    }
}

async fn run_worker(
    id: usize,
    queue: Arc<IngestQueue<Packet>>,
    store: Arc<dyn Store>,
    fanout: Arc<Fanout>,
    dedup: Arc<DedupCache>,
) {
    info!(worker = id, "pipeline worker started");
    loop {
        let packet = queue.pop().await;
        process_packet(packet, &store, &fanout, &dedup).await;
    }
}

/// Per-packet worker body: fingerprint, dedup check, persist, record,
/// broadcast. Errors in persistence/broadcast are logged, never fatal.
async fn process_packet(packet: Packet, store: &Arc<dyn Store>, fanout: &Arc<Fanout>, dedup: &Arc<DedupCache>) {
    let fingerprint = DedupCache::fingerprint(packet.sender.value(), &packet.raw_content);

    if dedup.contains(fingerprint).await {
        metrics::counter!("dedup.hit_total").increment(1);
        debug!(fingerprint = crate::dedup::fingerprint_hex(fingerprint), "dropping duplicate packet");
        return;
    }
    metrics::counter!("dedup.miss_total").increment(1);

    match store.add(packet).await {
        Ok(stored) => {
            dedup.record(fingerprint).await;
            fanout.publish(stored).await;
        }
        Err(e) => {
            error!(error = %e, "failed to persist packet");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::{Callsign, PacketFields, PacketType};
    use crate::store::memory::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::time::Duration as StdDuration;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap()))
    }

    fn packet(sender: &str, raw: &str) -> Packet {
        Packet::from_fields(
            PacketFields {
                sender: Callsign::parse(sender).unwrap(),
                destination: Callsign::parse("APRS").ok(),
                path: "APRS".to_string(),
                packet_type: PacketType::PositionWithoutTimestamp,
                position: None,
                speed_knots: None,
                course_degrees: None,
                weather: None,
                comment: None,
                symbol_table: None,
                symbol_code: None,
                sent_time: None,
                raw_content: raw.to_string(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn process_packet_persists_and_broadcasts_once_then_dedupes_a_repeat() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let fanout = Arc::new(Fanout::new());
        let dedup = Arc::new(DedupCache::new(StdDuration::from_secs(30)));

        let mut all_rx = fanout.subscribe(&crate::fanout::all_group()).await;

        process_packet(packet("N0CALL", "N0CALL>APRS:>first"), &store, &fanout, &dedup).await;
        process_packet(packet("N0CALL", "N0CALL>APRS:>first"), &store, &fanout, &dedup).await;

        let page = store.search(Default::default()).await.unwrap();
        assert_eq!(page.total_count, 1);
        assert!(all_rx.try_recv().is_ok());
        assert!(all_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn producer_parses_lines_and_drops_unparseable_ones() {
        let queue = Arc::new(IngestQueue::new(10));
        let (tx, rx) = flume::unbounded();
        tx.send("N0CALL>APRS,WIDE1-1:!4903.50N/07201.75W-Test".to_string()).unwrap();
        tx.send("not a valid frame".to_string()).unwrap();
        drop(tx);

        run_producer(rx, queue.clone(), clock()).await;

        assert_eq!(queue.depth(), 1);
    }
}
