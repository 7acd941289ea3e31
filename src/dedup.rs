use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Fingerprint cache that lets the ingestion pipeline recognize the same
/// raw line arriving twice within a short window (a common side effect of
/// connecting to more than one APRS-IS port) without hitting the store.
pub struct DedupCache {
    seen: Cache<u64, ()>,
}

impl DedupCache {
    pub fn new(ttl: Duration) -> Self {
        DedupCache {
            seen: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Fingerprint a packet as `sha256(sender ':' raw_content)` truncated to
    /// its first 8 bytes.
    pub fn fingerprint(sender: &str, raw_content: &str) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(sender.as_bytes());
        hasher.update(b":");
        hasher.update(raw_content.as_bytes());
        let digest = hasher.finalize();
        u64::from_be_bytes(digest[0..8].try_into().unwrap())
    }

    /// `true` if this fingerprint was already recorded within the TTL
    /// window. Recording is a separate step (`record`) so callers can
    /// decide whether a duplicate warrants logging before committing it.
    pub async fn contains(&self, fingerprint: u64) -> bool {
        self.seen.get(&fingerprint).await.is_some()
    }

    pub async fn record(&self, fingerprint: u64) {
        self.seen.insert(fingerprint, ()).await;
    }

    #[cfg(test)]
    pub async fn entry_count(&self) -> u64 {
        self.seen.run_pending_tasks().await;
        self.seen.entry_count()
    }
}

/// Render a fingerprint the same way for logs and the fingerprint column.
pub fn fingerprint_hex(fingerprint: u64) -> String {
    hex::encode(fingerprint.to_be_bytes())
}
