use super::{sender_matches, SearchFilter, SearchPage, Store};
use crate::domain::Packet;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// In-memory `Store` used by tests and anywhere a live Postgres instance
/// isn't available, keeping the same ordering and pagination semantics as
/// the Postgres-backed implementation.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<Packet>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn add(&self, packet: Packet) -> Result<Packet> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let stored = packet.with_id(id);
        self.rows.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Packet>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == Some(id))
            .cloned())
    }

    async fn search(&self, filter: SearchFilter) -> Result<SearchPage> {
        let filter = filter.normalized();
        let rows = self.rows.lock().unwrap();

        let mut matched: Vec<&Packet> = rows
            .iter()
            .filter(|p| {
                filter
                    .sender
                    .as_ref()
                    .is_none_or(|s| sender_matches(p.sender.value(), p.sender.base(), s))
            })
            .filter(|p| filter.packet_type.is_none_or(|t| p.packet_type == t))
            .filter(|p| filter.from.is_none_or(|from| p.received_at >= from))
            .filter(|p| filter.to.is_none_or(|to| p.received_at <= to))
            .collect();

        matched.sort_by(|a, b| b.received_at.cmp(&a.received_at).then_with(|| b.id.cmp(&a.id)));

        let total_count = matched.len() as i64;
        let start = filter.offset() as usize;
        let items: Vec<Packet> = matched
            .into_iter()
            .skip(start)
            .take(filter.page_size as usize)
            .cloned()
            .collect();

        Ok(SearchPage { items, total_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Callsign, PacketFields, PacketType};
    use chrono::Utc;

    fn packet(sender: &str) -> Packet {
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
                raw_content: "!test".to_string(),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn add_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.add(packet("N0CALL")).await.unwrap();
        let b = store.add(packet("N0CALL")).await.unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
    }

    #[tokio::test]
    async fn add_then_get_by_id_round_trips() {
        let store = MemoryStore::new();
        let stored = store.add(packet("N0CALL")).await.unwrap();
        let fetched = store.get_by_id(stored.id.unwrap()).await.unwrap().unwrap();
        assert_eq!(fetched.sender.value(), "N0CALL");
    }

    #[tokio::test]
    async fn get_by_id_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_filters_by_sender_full_value() {
        let store = MemoryStore::new();
        store.add(packet("N0CALL")).await.unwrap();
        store.add(packet("KF6ABC")).await.unwrap();

        let page = store
            .search(SearchFilter {
                sender: Some("N0CALL".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].sender.value(), "N0CALL");
    }

    #[tokio::test]
    async fn search_by_sender_also_matches_base_callsign() {
        let store = MemoryStore::new();
        store.add(packet("N0CALL-9")).await.unwrap();

        let page = store
            .search(SearchFilter {
                sender: Some("N0CALL".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_count, 1);
    }

    #[tokio::test]
    async fn search_paginates() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.add(packet(&format!("N0CAL{i}"))).await.unwrap();
        }

        let page = store
            .search(SearchFilter {
                page: 1,
                page_size: 2,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 5);
    }

    #[tokio::test]
    async fn search_orders_by_received_at_descending_then_id_descending() {
        let store = MemoryStore::new();
        let a = store.add(packet("N0CALL")).await.unwrap();
        let b = store.add(packet("N0CALL")).await.unwrap();

        let page = store.search(SearchFilter::default()).await.unwrap();
        // Both packets share a received_at close enough in practice to tie;
        // descending id breaks ties so the most recently added comes first.
        assert_eq!(page.items[0].id, b.id.max(a.id));
    }
}
