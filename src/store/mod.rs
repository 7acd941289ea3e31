pub mod memory;
pub mod postgres;
pub mod schema;

use crate::domain::{Packet, PacketType};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Filter + paging parameters for [`Store::search`]. `sender` matches either
/// a callsign's full value or its base: `search(sender: Some("N0CALL"))`
/// finds `N0CALL`, `N0CALL-9`, and `N0CALL-15` alike.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub sender: Option<String>,
    pub packet_type: Option<PacketType>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: u32,
    pub page_size: u32,
}

impl SearchFilter {
    /// Normalize page/page_size so callers never have to special-case
    /// page 0 or an absent page size. Query-API-level validation happens
    /// earlier; this just keeps the store itself total.
    pub fn normalized(mut self) -> Self {
        if self.page == 0 {
            self.page = 1;
        }
        if self.page_size == 0 {
            self.page_size = 100;
        }
        self
    }

    pub fn offset(&self) -> i64 {
        ((self.page - 1) as i64) * self.page_size as i64
    }
}

/// Total result count paired with the page of matching rows, enough for
/// the query API to compute `total_pages`/`has_next`/`has_prev`.
pub struct SearchPage {
    pub items: Vec<Packet>,
    pub total_count: i64,
}

/// Durable, indexed append + filtered-read store for packets. A
/// single append-only `Packets` table; the store assigns the integer
/// identity on `add` and never mutates a row afterward.
#[async_trait]
pub trait Store: Send + Sync {
    async fn add(&self, packet: Packet) -> Result<Packet>;
    async fn get_by_id(&self, id: i64) -> Result<Option<Packet>>;
    async fn search(&self, filter: SearchFilter) -> Result<SearchPage>;
}

/// `true` if `sender` (a callsign value or base) matches this packet's
/// sender either exactly or on its base callsign. Shared between the
/// in-memory and Postgres stores so the matching rule can't drift.
pub fn sender_matches(packet_sender_value: &str, packet_sender_base: &str, query: &str) -> bool {
    packet_sender_value.eq_ignore_ascii_case(query) || packet_sender_base.eq_ignore_ascii_case(query)
}
