use crate::domain::{GeoCoordinate, Packet};
use crate::error::Error;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

const CHANNEL_CAPACITY: usize = 256;

/// Registry of broadcast channels keyed by subscription group. A packet is
/// published to the `all` group plus the callsign and area-cell groups it
/// matches; each group fans out independently so a slow or absent
/// subscriber to one group never blocks delivery to another.
#[derive(Clone)]
pub struct Fanout {
    groups: Arc<RwLock<HashMap<String, broadcast::Sender<Arc<Packet>>>>>,
}

impl Default for Fanout {
    fn default() -> Self {
        Fanout {
            groups: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

pub fn all_group() -> String {
    "all".to_string()
}

pub fn callsign_group(callsign: &str) -> String {
    format!("callsign:{}", callsign.to_uppercase())
}

pub fn area_group(lat_cell: i64, lon_cell: i64) -> String {
    format!("area:{lat_cell}_{lon_cell}")
}

/// Validate and normalize a callsign subscription target: non-empty,
/// uppercased.
pub fn normalize_callsign(input: &str) -> Result<String, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("callsign", "must not be empty"));
    }
    Ok(trimmed.to_uppercase())
}

/// Validate an area subscription request. `radius_km` is advisory only —
/// matching is always by exact 1x1 degree cell, never by distance — but an
/// out-of-range radius is still rejected so the field can't silently mean
/// something other than what the client believes it does.
pub fn validate_area(latitude: f64, longitude: f64, radius_km: f64) -> Result<GeoCoordinate, Error> {
    if !(1.0..=1000.0).contains(&radius_km) {
        return Err(Error::validation("radius_km", "must be between 1 and 1000"));
    }
    GeoCoordinate::new(latitude, longitude)
}

impl Fanout {
    pub fn new() -> Self {
        Fanout::default()
    }

    async fn sender_for(&self, group: &str) -> broadcast::Sender<Arc<Packet>> {
        if let Some(tx) = self.groups.read().await.get(group) {
            return tx.clone();
        }
        let mut write = self.groups.write().await;
        write
            .entry(group.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Subscribe to a named group, creating its channel if this is the
    /// first subscriber.
    pub async fn subscribe(&self, group: &str) -> broadcast::Receiver<Arc<Packet>> {
        self.sender_for(group).await.subscribe()
    }

    /// Drop a group's channel once nobody is listening to it anymore, so
    /// the registry doesn't grow without bound as clients churn through
    /// callsign and area subscriptions.
    pub async fn sweep(&self, group: &str) {
        let mut write = self.groups.write().await;
        if let Some(tx) = write.get(group) {
            if tx.receiver_count() == 0 {
                write.remove(group);
            }
        }
    }

    /// Publish a packet to every group it matches: `all`, the sender's
    /// callsign (and its base callsign if the full value carries an
    /// SSID), and the position's area cell if it decoded a position.
    pub async fn publish(&self, packet: Packet) {
        let packet = Arc::new(packet);

        let mut groups = vec![all_group(), callsign_group(packet.sender.value())];
        if packet.sender.ssid() != 0 {
            groups.push(callsign_group(packet.sender.base()));
        }
        if let Some(position) = packet.position {
            let (lat_cell, lon_cell) = position.area_cell();
            groups.push(area_group(lat_cell, lon_cell));
        }
        groups.dedup();

        for group in groups {
            let tx = self.sender_for(&group).await;
            // A send error just means nobody is currently subscribed;
            // that's the common case and not worth logging per-packet.
            if tx.receiver_count() > 0 {
                if let Err(err) = tx.send(packet.clone()) {
                    warn!(%group, "fanout send failed despite a receiver count: {err}");
                }
            }
        }
    }

    pub async fn group_count(&self) -> usize {
        self.groups.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Callsign, PacketFields, PacketType};
    use chrono::Utc;

    fn packet(sender: &str, position: Option<GeoCoordinate>) -> Packet {
        Packet::from_fields(
            PacketFields {
                sender: Callsign::parse(sender).unwrap(),
                destination: Callsign::parse("APRS").ok(),
                path: "APRS".to_string(),
                packet_type: PacketType::PositionWithoutTimestamp,
                position,
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
    async fn all_subscriber_receives_every_packet() {
        let fanout = Fanout::new();
        let mut rx = fanout.subscribe(&all_group()).await;
        fanout.publish(packet("N0CALL", None)).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.sender.value(), "N0CALL");
    }

    #[tokio::test]
    async fn callsign_subscriber_only_sees_matching_sender() {
        let fanout = Fanout::new();
        let mut rx = fanout.subscribe(&callsign_group("N0CALL")).await;
        fanout.publish(packet("KF6ABC", None)).await;
        fanout.publish(packet("N0CALL", None)).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.sender.value(), "N0CALL");
    }

    #[tokio::test]
    async fn base_callsign_group_catches_ssid_variants() {
        let fanout = Fanout::new();
        let mut rx = fanout.subscribe(&callsign_group("N0CALL")).await;
        fanout.publish(packet("N0CALL-9", None)).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.sender.value(), "N0CALL-9");
    }

    #[tokio::test]
    async fn area_subscriber_sees_packets_in_its_cell() {
        let fanout = Fanout::new();
        let position = GeoCoordinate::new(52.9, 21.9).unwrap();
        let mut rx = fanout.subscribe(&area_group(52, 21)).await;
        fanout.publish(packet("N0CALL", Some(position))).await;
        let received = rx.recv().await.unwrap();
        assert!(received.position.is_some());
    }

    #[test]
    fn validate_area_rejects_out_of_range_radius() {
        assert!(validate_area(0.0, 0.0, 0.5).is_err());
        assert!(validate_area(0.0, 0.0, 1001.0).is_err());
        assert!(validate_area(0.0, 0.0, 50.0).is_ok());
    }

    #[test]
    fn normalize_callsign_rejects_empty() {
        assert!(normalize_callsign("   ").is_err());
        assert_eq!(normalize_callsign(" n0call ").unwrap(), "N0CALL");
    }
}
