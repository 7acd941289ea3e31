use crate::domain::callsign::Callsign;
use crate::domain::geo::GeoCoordinate;
use crate::domain::weather::WeatherData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of payload a packet's information field decoded to.
///
/// `PositionWithoutTimestamp`/`PositionWithTimestamp` are produced by the
/// parser; `Telemetry`/`Object`/`Item` exist so the column layout and the
/// query API can round-trip them, but the dispatch table in
/// [`crate::parser`] never emits them itself — decoding those payloads
/// beyond bare identification is out of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketType {
    PositionWithoutTimestamp,
    PositionWithTimestamp,
    Message,
    Telemetry,
    Status,
    Object,
    Item,
    Weather,
    MicE,
    Unknown,
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PacketType::PositionWithoutTimestamp => "position_without_timestamp",
            PacketType::PositionWithTimestamp => "position_with_timestamp",
            PacketType::Message => "message",
            PacketType::Telemetry => "telemetry",
            PacketType::Status => "status",
            PacketType::Object => "object",
            PacketType::Item => "item",
            PacketType::Weather => "weather",
            PacketType::MicE => "mic_e",
            PacketType::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PacketType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "position_without_timestamp" => Ok(PacketType::PositionWithoutTimestamp),
            "position_with_timestamp" => Ok(PacketType::PositionWithTimestamp),
            "message" => Ok(PacketType::Message),
            "telemetry" => Ok(PacketType::Telemetry),
            "status" => Ok(PacketType::Status),
            "object" => Ok(PacketType::Object),
            "item" => Ok(PacketType::Item),
            "weather" => Ok(PacketType::Weather),
            "mic_e" => Ok(PacketType::MicE),
            "unknown" => Ok(PacketType::Unknown),
            other => Err(crate::error::Error::validation(
                "packet_type",
                format!("unrecognized packet type '{other}'"),
            )),
        }
    }
}

/// The smallest speed/course magnitudes that still fit a plausible fixed
/// station or moving vehicle. Decoded values outside these ranges are GPS
/// glitches and are dropped rather than stored.
const MAX_PLAUSIBLE_SPEED_KNOTS: f64 = 3500.0;
const MAX_COURSE_DEGREES: u16 = 360;

/// Digipeater path strings longer than this are truncated rather than
/// rejected, matching the speed/course glitch-filter treatment: a
/// malformed tail shouldn't sink an otherwise decodable packet.
const MAX_PATH_CHARS: usize = 100;

/// A single decoded APRS packet. `raw_content` is the untouched payload
/// exactly as received and is never mutated once the packet is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Packet {
    /// Assigned by the store on persistence; `None` for a packet that
    /// hasn't been written yet.
    pub id: Option<i64>,
    pub sender: Callsign,
    pub destination: Option<Callsign>,
    pub path: String,
    pub packet_type: PacketType,
    pub position: Option<GeoCoordinate>,
    pub speed_knots: Option<f64>,
    pub course_degrees: Option<u16>,
    pub weather: Option<WeatherData>,
    pub comment: Option<String>,
    pub symbol_table: Option<char>,
    pub symbol_code: Option<char>,
    pub sent_time: Option<DateTime<Utc>>,
    pub received_at: DateTime<Utc>,
    pub raw_content: String,
}

/// Fields needed to build a `Packet`, prior to GPS-glitch filtering.
pub struct PacketFields {
    pub sender: Callsign,
    pub destination: Option<Callsign>,
    pub path: String,
    pub packet_type: PacketType,
    pub position: Option<GeoCoordinate>,
    pub speed_knots: Option<f64>,
    pub course_degrees: Option<u16>,
    pub weather: Option<WeatherData>,
    pub comment: Option<String>,
    pub symbol_table: Option<char>,
    pub symbol_code: Option<char>,
    pub sent_time: Option<DateTime<Utc>>,
    pub raw_content: String,
}

impl Packet {
    /// Assemble a packet from decoded fields, silently dropping speed or
    /// course values outside their plausible range instead of rejecting the
    /// whole packet.
    pub fn from_fields(fields: PacketFields, received_at: DateTime<Utc>) -> Self {
        let speed_knots = fields
            .speed_knots
            .filter(|&s| (0.0..=MAX_PLAUSIBLE_SPEED_KNOTS).contains(&s));
        let course_degrees = fields
            .course_degrees
            .filter(|&c| c <= MAX_COURSE_DEGREES);
        let mut path = fields.path;
        if path.len() > MAX_PATH_CHARS {
            path.truncate(MAX_PATH_CHARS);
        }

        Packet {
            id: None,
            sender: fields.sender,
            destination: fields.destination,
            path,
            packet_type: fields.packet_type,
            position: fields.position,
            speed_knots,
            course_degrees,
            weather: fields.weather,
            comment: fields.comment,
            symbol_table: fields.symbol_table,
            symbol_code: fields.symbol_code,
            sent_time: fields.sent_time,
            received_at,
            raw_content: fields.raw_content,
        }
    }

    /// Return this packet with its store-assigned identity attached.
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_fields() -> PacketFields {
        PacketFields {
            sender: Callsign::parse("N0CALL").unwrap(),
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
            raw_content: "!0000.00N/00000.00W>".into(),
        }
    }

    #[test]
    fn drops_implausible_speed() {
        let mut fields = base_fields();
        fields.speed_knots = Some(9999.0);
        let packet = Packet::from_fields(fields, Utc::now());
        assert_eq!(packet.speed_knots, None);
    }

    #[test]
    fn drops_implausible_course() {
        let mut fields = base_fields();
        fields.course_degrees = Some(999);
        let packet = Packet::from_fields(fields, Utc::now());
        assert_eq!(packet.course_degrees, None);
    }

    #[test]
    fn keeps_plausible_speed_and_course() {
        let mut fields = base_fields();
        fields.speed_knots = Some(42.0);
        fields.course_degrees = Some(180);
        let packet = Packet::from_fields(fields, Utc::now());
        assert_eq!(packet.speed_knots, Some(42.0));
        assert_eq!(packet.course_degrees, Some(180));
    }

    #[test]
    fn truncates_overlong_path() {
        let mut fields = base_fields();
        fields.path = "X".repeat(150);
        let packet = Packet::from_fields(fields, Utc::now());
        assert_eq!(packet.path.len(), 100);
    }

    #[test]
    fn packet_type_round_trips_through_its_string_form() {
        for ty in [
            PacketType::PositionWithoutTimestamp,
            PacketType::PositionWithTimestamp,
            PacketType::Message,
            PacketType::Telemetry,
            PacketType::Status,
            PacketType::Object,
            PacketType::Item,
            PacketType::Weather,
            PacketType::MicE,
            PacketType::Unknown,
        ] {
            let s = ty.to_string();
            assert_eq!(s.parse::<PacketType>().unwrap(), ty);
        }
    }

    #[test]
    fn assigning_an_id_is_a_one_way_transition() {
        let packet = Packet::from_fields(base_fields(), Utc::now());
        assert_eq!(packet.id, None);
        let stored = packet.with_id(42);
        assert_eq!(stored.id, Some(42));
    }
}
