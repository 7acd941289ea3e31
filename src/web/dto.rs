//! The public JSON shape for a packet, decoupled from the storage
//! row layout and the domain aggregate so either can change shape without
//! breaking API consumers.

use crate::domain::Packet;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_direction: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_gust: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<i16>,
    #[serde(rename = "rain1h", skip_serializing_if = "Option::is_none")]
    pub rain_1h: Option<u16>,
    #[serde(rename = "rain24h", skip_serializing_if = "Option::is_none")]
    pub rain_24h: Option<u16>,
    #[serde(rename = "rainMidnight", skip_serializing_if = "Option::is_none")]
    pub rain_midnight: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PacketDto {
    pub id: Option<i64>,
    pub sender: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub path: String,
    #[serde(rename = "type")]
    pub packet_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_time: Option<chrono::DateTime<chrono::Utc>>,
    pub received_at: chrono::DateTime<chrono::Utc>,
    pub raw_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_table: Option<char>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_code: Option<char>,
}

impl From<&Packet> for PacketDto {
    fn from(packet: &Packet) -> Self {
        PacketDto {
            id: packet.id,
            sender: packet.sender.value().to_string(),
            destination: packet.destination.as_ref().map(|d| d.value().to_string()),
            path: packet.path.clone(),
            packet_type: packet.packet_type.to_string(),
            position: packet.position.map(|p| PositionDto {
                latitude: p.latitude(),
                longitude: p.longitude(),
            }),
            speed: packet.speed_knots,
            course: packet.course_degrees,
            weather: packet.weather.map(|w| WeatherDto {
                wind_direction: w.wind_direction_degrees,
                wind_speed: w.wind_speed_mph,
                wind_gust: w.wind_gust_mph,
                temperature: w.temperature_fahrenheit,
                rain_1h: w.rain_last_hour_hundredths_inch,
                rain_24h: w.rain_last_24h_hundredths_inch,
                rain_midnight: w.rain_since_midnight_hundredths_inch,
                humidity: w.humidity_percent,
                pressure: w.barometric_pressure_tenths_hpa,
            }),
            sent_time: packet.sent_time,
            received_at: packet.received_at,
            raw_content: packet.raw_content.clone(),
            comment: packet.comment.clone(),
            symbol_table: packet.symbol_table,
            symbol_code: packet.symbol_code,
        }
    }
}

impl From<&std::sync::Arc<Packet>> for PacketDto {
    fn from(packet: &std::sync::Arc<Packet>) -> Self {
        PacketDto::from(packet.as_ref())
    }
}
