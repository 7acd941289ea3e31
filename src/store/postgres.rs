use super::schema::packets;
use super::{sender_matches, SearchFilter, SearchPage, Store};
use crate::domain::{Callsign, GeoCoordinate, Packet, PacketFields, PacketType, WeatherData};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use tracing::instrument;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

#[derive(Insertable)]
#[diesel(table_name = packets)]
struct NewPacketRow {
    sender_callsign: String,
    sender_base: String,
    sender_ssid: i16,
    dest_callsign: Option<String>,
    dest_base: Option<String>,
    dest_ssid: Option<i16>,
    path: String,
    packet_type: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    speed: Option<f64>,
    course: Option<i32>,
    wx_wind_direction: Option<i32>,
    wx_wind_speed: Option<i32>,
    wx_wind_gust: Option<i32>,
    wx_temperature: Option<i32>,
    wx_rain_1h: Option<i32>,
    wx_rain_24h: Option<i32>,
    wx_rain_midnight: Option<i32>,
    wx_humidity: Option<i32>,
    wx_pressure: Option<i32>,
    sent_time: Option<DateTime<Utc>>,
    received_at: DateTime<Utc>,
    raw_content: String,
    comment: Option<String>,
    symbol_table: Option<String>,
    symbol_code: Option<String>,
}

#[derive(Queryable, Debug)]
struct PacketRow {
    id: i64,
    sender_callsign: String,
    sender_base: String,
    sender_ssid: i16,
    dest_callsign: Option<String>,
    dest_base: Option<String>,
    dest_ssid: Option<i16>,
    path: String,
    packet_type: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    speed: Option<f64>,
    course: Option<i32>,
    wx_wind_direction: Option<i32>,
    wx_wind_speed: Option<i32>,
    wx_wind_gust: Option<i32>,
    wx_temperature: Option<i32>,
    wx_rain_1h: Option<i32>,
    wx_rain_24h: Option<i32>,
    wx_rain_midnight: Option<i32>,
    wx_humidity: Option<i32>,
    wx_pressure: Option<i32>,
    sent_time: Option<DateTime<Utc>>,
    received_at: DateTime<Utc>,
    raw_content: String,
    comment: Option<String>,
    symbol_table: Option<String>,
    symbol_code: Option<String>,
}

const ROW_COLUMNS: (
    packets::id,
    packets::sender_callsign,
    packets::sender_base,
    packets::sender_ssid,
    packets::dest_callsign,
    packets::dest_base,
    packets::dest_ssid,
    packets::path,
    packets::packet_type,
    packets::latitude,
    packets::longitude,
    packets::speed,
    packets::course,
    packets::wx_wind_direction,
    packets::wx_wind_speed,
    packets::wx_wind_gust,
    packets::wx_temperature,
    packets::wx_rain_1h,
    packets::wx_rain_24h,
    packets::wx_rain_midnight,
    packets::wx_humidity,
    packets::wx_pressure,
    packets::sent_time,
    packets::received_at,
    packets::raw_content,
    packets::comment,
    packets::symbol_table,
    packets::symbol_code,
) = (
    packets::id,
    packets::sender_callsign,
    packets::sender_base,
    packets::sender_ssid,
    packets::dest_callsign,
    packets::dest_base,
    packets::dest_ssid,
    packets::path,
    packets::packet_type,
    packets::latitude,
    packets::longitude,
    packets::speed,
    packets::course,
    packets::wx_wind_direction,
    packets::wx_wind_speed,
    packets::wx_wind_gust,
    packets::wx_temperature,
    packets::wx_rain_1h,
    packets::wx_rain_24h,
    packets::wx_rain_midnight,
    packets::wx_humidity,
    packets::wx_pressure,
    packets::sent_time,
    packets::received_at,
    packets::raw_content,
    packets::comment,
    packets::symbol_table,
    packets::symbol_code,
);

fn row_to_packet(row: PacketRow) -> Result<Packet> {
    let sender = if row.sender_ssid == 0 {
        Callsign::parse(&row.sender_base)?
    } else {
        Callsign::parse(&format!("{}-{}", row.sender_base, row.sender_ssid))?
    };
    let destination = match row.dest_base {
        Some(base) => {
            let ssid = row.dest_ssid.unwrap_or(0);
            let value = if ssid == 0 {
                base
            } else {
                format!("{base}-{ssid}")
            };
            Some(Callsign::parse(&value)?)
        }
        None => None,
    };
    let _ = row.dest_callsign; // preserved for symmetry with the row layout; sender/dest reconstructed from base+ssid

    let position = match (row.latitude, row.longitude) {
        (Some(lat), Some(lon)) => Some(GeoCoordinate::new(lat, lon)?),
        _ => None,
    };

    let weather = if row.wx_wind_direction.is_some()
        || row.wx_wind_speed.is_some()
        || row.wx_wind_gust.is_some()
        || row.wx_temperature.is_some()
        || row.wx_rain_1h.is_some()
        || row.wx_rain_24h.is_some()
        || row.wx_rain_midnight.is_some()
        || row.wx_humidity.is_some()
        || row.wx_pressure.is_some()
    {
        Some(WeatherData {
            wind_direction_degrees: row.wx_wind_direction.map(|v| v as u16),
            wind_speed_mph: row.wx_wind_speed.map(|v| v as u16),
            wind_gust_mph: row.wx_wind_gust.map(|v| v as u16),
            temperature_fahrenheit: row.wx_temperature.map(|v| v as i16),
            rain_last_hour_hundredths_inch: row.wx_rain_1h.map(|v| v as u16),
            rain_last_24h_hundredths_inch: row.wx_rain_24h.map(|v| v as u16),
            rain_since_midnight_hundredths_inch: row.wx_rain_midnight.map(|v| v as u16),
            humidity_percent: row.wx_humidity.map(|v| v as u8),
            barometric_pressure_tenths_hpa: row.wx_pressure.map(|v| v as u32),
        })
    } else {
        None
    };

    let fields = PacketFields {
        sender,
        destination,
        path: row.path,
        packet_type: row.packet_type.parse::<PacketType>()?,
        position,
        speed_knots: row.speed,
        course_degrees: row.course.map(|v| v as u16),
        weather,
        comment: row.comment,
        symbol_table: row.symbol_table.and_then(|s| s.chars().next()),
        symbol_code: row.symbol_code.and_then(|s| s.chars().next()),
        sent_time: row.sent_time,
        raw_content: row.raw_content,
    };

    Ok(Packet::from_fields(fields, row.received_at).with_id(row.id))
}

fn packet_to_row(packet: &Packet) -> NewPacketRow {
    let weather = packet.weather.unwrap_or_default();
    NewPacketRow {
        sender_callsign: packet.sender.value().to_string(),
        sender_base: packet.sender.base().to_string(),
        sender_ssid: packet.sender.ssid() as i16,
        dest_callsign: packet.destination.as_ref().map(|d| d.value().to_string()),
        dest_base: packet.destination.as_ref().map(|d| d.base().to_string()),
        dest_ssid: packet.destination.as_ref().map(|d| d.ssid() as i16),
        path: packet.path.clone(),
        packet_type: packet.packet_type.to_string(),
        latitude: packet.position.map(|p| p.latitude()),
        longitude: packet.position.map(|p| p.longitude()),
        speed: packet.speed_knots,
        course: packet.course_degrees.map(|v| v as i32),
        wx_wind_direction: weather.wind_direction_degrees.map(|v| v as i32),
        wx_wind_speed: weather.wind_speed_mph.map(|v| v as i32),
        wx_wind_gust: weather.wind_gust_mph.map(|v| v as i32),
        wx_temperature: weather.temperature_fahrenheit.map(|v| v as i32),
        wx_rain_1h: weather.rain_last_hour_hundredths_inch.map(|v| v as i32),
        wx_rain_24h: weather.rain_last_24h_hundredths_inch.map(|v| v as i32),
        wx_rain_midnight: weather.rain_since_midnight_hundredths_inch.map(|v| v as i32),
        wx_humidity: weather.humidity_percent.map(|v| v as i32),
        wx_pressure: weather.barometric_pressure_tenths_hpa.map(|v| v as i32),
        sent_time: packet.sent_time,
        received_at: packet.received_at,
        raw_content: packet.raw_content.clone(),
        comment: packet.comment.clone(),
        symbol_table: packet.symbol_table.map(|c| c.to_string()),
        symbol_code: packet.symbol_code.map(|c| c.to_string()),
    }
}

/// Postgres-backed `Store`, pooled with r2d2 and run on the blocking thread
/// pool since diesel's synchronous connections can't be awaited directly.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        PostgresStore { pool }
    }
}

#[async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self, packet))]
    async fn add(&self, packet: Packet) -> Result<Packet> {
        let pool = self.pool.clone();
        let row = packet_to_row(&packet);

        let id: i64 = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::Internal(e.to_string()))?;
            diesel::insert_into(packets::table)
                .values(&row)
                .returning(packets::id)
                .get_result(&mut conn)
                .map_err(|e| Error::Internal(e.to_string()))
        })
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;

        Ok(packet.with_id(id))
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: i64) -> Result<Option<Packet>> {
        let pool = self.pool.clone();
        let row = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::Internal(e.to_string()))?;
            packets::table
                .filter(packets::id.eq(id))
                .select(ROW_COLUMNS)
                .first::<PacketRow>(&mut conn)
                .optional()
                .map_err(|e| Error::Internal(e.to_string()))
        })
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;

        row.map(row_to_packet).transpose()
    }

    #[instrument(skip(self))]
    async fn search(&self, filter: SearchFilter) -> Result<SearchPage> {
        let filter = filter.normalized();
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| Error::Internal(e.to_string()))?;

            let mut count_query = packets::table.into_boxed();
            let mut rows_query = packets::table.into_boxed();

            if let Some(sender) = &filter.sender {
                // sender_matches checks full value OR base; expressed here as
                // an OR over the two flattened columns rather than in Rust,
                // since the filtering has to happen in SQL.
                let upper = sender.to_uppercase();
                count_query = count_query.filter(
                    packets::sender_callsign
                        .eq(upper.clone())
                        .or(packets::sender_base.eq(upper.clone())),
                );
                rows_query = rows_query.filter(
                    packets::sender_callsign
                        .eq(upper.clone())
                        .or(packets::sender_base.eq(upper)),
                );
            }
            if let Some(packet_type) = filter.packet_type {
                count_query = count_query.filter(packets::packet_type.eq(packet_type.to_string()));
                rows_query = rows_query.filter(packets::packet_type.eq(packet_type.to_string()));
            }
            if let Some(from) = filter.from {
                count_query = count_query.filter(packets::received_at.ge(from));
                rows_query = rows_query.filter(packets::received_at.ge(from));
            }
            if let Some(to) = filter.to {
                count_query = count_query.filter(packets::received_at.le(to));
                rows_query = rows_query.filter(packets::received_at.le(to));
            }

            let total_count: i64 = count_query
                .count()
                .get_result(&mut conn)
                .map_err(|e| Error::Internal(e.to_string()))?;

            let rows: Vec<PacketRow> = rows_query
                .select(ROW_COLUMNS)
                .order((packets::received_at.desc(), packets::id.desc()))
                .limit(filter.page_size as i64)
                .offset(filter.offset())
                .load(&mut conn)
                .map_err(|e| Error::Internal(e.to_string()))?;

            let items = rows.into_iter().map(row_to_packet).collect::<Result<Vec<_>>>()?;

            Ok(SearchPage { items, total_count })
        })
        .await
        .map_err(|e| Error::Internal(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Callsign;
    use chrono::Utc;

    fn packet() -> Packet {
        Packet::from_fields(
            PacketFields {
                sender: Callsign::parse("N0CALL-9").unwrap(),
                destination: Callsign::parse("APRS").ok(),
                path: "APRS,WIDE1-1".to_string(),
                packet_type: PacketType::PositionWithoutTimestamp,
                position: Some(GeoCoordinate::new(49.058333, -72.029167).unwrap()),
                speed_knots: Some(12.0),
                course_degrees: Some(90),
                weather: None,
                comment: Some("hi".to_string()),
                symbol_table: Some('/'),
                symbol_code: Some('-'),
                sent_time: None,
                raw_content: "N0CALL-9>APRS,WIDE1-1:!4903.50N/07201.75W-hi".to_string(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn row_round_trips_through_packet_conversion() {
        let original = packet();
        let mut row = packet_to_row(&original);
        row.sender_callsign = original.sender.value().to_string();
        let reconstructed = row_to_packet(PacketRow {
            id: 42,
            sender_callsign: row.sender_callsign,
            sender_base: row.sender_base,
            sender_ssid: row.sender_ssid,
            dest_callsign: row.dest_callsign,
            dest_base: row.dest_base,
            dest_ssid: row.dest_ssid,
            path: row.path,
            packet_type: row.packet_type,
            latitude: row.latitude,
            longitude: row.longitude,
            speed: row.speed,
            course: row.course,
            wx_wind_direction: row.wx_wind_direction,
            wx_wind_speed: row.wx_wind_speed,
            wx_wind_gust: row.wx_wind_gust,
            wx_temperature: row.wx_temperature,
            wx_rain_1h: row.wx_rain_1h,
            wx_rain_24h: row.wx_rain_24h,
            wx_rain_midnight: row.wx_rain_midnight,
            wx_humidity: row.wx_humidity,
            wx_pressure: row.wx_pressure,
            sent_time: row.sent_time,
            received_at: original.received_at,
            raw_content: row.raw_content,
            comment: row.comment,
            symbol_table: row.symbol_table,
            symbol_code: row.symbol_code,
        })
        .unwrap();

        assert_eq!(reconstructed.sender.value(), "N0CALL-9");
        assert_eq!(reconstructed.id, Some(42));
        assert!((reconstructed.position.unwrap().latitude() - 49.058333).abs() < 1e-5);
        assert_eq!(reconstructed.speed_knots, Some(12.0));
    }
}
