pub mod error;
pub mod mice;
pub mod position;
pub mod timestamp;
pub mod weather;

use crate::clock::Clock;
use crate::domain::{maidenhead, Callsign, Packet, PacketFields, PacketType};
use crate::error::Error;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static FRAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([^>]+)>([^:]+):(.*)$").unwrap());

/// Packet raw content is capped at this length; the parser truncates
/// rather than rejecting an overlong line.
const MAX_RAW_CONTENT_CHARS: usize = 1024;

/// Parse one raw TNC2-format line from the APRS-IS stream into a `Packet`.
///
/// `clock` supplies the "now" hint used to reconstruct full timestamps from
/// the partial day/hour/minute or hour/minute/second fields the wire format
/// carries. Only the frame split itself (and an unparseable sender) can
/// fail the whole line; everything past that degrades the packet's type to
/// `Unknown` instead of rejecting it.
pub fn parse(raw: &str, clock: &dyn Clock, received_at: DateTime<Utc>) -> Result<Packet, Error> {
    let caps = FRAME_RE
        .captures(raw)
        .ok_or_else(|| Error::FormatError(format!("'{raw}' is not a TNC2 frame")))?;

    let sender = Callsign::parse(&caps[1]).map_err(|e| error::with_raw_context(raw, e))?;
    let addr_field = caps[2].to_string();
    let payload = &caps[3];

    let dest_raw = addr_field.split(',').next().unwrap_or("");
    let destination = Callsign::parse(dest_raw).ok();

    if payload.is_empty() {
        return Err(error::with_raw_context(
            raw,
            Error::FormatError("empty information field".into()),
        ));
    }

    let mut fields = dispatch(sender, destination, addr_field, dest_raw, payload, clock);
    fields.raw_content = raw.chars().take(MAX_RAW_CONTENT_CHARS).collect();

    Ok(Packet::from_fields(fields, received_at))
}

fn unknown_fields(
    sender: Callsign,
    destination: Option<Callsign>,
    path: String,
    payload: &str,
    comment: Option<String>,
) -> PacketFields {
    PacketFields {
        sender,
        destination,
        path,
        packet_type: PacketType::Unknown,
        position: None,
        speed_knots: None,
        course_degrees: None,
        weather: None,
        comment,
        symbol_table: None,
        symbol_code: None,
        sent_time: None,
        raw_content: payload.to_string(),
    }
}

fn position_fields(
    sender: Callsign,
    destination: Option<Callsign>,
    path: String,
    decoded: position::DecodedPosition,
    sent_time: Option<DateTime<Utc>>,
    payload: &str,
) -> PacketFields {
    let looks_like_weather =
        decoded.symbol_code == '_' || decoded.comment.contains("g0") || decoded.comment.contains("t0");

    // The heuristic above only decides whether it's worth running the
    // weather decoder; the type only upgrades to `Weather` if that decode
    // actually recovers a temperature or wind speed, per the governing
    // format's own disambiguation rule.
    let decoded_weather =
        looks_like_weather.then(|| weather::decode(&decoded.comment)).filter(|w| {
            w.temperature_fahrenheit.is_some() || w.wind_speed_mph.is_some()
        });

    let (packet_type, weather) = if let Some(w) = decoded_weather {
        (PacketType::Weather, Some(w))
    } else if sent_time.is_some() {
        (PacketType::PositionWithTimestamp, None)
    } else {
        (PacketType::PositionWithoutTimestamp, None)
    };

    PacketFields {
        sender,
        destination,
        path,
        packet_type,
        position: Some(decoded.position),
        speed_knots: decoded.speed_knots.map(f64::from),
        course_degrees: decoded.course_degrees,
        weather,
        comment: Some(decoded.comment),
        symbol_table: Some(decoded.symbol_table),
        symbol_code: Some(decoded.symbol_code),
        sent_time,
        raw_content: payload.to_string(),
    }
}

fn dispatch(
    sender: Callsign,
    destination: Option<Callsign>,
    path: String,
    dest_raw: &str,
    payload: &str,
    clock: &dyn Clock,
) -> PacketFields {
    let data_type = payload.as_bytes()[0] as char;
    let body = &payload[1..];

    match data_type {
        '!' | '=' => match position::decode(body) {
            Ok(decoded) => position_fields(sender, destination, path, decoded, None, payload),
            Err(_) => unknown_fields(sender, destination, path, payload, Some(body.to_string())),
        },
        '/' | '@' => {
            if body.len() < 7 {
                return unknown_fields(sender, destination, path, payload, Some(body.to_string()));
            }
            let (ts, rest) = body.split_at(7);
            match timestamp::decode(ts, clock) {
                Ok(Some(sent_time)) => match position::decode(rest) {
                    Ok(decoded) => {
                        position_fields(sender, destination, path, decoded, Some(sent_time), payload)
                    }
                    Err(_) => unknown_fields(sender, destination, path, payload, Some(rest.to_string())),
                },
                Ok(None) | Err(_) => {
                    unknown_fields(sender, destination, path, payload, Some(body.to_string()))
                }
            }
        }
        '`' | '\'' | '\u{1c}' | '\u{1d}' => {
            let dest_base = dest_raw.split('-').next().unwrap_or(dest_raw);
            match mice::decode(dest_base, body) {
                Ok(decoded) => PacketFields {
                    sender,
                    destination,
                    path,
                    packet_type: PacketType::MicE,
                    position: Some(decoded.position),
                    speed_knots: decoded.speed_knots.map(f64::from),
                    course_degrees: decoded.course_degrees,
                    weather: None,
                    comment: Some(decoded.comment),
                    symbol_table: Some(decoded.symbol_table),
                    symbol_code: Some(decoded.symbol_code),
                    sent_time: None,
                    raw_content: payload.to_string(),
                },
                Err(_) => unknown_fields(sender, destination, path, payload, None),
            }
        }
        '_' => {
            if body.len() < 8 {
                return unknown_fields(sender, destination, path, payload, Some(body.to_string()));
            }
            let (ts, rest) = body.split_at(8);
            let sent_time = timestamp::decode(ts, clock).ok().flatten();
            let weather_data = weather::decode(rest);
            PacketFields {
                sender,
                destination,
                path,
                packet_type: PacketType::Weather,
                position: None,
                speed_knots: None,
                course_degrees: None,
                weather: Some(weather_data),
                comment: Some(rest.to_string()),
                symbol_table: None,
                symbol_code: None,
                sent_time,
                raw_content: payload.to_string(),
            }
        }
        '[' => {
            let (grid, comment) = match body.find(']') {
                Some(idx) => (&body[..idx], &body[idx + 1..]),
                None => (body, ""),
            };
            match maidenhead::decode_grid_to_center(grid) {
                Ok(position) => PacketFields {
                    sender,
                    destination,
                    path,
                    packet_type: PacketType::PositionWithoutTimestamp,
                    position: Some(position),
                    speed_knots: None,
                    course_degrees: None,
                    weather: None,
                    comment: Some(comment.to_string()),
                    symbol_table: None,
                    symbol_code: None,
                    sent_time: None,
                    raw_content: payload.to_string(),
                },
                Err(_) => unknown_fields(sender, destination, path, payload, Some(body.to_string())),
            }
        }
        '>' => PacketFields {
            sender,
            destination,
            path,
            packet_type: PacketType::Status,
            position: None,
            speed_knots: None,
            course_degrees: None,
            weather: None,
            comment: Some(body.to_string()),
            symbol_table: None,
            symbol_code: None,
            sent_time: None,
            raw_content: payload.to_string(),
        },
        ':' => PacketFields {
            sender,
            destination,
            path,
            packet_type: PacketType::Message,
            position: None,
            speed_knots: None,
            course_degrees: None,
            weather: None,
            comment: Some(body.to_string()),
            symbol_table: None,
            symbol_code: None,
            sent_time: None,
            raw_content: payload.to_string(),
        },
        _ => unknown_fields(sender, destination, path, payload, None),
    }
}
