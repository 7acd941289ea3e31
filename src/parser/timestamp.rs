use crate::clock::Clock;
use crate::error::Error;
use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Reconstruct a full UTC timestamp from one of the two recognized APRS
/// timestamp formats, using `clock` to supply the year/month/day context
/// the wire format omits. Returns `Ok(None)` for anything that isn't one of
/// the recognized shapes — the caller decides what a missing timestamp
/// means for the packet it's attached to.
///
/// Recognized forms:
/// - `DDHHMM` + `z`/`/` (7 chars) — day-of-month, hour, minute.
/// - `HHMMSS` + `h` (7 chars) — hour, minute, second, "today" per `clock`.
/// - `MMDDHHMM` (8 digits, no suffix) — month, day, hour, minute; used by
///   positionless weather reports.
pub fn decode(raw: &str, clock: &dyn Clock) -> Result<Option<DateTime<Utc>>, Error> {
    let now = clock.now();

    match raw.len() {
        7 => {
            let (digits, suffix) = raw.split_at(6);
            let Some(d) = parse_digits(digits) else {
                return Ok(None);
            };
            match suffix {
                "z" | "/" => day_hour_minute(d[0] * 10 + d[1], d[2] * 10 + d[3], d[4] * 10 + d[5], now)
                    .map(Some),
                "h" => hour_minute_second(d[0] * 10 + d[1], d[2] * 10 + d[3], d[4] * 10 + d[5], now)
                    .map(Some),
                _ => Ok(None),
            }
        }
        8 => {
            let Some(d) = parse_digits(raw) else {
                return Ok(None);
            };
            month_day_hour_minute(
                d[0] * 10 + d[1],
                d[2] * 10 + d[3],
                d[4] * 10 + d[5],
                d[6] * 10 + d[7],
                now,
            )
            .map(Some)
        }
        _ => Ok(None),
    }
}

fn parse_digits(s: &str) -> Option<Vec<u32>> {
    s.chars().map(|c| c.to_digit(10)).collect()
}

/// `DDHHMM` + zulu/local suffix: compose with `hint`'s year/month; if the
/// decoded day is more than one day greater than the hint's day, the
/// packet was sent late last month and the clock has since rolled over, so
/// roll the month back by one (wrapping the year if that crosses a
/// January boundary).
fn day_hour_minute(
    day: u32,
    hour: u32,
    minute: u32,
    hint: DateTime<Utc>,
) -> Result<DateTime<Utc>, Error> {
    if day == 0 || day > 31 || hour > 23 || minute > 59 {
        return Err(Error::FormatError(
            "day/hour/minute field out of range".into(),
        ));
    }

    let mut year = hint.year();
    let mut month = hint.month();
    if day > hint.day() + 1 {
        if month == 1 {
            month = 12;
            year -= 1;
        } else {
            month -= 1;
        }
    }

    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .ok_or_else(|| Error::FormatError(format!("day {day} does not exist in {year}-{month}")))
}

/// `HHMMSS` + `h`: compose with `hint`'s year/month/day directly.
fn hour_minute_second(
    hour: u32,
    minute: u32,
    second: u32,
    hint: DateTime<Utc>,
) -> Result<DateTime<Utc>, Error> {
    if hour > 23 || minute > 59 || second > 59 {
        return Err(Error::FormatError(
            "hour/minute/second field out of range".into(),
        ));
    }
    Utc.with_ymd_and_hms(hint.year(), hint.month(), hint.day(), hour, minute, second)
        .single()
        .ok_or_else(|| Error::FormatError("invalid time-of-day".into()))
}

/// `MMDDHHMM`: compose with `hint`'s year; if the decoded month exceeds
/// the hint's month by more than one, the report is from last December
/// and the year has since rolled over, so decrement the year.
fn month_day_hour_minute(
    month: u32,
    day: u32,
    hour: u32,
    minute: u32,
    hint: DateTime<Utc>,
) -> Result<DateTime<Utc>, Error> {
    if !(1..=12).contains(&month) || day == 0 || day > 31 || hour > 23 || minute > 59 {
        return Err(Error::FormatError(
            "month/day/hour/minute field out of range".into(),
        ));
    }

    let mut year = hint.year();
    if month > hint.month() + 1 {
        year -= 1;
    }

    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .ok_or_else(|| Error::FormatError(format!("day {day} does not exist in {year}-{month}")))
}
