use crate::domain::WeatherData;
use regex::Regex;
use std::sync::LazyLock;

static WIND_DIR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"c(\d{3})").unwrap());
static WIND_SPEED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"s(\d{3})").unwrap());
static WIND_FALLBACK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{3})/(\d{3})").unwrap());
static GUST_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"g(\d{3})").unwrap());
static TEMP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"t(-?\d{2,3})").unwrap());
static RAIN_HOUR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"r(\d{3})").unwrap());
static RAIN_24H_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"p(\d{3})").unwrap());
static RAIN_MIDNIGHT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"P(\d{3})").unwrap());
static HUMIDITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"h(\d{2})").unwrap());
static PRESSURE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"b(\d{5})").unwrap());

/// Scan a weather payload (the comment trailing a position, or the body of
/// a positionless weather report) for the fixed-width prefixed fields the
/// format defines. Unrecognized text is ignored; every field is
/// independently optional.
pub fn decode(body: &str) -> WeatherData {
    let dir_from_prefix = WIND_DIR_RE
        .captures(body)
        .and_then(|c| c[1].parse::<u16>().ok())
        .filter(|&d| d <= 360);
    let speed_from_prefix = WIND_SPEED_RE.captures(body).and_then(|c| c[1].parse().ok());

    // Only missing fields fall back to the bare `DDD/SSS` form; a field
    // already recovered from its `c`/`s` prefix is never overwritten.
    let fallback = WIND_FALLBACK_RE.captures(body);
    let wind_direction_degrees = dir_from_prefix.or_else(|| {
        fallback
            .as_ref()
            .and_then(|c| c[1].parse::<u16>().ok())
            .filter(|&d| d <= 360)
    });
    let wind_speed_mph =
        speed_from_prefix.or_else(|| fallback.as_ref().and_then(|c| c[2].parse().ok()));

    WeatherData {
        wind_direction_degrees,
        wind_speed_mph,
        wind_gust_mph: GUST_RE.captures(body).and_then(|c| c[1].parse().ok()),
        temperature_fahrenheit: TEMP_RE.captures(body).and_then(|c| c[1].parse().ok()),
        rain_last_hour_hundredths_inch: RAIN_HOUR_RE
            .captures(body)
            .and_then(|c| c[1].parse().ok()),
        rain_last_24h_hundredths_inch: RAIN_24H_RE.captures(body).and_then(|c| c[1].parse().ok()),
        rain_since_midnight_hundredths_inch: RAIN_MIDNIGHT_RE
            .captures(body)
            .and_then(|c| c[1].parse().ok()),
        humidity_percent: HUMIDITY_RE.captures(body).and_then(|c| {
            let v: u8 = c[1].parse().ok()?;
            // h00 means 100%, per the format's one reserved special case.
            Some(if v == 0 { 100 } else { v })
        }),
        barometric_pressure_tenths_hpa: PRESSURE_RE.captures(body).and_then(|c| c[1].parse().ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_weather_string() {
        let w = decode("220/004g005t077r000p000P000h50b10320");
        assert_eq!(w.wind_direction_degrees, Some(220));
        assert_eq!(w.wind_speed_mph, Some(4));
        assert_eq!(w.wind_gust_mph, Some(5));
        assert_eq!(w.temperature_fahrenheit, Some(77));
        assert_eq!(w.rain_last_hour_hundredths_inch, Some(0));
        assert_eq!(w.humidity_percent, Some(50));
        assert_eq!(w.barometric_pressure_tenths_hpa, Some(10320));
    }

    #[test]
    fn decodes_negative_temperature() {
        let w = decode("000/000g000t-05r000p000P000h44b10212");
        assert_eq!(w.temperature_fahrenheit, Some(-5));
    }

    #[test]
    fn humidity_zero_means_100_percent() {
        let w = decode("000/000g000t077r000p000P000h00b10212");
        assert_eq!(w.humidity_percent, Some(100));
    }

    #[test]
    fn missing_fields_stay_none() {
        let w = decode("no weather data here");
        assert!(w.is_empty());
    }

    #[test]
    fn prefers_c_and_s_prefixes_over_the_ddd_sss_fallback() {
        let w = decode("090/005c180s020g015t072r001p010P020h50b10135");
        assert_eq!(w.wind_direction_degrees, Some(180));
        assert_eq!(w.wind_speed_mph, Some(20));
    }

    #[test]
    fn falls_back_to_ddd_sss_when_c_and_s_prefixes_are_absent() {
        let w = decode("c090s010g015t072r001p010P020h50b10135".replace("c090s010", "090/010"));
        assert_eq!(w.wind_direction_degrees, Some(90));
        assert_eq!(w.wind_speed_mph, Some(10));
    }
}
