use serde::{Deserialize, Serialize};

/// Weather telemetry carried by a packet, either attached to a position
/// report or standalone. Every field is optional because stations report
/// whichever subset of sensors they carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub wind_direction_degrees: Option<u16>,
    pub wind_speed_mph: Option<u16>,
    pub wind_gust_mph: Option<u16>,
    pub temperature_fahrenheit: Option<i16>,
    pub rain_last_hour_hundredths_inch: Option<u16>,
    pub rain_last_24h_hundredths_inch: Option<u16>,
    pub rain_since_midnight_hundredths_inch: Option<u16>,
    pub humidity_percent: Option<u8>,
    pub barometric_pressure_tenths_hpa: Option<u32>,
}

impl WeatherData {
    /// `true` if every field is `None` — the decoder found a weather prefix
    /// but no recognizable fields behind it.
    pub fn is_empty(&self) -> bool {
        self == &WeatherData::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        assert!(WeatherData::default().is_empty());
    }

    #[test]
    fn any_field_marks_non_empty() {
        let w = WeatherData {
            humidity_percent: Some(50),
            ..Default::default()
        };
        assert!(!w.is_empty());
    }
}
