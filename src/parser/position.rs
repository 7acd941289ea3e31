use crate::domain::GeoCoordinate;
use crate::error::Error;
use regex::Regex;
use std::sync::LazyLock;

/// Fields recovered from an uncompressed position payload.
pub struct DecodedPosition {
    pub position: GeoCoordinate,
    pub symbol_table: char,
    pub symbol_code: char,
    pub comment: String,
    pub course_degrees: Option<u16>,
    pub speed_knots: Option<u16>,
}

// The wire format allows position-ambiguity blanking: trailing digits of
// either the degree or the minute fields may be replaced with spaces
// (`^([0-9 .NS]{8})(.)([0-9 .EW]{9})(.)(.*)$`). The decimal point and the
// hemisphere letter stay literal; only the digit positions widen to admit
// a blank.
static POSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<lat_deg>[0-9 ]{2})(?P<lat_min_i>[0-9 ]{2})\.(?P<lat_min_f>[0-9 ]{2})(?P<ns>[NS])(?P<table>.)(?P<lon_deg>[0-9 ]{3})(?P<lon_min_i>[0-9 ]{2})\.(?P<lon_min_f>[0-9 ]{2})(?P<ew>[EW])(?P<code>.)(?P<comment>.*)$",
    )
    .unwrap()
});

static COURSE_SPEED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3})/(\d{3})").unwrap());

/// A blanked-out ambiguity digit (a space) is a low-order zero.
fn blanks_as_zero(s: &str) -> String {
    s.replace(' ', "0")
}

/// Decode an uncompressed position payload, i.e. everything after the
/// leading data-type indicator (`!`, `=`, `/`, `@`) and any timestamp.
pub fn decode(body: &str) -> Result<DecodedPosition, Error> {
    let caps = POSITION_RE
        .captures(body)
        .ok_or_else(|| Error::FormatError(format!("'{body}' is not an uncompressed position")))?;

    let lat_deg: f64 = blanks_as_zero(&caps["lat_deg"]).parse().unwrap();
    let lat_min: f64 = format!(
        "{}.{}",
        blanks_as_zero(&caps["lat_min_i"]),
        blanks_as_zero(&caps["lat_min_f"])
    )
    .parse()
    .unwrap();
    let mut lat = lat_deg + lat_min / 60.0;
    if &caps["ns"] == "S" {
        lat = -lat;
    }

    let lon_deg: f64 = blanks_as_zero(&caps["lon_deg"]).parse().unwrap();
    let lon_min: f64 = format!(
        "{}.{}",
        blanks_as_zero(&caps["lon_min_i"]),
        blanks_as_zero(&caps["lon_min_f"])
    )
    .parse()
    .unwrap();
    let mut lon = lon_deg + lon_min / 60.0;
    if &caps["ew"] == "W" {
        lon = -lon;
    }

    let position = GeoCoordinate::new(round6(lat), round6(lon))?;
    let symbol_table = caps["table"].chars().next().unwrap();
    let symbol_code = caps["code"].chars().next().unwrap();
    let comment = caps["comment"].to_string();

    let (course_degrees, speed_knots) = match COURSE_SPEED_RE.captures(&comment) {
        Some(cs) => {
            let course: u16 = cs[1].parse().unwrap();
            let speed: u16 = cs[2].parse().unwrap();
            (Some(course), Some(speed))
        }
        None => (None, None),
    };

    Ok(DecodedPosition {
        position,
        symbol_table,
        symbol_code,
        comment,
        course_degrees,
        speed_knots,
    })
}

/// Round to 6 decimal places, the precision APRS uncompressed positions
/// carry (hundredths of a minute).
fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_basic_position() {
        let d = decode("4903.50N/07201.75W-test").unwrap();
        assert!((d.position.latitude() - 49.0583333).abs() < 1e-5);
        assert!((d.position.longitude() - (-72.0291666)).abs() < 1e-5);
        assert_eq!(d.symbol_table, '/');
        assert_eq!(d.symbol_code, '-');
        assert_eq!(d.comment, "test");
    }

    #[test]
    fn decodes_southern_eastern_hemisphere() {
        let d = decode("3350.00S/15113.00E>heading home").unwrap();
        assert!(d.position.latitude() < 0.0);
        assert!(d.position.longitude() > 0.0);
    }

    #[test]
    fn extracts_course_and_speed_from_comment() {
        let d = decode("4903.50N/07201.75W-088/036/A=001000").unwrap();
        assert_eq!(d.course_degrees, Some(88));
        assert_eq!(d.speed_knots, Some(36));
    }

    #[test]
    fn no_course_speed_prefix_leaves_them_none() {
        let d = decode("4903.50N/07201.75W-just a comment").unwrap();
        assert_eq!(d.course_degrees, None);
        assert_eq!(d.speed_knots, None);
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(decode("not a position").is_err());
    }

    #[test]
    fn decodes_position_ambiguity_blanks_as_low_order_zeros() {
        let d = decode("4903.5 N/07201.7 W-test").unwrap();
        assert!((d.position.latitude() - (49.0 + 3.50 / 60.0)).abs() < 1e-5);
        assert!((d.position.longitude() - -(72.0 + 1.70 / 60.0)).abs() < 1e-5);
    }

    #[test]
    fn decodes_fully_blanked_minutes() {
        let d = decode("49  .  N/072  .  W-test").unwrap();
        assert!((d.position.latitude() - 49.0).abs() < 1e-6);
        assert!((d.position.longitude() - -72.0).abs() < 1e-6);
    }

    #[test]
    fn rounds_coordinates_to_six_decimal_places() {
        let d = decode("4903.50N/07201.75W-test").unwrap();
        let lat_scaled = (d.position.latitude() * 1_000_000.0).round();
        assert_eq!(d.position.latitude(), lat_scaled / 1_000_000.0);
    }
}
