use crate::domain::geo::GeoCoordinate;
use crate::error::Error;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A Maidenhead grid locator: 4, 6, or 8 characters, convertible to the
/// coordinate of its cell center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaidenheadLocator(String);

static GRID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-R]{2}[0-9]{2}([A-X]{2}([0-9]{2})?)?$").unwrap()
});

const FIELD_LON: f64 = 20.0;
const FIELD_LAT: f64 = 10.0;
const SQUARE_LON: f64 = FIELD_LON / 10.0;
const SQUARE_LAT: f64 = FIELD_LAT / 10.0;
const SUBSQUARE_LON: f64 = SQUARE_LON / 24.0;
const SUBSQUARE_LAT: f64 = SQUARE_LAT / 24.0;
const EXT_LON: f64 = SUBSQUARE_LON / 10.0;
const EXT_LAT: f64 = SUBSQUARE_LAT / 10.0;

impl MaidenheadLocator {
    pub fn parse(input: &str) -> Result<Self, Error> {
        if !GRID_RE.is_match(input) {
            return Err(Error::validation("grid", "not a valid maidenhead locator"));
        }
        Ok(MaidenheadLocator(input.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode this locator to the coordinate at the center of its cell.
    pub fn to_center(&self) -> GeoCoordinate {
        let bytes = self.0.as_bytes();

        let mut lon = (bytes[0] - b'A') as f64 * FIELD_LON - 180.0;
        let mut lat = (bytes[1] - b'A') as f64 * FIELD_LAT - 90.0;
        let mut width = FIELD_LON;
        let mut height = FIELD_LAT;

        lon += (bytes[2] - b'0') as f64 * SQUARE_LON;
        lat += (bytes[3] - b'0') as f64 * SQUARE_LAT;
        width = SQUARE_LON.min(width);
        height = SQUARE_LAT.min(height);

        if bytes.len() >= 6 {
            lon += (bytes[4] - b'A') as f64 * SUBSQUARE_LON;
            lat += (bytes[5] - b'A') as f64 * SUBSQUARE_LAT;
            width = SUBSQUARE_LON;
            height = SUBSQUARE_LAT;
        }

        if bytes.len() == 8 {
            lon += (bytes[6] - b'0') as f64 * EXT_LON;
            lat += (bytes[7] - b'0') as f64 * EXT_LAT;
            width = EXT_LON;
            height = EXT_LAT;
        }

        lon += width / 2.0;
        lat += height / 2.0;

        // Arithmetic above is bounded by the regex-validated input range, so
        // this can never fail.
        GeoCoordinate::new(lat, lon).expect("maidenhead decode always yields an in-range point")
    }

    /// Encode a coordinate back to a locator at the given precision (4, 6,
    /// or 8 characters).
    pub fn from_coordinate(coord: GeoCoordinate, precision: usize) -> Result<Self, Error> {
        if ![4, 6, 8].contains(&precision) {
            return Err(Error::validation("precision", "must be 4, 6, or 8"));
        }

        let mut adj_lon = coord.longitude() + 180.0;
        let mut adj_lat = coord.latitude() + 90.0;
        // Clamp the north/east poles so they still land in the top cell
        // instead of overflowing into a 19th/10th field.
        adj_lon = adj_lon.min(359.999_999);
        adj_lat = adj_lat.min(179.999_999);

        let field_lon = (adj_lon / FIELD_LON).floor() as u8;
        let field_lat = (adj_lat / FIELD_LAT).floor() as u8;
        adj_lon -= field_lon as f64 * FIELD_LON;
        adj_lat -= field_lat as f64 * FIELD_LAT;

        let square_lon = (adj_lon / SQUARE_LON).floor() as u8;
        let square_lat = (adj_lat / SQUARE_LAT).floor() as u8;
        adj_lon -= square_lon as f64 * SQUARE_LON;
        adj_lat -= square_lat as f64 * SQUARE_LAT;

        let mut grid = vec![
            b'A' + field_lon,
            b'A' + field_lat,
            b'0' + square_lon,
            b'0' + square_lat,
        ];

        if precision >= 6 {
            let subsquare_lon = (adj_lon / SUBSQUARE_LON).floor() as u8;
            let subsquare_lat = (adj_lat / SUBSQUARE_LAT).floor() as u8;
            adj_lon -= subsquare_lon as f64 * SUBSQUARE_LON;
            adj_lat -= subsquare_lat as f64 * SUBSQUARE_LAT;
            grid.push(b'A' + subsquare_lon);
            grid.push(b'A' + subsquare_lat);

            if precision == 8 {
                let ext_lon = (adj_lon / EXT_LON).floor() as u8;
                let ext_lat = (adj_lat / EXT_LAT).floor() as u8;
                grid.push(b'0' + ext_lon);
                grid.push(b'0' + ext_lat);
            }
        }

        Ok(MaidenheadLocator(String::from_utf8(grid).unwrap()))
    }
}

/// Decode a `[GRID]` beacon locator straight to a coordinate, without going
/// through the value-object constructor. Used by the parser for Maidenhead
/// beacon packets.
pub fn decode_grid_to_center(grid: &str) -> Result<GeoCoordinate, Error> {
    MaidenheadLocator::parse(grid).map(|g| g.to_center())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_grid() {
        assert!(MaidenheadLocator::parse("AA").is_err());
        assert!(MaidenheadLocator::parse("1A23AB").is_err());
    }

    #[test]
    fn round_trips_4_char() {
        let g = MaidenheadLocator::parse("JO62").unwrap();
        let center = g.to_center();
        let back = MaidenheadLocator::from_coordinate(center, 4).unwrap();
        assert_eq!(back.as_str(), "JO62");
    }

    #[test]
    fn round_trips_6_char() {
        let g = MaidenheadLocator::parse("JO62QM").unwrap();
        let center = g.to_center();
        let back = MaidenheadLocator::from_coordinate(center, 6).unwrap();
        assert_eq!(back.as_str(), "JO62QM");
    }

    #[test]
    fn round_trips_8_char() {
        let g = MaidenheadLocator::parse("JO62QM15").unwrap();
        let center = g.to_center();
        let back = MaidenheadLocator::from_coordinate(center, 8).unwrap();
        assert_eq!(back.as_str(), "JO62QM15");
    }
}
