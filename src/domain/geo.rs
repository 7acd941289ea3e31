use crate::error::Error;
use serde::{Deserialize, Serialize};

/// A validated latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    latitude: f64,
    longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, Error> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::validation("latitude", "out of range [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::validation("longitude", "out of range [-180, 180]"));
        }
        Ok(GeoCoordinate {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// The 1 degree x 1 degree area-routing cell this point falls in.
    pub fn area_cell(&self) -> (i64, i64) {
        (self.latitude.floor() as i64, self.longitude.floor() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_values() {
        assert!(GeoCoordinate::new(90.0, 180.0).is_ok());
        assert!(GeoCoordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(GeoCoordinate::new(90.1, 0.0).is_err());
        assert!(GeoCoordinate::new(0.0, 180.1).is_err());
    }

    #[test]
    fn area_cell_floors_negative_correctly() {
        let c = GeoCoordinate::new(-0.5, -0.5).unwrap();
        assert_eq!(c.area_cell(), (-1, -1));
        let c = GeoCoordinate::new(52.9, 21.9).unwrap();
        assert_eq!(c.area_cell(), (52, 21));
    }
}
