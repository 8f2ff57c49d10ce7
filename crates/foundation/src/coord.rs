use serde::{Deserialize, Serialize};

/// Geographic coordinate in WGS84 degrees.
///
/// Ordering contract: wherever a coordinate is written as a pair it is
/// `[longitude, latitude]`, matching GeoJSON and the engine's camera API.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub longitude: f64,
    pub latitude: f64,
}

impl LngLat {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// `[lon, lat]` pair.
    pub fn to_array(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    /// True if both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::LngLat;

    #[test]
    fn array_order_is_lon_lat() {
        let c = LngLat::new(-71.0, 42.0);
        assert_eq!(c.to_array(), [-71.0, 42.0]);
    }

    #[test]
    fn validity_checks_ranges_and_nan() {
        assert!(LngLat::new(180.0, -90.0).is_valid());
        assert!(!LngLat::new(181.0, 0.0).is_valid());
        assert!(!LngLat::new(0.0, 90.5).is_valid());
        assert!(!LngLat::new(f64::NAN, 0.0).is_valid());
    }
}
