//! Geographic coordinates.

use serde::{Deserialize, Serialize};

/// A geographic coordinate in decimal degrees (WGS 84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new coordinate.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction() {
        let p = GeoPoint::new(36.5725, -121.9486);
        assert_eq!(p.latitude, 36.5725);
        assert_eq!(p.longitude, -121.9486);
    }
}
