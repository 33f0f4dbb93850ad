//! Geographic primitives: coordinates and the rectangular map viewport.

use serde::{Deserialize, Serialize};

/// A WGS84 latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Parse a stored coordinate string.
///
/// Returns `None` for anything that is not a finite decimal number. Surrounding
/// whitespace is not tolerated, matching how the values are stored.
pub fn parse_coordinate(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// The rectangle currently visible on the map: a center plus a span in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportBounds {
    pub center: Coordinate,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl ViewportBounds {
    pub const fn new(center: Coordinate, latitude_delta: f64, longitude_delta: f64) -> Self {
        Self {
            center,
            latitude_delta,
            longitude_delta,
        }
    }

    pub fn min_latitude(&self) -> f64 {
        self.center.latitude - self.latitude_delta / 2.0
    }

    pub fn max_latitude(&self) -> f64 {
        self.center.latitude + self.latitude_delta / 2.0
    }

    pub fn min_longitude(&self) -> f64 {
        self.center.longitude - self.longitude_delta / 2.0
    }

    pub fn max_longitude(&self) -> f64 {
        self.center.longitude + self.longitude_delta / 2.0
    }

    /// Closed-interval containment on both axes.
    ///
    /// No antimeridian wrapping: a viewport whose longitude range crosses
    /// ±180° simply extends past it.
    pub fn contains(&self, point: Coordinate) -> bool {
        point.latitude >= self.min_latitude()
            && point.latitude <= self.max_latitude()
            && point.longitude >= self.min_longitude()
            && point.longitude <= self.max_longitude()
    }
}

impl Default for ViewportBounds {
    /// Central London at roughly city scale.
    fn default() -> Self {
        Self::new(Coordinate::new(51.5074, -0.1278), 0.2, 0.2)
    }
}
