//! Geospatial primitives for the World-View journey simulation.
//!
//! This crate provides:
//! - A validated [`Coordinate`] value type
//! - Haversine distance, initial bearing and linear interpolation
//! - Path helpers for segment and total lengths
//! - An immutable, validated [`Route`] of waypoints
//!
//! # Example
//!
//! ```
//! use worldview_geo::{haversine_distance, Coordinate};
//!
//! let berlin = Coordinate::new(52.5200, 13.4050).unwrap();
//! let paris = Coordinate::new(48.8566, 2.3522).unwrap();
//!
//! let distance_km = haversine_distance(&berlin, &paris);
//! assert!((distance_km - 878.0).abs() < 10.0); // ~878 km
//! ```

mod error;
mod haversine;
pub mod path;
mod route;

pub use error::{GeoError, GeoErrorCode, Result};
pub use haversine::{
    EARTH_RADIUS_KM, EARTH_RADIUS_M, haversine_distance, haversine_distance_meters,
    initial_bearing,
};
pub use path::{path_length, segment_lengths};
pub use route::Route;

use serde::{Deserialize, Serialize};

/// A geographic coordinate with latitude and longitude.
///
/// Values are checked on construction, so every `Coordinate` in the program
/// is within range. Deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Creates a new coordinate.
    ///
    /// # Arguments
    /// * `latitude` - Latitude in degrees (-90 to 90)
    /// * `longitude` - Longitude in degrees (-180 to 180)
    ///
    /// # Errors
    /// Returns [`GeoError::InvalidCoordinate`] if either value is out of range
    /// or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let coord = Self { latitude, longitude };
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(GeoError::InvalidCoordinate(format!(
                "latitude {latitude} / longitude {longitude} outside [-90,90] / [-180,180]"
            )))
        }
    }

    /// Latitude in degrees.
    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns true if the coordinate has valid values.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Great-circle distance to `other` in meters.
    #[inline]
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance_meters(self, other)
    }

    /// Initial bearing towards `other` in degrees, `[0, 360)`.
    #[inline]
    pub fn bearing_to(&self, other: &Coordinate) -> f64 {
        initial_bearing(self, other)
    }

    /// Linear blend between `self` and `target` on latitude and longitude.
    ///
    /// This is a straight component-wise blend, not a great-circle path. Over
    /// the short segments of a simulated road route the difference is
    /// negligible, and simulated positions depend on this exact formula.
    ///
    /// # Errors
    /// Returns [`GeoError::InvalidArgument`] if `fraction` is not in `[0, 1]`.
    pub fn interpolate_to(&self, target: &Coordinate, fraction: f64) -> Result<Coordinate> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(GeoError::invalid_argument(format!(
                "interpolation fraction must be within [0, 1], got {fraction}"
            )));
        }

        // Rounding can push a blend towards a boundary endpoint one ulp past it.
        Ok(Coordinate {
            latitude: (self.latitude + (target.latitude - self.latitude) * fraction)
                .clamp(-90.0, 90.0),
            longitude: (self.longitude + (target.longitude - self.longitude) * fraction)
                .clamp(-180.0, 180.0),
        })
    }

    /// Converts degrees to radians for internal calculations.
    #[inline]
    pub(crate) fn to_radians(&self) -> (f64, f64) {
        (self.latitude.to_radians(), self.longitude.to_radians())
    }
}

impl TryFrom<(f64, f64)> for Coordinate {
    type Error = GeoError;

    fn try_from((lat, lng): (f64, f64)) -> Result<Self> {
        Self::new(lat, lng)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}
