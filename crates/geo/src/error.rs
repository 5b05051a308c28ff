//! Error types for the geo crate.

use thiserror::Error;

/// Result type alias for geo operations.
pub type Result<T> = std::result::Result<T, GeoError>;

/// Errors that can occur during geo operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude or longitude outside the valid range
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Bad input to a constructor or pure function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Waypoint index outside the route
    #[error("Waypoint index {index} out of range for route with {len} waypoints")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of waypoints on the route
        len: usize,
    },
}

/// Error code for integration with worldview-core error handling.
/// Range: 10xxx for geo errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoErrorCode {
    /// Invalid coordinate values
    InvalidCoordinate = 10001,
    /// Invalid argument
    InvalidArgument = 10002,
    /// Index out of range
    IndexOutOfRange = 10003,
}

impl GeoError {
    /// Returns the error code for this error.
    pub fn code(&self) -> GeoErrorCode {
        match self {
            GeoError::InvalidCoordinate(_) => GeoErrorCode::InvalidCoordinate,
            GeoError::InvalidArgument(_) => GeoErrorCode::InvalidArgument,
            GeoError::IndexOutOfRange { .. } => GeoErrorCode::IndexOutOfRange,
        }
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        GeoError::InvalidArgument(message.into())
    }
}
