//! Error types for journey simulation.

use thiserror::Error;
use worldview_core::ErrorCode;
use worldview_geo::GeoError;

/// Result type alias for journey operations.
pub type Result<T> = std::result::Result<T, JourneyError>;

/// Errors surfaced by journey state, the orchestrator and its collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JourneyError {
    /// Bad input to a constructor or operation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation not allowed in the journey's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Referenced journey is absent
    #[error("Journey not found: {0}")]
    JourneyNotFound(String),

    /// Referenced route is absent
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    /// A journey with this id is already active
    #[error("Journey already exists: {0}")]
    AlreadyExists(String),

    /// The route source has nothing to choose from
    #[error("No routes available")]
    NoRoutesAvailable,

    /// Routes could not be loaded
    #[error("Route source error: {0}")]
    RouteSource(String),

    /// The journey store failed
    #[error("Repository error: {0}")]
    Repository(String),
}

impl JourneyError {
    /// Shared error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            JourneyError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            JourneyError::InvalidState(_) => ErrorCode::InvalidState,
            JourneyError::JourneyNotFound(_) => ErrorCode::JourneyNotFound,
            JourneyError::RouteNotFound(_) => ErrorCode::RouteNotFound,
            JourneyError::AlreadyExists(_) => ErrorCode::JourneyAlreadyExists,
            JourneyError::NoRoutesAvailable => ErrorCode::NoRoutesAvailable,
            JourneyError::RouteSource(_) => ErrorCode::RouteSourceError,
            JourneyError::Repository(_) => ErrorCode::RepositoryError,
        }
    }

    /// HTTP-equivalent status for a transport layer.
    pub fn status_code(&self) -> u16 {
        self.code().http_status()
    }

    /// True for either not-found variant.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            JourneyError::JourneyNotFound(_) | JourneyError::RouteNotFound(_)
        )
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        JourneyError::InvalidState(message.into())
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        JourneyError::InvalidArgument(message.into())
    }
}

impl From<GeoError> for JourneyError {
    fn from(err: GeoError) -> Self {
        JourneyError::InvalidArgument(err.to_string())
    }
}

impl From<JourneyError> for worldview_core::Error {
    fn from(err: JourneyError) -> Self {
        let core = worldview_core::Error::new(err.code(), err.to_string());
        match err {
            JourneyError::NoRoutesAvailable => core.with_suggestion(
                "Configure routes.file or check that the routes file is not empty",
            ),
            JourneyError::AlreadyExists(_) => {
                core.with_suggestion("Stop the existing journey or choose a different id")
            }
            _ => core,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(JourneyError::JourneyNotFound("j".into()).status_code(), 404);
        assert_eq!(JourneyError::RouteNotFound("r".into()).status_code(), 404);
        assert_eq!(JourneyError::AlreadyExists("j".into()).status_code(), 409);
        assert_eq!(JourneyError::invalid_argument("x").status_code(), 400);
        assert_eq!(JourneyError::invalid_state("x").status_code(), 400);
        assert_eq!(JourneyError::NoRoutesAvailable.status_code(), 500);
    }

    #[test]
    fn test_geo_errors_become_invalid_argument() {
        let err: JourneyError = GeoError::IndexOutOfRange { index: 4, len: 2 }.into();
        assert!(matches!(err, JourneyError::InvalidArgument(_)));
    }

    #[test]
    fn test_into_core_error() {
        let core: worldview_core::Error = JourneyError::NoRoutesAvailable.into();
        assert_eq!(core.code, ErrorCode::NoRoutesAvailable);
        assert!(core.suggestion.is_some());
        assert_eq!(core.exit_code(), worldview_core::error::exit_codes::NO_ROUTES);
    }
}
