//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shopfloor_core::fleet::FleetError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The requested machine does not exist.
    #[error("Machine not found")]
    MachineNotFound(String),

    /// The request body could not be understood.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<FleetError> for ObserverError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::NotFound { id } => Self::MachineNotFound(id),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::MachineNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_machine_maps_to_not_found() {
        let err = ObserverError::from(FleetError::NotFound {
            id: String::from("ghost"),
        });
        assert!(matches!(err, ObserverError::MachineNotFound(ref id) if id == "ghost"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn invalid_request_is_bad_request() {
        let err = ObserverError::InvalidRequest(String::from("invalid body"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn other_fleet_errors_are_internal() {
        let err = ObserverError::from(FleetError::DuplicateId {
            id: String::from("vf2"),
        });
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
