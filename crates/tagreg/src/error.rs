//! Unified error type for the Coordinator server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tagreg_protocol::{ErrorBody, ProtocolError};
use tagreg_session::SessionError;

/// Top-level error that wraps the sub-crate errors.
///
/// Handlers return `Result<_, TagregError>` and use `?` freely; the
/// `#[from]` attributes generate the conversions, and the
/// [`IntoResponse`] impl picks the HTTP status and error body.
#[derive(Debug, thiserror::Error)]
pub enum TagregError {
    /// A session-level error (unknown id).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A malformed or invalid request.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Binding or serving the listener failed.
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TagregError {
    /// The HTTP status this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Session(SessionError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Protocol(ProtocolError::Encode(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Protocol(_) => StatusCode::BAD_REQUEST,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for TagregError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, code = status.as_u16(), "request rejected");
        }
        let body = ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_error_maps_to_not_found() {
        let err: TagregError = SessionError::NotFound("abc".parse().unwrap()).into();
        assert!(matches!(err, TagregError::Session(_)));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_from_protocol_error_maps_to_bad_request() {
        let err: TagregError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, TagregError::Protocol(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_from_io_error_maps_to_internal() {
        let err: TagregError = std::io::Error::other("boom").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_response_uses_status_code() {
        let err: TagregError = SessionError::NotFound("gone".parse().unwrap()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
