//! Error types for the client.

use tagreg_protocol::{ProtocolError, SessionId};

/// Errors from a single call to the Coordinator.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never got a response (connection refused, timeout, ...).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The Coordinator doesn't know the session.
    #[error("session not found: {0}")]
    NotFound(String),

    /// Any other non-success HTTP status.
    #[error("coordinator returned {code}: {message}")]
    Status { code: u16, message: String },

    /// The response didn't decode or failed validation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ApiError {
    /// Whether this counts toward the "coordinator unreachable" budget.
    ///
    /// Everything except `NotFound` does: a 5xx or a garbled body says as
    /// little about the session as a refused connection.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

/// Errors that end a wait (or prevent it from starting).
///
/// These are the only conditions that should interrupt the waiting UI.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The start call failed; no session exists and no timers run.
    #[error("could not start registration session: {0}")]
    Start(#[source] ApiError),

    /// The Coordinator reported the session unknown mid-wait.
    #[error("registration session {0} not found")]
    SessionNotFound(SessionId),

    /// Too many consecutive polls failed.
    #[error("coordinator unreachable after {attempts} consecutive failed polls")]
    Unreachable {
        attempts: u32,
        #[source]
        last: ApiError,
    },

    /// The driver task ended without reporting an outcome.
    #[error("registration wait aborted")]
    Aborted,
}
