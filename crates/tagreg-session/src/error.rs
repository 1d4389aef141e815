//! Error types for the session layer.

use tagreg_protocol::SessionId;

/// Errors surfaced by the Coordinator.
///
/// Deliberately small: every other odd situation (a duplicate scan, a late
/// cancel, a scan after expiry) is a benign race and resolves as a no-op
/// transition rather than an error.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session with this id is known.
    ///
    /// Distinct from an expired session: an expired session's id is still
    /// known until the retention window purges it.
    #[error("session {0} not found")]
    NotFound(SessionId),
}
