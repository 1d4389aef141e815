//! The observable state handed to the presentation layer.

use tagreg_protocol::{SessionId, WireStatus};

/// Snapshot of a registration wait, published through a
/// `tokio::sync::watch` channel on every change.
///
/// This is a mirror, never the source of truth: `last_known_status` is
/// whatever the Coordinator said on the most recent successful poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientView {
    /// `true` while the wait is running (timers active).
    pub is_waiting: bool,
    /// The session being waited on.
    pub session_id: Option<SessionId>,
    /// Seconds left on the countdown. Restored to the full timeout when the
    /// wait ends.
    pub remaining_secs: u64,
    /// The scanned tag, once the session completed.
    pub result_tag: Option<String>,
    /// Status from the last successful poll.
    pub last_known_status: Option<WireStatus>,
    /// Set when the wait ended with an error worth showing the user.
    pub error: Option<String>,
}

impl ClientView {
    /// The view of a fresh wait on `session_id`.
    pub fn waiting(session_id: SessionId, timeout_secs: u64) -> Self {
        Self {
            is_waiting: true,
            session_id: Some(session_id),
            remaining_secs: timeout_secs,
            result_tag: None,
            last_known_status: Some(WireStatus::Pending),
            error: None,
        }
    }

    /// Back to idle: timers off, countdown restored. The session id, tag,
    /// status and error stay so the UI can show how the wait ended.
    pub(crate) fn reset_to_idle(&mut self, timeout_secs: u64) {
        self.is_waiting = false;
        self.remaining_secs = timeout_secs;
    }
}
