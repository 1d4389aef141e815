//! The device notification contract.
//!
//! The scanning hardware isn't part of this workspace. Whatever integrates
//! it (a serial reader daemon, a terminal's webhook, the HTTP scan route)
//! only needs something that implements [`ScanSink`]: one async method
//! that says "tag X was scanned for session S".
//!
//! Delivery is at-most-once-effective. The sink answers every report with
//! a [`ScanOutcome`], never an error; an ignored scan is a normal outcome
//! of benign races (duplicate notification, scan after expiry or cancel).

use std::fmt;
use std::sync::Arc;

use tagreg_protocol::{SessionId, WireStatus};

/// Receives scan notifications from a device.
///
/// `Send + Sync + 'static` so a single sink can be shared by every device
/// task and by the HTTP handlers.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tagreg_session::{Coordinator, ScanOutcome, ScanSink, SessionConfig};
///
/// # async fn demo() {
/// let coordinator = Arc::new(Coordinator::new(SessionConfig::default()));
/// let id = coordinator.start().await;
///
/// // A device integration only sees the trait.
/// async fn on_scan(sink: &impl ScanSink, id: &tagreg_protocol::SessionId) -> ScanOutcome {
///     sink.notify_scan(id, "TAG123".into()).await
/// }
/// assert_eq!(on_scan(&coordinator, &id).await, ScanOutcome::Accepted);
/// # }
/// ```
pub trait ScanSink: Send + Sync + 'static {
    /// Reports that `tag` was scanned for `session_id`.
    async fn notify_scan(&self, session_id: &SessionId, tag: String) -> ScanOutcome;
}

impl<T: ScanSink> ScanSink for Arc<T> {
    async fn notify_scan(&self, session_id: &SessionId, tag: String) -> ScanOutcome {
        T::notify_scan(self, session_id, tag).await
    }
}

/// What happened to a scan report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The scan completed a pending session.
    Accepted,
    /// The scan was dropped; the session is unchanged.
    Ignored(IgnoreReason),
}

impl ScanOutcome {
    /// Whether the scan completed the session.
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Why a scan report was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No session with that id exists (never created, or already purged).
    UnknownSession,
    /// The session had already reached the given terminal status.
    NotPending(WireStatus),
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSession => f.write_str("unknown session"),
            Self::NotPending(status) => write!(f, "session already {status}"),
        }
    }
}
