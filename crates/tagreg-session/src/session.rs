//! Session types: the records the Coordinator keeps for each registration.
//!
//! A "session" pairs one waiting requester with one future tag scan. It
//! tracks:
//! - WHO it is (`SessionId`)
//! - WHAT state it's in (pending, completed, expired, cancelled)
//! - WHEN it stops accepting scans (`expires_at`)

use std::time::Duration;

use tagreg_protocol::{SessionId, StatusResponse, WireStatus};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long (in seconds) a session waits for a scan before expiring.
    ///
    /// Default: 30 seconds.
    pub timeout_secs: u64,

    /// How long (in seconds) a terminal session stays queryable before the
    /// sweeper purges it. After purge, queries report "not found".
    ///
    /// Default: 300 seconds.
    pub retention_secs: u64,

    /// Period (in seconds) of the background sweep that commits expiries
    /// and purges old terminal sessions.
    ///
    /// Default: 5 seconds.
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            retention_secs: 300,
            sweep_interval_secs: 5,
        }
    }
}

impl SessionConfig {
    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// - `timeout_secs` is at least 1 (a zero timeout would expire every
    ///   session before the requester could poll it once).
    /// - `sweep_interval_secs` is at least 1.
    pub fn validated(mut self) -> Self {
        if self.timeout_secs == 0 {
            tracing::warn!("timeout_secs is 0, clamping to 1");
            self.timeout_secs = 1;
        }
        if self.sweep_interval_secs == 0 {
            tracing::warn!("sweep_interval_secs is 0, clamping to 1");
            self.sweep_interval_secs = 1;
        }
        self
    }

    /// The session timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The retention window as a `Duration`.
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    /// The sweep period as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a registration session.
///
/// ```text
///             ┌──(report_scan)──→ Completed { tag, at }
///   Pending ──┼──(deadline)─────→ Expired { at }
///             └──(cancel)───────→ Cancelled { at }
/// ```
///
/// Every terminal variant carries its own timestamp, and only `Completed`
/// carries a tag. That makes "completed_at, expired_at and cancelled_at
/// are mutually exclusive" and "a tag exists only on completion" facts of
/// the type rather than rules someone has to remember.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Waiting for a device scan.
    Pending,

    /// A device reported `tag` at `at`.
    Completed { tag: String, at: Instant },

    /// The deadline passed without a scan. `at` is when the expiry was
    /// committed (by a read or by the sweeper), not the deadline itself.
    Expired { at: Instant },

    /// The session was cancelled at `at`.
    Cancelled { at: Instant },
}

impl SessionStatus {
    /// Whether this is one of the three terminal states.
    pub fn is_terminal(&self) -> bool {
        self.wire().is_terminal()
    }

    /// When the terminal transition happened, or `None` while pending.
    pub fn terminal_at(&self) -> Option<Instant> {
        match self {
            Self::Pending => None,
            Self::Completed { at, .. } | Self::Expired { at } | Self::Cancelled { at } => {
                Some(*at)
            }
        }
    }

    /// The scanned tag, if the session completed.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Completed { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// The status as it appears on the wire.
    pub fn wire(&self) -> WireStatus {
        match self {
            Self::Pending => WireStatus::Pending,
            Self::Completed { .. } => WireStatus::Completed,
            Self::Expired { .. } => WireStatus::Expired,
            Self::Cancelled { .. } => WireStatus::Cancelled,
        }
    }
}

impl From<&SessionStatus> for StatusResponse {
    fn from(status: &SessionStatus) -> Self {
        match status {
            SessionStatus::Pending => StatusResponse::pending(),
            SessionStatus::Completed { tag, .. } => StatusResponse::completed(tag.clone()),
            SessionStatus::Expired { .. } => StatusResponse::expired(),
            SessionStatus::Cancelled { .. } => StatusResponse::cancelled(),
        }
    }
}

// ---------------------------------------------------------------------------
// RegistrationSession
// ---------------------------------------------------------------------------

/// A single registration session held by the Coordinator.
#[derive(Debug, Clone)]
pub struct RegistrationSession {
    /// Unique, never reused.
    pub id: SessionId,

    /// Current lifecycle state.
    pub status: SessionStatus,

    /// When the session was started.
    pub created_at: Instant,

    /// `created_at + timeout`. At or after this instant a pending session
    /// is expired, whether or not anyone has committed it yet.
    pub expires_at: Instant,
}

impl RegistrationSession {
    pub(crate) fn new(id: SessionId, now: Instant, timeout: Duration) -> Self {
        Self {
            id,
            status: SessionStatus::Pending,
            created_at: now,
            expires_at: now + timeout,
        }
    }

    /// The scanned tag, once the session has completed.
    pub fn scanned_tag(&self) -> Option<&str> {
        self.status.tag()
    }

    /// Commits `Pending → Expired` if the deadline has passed.
    ///
    /// Returns `true` if this call performed the transition.
    pub(crate) fn expire_if_due(&mut self, now: Instant) -> bool {
        if matches!(self.status, SessionStatus::Pending) && now >= self.expires_at {
            self.status = SessionStatus::Expired { at: now };
            return true;
        }
        false
    }
}
