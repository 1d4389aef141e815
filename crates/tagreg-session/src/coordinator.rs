//! The Coordinator: shared, serialized access to the session registry.
//!
//! The registry is a single-owner state machine. The Coordinator is what
//! the rest of the system actually holds (usually behind an `Arc`): HTTP
//! handlers, device integrations and the retention sweeper all call into
//! it concurrently, and it funnels every call through one async mutex.
//! That is what upholds at-most-once completion when a scan, a cancel and
//! a status read for the same session race each other.

use tagreg_protocol::SessionId;
use tokio::sync::Mutex;

use crate::{ScanOutcome, ScanSink, SessionConfig, SessionError, SessionRegistry, SessionStatus};

/// Result of one retention sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Pending sessions whose expiry the sweep committed.
    pub expired: Vec<SessionId>,
    /// Terminal sessions removed after their retention window.
    pub purged: usize,
}

/// Authoritative owner of registration session state.
pub struct Coordinator {
    registry: Mutex<SessionRegistry>,
    /// Copy of the validated config, readable without taking the lock.
    config: SessionConfig,
}

impl Coordinator {
    /// Creates a coordinator with an empty registry.
    pub fn new(config: SessionConfig) -> Self {
        let registry = SessionRegistry::new(config);
        let config = registry.config().clone();
        Self {
            registry: Mutex::new(registry),
            config,
        }
    }

    /// The validated configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Starts a new pending session and returns its id.
    pub async fn start(&self) -> SessionId {
        self.registry.lock().await.start().id.clone()
    }

    /// Applies a device scan. Never fails; see [`ScanOutcome`].
    pub async fn report_scan(&self, session_id: &SessionId, tag: impl Into<String>) -> ScanOutcome {
        self.registry.lock().await.report_scan(session_id, tag)
    }

    /// Cancels a pending session; idempotent on terminal sessions.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the id is unknown.
    pub async fn cancel(&self, session_id: &SessionId) -> Result<SessionStatus, SessionError> {
        self.registry.lock().await.cancel(session_id)
    }

    /// Reads the authoritative status, committing lazy expiry.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the id is unknown.
    pub async fn get_status(&self, session_id: &SessionId) -> Result<SessionStatus, SessionError> {
        self.registry.lock().await.get_status(session_id)
    }

    /// Commits overdue expiries, then purges terminal sessions older than
    /// the retention window.
    pub async fn sweep(&self) -> SweepReport {
        let mut registry = self.registry.lock().await;
        let expired = registry.expire_stale();
        let purged = registry.purge_terminal();
        SweepReport { expired, purged }
    }

    /// Number of sessions currently held (any state).
    pub async fn len(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Returns `true` if no sessions are held.
    pub async fn is_empty(&self) -> bool {
        self.registry.lock().await.is_empty()
    }
}

impl ScanSink for Coordinator {
    async fn notify_scan(&self, session_id: &SessionId, tag: String) -> ScanOutcome {
        self.report_scan(session_id, tag).await
    }
}
