//! The session registry: the state machine over all registration sessions.
//!
//! This is the core of the session layer. It's responsible for:
//! - Creating sessions with fresh, never-reused ids
//! - Applying device scans at most once
//! - Cancelling pending sessions
//! - Committing expiry lazily on every read
//! - Purging terminal sessions after the retention window
//!
//! # Concurrency note
//!
//! `SessionRegistry` is NOT thread-safe by itself. It's a plain
//! `HashMap` behind `&mut self`. [`Coordinator`](crate::Coordinator) wraps
//! it in a mutex so that every transition on a session, including the
//! lazy expiry a read may commit, happens in one critical section.

use std::collections::HashMap;

use rand::Rng;
use tagreg_protocol::SessionId;
use tokio::time::Instant;

use crate::{
    IgnoreReason, RegistrationSession, ScanOutcome, SessionConfig, SessionError,
    SessionStatus,
};

/// Holds every known registration session.
///
/// ## Lifecycle
///
/// ```text
/// start() ──→ [Pending] ──report_scan()──→ [Completed]
///                │  │
///                │  └──────cancel()──────→ [Cancelled]
///                │
///                └──deadline (read/sweep)─→ [Expired]
///
///  [any terminal] ──retention elapsed──→ purge_terminal() ──→ gone
/// ```
pub struct SessionRegistry {
    /// All known sessions, keyed by id.
    sessions: HashMap<SessionId, RegistrationSession>,

    /// Timeout, retention, sweep period.
    config: SessionConfig,
}

impl SessionRegistry {
    /// Creates an empty registry. The config is validated first.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config: config.validated(),
        }
    }

    /// The (validated) configuration in use.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Creates a new pending session expiring `timeout_secs` from now.
    ///
    /// Always succeeds. The id is regenerated in the (practically
    /// impossible) case it collides with a session still in the map.
    pub fn start(&mut self) -> &RegistrationSession {
        let mut id = generate_id();
        while self.sessions.contains_key(&id) {
            id = generate_id();
        }

        let session = RegistrationSession::new(id.clone(), Instant::now(), self.config.timeout());
        tracing::info!(
            session_id = %id,
            timeout_secs = self.config.timeout_secs,
            "registration session started"
        );

        self.sessions.entry(id).or_insert(session)
    }

    /// Applies a device scan to a session.
    ///
    /// Only a pending session whose deadline hasn't passed accepts the
    /// scan. Anything else leaves the registry untouched and reports why.
    /// A pending session found past its deadline is committed as expired
    /// first, so the scan is ignored as "already expired".
    pub fn report_scan(&mut self, session_id: &SessionId, tag: impl Into<String>) -> ScanOutcome {
        let now = Instant::now();
        let Some(session) = self.sessions.get_mut(session_id) else {
            tracing::debug!(%session_id, "scan for unknown session ignored");
            return ScanOutcome::Ignored(IgnoreReason::UnknownSession);
        };

        if session.expire_if_due(now) {
            tracing::info!(%session_id, "registration session expired");
        }

        if session.status.is_terminal() {
            let status = session.status.wire();
            tracing::debug!(%session_id, %status, "scan for terminal session ignored");
            return ScanOutcome::Ignored(IgnoreReason::NotPending(status));
        }

        let tag = tag.into();
        tracing::info!(%session_id, tag = %tag, "registration session completed");
        session.status = SessionStatus::Completed { tag, at: now };
        ScanOutcome::Accepted
    }

    /// Cancels a pending session and returns the resulting status.
    ///
    /// Cancelling a terminal session is a no-op that returns the status
    /// unchanged; cancel is idempotent.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the id is unknown.
    pub fn cancel(&mut self, session_id: &SessionId) -> Result<SessionStatus, SessionError> {
        let now = Instant::now();
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        if session.expire_if_due(now) {
            tracing::info!(%session_id, "registration session expired");
        }

        if matches!(session.status, SessionStatus::Pending) {
            session.status = SessionStatus::Cancelled { at: now };
            tracing::info!(%session_id, "registration session cancelled");
        } else {
            tracing::debug!(
                %session_id,
                status = %session.status.wire(),
                "cancel for terminal session ignored"
            );
        }

        Ok(session.status.clone())
    }

    /// Returns the authoritative status of a session.
    ///
    /// If the session is still stored as pending but its deadline has
    /// passed, this read commits the expiry and returns `Expired`.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the id is unknown.
    pub fn get_status(&mut self, session_id: &SessionId) -> Result<SessionStatus, SessionError> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))?;

        if session.expire_if_due(Instant::now()) {
            tracing::info!(%session_id, "registration session expired");
        }

        Ok(session.status.clone())
    }

    /// Commits expiry for every pending session past its deadline.
    ///
    /// Lazy expiry already makes those sessions read as expired; the sweep
    /// just commits them in bulk so the transition shows up in logs and the
    /// retention clock starts. Returns the ids that were expired.
    pub fn expire_stale(&mut self) -> Vec<SessionId> {
        let now = Instant::now();
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if session.expire_if_due(now) {
                tracing::info!(
                    session_id = %session.id,
                    "registration session expired (sweep)"
                );
                expired.push(session.id.clone());
            }
        }

        expired
    }

    /// Removes terminal sessions whose terminal transition is older than
    /// the retention window. Returns how many were removed.
    ///
    /// Pending sessions are never purged, however old.
    pub fn purge_terminal(&mut self) -> usize {
        let now = Instant::now();
        let retention = self.config.retention();
        let before = self.sessions.len();

        self.sessions.retain(|_, session| match session.status.terminal_at() {
            Some(at) => now.saturating_duration_since(at) < retention,
            None => true,
        });

        let purged = before - self.sessions.len();
        if purged > 0 {
            tracing::debug!(purged, "purged terminal sessions");
        }
        purged
    }

    /// Looks up a session without committing lazy expiry.
    ///
    /// Useful for inspection; protocol reads should go through
    /// [`get_status`](Self::get_status).
    pub fn get(&self, session_id: &SessionId) -> Option<&RegistrationSession> {
        self.sessions.get(session_id)
    }

    /// Returns the number of sessions held (any state).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Generates a random 32-character hex id (128 bits of entropy).
fn generate_id() -> SessionId {
    SessionId::from_bytes(rand::rng().random())
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //!
    //! Time-dependent tests run on Tokio's paused clock and move it with
    //! `tokio::time::advance`, so a 30-second timeout takes no real time.

    use std::time::Duration;

    use tagreg_protocol::WireStatus;
    use tokio::time::advance;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn registry(timeout_secs: u64) -> SessionRegistry {
        SessionRegistry::new(SessionConfig {
            timeout_secs,
            retention_secs: 60,
            sweep_interval_secs: 5,
        })
    }

    fn start(reg: &mut SessionRegistry) -> SessionId {
        reg.start().id.clone()
    }

    fn unknown() -> SessionId {
        "never-created".parse().unwrap()
    }

    // =====================================================================
    // start()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_start_returns_pending_session_with_deadline() {
        let mut reg = registry(30);

        let session = reg.start();

        assert_eq!(session.status, SessionStatus::Pending);
        assert_eq!(session.id.as_str().len(), 32);
        assert_eq!(session.expires_at - session.created_at, Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_many_sessions_ids_are_unique() {
        let mut reg = registry(30);
        let ids: std::collections::HashSet<_> = (0..100).map(|_| start(&mut reg)).collect();
        assert_eq!(ids.len(), 100);
        assert_eq!(reg.len(), 100);
    }

    // =====================================================================
    // report_scan()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_report_scan_pending_completes_with_tag() {
        let mut reg = registry(30);
        let id = start(&mut reg);

        let outcome = reg.report_scan(&id, "TAG123");

        assert_eq!(outcome, ScanOutcome::Accepted);
        let status = reg.get_status(&id).unwrap();
        assert_eq!(status.tag(), Some("TAG123"));
        assert_eq!(status.wire(), WireStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_scan_twice_keeps_first_tag() {
        // At-most-once completion: the second scan is a no-op.
        let mut reg = registry(30);
        let id = start(&mut reg);
        reg.report_scan(&id, "FIRST");

        let outcome = reg.report_scan(&id, "SECOND");

        assert_eq!(
            outcome,
            ScanOutcome::Ignored(IgnoreReason::NotPending(WireStatus::Completed))
        );
        assert_eq!(reg.get_status(&id).unwrap().tag(), Some("FIRST"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_scan_unknown_session_ignored() {
        let mut reg = registry(30);
        let outcome = reg.report_scan(&unknown(), "TAG");
        assert_eq!(outcome, ScanOutcome::Ignored(IgnoreReason::UnknownSession));
        assert!(reg.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_scan_after_deadline_ignored_as_expired() {
        let mut reg = registry(30);
        let id = start(&mut reg);
        advance(Duration::from_secs(30)).await;

        let outcome = reg.report_scan(&id, "LATE");

        assert_eq!(
            outcome,
            ScanOutcome::Ignored(IgnoreReason::NotPending(WireStatus::Expired))
        );
        assert_eq!(reg.get_status(&id).unwrap().tag(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_scan_after_cancel_ignored() {
        let mut reg = registry(30);
        let id = start(&mut reg);
        reg.cancel(&id).unwrap();

        let outcome = reg.report_scan(&id, "TAG");

        assert_eq!(
            outcome,
            ScanOutcome::Ignored(IgnoreReason::NotPending(WireStatus::Cancelled))
        );
    }

    // =====================================================================
    // get_status(): lazy expiry
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_get_status_before_deadline_pending() {
        let mut reg = registry(30);
        let id = start(&mut reg);
        advance(Duration::from_secs(29)).await;

        assert_eq!(reg.get_status(&id).unwrap(), SessionStatus::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_status_at_deadline_expires_without_sweep() {
        let mut reg = registry(30);
        let id = start(&mut reg);
        advance(Duration::from_secs(30)).await;

        let status = reg.get_status(&id).unwrap();

        assert_eq!(status.wire(), WireStatus::Expired);
        // The read committed the transition: the stored state agrees.
        assert_eq!(reg.get(&id).unwrap().status.wire(), WireStatus::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_status_expired_stays_expired_on_every_read() {
        let mut reg = registry(30);
        let id = start(&mut reg);
        advance(Duration::from_secs(31)).await;

        let first = reg.get_status(&id).unwrap();
        advance(Duration::from_secs(5)).await;
        let second = reg.get_status(&id).unwrap();

        // Same committed timestamp: the second read didn't re-expire it.
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_status_unknown_session_not_found() {
        let mut reg = registry(30);
        let result = reg.get_status(&unknown());
        assert!(matches!(result, Err(SessionError::NotFound(id)) if id == unknown()));
    }

    // =====================================================================
    // cancel()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_becomes_cancelled() {
        let mut reg = registry(30);
        let id = start(&mut reg);

        let status = reg.cancel(&id).unwrap();

        assert_eq!(status.wire(), WireStatus::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_terminal_sessions_is_idempotent() {
        let mut reg = registry(30);

        let completed = start(&mut reg);
        reg.report_scan(&completed, "TAG");
        let before = reg.get_status(&completed).unwrap();
        assert_eq!(reg.cancel(&completed).unwrap(), before);

        let cancelled = start(&mut reg);
        let first = reg.cancel(&cancelled).unwrap();
        advance(Duration::from_secs(1)).await;
        assert_eq!(reg.cancel(&cancelled).unwrap(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_deadline_reports_expired() {
        let mut reg = registry(30);
        let id = start(&mut reg);
        advance(Duration::from_secs(30)).await;

        let status = reg.cancel(&id).unwrap();

        assert_eq!(status.wire(), WireStatus::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_unknown_session_not_found() {
        let mut reg = registry(30);
        assert!(matches!(
            reg.cancel(&unknown()),
            Err(SessionError::NotFound(_))
        ));
    }

    // =====================================================================
    // expire_stale() / purge_terminal()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_expire_stale_only_expires_overdue_pending() {
        let mut reg = registry(30);
        let old = start(&mut reg);
        let done = start(&mut reg);
        reg.report_scan(&done, "TAG");
        advance(Duration::from_secs(20)).await;
        let young = start(&mut reg);
        advance(Duration::from_secs(10)).await;

        let expired = reg.expire_stale();

        assert_eq!(expired, vec![old.clone()]);
        assert_eq!(reg.get(&young).unwrap().status, SessionStatus::Pending);
        assert_eq!(reg.get(&done).unwrap().scanned_tag(), Some("TAG"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_terminal_respects_retention() {
        let mut reg = registry(30);
        let done = start(&mut reg);
        reg.report_scan(&done, "TAG");
        let pending = start(&mut reg);

        advance(Duration::from_secs(59)).await;
        assert_eq!(reg.purge_terminal(), 0);

        advance(Duration::from_secs(1)).await;
        // `pending` is past its deadline but was never committed, so it
        // isn't terminal yet and survives this purge.
        assert_eq!(reg.purge_terminal(), 1);
        assert!(matches!(reg.get_status(&done), Err(SessionError::NotFound(_))));
        assert_eq!(reg.get_status(&pending).unwrap().wire(), WireStatus::Expired);
    }
}
