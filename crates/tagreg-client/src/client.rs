//! The registration wait: start a session, then poll and count down until
//! something ends it.
//!
//! Each wait is one spawned driver task that owns both timers and, at
//! most, one outstanding status request. Everything the task does happens
//! inside a single `tokio::select!` loop, so there is exactly one logical
//! thread of control per wait and no state shared with the caller other
//! than the published [`ClientView`].
//!
//! # Ordering within a scheduler pass
//!
//! The select is `biased`, with branches checked in this order:
//!
//! 1. user cancellation
//! 2. a finished status request
//! 3. the poll timer
//! 4. the countdown timer
//!
//! So a completion that is ready in the same pass as the countdown's last
//! tick wins, and a cancel beats everything.
//!
//! When the countdown reaches zero the driver still asks the Coordinator
//! one last time before giving up: it settles the outstanding poll, or
//! issues a final status read if none is out. Only a `pending` answer or a
//! failed read ends the wait as [`WaitOutcome::TimedOut`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tagreg_protocol::{SessionId, StatusResponse, WireStatus};
use tagreg_tick::{PeriodicTimer, TickPolicy, TimerConfig};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::{ApiError, ClientConfig, ClientError, ClientView, CoordinatorApi};

/// The countdown always ticks once per second; it counts seconds.
const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// An outstanding status request.
type PollFuture = Pin<Box<dyn Future<Output = Result<StatusResponse, ApiError>> + Send>>;

/// How a wait ended, when it ended normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The Coordinator reported the session completed with this tag.
    Completed(String),
    /// The Coordinator reported the session expired.
    Expired,
    /// The local countdown reached zero first.
    TimedOut,
    /// The user cancelled, or the session was cancelled server-side.
    Cancelled,
}

// ---------------------------------------------------------------------------
// SessionClient
// ---------------------------------------------------------------------------

/// Starts registration waits against a Coordinator.
pub struct SessionClient<A: CoordinatorApi> {
    api: Arc<A>,
    config: ClientConfig,
}

impl<A: CoordinatorApi> SessionClient<A> {
    /// Creates a client over the given Coordinator API.
    pub fn new(api: A, config: ClientConfig) -> Self {
        Self {
            api: Arc::new(api),
            config,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Starts a session and begins waiting on it.
    ///
    /// The countdown starts from the timeout the Coordinator advertises,
    /// falling back to [`ClientConfig::timeout_secs`].
    ///
    /// # Errors
    /// Returns [`ClientError::Start`] if the start call fails. In that case
    /// no session exists and nothing is left running.
    pub async fn begin(&self) -> Result<WaitHandle, ClientError> {
        let started = self.api.start().await.map_err(|e| {
            tracing::warn!(error = %e, "registration start failed");
            ClientError::Start(e)
        })?;

        let session_id = started.session_id;
        let timeout_secs = started.timeout_secs.unwrap_or(self.config.timeout_secs);
        tracing::info!(%session_id, timeout_secs, "waiting for tag scan");

        let (view_tx, view_rx) = watch::channel(ClientView::waiting(session_id.clone(), timeout_secs));
        let (cancel_tx, cancel_rx) = mpsc::unbounded_channel();

        let driver = Driver {
            api: Arc::clone(&self.api),
            config: self.config.clone(),
            session_id: session_id.clone(),
            timeout_secs,
            view: view_tx,
            cancel: cancel_rx,
        };
        let task = tokio::spawn(driver.run());

        Ok(WaitHandle {
            session_id,
            view: view_rx,
            cancel: cancel_tx,
            task: Some(task),
        })
    }
}

// ---------------------------------------------------------------------------
// WaitHandle
// ---------------------------------------------------------------------------

/// Owns a running wait.
///
/// Dropping the handle aborts the driver task, which drops both timers
/// and any outstanding request with it. Nothing outlives the handle.
pub struct WaitHandle {
    session_id: SessionId,
    view: watch::Receiver<ClientView>,
    cancel: mpsc::UnboundedSender<()>,
    task: Option<JoinHandle<Result<WaitOutcome, ClientError>>>,
}

impl WaitHandle {
    /// The session being waited on.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// A receiver for the observable wait state.
    pub fn view(&self) -> watch::Receiver<ClientView> {
        self.view.clone()
    }

    /// Cancels the wait. Takes effect at the driver's next scheduler pass
    /// without waiting for an outstanding poll. Idempotent.
    pub fn cancel(&self) {
        let _ = self.cancel.send(());
    }

    /// A cloneable cancel button, usable while [`outcome`](Self::outcome)
    /// is being awaited elsewhere.
    pub fn canceller(&self) -> Canceller {
        Canceller(self.cancel.clone())
    }

    /// Waits for the wait to end.
    ///
    /// # Errors
    /// Returns [`ClientError::SessionNotFound`] or
    /// [`ClientError::Unreachable`] if the wait ended on an error, and
    /// [`ClientError::Aborted`] if the driver task died.
    pub async fn outcome(mut self) -> Result<WaitOutcome, ClientError> {
        let Some(task) = self.task.take() else {
            return Err(ClientError::Aborted);
        };
        task.await.map_err(|_| ClientError::Aborted)?
    }
}

impl Drop for WaitHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Cancels a wait from anywhere. See [`WaitHandle::canceller`].
#[derive(Debug, Clone)]
pub struct Canceller(mpsc::UnboundedSender<()>);

impl Canceller {
    /// Cancels the wait. Idempotent, and harmless after the wait ended.
    pub fn cancel(&self) {
        let _ = self.0.send(());
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// State owned by the driver task for one wait.
struct Driver<A: CoordinatorApi> {
    api: Arc<A>,
    config: ClientConfig,
    session_id: SessionId,
    timeout_secs: u64,
    view: watch::Sender<ClientView>,
    cancel: mpsc::UnboundedReceiver<()>,
}

/// What a finished poll means for the wait.
enum PollStep {
    Continue,
    Done(Result<WaitOutcome, ClientError>),
}

impl<A: CoordinatorApi> Driver<A> {
    async fn run(mut self) -> Result<WaitOutcome, ClientError> {
        let session_id = self.session_id.clone();
        let mut poll_timer = PeriodicTimer::every("poll", self.config.poll_interval);
        let mut countdown = PeriodicTimer::new(
            "countdown",
            TimerConfig::every(COUNTDOWN_PERIOD).with_policy(TickPolicy::Fixed),
        );
        let mut remaining = self.timeout_secs;
        let mut in_flight: Option<PollFuture> = None;
        let mut failures = 0u32;

        let result = loop {
            tokio::select! {
                biased;

                Some(()) = self.cancel.recv() => {
                    // The outstanding poll, if any, is dropped with `in_flight`.
                    tracing::info!(%session_id, "registration wait cancelled by user");
                    self.cancel_on_server();
                    break Ok(WaitOutcome::Cancelled);
                }

                result = next_poll_result(&mut in_flight) => {
                    in_flight = None;
                    if let PollStep::Done(done) = self.handle_poll(result, &mut failures) {
                        break done;
                    }
                }

                _ = poll_timer.wait_for_tick() => {
                    if in_flight.is_some() {
                        tracing::debug!(%session_id, "previous poll outstanding, skipping tick");
                    } else {
                        let api = Arc::clone(&self.api);
                        let id = session_id.clone();
                        in_flight = Some(Box::pin(async move { api.status(&id).await }));
                    }
                }

                _ = countdown.wait_for_tick() => {
                    remaining = remaining.saturating_sub(1);
                    self.view.send_modify(|v| v.remaining_secs = remaining);
                    if remaining == 0 {
                        tracing::info!(%session_id, "registration countdown reached zero");
                        let last = match in_flight.take() {
                            Some(poll) => poll.await,
                            None => self.api.status(&session_id).await,
                        };
                        break self.settle_at_deadline(last);
                    }
                }
            }
        };

        poll_timer.stop();
        countdown.stop();
        drop(in_flight);

        let timeout_secs = self.timeout_secs;
        let error = result.as_ref().err().map(ToString::to_string);
        self.view.send_modify(|v| {
            v.reset_to_idle(timeout_secs);
            v.error = error;
        });

        result
    }

    /// Reconciles local state with one poll result.
    fn handle_poll(
        &self,
        result: Result<StatusResponse, ApiError>,
        failures: &mut u32,
    ) -> PollStep {
        let session_id = &self.session_id;
        let response = match result {
            Ok(response) => response,
            Err(e) if !e.is_transient() => {
                tracing::warn!(%session_id, error = %e, "coordinator no longer knows the session");
                return PollStep::Done(Err(ClientError::SessionNotFound(session_id.clone())));
            }
            Err(e) => {
                *failures += 1;
                tracing::warn!(%session_id, error = %e, failures = *failures, "status poll failed");
                let limit = self.config.max_consecutive_failures;
                if limit > 0 && *failures >= limit {
                    return PollStep::Done(Err(ClientError::Unreachable {
                        attempts: *failures,
                        last: e,
                    }));
                }
                return PollStep::Continue;
            }
        };

        *failures = 0;
        self.view.send_modify(|v| v.last_known_status = Some(response.status));

        match response.status {
            WireStatus::Pending => PollStep::Continue,
            WireStatus::Completed => {
                // A validated response always carries the tag.
                let tag = response.tag.unwrap_or_default();
                tracing::info!(%session_id, tag = %tag, "tag registered");
                self.view.send_modify(|v| v.result_tag = Some(tag.clone()));
                PollStep::Done(Ok(WaitOutcome::Completed(tag)))
            }
            WireStatus::Expired => {
                tracing::info!(%session_id, "registration session expired");
                PollStep::Done(Ok(WaitOutcome::Expired))
            }
            WireStatus::Cancelled => {
                tracing::info!(%session_id, "registration session cancelled on the coordinator");
                PollStep::Done(Ok(WaitOutcome::Cancelled))
            }
        }
    }

    /// Decides the outcome once the countdown hit zero, given the last
    /// status read. A terminal status still wins; anything else times out.
    fn settle_at_deadline(
        &self,
        last: Result<StatusResponse, ApiError>,
    ) -> Result<WaitOutcome, ClientError> {
        match last {
            Ok(response) => {
                let mut failures = 0;
                match self.handle_poll(Ok(response), &mut failures) {
                    PollStep::Done(done) => done,
                    PollStep::Continue => Ok(WaitOutcome::TimedOut),
                }
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "final status read failed");
                Ok(WaitOutcome::TimedOut)
            }
        }
    }

    /// Fire-and-forget server-side cancel, if configured.
    fn cancel_on_server(&self) {
        if !self.config.cancel_on_server {
            return;
        }
        let api = Arc::clone(&self.api);
        let session_id = self.session_id.clone();
        tokio::spawn(async move {
            if let Err(e) = api.cancel(&session_id).await {
                tracing::warn!(%session_id, error = %e, "server-side cancel failed");
            }
        });
    }
}

/// Resolves with the outstanding poll's result, or never if there is none.
async fn next_poll_result(in_flight: &mut Option<PollFuture>) -> Result<StatusResponse, ApiError> {
    match in_flight {
        Some(poll) => poll.await,
        None => std::future::pending().await,
    }
}
