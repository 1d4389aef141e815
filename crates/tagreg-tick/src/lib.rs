//! Stoppable fixed-period timers.
//!
//! A registration wait runs two independent 1-second timers: one that
//! polls the Coordinator and one that drives the visible countdown. Both
//! must stop deterministically the moment the wait ends. [`PeriodicTimer`]
//! is that timer: it fires on a fixed period until [`PeriodicTimer::stop`]
//! is called, after which [`PeriodicTimer::wait_for_tick`] pends forever.
//!
//! # Integration
//!
//! The timers sit inside the client driver's `tokio::select!` loop. A
//! stopped timer's branch simply never wins again:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         biased;
//!         result = &mut in_flight_poll => { /* may stop both timers */ }
//!         _ = poll_timer.wait_for_tick() => { /* start a poll */ }
//!         _ = countdown.wait_for_tick() => { /* decrement, maybe stop */ }
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Schedule the next tick one period from *now*. Missed ticks are
    /// dropped. Right for polling: a backlog of polls is pointless.
    #[default]
    Skip,
    /// Keep the original cadence: the next tick is one period after the
    /// *scheduled* time, so late ticks fire back to back until caught up.
    /// Right for a countdown, which must reach zero at the wall-clock mark.
    Fixed,
}

/// Configuration for a [`PeriodicTimer`].
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// Time between ticks. The first tick fires one period after creation.
    pub period: Duration,
    /// Late-tick handling.
    pub policy: TickPolicy,
}

impl TimerConfig {
    /// Smallest accepted period.
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);

    /// A config with the given period and the default policy.
    pub fn every(period: Duration) -> Self {
        Self {
            period,
            policy: TickPolicy::default(),
        }
    }

    /// Sets the late-tick policy.
    pub fn with_policy(mut self, policy: TickPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Clamp the period to [`Self::MIN_PERIOD`] so a zero period can't
    /// turn into a busy loop.
    pub fn validated(mut self) -> Self {
        if self.period < Self::MIN_PERIOD {
            warn!(
                period_ms = self.period.as_millis() as u64,
                min_ms = Self::MIN_PERIOD.as_millis() as u64,
                "timer period below minimum, clamping"
            );
            self.period = Self::MIN_PERIOD;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a fired tick, returned by [`PeriodicTimer::wait_for_tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickInfo {
    /// Monotonically increasing tick number (starts at 1).
    pub tick: u64,
    /// `true` if this tick fired more than 10% of a period late.
    pub late: bool,
    /// Ticks dropped because of lateness (only under [`TickPolicy::Skip`]).
    pub ticks_skipped: u64,
}

// ---------------------------------------------------------------------------
// Timer
// ---------------------------------------------------------------------------

/// A fixed-period timer that can be stopped for good.
pub struct PeriodicTimer {
    name: &'static str,
    period: Duration,
    policy: TickPolicy,
    tick_count: u64,
    /// When the next tick fires. `None` once stopped.
    next_tick: Option<Instant>,
}

impl PeriodicTimer {
    /// Creates a running timer. `name` only appears in logs.
    pub fn new(name: &'static str, config: TimerConfig) -> Self {
        let config = config.validated();
        debug!(
            timer = name,
            period_ms = config.period.as_millis() as u64,
            policy = ?config.policy,
            "timer started"
        );
        Self {
            name,
            period: config.period,
            policy: config.policy,
            tick_count: 0,
            next_tick: Some(Instant::now() + config.period),
        }
    }

    /// Creates a running timer with the given period and default policy.
    pub fn every(name: &'static str, period: Duration) -> Self {
        Self::new(name, TimerConfig::every(period))
    }

    /// Waits until the next tick is due.
    ///
    /// Once the timer is stopped this future pends forever, so a
    /// `tokio::select!` branch on it is effectively disabled.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let Some(next) = self.next_tick else {
            return std::future::pending::<TickInfo>().await;
        };

        time::sleep_until(next).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(next);
        let late = late_by > self.period / 10;
        let mut ticks_skipped = 0u64;

        self.next_tick = Some(match self.policy {
            TickPolicy::Skip => {
                if late {
                    ticks_skipped = (late_by.as_nanos() / self.period.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        debug!(
                            timer = self.name,
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            "timer fired late, skipping ahead"
                        );
                    }
                }
                now + self.period
            }
            TickPolicy::Fixed => next + self.period,
        });

        trace!(timer = self.name, tick = self.tick_count, late, "tick fired");

        TickInfo {
            tick: self.tick_count,
            late,
            ticks_skipped,
        }
    }

    /// Stops the timer. Idempotent.
    pub fn stop(&mut self) {
        if self.next_tick.take().is_some() {
            debug!(timer = self.name, ticks = self.tick_count, "timer stopped");
        }
    }
}
