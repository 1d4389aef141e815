//! Integration tests for the periodic timer.
//!
//! Uses Tokio's paused clock so `sleep_until` resolves as soon as the
//! runtime has nothing else to do, without real waiting.

use std::time::Duration;

use tagreg_tick::{PeriodicTimer, TickPolicy, TimerConfig};
use tokio::time::Instant;

const SECOND: Duration = Duration::from_secs(1);

// =========================================================================
// TimerConfig
// =========================================================================

#[test]
fn test_every_uses_skip_policy() {
    let cfg = TimerConfig::every(SECOND);
    assert_eq!(cfg.period, SECOND);
    assert_eq!(cfg.policy, TickPolicy::Skip);
}

#[test]
fn test_validated_clamps_zero_period() {
    let cfg = TimerConfig::every(Duration::ZERO).validated();
    assert_eq!(cfg.period, TimerConfig::MIN_PERIOD);
}

// =========================================================================
// Tick firing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_first_tick_fires_one_period_after_creation() {
    let start = Instant::now();
    let mut timer = PeriodicTimer::every("poll", SECOND);

    let info = timer.wait_for_tick().await;

    assert_eq!(info.tick, 1);
    assert!(!info.late);
    assert_eq!(Instant::now() - start, SECOND);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_increment_monotonically() {
    let start = Instant::now();
    let mut timer = PeriodicTimer::every("poll", SECOND);

    for expected in 1..=5 {
        assert_eq!(timer.wait_for_tick().await.tick, expected);
    }
    assert_eq!(Instant::now() - start, 5 * SECOND);
}

// =========================================================================
// Stop
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stopped_timer_never_fires() {
    let mut timer = PeriodicTimer::every("countdown", SECOND);
    timer.wait_for_tick().await;

    timer.stop();

    let result = tokio::time::timeout(Duration::from_secs(60), timer.wait_for_tick()).await;
    assert!(result.is_err(), "stopped timer should pend forever");
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let mut timer = PeriodicTimer::every("poll", SECOND);
    timer.stop();
    timer.stop();

    let result = tokio::time::timeout(Duration::from_secs(5), timer.wait_for_tick()).await;
    assert!(result.is_err());
}

// =========================================================================
// Late ticks
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_skip_policy_drops_missed_ticks() {
    let start = Instant::now();
    let mut timer = PeriodicTimer::every("poll", SECOND);

    // Nobody polls the timer for 3.5 periods.
    tokio::time::advance(Duration::from_millis(3500)).await;
    let info = timer.wait_for_tick().await;
    assert!(info.late);
    assert_eq!(info.ticks_skipped, 2);

    // Next tick is one period after the late one, not a burst.
    timer.wait_for_tick().await;
    assert_eq!(Instant::now() - start, Duration::from_millis(4500));
}

#[tokio::test(start_paused = true)]
async fn test_fixed_policy_keeps_cadence() {
    let start = Instant::now();
    let mut timer =
        PeriodicTimer::new("countdown", TimerConfig::every(SECOND).with_policy(TickPolicy::Fixed));

    tokio::time::advance(Duration::from_millis(3500)).await;

    // Ticks 1..=3 were all due; they fire back to back.
    for expected in 1..=3 {
        let info = timer.wait_for_tick().await;
        assert_eq!(info.tick, expected);
        assert_eq!(info.ticks_skipped, 0);
    }
    assert_eq!(Instant::now() - start, Duration::from_millis(3500));

    // Tick 4 lands on the original 4-second mark.
    timer.wait_for_tick().await;
    assert_eq!(Instant::now() - start, 4 * SECOND);
}
