//! Client configuration.

use std::time::Duration;

/// Configuration for [`SessionClient`](crate::SessionClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Countdown start value in seconds, used when the Coordinator's start
    /// response doesn't advertise its own timeout.
    ///
    /// Default: 30.
    pub timeout_secs: u64,

    /// Time between status polls.
    ///
    /// Default: 1 second.
    pub poll_interval: Duration,

    /// Consecutive failed polls before the wait gives up with
    /// [`ClientError::Unreachable`](crate::ClientError::Unreachable).
    /// 0 disables escalation; the countdown still ends the wait.
    ///
    /// Default: 3.
    pub max_consecutive_failures: u32,

    /// Whether cancelling the wait also cancels the session on the
    /// Coordinator. Without it, a scan arriving after the user gave up
    /// still completes the session server-side, and nobody sees it.
    ///
    /// Default: `true`.
    pub cancel_on_server: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            poll_interval: Duration::from_secs(1),
            max_consecutive_failures: 3,
            cancel_on_server: true,
        }
    }
}
