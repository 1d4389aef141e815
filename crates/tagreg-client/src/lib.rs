//! Requester-side client for tag registration sessions.
//!
//! The client starts a session on the Coordinator and then waits for the
//! physical scan to land, showing a countdown meanwhile:
//!
//! 1. [`SessionClient::begin`] calls `start` and spawns a driver task.
//! 2. The driver polls status every second and counts down every second,
//!    publishing a [`ClientView`] for the presentation layer.
//! 3. The wait ends on completion, expiry, countdown zero, cancellation
//!    ([`WaitHandle::cancel`]) or an escalated error; both timers stop and
//!    the view resets to idle.
//!
//! # How it fits in the stack
//!
//! ```text
//! Presentation (above)  ← renders ClientView, calls cancel
//!     ↕
//! Client (this crate)   ← timers, polling, reconciliation
//!     ↕
//! CoordinatorApi        ← HttpCoordinator over reqwest, or any other impl
//! ```

mod api;
mod client;
mod config;
mod error;
mod view;

pub use api::{CoordinatorApi, HttpCoordinator};
pub use client::{Canceller, SessionClient, WaitHandle, WaitOutcome};
pub use config::ClientConfig;
pub use error::{ApiError, ClientError};
pub use view::ClientView;
