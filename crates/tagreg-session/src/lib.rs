//! Registration session management: the authoritative Coordinator.
//!
//! This crate owns the lifecycle of tag registration sessions:
//!
//! 1. **Creation**: a requester starts a session ([`Coordinator::start`])
//! 2. **Completion**: a device reports a scanned tag ([`ScanSink`])
//! 3. **Expiry**: a pending session past its deadline reads as expired,
//!    lazily, at every query ([`Coordinator::get_status`])
//! 4. **Cancellation**: a pending session can be cancelled
//! 5. **Retention**: terminal sessions are purged after a retention window
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP layer (tagreg)      ← routes requests and device scans here
//!     ↕
//! Session layer (this crate) ← authoritative state, serialized transitions
//!     ↕
//! Protocol layer (below)   ← provides SessionId, WireStatus, StatusResponse
//! ```

#![allow(async_fn_in_trait)]

mod coordinator;
mod error;
mod registry;
mod scan;
mod session;

pub use coordinator::{Coordinator, SweepReport};
pub use error::SessionError;
pub use registry::SessionRegistry;
pub use scan::{IgnoreReason, ScanOutcome, ScanSink};
pub use session::{RegistrationSession, SessionConfig, SessionStatus};
