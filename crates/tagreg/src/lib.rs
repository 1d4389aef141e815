//! # Tagreg
//!
//! HTTP Coordinator for tag registration sessions.
//!
//! A requester starts a session, a scanning terminal later reports the tag
//! it read, and the requester polls until the session completes, expires or
//! is cancelled. This crate serves the Coordinator side of that exchange
//! over JSON/HTTP and runs the background retention sweep.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tagreg::prelude::*;
//!
//! # async fn demo() -> Result<(), TagregError> {
//! tagreg::init_tracing();
//!
//! let server = RegistrationServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .session_config(SessionConfig {
//!         timeout_secs: 30,
//!         ..SessionConfig::default()
//!     })
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod error;
mod handler;
mod server;

pub use error::TagregError;
pub use server::{RegistrationServer, RegistrationServerBuilder};

use tracing_subscriber::EnvFilter;

/// Installs a `tracing` subscriber that logs to stderr.
///
/// The filter comes from `RUST_LOG`, defaulting to `info`. Calling this
/// more than once is harmless; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Everything needed to run a Coordinator or talk to one in-process.
pub mod prelude {
    pub use crate::{RegistrationServer, RegistrationServerBuilder, TagregError};
    pub use tagreg_protocol::{
        ErrorBody, HealthResponse, ScanAck, ScanReport, SessionId, StartResponse, StatusResponse,
        WireStatus,
    };
    pub use tagreg_session::{
        Coordinator, IgnoreReason, ScanOutcome, ScanSink, SessionConfig, SessionError,
        SessionStatus,
    };
}
