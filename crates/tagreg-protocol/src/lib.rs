//! Wire protocol for tag registration sessions.
//!
//! This crate defines the messages the Coordinator and the Session Client
//! exchange over HTTP:
//!
//! - **Types** ([`SessionId`], [`WireStatus`], [`StartResponse`],
//!   [`StatusResponse`], [`ScanReport`], etc.): the JSON shapes on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes, with boundary validation via [`Validate`].
//! - **Errors** ([`ProtocolError`]): what can go wrong while encoding,
//!   decoding, or validating.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about timers or locks. Both sides of
//! the wire depend on it so a field rename breaks the build on both ends.
//!
//! ```text
//! Session Client (tagreg-client) ──HTTP──▶ Coordinator (tagreg)
//!                 ╲                         ╱
//!                  └── tagreg-protocol ────┘
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, Validate};
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ErrorBody, HealthResponse, ScanAck, ScanReport, SessionId, StartResponse,
    StatusResponse, WireStatus,
};
