//! Core protocol types for the registration wire format.
//!
//! Every type here travels over HTTP as JSON. Field names are camelCase on
//! the wire (`sessionId`, `timeoutSecs`) and statuses are lowercase strings.
//!
//! All message structs carry `#[serde(deny_unknown_fields)]`: an extra
//! field means the two ends disagree about the protocol, and we'd rather
//! find out at the boundary than silently drop data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, Validate};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Longest session id accepted from the wire.
const MAX_SESSION_ID_LEN: usize = 128;

/// Opaque identifier of a registration session.
///
/// The Coordinator generates ids (32 lowercase hex chars today), but the
/// client must treat them as opaque strings. Parsing only enforces what
/// is needed to embed the id safely in a URL path: non-empty, bounded
/// length, and `[A-Za-z0-9_-]` characters.
///
/// `#[serde(try_from = "String")]` routes deserialization through
/// [`TryFrom<String>`], so an invalid id can never be constructed from
/// JSON either.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Builds an id from raw bytes, hex encoded (two lowercase hex chars
    /// per byte). Infallible: hex digits always pass validation.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SessionId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "session id must not be empty".into(),
            ));
        }
        if value.len() > MAX_SESSION_ID_LEN {
            return Err(ProtocolError::InvalidMessage(format!(
                "session id longer than {MAX_SESSION_ID_LEN} characters"
            )));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ProtocolError::InvalidMessage(format!(
                "session id contains invalid characters: {value:?}"
            )));
        }
        Ok(Self(value))
    }
}

impl FromStr for SessionId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Session status as reported on the wire.
///
/// A closed enum: an unknown string such as `"paused"` fails to decode
/// instead of being carried around as an arbitrary value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireStatus {
    /// Waiting for a device scan.
    Pending,
    /// A tag was scanned; the response carries it.
    Completed,
    /// The deadline passed without a scan.
    Expired,
    /// Someone cancelled the session server-side.
    Cancelled,
}

impl WireStatus {
    /// Whether this status ends the session.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for WireStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Response to `POST /api/registration/sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartResponse {
    /// The id to poll with.
    pub session_id: SessionId,

    /// Seconds until the Coordinator expires the session.
    ///
    /// Optional so that a bare `{ "sessionId": ... }` from an older
    /// Coordinator still decodes; the client then falls back to its own
    /// configured timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl StartResponse {
    /// Builds a start response advertising the session timeout.
    pub fn new(session_id: SessionId, timeout_secs: u64) -> Self {
        Self {
            session_id,
            timeout_secs: Some(timeout_secs),
        }
    }
}

impl Validate for StartResponse {
    fn validate(&self) -> Result<(), ProtocolError> {
        if self.timeout_secs == Some(0) {
            return Err(ProtocolError::InvalidMessage(
                "timeoutSecs must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Response to a status poll (and to a cancel request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatusResponse {
    /// Current authoritative status.
    pub status: WireStatus,

    /// The scanned tag. Present if and only if `status` is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl StatusResponse {
    /// A `pending` response.
    pub fn pending() -> Self {
        Self {
            status: WireStatus::Pending,
            tag: None,
        }
    }

    /// A `completed` response carrying the scanned tag.
    pub fn completed(tag: impl Into<String>) -> Self {
        Self {
            status: WireStatus::Completed,
            tag: Some(tag.into()),
        }
    }

    /// An `expired` response.
    pub fn expired() -> Self {
        Self {
            status: WireStatus::Expired,
            tag: None,
        }
    }

    /// A `cancelled` response.
    pub fn cancelled() -> Self {
        Self {
            status: WireStatus::Cancelled,
            tag: None,
        }
    }
}

impl Validate for StatusResponse {
    fn validate(&self) -> Result<(), ProtocolError> {
        match (self.status, self.tag.as_deref()) {
            (WireStatus::Completed, Some(tag)) if !tag.is_empty() => Ok(()),
            (WireStatus::Completed, _) => Err(ProtocolError::InvalidMessage(
                "completed status requires a non-empty tag".into(),
            )),
            (status, Some(_)) => Err(ProtocolError::InvalidMessage(format!(
                "{status} status must not carry a tag"
            ))),
            (_, None) => Ok(()),
        }
    }
}

/// Body of the device's `POST .../scan` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScanReport {
    /// The identifier read from the physical tag.
    pub tag: String,
}

impl Validate for ScanReport {
    fn validate(&self) -> Result<(), ProtocolError> {
        if self.tag.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "scanned tag must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Reply to a scan notification.
///
/// `accepted: false` is not an error. The scan simply arrived for a
/// session that was no longer pending (or never existed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScanAck {
    /// Whether this scan completed the session.
    pub accepted: bool,
}

/// Error body returned with non-2xx responses.
///
/// `code` mirrors the HTTP status (404 = unknown session, 400 = bad
/// request) so clients that only see the body still know what happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

/// Response to `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HealthResponse {
    pub status: String,
    /// Sessions currently held by the Coordinator (any state).
    pub sessions: usize,
}

// =========================================================================
// Tests
// =========================================================================
