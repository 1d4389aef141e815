//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The server handlers and the HTTP client only depend on the [`Codec`]
//! trait; [`JsonCodec`] is the implementation the reference protocol uses.
//!
//! Decoding alone is not enough at a trust boundary: a message can be
//! well-formed JSON and still be nonsense (`completed` with no tag).
//! [`Codec::decode_checked`] runs the type's [`Validate`] rules right after
//! parsing so protocol drift fails fast instead of leaking into state.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Protocol-level rules a decoded message must satisfy.
///
/// Implemented by every wire type that has invariants serde can't express
/// on its own (cross-field rules, non-empty strings).
pub trait Validate {
    /// Checks the message against the protocol rules.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] describing the first
    /// violated rule.
    fn validate(&self) -> Result<(), ProtocolError>;
}

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec lives in shared server state
/// and inside the client's driver task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Decodes a value and then validates it.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` for malformed input and
    /// `ProtocolError::InvalidMessage` when validation fails.
    fn decode_checked<T: DeserializeOwned + Validate>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        let value: T = self.decode(data)?;
        value.validate()?;
        Ok(value)
    }
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// This is behind the `json` feature flag (enabled by default).
///
/// ## Example
///
/// ```rust
/// use tagreg_protocol::{Codec, JsonCodec, StatusResponse};
///
/// let codec = JsonCodec;
///
/// let bytes = codec.encode(&StatusResponse::completed("TAG123")).unwrap();
/// let decoded: StatusResponse = codec.decode_checked(&bytes).unwrap();
/// assert_eq!(decoded.tag.as_deref(), Some("TAG123"));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{ScanReport, StartResponse, StatusResponse};

    #[test]
    fn test_decode_checked_accepts_valid_status() {
        let body = br#"{"status":"pending"}"#;
        let status: StatusResponse =
            JsonCodec.decode_checked(body).expect("valid message");
        assert!(status.tag.is_none());
    }

    #[test]
    fn test_decode_checked_rejects_completed_without_tag() {
        // Parses fine, but breaks the "tag iff completed" rule.
        let body = br#"{"status":"completed"}"#;
        let result: Result<StatusResponse, _> = JsonCodec.decode_checked(body);
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_checked_rejects_empty_scan_tag() {
        let body = br#"{"tag":""}"#;
        let result: Result<ScanReport, _> = JsonCodec.decode_checked(body);
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_decode_malformed_returns_decode_error() {
        let result: Result<StartResponse, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_uses_camel_case_field_names() {
        let bytes = JsonCodec
            .encode(&StartResponse::new("abc".parse().unwrap(), 30))
            .unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"sessionId\""));
        assert!(text.contains("\"timeoutSecs\""));
    }
}
