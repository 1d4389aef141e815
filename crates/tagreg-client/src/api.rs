//! The client's view of the Coordinator.
//!
//! [`CoordinatorApi`] is the seam between the waiting logic and the
//! network. The driver only ever talks to this trait, so tests can plug in
//! an in-process Coordinator (or a transport that always fails) and run
//! the whole wait on a paused clock.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tagreg_protocol::{
    Codec, ErrorBody, JsonCodec, SessionId, StartResponse, StatusResponse, Validate,
};

use crate::ApiError;

/// Operations the client needs from the Coordinator.
///
/// The returned futures must be `Send` because the wait runs in a spawned
/// Tokio task. Implementations can still be written with `async fn`.
pub trait CoordinatorApi: Send + Sync + 'static {
    /// Starts a new session.
    fn start(&self) -> impl Future<Output = Result<StartResponse, ApiError>> + Send;

    /// Reads the authoritative status of a session.
    fn status(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<StatusResponse, ApiError>> + Send;

    /// Cancels a session. Idempotent on the Coordinator side.
    fn cancel(
        &self,
        session_id: &SessionId,
    ) -> impl Future<Output = Result<StatusResponse, ApiError>> + Send;
}

// ---------------------------------------------------------------------------
// HttpCoordinator
// ---------------------------------------------------------------------------

/// Per-request timeout used by [`HttpCoordinator::new`].
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// [`CoordinatorApi`] over JSON/HTTP.
///
/// ```rust,no_run
/// use tagreg_client::{ClientConfig, HttpCoordinator, SessionClient};
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let api = HttpCoordinator::new("http://127.0.0.1:8080")?;
/// let client = SessionClient::new(api, ClientConfig::default());
/// let wait = client.begin().await?;
/// println!("outcome: {:?}", wait.outcome().await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpCoordinator {
    http: reqwest::Client,
    base_url: String,
    codec: JsonCodec,
}

impl HttpCoordinator {
    /// Creates a client for the Coordinator at `base_url`
    /// (e.g. `http://127.0.0.1:8080`), with a 5-second request timeout.
    ///
    /// # Errors
    /// Returns [`ApiError::Transport`] if the HTTP client can't be built.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Like [`new`](Self::new) with a custom per-request timeout.
    ///
    /// # Errors
    /// Returns [`ApiError::Transport`] if the HTTP client can't be built.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            codec: JsonCodec,
        })
    }

    fn sessions_url(&self) -> String {
        format!("{}/api/registration/sessions", self.base_url)
    }

    fn session_url(&self, session_id: &SessionId) -> String {
        format!("{}/{session_id}", self.sessions_url())
    }

    /// Maps a response to the expected body, or to the right error.
    async fn read<T: DeserializeOwned + Validate>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(self.codec.decode_checked(&body)?);
        }

        // Error bodies are best effort: a proxy in front of the
        // Coordinator may answer with HTML.
        let message = self
            .codec
            .decode::<ErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());

        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NotFound(message))
        } else {
            Err(ApiError::Status {
                code: status.as_u16(),
                message,
            })
        }
    }
}

impl CoordinatorApi for HttpCoordinator {
    async fn start(&self) -> Result<StartResponse, ApiError> {
        let response = self.http.post(self.sessions_url()).send().await?;
        self.read(response).await
    }

    async fn status(&self, session_id: &SessionId) -> Result<StatusResponse, ApiError> {
        let response = self.http.get(self.session_url(session_id)).send().await?;
        self.read(response).await
    }

    async fn cancel(&self, session_id: &SessionId) -> Result<StatusResponse, ApiError> {
        let url = format!("{}/cancel", self.session_url(session_id));
        let response = self.http.post(url).send().await?;
        self.read(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_strip_trailing_slash() {
        let api = HttpCoordinator::new("http://localhost:8080/").unwrap();
        let id: SessionId = "abc".parse().unwrap();
        assert_eq!(
            api.sessions_url(),
            "http://localhost:8080/api/registration/sessions"
        );
        assert_eq!(
            api.session_url(&id),
            "http://localhost:8080/api/registration/sessions/abc"
        );
    }

    #[test]
    fn test_not_found_is_not_transient() {
        assert!(!ApiError::NotFound("gone".into()).is_transient());
        assert!(
            ApiError::Status {
                code: 503,
                message: "busy".into()
            }
            .is_transient()
        );
    }
}
