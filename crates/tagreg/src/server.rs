//! `RegistrationServer` builder and server loop.
//!
//! This is the entry point for running a Coordinator. It ties together the
//! layers: HTTP routes → session Coordinator → protocol types, plus the
//! background retention sweep.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tagreg_protocol::JsonCodec;
use tagreg_session::{Coordinator, SessionConfig};
use tagreg_tick::PeriodicTimer;
use tokio::net::TcpListener;

use crate::TagregError;
use crate::handler::{ServerState, router};

/// Builder for configuring and starting a Coordinator server.
///
/// # Example
///
/// ```rust,no_run
/// use tagreg::prelude::*;
///
/// # async fn demo() -> Result<(), TagregError> {
/// let server = RegistrationServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RegistrationServerBuilder {
    bind_addr: String,
    session_config: SessionConfig,
}

impl RegistrationServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Binds the listener and creates the Coordinator.
    ///
    /// Nothing is served until [`RegistrationServer::run`].
    ///
    /// # Errors
    /// Returns [`TagregError::Io`] if the address can't be bound.
    pub async fn build(self) -> Result<RegistrationServer, TagregError> {
        let listener = TcpListener::bind(&self.bind_addr).await.map_err(|e| {
            tracing::error!(addr = %self.bind_addr, error = %e, "bind failed");
            e
        })?;
        let coordinator = Arc::new(Coordinator::new(self.session_config));

        Ok(RegistrationServer {
            listener,
            coordinator,
        })
    }
}

impl Default for RegistrationServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Coordinator server.
///
/// Call [`run()`](Self::run) to start serving requests.
pub struct RegistrationServer {
    listener: TcpListener,
    coordinator: Arc<Coordinator>,
}

impl RegistrationServer {
    /// Creates a new builder.
    pub fn builder() -> RegistrationServerBuilder {
        RegistrationServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The Coordinator behind the routes.
    ///
    /// In-process device integrations can report scans through this (it
    /// implements [`ScanSink`](tagreg_session::ScanSink)) instead of going
    /// over HTTP.
    pub fn coordinator(&self) -> Arc<Coordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Serves requests until the process is terminated.
    ///
    /// # Errors
    /// Returns [`TagregError::Io`] if serving fails.
    pub async fn run(self) -> Result<(), TagregError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves requests until `shutdown` resolves, then finishes in-flight
    /// requests and stops the retention sweep.
    ///
    /// # Errors
    /// Returns [`TagregError::Io`] if serving fails.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), TagregError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.listener.local_addr()?;
        tracing::info!(%addr, "registration coordinator running");

        let sweeper = tokio::spawn(sweep_loop(Arc::clone(&self.coordinator)));
        let state = Arc::new(ServerState {
            coordinator: self.coordinator,
            codec: JsonCodec,
        });

        let result = axum::serve(self.listener, router(state))
            .with_graceful_shutdown(shutdown)
            .await;
        sweeper.abort();

        result.map_err(|e| {
            tracing::error!(error = %e, "server stopped with error");
            TagregError::Io(e)
        })?;
        tracing::info!("registration coordinator stopped");
        Ok(())
    }
}

/// Periodically commits overdue expiries and purges old terminal sessions.
async fn sweep_loop(coordinator: Arc<Coordinator>) {
    let mut timer = PeriodicTimer::every("sweep", coordinator.config().sweep_interval());
    loop {
        timer.wait_for_tick().await;
        let report = coordinator.sweep().await;
        if !report.expired.is_empty() || report.purged > 0 {
            tracing::debug!(
                expired = report.expired.len(),
                purged = report.purged,
                "retention sweep"
            );
        }
    }
}
