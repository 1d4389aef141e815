//! A registration desk in one process: the Coordinator, a simulated badge
//! reader, and a requester waiting for the badge to be scanned.
//!
//! ```text
//! RUST_LOG=debug TAGREG_TIMEOUT_SECS=10 cargo run -p registration-desk
//! ```

use std::time::Duration;

use tagreg::prelude::*;
use tagreg_client::{ClientConfig, ClientView, HttpCoordinator, SessionClient};
use tokio::sync::{oneshot, watch};

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The badge reader fires this long after the wait starts.
const SCAN_DELAY: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

struct DeskConfig {
    bind: String,
    timeout_secs: u64,
}

impl DeskConfig {
    fn from_env() -> Result<Self, String> {
        Self::from_values(
            std::env::var("TAGREG_BIND").ok(),
            std::env::var("TAGREG_TIMEOUT_SECS").ok(),
        )
    }

    fn from_values(bind: Option<String>, timeout: Option<String>) -> Result<Self, String> {
        let timeout_secs = match timeout {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| format!("TAGREG_TIMEOUT_SECS must be a whole number, got {raw:?}"))?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            bind: bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
            timeout_secs,
        })
    }
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

/// Plays the badge reader: reports one scan after `delay`.
async fn simulate_reader<S: ScanSink>(reader: S, session_id: SessionId, delay: Duration) {
    tokio::time::sleep(delay).await;
    match reader.notify_scan(&session_id, "BADGE-0042".into()).await {
        ScanOutcome::Accepted => tracing::info!(%session_id, "reader: badge scanned"),
        ScanOutcome::Ignored(reason) => tracing::info!(%session_id, %reason, "reader: scan ignored"),
    }
}

/// Prints the countdown until the wait ends.
async fn show_countdown(mut view: watch::Receiver<ClientView>) {
    while view.changed().await.is_ok() {
        let v = view.borrow_and_update().clone();
        if !v.is_waiting {
            break;
        }
        eprintln!("  waiting for badge... {:>2}s", v.remaining_secs);
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tagreg::init_tracing();
    let config = DeskConfig::from_env()?;

    let server = RegistrationServer::builder()
        .bind(&config.bind)
        .session_config(SessionConfig {
            timeout_secs: config.timeout_secs,
            ..SessionConfig::default()
        })
        .build()
        .await?;
    let addr = server.local_addr()?;
    let coordinator = server.coordinator();

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.run_until(async move {
        let _ = stop_rx.await;
    }));

    let client = SessionClient::new(
        HttpCoordinator::new(&format!("http://{addr}"))?,
        ClientConfig::default(),
    );
    let wait = client.begin().await?;
    eprintln!("session {} started, please scan your badge", wait.session_id());

    let reader = simulate_reader(coordinator, wait.session_id().clone(), SCAN_DELAY);
    let countdown = show_countdown(wait.view());
    let (outcome, (), ()) = tokio::join!(wait.outcome(), reader, countdown);

    match outcome {
        Ok(outcome) => eprintln!("registration finished: {outcome:?}"),
        Err(e) => eprintln!("registration failed: {e}"),
    }

    let _ = stop_tx.send(());
    serving.await??;
    Ok(())
}
