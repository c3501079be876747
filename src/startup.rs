//! Application startup and server initialization.
//!
//! Loads the signing keys, builds the shared state, starts the background
//! sweeper and serves the dispatcher until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ConfigV1;
use crate::routes;
use crate::state::AppState;
use crate::tokens::{KeyError, KeyPair};
use crate::utils::SystemClock;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Keys(#[from] KeyError),
    #[error("could not bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Periodically drops expired sessions, spent refresh tokens and stale
/// revocations.
pub fn spawn_sweeper(state: AppState) -> JoinHandle<()> {
    let every = Duration::from_secs(state.config.sessions.sweep_interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let sessions = state.sessions.purge_expired();
            let (refresh, revoked) = state.issuer.purge_expired();
            if sessions + refresh + revoked > 0 {
                debug!(
                    event_name = "startup.sweeper.purged",
                    event_domain = "startup",
                    sessions,
                    refresh,
                    revoked,
                    "purged expired state"
                );
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C; serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Initializes and runs the application server.
///
/// # Errors
///
/// Fails if the key pair cannot be loaded, the listener cannot bind, or the
/// server stops with an I/O error.
pub async fn run(config: Arc<ConfigV1>) -> Result<(), StartupError> {
    let keys = KeyPair::load(&config.keys)?;
    let state = AppState::new(config.clone(), keys, Arc::new(SystemClock));

    let sweeper = spawn_sweeper(state.clone());
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.bind_address.clone(),
            source,
        })?;
    info!("Starting server on {}", config.bind_address);

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    sweeper.abort();
    served.map_err(StartupError::Serve)
}
