//! ngsid - NGSI-LD to NGSI-v2 adapter daemon
//!
//! Sits between NGSI-LD clients and an NGSI-v2 context broker and
//! translates between the two dialects in both directions.
//!
//! Usage:
//!   ngsid [config.toml]
//!
//! Configuration comes from the optional TOML file with environment
//! variables taking precedence (NGSID_PORT, NGSID_URL,
//! NGSI_V2_CONTEXT_BROKER, NGSI_V2_TIMEOUT, NGSID_RELAY_TIMEOUT,
//! USER_CONTEXT_URL, CORE_CONTEXT_URL, NGSID_PAGE_LIMIT).

use std::net::SocketAddr;
use std::sync::Arc;

use ngsi_api::{create_router, AppState};
use ngsi_client::{HttpRelay, V2Client};
use ngsi_core::GatewayConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn load_config() -> anyhow::Result<GatewayConfig> {
    let mut config = match std::env::args().nth(1) {
        Some(path) => {
            tracing::info!(%path, "Loading config file");
            let raw = std::fs::read_to_string(&path)?;
            toml::from_str(&raw)?
        }
        None => GatewayConfig::default(),
    };
    config.apply_env();
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ngsid=info,ngsi_api=info,ngsi_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    tracing::info!(
        broker = %config.v2_broker,
        version = %config.spec_version(),
        "Starting ngsid"
    );

    let broker = Arc::new(V2Client::new(&config)?);
    let relay = Arc::new(HttpRelay::new(&config)?);
    let port = config.port;
    let state = AppState::new(config, broker, relay);

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves when the process is asked to stop.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(%err, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("Shutdown signal received, stopping");
}
