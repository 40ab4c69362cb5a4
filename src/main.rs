use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, extract::FromRef};
use tokio::net::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Settings,
    prediction_api::{PredictionClient, build_http_client},
    session::SessionStore,
};

// Declare modules
mod config;
mod error;
mod form;
mod interval;
mod models;
mod orchestrator;
mod prediction_api;
mod results;
mod routes;
mod session;

// Shared application state; handlers extract the parts they need via FromRef.
#[derive(Clone, FromRef)]
struct AppState {
    settings: Arc<Settings>,
    sessions: Arc<SessionStore<PredictionClient>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file first. Ignore errors (e.g., file not found)
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vehicle_price_rust=info,tower_http=info".into()),
        )
        .with(fmt::layer())
        .init();

    tracing::info!("Initializing vehicle price prediction server...");

    let settings = match Settings::new() {
        Ok(s) => {
            tracing::info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };
    let shared_settings = Arc::new(settings);

    // One connection pool shared by every form session.
    let http_client = Arc::new(build_http_client(shared_settings.proxy_url.as_deref())?);
    let prediction_client = PredictionClient::new(
        http_client,
        shared_settings.prediction_url.clone(),
        shared_settings.request_timeout(),
    );
    tracing::info!(
        "Prediction service endpoint: {} (timeout: {:?})",
        prediction_client.endpoint(),
        shared_settings.request_timeout()
    );

    let app_state = AppState {
        settings: shared_settings.clone(),
        sessions: Arc::new(SessionStore::new(
            prediction_client,
            shared_settings.max_sessions,
            shared_settings.session_idle_secs,
        )),
    };

    let app: Router = routes::create_router(app_state);

    let addr: SocketAddr = shared_settings.server_address.parse().with_context(|| {
        format!(
            "Invalid server address format in configuration ('{}')",
            shared_settings.server_address
        )
    })?;

    let listener = match TcpListener::bind(&addr).await {
        Ok(l) => {
            tracing::info!("Server listening on {}", addr);
            l
        }
        Err(e) => {
            tracing::error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, keep serving until the process is killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
