use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod dashboard;
mod players;
mod predictor;

use api::ApiState;
use config::Config;
use dashboard::{AppState, PredictorClient};
use players::Roster;
use predictor::Predictor;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;
    info!("Starting atp-oracle in {:?} mode", config.mode);

    let api_server = if config.runs_api() {
        // Loaded once; a failed load leaves the API up but unable to predict.
        let predictor = Predictor::load(&config.model_path);
        if !predictor.is_ready() {
            warn!("Prediction API running without a model: every /predict call will fail");
        }
        let app = api::router(ApiState { predictor });
        let addr: SocketAddr = config.api_addr.parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Prediction API listening on http://{}", addr);
        Some(tokio::spawn(async move { axum::serve(listener, app).await }))
    } else {
        None
    };

    let dashboard_server = if config.runs_dashboard() {
        let roster = Roster::load(&config.players_csv);
        info!(
            "Dashboard roster: {} players{}",
            roster.players.len(),
            if roster.fallback { " (demo fallback)" } else { "" }
        );

        let client = PredictorClient::new(&config.predictor_api_url, config.request_timeout())?;
        let checker = client.clone();
        tokio::spawn(async move {
            match checker.health().await {
                Ok(message) => info!("Prediction API reachable: {}", message),
                Err(e) => warn!("Prediction API not reachable yet: {}", e),
            }
        });

        let app = dashboard::router(AppState {
            roster: Arc::new(roster),
            backend: Arc::new(client),
        });
        let addr: SocketAddr = config.dashboard_addr.parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Dashboard listening on http://{}", addr);
        Some(tokio::spawn(async move { axum::serve(listener, app).await }))
    } else {
        None
    };

    // Serve until a server exits
    for server in [api_server, dashboard_server].into_iter().flatten() {
        server.await??;
    }

    Ok(())
}
