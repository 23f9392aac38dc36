// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::application::browse_service::BrowseCoordinator;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::export::Exporter;
use crate::infrastructure::gios_client::GiosClient;
use crate::infrastructure::station_cache::StationCache;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    analyze_parameter, chart, export, fetch_stations, health_check, list_parameters,
    list_stations, load_stations, refresh, select_station, station_details,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing, RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Create infrastructure
    let api = Arc::new(GiosClient::new(config.api.base_url.clone()));
    let cache = StationCache::new(&config.storage.data_dir);
    let exporter = Exporter::new(&config.storage.export_dir);

    // Start the coordinator (application layer)
    let (coordinator, browse) =
        BrowseCoordinator::new(api, cache, exporter, config.api.request_timeout());
    tokio::spawn(coordinator.run());

    let state = Arc::new(AppState { browse });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/stations", get(list_stations))
        .route("/stations/fetch", post(fetch_stations))
        .route("/stations/load", post(load_stations))
        .route("/stations/:id", get(station_details))
        .route("/stations/:id/select", post(select_station))
        .route("/refresh", post(refresh))
        .route("/parameters", get(list_parameters))
        .route("/parameters/:code/analysis", get(analyze_parameter))
        .route("/chart", get(chart))
        .route("/export", post(export))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting air-quality-monitor on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
