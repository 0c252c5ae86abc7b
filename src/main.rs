// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod errors;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing_subscriber::EnvFilter;

use crate::application::analytics_service::AnalyticsService;
use crate::application::bridge_registry::BridgeRegistry;
use crate::application::flow_service::FlowService;
use crate::infrastructure::analytics_http::HttpAnalyticsRepository;
use crate::infrastructure::config::{load_bridge_config, load_flows_config};
use crate::infrastructure::fixture_repository::FixtureAnalyticsRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::router::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_bridge_config()?;
    let flows_config = load_flows_config()?;
    tracing::info!("Loaded {} flows", flows_config.flows.len());

    // Create repositories (infrastructure layer)
    let live_analytics = Arc::new(HttpAnalyticsRepository::new(
        config.analytics.base_url.clone(),
        config.analytics.api_token.clone(),
        Duration::from_secs(config.analytics.timeout_secs),
    )?);
    let fixture_analytics = Arc::new(FixtureAnalyticsRepository::new(
        config.analytics.fixture_path.clone(),
    ));

    // Create services (application layer)
    let registry = Arc::new(BridgeRegistry::new(config.channel.bridge_settings()));
    let flow_service = FlowService::new(flows_config.flows);
    let analytics_service = AnalyticsService::new(live_analytics, fixture_analytics)
        .with_word_limit(config.analytics.word_limit);

    // Create application state
    let state = Arc::new(AppState {
        registry: registry.clone(),
        flow_service,
        analytics_service,
        outbound_buffer: config.channel.outbound_buffer,
    });

    // Build router (presentation layer)
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server.bind_address.parse()?;
    tracing::info!("Starting teleop-bridge on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await?;

    registry.shutdown().await;

    Ok(())
}
