//! teleop-responder entry point.
//!
//! Starts the Axum server that plays the robot: it accepts controller
//! WebSocket connections on `/ws` and answers their commands.

use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use teleop_channel::api;
use teleop_channel::app_state::AppState;
use teleop_channel::config::ResponderConfig;
use teleop_channel::domain::EventBus;
use teleop_channel::service::RobotService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = ResponderConfig::from_env()?;
    tracing::info!(
        addr = %config.listen_addr,
        identity = %config.identity,
        token_required = config.token.is_some(),
        "starting teleop-responder"
    );

    // Build service layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let robot = Arc::new(RobotService::new(config.identity.clone(), event_bus));

    // Build application state
    let app_state = AppState {
        robot,
        token: config.token.as_deref().map(Arc::from),
    };

    // Build router
    let app = api::build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    Ok(())
}
