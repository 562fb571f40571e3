//! Creditship API Server
//!
//! Main entry point for the Creditship backend service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use creditship_api::{AppState, create_router};
use creditship_carrier::HttpCarrierGateway;
use creditship_db::{PgStore, connect};
use creditship_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "creditship=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Connect to database
    let db = connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );
    let store = Arc::new(PgStore::new(db));

    // Carrier gateway
    let carrier = HttpCarrierGateway::new(&config.carrier)
        .context("failed to build carrier gateway")?;
    info!(
        base_url = %config.carrier.base_url,
        timeout_secs = config.carrier.timeout_secs,
        "Carrier gateway configured"
    );

    // Create JWT service
    let jwt_service = JwtService::new(JwtConfig {
        secret: config.jwt.secret.clone(),
        access_token_expires_minutes: i64::try_from(config.jwt.access_token_expiry_secs / 60)
            .context("jwt.access_token_expiry_secs is out of range")?,
    });

    // Create application state; this starts the batch workers
    let state = AppState::new(store, Arc::new(carrier), jwt_service, &config.batch);
    info!(
        workers = config.batch.workers,
        queue_capacity = config.batch.queue_capacity,
        "Batch workers started"
    );

    match (
        config.bootstrap.super_admin_email.as_deref(),
        config.bootstrap.super_admin_password.as_deref(),
    ) {
        (Some(email), Some(password)) => {
            if state
                .accounts
                .bootstrap_super_admin(email, password)
                .await?
                .is_none()
            {
                info!(email, "Super-admin already present");
            }
        }
        (None, None) => {}
        _ => warn!("Bootstrap needs both super_admin_email and super_admin_password; skipped"),
    }

    let resumed = state.batches.resume_unfinished().await?;
    if resumed > 0 {
        info!(resumed, "Unfinished batch jobs re-queued");
    }

    // Create router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
