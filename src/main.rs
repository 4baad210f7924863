// SPDX-License-Identifier: MIT

//! Sonara API Server
//!
//! Serves account, mode and session endpoints for the voice-capture web
//! client and the external recorder.

use sonara::{
    config::Config,
    db::Db,
    models::mode::default_modes,
    services::{AuthService, TranscriberClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Sonara API");

    let db = Db::new();
    db.seed_modes(default_modes());
    tracing::info!(count = db.list_modes().len(), "Capture modes seeded");

    let auth = AuthService::new(db.clone(), &config);
    let transcriber = TranscriberClient::new(&config.ai_server_url);

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        auth,
        transcriber,
    });

    let app = sonara::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sonara=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
