// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GymDesk API Server
//!
//! Gym and fitness-studio management backend: member accounts, local and
//! Google federated login, and role-scoped member-profile endpoints.

use gymdesk_api::{
    config::Config,
    db::FirestoreDb,
    services::{AuthService, GoogleIdTokenVerifier, TokenIssuer},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting GymDesk API");

    if config.allow_unverified_id_tokens {
        tracing::warn!(
            "ALLOW_UNVERIFIED_ID_TOKENS is enabled: federated ID tokens failing \
             strict verification will be accepted from their claims alone"
        );
    }

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    let google_verifier = Arc::new(
        GoogleIdTokenVerifier::new(&config).expect("Failed to initialize Google token verifier"),
    );

    let auth_service = AuthService::new(
        db.clone(),
        TokenIssuer::new(&config),
        google_verifier,
        config.allow_unverified_id_tokens,
    );

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        auth_service,
    });

    // Build router
    let app = gymdesk_api::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gymdesk_api=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
