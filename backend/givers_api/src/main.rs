//! GIVErS REST API — entry point.
//!
//! Serves the funding-target, recurring-donation, migration, and
//! disclosure operations over SQLite. Payment capture stays with the
//! external checkout provider; settled payments arrive through
//! `POST /payments/completed`.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod payments;

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::Router;
use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use api::ApiState;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    // Load config from environment.
    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Set up the SQLite connection pool and run migrations.
    let pool = db::init_pool(&config.database_url).await?;

    // HTTP client for outbound checkout-provider calls.
    let client = Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let api_port = config.api_port;
    let state = Arc::new(ApiState {
        pool,
        config,
        client,
    });

    let app = Router::new()
        .route("/health", get(api::health))
        .route("/platform/health", get(api::platform_health))
        .route("/projects", get(api::list_projects).post(api::create_project))
        .route(
            "/projects/:id",
            get(api::get_project).patch(api::update_project),
        )
        .route("/projects/:id/checkout", post(api::create_checkout))
        .route("/payments/completed", post(api::payment_completed))
        .route("/me/donations", get(api::my_donations))
        .route("/me/recurring", get(api::my_recurring))
        .route("/me/migrate", post(api::migrate))
        .route(
            "/recurring/:id",
            patch(api::update_recurring).delete(api::delete_recurring),
        )
        .route("/recurring/:id/pause", post(api::pause_recurring))
        .route("/recurring/:id/resume", post(api::resume_recurring))
        .route("/recurring/:id/cancel", post(api::cancel_recurring))
        .route("/admin/disclosure/:subject/:id", get(api::disclosure_export))
        .route("/internal/users", put(api::upsert_user))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{api_port}");
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
