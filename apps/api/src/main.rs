//! Crewdesk API composition root.

#![forbid(unsafe_code)]

mod api_config;
mod api_router;
mod api_services;
mod dev_seed;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use crewdesk_core::AppError;
use tracing::info;

use crate::api_config::{ApiConfig, DirectoryBackend};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    api_config::init_tracing();

    let config = ApiConfig::load()?;

    if config.migrate_only {
        if let DirectoryBackend::Postgres { database_url } = &config.backend {
            api_services::connect_and_migrate(database_url).await?;
        }
        info!("database migrations applied successfully");
        return Ok(());
    }

    let address = config.socket_address()?;
    let app_state = api_services::build_app_state(&config).await?;
    let app = api_router::build_router(app_state, config.frontend_url.as_str())?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "crewdesk-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
