//! AuthGate API Server
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use authgate_api::{
    create_router,
    state::AppState,
    store::{CredentialStore, MemoryStore, PgStore},
};
use authgate_core::{AppConfig, LoggingConfig, StoreBackend};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{},tower_http=debug", config.level).into());

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn CredentialStore>> {
    match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory credential store; all data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let store = PgStore::connect(&config.database)
                .await
                .context("failed to connect to PostgreSQL")?;
            store
                .init_schema()
                .await
                .context("failed to initialise schema")?;
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);
    config.validate().context("invalid configuration")?;

    if !config.token.secrets_are_distinct() {
        tracing::warn!(
            "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET are equal; use distinct secrets in production"
        );
    }

    let store = open_store(&config).await?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, store).context("failed to build token service")?);
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("AuthGate API starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/auth/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
