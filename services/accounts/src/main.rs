use std::sync::Arc;

use anyhow::Result;
use common::database::{DatabaseConfig, health_check, init_pool};
use tracing::info;
use tracing_subscriber::EnvFilter;

use accounts::{
    AppState,
    config::ServerConfig,
    credentials::{CredentialConfig, CredentialManager},
    mailer::{self, MailerConfig},
    repositories::{PgAccountStore, run_migrations},
    routes,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting accounts service");

    let server_config = ServerConfig::from_env()?;
    let credentials = CredentialManager::new(CredentialConfig::from_env()?)?;
    let mailer = mailer::from_config(&MailerConfig::from_env()?);

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;
    info!("Database migrations applied");

    let store = Arc::new(PgAccountStore::new(pool));
    let port = server_config.port;
    let app_state = AppState::new(store, mailer, credentials, server_config);

    // Start the web server
    let app = routes::create_router(app_state);

    let address = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Accounts service listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Accounts service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
