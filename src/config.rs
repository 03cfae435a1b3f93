use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;

use crate::auth::AuthConfig;
use crate::schemas::AppState;

/// Initialize application configuration and state
pub async fn initialize_app_state() -> Result<AppState> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://marketrust.db?mode=rwc".to_string());
    initialize_app_state_with_url(&database_url).await
}

/// Initialize application state against a specific database URL
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    tracing::info!("Running pending migrations");
    Migrator::up(&db, None).await?;

    Ok(AppState {
        db,
        auth: AuthConfig::from_env(),
    })
}

/// Get bind address from environment or use default
pub fn get_bind_address() -> String {
    std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}
