//! Database migration command.

use wardgate_core::config::{AppConfig, StorageBackend};
use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_database::DatabasePool;
use wardgate_database::migration::run_migrations;

use crate::output;

pub async fn execute(config: &AppConfig) -> AppResult<()> {
    if config.database.backend != StorageBackend::Postgres {
        return Err(AppError::configuration(
            "Migrations need database.backend = \"postgres\"",
        ));
    }
    let pool = DatabasePool::connect(&config.database).await?;
    run_migrations(pool.pool()).await?;
    output::print_success("Database migrations applied");
    Ok(())
}
