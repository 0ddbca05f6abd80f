//! CLI command definitions and dispatch.

pub mod alert;
pub mod audit;
pub mod migrate;
pub mod role;
pub mod serve;
pub mod user;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use wardgate_core::config::AppConfig;
use wardgate_core::result::AppResult;
use wardgate_core::traits::SystemClock;
use wardgate_database::Stores;
use wardgate_service::Services;

use crate::output::OutputFormat;

/// Wardgate: authentication, roles, and activity monitoring
#[derive(Debug, Parser)]
#[command(name = "wardgate", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create an active staff superuser
    CreateSuperuser(user::CreateSuperuserArgs),
    /// Deactivate a user and end their sessions
    DeactivateUser(user::DeactivateUserArgs),
    /// Give a user a role
    GrantRole(role::RoleArgs),
    /// Take a role away from a user
    RevokeRole(role::RoleArgs),
    /// List activity alerts
    ListAlerts(alert::ListAlertsArgs),
    /// Resolve an activity alert
    ResolveAlert(alert::ResolveAlertArgs),
    /// List audit log entries
    ListAudit(audit::ListAuditArgs),
    /// Apply database migrations
    Migrate,
    /// Start the HTTP server
    Serve(serve::ServeArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> AppResult<()> {
        let config = load_config(&self.config)?;
        match &self.command {
            Commands::CreateSuperuser(args) => user::create_superuser(args, &config, self.format).await,
            Commands::DeactivateUser(args) => user::deactivate(args, &config, self.format).await,
            Commands::GrantRole(args) => role::grant(args, &config).await,
            Commands::RevokeRole(args) => role::revoke(args, &config).await,
            Commands::ListAlerts(args) => alert::list(args, &config, self.format).await,
            Commands::ResolveAlert(args) => alert::resolve(args, &config, self.format).await,
            Commands::ListAudit(args) => audit::list(args, &config, self.format).await,
            Commands::Migrate => migrate::execute(&config).await,
            Commands::Serve(args) => serve::execute(args, config).await,
        }
    }
}

/// Load configuration from `path` plus the `WARDGATE_ENV` overlay.
pub fn load_config(path: &str) -> AppResult<AppConfig> {
    let env = std::env::var("WARDGATE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(path, &env)
}

/// Wire the service graph over the configured stores.
pub async fn open_services(config: &AppConfig) -> AppResult<Services> {
    let stores = Stores::open(&config.database).await?;
    Ok(Services::build(stores, config, Arc::new(SystemClock)))
}
