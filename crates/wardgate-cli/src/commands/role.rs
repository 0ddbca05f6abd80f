//! Role assignment commands.

use clap::Args;

use wardgate_core::config::AppConfig;
use wardgate_core::result::AppResult;
use wardgate_core::types::UserId;
use wardgate_service::RequestContext;

use crate::output;

#[derive(Debug, Args)]
pub struct RoleArgs {
    /// User id
    #[arg(long)]
    pub user: UserId,
    /// Role name (case-insensitive)
    #[arg(long)]
    pub role: String,
}

pub async fn grant(args: &RoleArgs, config: &AppConfig) -> AppResult<()> {
    let services = super::open_services(config).await?;
    let added = services
        .roles
        .grant_role(&RequestContext::system(), args.user, &args.role)
        .await?;
    if added {
        output::print_success(&format!("Granted '{}' to user {}", args.role, args.user));
    } else {
        output::print_warning(&format!("User {} already holds '{}'", args.user, args.role));
    }
    Ok(())
}

pub async fn revoke(args: &RoleArgs, config: &AppConfig) -> AppResult<()> {
    let services = super::open_services(config).await?;
    let removed = services
        .roles
        .revoke_role(&RequestContext::system(), args.user, &args.role)
        .await?;
    if removed {
        output::print_success(&format!("Revoked '{}' from user {}", args.role, args.user));
    } else {
        output::print_warning(&format!("User {} did not hold '{}'", args.user, args.role));
    }
    Ok(())
}
