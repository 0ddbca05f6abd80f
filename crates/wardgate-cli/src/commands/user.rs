//! User commands.

use std::io::BufRead;

use clap::Args;

use wardgate_core::config::AppConfig;
use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::types::UserId;
use wardgate_service::{CreateUserRequest, RequestContext};

use crate::output::{self, OutputFormat};

#[derive(Debug, Args)]
pub struct CreateSuperuserArgs {
    /// Login name for the admin console
    #[arg(short, long)]
    pub username: String,
    /// Phone number for the application login
    #[arg(short, long)]
    pub phone: String,
    /// Email address
    #[arg(short, long)]
    pub email: Option<String>,
    /// Read the password from the first line of stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Debug, Args)]
pub struct DeactivateUserArgs {
    /// User id
    #[arg(long)]
    pub id: UserId,
    /// Why the account is being deactivated
    #[arg(long)]
    pub reason: String,
}

pub async fn create_superuser(
    args: &CreateSuperuserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    let password = if args.password_stdin {
        read_password_line(std::io::stdin().lock())?
    } else {
        dialoguer::Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?
    };

    let services = super::open_services(config).await?;
    let user = services
        .identity
        .create_superuser(
            &RequestContext::system(),
            CreateUserRequest {
                username: args.username.clone(),
                phone: args.phone.clone(),
                email: args.email.clone(),
                password,
                ..CreateUserRequest::default()
            },
        )
        .await?;

    output::print_item(
        &user,
        &format!("Superuser '{}' created (id: {})", user.username, user.id),
        format,
    );
    Ok(())
}

pub async fn deactivate(
    args: &DeactivateUserArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> AppResult<()> {
    let services = super::open_services(config).await?;
    let user = services
        .identity
        .deactivate(&RequestContext::system(), args.id, Some(args.reason.as_str()))
        .await?;

    output::print_item(
        &user,
        &format!("User '{}' (id: {}) deactivated", user.username, user.id),
        format,
    );
    Ok(())
}

/// First line of `input`, without the line terminator.
fn read_password_line(mut input: impl BufRead) -> AppResult<String> {
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| AppError::internal(format!("Failed to read password: {e}")))?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AppError::validation("No password on stdin"));
    }
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_password_line() {
        let password = read_password_line("  s3cret pass \nignored\n".as_bytes()).unwrap();
        assert_eq!(password, "  s3cret pass ");

        let err = read_password_line("\n".as_bytes()).unwrap_err();
        assert_eq!(err.kind, wardgate_core::error::ErrorKind::Validation);
    }
}
