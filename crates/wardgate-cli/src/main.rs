//! Wardgate CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::Cli;
use wardgate_core::error::{AppError, ErrorKind};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli.execute().await {
        output::print_error(&e.to_string());
        std::process::exit(exit_code(&e));
    }
}

/// Process exit status for a failed command.
fn exit_code(error: &AppError) -> i32 {
    match error.kind {
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Conflict => 4,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code(&AppError::validation("bad")), 2);
        assert_eq!(exit_code(&AppError::not_found("gone")), 3);
        assert_eq!(exit_code(&AppError::conflict("taken")), 4);
        assert_eq!(exit_code(&AppError::internal("boom")), 1);
        assert_eq!(exit_code(&AppError::timeout("slow")), 1);
    }
}
