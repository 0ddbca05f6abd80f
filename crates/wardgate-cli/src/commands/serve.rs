//! Server command.

use clap::Args;

use wardgate_core::config::AppConfig;
use wardgate_core::result::AppResult;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Bind address (overrides server.host)
    #[arg(long)]
    pub host: Option<String>,
    /// Bind port (overrides server.port)
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn execute(args: &ServeArgs, mut config: AppConfig) -> AppResult<()> {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    wardgate_api::run_server(config).await
}
