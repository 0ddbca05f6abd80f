//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use wardgate_core::config::AppConfig;
use wardgate_service::Services;

use crate::extractors::TrustedProxies;
use crate::operations::OperationTable;

/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Services,
    /// The operation each route is gated on.
    pub operations: Arc<OperationTable>,
    pub proxies: Arc<TrustedProxies>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        let config = services.config.clone();
        let operations = Arc::new(OperationTable::standard(&config.auth.admin_path_prefix));
        let proxies = Arc::new(TrustedProxies::from_config(&config.server.trusted_proxies));
        Self {
            config,
            services,
            operations,
            proxies,
        }
    }
}
