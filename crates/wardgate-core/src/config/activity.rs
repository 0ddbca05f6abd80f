//! Activity recorder configuration.

use serde::{Deserialize, Serialize};

/// Activity recorder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Paths starting with any of these produce no activity record.
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,
    /// Paths ending with any of these produce no activity record.
    #[serde(default = "default_skip_suffixes")]
    pub skip_suffixes: Vec<String>,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: default_skip_prefixes(),
            skip_suffixes: default_skip_suffixes(),
        }
    }
}

fn default_skip_prefixes() -> Vec<String> {
    ["/static/", "/media/", "/favicon.ico", "/health", "/__debug__/", "/activity/"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_skip_suffixes() -> Vec<String> {
    ["/ping", "/heartbeat", "/status"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
