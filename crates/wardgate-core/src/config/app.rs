//! HTTP server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Deadline applied to every store operation on the request path.
    #[serde(default = "default_request_deadline", with = "super::duration")]
    pub request_deadline: Duration,
    /// Set the `Secure` attribute on the session cookie (TLS terminated).
    #[serde(default)]
    pub cookie_secure: bool,
    /// Name of the session cookie.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Peer addresses whose `X-Forwarded-For` and `X-Real-IP` headers are
    /// believed. `"*"` trusts every peer.
    #[serde(default = "default_trusted_proxies")]
    pub trusted_proxies: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_deadline: default_request_deadline(),
            cookie_secure: false,
            cookie_name: default_cookie_name(),
            trusted_proxies: default_trusted_proxies(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_deadline() -> Duration {
    Duration::from_secs(5)
}

fn default_cookie_name() -> String {
    "wardgate_session".to_string()
}

fn default_trusted_proxies() -> Vec<String> {
    vec!["127.0.0.1".to_string(), "::1".to_string()]
}
