//! Client address and request-shape helpers.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap, header};

use wardgate_entity::session::ClientFingerprint;

/// Peers allowed to speak for the client through forwarding headers.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxies {
    any: bool,
    peers: Vec<IpAddr>,
}

impl TrustedProxies {
    /// Trust nobody: the socket peer is always the client.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build from `server.trusted_proxies`. Entries that are not addresses
    /// are ignored; configuration validation rejects them earlier.
    pub fn from_config(entries: &[String]) -> Self {
        Self {
            any: entries.iter().any(|e| e == "*"),
            peers: entries.iter().filter_map(|e| e.parse().ok()).collect(),
        }
    }

    fn trusts(&self, peer: Option<IpAddr>) -> bool {
        self.any || peer.is_some_and(|p| self.peers.contains(&p))
    }
}

/// IP and User-Agent of the caller. When the socket peer is a trusted
/// proxy, the first `X-Forwarded-For` hop wins, then `X-Real-IP`;
/// otherwise the socket peer is the client.
pub fn client_fingerprint(
    headers: &HeaderMap,
    extensions: &Extensions,
    proxies: &TrustedProxies,
) -> ClientFingerprint {
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if !proxies.trusts(peer) {
        return ClientFingerprint {
            ip: peer.map(|p| p.to_string()),
            user_agent,
        };
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    let ip = forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| peer.map(|p| p.to_string()));

    ClientFingerprint { ip, user_agent }
}

/// Whether the caller asked for JSON rather than a redirect.
pub fn wants_json(headers: &HeaderMap) -> bool {
    let xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    xhr || accepts_json
}
