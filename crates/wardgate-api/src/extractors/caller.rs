//! `Caller` extractor: the identity the interceptor resolved.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use wardgate_entity::session::ClientFingerprint;
use wardgate_entity::user::User;
use wardgate_service::RequestContext;

use super::client::{TrustedProxies, client_fingerprint};

/// Who is calling. Inserted into the request extensions by the
/// interceptor once the gate has allowed the request.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub user: Option<User>,
    /// Hash of the session token, when a live session was resolved.
    pub session_ref: Option<String>,
    pub client: ClientFingerprint,
}

impl Caller {
    /// Context for audited service calls.
    pub fn context(&self) -> RequestContext {
        let ctx = match &self.user {
            Some(user) => RequestContext::for_user(user),
            None => RequestContext::system(),
        };
        ctx.with_client(&self.client)
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(caller) = parts.extensions.get::<Caller>() {
            return Ok(caller.clone());
        }
        // Outside the interceptor there is no proxy configuration to go on.
        Ok(Caller {
            client: client_fingerprint(&parts.headers, &parts.extensions, &TrustedProxies::none()),
            ..Default::default()
        })
    }
}

/// Response marker: the handler already wrote the activity record for
/// this request, so the interceptor must not write another.
#[derive(Debug, Clone, Copy)]
pub struct ActivityHandled;
