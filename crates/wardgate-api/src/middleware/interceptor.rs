//! The request interceptor.
//!
//! One function around every handler:
//!
//! 1. resolve the session cookie (skipped for passive routes)
//! 2. ask the authorization gate for the route's operation
//! 3. run the handler under the request deadline
//! 4. record the request and feed it to the anomaly detector
//!
//! Denials and elapsed deadlines are recorded here too, so every request
//! outside the skip set yields exactly one activity record.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::{debug, warn};

use wardgate_activity::{RequestActivity, RequestObservation};
use wardgate_auth::gate::{Decision, DenyReason, ObjectRef};
use wardgate_auth::session::Resolution;
use wardgate_core::deadline::with_deadline;
use wardgate_core::error::AppError;
use wardgate_entity::activity::ActivityRecord;
use wardgate_entity::session::ClientFingerprint;
use wardgate_entity::user::User;

use crate::cookies::{removal_cookie, session_token};
use crate::error::ApiError;
use crate::extractors::{ActivityHandled, Caller, client_fingerprint};
use crate::state::AppState;

pub async fn intercept(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let matched = request
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string());
    let route = state.operations.lookup(&method, matched.as_deref(), &path);
    let client = client_fingerprint(request.headers(), request.extensions(), &state.proxies);
    let token = session_token(request.headers(), &state.config.server.cookie_name);
    let deadline = state.config.server.request_deadline;
    let public = !route.operation.requires_auth;
    let services = &state.services;

    let mut user: Option<User> = None;
    let mut session_ref: Option<String> = None;
    let mut ended = false;
    if let (Some(token), false) = (token.as_deref(), route.passive) {
        let resolved = with_deadline(deadline, "session resolve", services.auth.resolve(token, &client)).await;
        match resolved {
            Ok(Resolution::Active { user: found, session }) => {
                session_ref = Some(session.token_hash);
                user = Some(found);
            }
            Ok(Resolution::Expired(_)) | Ok(Resolution::Revoked(_)) => ended = true,
            Ok(Resolution::Unknown) => {}
            Err(e) => {
                warn!(method = %method, path = %path, error = %e, "Session resolve failed");
                services
                    .recorder
                    .record_timeout(None, method.as_str(), &path, None, &client)
                    .await;
                return unavailable(e);
            }
        }
    }

    let object = object_ref(&path);
    let decision = services
        .gate
        .authorize(user.as_ref(), &route.operation, object.as_ref())
        .await;

    if let Decision::Deny(reason) = decision {
        let user_id = user.as_ref().map(|u| u.id);
        debug!(
            method = %method,
            path = %path,
            user_id = ?user_id.map(|id| id.get()),
            reason = %reason,
            "Request denied"
        );
        let (record, response) = match reason {
            DenyReason::Unavailable => {
                let record = services
                    .recorder
                    .record_timeout(user_id, method.as_str(), &path, session_ref.clone(), &client)
                    .await;
                (record, unavailable(AppError::timeout("Authorization unavailable")))
            }
            DenyReason::Unauthenticated => {
                let record = services
                    .recorder
                    .record_denied(user_id, method.as_str(), &path, reason.as_str(), None, &client)
                    .await;
                let response = ApiError::from(AppError::session_expired("Authentication required"))
                    .into_response();
                (record, response)
            }
            DenyReason::Inactive | DenyReason::NotStaff | DenyReason::Forbidden => {
                let record = services
                    .recorder
                    .record_denied(
                        user_id,
                        method.as_str(),
                        &path,
                        reason.as_str(),
                        session_ref.clone(),
                        &client,
                    )
                    .await;
                let response = ApiError::from(AppError::forbidden(reason.as_str())).into_response();
                (record, response)
            }
        };
        let seen = Seen {
            user: user.as_ref(),
            path: &path,
            public,
            session_ref: session_ref.as_deref(),
            client: &client,
        };
        observe(&state, seen, record.as_ref()).await;
        return clear_if_ended(&state, response, ended);
    }

    request.extensions_mut().insert(Caller {
        user: user.clone(),
        session_ref: session_ref.clone(),
        client: client.clone(),
    });

    let response = match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            warn!(
                method = %method,
                path = %path,
                deadline_ms = deadline.as_millis() as u64,
                "Handler abandoned at deadline"
            );
            services
                .recorder
                .record_timeout(
                    user.as_ref().map(|u| u.id),
                    method.as_str(),
                    &path,
                    session_ref.clone(),
                    &client,
                )
                .await;
            return unavailable(AppError::timeout("Request deadline exceeded"));
        }
    };

    let record = if response.extensions().get::<ActivityHandled>().is_none() {
        services
            .recorder
            .record_request(RequestActivity {
                user_id: user.as_ref().map(|u| u.id),
                method: method.as_str().to_string(),
                path: path.clone(),
                status: response.status().as_u16(),
                elapsed_ms: started.elapsed().as_millis() as i64,
                client: client.clone(),
                session_ref: session_ref.clone(),
                extra: None,
            })
            .await
    } else {
        None
    };
    let seen = Seen {
        user: user.as_ref(),
        path: &path,
        public,
        session_ref: session_ref.as_deref(),
        client: &client,
    };
    observe(&state, seen, record.as_ref()).await;

    clear_if_ended(&state, response, ended)
}

/// A finished request as handed to the detector.
struct Seen<'a> {
    user: Option<&'a User>,
    path: &'a str,
    public: bool,
    session_ref: Option<&'a str>,
    client: &'a ClientFingerprint,
}

/// Hand the request to the anomaly detector. Skipped paths are not
/// observed, so status polling does not count as traffic. The stored
/// record, when there is one, keys the event for replay protection.
async fn observe(state: &AppState, seen: Seen<'_>, record: Option<&ActivityRecord>) {
    let services = &state.services;
    if services.recorder.skips(seen.path) {
        return;
    }
    services
        .detector
        .observe_request(RequestObservation {
            event_key: record.map(|r| format!("activity:{}", r.id)),
            user: seen.user,
            path: seen.path,
            public: seen.public,
            session_ref: seen.session_ref,
            ip: seen.client.ip.as_deref(),
            at: services.clock.now(),
        })
        .await;
}

/// 503 for an elapsed deadline, 500 for any other infrastructure failure.
fn unavailable(error: AppError) -> Response {
    ApiError::from(error).into_response()
}

/// Drop the cookie of a session that ended during resolve.
fn clear_if_ended(state: &AppState, response: Response, ended: bool) -> Response {
    if !ended {
        return response;
    }
    let jar = CookieJar::new().add(removal_cookie(&state.config.server));
    (jar, response).into_response()
}

/// `/<type>/<id>/...` names the object a request targets.
fn object_ref(path: &str) -> Option<ObjectRef> {
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let object_type = segments.next()?;
    let object_id = segments.next()?;
    Some(ObjectRef::new(object_type, object_id))
}
