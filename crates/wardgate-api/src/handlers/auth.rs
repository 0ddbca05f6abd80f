//! Auth handlers: login, logout, session status.
//!
//! Login and logout write their own activity records through the auth
//! service, so their responses carry [`ActivityHandled`].

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;

use wardgate_auth::credential::Realm;
use wardgate_entity::session::EndReason;

use crate::cookies::{removal_cookie, session_cookie, session_token};
use crate::dto::request::LogoutQuery;
use crate::dto::response::{LoginResponse, LogoutResponse, SessionStatusResponse};
use crate::error::ApiError;
use crate::extractors::{ActivityHandled, Caller, LoginPayload, wants_json};
use crate::state::AppState;

/// POST /auth/login/. The realm follows the path of the page that
/// submitted the form.
pub async fn login(
    State(state): State<AppState>,
    caller: Caller,
    headers: HeaderMap,
    payload: LoginPayload,
) -> Response {
    let realm = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .map(referer_path)
        .map_or(Realm::Application, |path| {
            state.services.auth.router().realm_for_path(path)
        });
    submit(&state, realm, &caller, &headers, payload).await
}

/// POST <admin>/login/
pub async fn login_admin(
    State(state): State<AppState>,
    caller: Caller,
    headers: HeaderMap,
    payload: LoginPayload,
) -> Response {
    submit(&state, Realm::Admin, &caller, &headers, payload).await
}

/// POST /app/login/
pub async fn login_app(
    State(state): State<AppState>,
    caller: Caller,
    headers: HeaderMap,
    payload: LoginPayload,
) -> Response {
    submit(&state, Realm::Application, &caller, &headers, payload).await
}

async fn submit(
    state: &AppState,
    realm: Realm,
    caller: &Caller,
    headers: &HeaderMap,
    payload: LoginPayload,
) -> Response {
    let result = state
        .services
        .auth
        .login(realm, payload.identifier.trim(), &payload.password, &caller.client)
        .await;

    let response = match result {
        Ok(outcome) => {
            let jar = CookieJar::new().add(session_cookie(&state.config.server, outcome.issued.token));
            if wants_json(headers) {
                let body = LoginResponse {
                    user_id: outcome.user.id,
                    display_name: outcome.user.display_name(),
                };
                (jar, Json(body)).into_response()
            } else {
                let fallback = match realm {
                    Realm::Admin => state.config.auth.admin_path_prefix.clone(),
                    Realm::Application => "/".to_string(),
                };
                let target = payload
                    .next
                    .as_deref()
                    .filter(|next| is_same_site(next))
                    .map_or(fallback, str::to_string);
                (StatusCode::FOUND, jar, [(header::LOCATION, target)]).into_response()
            }
        }
        Err(e) => ApiError::from(e).into_response(),
    };
    handled(response)
}

/// POST /auth/logout/?reason=
pub async fn logout(
    State(state): State<AppState>,
    caller: Caller,
    headers: HeaderMap,
    Query(query): Query<LogoutQuery>,
) -> Result<Response, ApiError> {
    let reason = query
        .reason
        .as_deref()
        .and_then(|r| r.parse::<EndReason>().ok())
        .unwrap_or(EndReason::Manual);

    if let Some(token) = session_token(&headers, &state.config.server.cookie_name) {
        state
            .services
            .auth
            .logout(&token, reason, &caller.client)
            .await?;
    }

    let jar = CookieJar::new().add(removal_cookie(&state.config.server));
    Ok(handled(
        (jar, Json(LogoutResponse { logged_out: true })).into_response(),
    ))
}

/// GET /auth/session/status. Reads the session without extending it.
pub async fn session_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let status = match session_token(&headers, &state.config.server.cookie_name) {
        Some(token) => state.services.auth.status(&token).await?,
        None => None,
    };

    Ok(Json(match status {
        Some(status) => SessionStatusResponse {
            authenticated: true,
            expires_at: Some(status.expires_at),
            seconds_remaining: status.seconds_remaining,
            warning: status.warning,
        },
        None => SessionStatusResponse {
            authenticated: false,
            expires_at: None,
            seconds_remaining: 0,
            warning: false,
        },
    }))
}

fn handled(mut response: Response) -> Response {
    response.extensions_mut().insert(ActivityHandled);
    response
}

/// Path component of a Referer header value.
fn referer_path(referer: &str) -> &str {
    let rest = match referer.find("://") {
        Some(i) => {
            let after = &referer[i + 3..];
            after.find('/').map_or("/", |j| &after[j..])
        }
        None => referer,
    };
    let end = rest.find(['?', '#']).unwrap_or(rest.len());
    &rest[..end]
}

/// A redirect target on this site: an absolute path, not protocol-relative.
fn is_same_site(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control)
}
