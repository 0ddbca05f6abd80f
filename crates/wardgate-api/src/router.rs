//! Route definitions for the Wardgate HTTP API.
//!
//! Route shapes come from [`Paths`] so the router and the operation table
//! cannot drift apart.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::operations::{
    APP_LOGIN_PATH, HEALTH_PATH, LOGIN_PATH, LOGOUT_PATH, Paths, SESSION_STATUS_PATH,
};
use crate::state::AppState;

/// Build the complete Axum router with all routes and the interceptor.
pub fn build_router(state: AppState) -> Router {
    let paths = Paths::new(&state.config.auth.admin_path_prefix);

    Router::new()
        .merge(auth_routes())
        .merge(admin_routes(&paths))
        .route(HEALTH_PATH, get(handlers::health::health))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::intercept,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Login, logout, session status
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(LOGIN_PATH, post(handlers::auth::login))
        .route(APP_LOGIN_PATH, post(handlers::auth::login_app))
        .route(LOGOUT_PATH, post(handlers::auth::logout))
        .route(SESSION_STATUS_PATH, get(handlers::auth::session_status))
}

/// Admin console endpoints under the configured prefix
fn admin_routes(paths: &Paths) -> Router<AppState> {
    use handlers::admin;

    Router::new()
        .route(&paths.admin_login, post(handlers::auth::login_admin))
        .route(&paths.alerts, get(admin::alerts::list_alerts))
        .route(&paths.resolve_alert, post(admin::alerts::resolve_alert))
        .route(&paths.audit, get(admin::audit::list_audit))
        .route(&paths.statistics, get(admin::activity::statistics))
        .route(&paths.bulk_users, post(admin::users::bulk_users))
}
