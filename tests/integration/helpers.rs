//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tower::ServiceExt;

use wardgate_api::AppState;
use wardgate_core::config::AppConfig;
use wardgate_core::traits::ManualClock;
use wardgate_database::Stores;
use wardgate_database::memory::MemoryStore;
use wardgate_entity::user::User;
use wardgate_service::{CreateUserRequest, RequestContext, Services};

/// Address the test client claims to come from.
pub const CLIENT_IP: &str = "203.0.113.7";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// In-memory state behind every store
    pub memory: Arc<MemoryStore>,
    /// Clock shared by every component
    pub clock: Arc<ManualClock>,
    pub services: Services,
    pub config: AppConfig,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let memory = Arc::new(MemoryStore::new());
        // A Monday morning.
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap(),
        ));
        let services = Services::build(Stores::from_memory(memory.clone()), &config, clock.clone());
        services
            .ensure_core_permissions()
            .await
            .expect("Failed to register core permissions");
        let router = wardgate_api::build_app(AppState::new(services.clone()));

        Self {
            router,
            memory,
            clock,
            services,
            config,
        }
    }

    pub async fn create_user(&self, username: &str, phone: &str, password: &str, is_staff: bool) -> User {
        self.services
            .identity
            .create_user(
                &RequestContext::system(),
                CreateUserRequest {
                    username: username.to_string(),
                    phone: phone.to_string(),
                    password: password.to_string(),
                    is_staff,
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to create user")
    }

    pub async fn create_superuser(&self, username: &str, phone: &str, password: &str) -> User {
        self.services
            .identity
            .create_superuser(
                &RequestContext::system(),
                CreateUserRequest {
                    username: username.to_string(),
                    phone: phone.to_string(),
                    password: password.to_string(),
                    ..Default::default()
                },
            )
            .await
            .expect("Failed to create superuser")
    }

    /// Send a request through the full router.
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// A JSON request from [`CLIENT_IP`] that asks for a JSON answer.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .header("X-Forwarded-For", CLIENT_IP);
        if let Some(token) = token {
            req = req.header(header::COOKIE, format!("{}={}", self.config.server.cookie_name, token));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");
        self.send(req).await
    }

    /// Log in through `path` and return the session token.
    pub async fn login(&self, path: &str, identifier: &str, password: &str) -> String {
        let response = self
            .request(
                "POST",
                path,
                Some(serde_json::json!({ "identifier": identifier, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response
            .session_cookie(&self.config.server.cookie_name)
            .expect("Login did not set a session cookie")
    }
}

/// Defaults plus a short minimum password length, trusting the
/// forwarded address the test client sends.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.password_min_length = 2;
    // Requests come straight from the router, with no socket peer.
    config.server.trusted_proxies = vec!["*".to_string()];
    config
}

/// Response captured from the router.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON body, `Null` when the body is not JSON
    pub body: Value,
}

impl TestResponse {
    /// Value of the `name` cookie set by this response. An empty value
    /// means the cookie was cleared.
    pub fn session_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| {
                v.split(';')
                    .next()
                    .and_then(|pair| pair.trim().strip_prefix(&prefix))
                    .map(str::to_string)
            })
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }
}
