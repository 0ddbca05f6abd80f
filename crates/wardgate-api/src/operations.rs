//! The operation every route is gated on.
//!
//! Routes and their operations are declared side by side: [`Paths`] is the
//! single source of the URL shapes that both the router and
//! [`OperationTable::standard`] use.

use std::collections::HashMap;

use axum::http::Method;

use wardgate_auth::gate::{Operation, Scope};

pub const LOGIN_PATH: &str = "/auth/login/";
pub const APP_LOGIN_PATH: &str = "/app/login/";
pub const LOGOUT_PATH: &str = "/auth/logout/";
pub const SESSION_STATUS_PATH: &str = "/auth/session/status";
pub const HEALTH_PATH: &str = "/health";

/// Admin console routes under the configured prefix.
#[derive(Debug, Clone)]
pub struct Paths {
    pub admin_login: String,
    pub alerts: String,
    pub resolve_alert: String,
    pub audit: String,
    pub statistics: String,
    pub bulk_users: String,
}

impl Paths {
    /// `admin_prefix` must start and end with `/`.
    pub fn new(admin_prefix: &str) -> Self {
        let under = |rest: &str| format!("{admin_prefix}{rest}");
        Self {
            admin_login: under("login/"),
            alerts: under("alerts/"),
            resolve_alert: under("alerts/{id}/resolve"),
            audit: under("audit/"),
            statistics: under("activity/statistics"),
            bulk_users: under("users/bulk"),
        }
    }
}

/// How the interceptor treats one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOperation {
    pub operation: Operation,
    /// Leave the session untouched: no resolve, so no idle extension.
    pub passive: bool,
}

/// Route template to operation, keyed by method.
#[derive(Debug, Clone)]
pub struct OperationTable {
    admin_prefix: String,
    routes: HashMap<(Method, String), RouteOperation>,
}

impl OperationTable {
    pub fn new(admin_prefix: impl Into<String>) -> Self {
        Self {
            admin_prefix: admin_prefix.into(),
            routes: HashMap::new(),
        }
    }

    /// The operations of every route the router mounts.
    pub fn standard(admin_prefix: &str) -> Self {
        let paths = Paths::new(admin_prefix);
        let mut table = Self::new(admin_prefix);
        table
            .register(Method::POST, LOGIN_PATH, Operation::public(Scope::Application))
            .register(Method::POST, APP_LOGIN_PATH, Operation::public(Scope::Application))
            .register(Method::POST, &paths.admin_login, Operation::public(Scope::AdminConsole))
            .register(Method::POST, LOGOUT_PATH, Operation::public(Scope::Application))
            .register(Method::GET, HEALTH_PATH, Operation::public(Scope::Application))
            .register_passive(
                Method::GET,
                SESSION_STATUS_PATH,
                Operation::public(Scope::Application),
            )
            .register(
                Method::GET,
                &paths.alerts,
                Operation::new("activity.view_alert", Scope::AdminConsole),
            )
            .register(
                Method::POST,
                &paths.resolve_alert,
                Operation::new("activity.resolve_alert", Scope::AdminConsole),
            )
            .register(
                Method::GET,
                &paths.audit,
                Operation::new("audit.view_auditlog", Scope::AdminConsole),
            )
            .register(
                Method::GET,
                &paths.statistics,
                Operation::new("activity.view_activity", Scope::AdminConsole),
            )
            .register(
                Method::POST,
                &paths.bulk_users,
                Operation::new("accounts.change_user", Scope::AdminConsole),
            );
        table
    }

    pub fn register(&mut self, method: Method, route: &str, operation: Operation) -> &mut Self {
        self.routes.insert(
            (method, route.to_string()),
            RouteOperation {
                operation,
                passive: false,
            },
        );
        self
    }

    pub fn register_passive(
        &mut self,
        method: Method,
        route: &str,
        operation: Operation,
    ) -> &mut Self {
        self.routes.insert(
            (method, route.to_string()),
            RouteOperation {
                operation,
                passive: true,
            },
        );
        self
    }

    /// The operation for a request. `matched` is the route template axum
    /// matched, if any. Unregistered paths under the admin prefix still
    /// need a staff user; everything else is open.
    pub fn lookup(&self, method: &Method, matched: Option<&str>, path: &str) -> RouteOperation {
        let template = matched.unwrap_or(path);
        if let Some(route) = self.routes.get(&(method.clone(), template.to_string())) {
            return route.clone();
        }

        let scope = if path.starts_with(&self.admin_prefix) {
            Scope::AdminConsole
        } else {
            Scope::Application
        };
        let operation = match scope {
            Scope::AdminConsole => Operation::authenticated(scope),
            Scope::Application => Operation::public(scope),
        };
        RouteOperation {
            operation,
            passive: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_prefix() {
        let paths = Paths::new("/console/");
        assert_eq!(paths.admin_login, "/console/login/");
        assert_eq!(paths.resolve_alert, "/console/alerts/{id}/resolve");
    }

    #[test]
    fn test_lookup_registered() {
        let table = OperationTable::standard("/admin/");
        let route = table.lookup(&Method::GET, Some("/admin/alerts/"), "/admin/alerts/");
        assert_eq!(route.operation.codename.as_deref(), Some("activity.view_alert"));
        assert_eq!(route.operation.scope, Scope::AdminConsole);

        let route = table.lookup(
            &Method::POST,
            Some("/admin/alerts/{id}/resolve"),
            "/admin/alerts/7/resolve",
        );
        assert_eq!(route.operation.codename.as_deref(), Some("activity.resolve_alert"));

        let status = table.lookup(&Method::GET, None, SESSION_STATUS_PATH);
        assert!(status.passive);
        assert!(!status.operation.requires_auth);
    }

    #[test]
    fn test_lookup_fallback_by_prefix() {
        let table = OperationTable::standard("/admin/");
        let admin = table.lookup(&Method::GET, None, "/admin/patients/12/");
        assert_eq!(admin.operation, Operation::authenticated(Scope::AdminConsole));

        let app = table.lookup(&Method::GET, None, "/patients/12/");
        assert_eq!(app.operation, Operation::public(Scope::Application));

        // Method matters.
        let wrong_method = table.lookup(&Method::DELETE, Some("/admin/alerts/"), "/admin/alerts/");
        assert_eq!(wrong_method.operation.codename, None);
    }
}
