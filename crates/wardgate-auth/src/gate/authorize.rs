//! The authorization gate.
//!
//! Rules, first match wins:
//!
//! 1. anonymous on an authenticated operation: `unauthenticated`
//! 2. inactive user: `inactive`
//! 3. public operation: allow, whoever is signed in
//! 4. admin console without `is_staff`: `not_staff`
//! 5. superuser: allow
//! 6. codename held: allow, narrowed by a registered object predicate
//! 7. otherwise: `forbidden`
//!
//! Resolver failures and elapsed deadlines deny with `unavailable`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use wardgate_core::deadline::with_deadline;
use wardgate_core::result::AppResult;
use wardgate_entity::user::User;

use super::operation::{ObjectRef, Operation, Scope};
use super::predicate::ObjectPredicate;
use crate::rbac::PermissionResolver;

/// Why an operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Unauthenticated,
    Inactive,
    NotStaff,
    Forbidden,
    Unavailable,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Inactive => "inactive",
            Self::NotStaff => "not_staff",
            Self::Forbidden => "forbidden",
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`AuthorizationGate::authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allow => None,
            Self::Deny(reason) => Some(*reason),
        }
    }
}

/// Decides whether a user may perform an operation.
#[derive(Clone)]
pub struct AuthorizationGate {
    resolver: PermissionResolver,
    predicates: HashMap<String, Arc<dyn ObjectPredicate>>,
    deadline: Duration,
}

impl AuthorizationGate {
    pub fn new(resolver: PermissionResolver, deadline: Duration) -> Self {
        Self {
            resolver,
            predicates: HashMap::new(),
            deadline,
        }
    }

    /// Register an object predicate for a codename, replacing any earlier one.
    pub fn with_predicate(
        mut self,
        codename: impl Into<String>,
        predicate: Arc<dyn ObjectPredicate>,
    ) -> Self {
        self.predicates.insert(codename.into(), predicate);
        self
    }

    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    pub async fn authorize(
        &self,
        user: Option<&User>,
        operation: &Operation,
        object: Option<&ObjectRef>,
    ) -> Decision {
        let Some(user) = user else {
            return if operation.requires_auth {
                Decision::Deny(DenyReason::Unauthenticated)
            } else {
                Decision::Allow
            };
        };

        if !user.is_active {
            return Decision::Deny(DenyReason::Inactive);
        }
        // The console login must accept a browser that still holds an
        // application session.
        if !operation.requires_auth {
            return Decision::Allow;
        }
        if operation.scope == Scope::AdminConsole && !user.is_staff {
            return Decision::Deny(DenyReason::NotStaff);
        }
        if user.is_superuser {
            return Decision::Allow;
        }
        let Some(codename) = operation.codename.as_deref() else {
            return Decision::Allow;
        };

        match with_deadline(self.deadline, "authorize", self.check(user, codename, object)).await {
            Ok(true) => Decision::Allow,
            Ok(false) => {
                debug!(user_id = %user.id, codename = codename, "Permission denied");
                Decision::Deny(DenyReason::Forbidden)
            }
            Err(e) => {
                warn!(
                    user_id = %user.id,
                    codename = codename,
                    error = %e,
                    "Authorization unavailable, denying"
                );
                Decision::Deny(DenyReason::Unavailable)
            }
        }
    }

    async fn check(
        &self,
        user: &User,
        codename: &str,
        object: Option<&ObjectRef>,
    ) -> AppResult<bool> {
        if !self.resolver.effective(user.id).await?.contains(codename) {
            return Ok(false);
        }
        match self.predicates.get(codename) {
            Some(predicate) => predicate.allows(user, object).await,
            None => Ok(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wardgate_core::config::RbacConfig;
    use wardgate_database::memory::MemoryStore;
    use wardgate_database::store::{PermissionStore, UserStore};
    use wardgate_entity::permission::NewPermission;
    use wardgate_entity::user::NewUser;

    async fn setup() -> (Arc<MemoryStore>, AuthorizationGate, User) {
        let store = Arc::new(MemoryStore::new());
        let resolver = PermissionResolver::new(
            store.clone(),
            store.clone(),
            store.clone(),
            &RbacConfig::default(),
        );
        let user = UserStore::insert(
            &*store,
            &NewUser {
                username: "dr_who".to_string(),
                phone: "5551234".to_string(),
                email: None,
                first_name: "John".to_string(),
                last_name: "Smith".to_string(),
                password_hash: "x".to_string(),
                is_active: true,
                is_staff: false,
                is_superuser: false,
            },
        )
        .await
        .unwrap();
        let perm = PermissionStore::insert(
            &*store,
            &NewPermission {
                object_type: "patients".to_string(),
                codename: "view".to_string(),
                name: "Can view patients".to_string(),
            },
        )
        .await
        .unwrap();
        store.grant_permission(user.id, perm.id).await.unwrap();
        (store, AuthorizationGate::new(resolver, Duration::from_secs(1)), user)
    }

    #[tokio::test]
    async fn test_rule_order() {
        let (_store, gate, mut user) = setup().await;
        let view = Operation::new("patients.view", Scope::Application);

        assert_eq!(
            gate.authorize(None, &view, None).await,
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            gate.authorize(None, &Operation::public(Scope::AdminConsole), None)
                .await,
            Decision::Allow
        );
        assert_eq!(gate.authorize(Some(&user), &view, None).await, Decision::Allow);
        assert_eq!(
            gate.authorize(
                Some(&user),
                &Operation::new("patients.delete", Scope::Application),
                None
            )
            .await,
            Decision::Deny(DenyReason::Forbidden)
        );

        // Holding the codename does not open the admin console.
        let console = Operation::new("patients.view", Scope::AdminConsole);
        assert_eq!(
            gate.authorize(Some(&user), &console, None).await,
            Decision::Deny(DenyReason::NotStaff)
        );

        // Public operations ignore the staff rule.
        assert_eq!(
            gate.authorize(Some(&user), &Operation::public(Scope::AdminConsole), None)
                .await,
            Decision::Allow
        );

        user.is_superuser = true;
        user.is_staff = true;
        assert_eq!(gate.authorize(Some(&user), &console, None).await, Decision::Allow);

        user.is_active = false;
        assert_eq!(
            gate.authorize(Some(&user), &console, None).await,
            Decision::Deny(DenyReason::Inactive)
        );
    }

    #[tokio::test]
    async fn test_object_predicate_narrows() {
        let (_store, gate, user) = setup().await;
        let gate = gate.with_predicate(
            "patients.view",
            Arc::new(|_: &User, object: Option<&ObjectRef>| {
                object.is_some_and(|o| o.object_id == "7")
            }),
        );
        let view = Operation::new("patients.view", Scope::Application);

        let own = ObjectRef::new("patients", "7");
        let other = ObjectRef::new("patients", "8");
        assert_eq!(gate.authorize(Some(&user), &view, Some(&own)).await, Decision::Allow);
        assert_eq!(
            gate.authorize(Some(&user), &view, Some(&other)).await,
            Decision::Deny(DenyReason::Forbidden)
        );
        assert_eq!(
            gate.authorize(Some(&user), &view, None).await,
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_store_fails_closed() {
        let (store, gate, user) = setup().await;
        store.set_latency(Some(Duration::from_secs(10)));
        let view = Operation::new("patients.view", Scope::Application);
        assert_eq!(
            gate.authorize(Some(&user), &view, None).await,
            Decision::Deny(DenyReason::Unavailable)
        );
    }
}
