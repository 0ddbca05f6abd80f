//! # wardgate-auth
//!
//! Authentication and authorization for Wardgate.
//!
//! ## Modules
//!
//! - `password`: Argon2id/bcrypt hashing and password policy
//! - `credential`: per-realm credential verifiers, the realm router, and
//!   the shared failed-login tracker
//! - `session`: opaque session tokens, idle timeout, and concurrency policy
//! - `rbac`: role graph invariants, the permission resolver, and its cache
//! - `gate`: allow/deny decisions for an operation

pub mod credential;
pub mod gate;
pub mod password;
pub mod rbac;
pub mod session;

pub use credential::{
    AdminVerifier, AppVerifier, AuthAttempt, AuthFailure, CredentialVerifier, FailureKey,
    FailureTracker, Realm, RealmRouter, Verification,
};
pub use gate::{AuthorizationGate, Decision, DenyReason, ObjectPredicate, ObjectRef, Operation, Scope};
pub use password::{PasswordHasher, PasswordValidator};
pub use rbac::{PermissionCache, PermissionResolver, RoleGraph, RoleManager};
pub use session::{IssuedSession, Resolution, SessionManager, SessionStatus};
