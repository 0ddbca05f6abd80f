//! # wardgate-service
//!
//! Business logic service layer for Wardgate. Each service orchestrates
//! stores, the auth components, and the activity pipeline to implement one
//! family of use cases.
//!
//! Services follow constructor injection: every dependency is provided at
//! construction time, and [`Services::build`] wires the whole graph from a
//! [`Stores`](wardgate_database::Stores) bundle and the configuration.

pub mod alert;
pub mod context;
pub mod identity;
pub mod login;
pub mod role;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use alert::AlertService;
pub use context::RequestContext;
pub use identity::{BulkAction, BulkFailure, BulkOutcome, CreateUserRequest, IdentityService};
pub use login::{AuthService, LoginOutcome};
pub use role::RoleService;
pub use services::{CORE_PERMISSIONS, Services};
