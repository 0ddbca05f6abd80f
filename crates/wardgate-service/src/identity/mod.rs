//! User lifecycle: creation, credentials, privileges, and bulk actions.

pub mod bulk;
pub mod service;

pub use bulk::{BulkAction, BulkFailure, BulkOutcome};
pub use service::{CreateUserRequest, IdentityService};
