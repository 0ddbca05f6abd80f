//! Allow/deny decisions for an operation on an optional object.

pub mod authorize;
pub mod operation;
pub mod predicate;

pub use authorize::{AuthorizationGate, Decision, DenyReason};
pub use operation::{ObjectRef, Operation, Scope};
pub use predicate::ObjectPredicate;
