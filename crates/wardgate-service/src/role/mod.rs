//! Audited role administration.

pub mod service;

pub use service::RoleService;
