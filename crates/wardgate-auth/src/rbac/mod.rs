//! Role-based access control: the role graph, the permission resolver,
//! its cache, and the role manager that keeps them consistent.

pub mod cache;
pub mod graph;
pub mod resolver;
pub mod roles;

pub use cache::{CacheTicket, PermissionCache};
pub use graph::RoleGraph;
pub use resolver::PermissionResolver;
pub use roles::RoleManager;
