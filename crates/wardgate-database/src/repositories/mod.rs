//! PostgreSQL implementations of the store traits.

pub mod activity;
pub mod alert;
pub mod audit;
pub mod permission;
pub mod role;
pub mod session;
pub mod user;

pub use activity::ActivityRepository;
pub use alert::AlertRepository;
pub use audit::AuditLogRepository;
pub use permission::PermissionRepository;
pub use role::RoleRepository;
pub use session::SessionRepository;
pub use user::UserRepository;
