//! Role entity.

pub mod model;

pub use model::{MAX_ROLE_NAME_LEN, NewRole, Role, RoleChanges};
