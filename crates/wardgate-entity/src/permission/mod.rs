//! Permission entity.

pub mod model;

pub use model::{NewPermission, Permission, split_codename};
