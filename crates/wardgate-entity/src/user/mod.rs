//! User entity, its profile satellite, and input types.

pub mod model;
pub mod profile;

pub use model::{NewUser, User, UserChanges};
pub use profile::UserProfile;
