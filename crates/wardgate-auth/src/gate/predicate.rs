//! Object-scoped checks registered per codename.

use async_trait::async_trait;

use wardgate_core::result::AppResult;
use wardgate_entity::user::User;

use super::operation::ObjectRef;

/// Narrows a granted codename to specific objects, e.g. "only patients on
/// the user's own ward".
#[async_trait]
pub trait ObjectPredicate: Send + Sync {
    /// Whether `user` may act on `object`. `object` is `None` when the
    /// caller supplied no object.
    async fn allows(&self, user: &User, object: Option<&ObjectRef>) -> AppResult<bool>;
}

#[async_trait]
impl<F> ObjectPredicate for F
where
    F: Fn(&User, Option<&ObjectRef>) -> bool + Send + Sync,
{
    async fn allows(&self, user: &User, object: Option<&ObjectRef>) -> AppResult<bool> {
        Ok(self(user, object))
    }
}
