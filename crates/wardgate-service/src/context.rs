//! Who is acting, and from where.

use serde::{Deserialize, Serialize};

use wardgate_core::types::UserId;
use wardgate_entity::session::ClientFingerprint;
use wardgate_entity::user::User;

/// Context for a privileged operation, carried into audit entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    /// Acting user; `None` for the system itself (CLI, scheduled jobs).
    pub actor_id: Option<UserId>,
    pub actor_username: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// The system acting on its own behalf.
    pub fn system() -> Self {
        Self::default()
    }

    /// `user` acting.
    pub fn for_user(user: &User) -> Self {
        Self {
            actor_id: Some(user.id),
            actor_username: Some(user.username.clone()),
            ..Self::default()
        }
    }

    pub fn with_client(mut self, client: &ClientFingerprint) -> Self {
        self.ip_address = client.ip.clone();
        self.user_agent = client.user_agent.clone();
        self
    }

    pub fn client(&self) -> ClientFingerprint {
        ClientFingerprint {
            ip: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// `{id, username}` of the operator, for audit details.
    pub fn operator(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.actor_id,
            "username": self.actor_username,
        })
    }
}
