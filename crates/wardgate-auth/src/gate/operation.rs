//! What a request is trying to do.

use serde::{Deserialize, Serialize};

/// Which surface an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The clinical application.
    Application,
    /// The staff-only admin console.
    AdminConsole,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::AdminConsole => "admin_console",
        }
    }
}

/// An operation checked by the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Qualified codename required, if any.
    pub codename: Option<String>,
    pub scope: Scope,
    pub requires_auth: bool,
}

impl Operation {
    /// An authenticated operation requiring `codename`.
    pub fn new(codename: impl Into<String>, scope: Scope) -> Self {
        Self {
            codename: Some(codename.into()),
            scope,
            requires_auth: true,
        }
    }

    /// An operation that only needs a signed-in user.
    pub fn authenticated(scope: Scope) -> Self {
        Self {
            codename: None,
            scope,
            requires_auth: true,
        }
    }

    /// An operation open to anonymous callers.
    pub fn public(scope: Scope) -> Self {
        Self {
            codename: None,
            scope,
            requires_auth: false,
        }
    }
}

/// The object an operation targets, as seen by object predicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_type: String,
    pub object_id: String,
}

impl ObjectRef {
    pub fn new(object_type: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}
