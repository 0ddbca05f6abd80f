//! Permission entity model.
//!
//! Permissions belong to the surrounding domain; the core only reads them.
//! A permission is addressed by its qualified codename
//! `<object_type>.<codename>`, for example `patients.view`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use wardgate_core::AppError;
use wardgate_core::types::PermissionId;

/// A single grantable permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    /// Unique permission identifier.
    pub id: PermissionId,
    /// Object-type namespace, e.g. `patients`.
    pub object_type: String,
    /// Verb within the namespace, e.g. `view`.
    pub codename: String,
    /// Human-readable name.
    pub name: String,
}

impl Permission {
    /// `<object_type>.<codename>`.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.object_type, self.codename)
    }
}

/// Data required to register a permission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPermission {
    /// Object-type namespace.
    pub object_type: String,
    /// Verb within the namespace.
    pub codename: String,
    /// Human-readable name.
    pub name: String,
}

/// Split a qualified codename into `(object_type, codename)`.
pub fn split_codename(qualified: &str) -> Result<(&str, &str), AppError> {
    match qualified.split_once('.') {
        Some((object_type, codename)) if !object_type.is_empty() && !codename.is_empty() => {
            Ok((object_type, codename))
        }
        _ => Err(AppError::validation(format!(
            "Permission codename must look like '<object-type>.<verb>', got '{qualified}'"
        ))),
    }
}
