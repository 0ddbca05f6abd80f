//! Role graph and permission cache configuration.

use serde::{Deserialize, Serialize};

/// RBAC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RbacConfig {
    /// How role mutations invalidate cached effective permission sets.
    #[serde(default)]
    pub cache_strategy: CacheStrategy,
    /// Maximum length of a parent chain.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            cache_strategy: CacheStrategy::default(),
            max_depth: default_max_depth(),
        }
    }
}

/// Cache invalidation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// Drop only the entries of users whose closure contains the mutated role.
    #[default]
    Walk,
    /// Drop every entry on any mutation.
    Flush,
}

fn default_max_depth() -> usize {
    16
}
