//! Per-user effective permission cache.
//!
//! Reads are lock-free. A writer first takes a [`CacheTicket`], computes
//! the set, and stores it only if no invalidation happened in between:
//! every invalidation bumps the user's version, and every flush bumps the
//! global epoch.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use wardgate_core::types::UserId;

/// A user's effective permissions, as qualified codenames.
pub type PermissionSet = Arc<HashSet<String>>;

#[derive(Debug, Default)]
struct Slot {
    version: u64,
    epoch: u64,
    perms: Option<PermissionSet>,
}

/// Snapshot of the versions a computation started from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTicket {
    version: u64,
    epoch: u64,
}

#[derive(Debug, Default)]
pub struct PermissionCache {
    slots: DashMap<UserId, Slot>,
    epoch: AtomicU64,
}

impl PermissionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached set for `user`, if still valid.
    pub fn get(&self, user: UserId) -> Option<PermissionSet> {
        let epoch = self.epoch.load(Ordering::Acquire);
        let slot = self.slots.get(&user)?;
        if slot.epoch != epoch {
            return None;
        }
        slot.perms.clone()
    }

    /// Start a computation for `user`.
    pub fn ticket(&self, user: UserId) -> CacheTicket {
        let epoch = self.epoch.load(Ordering::Acquire);
        let version = self.slots.get(&user).map(|s| s.version).unwrap_or(0);
        CacheTicket { version, epoch }
    }

    /// Store a computed set. Returns `false` when an invalidation raced
    /// with the computation and the set was discarded.
    pub fn store(&self, user: UserId, ticket: CacheTicket, perms: PermissionSet) -> bool {
        if self.epoch.load(Ordering::Acquire) != ticket.epoch {
            return false;
        }
        match self.slots.entry(user) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if slot.version != ticket.version {
                    return false;
                }
                slot.epoch = ticket.epoch;
                slot.perms = Some(perms);
            }
            Entry::Vacant(vacant) => {
                if ticket.version != 0 {
                    return false;
                }
                vacant.insert(Slot {
                    version: 0,
                    epoch: ticket.epoch,
                    perms: Some(perms),
                });
            }
        }
        true
    }

    /// Drop one user's entry.
    pub fn invalidate(&self, user: UserId) {
        let mut slot = self.slots.entry(user).or_default();
        slot.version += 1;
        slot.perms = None;
    }

    /// Drop every entry.
    pub fn flush(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.slots.retain(|_, slot| {
            slot.perms = None;
            slot.version += 1;
            true
        });
    }

    /// Number of users with a cached set.
    pub fn len(&self) -> usize {
        let epoch = self.epoch.load(Ordering::Acquire);
        self.slots
            .iter()
            .filter(|s| s.perms.is_some() && s.epoch == epoch)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> PermissionSet {
        Arc::new(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_store_and_get() {
        let cache = PermissionCache::new();
        let ticket = cache.ticket(UserId(1));
        assert!(cache.store(UserId(1), ticket, set(&["patients.view"])));
        assert!(cache.get(UserId(1)).unwrap().contains("patients.view"));
    }

    #[test]
    fn test_invalidation_discards_racing_store() {
        let cache = PermissionCache::new();
        let ticket = cache.ticket(UserId(1));
        cache.invalidate(UserId(1));
        assert!(!cache.store(UserId(1), ticket, set(&["stale"])));
        assert!(cache.get(UserId(1)).is_none());

        let fresh = cache.ticket(UserId(1));
        assert!(cache.store(UserId(1), fresh, set(&["fresh"])));
    }

    #[test]
    fn test_flush_discards_everything() {
        let cache = PermissionCache::new();
        let t1 = cache.ticket(UserId(1));
        cache.store(UserId(1), t1, set(&["a"]));
        let t2 = cache.ticket(UserId(2));

        cache.flush();
        assert!(cache.get(UserId(1)).is_none());
        assert!(!cache.store(UserId(2), t2, set(&["b"])));
        assert!(cache.is_empty());
    }
}
