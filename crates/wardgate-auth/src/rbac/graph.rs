//! Arena snapshot of the role hierarchy.
//!
//! Roles are copied into a vector and parent links become indices, so
//! walks never chase references and a corrupted (cyclic) store cannot
//! loop forever: every walk is bounded.

use std::collections::{HashMap, HashSet, VecDeque};

use wardgate_core::error::AppError;
use wardgate_core::result::AppResult;
use wardgate_core::types::RoleId;
use wardgate_entity::role::Role;

#[derive(Debug, Clone)]
struct Node {
    id: RoleId,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Immutable snapshot of every role and its parent link.
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    nodes: Vec<Node>,
    index: HashMap<RoleId, usize>,
}

impl RoleGraph {
    /// Build a snapshot from the full role list.
    pub fn from_roles(roles: &[Role]) -> Self {
        let index: HashMap<RoleId, usize> =
            roles.iter().enumerate().map(|(i, r)| (r.id, i)).collect();
        let mut nodes: Vec<Node> = roles
            .iter()
            .map(|r| Node {
                id: r.id,
                parent: r.parent_id.and_then(|p| index.get(&p).copied()),
                children: Vec::new(),
            })
            .collect();
        for i in 0..nodes.len() {
            if let Some(p) = nodes[i].parent {
                nodes[p].children.push(i);
            }
        }
        Self { nodes, index }
    }

    pub fn contains(&self, role: RoleId) -> bool {
        self.index.contains_key(&role)
    }

    pub fn parent(&self, role: RoleId) -> Option<RoleId> {
        let i = *self.index.get(&role)?;
        self.nodes[i].parent.map(|p| self.nodes[p].id)
    }

    /// `role` followed by its ancestors, nearest first, at most `limit`
    /// entries.
    pub fn lineage(&self, role: RoleId, limit: usize) -> Vec<RoleId> {
        let mut out = Vec::new();
        let mut cursor = self.index.get(&role).copied();
        while let Some(i) = cursor {
            if out.len() >= limit {
                break;
            }
            out.push(self.nodes[i].id);
            cursor = self.nodes[i].parent;
        }
        out
    }

    /// `role` and every role that inherits from it.
    pub fn descendants(&self, role: RoleId) -> Vec<RoleId> {
        let Some(&start) = self.index.get(&role) else {
            return vec![role];
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(i) = queue.pop_front() {
            out.push(self.nodes[i].id);
            for &c in &self.nodes[i].children {
                if seen.insert(c) {
                    queue.push_back(c);
                }
            }
        }
        out
    }

    /// Number of links on the longest chain below `role` (0 for a leaf).
    fn height(&self, start: usize, limit: usize) -> usize {
        let mut best = 0;
        let mut stack = vec![(start, 0usize)];
        while let Some((i, depth)) = stack.pop() {
            best = best.max(depth);
            if depth > limit {
                continue;
            }
            for &c in &self.nodes[i].children {
                stack.push((c, depth + 1));
            }
        }
        best
    }

    /// Check that making `parent` the parent of `role` keeps the graph a
    /// DAG whose chains have at most `max_depth` links.
    pub fn check_parent(&self, role: RoleId, parent: RoleId, max_depth: usize) -> AppResult<()> {
        if role == parent {
            return Err(AppError::validation("A role cannot be its own parent"));
        }
        let Some(&role_idx) = self.index.get(&role) else {
            return Err(AppError::not_found(format!("Role {role} not found")));
        };
        if !self.contains(parent) {
            return Err(AppError::not_found(format!("Role {parent} not found")));
        }

        let above = self.lineage(parent, max_depth + 1);
        if above.contains(&role) {
            return Err(AppError::conflict(format!(
                "Setting role {parent} as parent of role {role} would create a cycle"
            )));
        }

        // Links: the new one, those above the parent, and those below the role.
        let links = 1 + (above.len() - 1) + self.height(role_idx, max_depth + 1);
        if above.len() > max_depth || links > max_depth {
            return Err(AppError::validation(format!(
                "Role hierarchy would exceed the maximum depth of {max_depth}"
            )));
        }
        Ok(())
    }
}
