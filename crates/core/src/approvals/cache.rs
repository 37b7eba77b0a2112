use std::collections::HashMap;

use crate::domain::approval::{ApproverRole, RoleId};
use crate::errors::ApplicationError;

/// Source of approver role details, usually backed by the role store.
pub trait RoleDirectory: Send + Sync {
    fn find_role(&self, id: &RoleId) -> Result<Option<ApproverRole>, ApplicationError>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryRoleDirectory {
    roles: HashMap<RoleId, ApproverRole>,
}

impl InMemoryRoleDirectory {
    pub fn new(roles: Vec<ApproverRole>) -> Self {
        Self { roles: roles.into_iter().map(|role| (role.id.clone(), role)).collect() }
    }
}

impl RoleDirectory for InMemoryRoleDirectory {
    fn find_role(&self, id: &RoleId) -> Result<Option<ApproverRole>, ApplicationError> {
        Ok(self.roles.get(id).cloned())
    }
}

/// Memoised role lookups, owned by whoever drives a batch of approval checks.
///
/// Misses are cached too. Call [`ApproverRoleCache::invalidate`] when the role
/// store changes.
#[derive(Clone, Debug, Default)]
pub struct ApproverRoleCache {
    entries: HashMap<RoleId, Option<ApproverRole>>,
}

impl ApproverRoleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(
        &mut self,
        id: &RoleId,
        directory: &dyn RoleDirectory,
    ) -> Result<Option<ApproverRole>, ApplicationError> {
        if let Some(cached) = self.entries.get(id) {
            return Ok(cached.clone());
        }

        let loaded = directory.find_role(id)?;
        self.entries.insert(id.clone(), loaded.clone());
        Ok(loaded)
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn invalidate_role(&mut self, id: &RoleId) {
        self.entries.remove(id);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
