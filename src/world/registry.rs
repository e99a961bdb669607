/*!
 * Group Registry
 * Per-process directory resolving group ids carried in messages
 */

use super::traits::World;
use crate::core::types::GroupId;
use ahash::RandomState;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Groups the local process is a member of
///
/// Holds weak handles so a dropped group disappears from resolution.
pub struct GroupRegistry {
    groups: DashMap<GroupId, Weak<dyn World>, RandomState>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self {
            groups: DashMap::with_hasher(RandomState::new()),
        }
    }

    /// Make `group` resolvable by its id, replacing any previous entry
    pub fn register(&self, group: &Arc<dyn World>) {
        let id = group.id();
        self.groups.insert(id, Arc::downgrade(group));
        debug!(group = id, rank = group.rank(), "Registered process group");
    }

    pub fn unregister(&self, id: GroupId) -> bool {
        self.groups.remove(&id).is_some()
    }

    /// Live handle for `id`, pruning the entry if the group was dropped
    pub fn resolve(&self, id: GroupId) -> Option<Arc<dyn World>> {
        let group = self.groups.get(&id)?.upgrade();
        if group.is_none() {
            self.groups.remove(&id);
        }
        group
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new()
    }
}
