//! Process-lifetime plan cache. Keys are bounded by the set of distinct
//! (type, config, phase) triples actually used, so there is no eviction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::BuildError;

use super::{Node, Phase};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlanKey {
    pub type_sig: String,
    pub config_sig: String,
    pub phase: Phase,
}

/// Synchronized plan store. Concurrent builds of the same key may race; the
/// built trees are referentially equivalent, so the last writer wins and
/// either result is safe to use.
#[derive(Default)]
pub struct PlanCache {
    entries: Mutex<HashMap<PlanKey, Arc<Node>>>,
}

impl PlanCache {
    pub fn new() -> Self {
        PlanCache::default()
    }

    pub fn get(&self, key: &PlanKey) -> Option<Arc<Node>> {
        self.entries
            .lock()
            .expect("plan cache poisoned")
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: PlanKey, node: Arc<Node>) {
        self.entries
            .lock()
            .expect("plan cache poisoned")
            .insert(key, node);
    }

    /// Look up `key`, building and storing the plan on a miss. The lock is
    /// not held across the build.
    pub fn get_or_build(
        &self,
        key: PlanKey,
        build: impl FnOnce() -> Result<Node, BuildError>,
    ) -> Result<Arc<Node>, BuildError> {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let node = Arc::new(build()?);
        self.insert(key, node.clone());
        Ok(node)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("plan cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
