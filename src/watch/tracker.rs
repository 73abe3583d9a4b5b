use std::time::SystemTime;

use rustc_hash::FxHashMap;

use crate::host::ResourceStore;

/// Last-seen modification times of watched code units.
///
/// `None` means the baseline is not known yet (resource missing when the unit
/// was first observed). Such a unit is never reported as changed: the first
/// time it is seen only establishes the baseline.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    units: FxHashMap<String, Option<SystemTime>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or refresh a unit's baseline without flagging a change.
    pub fn observe(&mut self, store: &dyn ResourceStore, name: &str) {
        let stamp = if store.exists(name) {
            store.modified(name)
        } else {
            None
        };
        crate::debug!("watch"; "baseline {}: {:?}", name, stamp);
        self.units.insert(name.to_owned(), stamp);
    }

    /// Units whose modification time moved forward since the last poll.
    ///
    /// Missing resources are skipped. Output is sorted by name.
    pub fn poll(&mut self, store: &dyn ResourceStore) -> Vec<String> {
        let mut changed = Vec::new();

        for (name, last_seen) in &mut self.units {
            if !store.exists(name) {
                continue;
            }
            let Some(current) = store.modified(name) else {
                continue;
            };

            match *last_seen {
                None => *last_seen = Some(current),
                Some(previous) if current > previous => {
                    *last_seen = Some(current);
                    changed.push(name.clone());
                }
                Some(_) => {}
            }
        }

        changed.sort_unstable();
        changed
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.units.contains_key(name)
    }

    pub fn last_seen(&self, name: &str) -> Option<SystemTime> {
        self.units.get(name).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
