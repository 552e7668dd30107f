use crate::models::RestaurantId;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide cache of restaurant rating profiles (mean overall,
/// environment, flavor, service).
///
/// Entries are valid for exactly one store `data_version`; the first
/// lookup after any rating mutation clears the stale generation. Purely
/// an optimization: hit or miss, rankings are identical.
#[derive(Default)]
pub struct ProfileCache {
    version: AtomicU64,
    profiles: DashMap<RestaurantId, [f64; 4]>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, version: u64, id: RestaurantId) -> Option<[f64; 4]> {
        self.sync_version(version);
        self.profiles.get(&id).map(|entry| *entry)
    }

    pub fn insert(&self, version: u64, id: RestaurantId, profile: [f64; 4]) {
        self.sync_version(version);
        // A concurrent writer may have moved the version on; dropping the
        // insert is correct, caching it under the wrong version is not.
        if self.version.load(Ordering::Acquire) == version {
            self.profiles.insert(id, profile);
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn sync_version(&self, version: u64) {
        let current = self.version.load(Ordering::Acquire);
        if current != version
            && self
                .version
                .compare_exchange(current, version, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.profiles.clear();
        }
    }
}
