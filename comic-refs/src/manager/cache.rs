//! Bounded, time-limited cache of loaded references.

use crate::model::{Reference, ReferenceType};
use crate::storage::sanitize_filename;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

type CacheKey = (ReferenceType, String);

/// Keys use the same name resolution as storage, so every spelling that
/// reaches one metadata file shares one entry.
fn cache_key(ref_type: ReferenceType, name: &str) -> CacheKey {
    (ref_type, sanitize_filename(name))
}

#[derive(Debug)]
struct CacheEntry {
    reference: Arc<Reference>,
    last_accessed: Instant,
    /// Insertion counts as the first access.
    access_count: u64,
}

/// Least-recently-used cache keyed by `(type, sanitized name)`.
///
/// An entry expires once it has gone `ttl` without being read. Expiry is
/// only checked when the entry is looked up; nothing sweeps in the
/// background. Storage stays authoritative: writers invalidate entries
/// rather than updating them in place.
#[derive(Debug)]
pub struct ReferenceCache {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ReferenceCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return a fresh entry and record the access. Stale entries are dropped.
    pub fn get(&self, ref_type: ReferenceType, name: &str) -> Option<Arc<Reference>> {
        let key = cache_key(ref_type, name);
        let mut entries = self.entries();
        let now = Instant::now();

        let entry = entries.get_mut(&key)?;
        if now.duration_since(entry.last_accessed) < self.ttl {
            entry.last_accessed = now;
            entry.access_count += 1;
            debug!(%ref_type, name, "Cache hit");
            return Some(Arc::clone(&entry.reference));
        }

        entries.remove(&key);
        debug!(%ref_type, name, "Cache entry expired");
        None
    }

    /// Cache `reference`, evicting the least recently used entry if a new
    /// key would exceed capacity.
    pub fn insert(&self, reference: Arc<Reference>) {
        if self.capacity == 0 {
            return;
        }

        let key = cache_key(reference.ref_type(), reference.name());
        let mut entries = self.entries();

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!(ref_type = %oldest.0, name = %oldest.1, "Evicted cache entry");
            }
        }

        entries.insert(
            key,
            CacheEntry {
                reference,
                last_accessed: Instant::now(),
                access_count: 1,
            },
        );
    }

    /// Drop the entry for `(ref_type, name)`. Returns whether one existed.
    pub fn invalidate(&self, ref_type: ReferenceType, name: &str) -> bool {
        self.entries()
            .remove(&cache_key(ref_type, name))
            .is_some()
    }

    pub fn contains(&self, ref_type: ReferenceType, name: &str) -> bool {
        self.entries().contains_key(&cache_key(ref_type, name))
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fraction of accesses to live entries that were hits.
    ///
    /// Each entry's first access (its insertion) counts as a miss.
    pub fn hit_rate(&self) -> f64 {
        let entries = self.entries();
        let total: u64 = entries.values().map(|e| e.access_count).sum();
        if total == 0 {
            return 0.0;
        }
        let hits: u64 = entries.values().map(|e| e.access_count - 1).sum();
        hits as f64 / total as f64
    }
}
