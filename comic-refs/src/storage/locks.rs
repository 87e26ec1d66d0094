//! Per-path mutexes owned by a storage instance.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// One mutex per file path, created lazily.
///
/// The table itself sits behind a short-lived mutex that is only held while
/// looking up or inserting an entry, never during file I/O.
#[derive(Debug, Default)]
pub struct PathLocks {
    table: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the mutex guarding `path`.
    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(path.to_path_buf()).or_default())
    }

    /// Run `f` while holding the mutex for `path`.
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let lock = self.lock_for(path);
        // A panic mid-write leaves the file in whatever state the atomic
        // rename produced, so a poisoned guard is still usable.
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Number of paths that have been locked at least once.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_path_same_mutex() {
        let locks = PathLocks::new();
        let a = locks.lock_for(Path::new("/refs/characters/Hero.json"));
        let b = locks.lock_for(Path::new("/refs/characters/Hero.json"));
        let c = locks.lock_for(Path::new("/refs/characters/Villain.json"));

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_instances_do_not_share_locks() {
        let first = PathLocks::new();
        let second = PathLocks::new();
        let path = Path::new("/refs/characters/Hero.json");

        assert!(!Arc::ptr_eq(&first.lock_for(path), &second.lock_for(path)));
    }

    #[test]
    fn test_with_lock_serializes_same_path() {
        let locks = Arc::new(PathLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    locks.with_lock(Path::new("/same"), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(5));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
