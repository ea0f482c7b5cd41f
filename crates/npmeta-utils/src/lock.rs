//! Per-package locking for read-modify-write of package documents.
//!
//! [`PackageLocks`] hands out one async mutex per package name. The map that
//! owns those mutexes has its own guard, which is only held while looking up
//! or creating an entry, so waiting on `foo` never blocks a caller that wants
//! `bar`.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

use crate::{
    error::{LockError, LockResult},
    time::Deadline,
};

/// Registry of per-package locks, created on demand.
///
/// Locks are never evicted: the registry grows with the number of distinct
/// package names seen during the process lifetime.
#[derive(Default)]
pub struct PackageLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Exclusive hold on one package name.
///
/// The lock is released when `PackageLock` is dropped.
#[derive(Debug)]
pub struct PackageLock {
    name: String,
    _guard: OwnedMutexGuard<()>,
}

impl PackageLock {
    /// Name of the package this lock covers.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PackageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the lock for `name`, inserting a fresh one if absent.
    ///
    /// The map guard cannot be left inconsistent by a panicking holder, so a
    /// poisoned guard is recovered rather than propagated.
    fn lock_for(&self, name: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(lock) = locks.get(name) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(AsyncMutex::new(()));
        locks.insert(name.to_string(), Arc::clone(&lock));
        lock
    }

    /// Acquire the lock for `name`, waiting as long as it takes.
    pub async fn acquire(&self, name: &str) -> PackageLock {
        let guard = self.lock_for(name).lock_owned().await;
        trace!(package = name, "acquired package lock");
        PackageLock {
            name: name.to_string(),
            _guard: guard,
        }
    }

    /// Acquire the lock for `name`, giving up once `deadline` passes.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Timeout`] if the lock could not be taken in time.
    pub async fn acquire_until(&self, name: &str, deadline: Deadline) -> LockResult<PackageLock> {
        deadline
            .run(self.acquire(name))
            .await
            .map_err(|_| {
                LockError::Timeout {
                    name: name.to_string(),
                }
            })
    }

    /// Try to acquire the lock for `name` without waiting.
    ///
    /// Returns `None` if another caller currently holds it.
    pub fn try_acquire(&self, name: &str) -> Option<PackageLock> {
        let guard = self.lock_for(name).try_lock_owned().ok()?;
        Some(PackageLock {
            name: name.to_string(),
            _guard: guard,
        })
    }

    /// Number of package names that have a lock registered.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_same_name_shares_lock() {
        let locks = PackageLocks::new();
        let a = locks.lock_for("foo");
        let b = locks.lock_for("foo");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_different_names_get_different_locks() {
        let locks = PackageLocks::new();
        let a = locks.lock_for("foo");
        let b = locks.lock_for("bar");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_concurrent_first_use_converges() {
        let locks = Arc::new(PackageLocks::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let locks = Arc::clone(&locks);
                std::thread::spawn(move || locks.lock_for("contended"))
            })
            .collect();

        let seen: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(seen.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn test_exclusive_lock() {
        let locks = PackageLocks::new();
        let held = locks.acquire("foo").await;
        assert_eq!(held.name(), "foo");

        assert!(locks.try_acquire("foo").is_none());

        drop(held);

        assert!(locks.try_acquire("foo").is_some());
    }

    #[tokio::test]
    async fn test_other_packages_not_blocked() {
        let locks = PackageLocks::new();
        let _foo = locks.acquire("foo").await;
        let bar = locks.try_acquire("bar");
        assert!(bar.is_some());
    }

    #[tokio::test]
    async fn test_acquire_until_times_out() {
        let locks = PackageLocks::new();
        let _held = locks.acquire("foo").await;

        let result = locks
            .acquire_until("foo", Deadline::after(Duration::from_millis(30)))
            .await;
        assert_eq!(
            result.unwrap_err(),
            LockError::Timeout {
                name: "foo".to_string()
            }
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lock_blocks_until_released() {
        let locks = Arc::new(PackageLocks::new());
        let held = locks.acquire("foo").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let lock = locks.acquire("foo").await;
                lock.name().to_string()
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(held);

        assert_eq!(waiter.await.unwrap(), "foo");
    }
}
