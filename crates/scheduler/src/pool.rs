//! FIFO pool of managers waiting for work.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use thiserror::Error;

use chatdesk_core::UserId;

const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    /// The pool is empty. Expected; callers defer and retry later.
    #[error("no available managers")]
    NoAvailableManagers,

    /// The bounded pool is full. Configuration error, not a runtime path.
    #[error("manager pool is full")]
    PoolFull,
}

#[derive(Debug, Default)]
struct PoolInner {
    order: VecDeque<UserId>,
    members: HashSet<UserId>,
}

/// Admission-ordered set of available managers.
///
/// The longest-waiting member leaves first. All operations take the single
/// mutex briefly and do no I/O under it; concurrent callers (HTTP-side
/// use-cases and the scheduler) are safe.
#[derive(Debug)]
pub struct ManagerPool {
    inner: Mutex<PoolInner>,
    capacity: usize,
}

impl ManagerPool {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(PoolInner::default()),
            capacity,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PoolInner> {
        self.inner.lock().expect("pool mutex poisoned")
    }

    /// Admit a manager at the tail. Re-admitting a present member is a no-op.
    pub fn put(&self, manager_id: UserId) -> Result<(), PoolError> {
        let mut inner = self.lock();
        if inner.members.contains(&manager_id) {
            return Ok(());
        }
        if inner.members.len() >= self.capacity {
            return Err(PoolError::PoolFull);
        }

        inner.members.insert(manager_id);
        inner.order.push_back(manager_id);
        Ok(())
    }

    /// Remove and return the longest-waiting manager.
    pub fn get(&self) -> Result<UserId, PoolError> {
        let mut inner = self.lock();
        let manager_id = inner
            .order
            .pop_front()
            .ok_or(PoolError::NoAvailableManagers)?;
        inner.members.remove(&manager_id);
        Ok(manager_id)
    }

    pub fn contains(&self, manager_id: UserId) -> bool {
        self.lock().members.contains(&manager_id)
    }

    pub fn len(&self) -> usize {
        self.lock().members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ManagerPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn get_returns_members_in_admission_order() {
        let pool = ManagerPool::new();
        let first = UserId::new();
        let second = UserId::new();

        pool.put(first).unwrap();
        pool.put(second).unwrap();

        assert_eq!(pool.get().unwrap(), first);
        assert_eq!(pool.get().unwrap(), second);
        assert_eq!(pool.get(), Err(PoolError::NoAvailableManagers));
    }

    #[test]
    fn put_is_idempotent() {
        let pool = ManagerPool::new();
        let manager = UserId::new();

        pool.put(manager).unwrap();
        pool.put(manager).unwrap();

        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get().unwrap(), manager);
        assert!(pool.is_empty());
    }

    #[test]
    fn contains_does_not_mutate() {
        let pool = ManagerPool::new();
        let manager = UserId::new();

        assert!(!pool.contains(manager));
        pool.put(manager).unwrap();
        assert!(pool.contains(manager));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn get_removes_membership() {
        let pool = ManagerPool::new();
        let manager = UserId::new();

        pool.put(manager).unwrap();
        pool.get().unwrap();
        assert!(!pool.contains(manager));
    }

    #[test]
    fn capacity_guards_new_members_only() {
        let pool = ManagerPool::with_capacity(1);
        let resident = UserId::new();

        pool.put(resident).unwrap();
        assert_eq!(pool.put(UserId::new()), Err(PoolError::PoolFull));
        // Idempotent re-put of the resident is still fine.
        pool.put(resident).unwrap();
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn concurrent_access_is_safe() {
        use std::sync::Arc;

        let pool = Arc::new(ManagerPool::new());
        let mut handles = Vec::new();

        for _ in 0..8 {
            let pool = pool.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    let id = UserId::new();
                    pool.put(id).unwrap();
                    let _ = pool.contains(id);
                    let _ = pool.get();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        assert!(pool.len() <= 800);
    }

    proptest! {
        /// Any interleaving of puts (including duplicates) and gets preserves
        /// first-admission FIFO order and set semantics.
        #[test]
        fn pool_behaves_like_a_fifo_set(ops in prop::collection::vec((any::<bool>(), 0usize..8), 1..200)) {
            let ids: Vec<UserId> = (0..8).map(|_| UserId::new()).collect();
            let pool = ManagerPool::new();

            let mut model_order: VecDeque<UserId> = VecDeque::new();
            let mut model_members: HashSet<UserId> = HashSet::new();

            for (is_put, idx) in ops {
                if is_put {
                    let id = ids[idx];
                    pool.put(id).unwrap();
                    if model_members.insert(id) {
                        model_order.push_back(id);
                    }
                } else {
                    let expected = model_order.pop_front();
                    if let Some(id) = &expected {
                        model_members.remove(id);
                    }
                    match expected {
                        Some(id) => prop_assert_eq!(pool.get().unwrap(), id),
                        None => prop_assert_eq!(pool.get(), Err(PoolError::NoAvailableManagers)),
                    }
                }
                prop_assert_eq!(pool.len(), model_members.len());
            }
        }
    }
}
