pub mod errors;
pub mod guard;
pub mod manager;

pub use errors::{LockError, LockResult};
pub use guard::{IndefiniteRootLock, RootLock};
pub use manager::{LockManager, RootSetRenewer};

#[cfg(test)]
mod tests {
    use super::*;
    use chunkedgraph_database::prelude::MemoryStore;
    use chunkedgraph_ids::{Meta, NodeId};
    use std::time::Duration;

    fn meta() -> Meta {
        Meta::default_example()
    }

    #[test]
    fn second_lock_attempt_fails_while_first_is_fresh() {
        let store = MemoryStore::new();
        let meta = meta();
        let manager = LockManager::new(&store, &meta);
        let root = NodeId::new(1);

        assert!(manager.lock_single(root, 1).unwrap());
        assert!(!manager.lock_single(root, 2).unwrap());
    }

    #[test]
    fn unlock_then_relock_succeeds() {
        let store = MemoryStore::new();
        let meta = meta();
        let manager = LockManager::new(&store, &meta);
        let root = NodeId::new(1);

        assert!(manager.lock_single(root, 1).unwrap());
        assert!(manager.unlock(root, 1).unwrap());
        assert!(manager.lock_single(root, 2).unwrap());
    }

    #[test]
    fn renew_requires_matching_operation_id() {
        let store = MemoryStore::new();
        let meta = meta();
        let manager = LockManager::new(&store, &meta);
        let root = NodeId::new(1);

        assert!(manager.lock_single(root, 1).unwrap());
        assert!(manager.renew(root, 1).unwrap());
        assert!(!manager.renew(root, 2).unwrap());
    }

    #[test]
    fn root_lock_guard_releases_on_drop() {
        let store = MemoryStore::new();
        let meta = meta();
        let root = NodeId::new(1);

        {
            let _guard = RootLock::acquire(&store, &meta, &[root], 1, 1).unwrap();
            let manager = LockManager::new(&store, &meta);
            assert!(!manager.lock_single(root, 2).unwrap());
        }

        let manager = LockManager::new(&store, &meta);
        assert!(manager.lock_single(root, 2).unwrap());
    }

    #[test]
    fn indefinite_lock_requires_a_fresh_temporal_lock_first() {
        let store = MemoryStore::new();
        let meta = meta();
        let root = NodeId::new(1);

        let manager = LockManager::new(&store, &meta);
        assert!(manager.lock_single(root, 1).unwrap());
        let guard = IndefiniteRootLock::acquire(&store, &meta, &[root], 1);
        assert!(guard.is_ok());
    }

    #[test]
    fn lock_expires_after_configured_duration() {
        // Exercises the expiry-window predicate with a near-zero lock_expiry
        // so a "fresh" lock immediately reads as stale.
        let store = MemoryStore::new();
        let meta = Meta::new(2, 4, 10, [512, 512, 128], 0, Duration::from_nanos(1), false, false).unwrap();
        let manager = LockManager::new(&store, &meta);
        let root = NodeId::new(1);

        assert!(manager.lock_single(root, 1).unwrap());
        std::thread::sleep(Duration::from_millis(5));
        assert!(manager.lock_single(root, 2).unwrap());
    }
}
