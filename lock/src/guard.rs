use crate::errors::{LockError, LockResult};
use crate::manager::LockManager;
use chunkedgraph_ids::{Meta, NodeId};
use chunkedgraph_database::prelude::Store;
use log::warn;

/// RAII mirror of `locks.py`'s `RootLock`: acquires a time-bounded lock on
/// every root in `future_root_ids` (or just `root_ids` pre-resolution) for
/// the duration of an edit, releasing on drop.
pub struct RootLock<'a> {
    manager: LockManager<'a>,
    operation_id: u64,
    held: Vec<NodeId>,
}

impl<'a> RootLock<'a> {
    pub fn acquire(store: &'a dyn Store, meta: &'a Meta, roots: &[NodeId], operation_id: u64, max_tries: u32) -> LockResult<Self> {
        let manager = LockManager::new(store, meta);
        let held = manager.lock_roots(roots, operation_id, max_tries)?;
        Ok(Self { manager, operation_id, held })
    }

    pub fn held_roots(&self) -> &[NodeId] {
        &self.held
    }
}

impl<'a> Drop for RootLock<'a> {
    fn drop(&mut self) {
        for &root in &self.held {
            if let Err(err) = self.manager.unlock(root, self.operation_id) {
                warn!("failed to release lock on root {root}: {err}");
            }
        }
    }
}

/// RAII mirror of `locks.py`'s `IndefiniteRootLock`: renews the caller's
/// time-bounded lock first (failing loudly if that lock has already lapsed),
/// then takes the indefinite marker used during the write phase of an edit,
/// releasing it on drop.
pub struct IndefiniteRootLock<'a> {
    manager: LockManager<'a>,
    operation_id: u64,
    held: Vec<NodeId>,
}

impl<'a> IndefiniteRootLock<'a> {
    pub fn acquire(store: &'a dyn Store, meta: &'a Meta, roots: &[NodeId], operation_id: u64) -> LockResult<Self> {
        let manager = LockManager::new(store, meta);
        for &root in roots {
            if !manager.renew(root, operation_id)? {
                return Err(LockError::RenewFailed(root));
            }
        }

        let mut held = Vec::with_capacity(roots.len());
        for &root in roots {
            match manager.lock_indefinite(root, operation_id) {
                Ok(true) => held.push(root),
                Ok(false) | Err(_) => {
                    for already in &held {
                        let _ = manager.unlock_indefinite(*already, operation_id);
                    }
                    return Err(LockError::IndefiniteLockHeld(root));
                }
            }
        }
        Ok(Self { manager, operation_id, held })
    }
}

impl<'a> Drop for IndefiniteRootLock<'a> {
    fn drop(&mut self) {
        for &root in &self.held {
            if let Err(err) = self.manager.unlock_indefinite(root, self.operation_id) {
                warn!("failed to release indefinite lock on root {root}: {err}");
            }
        }
    }
}
