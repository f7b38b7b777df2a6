use crate::errors::{LockError, LockResult};
use chunkedgraph_database::prelude::{LockRenewer, ReadRequest, RowMutation, Store};
use chunkedgraph_hierarchy::Lineage;
use chunkedgraph_ids::{Meta, NodeId};
use chunkedgraph_model::{codec, schema::node};
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn now_micros() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_micros() as i64
}

/// C7: time-bounded and indefinite root locks via conditional row writes
/// (§4.5), grounded in `locks.py`'s `RootLock`/`IndefiniteRootLock` and the
/// Bigtable `ConditionalRowFilter` these wrap: a root may not be (re)locked
/// while a *fresh* lock is held by someone else, or while it has already
/// been superseded by a `NewParent`.
pub struct LockManager<'a> {
    store: &'a dyn Store,
    meta: &'a Meta,
}

impl<'a> LockManager<'a> {
    pub fn new(store: &'a dyn Store, meta: &'a Meta) -> Self {
        Self { store, meta }
    }

    /// Acquires the lock on exactly one root, deterministically.
    pub fn lock_single(&self, root: NodeId, operation_id: u64) -> LockResult<bool> {
        let expiry_cutoff = now_micros() - self.meta.lock_expiry().as_micros() as i64;
        let row_key = node::row_key(root);

        let predicate = Box::new(move |cells: &chunkedgraph_database::prelude::RowCells| {
            // A released lock still leaves its newest generation behind (this
            // `Store` contract has no versioned delete), so "fresh" also requires
            // a non-empty value — an empty cell is `unlock`'s release sentinel,
            // not a held lock, however recent its timestamp.
            let fresh_lock = cells
                .get(&node::lock())
                .and_then(|gens| gens.first())
                .map_or(false, |cell| !cell.value.is_empty() && cell.timestamp >= expiry_cutoff);
            let superseded = cells.get(&node::new_parent()).map_or(false, |gens| !gens.is_empty());
            !(fresh_lock || superseded)
        });

        let operation_id_bytes = codec::encode(&operation_id).map_err(|e| LockError::Encoding(e.to_string()))?;
        let true_mutations = vec![RowMutation::new(row_key.clone()).set(node::lock(), operation_id_bytes).at(now_micros())];

        let acquired = self.store.conditional_write(row_key, predicate, true_mutations, Vec::new())?;
        Ok(acquired)
    }

    /// Releases a single root's lock if `operation_id` still holds it and it
    /// has not expired. Idempotent: unlocking an already-released root is a
    /// harmless no-op.
    pub fn unlock(&self, root: NodeId, operation_id: u64) -> LockResult<bool> {
        let expiry_cutoff = now_micros() - self.meta.lock_expiry().as_micros() as i64;
        let row_key = node::row_key(root);
        let expected = codec::encode(&operation_id).map_err(|e| LockError::Encoding(e.to_string()))?;

        let predicate = Box::new(move |cells: &chunkedgraph_database::prelude::RowCells| {
            cells
                .get(&node::lock())
                .and_then(|gens| gens.first())
                .map_or(false, |cell| cell.timestamp >= expiry_cutoff && cell.value == expected)
        });

        // There is no versioned "delete" in this Store contract; releasing
        // writes an empty-valued sentinel cell at the current timestamp so it
        // becomes the newest generation (`gens.first()`) and `lock_single`'s
        // fresh-lock check — which is value-aware, see above — reads it as no
        // fresh lock held. `false_mutations` are empty: an already-expired or
        // foreign lock is left untouched.
        let released_marker = vec![RowMutation::new(row_key.clone()).set(node::lock(), Vec::new()).at(now_micros())];
        Ok(self.store.conditional_write(row_key, predicate, released_marker, Vec::new())?)
    }

    /// Renews the lock, resetting its timestamp, iff `operation_id` still
    /// holds it within the expiry window. Checked before every `bulk_write`
    /// block (§4.2).
    pub fn renew(&self, root: NodeId, operation_id: u64) -> LockResult<bool> {
        let expiry_cutoff = now_micros() - self.meta.lock_expiry().as_micros() as i64;
        let row_key = node::row_key(root);
        let expected = codec::encode(&operation_id).map_err(|e| LockError::Encoding(e.to_string()))?;
        let expected_for_predicate = expected.clone();

        let predicate = Box::new(move |cells: &chunkedgraph_database::prelude::RowCells| {
            cells
                .get(&node::lock())
                .and_then(|gens| gens.first())
                .map_or(false, |cell| cell.timestamp >= expiry_cutoff && cell.value == expected_for_predicate)
        });

        let renewed = vec![RowMutation::new(row_key.clone()).set(node::lock(), expected).at(now_micros())];
        Ok(self.store.conditional_write(row_key, predicate, renewed, Vec::new())?)
    }

    /// `lock_roots`: resolves each requested root to its latest (§4.4 via
    /// `Lineage`), attempts `lock_single` on the deduped latest set, rolling
    /// back and retrying on any failure up to `max_tries` with a 0.5s
    /// back-off (§4.5, §8 S6).
    pub fn lock_roots(&self, roots: &[NodeId], operation_id: u64, max_tries: u32) -> LockResult<Vec<NodeId>> {
        let lineage = Lineage::new(self.store);
        let mut latest: Vec<NodeId> = Vec::new();
        for &root in roots {
            let found = lineage.latest(root).map_err(|_| LockError::AcquireFailed(root))?;
            if found.is_empty() {
                latest.push(root);
            } else {
                latest.extend(found);
            }
        }
        latest.sort_by_key(|id| id.raw());
        latest.dedup();

        for attempt in 0..max_tries {
            let mut locked = Vec::new();
            let mut failed = false;
            for &root in &latest {
                if self.lock_single(root, operation_id)? {
                    locked.push(root);
                } else {
                    failed = true;
                    break;
                }
            }
            if !failed {
                return Ok(locked);
            }
            for root in locked {
                let _ = self.unlock(root, operation_id);
            }
            if attempt + 1 < max_tries {
                sleep(Duration::from_millis(500));
            }
        }
        Err(LockError::AcquireManyFailed(latest))
    }

    /// Re-takes the lock with no time-expiry predicate, conditioned on no
    /// existing indefinite marker, for the write phase of an edit (§4.5).
    pub fn lock_indefinite(&self, root: NodeId, operation_id: u64) -> LockResult<bool> {
        let row_key = node::row_key(root);
        let predicate = Box::new(|cells: &chunkedgraph_database::prelude::RowCells| {
            cells.get(&node::indefinite_lock()).map_or(true, |gens| gens.is_empty())
        });
        let operation_id_bytes = codec::encode(&operation_id).map_err(|e| LockError::Encoding(e.to_string()))?;
        let true_mutations = vec![RowMutation::new(row_key.clone()).set(node::indefinite_lock(), operation_id_bytes).at(now_micros())];
        let acquired = self.store.conditional_write(row_key, predicate, true_mutations, Vec::new())?;
        if !acquired {
            return Err(LockError::IndefiniteLockHeld(root));
        }
        Ok(true)
    }

    pub fn unlock_indefinite(&self, root: NodeId, operation_id: u64) -> LockResult<bool> {
        let row_key = node::row_key(root);
        let expected = codec::encode(&operation_id).map_err(|e| LockError::Encoding(e.to_string()))?;
        let predicate = Box::new(move |cells: &chunkedgraph_database::prelude::RowCells| {
            cells.get(&node::indefinite_lock()).and_then(|gens| gens.first()).map_or(false, |cell| cell.value == expected)
        });
        let cleared = vec![RowMutation::new(row_key.clone()).set(node::indefinite_lock(), Vec::new()).at(0)];
        Ok(self.store.conditional_write(row_key, predicate, cleared, Vec::new())?)
    }
}

/// Adapts a [`LockManager`]'s renewal of a fixed root set into the
/// [`LockRenewer`] trait `Store::bulk_write` consults before every block,
/// closing the loop without `database` depending on `lock`.
pub struct RootSetRenewer<'a> {
    pub manager: LockManager<'a>,
    pub roots: Vec<NodeId>,
    pub operation_id: u64,
}

impl<'a> LockRenewer for RootSetRenewer<'a> {
    fn renew(&self) -> bool {
        self.roots.iter().all(|&root| self.manager.renew(root, self.operation_id).unwrap_or(false))
    }
}
