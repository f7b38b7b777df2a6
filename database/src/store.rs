use crate::errors::StoreResult;
use crate::types::{Column, ReadRequest, RowCells, RowKey, RowMutation};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Called by `bulk_write` before every block so the lock holder can confirm it
/// still owns the root(s) it is about to mutate under. Implemented by
/// `chunkedgraph-lock::LockManager` to close the loop described in spec §4.2:
/// Store never renews locks itself, it only asks.
pub trait LockRenewer: Send + Sync {
    fn renew(&self) -> bool;
}

/// A `Fn` over a row's current cells, used by [`Store::conditional_write`] to
/// decide which mutation branch applies. Returning `true` means "predicate
/// matched" (the mirror of HBase/Bigtable's `checkAndMutate`).
pub type Predicate<'a> = Box<dyn Fn(&RowCells) -> bool + 'a>;

#[derive(Clone)]
pub struct BulkWriteOptions {
    pub block_size: usize,
    pub renewer: Option<Arc<dyn LockRenewer>>,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for BulkWriteOptions {
    fn default() -> Self {
        Self { block_size: 2000, renewer: None, max_retries: 5, initial_backoff: Duration::from_millis(100) }
    }
}

/// Versioned, per-cell-timestamped wide-column store. One backend trait
/// implemented by both a durable (rocksdb-backed) and an in-memory store, so
/// every higher layer (`HierarchyReader`, `LockManager`, `EditEngine`, …) is
/// backend-agnostic, mirroring how the teacher's `CachedDbAccess` sits in
/// front of an opaque `DB`.
pub trait Store: Send + Sync {
    /// Reads matching rows, newest cell first per column, bounded by
    /// `[start_time, end_time]` inclusive on each end independently.
    fn read_rows(&self, request: ReadRequest) -> StoreResult<BTreeMap<RowKey, RowCells>>;

    /// Applies one block of mutations as a single atomic write. `bulk_write`
    /// is built from this; call directly only for writes known to fit in one
    /// block (e.g. a single log row).
    fn write_block(&self, mutations: &[RowMutation]) -> StoreResult<()>;

    /// Chunks `mutations` into blocks of at most `opts.block_size`, retrying each
    /// block with exponential back-off on transient backend errors, and
    /// re-checking `opts.renewer` (if set) before every block. Duplicate
    /// `(row, column)` pairs within one `bulk_write` call are not versioned —
    /// the caller must pre-merge, since the last write silently wins.
    fn bulk_write(&self, mutations: Vec<RowMutation>, opts: BulkWriteOptions) -> StoreResult<()> {
        for (i, block) in mutations.chunks(opts.block_size.max(1)).enumerate() {
            if let Some(renewer) = &opts.renewer {
                if !renewer.renew() {
                    return Err(crate::errors::StoreError::LockRenewalFailed(i));
                }
            }
            crate::retry::with_backoff(opts.max_retries, opts.initial_backoff, || self.write_block(block))?;
        }
        Ok(())
    }

    /// Atomically increments a single counter cell and returns its new value.
    fn atomic_increment(&self, row: RowKey, column: Column, delta: i64) -> StoreResult<i64>;

    /// Evaluates `predicate` against the row's current cells and applies
    /// `true_mutations` if it matched, `false_mutations` otherwise, atomically
    /// with the read. Returns the predicate's result.
    fn conditional_write(
        &self,
        row: RowKey,
        predicate: Predicate<'_>,
        true_mutations: Vec<RowMutation>,
        false_mutations: Vec<RowMutation>,
    ) -> StoreResult<bool>;
}
