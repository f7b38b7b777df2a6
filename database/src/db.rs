use rocksdb::{ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::types::Family;

/// The four column families backing [`crate::rocks::RocksStore`], one per
/// [`Family`] named in spec §3.
pub const FAMILY_NAMES: [&str; 4] = ["data", "counters", "log", "cross_edges"];

pub fn family_name(family: Family) -> &'static str {
    FAMILY_NAMES[family as usize]
}

/// Thin wrapper around a multi-threaded rocksdb handle, grounded in the
/// teacher's `database::DB` (a `Deref<Target = DBWithThreadMode<MultiThreaded>>`
/// newtype): callers use rocksdb's own API directly through `Deref`.
pub struct Db {
    inner: DBWithThreadMode<MultiThreaded>,
}

impl Deref for Db {
    type Target = DBWithThreadMode<MultiThreaded>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Builder for opening a [`Db`], mirroring the shape of the teacher's
/// `ConnBuilder` without its const-generic typestate machinery: this store
/// only ever opens one on-disk location per graph.
pub struct ConnBuilder {
    create_if_missing: bool,
    parallelism: i32,
    mem_budget_bytes: usize,
}

impl Default for ConnBuilder {
    fn default() -> Self {
        Self { create_if_missing: true, parallelism: 1, mem_budget_bytes: 64 * 1024 * 1024 }
    }
}

impl ConnBuilder {
    pub fn with_create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    pub fn with_parallelism(mut self, parallelism: i32) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_mem_budget(mut self, mem_budget_bytes: usize) -> Self {
        self.mem_budget_bytes = mem_budget_bytes;
        self
    }

    pub fn build(self, path: impl AsRef<Path>) -> Result<Arc<Db>, rocksdb::Error> {
        let mut options = Options::default();
        options.create_if_missing(self.create_if_missing);
        options.create_missing_column_families(true);
        options.increase_parallelism(self.parallelism);
        options.optimize_level_style_compaction(self.mem_budget_bytes);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> =
            FAMILY_NAMES.iter().map(|name| ColumnFamilyDescriptor::new(*name, Options::default())).collect();

        let inner = DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(&options, path.as_ref(), cf_descriptors)?;
        Ok(Arc::new(Db { inner }))
    }
}

/// Deletes an on-disk database directory if it exists.
pub fn delete_db(path: PathBuf) {
    if !path.exists() {
        return;
    }
    let _ = DBWithThreadMode::<MultiThreaded>::destroy(&Options::default(), &path);
}
