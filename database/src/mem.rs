use crate::errors::StoreResult;
use crate::store::{Predicate, Store};
use crate::types::{Cell, Column, ReadRequest, RowCells, RowKey, RowMutation, RowSelector, Timestamp};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_micros() -> Timestamp {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_micros() as Timestamp
}

/// An in-memory [`Store`] used by tests across every crate in the workspace,
/// grounded in the teacher's pattern of handing tests a disposable store
/// instance rather than mocking the trait. A single coarse lock favors
/// straightforward correctness over contention; this backend is never used
/// for production-sized graphs.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<RowKey, RowCells>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_locked(rows: &mut BTreeMap<RowKey, RowCells>, mutation: &RowMutation) {
        let row_key = mutation.row.clone().expect("RowMutation::row must be set before writing");
        let ts = mutation.timestamp.unwrap_or_else(now_micros);
        let row = rows.entry(row_key).or_default();
        for (column, value) in &mutation.sets {
            let generations = row.entry(column.clone()).or_default();
            generations.insert(0, Cell { timestamp: ts, value: value.clone() });
            generations.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        }
    }
}

impl Store for MemoryStore {
    fn read_rows(&self, request: ReadRequest) -> StoreResult<BTreeMap<RowKey, RowCells>> {
        let rows = self.rows.lock();
        let keys: Vec<RowKey> = match &request.rows {
            RowSelector::Keys(keys) => keys.clone(),
            RowSelector::Range { start, end, end_inclusive } => {
                let mut out = Vec::new();
                for (key, _) in rows.range(start.clone()..) {
                    if let Some(end) = end {
                        if key > end || (key == end && !end_inclusive) {
                            break;
                        }
                    }
                    out.push(key.clone());
                }
                out
            }
        };

        let mut out = BTreeMap::new();
        for key in keys {
            let Some(row) = rows.get(&key) else { continue };
            let mut filtered = RowCells::new();
            for (column, generations) in row {
                if let Some(cols) = &request.columns {
                    if !cols.contains(column) {
                        continue;
                    }
                }
                let kept: Vec<Cell> = generations
                    .iter()
                    .filter(|c| {
                        request.start_time.map_or(true, |t| c.timestamp >= t) && request.end_time.map_or(true, |t| c.timestamp <= t)
                    })
                    .cloned()
                    .collect();
                if !kept.is_empty() {
                    filtered.insert(column.clone(), kept);
                }
            }
            if !filtered.is_empty() {
                out.insert(key, filtered);
            }
        }
        Ok(out)
    }

    fn write_block(&self, mutations: &[RowMutation]) -> StoreResult<()> {
        let mut rows = self.rows.lock();
        for mutation in mutations {
            Self::apply_locked(&mut rows, mutation);
        }
        Ok(())
    }

    fn atomic_increment(&self, row: RowKey, column: Column, delta: i64) -> StoreResult<i64> {
        let mut rows = self.rows.lock();
        let generations = rows.entry(row).or_default().entry(column).or_default();
        let current = generations.first().map(|c| i64::from_le_bytes(c.value.clone().try_into().unwrap())).unwrap_or(0);
        let next = current + delta;
        let ts = now_micros();
        generations.clear();
        generations.push(Cell { timestamp: ts, value: next.to_le_bytes().to_vec() });
        Ok(next)
    }

    fn conditional_write(
        &self,
        row: RowKey,
        predicate: Predicate<'_>,
        true_mutations: Vec<RowMutation>,
        false_mutations: Vec<RowMutation>,
    ) -> StoreResult<bool> {
        let mut rows = self.rows.lock();
        let matched = rows.get(&row).map(&predicate).unwrap_or_else(|| predicate(&RowCells::new()));
        let branch = if matched { &true_mutations } else { &false_mutations };
        for mutation in branch {
            Self::apply_locked(&mut rows, mutation);
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Family;

    fn col(name: &str) -> Column {
        Column::new(Family::Data, name.as_bytes().to_vec())
    }

    #[test]
    fn write_then_point_in_time_read() {
        let store = MemoryStore::new();
        let row: RowKey = b"row1".to_vec().into();
        store.write_block(&[RowMutation::new(row.clone()).set(col("c"), b"v1".to_vec()).at(10)]).unwrap();
        store.write_block(&[RowMutation::new(row.clone()).set(col("c"), b"v2".to_vec()).at(20)]).unwrap();

        let at_15 = store.read_rows(ReadRequest::keys(vec![row.clone()]).at(15)).unwrap();
        let cells = &at_15[&row][&col("c")];
        assert_eq!(cells[0].value, b"v1");

        let at_25 = store.read_rows(ReadRequest::keys(vec![row.clone()]).at(25)).unwrap();
        let cells = &at_25[&row][&col("c")];
        assert_eq!(cells[0].value, b"v2");
    }

    #[test]
    fn atomic_increment_accumulates() {
        let store = MemoryStore::new();
        let row: RowKey = b"counter".to_vec().into();
        let c = col("n");
        assert_eq!(store.atomic_increment(row.clone(), c.clone(), 5).unwrap(), 5);
        assert_eq!(store.atomic_increment(row.clone(), c.clone(), 3).unwrap(), 8);
    }

    #[test]
    fn conditional_write_picks_branch() {
        let store = MemoryStore::new();
        let row: RowKey = b"locked".to_vec().into();
        let matched = store
            .conditional_write(row.clone(), Box::new(|cells: &RowCells| cells.is_empty()), vec![RowMutation::new(row.clone()).set(col("held"), b"1".to_vec())], vec![])
            .unwrap();
        assert!(matched);
        let again = store
            .conditional_write(row.clone(), Box::new(|cells: &RowCells| cells.is_empty()), vec![RowMutation::new(row.clone()).set(col("held"), b"1".to_vec())], vec![])
            .unwrap();
        assert!(!again);
    }
}
