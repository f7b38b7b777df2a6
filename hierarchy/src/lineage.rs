use crate::errors::HierarchyResult;
use chunkedgraph_database::prelude::{ReadRequest, Store, Timestamp};
use chunkedgraph_ids::NodeId;
use chunkedgraph_model::{codec, schema::node, LogEntry};
use std::collections::{BTreeSet, VecDeque};

/// C6: forward/backward traversal of `FormerParent`/`NewParent` links. The
/// two pointer columns form a DAG by construction (edits only ever mint
/// fresh ids, §9 "Cyclic lineage graphs") but every walk here still guards
/// against revisits with a `visited` set, in case of buggy data.
pub struct Lineage<'a> {
    store: &'a dyn Store,
}

impl<'a> Lineage<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    fn read_links(&self, id: NodeId, column: &chunkedgraph_database::prelude::Column) -> HierarchyResult<(Vec<NodeId>, Option<Timestamp>)> {
        let request = ReadRequest::keys(vec![node::row_key(id)]).with_columns(vec![column.clone()]);
        let rows = self.store.read_rows(request).unwrap_or_default();
        let Some(cell) = rows.get(&node::row_key(id)).and_then(|cells| cells.get(column)).and_then(|gens| gens.first()) else {
            return Ok((Vec::new(), None));
        };
        let links = codec::decode::<Vec<NodeId>>(&cell.value).unwrap_or_default();
        Ok((links, Some(cell.timestamp)))
    }

    /// `future_roots(root, until)`: BFS forward over `NewParent`, stopping
    /// at nodes whose `NewParent` cell timestamp exceeds `until`.
    pub fn future_roots(&self, root: NodeId, until: Timestamp) -> HierarchyResult<Vec<NodeId>> {
        let mut visited = BTreeSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut leaves = Vec::new();

        while let Some(node) = queue.pop_front() {
            let (next, ts) = self.read_links(node, &node::new_parent())?;
            match ts {
                Some(ts) if ts <= until && !next.is_empty() => {
                    for n in next {
                        if visited.insert(n) {
                            queue.push_back(n);
                        }
                    }
                }
                _ => leaves.push(node),
            }
        }
        Ok(leaves)
    }

    /// `past_roots(root, since)`: symmetric, using `FormerParent`.
    pub fn past_roots(&self, root: NodeId, since: Timestamp) -> HierarchyResult<Vec<NodeId>> {
        let mut visited = BTreeSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut leaves = Vec::new();

        while let Some(node) = queue.pop_front() {
            let (prev, ts) = self.read_links(node, &node::former_parent())?;
            match ts {
                Some(ts) if ts >= since && !prev.is_empty() => {
                    for n in prev {
                        if visited.insert(n) {
                            queue.push_back(n);
                        }
                    }
                }
                _ => leaves.push(node),
            }
        }
        Ok(leaves)
    }

    /// `latest(root)`: forward walk to nodes with no `NewParent`, unioned
    /// across branches.
    pub fn latest(&self, root: NodeId) -> HierarchyResult<Vec<NodeId>> {
        let mut visited = BTreeSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut leaves = Vec::new();

        while let Some(node) = queue.pop_front() {
            let (next, _) = self.read_links(node, &node::new_parent())?;
            if next.is_empty() {
                leaves.push(node);
            } else {
                for n in next {
                    if visited.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }
        Ok(leaves)
    }

    /// `is_latest(root)`: `true` iff `root` has no `NewParent` cell.
    pub fn is_latest(&self, root: NodeId) -> HierarchyResult<bool> {
        let (next, _) = self.read_links(root, &node::new_parent())?;
        Ok(next.is_empty())
    }

    /// `history(root, [t_past, t_future])`: `past ∪ {root} ∪ future`.
    pub fn history(&self, root: NodeId, t_past: Timestamp, t_future: Timestamp) -> HierarchyResult<Vec<NodeId>> {
        let mut nodes: BTreeSet<NodeId> = self.past_roots(root, t_past)?.into_iter().collect();
        nodes.insert(root);
        nodes.extend(self.future_roots(root, t_future)?);
        Ok(nodes.into_iter().collect())
    }

    /// Voxel-space coordinate a change-log entry attaches to `root`, resolved
    /// from the node's packed coordinates via the codec (supplemented
    /// lineage helper, ported from the original's change-log annotations).
    pub fn coordinate(&self, meta: &chunkedgraph_ids::Meta, root: NodeId) -> HierarchyResult<[u64; 3]> {
        let parts = meta.codec().unpack(root).unwrap_or(chunkedgraph_ids::NodeComponents { layer: 0, x: 0, y: 0, z: 0, segment: 0 });
        Ok([parts.x, parts.y, parts.z])
    }

    /// `change_log(root, since)`: walk backward along `FormerParent`, read
    /// each predecessor's `Lock` cell (still holding the operation id that
    /// produced the split/merge), look up that operation's log row, and
    /// classify merge vs. split by whether `AddedEdge` is present (§4.4).
    pub fn change_log<F>(&self, root: NodeId, since: Timestamp, read_log: F) -> HierarchyResult<Vec<(NodeId, LogEntry)>>
    where
        F: Fn(u64) -> Option<LogEntry>,
    {
        let mut visited = BTreeSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut entries = Vec::new();

        while let Some(node) = queue.pop_front() {
            let (predecessors, ts) = self.read_links(node, &node::former_parent())?;
            if ts.map_or(true, |ts| ts < since) {
                continue;
            }
            for predecessor in predecessors {
                if !visited.insert(predecessor) {
                    continue;
                }
                let lock_request = ReadRequest::keys(vec![node::row_key(predecessor)]).with_columns(vec![node::lock()]);
                let rows = self.store.read_rows(lock_request).unwrap_or_default();
                if let Some(op_id_cell) =
                    rows.get(&node::row_key(predecessor)).and_then(|cells| cells.get(&node::lock())).and_then(|gens| gens.first())
                {
                    if let Ok(op_id) = codec::decode::<u64>(&op_id_cell.value) {
                        if let Some(entry) = read_log(op_id) {
                            entries.push((predecessor, entry));
                        }
                    }
                }
                queue.push_back(predecessor);
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkedgraph_database::prelude::{MemoryStore, RowMutation};
    use chunkedgraph_ids::NodeId;

    fn write_links(store: &MemoryStore, id: NodeId, column: chunkedgraph_database::prelude::Column, links: Vec<NodeId>, ts: Timestamp) {
        let bytes = codec::encode(&links).unwrap();
        store.write_block(&[RowMutation::new(node::row_key(id)).set(column, bytes).at(ts)]).unwrap();
    }

    #[test]
    fn latest_follows_new_parent_to_a_leaf() {
        let store = MemoryStore::new();
        let old_root = NodeId::new(1);
        let new_root = NodeId::new(2);
        write_links(&store, old_root, node::new_parent(), vec![new_root], 10);

        let lineage = Lineage::new(&store);
        assert_eq!(lineage.latest(old_root).unwrap(), vec![new_root]);
        assert!(lineage.is_latest(new_root).unwrap());
        assert!(!lineage.is_latest(old_root).unwrap());
    }

    #[test]
    fn future_roots_stops_at_the_until_bound() {
        let store = MemoryStore::new();
        let old_root = NodeId::new(1);
        let new_root = NodeId::new(2);
        write_links(&store, old_root, node::new_parent(), vec![new_root], 100);

        let lineage = Lineage::new(&store);
        assert_eq!(lineage.future_roots(old_root, 50).unwrap(), vec![old_root]);
        assert_eq!(lineage.future_roots(old_root, 150).unwrap(), vec![new_root]);
    }

    #[test]
    fn past_roots_walks_former_parent_backward() {
        let store = MemoryStore::new();
        let new_root = NodeId::new(2);
        let old_root = NodeId::new(1);
        write_links(&store, new_root, node::former_parent(), vec![old_root], 100);

        let lineage = Lineage::new(&store);
        assert_eq!(lineage.past_roots(new_root, 50).unwrap(), vec![old_root]);
    }
}
