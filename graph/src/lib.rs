//! Facade over every component crate (C1–C10): the single entry point most
//! callers depend on, mirroring how the teacher's top-level crate wires its
//! store, codec, and engine layers behind one handle instead of requiring
//! callers to assemble `HierarchyReader`/`EditEngine`/`LockManager` by hand.

use chunkedgraph_build::ChunkBuilder;
use chunkedgraph_database::prelude::{Column, ReadRequest, Store, Timestamp};
use chunkedgraph_edit::{EditEngine, EditOutcome, EditResult};
use chunkedgraph_hierarchy::{HierarchyReader, Lineage};
use chunkedgraph_ids::{Meta, MetaConfig, NodeId};
use chunkedgraph_model::{codec, schema::log as log_schema, EdgeRecord, GraphResult, LogEntry};

pub use chunkedgraph_model::Coordinate;

/// Opens (or validates against) the `GraphSettings` row and hands back a
/// [`ChunkedGraph`] bound to `store` for its whole lifetime.
pub fn open(store: &dyn Store, config: MetaConfig) -> GraphResult<ChunkedGraph<'_>> {
    let meta = chunkedgraph_model::open_or_create(store, config)?;
    Ok(ChunkedGraph { store, meta })
}

/// The chunked connectivity graph: reads, edits, and build-time chunk
/// construction, all scoped to one `Store` + `Meta` pair.
pub struct ChunkedGraph<'a> {
    store: &'a dyn Store,
    meta: Meta,
}

impl<'a> ChunkedGraph<'a> {
    pub fn new(store: &'a dyn Store, meta: Meta) -> Self {
        Self { store, meta }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn reader(&self) -> HierarchyReader<'_> {
        HierarchyReader::new(self.store, &self.meta)
    }

    pub fn lineage(&self) -> Lineage<'_> {
        Lineage::new(self.store)
    }

    pub fn editor(&self) -> EditEngine<'_> {
        EditEngine::new(self.store, &self.meta)
    }

    pub fn chunk_builder(&self) -> ChunkBuilder<'_> {
        ChunkBuilder::new(self.store, &self.meta)
    }

    pub fn merge(
        &self,
        user_id: &str,
        source: NodeId,
        sink: NodeId,
        affinity: f32,
        source_coordinate: Option<Coordinate>,
        sink_coordinate: Option<Coordinate>,
    ) -> EditResult<EditOutcome> {
        self.editor().merge(user_id, source, sink, affinity, source_coordinate, sink_coordinate)
    }

    pub fn split(
        &self,
        user_id: &str,
        source_ids: &[NodeId],
        sink_ids: &[NodeId],
        removed_edges: Vec<(NodeId, NodeId)>,
    ) -> EditResult<EditOutcome> {
        self.editor().split(user_id, source_ids, sink_ids, removed_edges)
    }

    pub fn undo(&self, user_id: &str, operation_id: u64) -> EditResult<EditOutcome> {
        self.editor().undo(user_id, operation_id)
    }

    pub fn redo(&self, user_id: &str, operation_id: u64) -> EditResult<EditOutcome> {
        self.editor().redo(user_id, operation_id)
    }

    /// The latest root `sv`'s subgraph currently resolves to.
    pub fn root_of(&self, sv: NodeId) -> EditResult<NodeId> {
        Ok(self.reader().root(sv, None, self.meta.root_layer(), 3)?)
    }

    /// The full history of edits behind `root`'s current state, each paired
    /// with the predecessor node it superseded, oldest branch point first
    /// since `since` (§4.4), via `Lineage::change_log`.
    pub fn change_log(&self, root: NodeId, since: Timestamp) -> EditResult<Vec<(NodeId, LogEntry)>> {
        Ok(self.lineage().change_log(root, since, |operation_id| read_log_entry(self.store, operation_id))?)
    }
}

/// Reads and decodes a single operation's Log-family row, mirroring
/// `EditEngine`'s private `read_log`: that method isn't part of `EditEngine`'s
/// public surface, so `Lineage::change_log`'s caller-supplied resolver needs
/// its own copy to turn an operation id into a `LogEntry`.
fn read_log_entry(store: &dyn Store, operation_id: u64) -> Option<LogEntry> {
    let row = log_schema::row_key(operation_id);
    let request = ReadRequest::keys(vec![row.clone()]);
    let rows = store.read_rows(request).ok()?;
    let cells = rows.get(&row)?;

    let get = |col: Column| -> Option<Vec<u8>> { cells.get(&col).and_then(|gens| gens.first()).map(|c| c.value.clone()) };

    let user_id = get(log_schema::user_id()).map(|bytes| String::from_utf8_lossy(&bytes).into_owned()).unwrap_or_default();
    let root_id: Vec<NodeId> = get(log_schema::root_id()).and_then(|bytes| codec::decode(&bytes).ok()).unwrap_or_default();

    if let Some(bytes) = get(log_schema::added_edge()) {
        let added_edge: Vec<EdgeRecord> = codec::decode(&bytes).ok()?;
        let source_id = get(log_schema::source_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
        let sink_id = get(log_schema::sink_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
        let source_coordinate = get(log_schema::source_coordinate()).and_then(|b| codec::decode(&b).ok());
        let sink_coordinate = get(log_schema::sink_coordinate()).and_then(|b| codec::decode(&b).ok());
        let affinity = get(log_schema::affinity()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
        return Some(LogEntry::Merge { user_id, root_id, source_id, sink_id, source_coordinate, sink_coordinate, added_edge, affinity });
    }
    if let Some(bytes) = get(log_schema::bounding_box_offset()) {
        let bounding_box_offset: Coordinate = codec::decode(&bytes).ok()?;
        let removed_edge: Vec<EdgeRecord> = get(log_schema::removed_edge()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
        let source_id = get(log_schema::source_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
        let sink_id = get(log_schema::sink_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
        let source_coordinate = get(log_schema::source_coordinate()).and_then(|b| codec::decode(&b).ok());
        let sink_coordinate = get(log_schema::sink_coordinate()).and_then(|b| codec::decode(&b).ok());
        return Some(LogEntry::Multicut {
            user_id,
            root_id,
            source_id,
            sink_id,
            source_coordinate,
            sink_coordinate,
            bounding_box_offset,
            removed_edge,
        });
    }
    if let Some(bytes) = get(log_schema::removed_edge()) {
        let removed_edge: Vec<EdgeRecord> = codec::decode(&bytes).ok()?;
        let source_id = get(log_schema::source_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
        let sink_id = get(log_schema::sink_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
        return Some(LogEntry::Split { user_id, root_id, source_id, sink_id, removed_edge });
    }
    if let Some(bytes) = get(log_schema::undo_operation_id()) {
        let undo_operation_id: u64 = codec::decode(&bytes).ok()?;
        return Some(LogEntry::Undo { user_id, root_id, undo_operation_id });
    }
    if let Some(bytes) = get(log_schema::redo_operation_id()) {
        let redo_operation_id: u64 = codec::decode(&bytes).ok()?;
        return Some(LogEntry::Redo { user_id, root_id, redo_operation_id });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkedgraph_database::prelude::{MemoryStore, RowMutation};
    use chunkedgraph_model::{codec, schema::node};

    #[test]
    fn open_persists_settings_and_merge_produces_one_root() {
        let store = MemoryStore::new();
        let config = Meta::default_example().config().clone();
        let graph = open(&store, config).unwrap();

        let sv_a = graph.meta().codec().pack(1, 0, 0, 0, 1).unwrap();
        let sv_b = graph.meta().codec().pack(1, 1, 0, 0, 1).unwrap();
        let l2_a = graph.meta().codec().pack(2, 0, 0, 0, 101).unwrap();
        let l2_b = graph.meta().codec().pack(2, 1, 0, 0, 101).unwrap();
        let l3_a = graph.meta().codec().pack(3, 0, 0, 0, 101).unwrap();
        let l3_b = graph.meta().codec().pack(3, 0, 0, 0, 102).unwrap();
        let l4_a = graph.meta().codec().pack(4, 0, 0, 0, 101).unwrap();
        let l4_b = graph.meta().codec().pack(4, 0, 0, 0, 102).unwrap();

        store
            .write_block(&[
                RowMutation::new(node::row_key(l2_a)).set(node::child(), codec::encode(&vec![sv_a]).unwrap()),
                RowMutation::new(node::row_key(sv_a)).set(node::parent(), codec::encode_node_id(l2_a)),
                RowMutation::new(node::row_key(l3_a)).set(node::child(), codec::encode(&vec![l2_a]).unwrap()),
                RowMutation::new(node::row_key(l2_a)).set(node::parent(), codec::encode_node_id(l3_a)),
                RowMutation::new(node::row_key(l4_a)).set(node::child(), codec::encode(&vec![l3_a]).unwrap()),
                RowMutation::new(node::row_key(l3_a)).set(node::parent(), codec::encode_node_id(l4_a)),
                RowMutation::new(node::row_key(l2_b)).set(node::child(), codec::encode(&vec![sv_b]).unwrap()),
                RowMutation::new(node::row_key(sv_b)).set(node::parent(), codec::encode_node_id(l2_b)),
                RowMutation::new(node::row_key(l3_b)).set(node::child(), codec::encode(&vec![l2_b]).unwrap()),
                RowMutation::new(node::row_key(l2_b)).set(node::parent(), codec::encode_node_id(l3_b)),
                RowMutation::new(node::row_key(l4_b)).set(node::child(), codec::encode(&vec![l3_b]).unwrap()),
                RowMutation::new(node::row_key(l3_b)).set(node::parent(), codec::encode_node_id(l4_b)),
            ])
            .unwrap();

        let outcome = graph.merge("tester", sv_a, sv_b, 1.0, None, None).unwrap();
        assert_eq!(outcome.new_root_ids.len(), 1);
        assert_eq!(graph.root_of(sv_a).unwrap(), graph.root_of(sv_b).unwrap());

        let history = graph.change_log(outcome.new_root_ids[0], 0).unwrap();
        assert!(!history.is_empty());
        assert!(matches!(history[0].1, LogEntry::Merge { .. }));
    }
}
