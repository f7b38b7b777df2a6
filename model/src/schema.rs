use chunkedgraph_database::prelude::{Column, Family, RowKey};
use chunkedgraph_ids::NodeId;

/// Column qualifiers for a node row, grouped the way §3 groups them. Column
/// names are ASCII qualifiers, matching the original `column_keys` module's
/// `"Hierarchy"`/`"Connectivity"`/`"Concurrency"` families collapsed onto the
/// four backend families this store actually has.
pub mod node {
    use super::*;

    pub fn parent() -> Column {
        Column::new(Family::Data, b"Hierarchy.Parent".to_vec())
    }
    pub fn child() -> Column {
        Column::new(Family::Data, b"Hierarchy.Child".to_vec())
    }
    pub fn former_parent() -> Column {
        Column::new(Family::Data, b"Hierarchy.FormerParent".to_vec())
    }
    pub fn new_parent() -> Column {
        Column::new(Family::Data, b"Hierarchy.NewParent".to_vec())
    }
    pub fn partner() -> Column {
        Column::new(Family::Data, b"Connectivity.Partner".to_vec())
    }
    pub fn affinity() -> Column {
        Column::new(Family::Data, b"Connectivity.Affinity".to_vec())
    }
    pub fn area() -> Column {
        Column::new(Family::Data, b"Connectivity.Area".to_vec())
    }
    pub fn connected() -> Column {
        Column::new(Family::Data, b"Connectivity.Connected".to_vec())
    }
    /// `Connectivity.CrossChunkEdge[l]`, family `3` per §3.
    pub fn cross_chunk_edge(layer: u8) -> Column {
        Column::new(Family::CrossEdges, format!("CrossChunkEdge[{layer}]").into_bytes())
    }
    pub fn lock() -> Column {
        Column::new(Family::Data, b"Concurrency.Lock".to_vec())
    }

    /// Marker column for the write-phase "indefinite" lock (§4.5): presence
    /// of any cell means the root is held indefinitely, regardless of age.
    pub fn indefinite_lock() -> Column {
        Column::new(Family::Data, b"Concurrency.IndefiniteLock".to_vec())
    }

    /// Row key for a node: zero-padded 19-digit decimal `NodeId`, matching
    /// `u64::MAX`'s digit count, so keys sort the same lexicographically and
    /// numerically (§6).
    pub fn row_key(id: NodeId) -> RowKey {
        RowKey::new(format!("{:019}", u64::from(id)).into_bytes())
    }
}

/// Fixed row holding immutable graph configuration (§3 "GraphSettings row").
pub mod settings {
    use super::*;

    pub fn row_key() -> RowKey {
        RowKey::new(b"GraphSettings".to_vec())
    }

    pub fn config() -> Column {
        Column::new(Family::Data, b"Config".to_vec())
    }
}

/// Counter row keys: `i<padded_chunk>` or `i<padded_chunk>_<shard>` (§6),
/// plus the single global operation-id counter row.
pub mod counter {
    use super::*;
    use chunkedgraph_ids::ChunkId;

    pub fn column() -> Column {
        Column::new(Family::Counters, b"CounterID".to_vec())
    }

    pub fn chunk_row_key(chunk: ChunkId) -> RowKey {
        RowKey::new(format!("i{:019}", u64::from(chunk)).into_bytes())
    }

    pub fn sharded_chunk_row_key(chunk: ChunkId, shard: u32) -> RowKey {
        RowKey::new(format!("i{:019}_{shard}", u64::from(chunk)).into_bytes())
    }

    pub fn operation_id_row_key() -> RowKey {
        RowKey::new(b"OperationID".to_vec())
    }
}

/// Log row columns (§3, family `2`), one row per operation keyed by
/// big-endian (here: zero-padded decimal, matching node rows) operation id.
pub mod log {
    use super::*;

    pub fn row_key(operation_id: u64) -> RowKey {
        RowKey::new(format!("{operation_id:019}").into_bytes())
    }

    pub fn user_id() -> Column {
        Column::new(Family::Log, b"UserID".to_vec())
    }
    pub fn root_id() -> Column {
        Column::new(Family::Log, b"RootID".to_vec())
    }
    pub fn source_id() -> Column {
        Column::new(Family::Log, b"SourceID".to_vec())
    }
    pub fn sink_id() -> Column {
        Column::new(Family::Log, b"SinkID".to_vec())
    }
    pub fn source_coordinate() -> Column {
        Column::new(Family::Log, b"SourceCoordinate".to_vec())
    }
    pub fn sink_coordinate() -> Column {
        Column::new(Family::Log, b"SinkCoordinate".to_vec())
    }
    pub fn added_edge() -> Column {
        Column::new(Family::Log, b"AddedEdge".to_vec())
    }
    pub fn removed_edge() -> Column {
        Column::new(Family::Log, b"RemovedEdge".to_vec())
    }
    pub fn affinity() -> Column {
        Column::new(Family::Log, b"Affinity".to_vec())
    }
    pub fn bounding_box_offset() -> Column {
        Column::new(Family::Log, b"BoundingBoxOffset".to_vec())
    }
    pub fn undo_operation_id() -> Column {
        Column::new(Family::Log, b"UndoOperationID".to_vec())
    }
    pub fn redo_operation_id() -> Column {
        Column::new(Family::Log, b"RedoOperationID".to_vec())
    }
    pub fn status() -> Column {
        Column::new(Family::Log, b"Status".to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_row_keys_sort_numerically() {
        let low = node::row_key(NodeId(1));
        let high = node::row_key(NodeId(2));
        assert!(low.as_ref() < high.as_ref());
    }

    #[test]
    fn counter_row_key_is_prefixed() {
        let key = counter::chunk_row_key(NodeId(42));
        assert!(key.to_string().starts_with('i'));
    }
}
