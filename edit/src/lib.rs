pub mod components;
pub mod engine;
pub mod errors;
pub mod parent_chain;

pub use engine::{EditEngine, EditOutcome};
pub use errors::{EditError, EditResult};

#[cfg(test)]
mod tests {
    use super::*;
    use chunkedgraph_database::prelude::{MemoryStore, RowMutation};
    use chunkedgraph_ids::{Meta, NodeId};
    use chunkedgraph_model::{codec, schema::node};

    /// Seeds two single-supervoxel level-2 nodes in neighboring chunks, each
    /// already climbing to its own pre-existing root, with no edges between
    /// the two supervoxels yet.
    fn seed_two_isolated_supervoxels(store: &MemoryStore, meta: &Meta) -> (NodeId, NodeId, NodeId, NodeId) {
        // Pre-existing ids use high segment numbers so they never collide
        // with the allocator's low-numbered output once the engine mints
        // fresh replacements in the same chunks during a test.
        let sv_a = meta.codec().pack(1, 0, 0, 0, 1).unwrap();
        let sv_b = meta.codec().pack(1, 1, 0, 0, 1).unwrap();
        let l2_a = meta.codec().pack(2, 0, 0, 0, 101).unwrap();
        let l2_b = meta.codec().pack(2, 1, 0, 0, 101).unwrap();
        let l3_a = meta.codec().pack(3, 0, 0, 0, 101).unwrap();
        let l3_b = meta.codec().pack(3, 0, 0, 0, 102).unwrap();
        let l4_a = meta.codec().pack(4, 0, 0, 0, 101).unwrap();
        let l4_b = meta.codec().pack(4, 0, 0, 0, 102).unwrap();

        let writes = [
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
        ];
        store.write_block(&writes).unwrap();
        (sv_a, sv_b, l2_a, l2_b)
    }

    #[test]
    fn merge_climbs_two_isolated_supervoxels_to_one_shared_root() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let (sv_a, sv_b, l2_a, l2_b) = seed_two_isolated_supervoxels(&store, &meta);

        let engine = EditEngine::new(&store, &meta);
        let outcome = engine.merge("tester", sv_a, sv_b, 1.0, None, None).unwrap();

        assert_eq!(outcome.new_root_ids.len(), 1);
        assert_eq!(meta.codec().layer_of(outcome.new_root_ids[0]), meta.layer_count());
        assert_eq!(outcome.new_lvl2_ids.len(), 2, "each touched chunk always mints a fresh level-2 id");

        let reader = chunkedgraph_hierarchy::HierarchyReader::new(&store, &meta);
        let root_a = reader.root(sv_a, None, meta.root_layer(), 0).unwrap();
        let root_b = reader.root(sv_b, None, meta.root_layer(), 0).unwrap();
        assert_eq!(root_a, root_b);
        assert_eq!(root_a, outcome.new_root_ids[0]);

        // the superseded level-2 ids recorded a NewParent pointer
        let lineage = chunkedgraph_hierarchy::Lineage::new(&store);
        assert!(!lineage.is_latest(l2_a).unwrap());
        assert!(!lineage.is_latest(l2_b).unwrap());
    }

    #[test]
    fn split_then_undo_restores_the_merged_root() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let (sv_a, sv_b, ..) = seed_two_isolated_supervoxels(&store, &meta);

        let engine = EditEngine::new(&store, &meta);
        let merge_outcome = engine.merge("tester", sv_a, sv_b, 1.0, None, None).unwrap();
        let merged_root = merge_outcome.new_root_ids[0];

        let split_outcome =
            engine.split("tester", &[sv_a], &[sv_b], vec![(sv_a, sv_b)]).unwrap();
        assert_eq!(split_outcome.new_root_ids.len(), 2);

        let reader = chunkedgraph_hierarchy::HierarchyReader::new(&store, &meta);
        let root_a = reader.root(sv_a, None, meta.root_layer(), 0).unwrap();
        let root_b = reader.root(sv_b, None, meta.root_layer(), 0).unwrap();
        assert_ne!(root_a, root_b);

        let undo_outcome = engine.undo("tester", split_outcome.operation_id).unwrap();
        assert_eq!(undo_outcome.new_root_ids.len(), 1);

        let root_a_after_undo = reader.root(sv_a, None, meta.root_layer(), 0).unwrap();
        let root_b_after_undo = reader.root(sv_b, None, meta.root_layer(), 0).unwrap();
        assert_eq!(root_a_after_undo, root_b_after_undo);
        assert_ne!(root_a_after_undo, merged_root, "undo mints a fresh root rather than reusing the old one");
    }

    #[test]
    fn merge_rejects_endpoints_past_the_distance_bound() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let sv_a = meta.codec().pack(1, 0, 0, 0, 1).unwrap();
        let sv_far = meta.codec().pack(1, 10, 0, 0, 1).unwrap();

        let engine = EditEngine::new(&store, &meta);
        let err = engine.merge("tester", sv_a, sv_far, 1.0, None, None).unwrap_err();
        assert!(matches!(err, EditError::BadRequest(_)));
    }
}
