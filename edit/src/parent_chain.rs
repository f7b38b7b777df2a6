use crate::errors::EditResult;
use chunkedgraph_database::prelude::{RowMutation, Timestamp};
use chunkedgraph_hierarchy::HierarchyReader;
use chunkedgraph_ids::{ChunkId, Meta, NodeId};
use chunkedgraph_model::{codec, schema::node, IdAllocator};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A node still climbing toward a root: its id, the chunk it currently
/// occupies, the cross-chunk edges (by layer) it still owes a resolution
/// to, and the pre-edit same-layer id(s) it supersedes — threaded forward
/// each round so `former_parent`/`new_parent` can be stamped on the real
/// lineage predecessor rather than on this edit's own fresh ids.
struct Frontier {
    id: NodeId,
    chunk: ChunkId,
    cross_edges: BTreeMap<u8, Vec<NodeId>>,
    superseded: Vec<NodeId>,
}

/// Bottom-up parent creation (§4.7.1). Each round picks the lowest layer
/// among the current frontiers, climbs every frontier at that layer exactly
/// one layer up — never skipping layers, since skip-connections are
/// unsupported — gathering any siblings whose cross edge is recorded at
/// that exact layer, and mints one new node per distinct target parent
/// chunk, merging frontiers (and any pre-existing siblings discovered along
/// the way) that land on the same one. Recurses until every branch reaches
/// the root layer.
///
/// `fresh_parent_of` maps supervoxels reassigned earlier in this same edit to
/// their brand-new layer-2 parent: cross-edge partners are looked up there
/// before falling back to a store read, since a just-reassigned supervoxel's
/// *stored* parent chain is stale until this edit's mutations are applied.
///
/// Each seed also carries the old layer-2 id(s) it supersedes (`recompute_chunk`'s
/// `old_l2_ids`). Every round resolves those forward by one layer — mirroring
/// `engine.rs::recompute_chunk`'s own layer-2 `former_parent`/`new_parent`
/// stamping — so `former_parent`/`new_parent` hold real lineage predecessors at
/// every layer, not this edit's own climbing ids.
pub fn propagate(
    reader: &HierarchyReader,
    meta: &Meta,
    allocator: &IdAllocator,
    seeds: Vec<(NodeId, ChunkId, BTreeMap<u8, Vec<NodeId>>, Vec<NodeId>)>,
    at: Timestamp,
    fresh_parent_of: &HashMap<NodeId, NodeId>,
    mutations: &mut Vec<RowMutation>,
) -> EditResult<Vec<NodeId>> {
    let mut current: Vec<Frontier> = seeds
        .into_iter()
        .map(|(id, chunk, cross_edges, superseded)| Frontier { id, chunk, cross_edges, superseded })
        .collect();
    let mut roots = Vec::new();

    while !current.is_empty() {
        let layer = current.iter().map(|f| meta.codec().layer_of(f.chunk)).min().unwrap();
        if layer >= meta.layer_count() {
            roots.extend(current.into_iter().map(|f| f.id));
            break;
        }

        // Every frontier always climbs exactly one layer per round, so all
        // of them share `layer` here — nothing to defer.
        let mut groups: HashMap<ChunkId, (Vec<NodeId>, BTreeMap<u8, Vec<NodeId>>, Vec<NodeId>)> = HashMap::new();
        let mut seen: HashMap<ChunkId, HashSet<NodeId>> = HashMap::new();

        for frontier in current {
            // Every frontier climbs exactly one layer per round — no
            // skip-connections (§ids: use_skip_connections is rejected), so a
            // frontier with no cross edge recorded at `layer` still gets a
            // proper solo parent here rather than jumping ahead to whatever
            // layer its next recorded cross edge lives at.
            let target_layer = layer + 1;
            let parent_chunk = meta.codec().parent_chunk_of(frontier.chunk, target_layer)?;

            let mut cross_edges = frontier.cross_edges;
            let siblings_via = cross_edges.remove(&layer).unwrap_or_default();
            let superseded = resolve_superseded(reader, meta, &frontier.superseded, target_layer);
            add_child(&mut groups, &mut seen, parent_chunk, frontier.id, cross_edges, superseded);

            for partner in siblings_via {
                let sibling = match fresh_parent_of.get(&partner) {
                    Some(&mapped) => mapped,
                    None => reader.root(partner, Some(at), target_layer, 0)?,
                };
                if seen.get(&parent_chunk).is_some_and(|s| s.contains(&sibling)) {
                    continue;
                }
                let layers_above: Vec<u8> = ((target_layer)..=meta.layer_count()).collect();
                let sibling_ce = reader.atomic_cross_edges(sibling, &layers_above)?;
                let sibling_superseded = resolve_superseded(reader, meta, &[sibling], target_layer);
                add_child(&mut groups, &mut seen, parent_chunk, sibling, sibling_ce, sibling_superseded);
            }
        }

        let mut next = Vec::new();
        let mut new_parent_of_old: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for (parent_chunk, (children, cross_edges, mut superseded)) in groups {
            superseded.sort_by_key(|n| n.raw());
            superseded.dedup();

            let parts = meta.codec().unpack(parent_chunk)?;
            let segment = allocator.unique_segment_id(parent_chunk)?;
            let parent_id = meta.codec().pack(parts.layer, parts.x, parts.y, parts.z, segment)?;

            mutations.push(RowMutation::new(node::row_key(parent_id)).set(node::child(), codec::encode(&children)?).at(at));
            mutations.push(
                RowMutation::new(node::row_key(parent_id)).set(node::former_parent(), codec::encode(&superseded)?).at(at),
            );
            for &child in &children {
                mutations.push(
                    RowMutation::new(node::row_key(child)).set(node::parent(), codec::encode_node_id(parent_id)).at(at),
                );
            }
            for (&l, partners) in &cross_edges {
                mutations.push(
                    RowMutation::new(node::row_key(parent_id))
                        .set(node::cross_chunk_edge(l), codec::encode(partners)?)
                        .at(at),
                );
            }
            for &old in &superseded {
                new_parent_of_old.entry(old).or_default().push(parent_id);
            }

            next.push(Frontier { id: parent_id, chunk: parent_chunk, cross_edges, superseded });
        }

        for (old, new_parents) in new_parent_of_old {
            mutations.push(
                RowMutation::new(node::row_key(old)).set(node::new_parent(), codec::encode(&new_parents)?).at(at),
            );
        }

        current = next;
    }

    Ok(roots)
}

/// Resolves each of `ids` to the pre-edit ancestor it has at exactly
/// `target_layer`: an id already at or above that layer already *is* that
/// ancestor (a pre-existing sibling pulled in via a cross edge); one still
/// below is climbed one step via its stored `parent` column, exactly as
/// `engine.rs::recompute_chunk` reads a touched supervoxel's stored parent
/// to find `old_l2_ids`. An id with no stored parent yet (nothing built
/// above it so far) contributes nothing, rather than failing the round.
fn resolve_superseded(reader: &HierarchyReader, meta: &Meta, ids: &[NodeId], target_layer: u8) -> Vec<NodeId> {
    let mut out = Vec::new();
    for &id in ids {
        if meta.codec().layer_of(id) >= target_layer {
            out.push(id);
        } else if let Ok(parent) = reader.parent(id, None) {
            out.push(parent);
        }
    }
    out
}

fn add_child(
    groups: &mut HashMap<ChunkId, (Vec<NodeId>, BTreeMap<u8, Vec<NodeId>>, Vec<NodeId>)>,
    seen: &mut HashMap<ChunkId, HashSet<NodeId>>,
    parent_chunk: ChunkId,
    child: NodeId,
    cross_edges: BTreeMap<u8, Vec<NodeId>>,
    superseded: Vec<NodeId>,
) {
    if !seen.entry(parent_chunk).or_default().insert(child) {
        return;
    }
    let entry = groups.entry(parent_chunk).or_insert_with(|| (Vec::new(), BTreeMap::new(), Vec::new()));
    entry.0.push(child);
    for (l, partners) in cross_edges {
        entry.1.entry(l).or_default().extend(partners);
    }
    entry.2.extend(superseded);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkedgraph_database::prelude::MemoryStore;

    #[test]
    fn single_seed_with_no_cross_edges_climbs_straight_to_root() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let reader = HierarchyReader::new(&store, &meta);
        let allocator = IdAllocator::new(&store, &meta);

        let l2_chunk = meta.codec().pack(2, 0, 0, 0, 0).unwrap();
        let seed_id = meta.codec().pack(2, 0, 0, 0, 1).unwrap();
        let mut mutations = Vec::new();
        let roots = propagate(
            &reader,
            &meta,
            &allocator,
            vec![(seed_id, l2_chunk, BTreeMap::new(), Vec::new())],
            0,
            &HashMap::new(),
            &mut mutations,
        )
        .unwrap();

        assert_eq!(roots.len(), 1);
        assert_eq!(meta.codec().layer_of(roots[0]), meta.layer_count());
        // one round per intermediate layer (2->3, 3->4), 3 mutations each:
        // child, former_parent (empty — nothing superseded in an empty store),
        // and one parent write for the lone child. No new_parent: there is no
        // old predecessor to stamp it on.
        assert_eq!(mutations.len(), (meta.layer_count() - 2) as usize * 3);
    }

    #[test]
    fn two_new_siblings_linked_by_a_fresh_edge_merge_without_a_store_round_trip() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let reader = HierarchyReader::new(&store, &meta);
        let allocator = IdAllocator::new(&store, &meta);

        let chunk_a = meta.codec().pack(2, 0, 0, 0, 0).unwrap();
        let chunk_b = meta.codec().pack(2, 1, 0, 0, 0).unwrap();
        let sv_a = meta.codec().pack(1, 0, 0, 0, 1).unwrap();
        let sv_b = meta.codec().pack(1, 1, 0, 0, 1).unwrap();
        let l2_a = meta.codec().pack(2, 0, 0, 0, 5).unwrap();
        let l2_b = meta.codec().pack(2, 1, 0, 0, 5).unwrap();

        let cross_layer = meta.codec().cross_chunk_layer(sv_a, sv_b).unwrap();
        let mut ce_a = BTreeMap::new();
        ce_a.insert(cross_layer, vec![sv_b]);
        let mut ce_b = BTreeMap::new();
        ce_b.insert(cross_layer, vec![sv_a]);

        let mut fresh = HashMap::new();
        fresh.insert(sv_a, l2_a);
        fresh.insert(sv_b, l2_b);

        let mut mutations = Vec::new();
        let roots = propagate(
            &reader,
            &meta,
            &allocator,
            vec![(l2_a, chunk_a, ce_a, Vec::new()), (l2_b, chunk_b, ce_b, Vec::new())],
            0,
            &fresh,
            &mut mutations,
        )
        .unwrap();

        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn superseded_lineage_is_stamped_at_every_layer_not_just_layer_two() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let reader = HierarchyReader::new(&store, &meta);
        let allocator = IdAllocator::new(&store, &meta);

        let l2_chunk = meta.codec().pack(2, 0, 0, 0, 0).unwrap();
        let old_l2 = meta.codec().pack(2, 0, 0, 0, 7).unwrap();
        let new_l2 = meta.codec().pack(2, 0, 0, 0, 9).unwrap();

        let mut mutations = Vec::new();
        propagate(
            &reader,
            &meta,
            &allocator,
            vec![(new_l2, l2_chunk, BTreeMap::new(), vec![old_l2])],
            0,
            &HashMap::new(),
            &mut mutations,
        )
        .unwrap();

        // The first round's new layer-3 parent must carry `old_l2` as its
        // `former_parent`, not `new_l2` (the freshly-minted child climbing
        // through it) — that's the column this fix threads through.
        let decoded_any_old_l2: Vec<NodeId> = mutations
            .iter()
            .filter(|m| m.sets.iter().any(|(col, _)| *col == node::former_parent()))
            .filter_map(|m| m.sets.iter().find(|(col, _)| *col == node::former_parent()))
            .filter_map(|(_, value)| codec::decode::<Vec<NodeId>>(value).ok())
            .find(|v| v.contains(&old_l2))
            .unwrap();
        assert_eq!(decoded_any_old_l2, vec![old_l2]);

        // `old_l2` itself must get a `new_parent` stamp, since store reads
        // have no other way to learn what superseded it.
        let new_parent_write = mutations
            .iter()
            .find(|m| m.row == Some(node::row_key(old_l2)) && m.sets.iter().any(|(col, _)| *col == node::new_parent()))
            .expect("old_l2 should receive a new_parent stamp");
        let (_, value) = new_parent_write.sets.iter().find(|(col, _)| *col == node::new_parent()).unwrap();
        let new_parents: Vec<NodeId> = codec::decode(value).unwrap();
        assert_eq!(new_parents.len(), 1);
        assert_eq!(meta.codec().layer_of(new_parents[0]), 3);
    }
}
