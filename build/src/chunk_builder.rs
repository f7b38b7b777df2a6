//! C10: build-time construction of atomic (layer-2) and parent chunks from
//! externally loaded edge and agglomeration data (§4.8), grounded in how
//! `edit::engine::recompute_chunk` and `edit::parent_chain::propagate`
//! perform the same union/connect/mint-id/cross-edge steps at edit time —
//! here run once per chunk over a full externally supplied node set instead
//! of incrementally over a small touched subset.

use crate::errors::{BuildError, BuildResult};
use crate::rawio::RawEdge;
use chunkedgraph_database::prelude::{RowMutation, Store, Timestamp};
use chunkedgraph_edit::components::connected_components;
use chunkedgraph_hierarchy::{AtomicEdge, HierarchyReader};
use chunkedgraph_ids::{ChunkId, Meta, NodeId};
use chunkedgraph_model::{codec, schema::node, IdAllocator};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Which of a chunk's three atomic-edge categories (§6) a batch came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EdgeCategory {
    InChunk,
    BetweenChunk,
    CrossChunk,
}

/// `get_chunk_edges(path, chunks) -> {type -> Edges}` (§6). Implementations
/// read whatever raw edge file format a deployment actually stores; the
/// build crate only depends on this trait, not on any one file layout.
pub trait EdgeLoader {
    fn get_chunk_edges(&self, path: &str, chunks: &[ChunkId]) -> BuildResult<HashMap<EdgeCategory, Vec<RawEdge>>>;
}

/// Plain union-find over agglomeration pairs, keyed directly by `NodeId`
/// (unlike `edit::components`'s index-based version) since the build phase
/// doesn't have a dense, pre-enumerated node set to index into.
struct NodeUnionFind {
    parent: HashMap<NodeId, NodeId>,
}

impl NodeUnionFind {
    fn new() -> Self {
        Self { parent: HashMap::new() }
    }

    fn find(&mut self, x: NodeId) -> NodeId {
        let p = *self.parent.entry(x).or_insert(x);
        if p == x {
            x
        } else {
            let root = self.find(p);
            self.parent.insert(x, root);
            root
        }
    }

    fn union(&mut self, a: NodeId, b: NodeId) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent.insert(ra, rb);
        }
    }
}

pub struct ChunkBuilder<'a> {
    meta: &'a Meta,
    allocator: IdAllocator<'a>,
}

impl<'a> ChunkBuilder<'a> {
    pub fn new(store: &'a dyn Store, meta: &'a Meta) -> Self {
        Self { meta, allocator: IdAllocator::new(store, meta) }
    }

    /// Builds one layer-2 chunk: groups `supervoxels` into active-edge
    /// components gated by the agglomeration union-find, mints one fresh
    /// level-2 id per component (a singleton component is an isolated
    /// supervoxel), and writes `Parent/Child/Partner/Affinity/Area/Connected/
    /// CrossChunkEdge` rows. `in_chunk`/`between_chunk`/`cross_chunk` may
    /// overlap in which supervoxels they touch but are assumed already
    /// deduplicated by the caller's `EdgeLoader`.
    pub fn build_atomic_chunk(
        &self,
        chunk: ChunkId,
        supervoxels: &[NodeId],
        in_chunk: &[RawEdge],
        between_chunk: &[RawEdge],
        cross_chunk: &[RawEdge],
        agglomeration_pairs: &[(NodeId, NodeId)],
        at: Timestamp,
        mutations: &mut Vec<RowMutation>,
    ) -> BuildResult<Vec<NodeId>> {
        let layer = self.meta.codec().layer_of(chunk);
        if layer != 2 {
            return Err(BuildError::MalformedRecord(format!("build_atomic_chunk requires a layer-2 chunk, got layer {layer}")));
        }

        let mut uf = NodeUnionFind::new();
        for &(a, b) in agglomeration_pairs {
            uf.union(a, b);
        }

        let node_set: HashSet<NodeId> = supervoxels.iter().copied().collect();
        let touching: Vec<RawEdge> = in_chunk
            .iter()
            .chain(between_chunk)
            .chain(cross_chunk)
            .copied()
            .filter(|e| node_set.contains(&e.sv1) || node_set.contains(&e.sv2))
            .collect();

        let mut active_edges = Vec::new();
        let mut ce_by_member: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut partner_map: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut affinity_map: HashMap<NodeId, Vec<f32>> = HashMap::new();
        let mut area_map: HashMap<NodeId, Vec<u64>> = HashMap::new();

        for edge in &touching {
            for &(sv, partner) in &[(edge.sv1, edge.sv2), (edge.sv2, edge.sv1)] {
                if node_set.contains(&sv) {
                    partner_map.entry(sv).or_default().push(partner);
                    affinity_map.entry(sv).or_default().push(edge.affinity);
                    area_map.entry(sv).or_default().push(edge.area);
                }
            }

            if node_set.contains(&edge.sv1) && node_set.contains(&edge.sv2) {
                if uf.find(edge.sv1) == uf.find(edge.sv2) {
                    active_edges.push(AtomicEdge::new(edge.sv1, edge.sv2));
                }
            } else {
                if node_set.contains(&edge.sv1) {
                    ce_by_member.entry(edge.sv1).or_default().push(edge.sv2);
                }
                if node_set.contains(&edge.sv2) {
                    ce_by_member.entry(edge.sv2).or_default().push(edge.sv1);
                }
            }
        }

        let active_set: BTreeSet<AtomicEdge> = active_edges.iter().copied().collect();
        for &sv in supervoxels {
            let row = node::row_key(sv);
            let partner = partner_map.remove(&sv).unwrap_or_default();
            let affinity = affinity_map.remove(&sv).unwrap_or_default();
            let area = area_map.remove(&sv).unwrap_or_default();
            let connected: Vec<u32> = partner
                .iter()
                .enumerate()
                .filter(|(_, &p)| active_set.contains(&AtomicEdge::new(sv, p)))
                .map(|(i, _)| i as u32)
                .collect();

            mutations.push(RowMutation::new(row.clone()).set(node::partner(), codec::encode(&partner)?).at(at));
            mutations.push(RowMutation::new(row.clone()).set(node::affinity(), codec::encode(&affinity)?).at(at));
            mutations.push(RowMutation::new(row.clone()).set(node::area(), codec::encode(&area)?).at(at));
            if !connected.is_empty() {
                mutations.push(RowMutation::new(row).set(node::connected(), codec::encode(&connected)?).at(at));
            }
        }

        let groups = connected_components(supervoxels, &active_edges);
        let mut new_ids = Vec::new();
        for group in groups {
            let segment = self.allocator.unique_segment_id(chunk)?;
            let parts = self.meta.codec().unpack(chunk)?;
            let new_id = self.meta.codec().pack(parts.layer, parts.x, parts.y, parts.z, segment)?;
            new_ids.push(new_id);

            mutations.push(RowMutation::new(node::row_key(new_id)).set(node::child(), codec::encode(&group)?).at(at));
            for &sv in &group {
                mutations
                    .push(RowMutation::new(node::row_key(sv)).set(node::parent(), codec::encode_node_id(new_id)).at(at));
            }

            let mut ce: BTreeMap<u8, Vec<NodeId>> = BTreeMap::new();
            for &sv in &group {
                if let Some(partners) = ce_by_member.get(&sv) {
                    for &partner in partners {
                        let layer = self.meta.codec().cross_chunk_layer(sv, partner)?;
                        ce.entry(layer).or_default().push(partner);
                    }
                }
            }
            for (&l, partners) in &ce {
                mutations.push(
                    RowMutation::new(node::row_key(new_id)).set(node::cross_chunk_edge(l), codec::encode(partners)?).at(at),
                );
            }
        }

        Ok(new_ids)
    }

    /// Builds one layer-`l` (`l > 2`) chunk from its already-built `l-1`
    /// children: reads each child's `CrossChunkEdge[l]` entries, resolves
    /// each partner supervoxel to its own already-built `l-1` ancestor,
    /// groups `child_ids` by connectivity under those resolved edges, mints
    /// one fresh id per group, and carries each group's `CrossChunkEdge[>l]`
    /// forward onto its new parent.
    pub fn build_parent_chunk(
        &self,
        reader: &HierarchyReader,
        chunk: ChunkId,
        child_ids: &[NodeId],
        at: Timestamp,
        mutations: &mut Vec<RowMutation>,
    ) -> BuildResult<Vec<NodeId>> {
        let layer = self.meta.codec().layer_of(chunk);
        if layer <= 2 {
            return Err(BuildError::MalformedRecord(format!("build_parent_chunk requires layer > 2, got {layer}")));
        }
        let child_layer = layer - 1;
        let child_set: HashSet<NodeId> = child_ids.iter().copied().collect();

        let layers_from_here: Vec<u8> = (layer..=self.meta.layer_count()).collect();
        let mut ce_by_child: HashMap<NodeId, BTreeMap<u8, Vec<NodeId>>> = HashMap::new();
        for &child in child_ids {
            ce_by_child.insert(child, reader.atomic_cross_edges(child, &layers_from_here)?);
        }

        let mut edges = Vec::new();
        for &child in child_ids {
            let Some(partners) = ce_by_child.get(&child).and_then(|m| m.get(&layer)) else { continue };
            for &partner_sv in partners {
                let ancestor = reader.root(partner_sv, Some(at), child_layer, 0)?;
                if ancestor != child && child_set.contains(&ancestor) {
                    edges.push(AtomicEdge::new(child, ancestor));
                }
            }
        }

        let groups = connected_components(child_ids, &edges);
        let mut new_ids = Vec::new();
        for group in groups {
            let segment = self.allocator.unique_segment_id(chunk)?;
            let parts = self.meta.codec().unpack(chunk)?;
            let new_id = self.meta.codec().pack(parts.layer, parts.x, parts.y, parts.z, segment)?;
            new_ids.push(new_id);

            mutations.push(RowMutation::new(node::row_key(new_id)).set(node::child(), codec::encode(&group)?).at(at));
            for &child in &group {
                mutations.push(
                    RowMutation::new(node::row_key(child)).set(node::parent(), codec::encode_node_id(new_id)).at(at),
                );
            }

            let mut carried: BTreeMap<u8, Vec<NodeId>> = BTreeMap::new();
            for &child in &group {
                if let Some(ce) = ce_by_child.get(&child) {
                    for (&l, partners) in ce.iter().filter(|&(&l, _)| l > layer) {
                        carried.entry(l).or_default().extend(partners.iter().copied());
                    }
                }
            }
            for (&l, partners) in &carried {
                mutations.push(
                    RowMutation::new(node::row_key(new_id)).set(node::cross_chunk_edge(l), codec::encode(partners)?).at(at),
                );
            }
        }

        Ok(new_ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkedgraph_database::prelude::MemoryStore;

    #[test]
    fn atomic_chunk_groups_agglomerated_supervoxels_and_isolates_the_rest() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let chunk = meta.codec().pack(2, 0, 0, 0, 0).unwrap();
        let a = meta.codec().pack(1, 0, 0, 0, 1).unwrap();
        let b = meta.codec().pack(1, 0, 0, 0, 2).unwrap();
        let c = meta.codec().pack(1, 0, 0, 0, 3).unwrap();

        let in_chunk = vec![
            RawEdge { sv1: a, sv2: b, affinity: 0.9, area: 10 },
            RawEdge { sv1: b, sv2: c, affinity: 0.1, area: 2 },
        ];
        let agglomeration_pairs = vec![(a, b)];

        let builder = ChunkBuilder::new(&store, &meta);
        let mut mutations = Vec::new();
        let new_ids = builder
            .build_atomic_chunk(chunk, &[a, b, c], &in_chunk, &[], &[], &agglomeration_pairs, 0, &mut mutations)
            .unwrap();

        assert_eq!(new_ids.len(), 2, "{a:?}+{b:?} merge, {c:?} stays isolated");
        store.write_block(&mutations).unwrap();

        let reader = HierarchyReader::new(&store, &meta);
        let parent_a = reader.parent(a, None).unwrap();
        let parent_b = reader.parent(b, None).unwrap();
        let parent_c = reader.parent(c, None).unwrap();
        assert_eq!(parent_a, parent_b);
        assert_ne!(parent_a, parent_c);

        let connectivity_b = reader.connectivity(b, None).unwrap();
        assert_eq!(connectivity_b.partner.len(), 2);
        assert_eq!(connectivity_b.connected.len(), 1, "only the agglomerated edge toggles Connected");
    }

    #[test]
    fn parent_chunk_merges_children_sharing_a_layer_cross_edge() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();

        let l2_a = meta.codec().pack(2, 0, 0, 0, 1).unwrap();
        let l2_b = meta.codec().pack(2, 1, 0, 0, 1).unwrap();
        let l2_c = meta.codec().pack(2, 0, 0, 1, 1).unwrap();
        let sv_b = meta.codec().pack(1, 1, 0, 0, 9).unwrap();
        let parent_chunk = meta.codec().parent_chunk_of(meta.codec().chunk_of(l2_a).unwrap(), 3).unwrap();

        store
            .write_block(&[
                RowMutation::new(node::row_key(l2_a))
                    .set(node::cross_chunk_edge(2), codec::encode(&vec![sv_b]).unwrap()),
                RowMutation::new(node::row_key(sv_b)).set(node::parent(), codec::encode_node_id(l2_b)),
            ])
            .unwrap();

        let reader = HierarchyReader::new(&store, &meta);
        let builder = ChunkBuilder::new(&store, &meta);
        let mut mutations = Vec::new();
        let new_ids = builder.build_parent_chunk(&reader, parent_chunk, &[l2_a, l2_b, l2_c], 0, &mut mutations).unwrap();

        assert_eq!(new_ids.len(), 2, "{l2_a:?}+{l2_b:?} merge via the shared cross edge, {l2_c:?} stays separate");
    }
}
