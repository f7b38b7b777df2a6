use crate::errors::{HierarchyError, HierarchyResult};
use chunkedgraph_database::prelude::{ReadRequest, Store, Timestamp};
use chunkedgraph_ids::{Meta, NodeId};
use chunkedgraph_model::{codec, schema::node};
use std::collections::BTreeMap;
use std::thread::sleep;
use std::time::Duration;

/// Per-supervoxel connectivity, derived from the `Partner`/`Affinity`/`Area`/
/// `Connected` columns of a node row (§4.3).
#[derive(Clone, Debug, Default)]
pub struct Connectivity {
    pub partner: Vec<NodeId>,
    pub affinity: Vec<f32>,
    pub area: Vec<u64>,
    pub connected: Vec<u32>,
    pub disconnected: Vec<u32>,
}

/// One undirected atomic edge, endpoints ordered so duplicates compare equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AtomicEdge(pub NodeId, pub NodeId);

impl AtomicEdge {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a.raw() <= b.raw() {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }
}

/// C5: reads of the current (or point-in-time) hierarchy and per-supervoxel
/// connectivity, grounded in the teacher's read-only `*StoreReader` trait
/// split (`reachability.rs`), adapted to a versioned row store instead of a
/// typed key-value store.
pub struct HierarchyReader<'a> {
    store: &'a dyn Store,
    meta: &'a Meta,
}

impl<'a> HierarchyReader<'a> {
    pub fn new(store: &'a dyn Store, meta: &'a Meta) -> Self {
        Self { store, meta }
    }

    /// `parents(ids, at)`: one parent per id, or `None` if absent.
    pub fn parents(&self, ids: &[NodeId], at: Option<Timestamp>) -> HierarchyResult<Vec<Option<NodeId>>> {
        let keys: Vec<_> = ids.iter().map(|&id| node::row_key(id)).collect();
        let mut request = ReadRequest::keys(keys.clone()).with_columns(vec![node::parent()]);
        if let Some(t) = at {
            request = request.at(t);
        }
        let rows = self.store.read_rows(request).map_err(|_| HierarchyError::NoParent(ids[0]))?;
        Ok(keys
            .iter()
            .map(|key| {
                rows.get(key)
                    .and_then(|cells| cells.get(&node::parent()))
                    .and_then(|gens| gens.first())
                    .and_then(|cell| codec::decode_node_id(&cell.value).ok())
            })
            .collect())
    }

    pub fn parent(&self, id: NodeId, at: Option<Timestamp>) -> HierarchyResult<NodeId> {
        self.parents(&[id], at)?[0].ok_or(HierarchyError::NoParent(id))
    }

    /// `children(ids, flatten)`.
    pub fn children(&self, ids: &[NodeId], at: Option<Timestamp>) -> HierarchyResult<Vec<Vec<NodeId>>> {
        let keys: Vec<_> = ids.iter().map(|&id| node::row_key(id)).collect();
        let mut request = ReadRequest::keys(keys.clone()).with_columns(vec![node::child()]);
        if let Some(t) = at {
            request = request.at(t);
        }
        let rows = self.store.read_rows(request).map_err(|_| HierarchyError::NoParent(ids[0]))?;
        Ok(keys
            .iter()
            .map(|key| {
                rows.get(key)
                    .and_then(|cells| cells.get(&node::child()))
                    .and_then(|gens| gens.first())
                    .and_then(|cell| codec::decode::<Vec<NodeId>>(&cell.value).ok())
                    .unwrap_or_default()
            })
            .collect())
    }

    pub fn children_flat(&self, ids: &[NodeId], at: Option<Timestamp>) -> HierarchyResult<Vec<NodeId>> {
        Ok(self.children(ids, at)?.into_iter().flatten().collect())
    }

    /// `root(node, at, stop_layer, retries)`: climb parents until `layer >=
    /// stop_layer`, retrying with a 500ms sleep between attempts (§4.3).
    pub fn root(&self, node: NodeId, at: Option<Timestamp>, stop_layer: u8, retries: u32) -> HierarchyResult<NodeId> {
        for attempt in 0..=retries {
            if let Ok(root) = self.try_root(node, at, stop_layer) {
                return Ok(root);
            }
            if attempt < retries {
                sleep(Duration::from_millis(500));
            }
        }
        Err(HierarchyError::RootNotFound(node))
    }

    fn try_root(&self, node: NodeId, at: Option<Timestamp>, stop_layer: u8) -> HierarchyResult<NodeId> {
        let mut current = node;
        loop {
            if self.meta.codec().layer_of(current) >= stop_layer {
                return Ok(current);
            }
            current = self.parent(current, at)?;
        }
    }

    /// `atomic_cross_edges(id, layers)`: read only family `3`.
    pub fn atomic_cross_edges(&self, id: NodeId, layers: &[u8]) -> HierarchyResult<BTreeMap<u8, Vec<NodeId>>> {
        let columns: Vec<_> = layers.iter().map(|&l| node::cross_chunk_edge(l)).collect();
        let request = ReadRequest::keys(vec![node::row_key(id)]).with_columns(columns);
        let rows = self.store.read_rows(request).map_err(|_| HierarchyError::NoParent(id))?;
        let mut out = BTreeMap::new();
        if let Some(cells) = rows.get(&node::row_key(id)) {
            for &layer in layers {
                if let Some(gens) = cells.get(&node::cross_chunk_edge(layer)) {
                    if let Some(cell) = gens.first() {
                        if let Ok(partners) = codec::decode::<Vec<NodeId>>(&cell.value) {
                            out.insert(layer, partners);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// `connectivity(id, at)`: `Partner[]`/`Affinity[]`/`Area[]` plus
    /// `Connected`/`Disconnected` derived by XOR-reducing newest-first
    /// `Connected` generations (§3 Agglomeration invariant, §8 property 5).
    pub fn connectivity(&self, id: NodeId, at: Option<Timestamp>) -> HierarchyResult<Connectivity> {
        let mut request = ReadRequest::keys(vec![node::row_key(id)])
            .with_columns(vec![node::partner(), node::affinity(), node::area(), node::connected()]);
        if let Some(t) = at {
            request = request.at(t);
        }
        let rows = self.store.read_rows(request).map_err(|_| HierarchyError::NoParent(id))?;
        let Some(cells) = rows.get(&node::row_key(id)) else {
            return Ok(Connectivity::default());
        };

        let partner = cells
            .get(&node::partner())
            .and_then(|g| g.first())
            .and_then(|c| codec::decode::<Vec<NodeId>>(&c.value).ok())
            .unwrap_or_default();
        let affinity = cells
            .get(&node::affinity())
            .and_then(|g| g.first())
            .and_then(|c| codec::decode::<Vec<f32>>(&c.value).ok())
            .unwrap_or_default();
        let area = cells
            .get(&node::area())
            .and_then(|g| g.first())
            .and_then(|c| codec::decode::<Vec<u64>>(&c.value).ok())
            .unwrap_or_default();

        let mut toggle_counts: BTreeMap<u32, u32> = BTreeMap::new();
        if let Some(gens) = cells.get(&node::connected()) {
            for cell in gens {
                if let Ok(indices) = codec::decode::<Vec<u32>>(&cell.value) {
                    for idx in indices {
                        *toggle_counts.entry(idx).or_insert(0) += 1;
                    }
                }
            }
        }
        let connected: Vec<u32> = toggle_counts.iter().filter(|(_, &count)| count % 2 == 1).map(|(&idx, _)| idx).collect();
        let disconnected: Vec<u32> =
            (0..partner.len() as u32).filter(|idx| !connected.contains(idx)).collect();

        Ok(Connectivity { partner, affinity, area, connected, disconnected })
    }

    /// Bounding box divisor for `subgraph_nodes`: `F^max(layer-2, 0)`, the
    /// atomic layer treated identically to layer 2 (§9 open question,
    /// resolved as specified).
    fn bbox_scale(&self, layer: u8) -> u64 {
        let exponent = layer.saturating_sub(2);
        (self.meta.fanout() as u64).pow(exponent as u32)
    }

    /// `subgraph_nodes(root, bbox, return_layers)`: descend level by level,
    /// filtering children to those within `bbox` (scaled per layer), with a
    /// dedicated layer-1 pass that expands each layer-2 node's supervoxels.
    pub fn subgraph_nodes(
        &self,
        root: NodeId,
        bbox: Option<([i64; 3], [i64; 3])>,
        return_layers: &[u8],
    ) -> HierarchyResult<BTreeMap<u8, Vec<NodeId>>> {
        let mut by_layer: BTreeMap<u8, Vec<NodeId>> = BTreeMap::new();
        let mut frontier = vec![root];
        by_layer.entry(self.meta.codec().layer_of(root)).or_default().push(root);

        loop {
            let layer = self.meta.codec().layer_of(frontier[0]);
            if layer <= 2 {
                break;
            }
            let children = self.children_flat(&frontier, None)?;
            let filtered = self.filter_bbox(&children, bbox);
            if filtered.is_empty() {
                frontier = filtered;
                break;
            }
            let child_layer = layer - 1;
            by_layer.entry(child_layer).or_default().extend(filtered.iter().copied());
            frontier = filtered;
        }

        if return_layers.contains(&1) && !frontier.is_empty() {
            let supervoxels = self.children_flat(&frontier, None)?;
            let filtered = self.filter_bbox(&supervoxels, bbox);
            by_layer.entry(1).or_default().extend(filtered);
        }

        by_layer.retain(|layer, _| return_layers.contains(layer));
        Ok(by_layer)
    }

    fn filter_bbox(&self, ids: &[NodeId], bbox: Option<([i64; 3], [i64; 3])>) -> Vec<NodeId> {
        let Some((lo, hi)) = bbox else { return ids.to_vec() };
        ids.iter()
            .copied()
            .filter(|&id| {
                let Ok(parts) = self.meta.codec().unpack(id) else { return false };
                let scale = self.bbox_scale(parts.layer) as i64;
                let (x, y, z) = (parts.x as i64 * scale, parts.y as i64 * scale, parts.z as i64 * scale);
                x >= lo[0] && x <= hi[0] && y >= lo[1] && y <= hi[1] && z >= lo[2] && z <= hi[2]
            })
            .collect()
    }

    /// `subgraph_chunk(l2_ids, connected_only, at)`: expand each level-2 node
    /// to its supervoxels, read connectivity per supervoxel, optionally keep
    /// only the connected subset, and deduplicate edges by endpoint order.
    pub fn subgraph_chunk(&self, l2_ids: &[NodeId], connected_only: bool, at: Option<Timestamp>) -> HierarchyResult<Vec<AtomicEdge>> {
        let supervoxels = self.children_flat(l2_ids, at)?;
        let mut edges = std::collections::BTreeSet::new();
        for &sv in &supervoxels {
            let connectivity = self.connectivity(sv, at)?;
            let indices: Vec<u32> = if connected_only {
                connectivity.connected.clone()
            } else {
                (0..connectivity.partner.len() as u32).collect()
            };
            for idx in indices {
                if let Some(&partner) = connectivity.partner.get(idx as usize) {
                    edges.insert(AtomicEdge::new(sv, partner));
                }
            }
        }
        Ok(edges.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chunkedgraph_database::prelude::{MemoryStore, RowMutation};

    fn write_links(store: &MemoryStore, id: NodeId, column: chunkedgraph_database::prelude::Column, links: Vec<NodeId>) {
        let bytes = codec::encode(&links).unwrap();
        store.write_block(&[RowMutation::new(node::row_key(id)).set(column, bytes)]).unwrap();
    }

    #[test]
    fn parent_and_children_round_trip() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let parent = meta.codec().pack(2, 0, 0, 0, 1).unwrap();
        let child = meta.codec().pack(1, 0, 0, 0, 1).unwrap();
        write_links(&store, child, node::parent(), vec![parent]);
        write_links(&store, parent, node::child(), vec![child]);

        let reader = HierarchyReader::new(&store, &meta);
        assert_eq!(reader.parent(child, None).unwrap(), parent);
        assert_eq!(reader.children(&[parent], None).unwrap(), vec![vec![child]]);
    }

    #[test]
    fn root_climbs_until_stop_layer() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let leaf = meta.codec().pack(1, 0, 0, 0, 1).unwrap();
        let l2 = meta.codec().pack(2, 0, 0, 0, 1).unwrap();
        let l3 = meta.codec().pack(3, 0, 0, 0, 1).unwrap();
        write_links(&store, leaf, node::parent(), vec![l2]);
        write_links(&store, l2, node::parent(), vec![l3]);

        let reader = HierarchyReader::new(&store, &meta);
        assert_eq!(reader.root(leaf, None, 3, 0).unwrap(), l3);
    }

    #[test]
    fn connectivity_xor_reduces_connected_toggles() {
        let store = MemoryStore::new();
        let meta = Meta::default_example();
        let a = meta.codec().pack(1, 0, 0, 0, 1).unwrap();
        let b = meta.codec().pack(1, 0, 0, 0, 2).unwrap();
        write_links(&store, a, node::partner(), vec![b]);
        store
            .write_block(&[RowMutation::new(node::row_key(a)).set(node::connected(), codec::encode(&vec![0u32]).unwrap()).at(10)])
            .unwrap();
        store
            .write_block(&[RowMutation::new(node::row_key(a)).set(node::connected(), codec::encode(&vec![0u32]).unwrap()).at(20)])
            .unwrap();

        let reader = HierarchyReader::new(&store, &meta);
        let connectivity = reader.connectivity(a, None).unwrap();
        assert!(connectivity.connected.is_empty());
        assert_eq!(connectivity.disconnected, vec![0]);
    }
}
