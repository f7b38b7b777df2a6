use crate::components::connected_components;
use crate::errors::{check_merge_distance, EditError, EditResult};
use crate::parent_chain;
use chunkedgraph_database::prelude::{
    BulkWriteOptions, Column, ReadRequest, RowMutation, Store, Timestamp,
};
use chunkedgraph_hierarchy::{AtomicEdge, HierarchyReader};
use chunkedgraph_ids::{ChunkId, Meta, NodeId};
use chunkedgraph_lock::{IndefiniteRootLock, LockManager, RootLock, RootSetRenewer};
use chunkedgraph_model::{
    codec,
    schema::{log as log_schema, node},
    Coordinate, EdgeRecord, IdAllocator, LogEntry,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_micros() -> Timestamp {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_micros() as Timestamp
}

/// Default inflation around a multicut's anchor point, in voxels (§4.6's
/// worked example): roughly two chunks in-plane, a quarter chunk in z.
const DEFAULT_BBOX_OFFSET: Coordinate = [240, 240, 24];

/// The durable effect of one merge/split/multicut/undo/redo: the operation's
/// log id, the root(s) it produced, and every level-2 node freshly minted
/// while recomputing the touched chunks.
#[derive(Clone, Debug)]
pub struct EditOutcome {
    pub operation_id: u64,
    pub new_root_ids: Vec<NodeId>,
    pub new_lvl2_ids: Vec<NodeId>,
}

/// C9: the single entry point for graph-mutating operations (§4.7),
/// grounded in `chunkedgraph.ChunkedGraph.add_edges`/`remove_edges`/
/// `_run_multicut` — lock roots, recompute the connected components of every
/// chunk an edit touches, mint fresh level-2 ids, climb `parent_chain` to new
/// roots, log, and `bulk_write` under renewal.
pub struct EditEngine<'a> {
    store: &'a dyn Store,
    meta: &'a Meta,
}

impl<'a> EditEngine<'a> {
    pub fn new(store: &'a dyn Store, meta: &'a Meta) -> Self {
        Self { store, meta }
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
        let source_chunk = self.meta.codec().chunk_of(source)?;
        let sink_chunk = self.meta.codec().chunk_of(sink)?;
        check_merge_distance(self.chunk_xyz(source_chunk)?, self.chunk_xyz(sink_chunk)?)?;

        let added_edge = vec![EdgeRecord { a: source, b: sink }];
        let build_log = move |root_id: Vec<NodeId>| LogEntry::Merge {
            user_id: user_id.to_string(),
            root_id,
            source_id: vec![source],
            sink_id: vec![sink],
            source_coordinate,
            sink_coordinate,
            added_edge: added_edge.clone(),
            affinity: vec![affinity],
        };

        self.execute(&[source, sink], vec![(source, sink, affinity)], Vec::new(), build_log)
    }

    pub fn split(
        &self,
        user_id: &str,
        source_ids: &[NodeId],
        sink_ids: &[NodeId],
        removed_edges: Vec<(NodeId, NodeId)>,
    ) -> EditResult<EditOutcome> {
        if removed_edges.is_empty() {
            return Err(EditError::BadRequest("split requires at least one edge to remove".into()));
        }
        let touched: Vec<NodeId> = removed_edges.iter().flat_map(|&(a, b)| [a, b]).collect();
        let removed_edge: Vec<EdgeRecord> = removed_edges.iter().map(|&(a, b)| EdgeRecord { a, b }).collect();
        let source_ids = source_ids.to_vec();
        let sink_ids = sink_ids.to_vec();

        let build_log = move |root_id: Vec<NodeId>| LogEntry::Split {
            user_id: user_id.to_string(),
            root_id,
            source_id: source_ids.clone(),
            sink_id: sink_ids.clone(),
            removed_edge: removed_edge.clone(),
        };

        self.execute(&touched, Vec::new(), removed_edges, build_log)
    }

    pub fn multicut(
        &self,
        user_id: &str,
        source_ids: &[NodeId],
        sink_ids: &[NodeId],
        source_coordinate: Option<Coordinate>,
        sink_coordinate: Option<Coordinate>,
        bounding_box_offset: Option<Coordinate>,
    ) -> EditResult<EditOutcome> {
        let offset = bounding_box_offset.unwrap_or(DEFAULT_BBOX_OFFSET);
        let reader = HierarchyReader::new(self.store, self.meta);

        let anchor = *source_ids
            .first()
            .ok_or_else(|| EditError::BadRequest("multicut requires at least one source supervoxel".into()))?;
        let root = reader.root(anchor, None, self.meta.root_layer(), 3)?;
        for &id in source_ids.iter().chain(sink_ids.iter()) {
            if reader.root(id, None, self.meta.root_layer(), 3)? != root {
                return Err(EditError::BadRequest("multicut endpoints must all share one root".into()));
            }
        }

        let parts = self.meta.codec().unpack(anchor)?;
        let lo = [parts.x as i64 - offset[0], parts.y as i64 - offset[1], parts.z as i64 - offset[2]];
        let hi = [parts.x as i64 + offset[0], parts.y as i64 + offset[1], parts.z as i64 + offset[2]];

        let by_layer = reader.subgraph_nodes(root, Some((lo, hi)), &[2])?;
        let l2_ids = by_layer.get(&2).cloned().unwrap_or_default();
        if l2_ids.is_empty() {
            return Err(EditError::Precondition("no level-2 nodes found in the requested bounding box".into()));
        }

        let supervoxels = reader.children_flat(&l2_ids, None)?;
        let mut weighted = Vec::new();
        let mut seen = HashSet::new();
        for &sv in &supervoxels {
            let connectivity = reader.connectivity(sv, None)?;
            for &idx in &connectivity.connected {
                let (Some(&partner), Some(&affinity)) =
                    (connectivity.partner.get(idx as usize), connectivity.affinity.get(idx as usize))
                else {
                    continue;
                };
                let edge = AtomicEdge::new(sv, partner);
                if seen.insert(edge) {
                    weighted.push(chunkedgraph_mincut::WeightedEdge { edge, weight: affinity as f64 });
                }
            }
        }

        let cut = chunkedgraph_mincut::solve(&weighted, source_ids, sink_ids)?;
        let removed_edges: Vec<(NodeId, NodeId)> = cut.iter().map(|e| (e.0, e.1)).collect();
        let removed_edge: Vec<EdgeRecord> = cut.iter().map(|e| EdgeRecord { a: e.0, b: e.1 }).collect();
        let touched: Vec<NodeId> = removed_edges.iter().flat_map(|&(a, b)| [a, b]).collect();

        let source_ids = source_ids.to_vec();
        let sink_ids = sink_ids.to_vec();
        let build_log = move |root_id: Vec<NodeId>| LogEntry::Multicut {
            user_id: user_id.to_string(),
            root_id,
            source_id: source_ids.clone(),
            sink_id: sink_ids.clone(),
            source_coordinate,
            sink_coordinate,
            bounding_box_offset: offset,
            removed_edge: removed_edge.clone(),
        };

        self.execute(&touched, Vec::new(), removed_edges, build_log)
    }

    pub fn undo(&self, user_id: &str, operation_id: u64) -> EditResult<EditOutcome> {
        let entry = self.read_log(operation_id)?;
        let user_id = user_id.to_string();
        match entry {
            LogEntry::Merge { added_edge, .. } => {
                let removed: Vec<(NodeId, NodeId)> = added_edge.iter().map(|e| (e.a, e.b)).collect();
                let touched: Vec<NodeId> = added_edge.iter().flat_map(|e| [e.a, e.b]).collect();
                self.execute(&touched, Vec::new(), removed, move |root_id| LogEntry::Undo {
                    user_id,
                    root_id,
                    undo_operation_id: operation_id,
                })
            }
            LogEntry::Split { removed_edge, .. } | LogEntry::Multicut { removed_edge, .. } => {
                let added: Vec<(NodeId, NodeId, f32)> = removed_edge.iter().map(|e| (e.a, e.b, 1.0)).collect();
                let touched: Vec<NodeId> = removed_edge.iter().flat_map(|e| [e.a, e.b]).collect();
                self.execute(&touched, added, Vec::new(), move |root_id| LogEntry::Undo {
                    user_id,
                    root_id,
                    undo_operation_id: operation_id,
                })
            }
            LogEntry::Undo { .. } | LogEntry::Redo { .. } => {
                Err(EditError::BadRequest("cannot undo an undo/redo entry".into()))
            }
        }
    }

    pub fn redo(&self, user_id: &str, operation_id: u64) -> EditResult<EditOutcome> {
        let entry = self.read_log(operation_id)?;
        let user_id = user_id.to_string();
        match entry {
            LogEntry::Merge { added_edge, .. } => {
                let added: Vec<(NodeId, NodeId, f32)> = added_edge.iter().map(|e| (e.a, e.b, 1.0)).collect();
                let touched: Vec<NodeId> = added_edge.iter().flat_map(|e| [e.a, e.b]).collect();
                self.execute(&touched, added, Vec::new(), move |root_id| LogEntry::Redo {
                    user_id,
                    root_id,
                    redo_operation_id: operation_id,
                })
            }
            LogEntry::Split { removed_edge, .. } | LogEntry::Multicut { removed_edge, .. } => {
                let removed: Vec<(NodeId, NodeId)> = removed_edge.iter().map(|e| (e.a, e.b)).collect();
                let touched: Vec<NodeId> = removed_edge.iter().flat_map(|e| [e.a, e.b]).collect();
                self.execute(&touched, Vec::new(), removed, move |root_id| LogEntry::Redo {
                    user_id,
                    root_id,
                    redo_operation_id: operation_id,
                })
            }
            LogEntry::Undo { .. } | LogEntry::Redo { .. } => {
                Err(EditError::BadRequest("cannot redo an undo/redo entry".into()))
            }
        }
    }

    fn chunk_xyz(&self, chunk: ChunkId) -> EditResult<[u64; 3]> {
        let parts = self.meta.codec().unpack(chunk)?;
        Ok([parts.x, parts.y, parts.z])
    }

    /// The level-2 chunk spatially containing supervoxel `sv`: same `(x, y,
    /// z)` as `sv`'s own atomic chunk (§ids: level-2 chunks mirror the atomic
    /// layer's coordinates one-for-one), repacked at layer 2.
    fn level2_chunk_of(&self, sv: NodeId) -> EditResult<ChunkId> {
        let parts = self.meta.codec().unpack(self.meta.codec().chunk_of(sv)?)?;
        Ok(self.meta.codec().pack(2, parts.x, parts.y, parts.z, 0)?)
    }

    /// Shared merge/split/multicut/undo/redo body: lock the touched roots,
    /// append the requested connectivity changes, recompute every touched
    /// chunk's level-2 grouping, climb to new roots, log, and commit.
    fn execute<F>(
        &self,
        touched_supervoxels: &[NodeId],
        added: Vec<(NodeId, NodeId, f32)>,
        removed: Vec<(NodeId, NodeId)>,
        build_log: F,
    ) -> EditResult<EditOutcome>
    where
        F: FnOnce(Vec<NodeId>) -> LogEntry,
    {
        let reader = HierarchyReader::new(self.store, self.meta);
        let allocator = IdAllocator::new(self.store, self.meta);

        let mut roots: Vec<NodeId> = Vec::new();
        for &sv in touched_supervoxels {
            let r = reader.root(sv, None, self.meta.root_layer(), 3)?;
            if !roots.contains(&r) {
                roots.push(r);
            }
        }
        roots.sort_by_key(|n| n.raw());

        let operation_id = allocator.next_operation_id()?;
        let root_lock = RootLock::acquire(self.store, self.meta, &roots, operation_id, 3)?;
        let locked_roots = root_lock.held_roots().to_vec();
        let _indefinite = IndefiniteRootLock::acquire(self.store, self.meta, &locked_roots, operation_id)?;

        let now = now_micros();
        let mut mutations = Vec::new();
        self.append_connectivity_changes(&reader, &added, &removed, now, &mut mutations)?;

        let mut affected_chunks: Vec<ChunkId> = Vec::new();
        for &sv in touched_supervoxels {
            let chunk = self.level2_chunk_of(sv)?;
            if !affected_chunks.contains(&chunk) {
                affected_chunks.push(chunk);
            }
        }

        let mut seeds = Vec::new();
        let mut fresh_parent_of = HashMap::new();
        let mut new_lvl2_ids = Vec::new();

        for &chunk in &affected_chunks {
            let chunk_seeds =
                self.recompute_chunk(&reader, &allocator, chunk, &added, &removed, now, &mut mutations)?;
            for (new_id, new_chunk, ce, members, old_l2_ids) in chunk_seeds {
                new_lvl2_ids.push(new_id);
                for sv in members {
                    fresh_parent_of.insert(sv, new_id);
                }
                seeds.push((new_id, new_chunk, ce, old_l2_ids));
            }
        }

        let new_root_ids =
            parent_chain::propagate(&reader, self.meta, &allocator, seeds, now, &fresh_parent_of, &mut mutations)?;

        let log_entry = build_log(locked_roots.clone());
        mutations.extend(self.log_mutations(operation_id, &log_entry, now)?);

        let renewer =
            Arc::new(RootSetRenewer { manager: LockManager::new(self.store, self.meta), roots: locked_roots, operation_id });
        let opts = BulkWriteOptions { renewer: Some(renewer), ..Default::default() };
        self.store.bulk_write(mutations, opts)?;

        Ok(EditOutcome { operation_id, new_root_ids, new_lvl2_ids })
    }

    /// Appends a fresh `Partner`/`Affinity`/`Area` generation (and, for any
    /// node touched, a `Connected` toggle cell) reflecting `added`/`removed`
    /// on top of the store's current connectivity for each endpoint (§4.3:
    /// these columns are full-list generations, never merged in place).
    fn append_connectivity_changes(
        &self,
        reader: &HierarchyReader,
        added: &[(NodeId, NodeId, f32)],
        removed: &[(NodeId, NodeId)],
        now: Timestamp,
        mutations: &mut Vec<RowMutation>,
    ) -> EditResult<()> {
        let mut additions: HashMap<NodeId, Vec<(NodeId, f32)>> = HashMap::new();
        let mut toggles: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for &(a, b, affinity) in added {
            additions.entry(a).or_default().push((b, affinity));
            additions.entry(b).or_default().push((a, affinity));
        }
        for &(a, b) in removed {
            toggles.entry(a).or_default().push(b);
            toggles.entry(b).or_default().push(a);
        }

        let touched: HashSet<NodeId> = additions.keys().chain(toggles.keys()).copied().collect();
        for node_id in touched {
            let connectivity = reader.connectivity(node_id, None)?;
            let mut partner = connectivity.partner;
            let mut affinity = connectivity.affinity;
            let mut area = connectivity.area;
            let mut toggled_indices = Vec::new();

            if let Some(new_partners) = additions.get(&node_id) {
                for &(p, a) in new_partners {
                    toggled_indices.push(partner.len() as u32);
                    partner.push(p);
                    affinity.push(a);
                    area.push(0);
                }
            }
            if let Some(targets) = toggles.get(&node_id) {
                for &target in targets {
                    if let Some(idx) = partner.iter().position(|&p| p == target) {
                        toggled_indices.push(idx as u32);
                    }
                }
            }

            let row = node::row_key(node_id);
            mutations.push(RowMutation::new(row.clone()).set(node::partner(), codec::encode(&partner)?).at(now));
            mutations.push(RowMutation::new(row.clone()).set(node::affinity(), codec::encode(&affinity)?).at(now));
            mutations.push(RowMutation::new(row.clone()).set(node::area(), codec::encode(&area)?).at(now));
            if !toggled_indices.is_empty() {
                mutations.push(RowMutation::new(row).set(node::connected(), codec::encode(&toggled_indices)?).at(now));
            }
        }
        Ok(())
    }

    /// Recomputes one chunk's level-2 grouping after `added`/`removed`:
    /// gathers every old level-2 node any touched supervoxel currently
    /// belongs to, re-runs connected components over their combined
    /// membership with the edit applied, and mints one fresh level-2 id per
    /// resulting group — even a group whose membership is unchanged, since a
    /// touched chunk's old id is always superseded (§4.7 simplification).
    fn recompute_chunk(
        &self,
        reader: &HierarchyReader,
        allocator: &IdAllocator,
        chunk: ChunkId,
        added: &[(NodeId, NodeId, f32)],
        removed: &[(NodeId, NodeId)],
        now: Timestamp,
        mutations: &mut Vec<RowMutation>,
    ) -> EditResult<Vec<(NodeId, ChunkId, BTreeMap<u8, Vec<NodeId>>, Vec<NodeId>, Vec<NodeId>)>> {
        let touched_in_chunk: Vec<NodeId> = added
            .iter()
            .flat_map(|&(a, b, _)| [a, b])
            .chain(removed.iter().flat_map(|&(a, b)| [a, b]))
            .filter(|&sv| self.level2_chunk_of(sv).map(|c| c == chunk).unwrap_or(false))
            .collect();

        let mut old_l2_ids: Vec<NodeId> = Vec::new();
        for &sv in &touched_in_chunk {
            let parent = reader.parent(sv, None)?;
            if !old_l2_ids.contains(&parent) {
                old_l2_ids.push(parent);
            }
        }

        let mut node_set = reader.children_flat(&old_l2_ids, None)?;
        node_set.sort_by_key(|n| n.raw());
        node_set.dedup();
        let node_index: HashSet<NodeId> = node_set.iter().copied().collect();

        let mut active_edges = Vec::new();
        let mut ce_by_member: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for &sv in &node_set {
            for partner in self.effective_partners(reader, sv, added, removed)? {
                if node_index.contains(&partner) {
                    if sv.raw() < partner.raw() {
                        active_edges.push(AtomicEdge::new(sv, partner));
                    }
                } else if self.level2_chunk_of(partner)? != chunk {
                    ce_by_member.entry(sv).or_default().push(partner);
                }
            }
        }

        let groups = connected_components(&node_set, &active_edges);
        let mut seeds = Vec::new();
        let mut new_ids = Vec::new();

        for group in groups {
            let segment = allocator.unique_segment_id(chunk)?;
            let parts = self.meta.codec().unpack(chunk)?;
            let new_id = self.meta.codec().pack(parts.layer, parts.x, parts.y, parts.z, segment)?;
            new_ids.push(new_id);

            let mut ce: BTreeMap<u8, Vec<NodeId>> = BTreeMap::new();
            for &sv in &group {
                if let Some(partners) = ce_by_member.get(&sv) {
                    for &partner in partners {
                        let layer = self.meta.codec().cross_chunk_layer(sv, partner)?;
                        ce.entry(layer).or_default().push(partner);
                    }
                }
            }

            mutations.push(RowMutation::new(node::row_key(new_id)).set(node::child(), codec::encode(&group)?).at(now));
            mutations.push(
                RowMutation::new(node::row_key(new_id)).set(node::former_parent(), codec::encode(&old_l2_ids)?).at(now),
            );
            for &sv in &group {
                mutations
                    .push(RowMutation::new(node::row_key(sv)).set(node::parent(), codec::encode_node_id(new_id)).at(now));
            }
            for (&l, partners) in &ce {
                mutations.push(
                    RowMutation::new(node::row_key(new_id))
                        .set(node::cross_chunk_edge(l), codec::encode(partners)?)
                        .at(now),
                );
            }

            seeds.push((new_id, chunk, ce, group, old_l2_ids.clone()));
        }

        for &old in &old_l2_ids {
            mutations.push(
                RowMutation::new(node::row_key(old)).set(node::new_parent(), codec::encode(&new_ids)?).at(now),
            );
        }

        Ok(seeds)
    }

    /// Post-edit connected partners of `sv`: the store's current connectivity
    /// with `added`/`removed` overlaid, so a brand new cross-chunk edge is
    /// visible to both the internal-components pass and the cross-chunk-edge
    /// recomputation before it has actually been written.
    fn effective_partners(
        &self,
        reader: &HierarchyReader,
        sv: NodeId,
        added: &[(NodeId, NodeId, f32)],
        removed: &[(NodeId, NodeId)],
    ) -> EditResult<Vec<NodeId>> {
        let connectivity = reader.connectivity(sv, None)?;
        let mut partners: HashSet<NodeId> = connectivity
            .connected
            .iter()
            .filter_map(|&idx| connectivity.partner.get(idx as usize).copied())
            .collect();
        for &(a, b, _) in added {
            if a == sv {
                partners.insert(b);
            }
            if b == sv {
                partners.insert(a);
            }
        }
        for &(a, b) in removed {
            if a == sv {
                partners.remove(&b);
            }
            if b == sv {
                partners.remove(&a);
            }
        }
        Ok(partners.into_iter().collect())
    }

    fn log_mutations(&self, operation_id: u64, entry: &LogEntry, now: Timestamp) -> EditResult<Vec<RowMutation>> {
        let row = log_schema::row_key(operation_id);
        let mut m = RowMutation::new(row).at(now);
        m = m.set(log_schema::user_id(), entry.user_id().as_bytes().to_vec());
        m = m.set(log_schema::root_id(), codec::encode(entry.root_id())?);

        match entry {
            LogEntry::Merge { source_id, sink_id, source_coordinate, sink_coordinate, added_edge, affinity, .. } => {
                m = m.set(log_schema::source_id(), codec::encode(source_id)?);
                m = m.set(log_schema::sink_id(), codec::encode(sink_id)?);
                if let Some(c) = source_coordinate {
                    m = m.set(log_schema::source_coordinate(), codec::encode(c)?);
                }
                if let Some(c) = sink_coordinate {
                    m = m.set(log_schema::sink_coordinate(), codec::encode(c)?);
                }
                m = m.set(log_schema::added_edge(), codec::encode(added_edge)?);
                m = m.set(log_schema::affinity(), codec::encode(affinity)?);
            }
            LogEntry::Split { source_id, sink_id, removed_edge, .. } => {
                m = m.set(log_schema::source_id(), codec::encode(source_id)?);
                m = m.set(log_schema::sink_id(), codec::encode(sink_id)?);
                m = m.set(log_schema::removed_edge(), codec::encode(removed_edge)?);
            }
            LogEntry::Multicut {
                source_id,
                sink_id,
                source_coordinate,
                sink_coordinate,
                bounding_box_offset,
                removed_edge,
                ..
            } => {
                m = m.set(log_schema::source_id(), codec::encode(source_id)?);
                m = m.set(log_schema::sink_id(), codec::encode(sink_id)?);
                if let Some(c) = source_coordinate {
                    m = m.set(log_schema::source_coordinate(), codec::encode(c)?);
                }
                if let Some(c) = sink_coordinate {
                    m = m.set(log_schema::sink_coordinate(), codec::encode(c)?);
                }
                m = m.set(log_schema::bounding_box_offset(), codec::encode(bounding_box_offset)?);
                m = m.set(log_schema::removed_edge(), codec::encode(removed_edge)?);
            }
            LogEntry::Undo { undo_operation_id, .. } => {
                m = m.set(log_schema::undo_operation_id(), codec::encode(undo_operation_id)?);
            }
            LogEntry::Redo { redo_operation_id, .. } => {
                m = m.set(log_schema::redo_operation_id(), codec::encode(redo_operation_id)?);
            }
        }
        Ok(vec![m])
    }

    fn read_log(&self, operation_id: u64) -> EditResult<LogEntry> {
        let row = log_schema::row_key(operation_id);
        let request = ReadRequest::keys(vec![row.clone()]);
        let rows = self.store.read_rows(request)?;
        let cells = rows.get(&row).ok_or(EditError::LogNotFound(operation_id))?;

        let get = |col: Column| -> Option<Vec<u8>> { cells.get(&col).and_then(|gens| gens.first()).map(|c| c.value.clone()) };
        let decode = |col: Column| -> Option<Vec<u8>> { get(col) };

        let user_id = decode(log_schema::user_id())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        let root_id: Vec<NodeId> =
            decode(log_schema::root_id()).and_then(|bytes| codec::decode(&bytes).ok()).unwrap_or_default();

        if let Some(bytes) = decode(log_schema::added_edge()) {
            let added_edge: Vec<EdgeRecord> = codec::decode(&bytes)?;
            let source_id = decode(log_schema::source_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
            let sink_id = decode(log_schema::sink_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
            let source_coordinate = decode(log_schema::source_coordinate()).and_then(|b| codec::decode(&b).ok());
            let sink_coordinate = decode(log_schema::sink_coordinate()).and_then(|b| codec::decode(&b).ok());
            let affinity = decode(log_schema::affinity()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
            return Ok(LogEntry::Merge {
                user_id,
                root_id,
                source_id,
                sink_id,
                source_coordinate,
                sink_coordinate,
                added_edge,
                affinity,
            });
        }
        if let Some(bytes) = decode(log_schema::bounding_box_offset()) {
            let bounding_box_offset: Coordinate = codec::decode(&bytes)?;
            let removed_edge: Vec<EdgeRecord> =
                decode(log_schema::removed_edge()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
            let source_id = decode(log_schema::source_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
            let sink_id = decode(log_schema::sink_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
            let source_coordinate = decode(log_schema::source_coordinate()).and_then(|b| codec::decode(&b).ok());
            let sink_coordinate = decode(log_schema::sink_coordinate()).and_then(|b| codec::decode(&b).ok());
            return Ok(LogEntry::Multicut {
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
        if let Some(bytes) = decode(log_schema::removed_edge()) {
            let removed_edge: Vec<EdgeRecord> = codec::decode(&bytes)?;
            let source_id = decode(log_schema::source_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
            let sink_id = decode(log_schema::sink_id()).and_then(|b| codec::decode(&b).ok()).unwrap_or_default();
            return Ok(LogEntry::Split { user_id, root_id, source_id, sink_id, removed_edge });
        }
        if let Some(bytes) = decode(log_schema::undo_operation_id()) {
            let undo_operation_id: u64 = codec::decode(&bytes)?;
            return Ok(LogEntry::Undo { user_id, root_id, undo_operation_id });
        }
        if let Some(bytes) = decode(log_schema::redo_operation_id()) {
            let redo_operation_id: u64 = codec::decode(&bytes)?;
            return Ok(LogEntry::Redo { user_id, root_id, redo_operation_id });
        }
        Err(EditError::LogNotFound(operation_id))
    }
}
