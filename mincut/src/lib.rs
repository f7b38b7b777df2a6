pub mod errors;
mod flow;

pub use errors::{MinCutError, MinCutResult};

use chunkedgraph_hierarchy::AtomicEdge;
use chunkedgraph_ids::NodeId;
use flow::{FlowNetwork, INFINITE_CAPACITY, TERMINAL_CAPACITY};
use petgraph::graph::NodeIndex;
use std::collections::{HashMap, HashSet};

/// One atomic edge with its affinity, the unit this module operates over.
/// `weight == f64::INFINITY` marks a chunk-boundary fusion (§4.6) that must
/// never appear in a returned cut.
#[derive(Clone, Copy, Debug)]
pub struct WeightedEdge {
    pub edge: AtomicEdge,
    pub weight: f64,
}

impl WeightedEdge {
    pub fn new(a: NodeId, b: NodeId, weight: f64) -> Self {
        Self { edge: AtomicEdge::new(a, b), weight }
    }
}

fn node_index(network: &mut FlowNetwork, index_of: &mut HashMap<NodeId, NodeIndex>, id: NodeId) -> NodeIndex {
    *index_of.entry(id).or_insert_with(|| network.add_node())
}

/// C8: minimum (source, sink)-separating cut over `edges`, grounded in the
/// original's `cutting.mincut` call from `_run_multicut`/`_run_split`: builds
/// a super-source/super-sink flow network, saturates it with Edmonds-Karp,
/// and reads the cut off the residual reachability frontier.
pub fn solve(edges: &[WeightedEdge], sources: &[NodeId], sinks: &[NodeId]) -> MinCutResult<Vec<AtomicEdge>> {
    if sources.is_empty() || sinks.is_empty() {
        return Err(MinCutError::Precondition("source and sink sets must both be non-empty".into()));
    }
    let source_set: HashSet<NodeId> = sources.iter().copied().collect();
    if sinks.iter().any(|id| source_set.contains(id)) {
        return Err(MinCutError::Precondition("source and sink sets overlap. Already split?".into()));
    }
    if edges.is_empty() {
        return Err(MinCutError::Precondition("no local edges found for the requested bounding box".into()));
    }

    let mut network = FlowNetwork::new();
    let mut index_of: HashMap<NodeId, NodeIndex> = HashMap::new();

    for we in edges {
        let a = node_index(&mut network, &mut index_of, we.edge.0);
        let b = node_index(&mut network, &mut index_of, we.edge.1);
        let capacity = if we.weight.is_infinite() { INFINITE_CAPACITY } else { we.weight };
        network.add_undirected_edge(a, b, capacity);
    }
    for &id in sources.iter().chain(sinks.iter()) {
        node_index(&mut network, &mut index_of, id);
    }

    let super_source = network.add_node();
    let super_sink = network.add_node();
    for &s in sources {
        network.add_undirected_edge(super_source, index_of[&s], TERMINAL_CAPACITY);
    }
    for &t in sinks {
        network.add_undirected_edge(index_of[&t], super_sink, TERMINAL_CAPACITY);
    }

    network.max_flow(super_source, super_sink);
    let reachable = network.reachable_from(super_source);

    let mut cut = Vec::new();
    for we in edges {
        let a = index_of[&we.edge.0];
        let b = index_of[&we.edge.1];
        if reachable.contains_key(&a) != reachable.contains_key(&b) {
            if we.weight.is_infinite() {
                return Err(MinCutError::Postcondition("mincut failed: cut requires severing a chunk-fusion edge".into()));
            }
            cut.push(we.edge);
        }
    }

    if cut.is_empty() {
        return Err(MinCutError::Postcondition("mincut failed".into()));
    }
    Ok(cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_edge_between_source_and_sink_is_the_cut() {
        let a = NodeId::new(1);
        let b = NodeId::new(2);
        let edges = vec![WeightedEdge::new(a, b, 5.0)];
        let cut = solve(&edges, &[a], &[b]).unwrap();
        assert_eq!(cut, vec![AtomicEdge::new(a, b)]);
    }

    #[test]
    fn cheapest_bottleneck_on_a_single_path_is_cut() {
        let s = NodeId::new(1);
        let mid = NodeId::new(2);
        let t = NodeId::new(3);
        let edges = vec![WeightedEdge::new(s, mid, 1.0), WeightedEdge::new(mid, t, 100.0)];
        let cut = solve(&edges, &[s], &[t]).unwrap();
        assert_eq!(cut, vec![AtomicEdge::new(s, mid)]);
    }

    #[test]
    fn infinite_edge_forced_into_the_cut_fails_postcondition() {
        let a = NodeId::new(1);
        let b = NodeId::new(2);
        let edges = vec![WeightedEdge::new(a, b, f64::INFINITY)];
        let err = solve(&edges, &[a], &[b]).unwrap_err();
        assert!(matches!(err, MinCutError::Postcondition(_)));
    }

    #[test]
    fn overlapping_source_and_sink_is_a_precondition_failure() {
        let a = NodeId::new(1);
        let edges = vec![WeightedEdge::new(a, NodeId::new(2), 1.0)];
        let err = solve(&edges, &[a], &[a]).unwrap_err();
        assert!(matches!(err, MinCutError::Precondition(_)));
    }
}
