use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, VecDeque};

/// Capacity standing in for `+∞` chunk-fusion edges: large enough that no
/// finite-affinity path ever routes around it for lack of capacity, but
/// finite so residual-graph arithmetic stays well-defined.
pub const INFINITE_CAPACITY: f64 = 1e18;

/// Capacity for the super-source/super-sink terminal edges, strictly above
/// [`INFINITE_CAPACITY`] so those synthetic edges are never themselves
/// mistaken for the bottleneck ahead of a genuine chunk-fusion edge.
pub const TERMINAL_CAPACITY: f64 = 1e24;

/// Undirected max-flow/min-cut via Edmonds-Karp, representing each
/// undirected edge as a pair of anti-parallel directed arcs that serve as
/// each other's residual reverse (the standard construction — pushing flow
/// one way grows the other's residual capacity rather than starting it at
/// zero).
pub struct FlowNetwork {
    graph: DiGraph<(), f64>,
    reverse: HashMap<EdgeIndex, EdgeIndex>,
}

impl FlowNetwork {
    pub fn new() -> Self {
        Self { graph: DiGraph::new(), reverse: HashMap::new() }
    }

    pub fn add_node(&mut self) -> NodeIndex {
        self.graph.add_node(())
    }

    pub fn add_undirected_edge(&mut self, a: NodeIndex, b: NodeIndex, capacity: f64) {
        let forward = self.graph.add_edge(a, b, capacity);
        let backward = self.graph.add_edge(b, a, capacity);
        self.reverse.insert(forward, backward);
        self.reverse.insert(backward, forward);
    }

    /// Repeatedly finds a BFS (shortest augmenting path) and saturates it,
    /// mutating residual capacities in place, until source and sink are
    /// disconnected in the residual graph. Returns the max-flow value.
    pub fn max_flow(&mut self, source: NodeIndex, sink: NodeIndex) -> f64 {
        let mut total = 0.0;
        while let Some((path, bottleneck)) = self.find_augmenting_path(source, sink) {
            for edge in &path {
                let reverse = self.reverse[edge];
                *self.graph.edge_weight_mut(*edge).unwrap() -= bottleneck;
                *self.graph.edge_weight_mut(reverse).unwrap() += bottleneck;
            }
            total += bottleneck;
        }
        total
    }

    fn find_augmenting_path(&self, source: NodeIndex, sink: NodeIndex) -> Option<(Vec<EdgeIndex>, f64)> {
        let mut predecessor: HashMap<NodeIndex, EdgeIndex> = HashMap::new();
        let mut visited = HashMap::new();
        visited.insert(source, true);
        let mut queue = VecDeque::from([source]);

        while let Some(node) = queue.pop_front() {
            if node == sink {
                break;
            }
            for edge in self.graph.edges(node) {
                let capacity = *edge.weight();
                if capacity <= 0.0 {
                    continue;
                }
                let next = edge.target();
                if visited.insert(next, true).is_none() {
                    predecessor.insert(next, edge.id());
                    queue.push_back(next);
                }
            }
        }

        if !visited.contains_key(&sink) {
            return None;
        }

        let mut path = Vec::new();
        let mut node = sink;
        let mut bottleneck = f64::INFINITY;
        while node != source {
            let edge = predecessor[&node];
            bottleneck = bottleneck.min(self.graph[edge]);
            path.push(edge);
            node = self.graph.edge_endpoints(edge).unwrap().0;
        }
        path.reverse();
        Some((path, bottleneck))
    }

    /// Nodes reachable from `source` over edges with positive residual
    /// capacity, i.e. the source side of the min cut once `max_flow` has
    /// saturated the network.
    pub fn reachable_from(&self, source: NodeIndex) -> HashMap<NodeIndex, bool> {
        let mut visited = HashMap::new();
        visited.insert(source, true);
        let mut queue = VecDeque::from([source]);
        while let Some(node) = queue.pop_front() {
            for edge in self.graph.edges(node) {
                if *edge.weight() > 0.0 {
                    let next = edge.target();
                    if visited.insert(next, true).is_none() {
                        queue.push_back(next);
                    }
                }
            }
        }
        visited
    }
}
