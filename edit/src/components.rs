use chunkedgraph_hierarchy::AtomicEdge;
use chunkedgraph_ids::NodeId;
use std::collections::HashMap;

/// Plain union-find over a fixed node set, reused from the same "active
/// edges in one component" idea the chunk builder (§4.8) applies at
/// build time, here recomputing a level-2 parent's supervoxel membership
/// after an edit adds or removes atomic edges.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Groups `nodes` into connected components under `active_edges` (both
/// endpoints must be present in `nodes`; edges to nodes outside the set are
/// ignored — those are cross-chunk and tracked separately).
pub fn connected_components(nodes: &[NodeId], active_edges: &[AtomicEdge]) -> Vec<Vec<NodeId>> {
    let index: HashMap<NodeId, usize> = nodes.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let mut uf = UnionFind::new(nodes.len());
    for edge in active_edges {
        if let (Some(&ia), Some(&ib)) = (index.get(&edge.0), index.get(&edge.1)) {
            uf.union(ia, ib);
        }
    }

    let mut groups: HashMap<usize, Vec<NodeId>> = HashMap::new();
    for (i, &node) in nodes.iter().enumerate() {
        let root = uf.find(i);
        groups.entry(root).or_default().push(node);
    }
    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_pairs_form_two_components() {
        let a = NodeId::new(1);
        let b = NodeId::new(2);
        let c = NodeId::new(3);
        let d = NodeId::new(4);
        let nodes = vec![a, b, c, d];
        let edges = vec![AtomicEdge::new(a, b), AtomicEdge::new(c, d)];
        let mut components = connected_components(&nodes, &edges);
        components.sort_by_key(|c| c.iter().map(|n| n.raw()).min());
        assert_eq!(components.len(), 2);
    }

    #[test]
    fn chain_forms_one_component() {
        let a = NodeId::new(1);
        let b = NodeId::new(2);
        let c = NodeId::new(3);
        let nodes = vec![a, b, c];
        let edges = vec![AtomicEdge::new(a, b), AtomicEdge::new(b, c)];
        let components = connected_components(&nodes, &edges);
        assert_eq!(components.len(), 1);
    }

    #[test]
    fn isolated_node_is_its_own_component() {
        let a = NodeId::new(1);
        let b = NodeId::new(2);
        let nodes = vec![a, b];
        let components = connected_components(&nodes, &[]);
        assert_eq!(components.len(), 2);
    }
}
