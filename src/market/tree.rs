//! Rooting the network so that leaves sit at similar depths.
use super::Market;
use anyhow::{Result, ensure};
use log::debug;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

/// The result of walking the network outwards from a root
#[derive(Debug, Clone)]
pub(super) struct Traversal {
    /// Nodes in the order they were reached; every parent precedes its children
    pub order: Vec<NodeIndex>,
    /// The edge leading to each node's parent (indexed by node index)
    pub parent_edge: Vec<Option<EdgeIndex>>,
    /// The edges leading to each node's children (indexed by node index)
    pub children: Vec<Vec<(EdgeIndex, NodeIndex)>>,
    /// Number of edges between each node and the root (indexed by node index)
    pub depth: Vec<usize>,
}

impl Traversal {
    /// Whether the node has no children
    pub fn is_leaf(&self, node: NodeIndex) -> bool {
        self.children[node.index()].is_empty()
    }

    /// The nodes on the way from the root to `node`, inclusive
    pub fn path_to(&self, market: &Market, node: NodeIndex) -> Vec<NodeIndex> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(edge) = self.parent_edge[current.index()] {
            current = market.graph[edge].other_node(current);
            path.push(current);
        }
        path.reverse();

        path
    }
}

impl Market {
    /// Walk the network depth-first from `root`
    pub(super) fn traverse(&self, root: NodeIndex) -> Traversal {
        let n = self.graph.node_count();
        let mut traversal = Traversal {
            order: Vec::with_capacity(n),
            parent_edge: vec![None; n],
            children: vec![Vec::new(); n],
            depth: vec![0; n],
        };

        let mut visited = vec![false; n];
        visited[root.index()] = true;
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            traversal.order.push(node);
            for edge in self.graph.edges(node) {
                let next = edge.weight().other_node(node);
                if visited[next.index()] {
                    continue;
                }

                visited[next.index()] = true;
                traversal.parent_edge[next.index()] = Some(edge.id());
                traversal.children[node.index()].push((edge.id(), next));
                traversal.depth[next.index()] = traversal.depth[node.index()] + 1;
                stack.push(next);
            }
        }

        traversal
    }

    /// Choose a root that keeps the depths of the shallowest and deepest leaves within one of
    /// each other where possible, and record depths and leaves for that root.
    pub fn build_min_depth_tree(&mut self) -> Result<()> {
        ensure!(
            self.graph.node_count() > 0,
            "Cannot build a tree for an empty market"
        );

        // Start from the first node that is not a leaf, if there is one
        let probe = self
            .graph
            .node_indices()
            .find(|&node| self.graph.edges(node).count() >= 2)
            .unwrap_or(NodeIndex::new(0));
        let traversal = self.traverse(probe);
        ensure!(
            traversal.order.len() == self.graph.node_count(),
            "The market is not connected"
        );

        let (shallow, deep) = extreme_leaves(&traversal);
        let (min_depth, max_depth) = (
            traversal.depth[shallow.index()],
            traversal.depth[deep.index()],
        );
        let root = if max_depth - min_depth <= 1 {
            probe
        } else {
            // Walk between the two leaves and stop halfway
            let path = self.traverse(shallow).path_to(self, deep);
            path.get((min_depth + max_depth) / 2)
                .copied()
                .unwrap_or(probe)
        };

        let traversal = self.traverse(root);
        for node in self.graph.node_indices() {
            let weight = &mut self.graph[node];
            weight.depth = traversal.depth[node.index()];
            weight.is_leaf = traversal.is_leaf(node);
        }
        self.root = Some(root);
        debug!("Rooted market tree at node {}", self.graph[root].id);

        Ok(())
    }
}

/// The shallowest and deepest leaves, earliest in traversal order on ties
fn extreme_leaves(traversal: &Traversal) -> (NodeIndex, NodeIndex) {
    let mut leaves = traversal
        .order
        .iter()
        .copied()
        .filter(|&node| traversal.is_leaf(node));

    // A traversal always ends in at least one leaf
    let first = leaves.next().unwrap_or(traversal.order[0]);
    let (mut shallow, mut deep) = (first, first);
    for leaf in leaves {
        let depth = traversal.depth[leaf.index()];
        if depth < traversal.depth[shallow.index()] {
            shallow = leaf;
        }
        if depth > traversal.depth[deep.index()] {
            deep = leaf;
        }
    }

    (shallow, deep)
}
