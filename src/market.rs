//! The trade network: nodes joined by edges into a tree around a central hub.
use crate::edge::{Edge, EdgeKind, EdgeParameters};
use crate::id::HasID;
use crate::node::{Node, NodeID};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use petgraph::algo::connected_components;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};

mod solve;
mod tree;

/// Markets joined by transport links.
///
/// Nodes and edges are stored in an undirected graph and addressed by their indices, which are
/// assigned in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Market {
    graph: UnGraph<Node, Edge>,
    node_ids: IndexMap<NodeID, NodeIndex>,
    central_node: Option<NodeIndex>,
    root: Option<NodeIndex>,
}

impl Market {
    /// Create an empty market
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, optionally marking it as the central hub
    pub fn add_node(&mut self, node: Node, is_central: bool) -> Result<NodeIndex> {
        let id = node.get_id().clone();
        ensure!(
            !self.node_ids.contains_key(&id),
            "Node {id} is already in the market"
        );

        let index = self.graph.add_node(node);
        self.node_ids.insert(id, index);
        if is_central {
            self.central_node = Some(index);
        }
        self.root = None;

        Ok(index)
    }

    /// Link two existing nodes.
    ///
    /// Goods can only move from `from` to `to`.
    pub fn add_edge(
        &mut self,
        from: &NodeID,
        to: &NodeID,
        kind: EdgeKind,
        params: EdgeParameters,
    ) -> Result<EdgeIndex> {
        let from_index = self.node_index(from)?;
        let to_index = self.node_index(to)?;
        ensure!(from_index != to_index, "Edge from {from} to itself");
        ensure!(
            self.graph.find_edge(from_index, to_index).is_none(),
            "Nodes {from} and {to} are already linked"
        );

        let edge = Edge::new(from_index, to_index, kind, params)
            .with_context(|| format!("Invalid edge from {from} to {to}"))?;
        self.root = None;

        Ok(self.graph.add_edge(from_index, to_index, edge))
    }

    /// Look up the index of a node by its ID
    pub fn node_index(&self, id: &NodeID) -> Result<NodeIndex> {
        self.node_ids
            .get(id)
            .copied()
            .with_context(|| format!("Unknown node {id}"))
    }

    /// Look up a node by its ID
    pub fn node_by_id(&self, id: &NodeID) -> Result<&Node> {
        Ok(&self.graph[self.node_index(id)?])
    }

    /// Get a node by its index
    pub fn node(&self, index: NodeIndex) -> &Node {
        &self.graph[index]
    }

    /// Get an edge by its index
    pub fn edge(&self, index: EdgeIndex) -> &Edge {
        &self.graph[index]
    }

    pub(crate) fn edge_mut(&mut self, index: EdgeIndex) -> &mut Edge {
        &mut self.graph[index]
    }

    /// Iterate over nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.graph
            .node_indices()
            .map(move |index| (index, &self.graph[index]))
    }

    /// Iterate over edges in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (EdgeIndex, &Edge)> {
        self.graph
            .edge_indices()
            .map(move |index| (index, &self.graph[index]))
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The central hub, if one has been designated
    pub fn central_node(&self) -> Option<NodeIndex> {
        self.central_node
    }

    /// The root chosen by [`Market::build_min_depth_tree`]
    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    /// Switch an edge between the fixed and expandable cost regimes
    pub fn set_expand(&mut self, index: EdgeIndex, expand: bool) -> Result<()> {
        self.graph[index].set_expand(expand)
    }

    /// Set the cost regime of every edge at once: bit `i` of `mask` expands edge `i`
    pub fn set_expand_by_mask(&mut self, mask: u64) -> Result<()> {
        ensure!(
            self.edge_count() <= 64,
            "Cannot address {} edges with a 64-bit mask",
            self.edge_count()
        );

        for index in self.graph.edge_indices() {
            let expand = (mask >> index.index()) & 1 == 1;
            self.graph[index].set_expand(expand)?;
        }

        Ok(())
    }

    /// Extend every node's curves to one past the highest price at which any demand vanishes
    pub fn extend_curves_to_common_price(&mut self) -> Result<()> {
        let mut max_price = f64::NEG_INFINITY;
        for node in self.graph.node_weights() {
            max_price = max_price.max(node.demand_zero_price()?);
        }

        let price = max_price + 1.0;
        for node in self.graph.node_weights_mut() {
            node.extend_curves_to(price)
                .with_context(|| format!("Could not extend curves of node {}", node.id))?;
        }

        Ok(())
    }

    /// Whether the edges join every node without forming a cycle
    pub fn is_tree(&self) -> bool {
        self.edge_count() + 1 == self.node_count() && connected_components(&self.graph) == 1
    }

    /// Total surplus of consumers and producers minus the cost of transport.
    ///
    /// Uses the quantities found by the last call to [`Market::solve`].
    pub fn welfare(&self) -> Result<f64> {
        let mut welfare = 0.0;
        for node in self.graph.node_weights() {
            let utility = node.demand.inverse()?.integrate(0.0, node.consumed)?;
            let cost = node.supply.inverse()?.integrate(0.0, node.produced)?;
            welfare += utility - cost;
        }
        for edge in self.graph.edge_weights() {
            welfare -= edge.total_cost(edge.flow)?;
        }

        Ok(welfare)
    }
}
