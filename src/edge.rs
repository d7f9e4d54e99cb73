//! Transport links between nodes and their cost regimes.
use crate::curve::{EPS, INF, Interval, LinearFunction, Piece, PiecewiseCurve};
use anyhow::{Result, ensure};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Where an edge sits in the network and which way it carries goods relative to the hub
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// A spoke feeding the hub
    StarToCenter,
    /// A spoke fed by the hub
    StarFromCenter,
    /// A chain link carrying goods towards the hub
    ChainToCenter,
    /// A chain link carrying goods away from the hub
    ChainFromCenter,
}

impl EdgeKind {
    /// Whether the edge is a spoke attached directly to the hub
    pub fn is_star(self) -> bool {
        matches!(self, Self::StarToCenter | Self::StarFromCenter)
    }

    /// Whether the edge is part of a chain
    pub fn is_chain(self) -> bool {
        !self.is_star()
    }

    /// Whether the edge carries goods towards the hub
    pub fn flows_to_center(self) -> bool {
        matches!(self, Self::StarToCenter | Self::ChainToCenter)
    }
}

/// Outcome of the expansion heuristic for an edge
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Classification {
    /// Committed to expansion
    LPlus,
    /// Committed to fixed capacity
    LMinus,
    /// Not decided yet
    #[default]
    Undefined,
}

/// Cost parameters of an edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeParameters {
    /// Cost of moving one unit of goods
    pub unit_cost: f64,
    /// Quantity the edge can carry without expansion
    pub base_capacity: f64,
    /// One-off cost paid whenever the edge is expanded
    pub fixed_expand_cost: f64,
    /// Coefficient of the quadratic cost of flow beyond the base capacity
    pub expand_coeff: f64,
}

impl EdgeParameters {
    /// Check that the parameters describe a usable edge
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.unit_cost >= 0.0,
            "Unit cost must be non-negative, got {}",
            self.unit_cost
        );
        ensure!(
            self.base_capacity > 0.0 && self.base_capacity < INF,
            "Base capacity must be in (0, {INF}), got {}",
            self.base_capacity
        );
        ensure!(
            self.fixed_expand_cost >= 0.0,
            "Fixed expansion cost must be non-negative, got {}",
            self.fixed_expand_cost
        );
        ensure!(
            self.expand_coeff >= 0.0,
            "Expansion coefficient must be non-negative, got {}",
            self.expand_coeff
        );

        Ok(())
    }
}

/// A transport link between two nodes
#[derive(Debug, Clone)]
pub struct Edge {
    /// Node the edge starts at
    pub from: NodeIndex,
    /// Node the edge ends at
    pub to: NodeIndex,
    /// Position and direction relative to the hub
    pub kind: EdgeKind,
    /// Cost parameters
    pub params: EdgeParameters,
    expand: bool,
    marginal_cost: PiecewiseCurve,
    /// Outcome of the expansion heuristic
    pub classification: Classification,
    /// Quantity carried from the child node towards its parent in the solver's tree
    pub flow: f64,
    /// The endpoint that is the parent in the solver's tree
    pub tree_parent: Option<NodeIndex>,
    /// Export curve of the child's subtree as seen from the parent (price to quantity).
    ///
    /// Set by `Market::solve`.
    pub contribution: Option<PiecewiseCurve>,
}

impl PartialEq for Edge {
    /// Edges are equal if they link the same pair of nodes, in either direction
    fn eq(&self, other: &Self) -> bool {
        (self.from == other.from && self.to == other.to)
            || (self.from == other.to && self.to == other.from)
    }
}

impl Edge {
    /// Create a new edge with fixed capacity
    pub fn new(
        from: NodeIndex,
        to: NodeIndex,
        kind: EdgeKind,
        params: EdgeParameters,
    ) -> Result<Self> {
        params.validate()?;
        let marginal_cost = marginal_cost_curve(&params, false)?;

        Ok(Self {
            from,
            to,
            kind,
            params,
            expand: false,
            marginal_cost,
            classification: Classification::Undefined,
            flow: 0.0,
            tree_parent: None,
            contribution: None,
        })
    }

    /// Whether the edge may carry flow beyond its base capacity
    pub fn is_expanded(&self) -> bool {
        self.expand
    }

    /// Switch between the fixed and expandable cost regimes
    pub fn set_expand(&mut self, expand: bool) -> Result<()> {
        if expand != self.expand {
            self.marginal_cost = marginal_cost_curve(&self.params, expand)?;
            self.expand = expand;
        }

        Ok(())
    }

    /// Marginal transport cost as a function of quantity carried
    pub fn marginal_cost(&self) -> &PiecewiseCurve {
        &self.marginal_cost
    }

    /// Total transport cost of carrying `quantity` (in either direction)
    pub fn total_cost(&self, quantity: f64) -> Result<f64> {
        let q = quantity.abs();
        let EdgeParameters {
            unit_cost,
            base_capacity,
            fixed_expand_cost,
            expand_coeff,
        } = self.params;

        if self.expand {
            let excess = (q - base_capacity).max(0.0);
            return Ok(fixed_expand_cost + expand_coeff * excess * excess + unit_cost * q);
        }

        ensure!(
            q <= base_capacity + EPS,
            "Capacity exceeded: flow {q} on an edge with capacity {base_capacity}"
        );
        Ok(unit_cost * q)
    }

    /// The endpoint at the other end of the edge from `node`
    pub fn other_node(&self, node: NodeIndex) -> NodeIndex {
        if node == self.from { self.to } else { self.from }
    }
}

/// Build the marginal cost curve for the given regime.
///
/// Below zero quantity the price gap may fall without bound. A fixed edge has a vertical wall at
/// its capacity; an expandable edge continues with slope `2 * expand_coeff`.
fn marginal_cost_curve(params: &EdgeParameters, expand: bool) -> Result<PiecewiseCurve> {
    let EdgeParameters {
        unit_cost,
        base_capacity,
        expand_coeff,
        ..
    } = *params;

    let mut pieces = vec![
        Piece::vertical(-INF, unit_cost, 0.0)?,
        Piece::linear(LinearFunction::constant(unit_cost), 0.0, base_capacity)?,
    ];
    let domain = if expand {
        let line = LinearFunction::new(
            -2.0 * expand_coeff,
            1.0,
            unit_cost - 2.0 * expand_coeff * base_capacity,
        )?;
        pieces.push(Piece::linear(line, base_capacity, INF)?);
        Interval::new(0.0, INF)
    } else {
        pieces.push(Piece::vertical(unit_cost, unit_cost + INF, base_capacity)?);
        Interval::new(0.0, base_capacity)
    };

    Ok(PiecewiseCurve::new(pieces, domain)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};
    use std::str::FromStr;

    fn params() -> EdgeParameters {
        EdgeParameters {
            unit_cost: 1.0,
            base_capacity: 2.0,
            fixed_expand_cost: 0.5,
            expand_coeff: 0.25,
        }
    }

    #[fixture]
    fn edge() -> Edge {
        Edge::new(
            NodeIndex::new(1),
            NodeIndex::new(0),
            EdgeKind::StarToCenter,
            params(),
        )
        .unwrap()
    }

    #[rstest]
    fn test_marginal_cost_fixed(edge: Edge) {
        let mc = edge.marginal_cost();
        assert_eq!(mc.domain(), Interval::new(0.0, 2.0));
        assert_eq!(mc.value_at(0.0).unwrap(), Interval::new(-INF, 1.0));
        assert_eq!(mc.value_at(1.0).unwrap(), Interval::point(1.0));
        assert_eq!(mc.value_at(2.0).unwrap(), Interval::new(1.0, 1.0 + INF));
        assert!(mc.value_at(3.0).is_err());
    }

    #[rstest]
    fn test_marginal_cost_expanded(mut edge: Edge) {
        edge.set_expand(true).unwrap();
        let mc = edge.marginal_cost();
        assert_eq!(mc.domain(), Interval::new(0.0, INF));
        assert_eq!(mc.value_at(1.0).unwrap(), Interval::point(1.0));
        let at_four = mc.value_at(4.0).unwrap().single_point().unwrap();
        assert_approx_eq!(f64, at_four, 2.0); // 1 + 2 * 0.25 * (4 - 2)

        edge.set_expand(false).unwrap();
        assert_eq!(edge.marginal_cost().domain(), Interval::new(0.0, 2.0));
    }

    #[rstest]
    #[case(0.0, 0.0)]
    #[case(1.5, 1.5)]
    #[case(-2.0, 2.0)]
    fn test_total_cost_fixed(edge: Edge, #[case] q: f64, #[case] expected: f64) {
        assert_approx_eq!(f64, edge.total_cost(q).unwrap(), expected);
    }

    #[rstest]
    fn test_total_cost_capacity_exceeded(edge: Edge) {
        assert_error!(
            edge.total_cost(3.0),
            "Capacity exceeded: flow 3 on an edge with capacity 2"
        );
    }

    #[rstest]
    #[case(0.0, 0.5)]
    #[case(1.0, 1.5)]
    #[case(4.0, 5.5)] // 0.5 + 0.25 * 2^2 + 4
    #[case(-4.0, 5.5)]
    fn test_total_cost_expanded(mut edge: Edge, #[case] q: f64, #[case] expected: f64) {
        edge.set_expand(true).unwrap();
        assert_approx_eq!(f64, edge.total_cost(q).unwrap(), expected);
    }

    #[rstest]
    #[case(EdgeParameters { unit_cost: -1.0, ..params() })]
    #[case(EdgeParameters { base_capacity: 0.0, ..params() })]
    #[case(EdgeParameters { base_capacity: INF, ..params() })]
    #[case(EdgeParameters { fixed_expand_cost: -0.1, ..params() })]
    #[case(EdgeParameters { expand_coeff: -0.1, ..params() })]
    fn test_invalid_parameters(#[case] params: EdgeParameters) {
        let edge = Edge::new(
            NodeIndex::new(0),
            NodeIndex::new(1),
            EdgeKind::ChainToCenter,
            params,
        );
        assert!(edge.is_err());
    }

    #[rstest]
    fn test_equality_ignores_direction(edge: Edge) {
        let reversed = Edge::new(
            NodeIndex::new(0),
            NodeIndex::new(1),
            EdgeKind::StarFromCenter,
            params(),
        )
        .unwrap();
        assert_eq!(edge, reversed);
        assert_eq!(edge.other_node(NodeIndex::new(1)), NodeIndex::new(0));
        assert_eq!(edge.other_node(NodeIndex::new(0)), NodeIndex::new(1));
    }

    #[test]
    fn test_edge_kind() {
        assert!(EdgeKind::StarToCenter.is_star());
        assert!(EdgeKind::ChainFromCenter.is_chain());
        assert!(EdgeKind::ChainToCenter.flows_to_center());
        assert!(!EdgeKind::StarFromCenter.flows_to_center());
        assert_eq!(
            EdgeKind::from_str("CHAIN_TO_CENTER").unwrap(),
            EdgeKind::ChainToCenter
        );
        assert_eq!(EdgeKind::StarFromCenter.to_string(), "STAR_FROM_CENTER");
    }
}
