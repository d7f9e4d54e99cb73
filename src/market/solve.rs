//! Equilibrium prices and flows for a rooted market.
use super::Market;
use crate::curve::{EPS, PiecewiseCurve};
use anyhow::{Context, Result, bail, ensure};
use float_cmp::approx_eq;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

/// Evaluate `curve` at `x`, settling ties on flat or vertical pieces with `lambda`.
///
/// A point value on a horizontal piece updates `lambda` to where `x` sits along that piece, so
/// that nodes further down the tree break ties the same way. A range of values is resolved to the
/// value a fraction `lambda` of the way through it.
fn resolve(curve: &PiecewiseCurve, x: f64, lambda: &mut f64) -> Result<f64> {
    let value = curve.value_at(x)?;
    if !value.is_point() {
        return Ok(value.at_fraction(*lambda));
    }

    if let Some(segment) = curve.horizontal_segment_containing(x) {
        *lambda = segment.fraction_of(x.clamp(segment.lo(), segment.hi()))?;
    }

    Ok(value.lo())
}

impl Market {
    /// Find equilibrium prices, quantities and flows under the current expansion flags.
    ///
    /// The tree must have been built with [`Market::build_min_depth_tree`]. The solution is
    /// checked with [`Market::check_solution`] before returning.
    pub fn solve(&mut self) -> Result<()> {
        let root = self
            .root
            .context("The tree must be built before solving")?;
        let traversal = self.traverse(root);

        for node in self.graph.node_indices() {
            let weight = &mut self.graph[node];
            weight.depth = traversal.depth[node.index()];
            weight.is_leaf = traversal.is_leaf(node);
            weight.balance = None;
            if let Some(edge) = traversal.parent_edge[node.index()] {
                let edge = &mut self.graph[edge];
                edge.tree_parent = Some(edge.other_node(node));
            }
        }

        // Children before parents
        for &node in traversal.order.iter().rev() {
            let mut balance = self.graph[node].net_supply.clone();
            for &(edge, child) in &traversal.children[node.index()] {
                let contribution = self.contribution(edge, child)?;
                balance = balance.try_add(&contribution).with_context(|| {
                    format!(
                        "Could not combine the balance of node {} with its subtree",
                        self.graph[node].id
                    )
                })?;
                self.graph[edge].contribution = Some(contribution);
            }
            self.graph[node].balance = Some(balance);
        }

        // Parents before children
        let mut lambdas = vec![0.0; self.graph.node_count()];
        for &node in &traversal.order {
            let (flow, mut lambda) = match traversal.parent_edge[node.index()] {
                None => (0.0, 0.0),
                Some(edge) => {
                    let parent = self.graph[edge].other_node(node);
                    let mut lambda = lambdas[parent.index()];
                    let contribution = self.graph[edge]
                        .contribution
                        .as_ref()
                        .context("Missing contribution curve")?;
                    let flow = resolve(contribution, self.graph[parent].price, &mut lambda)?;
                    self.graph[edge].flow = flow;
                    (flow, lambda)
                }
            };

            let weight = &mut self.graph[node];
            let balance = weight
                .balance
                .as_ref()
                .context("Missing balance curve")?
                .inverse()?;
            let price = resolve(&balance, flow, &mut lambda)?;
            weight.price = price;
            weight.produced = weight.supply.value_at(price)?.at_fraction(lambda);
            weight.consumed = weight.demand.value_at(price)?.at_fraction(1.0 - lambda);
            lambdas[node.index()] = lambda;
        }

        self.check_solution()
    }

    /// How much the subtree below `edge` adds to the net supply of its parent, by parent price
    fn contribution(&self, edge: EdgeIndex, child_index: NodeIndex) -> Result<PiecewiseCurve> {
        let edge = &self.graph[edge];
        let child = &self.graph[child_index];
        let balance = child
            .balance
            .as_ref()
            .with_context(|| format!("Node {} has not been balanced", child.id))?;

        // Flow away from the child runs against the edge when the child is its destination
        let cost = if edge.from == child_index {
            edge.marginal_cost().clone()
        } else {
            edge.marginal_cost().mirror()
        };

        let contribution = balance
            .inverse()?
            .try_add(&cost)
            .with_context(|| format!("Could not price transport from node {}", child.id))?
            .inverse()?;

        Ok(contribution)
    }

    /// Check that the last solution is a market equilibrium.
    ///
    /// Every node must clear at its price, and every edge must carry flow only when the price gap
    /// across it covers the marginal cost of transport.
    pub fn check_solution(&self) -> Result<()> {
        for node in self.graph.node_indices() {
            self.check_node(node)?;
        }
        for edge in self.graph.edge_indices() {
            self.check_edge(edge)?;
        }

        Ok(())
    }

    fn check_node(&self, index: NodeIndex) -> Result<()> {
        let node = &self.graph[index];
        let supplied = node.supply.value_at(node.price)?;
        ensure!(
            supplied.contains_approx(node.produced, EPS),
            "Node {} produces {} but supplies {supplied} at price {}",
            node.id,
            node.produced,
            node.price
        );
        let demanded = node.demand.value_at(node.price)?;
        ensure!(
            demanded.contains_approx(node.consumed, EPS),
            "Node {} consumes {} but demands {demanded} at price {}",
            node.id,
            node.consumed,
            node.price
        );

        let mut exported = 0.0;
        for edge in self.graph.edges(index) {
            let edge = edge.weight();
            if edge.tree_parent == Some(index) {
                exported -= edge.flow;
            } else {
                exported += edge.flow;
            }
        }
        let net = node.net_supply.value_at(node.price)?;
        ensure!(
            net.contains_approx(exported, EPS),
            "Node {} exports {exported} but has net supply {net} at price {}",
            node.id,
            node.price
        );

        Ok(())
    }

    fn check_edge(&self, index: EdgeIndex) -> Result<()> {
        let edge = &self.graph[index];
        let (from, to) = (&self.graph[edge.from], &self.graph[edge.to]);
        let Some(parent) = edge.tree_parent else {
            bail!("Edge from {} to {} has not been solved", from.id, to.id);
        };

        let shipped = if edge.other_node(parent) == edge.from {
            edge.flow
        } else {
            -edge.flow
        };
        let gap = to.price - from.price;
        let unit_cost = edge.params.unit_cost;
        let capacity = edge.params.base_capacity;
        let describe = || format!("Edge from {} to {} ships {shipped}", from.id, to.id);

        ensure!(shipped >= -EPS, "{} against its direction", describe());
        if shipped <= EPS {
            ensure!(
                gap <= unit_cost + EPS,
                "{} with a price gap {gap} above the unit cost {unit_cost}",
                describe()
            );
        } else if shipped < capacity - EPS || (shipped <= capacity + EPS && edge.is_expanded()) {
            ensure!(
                approx_eq!(f64, gap, unit_cost, epsilon = EPS),
                "{} with a price gap {gap} different from the unit cost {unit_cost}",
                describe()
            );
        } else if shipped <= capacity + EPS {
            ensure!(
                gap >= unit_cost - EPS,
                "{} at capacity with a price gap {gap} below the unit cost {unit_cost}",
                describe()
            );
        } else {
            ensure!(
                edge.is_expanded(),
                "{} beyond its capacity {capacity}",
                describe()
            );
            let marginal = unit_cost + 2.0 * edge.params.expand_coeff * (shipped - capacity);
            ensure!(
                approx_eq!(f64, gap, marginal, epsilon = EPS),
                "{} with a price gap {gap} different from the marginal cost {marginal}",
                describe()
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{LinearFunction, Piece};
    use crate::fixture::{
        assert_error, four_node_market, star_chain_market, subtask2_market, subtask3_market,
        two_node_market,
    };
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn prices(market: &Market) -> Vec<f64> {
        market.nodes().map(|(_, node)| node.price).collect()
    }

    fn flows(market: &Market) -> Vec<f64> {
        market.edges().map(|(_, edge)| edge.flow).collect()
    }

    fn assert_all_approx_eq(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (actual, expected) in actual.iter().zip(expected) {
            assert_approx_eq!(f64, *actual, *expected, epsilon = 1e-7);
        }
    }

    #[test]
    fn test_resolve() {
        // Flat at 2 on [0, 4], vertical at 4 over [2, 6]
        let curve = PiecewiseCurve::from_pieces(vec![
            Piece::linear(LinearFunction::constant(2.0), 0.0, 4.0).unwrap(),
            Piece::vertical(2.0, 6.0, 4.0).unwrap(),
        ])
        .unwrap();

        let mut lambda = 0.5;
        assert_approx_eq!(f64, resolve(&curve, 1.0, &mut lambda).unwrap(), 2.0);
        assert_approx_eq!(f64, lambda, 0.25);
        assert_approx_eq!(f64, resolve(&curve, 4.0, &mut lambda).unwrap(), 3.0);
        assert_approx_eq!(f64, lambda, 0.25);
    }

    #[rstest]
    fn test_solve_without_tree(mut four_node_market: Market) {
        assert_error!(
            four_node_market.solve(),
            "The tree must be built before solving"
        );
    }

    #[rstest]
    fn test_four_node_net_supply(four_node_market: Market) {
        let hub = four_node_market.node(NodeIndex::new(0));
        let line = LinearFunction::new(-2.0, 1.0, -6.0).unwrap();
        assert_eq!(
            hub.net_supply.pieces(),
            [
                Piece::linear(line, 0.0, 6.0).unwrap(),
                Piece::linear(line, 6.0, 20.0).unwrap()
            ]
        );
    }

    #[rstest]
    fn test_solve_four_node(mut four_node_market: Market) {
        four_node_market.build_min_depth_tree().unwrap();
        four_node_market.solve().unwrap();

        assert_all_approx_eq(&prices(&four_node_market), &[7.0 / 3.0, 4.0 / 3.0, 4.0, 1.5]);
        assert_all_approx_eq(&flows(&four_node_market), &[4.0 / 3.0, 0.0, 0.0]);
        let produced: Vec<_> = four_node_market.nodes().map(|(_, n)| n.produced).collect();
        assert_all_approx_eq(&produced, &[7.0 / 3.0, 8.0 / 3.0, 4.0, 3.0]);
        let consumed: Vec<_> = four_node_market.nodes().map(|(_, n)| n.consumed).collect();
        assert_all_approx_eq(&consumed, &[11.0 / 3.0, 4.0 / 3.0, 4.0, 3.0]);
        assert_approx_eq!(
            f64,
            four_node_market.welfare().unwrap(),
            32.0 + 1.0 / 6.0,
            epsilon = 1e-7
        );

        // Every edge hangs off the hub
        for (_, edge) in four_node_market.edges() {
            assert_eq!(edge.tree_parent, Some(NodeIndex::new(0)));
            assert!(edge.contribution.is_some());
        }
    }

    #[rstest]
    fn test_solve_subtask2(mut subtask2_market: Market) {
        subtask2_market.build_min_depth_tree().unwrap();
        subtask2_market.solve().unwrap();
        assert_all_approx_eq(&prices(&subtask2_market), &[2.0, 2.0, 3.0, 4.0]);
    }

    #[rstest]
    fn test_solve_subtask3(mut subtask3_market: Market) {
        subtask3_market.build_min_depth_tree().unwrap();
        subtask3_market.solve().unwrap();
        assert_all_approx_eq(
            &prices(&subtask3_market),
            &[10.0 / 3.0, 14.0 / 3.0, 2.0, 2.0],
        );
        assert_all_approx_eq(&flows(&subtask3_market), &[-1.0, 0.0, 0.0]);
    }

    #[rstest]
    #[case(false, 9.0, 3.0, 1.0, 58.0)]
    #[case(true, 22.0 / 3.0, 14.0 / 3.0, 8.0 / 3.0, 555.0 / 9.0)]
    fn test_solve_two_node(
        mut two_node_market: Market,
        #[case] expand: bool,
        #[case] hub_price: f64,
        #[case] spoke_price: f64,
        #[case] flow: f64,
        #[case] welfare: f64,
    ) {
        two_node_market.set_expand_by_mask(expand.into()).unwrap();
        two_node_market.build_min_depth_tree().unwrap();
        two_node_market.solve().unwrap();

        assert_all_approx_eq(&prices(&two_node_market), &[hub_price, spoke_price]);
        assert_all_approx_eq(&flows(&two_node_market), &[flow]);
        assert_approx_eq!(
            f64,
            two_node_market.welfare().unwrap(),
            welfare,
            epsilon = 1e-7
        );
    }

    #[rstest]
    fn test_solve_twice(mut four_node_market: Market) {
        four_node_market.build_min_depth_tree().unwrap();
        four_node_market.solve().unwrap();
        let first = prices(&four_node_market);
        four_node_market.solve().unwrap();
        assert_eq!(prices(&four_node_market), first);
    }

    #[test]
    fn test_solve_star_chain() {
        let mut market = star_chain_market(2, 2, 3);
        market.extend_curves_to_common_price().unwrap();
        market.build_min_depth_tree().unwrap();
        market.solve().unwrap();
        assert!(market.welfare().unwrap() > 0.0);
    }

    #[rstest]
    fn test_check_solution_detects_bad_price(mut four_node_market: Market) {
        four_node_market.build_min_depth_tree().unwrap();
        four_node_market.solve().unwrap();
        four_node_market.graph[NodeIndex::new(1)].price = 2.0;
        assert!(four_node_market.check_solution().is_err());
    }

    #[rstest]
    fn test_check_solution_detects_excess_flow(mut two_node_market: Market) {
        two_node_market.build_min_depth_tree().unwrap();
        two_node_market.solve().unwrap();

        // Move goods past the fixed capacity while keeping both nodes cleared
        let edge = EdgeIndex::new(0);
        two_node_market.graph[edge].flow = 2.0;
        assert!(two_node_market.check_solution().is_err());
    }

    #[rstest]
    #[case(1e-9, true)]
    #[case(1e-3, false)]
    fn test_check_solution_price_gap_tolerance(
        mut two_node_market: Market,
        #[case] shift: f64,
        #[case] accepted: bool,
    ) {
        two_node_market.set_expand_by_mask(1).unwrap();
        two_node_market.build_min_depth_tree().unwrap();
        two_node_market.solve().unwrap();

        // Raise the price at the destination of the only edge
        two_node_market.graph[NodeIndex::new(0)].price += shift;
        assert_eq!(two_node_market.check_solution().is_ok(), accepted);
    }

    #[rstest]
    fn test_check_solution_unsolved(four_node_market: Market) {
        assert!(four_node_market.check_solution().is_err());
    }
}
