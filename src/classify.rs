//! Heuristic choice of which edges to expand.
//!
//! Edges start out undefined and are committed one at a time to expansion ([`Classification::LPlus`])
//! or fixed capacity ([`Classification::LMinus`]) by comparing the welfare of the market with and
//! without the edge expanded.
use crate::edge::{Classification, Edge, EdgeKind};
use crate::market::Market;
use anyhow::Result;
use itertools::Itertools;
use log::{debug, info};
use petgraph::graph::EdgeIndex;

/// How the kinds of two edges relate when one is tested for expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    /// Both carry goods the same way relative to the hub, so compete for the same trade
    Concurrent,
    /// They carry goods in opposite directions, so one feeds the other
    Additional,
}

impl Relation {
    fn relates(self, kind: EdgeKind, other: EdgeKind) -> bool {
        let same_direction = kind.flows_to_center() == other.flows_to_center();
        match self {
            Self::Concurrent => same_direction,
            Self::Additional => !same_direction,
        }
    }
}

/// One sweep over the undefined edges of a kind
#[derive(Debug, Clone, Copy)]
struct Pass {
    kind: EdgeKind,
    relation: Relation,
    target: Classification,
}

impl Pass {
    const fn new(kind: EdgeKind, relation: Relation, target: Classification) -> Self {
        Self {
            kind,
            relation,
            target,
        }
    }

    /// Whether the comparison of welfare without and with the edge expanded favours the target
    fn accepts(self, without: f64, with: f64) -> bool {
        match self.target {
            Classification::LPlus => without <= with,
            Classification::LMinus => without >= with,
            Classification::Undefined => false,
        }
    }
}

const STAR_PASSES: [Pass; 4] = [
    Pass::new(
        EdgeKind::StarToCenter,
        Relation::Concurrent,
        Classification::LPlus,
    ),
    Pass::new(
        EdgeKind::StarFromCenter,
        Relation::Additional,
        Classification::LMinus,
    ),
    Pass::new(
        EdgeKind::StarToCenter,
        Relation::Additional,
        Classification::LMinus,
    ),
    Pass::new(
        EdgeKind::StarFromCenter,
        Relation::Concurrent,
        Classification::LPlus,
    ),
];

const CHAIN_PASSES: [Pass; 4] = [
    Pass::new(
        EdgeKind::ChainToCenter,
        Relation::Concurrent,
        Classification::LPlus,
    ),
    Pass::new(
        EdgeKind::ChainFromCenter,
        Relation::Additional,
        Classification::LMinus,
    ),
    Pass::new(
        EdgeKind::ChainToCenter,
        Relation::Additional,
        Classification::LMinus,
    ),
    Pass::new(
        EdgeKind::ChainFromCenter,
        Relation::Concurrent,
        Classification::LPlus,
    ),
];

impl Market {
    /// Decide for every edge whether to expand it, aiming for the highest welfare.
    ///
    /// Any previous classification is discarded. On return every edge is classified, the expansion
    /// flags match the classification and the market is solved under them. The result is never
    /// worse than leaving every edge at fixed capacity.
    ///
    /// # Returns
    ///
    /// The welfare of the final assignment.
    pub fn classify_edges(&mut self) -> Result<f64> {
        if self.root().is_none() {
            self.build_min_depth_tree()?;
        }

        let edges: Vec<_> = self.edges().map(|(index, _)| index).collect();
        for &index in &edges {
            self.edge_mut(index).classification = Classification::Undefined;
        }
        self.apply_expansion(|_, _| false)?;
        let baseline = self.solve_for_welfare()?;

        loop {
            loop {
                let changed = self.converge(&STAR_PASSES)? + self.converge(&CHAIN_PASSES)?;
                if changed == 0 || self.undefined_edges(|_| true).is_empty() {
                    break;
                }
            }

            if !self.escape_by_subsets()? {
                break;
            }
        }
        self.finish_greedily()?;

        self.apply_expansion(|_, edge| edge.classification == Classification::LPlus)?;
        let welfare = self.solve_for_welfare()?;
        if welfare < baseline {
            info!("Expanding edges does not beat welfare {baseline} at fixed capacity");
            for &index in &edges {
                self.edge_mut(index).classification = Classification::LMinus;
            }
            self.apply_expansion(|_, _| false)?;
            return self.solve_for_welfare();
        }

        let expanded = self
            .edges()
            .filter(|(_, edge)| edge.is_expanded())
            .count();
        info!(
            "Classified {} edges, {expanded} expanded, welfare {welfare} (fixed capacity: {baseline})",
            edges.len()
        );

        Ok(welfare)
    }

    /// Run the passes until a full round commits nothing
    fn converge(&mut self, passes: &[Pass]) -> Result<usize> {
        let mut total = 0;
        loop {
            let mut changed = 0;
            for &pass in passes {
                changed += self.try_reclassify(pass)?;
            }
            total += changed;

            if changed == 0 || self.undefined_edges(|_| true).is_empty() {
                return Ok(total);
            }
        }
    }

    /// Test each undefined edge of the pass's kind with and without expansion.
    ///
    /// Committed edges keep their expansion, undefined edges related to the tested one are
    /// expanded alongside it and everything else is fixed.
    fn try_reclassify(&mut self, pass: Pass) -> Result<usize> {
        let mut changed = 0;
        for candidate in self.undefined_edges(|kind| kind == pass.kind) {
            self.apply_expansion(|index, edge| match edge.classification {
                Classification::LPlus => true,
                Classification::LMinus => false,
                Classification::Undefined => {
                    index != candidate && pass.relation.relates(pass.kind, edge.kind)
                }
            })?;
            let without = self.solve_for_welfare()?;

            self.set_expand(candidate, true)?;
            let with = self.solve_for_welfare()?;

            if pass.accepts(without, with) {
                self.commit(candidate, pass.target);
                changed += 1;
            }
        }

        Ok(changed)
    }

    /// Try expanding small groups of undefined chain edges together.
    ///
    /// Groups are tested smallest first. Within a group, the edges carrying goods towards the
    /// hub are expanded and the others fixed, or the other way round. The first group where one
    /// of these beats the other is committed.
    ///
    /// # Returns
    ///
    /// Whether anything was committed.
    fn escape_by_subsets(&mut self) -> Result<bool> {
        let candidates = self.undefined_edges(EdgeKind::is_chain);
        if candidates.len() < 2 {
            return Ok(false);
        }

        for size in 1..=candidates.len() {
            for subset in candidates.iter().copied().combinations(size) {
                let (to_center, from_center): (Vec<_>, Vec<_>) = subset
                    .into_iter()
                    .partition(|&index| self.edge(index).kind.flows_to_center());

                if self.try_swap(&to_center, &from_center)?
                    || self.try_swap(&from_center, &to_center)?
                {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Commit `expanded` to expansion and `fixed` to fixed capacity if that strictly beats the
    /// opposite assignment
    fn try_swap(&mut self, expanded: &[EdgeIndex], fixed: &[EdgeIndex]) -> Result<bool> {
        self.apply_committed_with(expanded)?;
        let proposed = self.solve_for_welfare()?;
        self.apply_committed_with(fixed)?;
        let swapped = self.solve_for_welfare()?;

        if proposed <= swapped {
            return Ok(false);
        }

        for &index in expanded {
            self.commit(index, Classification::LPlus);
        }
        for &index in fixed {
            self.commit(index, Classification::LMinus);
        }

        Ok(true)
    }

    /// Settle the remaining undefined edges one at a time, expanding only on a strict gain
    fn finish_greedily(&mut self) -> Result<()> {
        for candidate in self.undefined_edges(|_| true) {
            self.apply_committed_with(&[])?;
            let without = self.solve_for_welfare()?;
            self.set_expand(candidate, true)?;
            let with = self.solve_for_welfare()?;

            let target = if with > without {
                Classification::LPlus
            } else {
                Classification::LMinus
            };
            self.commit(candidate, target);
        }

        Ok(())
    }

    /// Expand the committed edges and those in `extra`; fix everything else
    fn apply_committed_with(&mut self, extra: &[EdgeIndex]) -> Result<()> {
        self.apply_expansion(|index, edge| {
            edge.classification == Classification::LPlus || extra.contains(&index)
        })
    }

    fn apply_expansion<F>(&mut self, expand: F) -> Result<()>
    where
        F: Fn(EdgeIndex, &Edge) -> bool,
    {
        let flags: Vec<_> = self
            .edges()
            .map(|(index, edge)| (index, expand(index, edge)))
            .collect();
        for (index, flag) in flags {
            self.set_expand(index, flag)?;
        }

        Ok(())
    }

    fn commit(&mut self, index: EdgeIndex, target: Classification) {
        let edge = self.edge(index);
        debug!(
            "Edge from {} to {} ({}) classified as {target}",
            self.node(edge.from).id,
            self.node(edge.to).id,
            edge.kind
        );
        self.edge_mut(index).classification = target;
    }

    /// Undefined edges whose kind passes `filter`, in index order
    fn undefined_edges<F>(&self, filter: F) -> Vec<EdgeIndex>
    where
        F: Fn(EdgeKind) -> bool,
    {
        self.edges()
            .filter(|(_, edge)| edge.classification == Classification::Undefined)
            .filter(|(_, edge)| filter(edge.kind))
            .map(|(index, _)| index)
            .collect()
    }

    fn solve_for_welfare(&mut self) -> Result<f64> {
        self.solve()?;
        self.welfare()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{four_node_market, star_chain_market, two_node_market};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    /// Highest welfare over every possible set of expanded edges
    fn brute_force_welfare(market: &Market) -> f64 {
        let mut market = market.clone();
        market.build_min_depth_tree().unwrap();
        (0..1u64 << market.edge_count())
            .map(|mask| {
                market.set_expand_by_mask(mask).unwrap();
                market.solve().unwrap();
                market.welfare().unwrap()
            })
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn fixed_welfare(market: &Market) -> f64 {
        let mut market = market.clone();
        market.set_expand_by_mask(0).unwrap();
        market.build_min_depth_tree().unwrap();
        market.solve().unwrap();
        market.welfare().unwrap()
    }

    #[test]
    fn test_relation() {
        use EdgeKind::*;
        assert!(Relation::Concurrent.relates(StarToCenter, ChainToCenter));
        assert!(!Relation::Concurrent.relates(StarToCenter, StarFromCenter));
        assert!(Relation::Additional.relates(ChainFromCenter, StarToCenter));
        assert!(!Relation::Additional.relates(ChainFromCenter, StarFromCenter));
    }

    #[rstest]
    #[case(Classification::LPlus, 1.0, 1.0, true)]
    #[case(Classification::LPlus, 2.0, 1.0, false)]
    #[case(Classification::LMinus, 1.0, 1.0, true)]
    #[case(Classification::LMinus, 1.0, 2.0, false)]
    fn test_pass_accepts(
        #[case] target: Classification,
        #[case] without: f64,
        #[case] with: f64,
        #[case] expected: bool,
    ) {
        let pass = Pass::new(EdgeKind::StarToCenter, Relation::Concurrent, target);
        assert_eq!(pass.accepts(without, with), expected);
    }

    #[rstest]
    fn test_classify_four_node(mut four_node_market: Market) {
        let welfare = four_node_market.classify_edges().unwrap();
        assert_approx_eq!(f64, welfare, 32.0 + 1.0 / 6.0, epsilon = 1e-7);
        for (_, edge) in four_node_market.edges() {
            assert_eq!(edge.classification, Classification::LMinus);
            assert!(!edge.is_expanded());
        }
    }

    #[rstest]
    fn test_classify_two_node(mut two_node_market: Market) {
        let welfare = two_node_market.classify_edges().unwrap();
        assert_approx_eq!(f64, welfare, 555.0 / 9.0, epsilon = 1e-7);
        let (_, edge) = two_node_market.edges().next().unwrap();
        assert_eq!(edge.classification, Classification::LPlus);
        assert!(edge.is_expanded());
    }

    #[rstest]
    #[case(2, 1, 3)]
    #[case(1, 2, 4)]
    #[case(1, 1, 5)]
    fn test_classify_star_chain(
        #[case] importers: usize,
        #[case] exporters: usize,
        #[case] chain: usize,
    ) {
        let mut market = star_chain_market(importers, exporters, chain);
        market.extend_curves_to_common_price().unwrap();
        let baseline = fixed_welfare(&market);
        let best = brute_force_welfare(&market);

        let welfare = market.classify_edges().unwrap();
        assert!(welfare >= baseline - 1e-9);
        assert!(welfare <= best + 1e-9);
        assert_approx_eq!(f64, market.welfare().unwrap(), welfare);
        for (_, edge) in market.edges() {
            assert_ne!(edge.classification, Classification::Undefined);
            assert_eq!(
                edge.is_expanded(),
                edge.classification == Classification::LPlus
            );
        }
    }
}
