//! Nodes of the trade network: local demand and supply and the equilibrium found for them.
use crate::curve::PiecewiseCurve;
use crate::id::{define_id_getter, define_id_type};
use anyhow::{Context, Result};

define_id_type! {NodeID}

/// A local market with its own demand and supply curves.
///
/// Both curves map price to quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier for the node (e.g. "hub")
    pub id: NodeID,
    /// Quantity demanded at each price
    pub demand: PiecewiseCurve,
    /// Quantity supplied at each price
    pub supply: PiecewiseCurve,
    /// Supply minus demand
    pub net_supply: PiecewiseCurve,
    /// Net supply of the node together with everything traded across its subtree.
    ///
    /// Set by `Market::solve`.
    pub balance: Option<PiecewiseCurve>,
    /// Number of edges between the node and the root
    pub depth: usize,
    /// Whether the node has no children in the solver's tree
    pub is_leaf: bool,
    /// Equilibrium price
    pub price: f64,
    /// Quantity consumed at the equilibrium price
    pub consumed: f64,
    /// Quantity produced at the equilibrium price
    pub produced: f64,
}
define_id_getter! {Node, NodeID}

impl Node {
    /// Create a node from its demand and supply curves
    pub fn new(id: NodeID, demand: PiecewiseCurve, supply: PiecewiseCurve) -> Result<Self> {
        let net_supply = supply
            .try_sub(&demand)
            .with_context(|| format!("Demand and supply curves of node {id} are incompatible"))?;

        Ok(Self {
            id,
            demand,
            supply,
            net_supply,
            balance: None,
            depth: 0,
            is_leaf: false,
            price: 0.0,
            consumed: 0.0,
            produced: 0.0,
        })
    }

    /// Create a node with the standard linear supply and demand curves for coefficients `c`, `d`
    pub fn with_coefficients(id: NodeID, c: f64, d: f64) -> Result<Self> {
        let demand = PiecewiseCurve::create_demand_curve(c, d)?;
        let supply = PiecewiseCurve::create_supply_curve(c, d)?;
        Self::new(id, demand, supply)
    }

    /// The price at which the node would clear in isolation
    pub fn zero_price(&self) -> Result<f64> {
        let zero = self
            .net_supply
            .find_zero()
            .with_context(|| format!("Net supply of node {} never crosses zero", self.id))?;

        Ok(zero.single_point()?)
    }

    /// The lowest price at which demand vanishes
    pub fn demand_zero_price(&self) -> Result<f64> {
        self.demand
            .pieces()
            .iter()
            .find_map(|piece| {
                let line = piece.line().ok()?;
                (line.a == 0.0 && line.c == 0.0).then(|| piece.x_start())
            })
            .with_context(|| format!("Demand of node {} never reaches zero", self.id))
    }

    /// Extend the demand and supply curves to prices up to `price`
    pub fn extend_curves_to(&mut self, price: f64) -> Result<()> {
        self.demand.extend_domain_to(price)?;
        self.supply.extend_domain_to(price)?;
        self.net_supply = self.supply.try_sub(&self.demand)?;

        Ok(())
    }
}
