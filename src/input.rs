//! Common routines for handling input data.
use crate::curve::{LinearFunction, Piece, PiecewiseCurve};
use crate::edge::{EdgeKind, EdgeParameters};
use crate::market::Market;
use crate::node::{Node, NodeID};
use anyhow::{Context, Result, ensure};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path)
        .with_context(|| format!("Could not read file {}", file_path.display()))?;
    let toml_data = toml::from_str(&toml_str)
        .with_context(|| format!("Could not parse file {}", file_path.display()))?;

    Ok(toml_data)
}

/// A piece of a curve as written in a market file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PieceRecord {
    /// The line `y = c - a x` on `[x_start, x_end]`
    Linear {
        /// Slope coefficient
        a: f64,
        /// Intercept
        c: f64,
        /// Start of the segment
        x_start: f64,
        /// End of the segment
        x_end: f64,
    },
    /// Every value in `[y_min, y_max]` at `x`
    Vertical {
        /// Bottom of the range
        y_min: f64,
        /// Top of the range
        y_max: f64,
        /// Where the piece stands
        x: f64,
    },
}

impl From<&Piece> for PieceRecord {
    fn from(piece: &Piece) -> Self {
        match *piece {
            Piece::Linear {
                line,
                x_start,
                x_end,
            } => Self::Linear {
                a: line.a,
                c: line.c,
                x_start,
                x_end,
            },
            Piece::Vertical { x, range } => Self::Vertical {
                y_min: range.lo(),
                y_max: range.hi(),
                x,
            },
        }
    }
}

impl TryFrom<&PieceRecord> for Piece {
    type Error = anyhow::Error;

    fn try_from(record: &PieceRecord) -> Result<Self> {
        let piece = match *record {
            PieceRecord::Linear {
                a,
                c,
                x_start,
                x_end,
            } => Piece::linear(LinearFunction::new(a, 1.0, c)?, x_start, x_end)?,
            PieceRecord::Vertical { y_min, y_max, x } => Piece::vertical(y_min, y_max, x)?,
        };

        Ok(piece)
    }
}

/// Write a curve as a list of pieces
pub fn curve_to_records(curve: &PiecewiseCurve) -> Vec<PieceRecord> {
    curve.pieces().iter().map(PieceRecord::from).collect()
}

/// Build a curve from a list of pieces, with a domain spanning them
fn curve_from_records(records: &[PieceRecord]) -> Result<PiecewiseCurve> {
    let pieces = records
        .iter()
        .map(Piece::try_from)
        .collect::<Result<Vec<_>>>()?;

    Ok(PiecewiseCurve::from_pieces(pieces)?)
}

/// A node as written in a market file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Unique identifier for the node
    pub id: NodeID,
    /// Demand curve pieces (price to quantity)
    pub demand: Vec<PieceRecord>,
    /// Supply curve pieces (price to quantity)
    pub supply: Vec<PieceRecord>,
}

/// An edge as written in a market file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    /// The node goods leave from
    pub from: NodeID,
    /// The node goods arrive at
    pub to: NodeID,
    /// Position and direction relative to the hub
    pub kind: EdgeKind,
    /// Cost parameters
    #[serde(flatten)]
    pub params: EdgeParameters,
    /// Whether the edge starts out expanded
    #[serde(default)]
    pub expand: bool,
}

/// The contents of a market file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketFile {
    /// The hub of the network
    pub central_node: NodeID,
    /// Nodes in the order they are added to the market
    pub nodes: Vec<NodeRecord>,
    /// Edges in the order they are added to the market
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

impl MarketFile {
    /// Build a market, checking that the nodes and edges form a tree around the central node
    pub fn into_market(self) -> Result<Market> {
        ensure!(!self.nodes.is_empty(), "Market has no nodes");

        let mut market = Market::new();
        for record in &self.nodes {
            let demand = curve_from_records(&record.demand)
                .with_context(|| format!("Invalid demand curve for node {}", record.id))?;
            let supply = curve_from_records(&record.supply)
                .with_context(|| format!("Invalid supply curve for node {}", record.id))?;
            let node = Node::new(record.id.clone(), demand, supply)?;
            market.add_node(node, record.id == self.central_node)?;
        }
        ensure!(
            market.central_node().is_some(),
            "Central node {} is not one of the nodes",
            self.central_node
        );

        for record in &self.edges {
            let index = market.add_edge(&record.from, &record.to, record.kind, record.params)?;
            market.set_expand(index, record.expand)?;
        }
        ensure!(
            market.is_tree(),
            "The edges must join all {} nodes without cycles",
            market.node_count()
        );

        Ok(market)
    }
}

/// Load a market from a TOML file
pub fn load_market(file_path: &Path) -> Result<Market> {
    let file: MarketFile = read_toml(file_path)?;
    file.into_market()
        .with_context(|| format!("Invalid market in {}", file_path.display()))
}
