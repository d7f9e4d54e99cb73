//! The module responsible for writing output data to disk.
use crate::edge::{Classification, EdgeKind};
use crate::input::{EdgeRecord, MarketFile, NodeRecord, curve_to_records};
use crate::market::Market;
use crate::node::NodeID;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// The root folder in which market-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "star_market_results";

/// The output file name for node results
const NODES_FILE_NAME: &str = "nodes.csv";

/// The output file name for edge results
const EDGES_FILE_NAME: &str = "edges.csv";

/// The file name for a market written alongside the results
pub const MARKET_FILE_NAME: &str = "market.toml";

/// Get the default output directory for the market file at `market_path`
pub fn get_output_dir(market_path: &Path) -> Result<PathBuf> {
    let market_name = market_path
        .file_stem()
        .context("Market file has no name")?
        .to_str()
        .context("Invalid chars in market file name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, market_name].iter().collect())
}

/// Create a new output directory.
///
/// An existing empty directory is reused. A non-empty one is only replaced if `allow_overwrite` is
/// set.
///
/// # Returns
///
/// Whether an existing directory was overwritten.
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Directory exists and is empty: nothing to do
            return Ok(false);
        }

        if !allow_overwrite {
            bail!(
                "Output folder already exists and is not empty. \
                Please delete the folder or pass the --overwrite command-line option."
            );
        }

        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    // Try to create the directory, with parents
    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the nodes CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct NodeRow {
    id: NodeID,
    price: f64,
    produced: f64,
    consumed: f64,
    depth: usize,
    is_leaf: bool,
}

/// Represents a row in the edges CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct EdgeRow {
    from: NodeID,
    to: NodeID,
    kind: EdgeKind,
    expand: bool,
    classification: Classification,
    flow: f64,
}

/// Write the prices, quantities and flows found by the last solve to CSV files in `output_dir`
pub fn write_solution(market: &Market, output_dir: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(output_dir.join(NODES_FILE_NAME))?;
    for (_, node) in market.nodes() {
        writer.serialize(NodeRow {
            id: node.id.clone(),
            price: node.price,
            produced: node.produced,
            consumed: node.consumed,
            depth: node.depth,
            is_leaf: node.is_leaf,
        })?;
    }
    writer.flush()?;

    let mut writer = csv::Writer::from_path(output_dir.join(EDGES_FILE_NAME))?;
    for (_, edge) in market.edges() {
        writer.serialize(EdgeRow {
            from: market.node(edge.from).id.clone(),
            to: market.node(edge.to).id.clone(),
            kind: edge.kind,
            expand: edge.is_expanded(),
            classification: edge.classification,
            flow: edge.flow,
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Describe a market in the format read by [`crate::input::load_market`]
pub fn market_to_file(market: &Market) -> Result<MarketFile> {
    let central_node = market
        .central_node()
        .context("Market has no central node")?;

    let nodes = market
        .nodes()
        .map(|(_, node)| NodeRecord {
            id: node.id.clone(),
            demand: curve_to_records(&node.demand),
            supply: curve_to_records(&node.supply),
        })
        .collect();
    let edges = market
        .edges()
        .map(|(_, edge)| EdgeRecord {
            from: market.node(edge.from).id.clone(),
            to: market.node(edge.to).id.clone(),
            kind: edge.kind,
            params: edge.params,
            expand: edge.is_expanded(),
        })
        .collect();

    Ok(MarketFile {
        central_node: market.node(central_node).id.clone(),
        nodes,
        edges,
    })
}

/// Write a market to a TOML file, including the current expansion flags
pub fn store_market(market: &Market, file_path: &Path) -> Result<()> {
    let contents =
        toml::to_string(&market_to_file(market)?).context("Could not convert market to TOML")?;
    fs::write(file_path, contents)
        .with_context(|| format!("Could not write market to {}", file_path.display()))?;

    Ok(())
}
