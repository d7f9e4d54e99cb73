//! Equilibrium prices and flows for markets joined by transport links, and a heuristic for
//! choosing which links to expand.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod classify;
pub mod cli;
pub mod curve;
pub mod edge;
pub mod id;
pub mod input;
pub mod log;
pub mod market;
pub mod node;
pub mod output;
pub mod settings;

#[cfg(test)]
mod fixture;

/// Get the directory the program's configuration is read from.
///
/// Falls back to the working directory if the platform has no configuration directory.
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_default();
    path.push("star-market");

    path
}
