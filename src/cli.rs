//! The command line interface for the program.
use crate::input::load_market;
use crate::log;
use crate::market::Market;
use crate::output::{
    MARKET_FILE_NAME, create_output_directory, get_output_dir, store_market, write_solution,
};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the program.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for commands which write results
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Solve a market with the expansion flags stored in the file.
    Solve {
        /// Path to the market file.
        market_file: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Decide which edges to expand, then solve the market.
    Classify {
        /// Path to the market file.
        market_file: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Validate a market file.
    Validate {
        /// Path to the market file.
        market_file: PathBuf,
    },
    /// Manage settings file.
    Settings {
        /// The subcommands for managing the settings file.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Solve { market_file, opts } => handle_solve_command(&market_file, &opts, None),
            Self::Classify { market_file, opts } => {
                handle_classify_command(&market_file, &opts, None)
            }
            Self::Validate { market_file } => handle_validate_command(&market_file, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load settings, prepare the output directory and logger, and load a market ready to solve.
///
/// # Returns
///
/// The market, with curves extended to a common price and its tree built, and the output
/// directory.
fn start_run(
    market_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<(Market, PathBuf)> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    let output_path = match &opts.output_dir {
        Some(path) => path.clone(),
        None => get_output_dir(market_path)?,
    };
    let overwrite = create_output_directory(&output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    log::init(Some(settings.log_level.as_str()), Some(&output_path))
        .context("Failed to initialise logging.")?;

    let mut market = load_market(market_path).context("Failed to load market.")?;
    info!("Loaded market from {}", market_path.display());
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    market.extend_curves_to_common_price()?;
    market.build_min_depth_tree()?;

    Ok((market, output_path))
}

/// Handle the `solve` command.
pub fn handle_solve_command(
    market_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (mut market, output_path) = start_run(market_path, opts, settings)?;

    market.solve().context("Failed to solve market.")?;
    info!("Welfare: {}", market.welfare()?);

    write_solution(&market, &output_path)?;
    info!("Results written to {}", output_path.display());

    Ok(())
}

/// Handle the `classify` command.
pub fn handle_classify_command(
    market_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let (mut market, output_path) = start_run(market_path, opts, settings)?;

    let welfare = market
        .classify_edges()
        .context("Failed to classify edges.")?;
    info!("Welfare: {welfare}");

    write_solution(&market, &output_path)?;
    store_market(&market, &output_path.join(MARKET_FILE_NAME))?;
    info!("Results written to {}", output_path.display());

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(market_path: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(Some(settings.log_level.as_str()), None).context("Failed to initialise logging.")?;

    // Load/validate the market
    let mut market = load_market(market_path).context("Failed to validate market.")?;
    market.extend_curves_to_common_price()?;
    market.build_min_depth_tree()?;
    info!("Market validation successful!");

    Ok(())
}
