//! Provides the main entry point to the program.
use ::log::error;
use human_panic::setup_panic;
use star_market::cli::run_cli;
use star_market::log;

fn main() {
    setup_panic!();

    if let Err(err) = run_cli() {
        if log::is_logger_initialised() {
            error!("{err:?}");
        } else {
            eprintln!("Error: {err:?}");
        }

        std::process::exit(1);
    }
}
