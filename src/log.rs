//! Program logging through `fern`.
//!
//! Progress messages go to stdout and warnings and errors to stderr, with the level coloured when
//! the stream is a terminal. Runs that write results also keep an info log and an error log in the
//! output directory, replacing any from an earlier run.
use anyhow::{Context, Result, anyhow, ensure};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used when neither the environment nor the settings file name one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable that takes precedence over the settings file
const LOG_LEVEL_ENV_VAR: &str = "STAR_MARKET_LOG_LEVEL";

const LOG_INFO_FILE_NAME: &str = "star_market_info.log";

const LOG_ERROR_FILE_NAME: &str = "star_market_error.log";

/// Whether [`init`] has installed the program logger
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Install the program logger.
///
/// The level is read from `STAR_MARKET_LOG_LEVEL`, then `log_level_from_settings`, then
/// [`DEFAULT_LOG_LEVEL`]. Any name accepted by [`LevelFilter`] works, in any case (`off`, `error`,
/// `warn`, `info`, `debug`, `trace`).
///
/// If `log_dir` is given, `star_market_info.log` and `star_market_error.log` are written there.
/// The logger can only be installed once per process.
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    ensure!(!is_logger_initialised(), "Logger already initialised");

    let level = log_level(log_level_from_settings)?;
    let mut dispatch = Dispatch::new().chain(terminal_dispatch(level));
    if let Some(log_dir) = log_dir {
        dispatch = dispatch.chain(file_dispatch(log_dir, level)?);
    }

    dispatch.apply()?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

fn log_level(from_settings: Option<&str>) -> Result<LevelFilter> {
    let name = env::var(LOG_LEVEL_ENV_VAR)
        .ok()
        .or_else(|| from_settings.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

    LevelFilter::from_str(name.trim()).map_err(|_| anyhow!("Unknown log level: {name}"))
}

/// Messages below warnings to stdout, the rest to stderr
fn terminal_dispatch(level: LevelFilter) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let stdout_colours = io::stdout().is_terminal().then_some(colours);
    let stderr_colours = io::stderr().is_terminal().then_some(colours);

    Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    format_line(out, message, record, stdout_colours.as_ref());
                })
                .level(level)
                .chain(io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    format_line(out, message, record, stderr_colours.as_ref());
                })
                .level(level.min(LevelFilter::Warn))
                .chain(io::stderr()),
        )
}

/// Info and debug messages to one file in `log_dir`, warnings and errors to another.
///
/// The info file records at least `info` whatever the terminal level, so results always come with
/// a record of the run.
fn file_dispatch(log_dir: &Path, level: LevelFilter) -> Result<Dispatch> {
    let create = |file_name: &str| {
        let path = log_dir.join(file_name);
        File::create(&path)
            .with_context(|| format!("Could not create log file {}", path.display()))
    };

    Ok(Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(|out, message, record| format_line(out, message, record, None))
                .level(level.max(LevelFilter::Info))
                .chain(create(LOG_INFO_FILE_NAME)?),
        )
        .chain(
            Dispatch::new()
                .format(|out, message, record| format_line(out, message, record, None))
                .level(LevelFilter::Warn)
                .chain(create(LOG_ERROR_FILE_NAME)?),
        ))
}

/// Write `[HH:MM:SS LEVEL target] message`
fn format_line(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    let timestamp = Local::now().format("%H:%M:%S");
    let target = record.target();
    match colours {
        Some(colours) => out.finish(format_args!(
            "[{timestamp} {} {target}] {message}",
            colours.color(record.level())
        )),
        None => out.finish(format_args!(
            "[{timestamp} {} {target}] {message}",
            record.level()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;

    #[rstest]
    #[case(Some("debug"), LevelFilter::Debug)]
    #[case(Some("WARN"), LevelFilter::Warn)]
    #[case(Some(" off "), LevelFilter::Off)]
    #[case(None, LevelFilter::Info)]
    fn test_log_level(#[case] from_settings: Option<&str>, #[case] expected: LevelFilter) {
        // The environment overrides the settings
        if env::var(LOG_LEVEL_ENV_VAR).is_err() {
            assert_eq!(log_level(from_settings).unwrap(), expected);
        }
    }

    #[test]
    fn test_log_level_unknown() {
        if env::var(LOG_LEVEL_ENV_VAR).is_err() {
            assert_error!(log_level(Some("loud")), "Unknown log level: loud");
            // Checked before anything is installed, so the logger stays free
            assert!(init(Some("loud"), None).is_err());
            assert!(!is_logger_initialised());
        }
    }
}
