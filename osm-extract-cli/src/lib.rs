//! Command-line interface for the OSM extract engine.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use log::debug;

mod error;
mod extract;

pub use error::CliError;

use extract::{ExtractArgs, run_extract};

pub(crate) const ARG_INPUT: &str = "input";
pub(crate) const ARG_CONFIG: &str = "config";
pub(crate) const ARG_BBOX: &str = "bbox";
pub(crate) const ARG_POLYGON: &str = "polygon";
pub(crate) const ARG_OUTPUT: &str = "output";
pub(crate) const ARG_DIRECTORY: &str = "directory";
pub(crate) const ARG_STRATEGY: &str = "strategy";
pub(crate) const ARG_OPTION: &str = "option";
pub(crate) const ARG_WITH_HISTORY: &str = "with-history";
pub(crate) const ARG_OVERWRITE: &str = "overwrite";
pub(crate) const ARG_COMMIT_THRESHOLD: &str = "commit-threshold";
pub(crate) const ARG_OUTPUT_FORMAT: &str = "output-format";
pub(crate) const ARG_VERBOSE: &str = "verbose";
pub(crate) const ENV_INPUT: &str = "OSM_EXTRACT_CMDS_EXTRACT_INPUT";
pub(crate) const ENV_OUTPUT: &str = "OSM_EXTRACT_CMDS_EXTRACT_OUTPUT";

/// Input name selecting standard input.
pub(crate) const STDIN_INPUT: &str = "-";

/// Run the extract CLI with the current process arguments and environment.
///
/// # Errors
/// Returns a [`CliError`] for invalid arguments, unreadable inputs,
/// configuration problems and failed extraction runs.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Extract(args) => {
            let settings = args.into_settings()?;
            init_logging(settings.verbose);
            run_extract(&settings)?;
        }
    }
    Ok(())
}

/// Install `env_logger`, honouring `RUST_LOG` over the default level.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let installed =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
            .format_timestamp_secs()
            .try_init();
    if installed.is_err() {
        debug!("logger already installed");
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "osm-extract",
    about = "Geographic extracts from OpenStreetMap data",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write one or more regional extracts of an OSM data file.
    Extract(ExtractArgs),
}

#[cfg(test)]
mod tests;
