//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use std::error::Error as _;

use osm_extract_cli::CliError;

fn main() {
    if let Err(err) = osm_extract_cli::run() {
        if let CliError::ArgumentParsing(clap_err) = &err {
            clap_err.exit();
        }
        eprintln!("osm-extract: {err}");
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}
