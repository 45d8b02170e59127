//! Error types emitted by the extract CLI.
//!
//! Keep this error type reasonably small, as every CLI helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use osm_extract_core::ExtractError;
use osm_extract_data::{ConfigError, FormatError, PbfSourceError};
use thiserror::Error;

/// Errors emitted by the extract CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// Neither a configuration file nor a single extract region was given.
    #[error("no extracts requested (set --config, --bbox or --polygon)")]
    MissingExtracts,
    /// Two options that select extracts in different ways were combined.
    #[error("--{first} cannot be combined with --{second}")]
    ConflictingArguments {
        first: &'static str,
        second: &'static str,
    },
    /// A bounding box argument is not four comma separated numbers.
    #[error("invalid bounding box {value:?} (expected left,bottom,right,top)")]
    InvalidBbox { value: String },
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}")]
    InspectSourcePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The input could not be opened.
    #[error(transparent)]
    Source(#[from] PbfSourceError),
    /// The extract configuration is invalid or outputs could not be created.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// An output format name is unknown or unsupported.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// Strategy setup or extraction failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),
}
