//! Extract command implementation for the `osm-extract` CLI.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::{debug, info};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use osm_extract_core::{
    DEFAULT_COMMIT_THRESHOLD, EntitySource, ExtractError, RunReport, StrategyKind,
    StrategyOptions, build_strategy, run_strategy,
};
use osm_extract_data::{
    BboxSpec, BuildOptions, ExtractConfig, ExtractSpec, GeometryFileSpec, OutputFormat,
    PbfSource, PolygonSpec, RegionSpec, build_extracts,
};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BBOX, ARG_COMMIT_THRESHOLD, ARG_CONFIG, ARG_DIRECTORY, ARG_INPUT, ARG_OPTION,
    ARG_OUTPUT, ARG_OUTPUT_FORMAT, ARG_OVERWRITE, ARG_POLYGON, ARG_STRATEGY, ARG_VERBOSE,
    ARG_WITH_HISTORY, CliError, ENV_INPUT, ENV_OUTPUT, STDIN_INPUT,
};

/// CLI arguments for the `extract` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Cut one or more regional extracts out of an OSM PBF file. \
                 Regions come from a JSON configuration file or from a single \
                 --bbox or --polygon with --output. Options can also be set in \
                 configuration files or OSM_EXTRACT_* environment variables.",
    about = "Create geographic extracts from an OSM data file"
)]
#[ortho_config(prefix = "OSM_EXTRACT")]
pub(crate) struct ExtractArgs {
    /// OSM PBF input file, or `-` to read standard input.
    #[arg(value_name = "input")]
    #[serde(default)]
    pub(crate) input: Option<Utf8PathBuf>,
    /// JSON file describing the extracts to create.
    #[arg(short = 'c', long = ARG_CONFIG, value_name = "path")]
    #[serde(default)]
    pub(crate) config: Option<Utf8PathBuf>,
    /// Bounding box of a single extract as `left,bottom,right,top` degrees.
    #[arg(
        short = 'b',
        long = ARG_BBOX,
        value_name = "left,bottom,right,top",
        allow_hyphen_values = true
    )]
    #[serde(default)]
    pub(crate) bbox: Option<String>,
    /// Polygon file (.poly, .geojson or .osm.pbf) of a single extract.
    #[arg(short = 'p', long = ARG_POLYGON, value_name = "path")]
    #[serde(default)]
    pub(crate) polygon: Option<Utf8PathBuf>,
    /// Output file of a single extract.
    #[arg(short = 'o', long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Directory relative output paths are placed in.
    #[arg(short = 'd', long = ARG_DIRECTORY, value_name = "dir")]
    #[serde(default)]
    pub(crate) directory: Option<Utf8PathBuf>,
    /// Extraction strategy: simple, complete_ways or smart.
    #[arg(short = 's', long = ARG_STRATEGY, value_name = "name")]
    #[serde(default)]
    pub(crate) strategy: Option<String>,
    /// Strategy option as `name=value`; may be repeated.
    #[arg(short = 'S', long = ARG_OPTION, value_name = "name=value")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) option: Vec<String>,
    /// Treat the input as history data with several versions per object.
    #[arg(long = ARG_WITH_HISTORY)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) with_history: bool,
    /// Replace output files that already exist.
    #[arg(long = ARG_OVERWRITE)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) overwrite: bool,
    /// Bytes buffered per extract before they are written out.
    #[arg(long = ARG_COMMIT_THRESHOLD, value_name = "bytes")]
    #[serde(default)]
    pub(crate) commit_threshold: Option<usize>,
    /// Output format used when a file name does not imply one (opl or osm).
    #[arg(short = 'f', long = ARG_OUTPUT_FORMAT, value_name = "format")]
    #[serde(default)]
    pub(crate) output_format: Option<String>,
    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short = 'v', long = ARG_VERBOSE)]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub(crate) verbose: bool,
}

impl ExtractArgs {
    pub(crate) fn into_settings(self) -> Result<ExtractSettings, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ExtractSettings::try_from(merged)
    }
}

/// Where entities are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Input {
    Stdin,
    File(Utf8PathBuf),
}

/// How the extracts of a run are described.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ExtractPlan {
    /// A JSON configuration file.
    Config(Utf8PathBuf),
    /// One extract given on the command line.
    Single {
        output: Utf8PathBuf,
        region: RegionSpec,
    },
}

/// Resolved `extract` command settings.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExtractSettings {
    pub(crate) input: Input,
    pub(crate) plan: ExtractPlan,
    pub(crate) directory: Option<Utf8PathBuf>,
    pub(crate) strategy: StrategyKind,
    pub(crate) options: StrategyOptions,
    pub(crate) with_history: bool,
    pub(crate) overwrite: bool,
    pub(crate) commit_threshold: usize,
    pub(crate) output_format: Option<OutputFormat>,
    pub(crate) verbose: bool,
}

impl ExtractSettings {
    /// Open the input named by these settings.
    pub(crate) fn open_source(&self) -> Result<PbfSource, CliError> {
        let source = match &self.input {
            Input::Stdin => PbfSource::stdin(),
            Input::File(path) => {
                require_existing(path, ARG_INPUT)?;
                PbfSource::open(path)?
            }
        };
        Ok(if self.with_history {
            source.with_history()
        } else {
            source
        })
    }

    /// Extract configuration plus the directory its polygon files are
    /// relative to.
    pub(crate) fn extract_config(&self) -> Result<(ExtractConfig, Utf8PathBuf), CliError> {
        match &self.plan {
            ExtractPlan::Config(path) => {
                require_existing(path, ARG_CONFIG)?;
                let mut config = ExtractConfig::load(path)?;
                if let Some(directory) = &self.directory {
                    config.directory = Some(directory.clone());
                }
                let base_dir = match path.parent() {
                    Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
                    _ => Utf8PathBuf::from("."),
                };
                Ok((config, base_dir))
            }
            ExtractPlan::Single { output, region } => Ok((
                ExtractConfig {
                    directory: self.directory.clone(),
                    extracts: vec![ExtractSpec::new(output.clone(), region.clone())],
                },
                Utf8PathBuf::from("."),
            )),
        }
    }
}

impl TryFrom<ExtractArgs> for ExtractSettings {
    type Error = CliError;

    fn try_from(args: ExtractArgs) -> Result<Self, Self::Error> {
        let input = args.input.ok_or(CliError::MissingArgument {
            field: ARG_INPUT,
            env: ENV_INPUT,
        })?;
        let input = if input.as_str() == STDIN_INPUT {
            Input::Stdin
        } else {
            Input::File(input)
        };
        let plan = extract_plan(args.config, args.bbox, args.polygon, args.output)?;
        let strategy = args
            .strategy
            .as_deref()
            .map(str::parse::<StrategyKind>)
            .transpose()?
            .unwrap_or_default();
        let options = StrategyOptions::parse(&args.option).map_err(ExtractError::from)?;
        let output_format = args
            .output_format
            .as_deref()
            .map(str::parse::<OutputFormat>)
            .transpose()?;
        Ok(Self {
            input,
            plan,
            directory: args.directory,
            strategy,
            options,
            with_history: args.with_history,
            overwrite: args.overwrite,
            commit_threshold: args.commit_threshold.unwrap_or(DEFAULT_COMMIT_THRESHOLD),
            output_format,
            verbose: args.verbose,
        })
    }
}

fn extract_plan(
    config: Option<Utf8PathBuf>,
    bbox: Option<String>,
    polygon: Option<Utf8PathBuf>,
    output: Option<Utf8PathBuf>,
) -> Result<ExtractPlan, CliError> {
    let single_output = |output: Option<Utf8PathBuf>| {
        output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: ENV_OUTPUT,
        })
    };
    match (config, bbox, polygon) {
        (Some(_), Some(_), _) => Err(CliError::ConflictingArguments {
            first: ARG_CONFIG,
            second: ARG_BBOX,
        }),
        (Some(_), None, Some(_)) => Err(CliError::ConflictingArguments {
            first: ARG_CONFIG,
            second: ARG_POLYGON,
        }),
        (None, Some(_), Some(_)) => Err(CliError::ConflictingArguments {
            first: ARG_BBOX,
            second: ARG_POLYGON,
        }),
        (Some(_), None, None) if output.is_some() => Err(CliError::ConflictingArguments {
            first: ARG_CONFIG,
            second: ARG_OUTPUT,
        }),
        (Some(path), None, None) => Ok(ExtractPlan::Config(path)),
        (None, Some(bbox), None) => Ok(ExtractPlan::Single {
            output: single_output(output)?,
            region: RegionSpec::Bbox(parse_bbox(&bbox)?),
        }),
        (None, None, Some(polygon)) => Ok(ExtractPlan::Single {
            output: single_output(output)?,
            region: RegionSpec::Polygon(PolygonSpec::File(GeometryFileSpec {
                file_name: polygon,
                file_type: None,
            })),
        }),
        (None, None, None) => Err(CliError::MissingExtracts),
    }
}

/// Parse `left,bottom,right,top`; range checks happen when the extract is
/// built.
pub(crate) fn parse_bbox(value: &str) -> Result<BboxSpec, CliError> {
    let invalid = || CliError::InvalidBbox {
        value: value.to_owned(),
    };
    let numbers = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    let corners: [f64; 4] = numbers.try_into().map_err(|_| invalid())?;
    Ok(BboxSpec::Array(corners))
}

fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    let inspect = |source| CliError::InspectSourcePath {
        field,
        path: path.to_path_buf(),
        source,
    };
    if osm_extract_fs::file_is_file(path).map_err(inspect)? {
        return Ok(());
    }
    if osm_extract_fs::path_exists(path).map_err(inspect)? {
        Err(CliError::SourcePathNotFile {
            field,
            path: path.to_path_buf(),
        })
    } else {
        Err(CliError::MissingSourceFile {
            field,
            path: path.to_path_buf(),
        })
    }
}

/// Run the `extract` command with resolved settings.
///
/// The input is checked against the strategy before any output file is
/// created, so a rejected run leaves no partial outputs behind.
pub(crate) fn run_extract(settings: &ExtractSettings) -> Result<RunReport, CliError> {
    let source = settings.open_source()?;
    let history = source.has_history();
    settings.strategy.check_source(&source, history)?;
    settings.strategy.check_options(&settings.options)?;
    let (config, base_dir) = settings.extract_config()?;
    let options = BuildOptions {
        overwrite: settings.overwrite,
        commit_threshold: settings.commit_threshold,
        default_format: settings.output_format,
        base_dir,
    };
    let extracts = build_extracts(&config, &options)?;
    debug!(
        "Prepared {} extracts with strategy {}",
        extracts.len(),
        settings.strategy
    );
    let mut strategy = build_strategy(
        settings.strategy,
        settings.options.clone(),
        extracts,
        history,
    )?;
    let report = run_strategy(strategy.as_mut(), &source)?;
    let bytes: u64 = report.extracts.iter().map(|extract| extract.bytes_written).sum();
    info!(
        "Wrote {} extracts ({bytes} bytes) in {} passes",
        report.extracts.len(),
        report.passes
    );
    Ok(report)
}

#[cfg(test)]
pub(crate) fn settings_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ExtractSettings, CliError> {
    let merged = ExtractArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ExtractSettings::try_from(merged)
}
