//! JSON extract configuration.
//!
//! ```json
//! {
//!     "directory": "extracts",
//!     "extracts": [
//!         {"output": "centre.osm", "bbox": [13.3, 52.4, 13.5, 52.6]},
//!         {"output": "city.opl", "polygon": {"file_name": "city.geojson", "file_type": "geojson"}},
//!         {"output": "area.opl", "multipolygon": [[[[0, 0], [1, 0], [1, 1], [0, 0]]]]}
//!     ]
//! }
//! ```

use std::{collections::BTreeMap, fs::File, io, io::Read};

use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use osm_extract_core::{
    BoundingBox, DEFAULT_COMMIT_THRESHOLD, Extract, ExtractOutput, Geometry, GeometryError,
    Location, Polygon, location_from_degrees,
};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    format::{FormatError, OutputFormat, OutputHeader},
    geometry::{GeometryFileError, load_geometry},
};

/// Errors raised while reading or applying an extract configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {path}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("config file {path} defines no extracts")]
    NoExtracts { path: Utf8PathBuf },
    #[error("extract {output} must define exactly one of bbox, polygon or multipolygon (found {found})")]
    Region { output: Utf8PathBuf, found: usize },
    #[error("extract {output} has an invalid region")]
    Geometry {
        output: Utf8PathBuf,
        #[source]
        source: GeometryError,
    },
    #[error("extract {output} has an unusable polygon file")]
    GeometryFile {
        output: Utf8PathBuf,
        #[source]
        source: GeometryFileError,
    },
    #[error("extract {output} has an invalid output setting")]
    Format {
        output: Utf8PathBuf,
        #[source]
        source: FormatError,
    },
    #[error("cannot create output {path}; pass --overwrite to replace an existing file")]
    Output {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Top-level configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractConfig {
    /// Directory relative outputs are placed in.
    #[serde(default)]
    pub directory: Option<Utf8PathBuf>,
    /// Extract definitions, written in this order.
    pub extracts: Vec<ExtractSpec>,
}

/// One extract: where to write it and which region it covers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractSpec {
    pub output: Utf8PathBuf,
    #[serde(default)]
    pub output_format: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub output_header: BTreeMap<String, String>,
    #[serde(default)]
    pub bbox: Option<BboxSpec>,
    #[serde(default)]
    pub polygon: Option<PolygonSpec>,
    #[serde(default)]
    pub multipolygon: Option<MultiPolygonSpec>,
}

impl ExtractSpec {
    /// Spec for an extract covering `region`.
    #[must_use]
    pub fn new(output: impl Into<Utf8PathBuf>, region: RegionSpec) -> Self {
        let mut spec = Self {
            output: output.into(),
            output_format: None,
            description: None,
            output_header: BTreeMap::new(),
            bbox: None,
            polygon: None,
            multipolygon: None,
        };
        match region {
            RegionSpec::Bbox(bbox) => spec.bbox = Some(bbox),
            RegionSpec::Polygon(polygon) => spec.polygon = Some(polygon),
            RegionSpec::MultiPolygon(multipolygon) => spec.multipolygon = Some(multipolygon),
        }
        spec
    }
}

/// The three ways of naming an extract region.
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSpec {
    Bbox(BboxSpec),
    Polygon(PolygonSpec),
    MultiPolygon(MultiPolygonSpec),
}

/// Bounding box in degrees, as `[left, bottom, right, top]` or an object.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BboxSpec {
    Array([f64; 4]),
    Object {
        left: f64,
        bottom: f64,
        right: f64,
        top: f64,
    },
}

impl BboxSpec {
    fn to_bbox(self) -> Result<BoundingBox, GeometryError> {
        let (left, bottom, right, top) = match self {
            Self::Array([left, bottom, right, top]) => (left, bottom, right, top),
            Self::Object {
                left,
                bottom,
                right,
                top,
            } => (left, bottom, right, top),
        };
        BoundingBox::from_degrees(left, bottom, right, top)
    }
}

/// Reference to a polygon stored in a file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeometryFileSpec {
    pub file_name: Utf8PathBuf,
    #[serde(default)]
    pub file_type: Option<String>,
}

/// Polygon given inline as rings of `[lon, lat]` pairs, or by file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PolygonSpec {
    File(GeometryFileSpec),
    Inline(Vec<Vec<[f64; 2]>>),
}

/// Multipolygon given inline as a list of polygons, or by file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MultiPolygonSpec {
    File(GeometryFileSpec),
    Inline(Vec<Vec<Vec<[f64; 2]>>>),
}

/// Settings applied to every extract built from a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Replace existing output files.
    pub overwrite: bool,
    /// Bytes buffered per extract before writing.
    pub commit_threshold: usize,
    /// Format used when neither the extract nor its file name names one.
    pub default_format: Option<OutputFormat>,
    /// Directory relative polygon file names are resolved against.
    pub base_dir: Utf8PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            commit_threshold: DEFAULT_COMMIT_THRESHOLD,
            default_format: None,
            base_dir: Utf8PathBuf::from("."),
        }
    }
}

impl ExtractConfig {
    /// Parse a configuration document.
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed JSON, naming `path`.
    pub fn from_json(path: &Utf8Path, text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.extracts.is_empty() {
            return Err(ConfigError::NoExtracts {
                path: path.to_path_buf(),
            });
        }
        Ok(config)
    }

    /// Read and parse the configuration file at `path`.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let read_error = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        let mut text = String::new();
        osm_extract_fs::open_input(path)
            .map_err(read_error)?
            .read_to_string(&mut text)
            .map_err(read_error)?;
        Self::from_json(path, &text)
    }

    /// Output path of `spec` once the configured directory is applied.
    #[must_use]
    pub fn output_path(&self, spec: &ExtractSpec) -> Utf8PathBuf {
        match &self.directory {
            Some(directory) if spec.output.is_relative() => directory.join(&spec.output),
            _ => spec.output.clone(),
        }
    }
}

/// Resolve every extract's region and format, then create its output file.
///
/// All regions and formats are validated before any file is created, so a
/// bad definition leaves the filesystem untouched.
///
/// # Errors
/// Returns a [`ConfigError`] for the first invalid definition or the first
/// output that cannot be created.
pub fn build_extracts(config: &ExtractConfig, options: &BuildOptions) -> Result<Vec<Extract>, ConfigError> {
    let prepared = config
        .extracts
        .iter()
        .map(|spec| prepare(config, spec, options))
        .collect::<Result<Vec<_>, _>>()?;

    prepared
        .into_iter()
        .map(|prepared| {
            let file: File = osm_extract_fs::create_output(&prepared.path, options.overwrite)
                .map_err(|source| ConfigError::Output {
                    path: prepared.path.clone(),
                    source,
                })?;
            let encoder = prepared
                .format
                .encoder(prepared.geometry.envelope(), &prepared.header);
            let output = ExtractOutput::new(encoder, Box::new(file))
                .with_commit_threshold(options.commit_threshold);
            info!(
                "Extract {} ({} {}, {}){}",
                prepared.path,
                prepared.geometry.kind_name(),
                describe_envelope(&prepared.geometry),
                prepared.format,
                prepared
                    .description
                    .as_deref()
                    .map(|text| format!(": {text}"))
                    .unwrap_or_default()
            );
            Ok(Extract::new(prepared.path.as_str(), prepared.geometry, output))
        })
        .collect()
}

struct PreparedExtract {
    path: Utf8PathBuf,
    geometry: Geometry,
    format: OutputFormat,
    header: OutputHeader,
    description: Option<String>,
}

fn prepare(
    config: &ExtractConfig,
    spec: &ExtractSpec,
    options: &BuildOptions,
) -> Result<PreparedExtract, ConfigError> {
    let path = config.output_path(spec);
    let format_error = |source| ConfigError::Format {
        output: spec.output.clone(),
        source,
    };
    let format = match &spec.output_format {
        Some(name) => name.parse().map_err(format_error)?,
        None => OutputFormat::from_path(&path)
            .map_err(format_error)?
            .or(options.default_format)
            .unwrap_or_default(),
    };
    let mut header = OutputHeader::default();
    for (key, value) in &spec.output_header {
        header.set(key, value).map_err(format_error)?;
    }
    let geometry = region(spec, &options.base_dir)?;
    debug!("{path}: {} region, {format} output", geometry.kind_name());
    Ok(PreparedExtract {
        path,
        geometry,
        format,
        header,
        description: spec.description.clone(),
    })
}

fn region(spec: &ExtractSpec, base_dir: &Utf8Path) -> Result<Geometry, ConfigError> {
    let geometry_error = |source| ConfigError::Geometry {
        output: spec.output.clone(),
        source,
    };
    let file_error = |source| ConfigError::GeometryFile {
        output: spec.output.clone(),
        source,
    };
    match (&spec.bbox, &spec.polygon, &spec.multipolygon) {
        (Some(bbox), None, None) => Ok(bbox.to_bbox().map_err(geometry_error)?.into()),
        (None, Some(PolygonSpec::File(file)), None)
        | (None, None, Some(MultiPolygonSpec::File(file))) => {
            load_geometry(&base_dir.join(&file.file_name), file.file_type.as_deref())
                .map_err(file_error)
        }
        (None, Some(PolygonSpec::Inline(rings)), None) => {
            inline_polygon(rings.iter()).map_err(geometry_error)
        }
        (None, None, Some(MultiPolygonSpec::Inline(polygons))) => {
            inline_polygon(polygons.iter().flatten()).map_err(geometry_error)
        }
        (bbox, polygon, multipolygon) => Err(ConfigError::Region {
            output: spec.output.clone(),
            found: usize::from(bbox.is_some())
                + usize::from(polygon.is_some())
                + usize::from(multipolygon.is_some()),
        }),
    }
}

fn inline_polygon<'a>(rings: impl Iterator<Item = &'a Vec<[f64; 2]>>) -> Result<Geometry, GeometryError> {
    let rings = rings
        .map(|ring| {
            ring.iter()
                .map(|&[lon, lat]| location_from_degrees(lon, lat))
                .collect::<Result<Vec<Location>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(&rings)?.into())
}

fn describe_envelope(geometry: &Geometry) -> String {
    let envelope = geometry.envelope();
    let (min, max) = (envelope.bottom_left(), envelope.top_right());
    format!("{},{},{},{}", min.lon(), min.lat(), max.lon(), max.lat())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(text: &str) -> Result<ExtractConfig, ConfigError> {
        ExtractConfig::from_json(Utf8Path::new("config.json"), text)
    }

    #[rstest]
    fn parses_every_region_form() {
        let config = parse(
            r#"{
                "directory": "out",
                "extracts": [
                    {"output": "a.osm", "bbox": [1, 2, 3, 4], "description": "array"},
                    {"output": "b.opl", "bbox": {"left": 1, "bottom": 2, "right": 3, "top": 4}},
                    {"output": "c.opl", "polygon": {"file_name": "c.poly"}},
                    {"output": "d.opl", "polygon": [[[0, 0], [1, 0], [1, 1]]]},
                    {"output": "/abs/e.opl", "multipolygon": [[[[0, 0], [1, 0], [1, 1]]]],
                     "output_header": {"generator": "test"}}
                ]
            }"#,
        )
        .expect("valid config");
        let specs = &config.extracts;
        assert_eq!(specs.len(), 5);
        assert_eq!(specs[0].bbox, Some(BboxSpec::Array([1.0, 2.0, 3.0, 4.0])));
        assert!(matches!(specs[1].bbox, Some(BboxSpec::Object { left, .. }) if left == 1.0));
        assert!(matches!(&specs[2].polygon, Some(PolygonSpec::File(file)) if file.file_type.is_none()));
        assert!(matches!(&specs[3].polygon, Some(PolygonSpec::Inline(rings)) if rings.len() == 1));
        assert_eq!(config.output_path(&specs[0]), Utf8PathBuf::from("out/a.osm"));
        assert_eq!(config.output_path(&specs[4]), Utf8PathBuf::from("/abs/e.opl"));
        assert_eq!(specs[4].output_header.get("generator").map(String::as_str), Some("test"));
    }

    #[rstest]
    #[case(r#"{"extracts": []}"#)]
    fn requires_extracts(#[case] text: &str) {
        assert!(matches!(parse(text), Err(ConfigError::NoExtracts { .. })));
    }

    #[rstest]
    #[case(r#"{"extracts": "#)]
    #[case(r#"{"directory": "x"}"#)]
    #[case(r#"{"extracts": [{"bbox": [1, 2, 3, 4]}]}"#)]
    fn rejects_malformed_documents(#[case] text: &str) {
        assert!(matches!(parse(text), Err(ConfigError::Parse { .. })));
    }

    #[rstest]
    #[case(r#"{"output": "x.opl"}"#, 0)]
    #[case(r#"{"output": "x.opl", "bbox": [0, 0, 1, 1], "polygon": [[[0, 0], [1, 0], [1, 1]]]}"#, 2)]
    fn requires_exactly_one_region(#[case] spec: &str, #[case] found: usize) {
        let spec: ExtractSpec = serde_json::from_str(spec).expect("valid spec");
        let err = region(&spec, Utf8Path::new(".")).expect_err("region count");
        assert!(matches!(err, ConfigError::Region { found: count, .. } if count == found));
    }

    #[rstest]
    fn reversed_bboxes_are_rejected() {
        let spec = ExtractSpec::new("x.opl", RegionSpec::Bbox(BboxSpec::Array([3.0, 0.0, 1.0, 1.0])));
        let err = region(&spec, Utf8Path::new(".")).expect_err("reversed");
        assert!(matches!(
            err,
            ConfigError::Geometry {
                source: GeometryError::InvertedBoundingBox,
                ..
            }
        ));
    }

    #[rstest]
    fn inline_multipolygons_combine_all_rings() {
        let spec = ExtractSpec::new(
            "x.opl",
            RegionSpec::MultiPolygon(MultiPolygonSpec::Inline(vec![
                vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]],
                vec![vec![[5.0, 5.0], [6.0, 5.0], [6.0, 6.0]]],
            ])),
        );
        let geometry = region(&spec, Utf8Path::new(".")).expect("valid region");
        assert!(geometry.contains(Location::new(9_000_000, 1_000_000)));
        assert!(geometry.contains(Location::new(59_000_000, 51_000_000)));
        assert!(!geometry.contains(Location::new(30_000_000, 30_000_000)));
    }

    #[rstest]
    fn invalid_formats_and_header_keys_are_reported() {
        let config = parse(
            r#"{"extracts": [
                {"output": "x.osm", "output_format": "pbf", "bbox": [0, 0, 1, 1]}
            ]}"#,
        )
        .expect("valid config");
        let err = build_extracts(&config, &BuildOptions::default()).expect_err("pbf output");
        assert!(matches!(
            err,
            ConfigError::Format {
                source: FormatError::Unsupported { .. },
                ..
            }
        ));

        let config = parse(
            r#"{"extracts": [
                {"output": "x.osm", "output_header": {"bad key": "x"}, "bbox": [0, 0, 1, 1]}
            ]}"#,
        )
        .expect("valid config");
        let err = build_extracts(&config, &BuildOptions::default()).expect_err("bad header key");
        assert!(matches!(
            err,
            ConfigError::Format {
                source: FormatError::HeaderKey { .. },
                ..
            }
        ));
    }
}
