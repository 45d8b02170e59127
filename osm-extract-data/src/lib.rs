//! Adapters between the extract engine and the outside world.
//!
//! - [`PbfSource`] reads OSM PBF files or standard input with `osmpbf`;
//! - [`OplEncoder`] and [`XmlEncoder`] write extract outputs;
//! - [`load_geometry`] reads `.poly`, GeoJSON and OSM boundary files;
//! - [`ExtractConfig`] and [`build_extracts`] turn a JSON configuration into
//!   ready-to-run extracts.

pub mod config;
pub mod format;
pub mod geometry;
pub mod opl;
pub mod pbf;
pub mod xml;

pub use config::{
    BboxSpec, BuildOptions, ConfigError, ExtractConfig, ExtractSpec, GeometryFileSpec,
    MultiPolygonSpec, PolygonSpec, RegionSpec, build_extracts,
};
pub use format::{DEFAULT_GENERATOR, FormatError, OutputFormat, OutputHeader};
pub use geometry::{
    BoundaryError, GeoJsonError, GeometryFileError, GeometryFileType, OsmXmlError, PolyError,
    assemble_boundary, load_geometry, parse_geojson, parse_poly,
};
pub use opl::OplEncoder;
pub use pbf::{PbfSource, PbfSourceError};
pub use xml::XmlEncoder;
