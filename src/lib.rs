//! Facade crate for the OSM extract engine.
//!
//! This crate re-exports the entity model, region geometry and extraction
//! strategies from `osm-extract-core` together with the PBF reader, output
//! encoders and configuration loading from `osm-extract-data`.
//!
//! ```no_run
//! use camino::Utf8Path;
//! use osm_extract::{
//!     BuildOptions, ExtractConfig, PbfSource, StrategyKind, StrategyOptions, build_extracts,
//!     build_strategy, run_strategy,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtractConfig::load(Utf8Path::new("extracts.json"))?;
//! let extracts = build_extracts(&config, &BuildOptions::default())?;
//! let source = PbfSource::open(Utf8Path::new("planet.osm.pbf"))?;
//! let mut strategy = build_strategy(
//!     StrategyKind::CompleteWays,
//!     StrategyOptions::default(),
//!     extracts,
//!     false,
//! )?;
//! let report = run_strategy(strategy.as_mut(), &source)?;
//! println!("wrote {} extracts", report.extracts.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub use osm_extract_core::{
    BoundingBox, Entity, EntityKind, EntitySource, EntityVisitor, Extract, ExtractError,
    ExtractReport, Geometry, GeometryError, IdSet, Location, Member, Node, Polygon, Relation,
    RunReport, Strategy, StrategyKind, StrategyOptions, Tags, Way, build_strategy, run_strategy,
};
pub use osm_extract_data::{
    BuildOptions, ConfigError, ExtractConfig, ExtractSpec, GeometryFileError, OplEncoder,
    OutputFormat, PbfSource, PbfSourceError, XmlEncoder, build_extracts, load_geometry,
};
