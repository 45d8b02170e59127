//! Core of the OSM extract engine.
//!
//! The crate splits an ordered stream of OSM nodes, ways and relations into
//! any number of regional extracts in a small, fixed number of sequential
//! passes. It provides:
//!
//! - fixed-point [`Location`]s and the [`Geometry`] containment tests,
//!   including the banded [`Polygon`] index;
//! - the [`Pass`] driver that fans each entity out to every extract;
//! - the [`Strategy`] variants (`simple`, `complete_ways` with its history
//!   flavour, `smart`) and the relation parent closure they share;
//! - buffered [`ExtractOutput`]s parameterised by an [`EntityEncoder`].
//!
//! Reading files and encoding concrete formats live in `osm-extract-data`.
//!
//! # Examples
//!
//! ```
//! use osm_extract_core::{
//!     BoundingBox, Extract, ExtractOutput, Location, MemorySource, StrategyKind,
//!     StrategyOptions, build_strategy, run_strategy,
//!     test_support::{IdListEncoder, SharedBuffer, node, way},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let bbox = BoundingBox::new(Location::new(0, 0), Location::new(10, 10))?;
//! let buffer = SharedBuffer::default();
//! let output = ExtractOutput::new(Box::new(IdListEncoder), Box::new(buffer.clone()));
//! let extract = Extract::new("inner", bbox.into(), output);
//!
//! let source = MemorySource::new(
//!     "memory",
//!     vec![node(1, 5, 5).into(), node(2, 50, 50).into(), way(3, &[1, 2]).into()],
//! );
//! let mut strategy = build_strategy(
//!     StrategyKind::CompleteWays,
//!     StrategyOptions::default(),
//!     vec![extract],
//!     false,
//! )?;
//! run_strategy(strategy.as_mut(), &source)?;
//! assert_eq!(buffer.lines(), ["n1", "n2", "w3"]);
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod extract;
pub mod geometry;
pub mod ids;
pub mod location;
pub mod order;
pub mod output;
pub mod parents;
pub mod pass;
pub mod progress;
pub mod source;
pub mod strategy;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use entity::{Entity, EntityKind, KindFilter, Member, Node, Relation, Tags, Way};
pub use error::{ExtractError, OptionError};
pub use extract::{Extract, ExtractReport};
pub use geometry::{BoundingBox, Geometry, GeometryError, Polygon, location_from_degrees};
pub use ids::{IdSet, positive_id};
pub use location::{COORDINATE_PRECISION, Location};
pub use order::{OrderCheck, OrderError};
pub use output::{DEFAULT_COMMIT_THRESHOLD, EntityEncoder, ExtractOutput, WriteCounts};
pub use parents::{ParentIndex, ParentIndexBuilder, add_relation_parents, close_relation_parents};
pub use pass::{Pass, run_pass};
pub use progress::Progress;
pub use source::{EntitySource, EntityVisitor, MemorySource};
pub use strategy::{
    CompleteWays, CompleteWaysWithHistory, RunReport, Simple, Smart, SmartSettings, Strategy,
    StrategyKind, StrategyOptions, TagRule, build_strategy, run_strategy,
};
