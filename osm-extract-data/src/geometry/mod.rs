//! Loading extract polygons from `.poly`, GeoJSON and OSM boundary files.

use std::{fmt, io, io::Read, str::FromStr};

use camino::{Utf8Path, Utf8PathBuf};
use log::info;
use osm_extract_core::{ExtractError, Geometry, GeometryError, Location, Polygon};
use thiserror::Error;

mod json;
mod osm;
mod poly;

pub use self::json::{GeoJsonError, parse_geojson};
pub use self::osm::{BoundaryError, OsmXmlError, assemble_boundary};
pub use self::poly::{PolyError, parse_poly};

use crate::PbfSourceError;

/// Errors raised while loading a polygon file.
#[derive(Debug, Error)]
pub enum GeometryFileError {
    #[error("failed to read polygon file {path}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("unknown polygon file type `{file_type}` for {path} (expected poly, geojson or osm)")]
    UnknownType { path: Utf8PathBuf, file_type: String },
    #[error("cannot tell the polygon file type of {path}; name it explicitly")]
    UndetectedType { path: Utf8PathBuf },
    #[error("invalid poly file {path}")]
    Poly {
        path: Utf8PathBuf,
        #[source]
        source: PolyError,
    },
    #[error("invalid GeoJSON file {path}")]
    GeoJson {
        path: Utf8PathBuf,
        #[source]
        source: GeoJsonError,
    },
    #[error("failed to open OSM boundary file {path}")]
    OsmOpen {
        path: Utf8PathBuf,
        #[source]
        source: PbfSourceError,
    },
    #[error("failed to read OSM boundary file {path}")]
    OsmRead {
        path: Utf8PathBuf,
        #[source]
        source: ExtractError,
    },
    #[error("invalid OSM XML boundary file {path}")]
    OsmXml {
        path: Utf8PathBuf,
        #[source]
        source: OsmXmlError,
    },
    #[error("cannot build a boundary from {path}")]
    Boundary {
        path: Utf8PathBuf,
        #[source]
        source: BoundaryError,
    },
    #[error("polygon in {path} is unusable")]
    Geometry {
        path: Utf8PathBuf,
        #[source]
        source: GeometryError,
    },
}

/// Polygon file encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFileType {
    /// Osmosis polygon filter format.
    Poly,
    /// GeoJSON `Polygon`, `MultiPolygon`, `Feature` or `FeatureCollection`.
    GeoJson,
    /// OSM PBF or XML file holding a boundary relation or closed ways.
    /// Names ending in `.pbf` are read as PBF, others as XML.
    Osm,
}

impl GeometryFileType {
    /// Detect the type from the file name suffix.
    #[must_use]
    pub fn from_path(path: &Utf8Path) -> Option<Self> {
        let name = path.file_name()?.to_ascii_lowercase();
        if name.ends_with(".poly") {
            Some(Self::Poly)
        } else if name.ends_with(".geojson") || name.ends_with(".json") {
            Some(Self::GeoJson)
        } else if name.ends_with(".pbf") || name.ends_with(".osm") || name.ends_with(".osm.xml") {
            Some(Self::Osm)
        } else {
            None
        }
    }
}

impl fmt::Display for GeometryFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Poly => "poly",
            Self::GeoJson => "geojson",
            Self::Osm => "osm",
        })
    }
}

impl FromStr for GeometryFileType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "poly" => Ok(Self::Poly),
            "geojson" | "json" => Ok(Self::GeoJson),
            "osm" | "pbf" | "osm.pbf" | "xml" | "osm.xml" => Ok(Self::Osm),
            _ => Err(value.to_owned()),
        }
    }
}

/// Load the polygon stored at `path`.
///
/// `file_type` overrides detection from the file name.
///
/// # Errors
/// Returns a [`GeometryFileError`] when the type is unknown, the file cannot
/// be read or parsed, or the rings do not form a usable polygon.
///
/// # Examples
/// ```no_run
/// use camino::Utf8Path;
/// use osm_extract_data::load_geometry;
///
/// # fn main() -> Result<(), osm_extract_data::GeometryFileError> {
/// let geometry = load_geometry(Utf8Path::new("berlin.poly"), None)?;
/// println!("{:?}", geometry.envelope());
/// # Ok(())
/// # }
/// ```
pub fn load_geometry(path: &Utf8Path, file_type: Option<&str>) -> Result<Geometry, GeometryFileError> {
    let file_type = match file_type {
        Some(name) => name
            .parse::<GeometryFileType>()
            .map_err(|file_type| GeometryFileError::UnknownType {
                path: path.to_path_buf(),
                file_type,
            })?,
        None => GeometryFileType::from_path(path).ok_or_else(|| {
            GeometryFileError::UndetectedType {
                path: path.to_path_buf(),
            }
        })?,
    };
    let rings = match file_type {
        GeometryFileType::Poly => parse_poly(&read_text(path)?).map_err(|source| {
            GeometryFileError::Poly {
                path: path.to_path_buf(),
                source,
            }
        })?,
        GeometryFileType::GeoJson => parse_geojson(&read_text(path)?).map_err(|source| {
            GeometryFileError::GeoJson {
                path: path.to_path_buf(),
                source,
            }
        })?,
        GeometryFileType::Osm => osm::load_boundary(path)?,
    };
    polygon_from_rings(path, &rings)
}

fn polygon_from_rings(path: &Utf8Path, rings: &[Vec<Location>]) -> Result<Geometry, GeometryFileError> {
    let polygon = Polygon::new(rings).map_err(|source| GeometryFileError::Geometry {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        "Loaded polygon from {path}: {} rings, {} segments",
        rings.len(),
        polygon.segment_count()
    );
    Ok(polygon.into())
}

fn read_text(path: &Utf8Path) -> Result<String, GeometryFileError> {
    let read_error = |source| GeometryFileError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut text = String::new();
    osm_extract_fs::open_input(path)
        .map_err(read_error)?
        .read_to_string(&mut text)
        .map_err(read_error)?;
    Ok(text)
}
