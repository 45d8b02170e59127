//! GeoJSON polygons.

use geojson::{GeoJson, Geometry, Value};
use log::warn;
use osm_extract_core::{GeometryError, Location, location_from_degrees};
use thiserror::Error;

/// Problems with GeoJSON polygon input.
#[derive(Debug, Error)]
pub enum GeoJsonError {
    #[error(transparent)]
    Decode(#[from] geojson::Error),
    #[error("no Polygon or MultiPolygon geometry found")]
    NoPolygon,
    #[error("position has fewer than two coordinates")]
    ShortPosition,
    #[error(transparent)]
    Range(#[from] GeometryError),
}

/// Parse GeoJSON text into rings.
///
/// A `FeatureCollection` contributes its first polygonal feature only; any
/// further features are reported and ignored.
///
/// # Errors
/// Returns a [`GeoJsonError`] for invalid JSON, non-polygonal geometry or
/// coordinates outside WGS84.
///
/// # Examples
/// ```
/// use osm_extract_data::parse_geojson;
///
/// let rings = parse_geojson(
///     r#"{"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}"#,
/// )?;
/// assert_eq!(rings.len(), 1);
/// # Ok::<(), osm_extract_data::GeoJsonError>(())
/// ```
pub fn parse_geojson(text: &str) -> Result<Vec<Vec<Location>>, GeoJsonError> {
    let geometry = match text.parse::<GeoJson>()? {
        GeoJson::Geometry(geometry) => geometry,
        GeoJson::Feature(feature) => feature.geometry.ok_or(GeoJsonError::NoPolygon)?,
        GeoJson::FeatureCollection(collection) => {
            let total = collection.features.len();
            let mut polygonal = collection
                .features
                .into_iter()
                .filter_map(|feature| feature.geometry)
                .filter(is_polygonal);
            let first = polygonal.next().ok_or(GeoJsonError::NoPolygon)?;
            if total > 1 {
                warn!("GeoJSON FeatureCollection has {total} features; using the first polygon only");
            }
            first
        }
    };
    rings_of(&geometry)
}

fn is_polygonal(geometry: &Geometry) -> bool {
    matches!(geometry.value, Value::Polygon(_) | Value::MultiPolygon(_))
}

fn rings_of(geometry: &Geometry) -> Result<Vec<Vec<Location>>, GeoJsonError> {
    let polygons = match &geometry.value {
        Value::Polygon(rings) => std::slice::from_ref(rings),
        Value::MultiPolygon(polygons) => polygons.as_slice(),
        _ => return Err(GeoJsonError::NoPolygon),
    };
    polygons
        .iter()
        .flatten()
        .map(|ring| ring.iter().map(|position| location(position)).collect())
        .collect()
}

fn location(position: &[f64]) -> Result<Location, GeoJsonError> {
    match position {
        [lon, lat, ..] => Ok(location_from_degrees(*lon, *lat)?),
        _ => Err(GeoJsonError::ShortPosition),
    }
}
