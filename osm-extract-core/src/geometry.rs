//! Containment geometry: bounding boxes and banded polygons.
//!
//! Polygons are indexed into horizontal bands so that a point-in-polygon
//! test only looks at the handful of segments that can cross a horizontal
//! ray from the point. Rings are combined with the even-odd rule, so holes
//! and multiple outer rings need no special treatment.

use geo::{Coord, Rect};
use thiserror::Error;

use crate::Location;

const SEGMENTS_PER_BAND: usize = 10;
const MAX_BANDS: usize = 10_000;

/// Errors raised while constructing a containment geometry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// A coordinate could not be represented or lies outside WGS84.
    #[error("coordinate ({lon}, {lat}) is outside the valid range")]
    CoordinateOutOfRange {
        /// Longitude in degrees, as supplied.
        lon: String,
        /// Latitude in degrees, as supplied.
        lat: String,
    },
    /// Bounding box corners are reversed.
    #[error("bounding box is empty: left must not exceed right and bottom must not exceed top")]
    InvertedBoundingBox,
    /// The polygon rings produced no usable segments.
    #[error("polygon has no segments")]
    EmptyPolygon,
}

/// Convert a degree pair into a valid location or report the offending values.
///
/// # Errors
/// Returns [`GeometryError::CoordinateOutOfRange`] when the pair is not a
/// valid WGS84 coordinate.
pub fn location_from_degrees(lon: f64, lat: f64) -> Result<Location, GeometryError> {
    Location::from_degrees(lon, lat)
        .filter(|location| location.is_valid())
        .ok_or_else(|| GeometryError::CoordinateOutOfRange {
            lon: lon.to_string(),
            lat: lat.to_string(),
        })
}

/// Inclusive axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    rect: Rect<i32>,
}

impl BoundingBox {
    /// Build a box from its bottom-left and top-right corners.
    ///
    /// # Errors
    /// Returns [`GeometryError::InvertedBoundingBox`] when the corners are
    /// swapped on either axis.
    pub fn new(bottom_left: Location, top_right: Location) -> Result<Self, GeometryError> {
        if bottom_left.x() > top_right.x() || bottom_left.y() > top_right.y() {
            return Err(GeometryError::InvertedBoundingBox);
        }
        Ok(Self {
            rect: Rect::new(bottom_left.coord(), top_right.coord()),
        })
    }

    /// Build a box from `left, bottom, right, top` in degrees.
    ///
    /// # Errors
    /// Returns a [`GeometryError`] for out-of-range or reversed corners.
    ///
    /// # Examples
    /// ```
    /// use osm_extract_core::{BoundingBox, Location};
    ///
    /// let bbox = BoundingBox::from_degrees(0.0, 0.0, 10.0, 10.0)?;
    /// assert!(bbox.contains(Location::from_degrees(10.0, 5.0).expect("finite")));
    /// # Ok::<(), osm_extract_core::GeometryError>(())
    /// ```
    pub fn from_degrees(left: f64, bottom: f64, right: f64, top: f64) -> Result<Self, GeometryError> {
        Self::new(
            location_from_degrees(left, bottom)?,
            location_from_degrees(right, top)?,
        )
    }

    /// Bottom-left corner.
    #[must_use]
    pub fn bottom_left(&self) -> Location {
        Location::from(self.rect.min())
    }

    /// Top-right corner.
    #[must_use]
    pub fn top_right(&self) -> Location {
        Location::from(self.rect.max())
    }

    /// Inclusive containment test; invalid locations are never contained.
    #[must_use]
    pub fn contains(&self, location: Location) -> bool {
        let min = self.rect.min();
        let max = self.rect.max();
        location.is_valid()
            && location.x() >= min.x
            && location.x() <= max.x
            && location.y() >= min.y
            && location.y() <= max.y
    }
}

/// Directed segment between two consecutive ring points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    first: Location,
    second: Location,
}

impl Segment {
    fn min_y(self) -> i32 {
        self.first.y().min(self.second.y())
    }

    fn max_y(self) -> i32 {
        self.first.y().max(self.second.y())
    }

    fn touches(self, location: Location) -> bool {
        self.first == location || self.second == location
    }

    /// Whether a ray from `location` towards positive x crosses the segment.
    fn crosses_ray(self, location: Location) -> bool {
        if (self.first.y() > location.y()) == (self.second.y() > location.y()) {
            return false;
        }
        let ax = i64::from(self.first.x()) - i64::from(location.x());
        let ay = i64::from(self.first.y()) - i64::from(location.y());
        let bx = i64::from(self.second.x()) - i64::from(location.x());
        let by = i64::from(self.second.y()) - i64::from(location.y());
        // Sign of the x intercept relative to the point, without division.
        let cross = ax * by - bx * ay;
        cross != 0 && ((cross > 0) == (by > ay))
    }
}

/// Polygon (or multipolygon) with a banded segment index.
///
/// # Examples
/// ```
/// use osm_extract_core::{Location, Polygon};
///
/// let square = vec![
///     Location::new(0, 0),
///     Location::new(100, 0),
///     Location::new(100, 100),
///     Location::new(0, 100),
/// ];
/// let polygon = Polygon::new(&[square])?;
/// assert!(polygon.contains(Location::new(50, 50)));
/// assert!(polygon.contains(Location::new(100, 100)));
/// assert!(!polygon.contains(Location::new(150, 50)));
/// # Ok::<(), osm_extract_core::GeometryError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Polygon {
    envelope: BoundingBox,
    bands: Vec<Vec<Segment>>,
    band_height: i64,
    segments: Vec<Segment>,
}

impl Polygon {
    /// Index the supplied rings.
    ///
    /// Rings need not repeat their first point at the end; a closing segment
    /// is added when it is missing. Zero-length segments are ignored.
    ///
    /// # Errors
    /// Returns [`GeometryError::EmptyPolygon`] when no segments remain.
    pub fn new(rings: &[Vec<Location>]) -> Result<Self, GeometryError> {
        let segments: Vec<Segment> = rings.iter().flat_map(|ring| ring_segments(ring)).collect();
        let envelope = envelope_of(&segments).ok_or(GeometryError::EmptyPolygon)?;

        let band_count = (segments.len() / SEGMENTS_PER_BAND).clamp(1, MAX_BANDS);
        let count = i64::try_from(band_count).unwrap_or(1);
        let bottom = i64::from(envelope.bottom_left().y());
        let height = i64::from(envelope.top_right().y()) - bottom;
        let band_height = (height + count) / count;

        let mut bands = vec![Vec::new(); band_count];
        for segment in &segments {
            let first = band_index(segment.min_y(), bottom, band_height);
            let last = band_index(segment.max_y(), bottom, band_height);
            for band in bands.iter_mut().take(last + 1).skip(first) {
                band.push(*segment);
            }
        }

        Ok(Self {
            envelope,
            bands,
            band_height,
            segments,
        })
    }

    /// Bounding box of all rings.
    #[must_use]
    pub const fn envelope(&self) -> BoundingBox {
        self.envelope
    }

    /// Number of bands in the index.
    #[must_use]
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Number of indexed segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Point-in-polygon test using the band index.
    ///
    /// Locations equal to a ring vertex count as inside.
    #[must_use]
    pub fn contains(&self, location: Location) -> bool {
        if !self.envelope.contains(location) {
            return false;
        }
        let bottom = i64::from(self.envelope.bottom_left().y());
        let band = band_index(location.y(), bottom, self.band_height);
        self.bands
            .get(band)
            .is_some_and(|segments| ray_cast(segments.iter().copied(), location))
    }

    /// Point-in-polygon test scanning every segment.
    ///
    /// Slower than [`Polygon::contains`]; the band index must always agree
    /// with it.
    #[must_use]
    pub fn contains_exhaustive(&self, location: Location) -> bool {
        if !self.envelope.contains(location) {
            return false;
        }
        ray_cast(self.segments.iter().copied(), location)
    }
}

fn ray_cast(segments: impl Iterator<Item = Segment>, location: Location) -> bool {
    let mut inside = false;
    for segment in segments {
        if segment.touches(location) {
            return true;
        }
        if segment.crosses_ray(location) {
            inside = !inside;
        }
    }
    inside
}

fn band_index(y: i32, bottom: i64, band_height: i64) -> usize {
    usize::try_from((i64::from(y) - bottom) / band_height).unwrap_or(0)
}

fn ring_segments(ring: &[Location]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = ring
        .windows(2)
        .filter_map(|pair| match pair {
            [first, second] if first != second => Some(Segment {
                first: *first,
                second: *second,
            }),
            _ => None,
        })
        .collect();
    if let (Some(first), Some(last)) = (ring.first(), ring.last())
        && first != last
    {
        segments.push(Segment {
            first: *last,
            second: *first,
        });
    }
    segments
}

fn envelope_of(segments: &[Segment]) -> Option<BoundingBox> {
    let mut points = segments
        .iter()
        .flat_map(|segment| [segment.first, segment.second]);
    let start = points.next()?;
    let (mut min, mut max) = (start.coord(), start.coord());
    for point in points {
        min = Coord {
            x: min.x.min(point.x()),
            y: min.y.min(point.y()),
        };
        max = Coord {
            x: max.x.max(point.x()),
            y: max.y.max(point.y()),
        };
    }
    BoundingBox::new(Location::from(min), Location::from(max)).ok()
}

/// Region an extract selects nodes from.
#[derive(Debug, Clone)]
pub enum Geometry {
    /// Axis-aligned box.
    BoundingBox(BoundingBox),
    /// Banded polygon or multipolygon.
    Polygon(Polygon),
}

impl Geometry {
    /// Whether `location` lies inside the region.
    #[must_use]
    pub fn contains(&self, location: Location) -> bool {
        match self {
            Self::BoundingBox(bbox) => bbox.contains(location),
            Self::Polygon(polygon) => polygon.contains(location),
        }
    }

    /// Bounding box of the region.
    #[must_use]
    pub fn envelope(&self) -> BoundingBox {
        match self {
            Self::BoundingBox(bbox) => *bbox,
            Self::Polygon(polygon) => polygon.envelope(),
        }
    }

    /// Short description used in log messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::BoundingBox(_) => "bbox",
            Self::Polygon(_) => "polygon",
        }
    }
}

impl From<BoundingBox> for Geometry {
    fn from(bbox: BoundingBox) -> Self {
        Self::BoundingBox(bbox)
    }
}

impl From<Polygon> for Geometry {
    fn from(polygon: Polygon) -> Self {
        Self::Polygon(polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn ring(points: &[(i32, i32)]) -> Vec<Location> {
        points.iter().map(|&(x, y)| Location::new(x, y)).collect()
    }

    #[fixture]
    fn square_with_hole() -> Polygon {
        let outer = ring(&[(0, 0), (100, 0), (100, 100), (0, 100), (0, 0)]);
        let hole = ring(&[(40, 40), (60, 40), (60, 60), (40, 60)]);
        Polygon::new(&[outer, hole]).expect("valid rings")
    }

    #[rstest]
    #[case(Location::new(0, 0), true)]
    #[case(Location::new(10, 10), true)]
    #[case(Location::new(10, 5), true)]
    #[case(Location::new(11, 5), false)]
    #[case(Location::new(-1, 5), false)]
    fn bbox_is_inclusive(#[case] location: Location, #[case] expected: bool) {
        let bbox = BoundingBox::new(Location::new(0, 0), Location::new(10, 10)).expect("ordered");
        assert_eq!(bbox.contains(location), expected);
    }

    #[rstest]
    fn bbox_rejects_invalid_locations() {
        let bbox = BoundingBox::new(Location::new(i32::MIN, i32::MIN), Location::new(i32::MAX, i32::MAX))
            .expect("ordered");
        assert!(!bbox.contains(Location::new(i32::MAX, 0)));
    }

    #[rstest]
    fn bbox_rejects_inverted_corners() {
        let err = BoundingBox::from_degrees(10.0, 0.0, 0.0, 10.0).expect_err("inverted");
        assert_eq!(err, GeometryError::InvertedBoundingBox);
    }

    #[rstest]
    fn bbox_rejects_out_of_range_degrees() {
        let err = BoundingBox::from_degrees(0.0, 0.0, 200.0, 10.0).expect_err("out of range");
        assert!(matches!(err, GeometryError::CoordinateOutOfRange { .. }));
    }

    #[rstest]
    #[case(Location::new(20, 20), true)]
    #[case(Location::new(50, 50), false)]
    #[case(Location::new(40, 40), true)]
    #[case(Location::new(100, 0), true)]
    #[case(Location::new(101, 50), false)]
    #[case(Location::new(50, 100), false)]
    fn polygon_uses_even_odd_rule(
        square_with_hole: Polygon,
        #[case] location: Location,
        #[case] expected: bool,
    ) {
        assert_eq!(square_with_hole.contains(location), expected);
        assert_eq!(square_with_hole.contains_exhaustive(location), expected);
    }

    #[rstest]
    fn closing_segment_is_added_when_missing() {
        let open = ring(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        let polygon = Polygon::new(&[open]).expect("valid ring");
        assert_eq!(polygon.segment_count(), 4);
        assert!(polygon.contains(Location::new(5, 5)));
    }

    #[rstest]
    fn degenerate_rings_are_rejected() {
        let point = ring(&[(5, 5), (5, 5)]);
        let err = Polygon::new(&[point]).expect_err("no segments");
        assert_eq!(err, GeometryError::EmptyPolygon);
    }

    #[rstest]
    #[case(4, 1)]
    #[case(250, 25)]
    #[case(200_000, 10_000)]
    fn band_count_scales_with_segments(#[case] points: i32, #[case] bands: usize) {
        let zigzag: Vec<Location> = (0..points)
            .map(|index| Location::new(index, if index % 2 == 0 { 0 } else { index }))
            .collect();
        let polygon = Polygon::new(&[zigzag]).expect("valid ring");
        assert_eq!(polygon.band_count(), bands);
    }

    #[rstest]
    fn geometry_delegates_to_variant(square_with_hole: Polygon) {
        let geometry = Geometry::from(square_with_hole);
        assert!(geometry.contains(Location::new(10, 90)));
        assert_eq!(geometry.kind_name(), "polygon");
        assert_eq!(geometry.envelope().top_right(), Location::new(100, 100));
    }
}
