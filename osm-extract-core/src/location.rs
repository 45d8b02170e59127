//! Fixed-point node locations.
//!
//! Coordinates are stored as integer multiples of 1e-7 degrees, the same
//! resolution the PBF format uses. All containment tests run on these
//! integers so that boundary decisions never depend on floating-point
//! rounding.

use geo::Coord;

/// Number of fixed-point units per degree.
pub const COORDINATE_PRECISION: i32 = 10_000_000;

const MAX_X: i32 = 180 * COORDINATE_PRECISION;
const MAX_Y: i32 = 90 * COORDINATE_PRECISION;

/// A WGS84 location in fixed-point units with `x = longitude`, `y = latitude`.
///
/// # Examples
/// ```
/// use osm_extract_core::Location;
///
/// let berlin = Location::from_degrees(13.4, 52.5).expect("finite coordinates");
/// assert_eq!(berlin.x(), 134_000_000);
/// assert!(berlin.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location(Coord<i32>);

impl Location {
    /// Construct a location from raw fixed-point units.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self(Coord { x, y })
    }

    /// Convert degrees to fixed-point units.
    ///
    /// Returns `None` for non-finite input or values that do not fit the
    /// fixed-point range. The result may still be outside the valid WGS84
    /// range; check [`Location::is_valid`] before using it for containment.
    #[must_use]
    pub fn from_degrees(lon: f64, lat: f64) -> Option<Self> {
        Some(Self::new(to_fixed(lon)?, to_fixed(lat)?))
    }

    /// Longitude in fixed-point units.
    #[must_use]
    pub const fn x(self) -> i32 {
        self.0.x
    }

    /// Latitude in fixed-point units.
    #[must_use]
    pub const fn y(self) -> i32 {
        self.0.y
    }

    /// Longitude in degrees.
    #[must_use]
    pub fn lon(self) -> f64 {
        f64::from(self.0.x) / f64::from(COORDINATE_PRECISION)
    }

    /// Latitude in degrees.
    #[must_use]
    pub fn lat(self) -> f64 {
        f64::from(self.0.y) / f64::from(COORDINATE_PRECISION)
    }

    /// Whether the location lies within the WGS84 coordinate range.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0.x >= -MAX_X && self.0.x <= MAX_X && self.0.y >= -MAX_Y && self.0.y <= MAX_Y
    }

    /// The underlying `geo` coordinate.
    #[must_use]
    pub const fn coord(self) -> Coord<i32> {
        self.0
    }
}

impl From<Coord<i32>> for Location {
    fn from(coord: Coord<i32>) -> Self {
        Self(coord)
    }
}

fn to_fixed(degrees: f64) -> Option<i32> {
    if !degrees.is_finite() {
        return None;
    }
    let scaled = (degrees * f64::from(COORDINATE_PRECISION)).round();
    if scaled < f64::from(i32::MIN) || scaled > f64::from(i32::MAX) {
        return None;
    }
    Some(scaled as i32)
}
