//! Osmosis `.poly` files.
//!
//! ```text
//! berlin
//! 1
//!     13.08 52.33
//!     13.76 52.33
//!     13.76 52.67
//! END
//! !2
//!     13.30 52.45
//!     ...
//! END
//! END
//! ```
//!
//! The first line names the polygon. Each section has a header line, one
//! `lon lat` pair per line and a closing `END`; a header starting with `!`
//! marks a hole. A final `END` closes the file.

use log::debug;
use osm_extract_core::{GeometryError, Location, location_from_degrees};
use thiserror::Error;

const MIN_RING_POINTS: usize = 3;

/// Syntax errors in a `.poly` file; lines are 1-based.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolyError {
    #[error("file is empty")]
    Empty,
    #[error("line {line}: expected `lon lat`, found `{text}`")]
    Coordinate { line: usize, text: String },
    #[error("line {line}: coordinate is out of range")]
    Range {
        line: usize,
        #[source]
        source: GeometryError,
    },
    #[error("line {line}: ring has {points} points but needs at least 3")]
    ShortRing { line: usize, points: usize },
    #[error("ring starting on line {line} is missing its END")]
    UnterminatedRing { line: usize },
    #[error("file is missing its final END")]
    Unterminated,
    #[error("file contains no rings")]
    NoRings,
}

/// Parse `.poly` text into rings.
///
/// # Errors
/// Returns a [`PolyError`] naming the offending line.
///
/// # Examples
/// ```
/// use osm_extract_data::parse_poly;
///
/// let rings = parse_poly("area\n1\n 0 0\n 1 0\n 1 1\nEND\nEND\n")?;
/// assert_eq!(rings.len(), 1);
/// assert_eq!(rings[0].len(), 3);
/// # Ok::<(), osm_extract_data::PolyError>(())
/// ```
pub fn parse_poly(text: &str) -> Result<Vec<Vec<Location>>, PolyError> {
    let mut lines = text.lines().enumerate().map(|(index, line)| (index + 1, line.trim()));
    let Some((_, name)) = lines.next() else {
        return Err(PolyError::Empty);
    };

    let mut rings = Vec::new();
    let mut holes = 0_usize;
    let mut ring: Option<(usize, Vec<Location>)> = None;
    for (line, content) in lines {
        if content.is_empty() {
            continue;
        }
        match ring.take() {
            None if content == "END" => {
                if rings.is_empty() {
                    return Err(PolyError::NoRings);
                }
                debug!("poly `{name}`: {} rings, {holes} holes", rings.len());
                return Ok(rings);
            }
            None => {
                if content.starts_with('!') {
                    holes += 1;
                }
                ring = Some((line, Vec::new()));
            }
            Some((start, points)) if content == "END" => {
                if points.len() < MIN_RING_POINTS {
                    return Err(PolyError::ShortRing {
                        line: start,
                        points: points.len(),
                    });
                }
                rings.push(points);
            }
            Some((start, mut points)) => {
                points.push(parse_point(line, content)?);
                ring = Some((start, points));
            }
        }
    }
    match ring {
        Some((start, _)) => Err(PolyError::UnterminatedRing { line: start }),
        None => Err(PolyError::Unterminated),
    }
}

fn parse_point(line: usize, content: &str) -> Result<Location, PolyError> {
    let malformed = || PolyError::Coordinate {
        line,
        text: content.to_owned(),
    };
    let mut fields = content.split_whitespace();
    let (Some(lon), Some(lat), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(malformed());
    };
    let lon: f64 = lon.parse().map_err(|_| malformed())?;
    let lat: f64 = lat.parse().map_err(|_| malformed())?;
    location_from_degrees(lon, lat).map_err(|source| PolyError::Range { line, source })
}
