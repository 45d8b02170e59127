//! Property tests for the banded polygon index.

use osm_extract_core::{Location, Polygon};
use proptest::prelude::*;

fn location() -> impl Strategy<Value = Location> {
    (-1_200..1_200_i32, -1_200..1_200_i32).prop_map(|(x, y)| Location::new(x, y))
}

fn ring() -> impl Strategy<Value = Vec<Location>> {
    prop::collection::vec(
        (-1_000..1_000_i32, -1_000..1_000_i32).prop_map(|(x, y)| Location::new(x, y)),
        3..60,
    )
}

fn rings() -> impl Strategy<Value = Vec<Vec<Location>>> {
    prop::collection::vec(ring(), 1..4)
}

proptest! {
    #[test]
    fn banded_index_matches_exhaustive_scan(rings in rings(), probes in prop::collection::vec(location(), 1..50)) {
        let Ok(polygon) = Polygon::new(&rings) else { return Ok(()) };
        for probe in probes {
            prop_assert_eq!(
                polygon.contains(probe),
                polygon.contains_exhaustive(probe),
                "disagreement at {:?}",
                probe
            );
        }
    }

    #[test]
    fn vertices_are_contained(rings in rings()) {
        let Ok(polygon) = Polygon::new(&rings) else { return Ok(()) };
        let proper = rings
            .iter()
            .filter(|ring| ring.windows(2).any(|pair| pair.first() != pair.last()));
        for vertex in proper.flatten() {
            prop_assert!(polygon.contains(*vertex), "vertex {:?} reported outside", vertex);
        }
    }

    #[test]
    fn nothing_outside_the_envelope_is_contained(rings in rings(), probe in location()) {
        let Ok(polygon) = Polygon::new(&rings) else { return Ok(()) };
        if !polygon.envelope().contains(probe) {
            prop_assert!(!polygon.contains(probe));
        }
    }
}

#[test]
fn dense_polygon_uses_many_bands() {
    // A 2000-vertex star exercises the multi-band path deterministically.
    let star: Vec<Location> = (0..2_000_i32)
        .map(|index| {
            let radius = if index % 2 == 0 { 1_000 } else { 400 };
            let angle = f64::from(index) * std::f64::consts::TAU / 2_000.0;
            let (x, y) = (
                (f64::from(radius) * angle.cos()).round() as i32,
                (f64::from(radius) * angle.sin()).round() as i32,
            );
            Location::new(x, y)
        })
        .collect();
    let polygon = Polygon::new(&[star]).expect("valid star");
    assert_eq!(polygon.band_count(), 200);
    for y in (-1_000..=1_000).step_by(37) {
        for x in (-1_000..=1_000).step_by(41) {
            let probe = Location::new(x, y);
            assert_eq!(polygon.contains(probe), polygon.contains_exhaustive(probe));
        }
    }
    assert!(polygon.contains(Location::new(0, 0)));
}
