//! Compact per-extract identifier sets.

use roaring::RoaringTreemap;

/// Map a signed OSM identifier onto the unsigned key space of [`IdSet`].
///
/// Negative identifiers (locally created objects) share the key of their
/// absolute value, so `-5` and `5` are indistinguishable inside a set.
#[must_use]
pub const fn positive_id(id: i64) -> u64 {
    id.unsigned_abs()
}

/// Growable set of entity identifiers backed by a compressed bitmap.
///
/// Sets only ever grow while a strategy runs.
///
/// # Examples
/// ```
/// use osm_extract_core::IdSet;
///
/// let mut ids = IdSet::default();
/// assert!(ids.set(-42));
/// assert!(!ids.set(42));
/// assert!(ids.get(42));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdSet {
    bits: RoaringTreemap,
}

impl IdSet {
    /// Insert `id`, returning `true` when it was not present before.
    pub fn set(&mut self, id: i64) -> bool {
        self.bits.insert(positive_id(id))
    }

    /// Insert a key already produced by [`positive_id`].
    pub fn insert_key(&mut self, key: u64) -> bool {
        self.bits.insert(key)
    }

    /// Whether `id` is in the set.
    #[must_use]
    pub fn get(&self, id: i64) -> bool {
        self.bits.contains(positive_id(id))
    }

    /// Number of identifiers in the set.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Identifiers in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.bits.iter()
    }

    /// Approximate number of bytes used by the set.
    #[must_use]
    pub fn used_memory(&self) -> usize {
        self.bits.serialized_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn iterates_in_ascending_order() {
        let mut ids = IdSet::default();
        for id in [30, 10, 20, 10] {
            ids.set(id);
        }
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec![10, 20, 30]);
        assert_eq!(ids.len(), 3);
    }

    #[rstest]
    #[case(7, 7)]
    #[case(-7, 7)]
    #[case(i64::MIN, 1 << 63)]
    fn positive_id_uses_absolute_value(#[case] id: i64, #[case] expected: u64) {
        assert_eq!(positive_id(id), expected);
    }

    #[rstest]
    fn empty_set_reports_empty() {
        let ids = IdSet::default();
        assert!(ids.is_empty());
        assert!(!ids.get(1));
    }
}
