//! Member-to-parent index for relation-of-relation closure.
//!
//! During a pass every relation reports its relation members to a
//! [`ParentIndexBuilder`]. After the pass the builder is frozen into a
//! [`ParentIndex`] that enumerates the direct parents of a relation, which
//! [`add_relation_parents`] walks to mark every ancestor of a selected
//! relation.

use crate::{EntityKind, IdSet, Relation, ids::positive_id};

/// Collects `(member, parent)` pairs for relation members.
#[derive(Debug, Default)]
pub struct ParentIndexBuilder {
    pairs: Vec<(u64, u64)>,
}

impl ParentIndexBuilder {
    /// Record every relation member of `relation`.
    pub fn add_members(&mut self, relation: &Relation) {
        let parent = positive_id(relation.id);
        self.pairs.extend(
            relation
                .members
                .iter()
                .filter(|member| member.kind == EntityKind::Relation)
                .map(|member| (positive_id(member.id), parent)),
        );
    }

    /// Number of recorded pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether no pairs were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Freeze the collected pairs into a lookup index.
    #[must_use]
    pub fn build_member_to_parent_index(mut self) -> ParentIndex {
        self.pairs.sort_unstable();
        self.pairs.dedup();
        ParentIndex { pairs: self.pairs }
    }
}

/// Sorted member-to-parent lookup.
#[derive(Debug, Default)]
pub struct ParentIndex {
    pairs: Vec<(u64, u64)>,
}

impl ParentIndex {
    /// Call `visit` with every direct parent of relation `id`.
    pub fn for_each_parent(&self, id: u64, mut visit: impl FnMut(u64)) {
        let start = self.pairs.partition_point(|&(member, _)| member < id);
        self.pairs
            .iter()
            .skip(start)
            .take_while(|&&(member, _)| member == id)
            .for_each(|&(_, parent)| visit(parent));
    }
}

/// Mark every ancestor of relation `id` in `selected`.
///
/// Only newly marked relations are expanded further, which bounds the walk
/// on cyclic relation graphs. Returns the number of relations added.
pub fn add_relation_parents(id: u64, index: &ParentIndex, selected: &mut IdSet) -> usize {
    let mut added = 0;
    let mut pending = vec![id];
    while let Some(current) = pending.pop() {
        index.for_each_parent(current, |parent| {
            if selected.insert_key(parent) {
                added += 1;
                pending.push(parent);
            }
        });
    }
    added
}

/// Close `selected` over the parent relation graph.
///
/// Returns the number of relations added.
pub fn close_relation_parents(index: &ParentIndex, selected: &mut IdSet) -> usize {
    let seeds: Vec<u64> = selected.iter().collect();
    seeds
        .into_iter()
        .map(|seed| add_relation_parents(seed, index, selected))
        .sum()
}
