//! `complete_ways` for inputs carrying several versions per object.
//!
//! Versions of one object follow each other, so a way is selected when any
//! of its versions touches a selected node. The node references of all
//! versions of the current way are accumulated until the way identifier
//! changes; once a version is selected every reference seen for that way so
//! far, and every reference of later versions, is marked extra. The write
//! pass emits all versions of every selected identifier.

use crate::{
    EntityKind, EntitySource, Extract, ExtractError, ExtractReport, KindFilter, Node, Pass,
    Progress, Relation, Way, parents::ParentIndexBuilder, run_pass,
};

use super::{
    OrderGuard, Strategy, WritePass, close_all,
    complete_ways::{CompleteExtract, close_parents, kinds},
    has_selected_member,
};

/// The history-aware `complete_ways` strategy.
#[derive(Debug)]
pub struct CompleteWaysWithHistory {
    extracts: Vec<CompleteExtract>,
    relations: bool,
}

impl CompleteWaysWithHistory {
    /// Plan a history-aware `complete_ways` extraction.
    #[must_use]
    pub fn new(extracts: Vec<Extract>, relations: bool) -> Self {
        Self {
            extracts: extracts.into_iter().map(CompleteExtract::new).collect(),
            relations,
        }
    }
}

struct Select {
    order: OrderGuard,
    parents: ParentIndexBuilder,
    current_way: Option<i64>,
    current_refs: Vec<i64>,
}

impl Pass for Select {
    type Extract = CompleteExtract;

    fn node(&mut self, node: &Node) -> Result<(), ExtractError> {
        self.order.check(EntityKind::Node, node.id, node.version)
    }

    fn way(&mut self, way: &Way) -> Result<(), ExtractError> {
        self.order.check(EntityKind::Way, way.id, way.version)?;
        if self.current_way != Some(way.id) {
            self.current_way = Some(way.id);
            self.current_refs.clear();
        }
        self.current_refs.extend_from_slice(&way.refs);
        Ok(())
    }

    fn relation(&mut self, relation: &Relation) -> Result<(), ExtractError> {
        self.order
            .check(EntityKind::Relation, relation.id, relation.version)?;
        self.parents.add_members(relation);
        Ok(())
    }

    fn enode(&mut self, extract: &mut CompleteExtract, node: &Node) -> Result<(), ExtractError> {
        if extract.extract.contains(node.location) {
            extract.node_ids.set(node.id);
        }
        Ok(())
    }

    fn eway(&mut self, extract: &mut CompleteExtract, way: &Way) -> Result<(), ExtractError> {
        if extract.way_ids.get(way.id) {
            for &node in &way.refs {
                extract.extra_node_ids.set(node);
            }
        } else if way.refs.iter().any(|&node| extract.node_ids.get(node)) {
            extract.way_ids.set(way.id);
            for &node in &self.current_refs {
                extract.extra_node_ids.set(node);
            }
        }
        Ok(())
    }

    fn erelation(
        &mut self,
        extract: &mut CompleteExtract,
        relation: &Relation,
    ) -> Result<(), ExtractError> {
        if has_selected_member(relation, &extract.node_ids, &extract.way_ids) {
            extract.relation_ids.set(relation.id);
        }
        Ok(())
    }
}

impl Strategy for CompleteWaysWithHistory {
    fn name(&self) -> &'static str {
        "complete_ways_with_history"
    }

    fn passes(&self) -> usize {
        2
    }

    fn run(
        &mut self,
        source: &dyn EntitySource,
        progress: &mut Progress,
    ) -> Result<Vec<ExtractReport>, ExtractError> {
        let kinds: KindFilter = kinds(self.relations);
        let mut select = Select {
            order: OrderGuard::new(source, true),
            parents: ParentIndexBuilder::default(),
            current_way: None,
            current_refs: Vec::new(),
        };
        progress.begin_pass("select", source.name());
        run_pass(source, kinds, &mut select, &mut self.extracts, progress)?;
        close_parents(&mut self.extracts, select.parents);
        for selection in &self.extracts {
            selection.log_sets();
        }

        progress.begin_pass("write", source.name());
        run_pass(
            source,
            kinds,
            &mut WritePass::<CompleteExtract>::new(),
            &mut self.extracts,
            progress,
        )?;
        close_all(&mut self.extracts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Entity, MemorySource,
        test_support::{SharedBuffer, bbox_extract, node, relation_of, way},
    };
    use rstest::rstest;

    fn versioned(entity: impl Into<Entity>, version: u32) -> Entity {
        let mut entity = entity.into();
        match &mut entity {
            Entity::Node(node) => node.version = Some(version),
            Entity::Way(way) => way.version = Some(version),
            Entity::Relation(relation) => relation.version = Some(version),
        }
        entity
    }

    fn run(entities: Vec<Entity>) -> Result<SharedBuffer, ExtractError> {
        let buffer = SharedBuffer::default();
        let source = MemorySource::new("history", entities).with_history();
        let mut strategy =
            CompleteWaysWithHistory::new(vec![bbox_extract("a", (0, 0, 10, 10), &buffer)], true);
        strategy.run(&source, &mut Progress::new(2, None))?;
        Ok(buffer)
    }

    #[rstest]
    fn every_version_of_a_selected_way_is_completed() {
        let buffer = run(vec![
            versioned(node(1, 50, 50), 1),
            versioned(node(1, 5, 5), 2),
            versioned(node(2, 60, 60), 1),
            versioned(node(3, 70, 70), 1),
            versioned(way(10, &[2, 3]), 1),
            versioned(way(10, &[1, 2]), 2),
            versioned(way(10, &[3]), 3),
            versioned(relation_of(20, &[(EntityKind::Way, 10)]), 1),
        ])
        .expect("run succeeds");
        assert_eq!(
            buffer.lines(),
            vec!["n1", "n1", "n2", "n3", "w10", "w10", "w10", "r20"]
        );
    }

    #[rstest]
    fn references_reset_when_the_way_changes() {
        let buffer = run(vec![
            versioned(node(1, 5, 5), 1),
            versioned(node(2, 60, 60), 1),
            versioned(way(10, &[2]), 1),
            versioned(way(11, &[1]), 1),
        ])
        .expect("run succeeds");
        assert_eq!(buffer.lines(), vec!["n1", "w11"]);
    }

    #[rstest]
    fn decreasing_versions_abort() {
        let err = run(vec![
            versioned(node(1, 5, 5), 2),
            versioned(node(1, 5, 5), 1),
        ])
        .expect_err("order violation");
        assert!(matches!(err, ExtractError::Order { .. }));
    }
}
