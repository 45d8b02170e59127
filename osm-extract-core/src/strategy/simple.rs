//! Single-pass extraction without completion.
//!
//! Nodes inside the region are written as they arrive. A way is written when
//! any of its nodes was written, and a relation when any node or way member
//! was. Nothing outside the region is pulled in, so ways crossing the
//! boundary keep references to nodes missing from the output.
//!
//! Every reference of a way and every member of a relation is examined, so
//! the result does not depend on member order.

use crate::{
    EntityKind, EntitySource, Extract, ExtractError, ExtractReport, IdSet, KindFilter, Node, Pass,
    Progress, Relation, Way, run_pass,
};

use super::{OrderGuard, Selection, Strategy, close_all, has_selected_member, log_sets};

/// The `simple` strategy.
#[derive(Debug)]
pub struct Simple {
    extracts: Vec<SimpleExtract>,
}

#[derive(Debug)]
struct SimpleExtract {
    extract: Extract,
    node_ids: IdSet,
    way_ids: IdSet,
}

impl Simple {
    /// Plan a simple extraction over `extracts`.
    #[must_use]
    pub fn new(extracts: Vec<Extract>) -> Self {
        Self {
            extracts: extracts
                .into_iter()
                .map(|extract| SimpleExtract {
                    extract,
                    node_ids: IdSet::default(),
                    way_ids: IdSet::default(),
                })
                .collect(),
        }
    }
}

impl Selection for SimpleExtract {
    fn extract_mut(&mut self) -> &mut Extract {
        &mut self.extract
    }
}

struct SelectAndWrite {
    order: OrderGuard,
}

impl Pass for SelectAndWrite {
    type Extract = SimpleExtract;

    fn node(&mut self, node: &Node) -> Result<(), ExtractError> {
        self.order.check(EntityKind::Node, node.id, node.version)
    }

    fn way(&mut self, way: &Way) -> Result<(), ExtractError> {
        self.order.check(EntityKind::Way, way.id, way.version)
    }

    fn relation(&mut self, relation: &Relation) -> Result<(), ExtractError> {
        self.order
            .check(EntityKind::Relation, relation.id, relation.version)
    }

    fn enode(&mut self, extract: &mut SimpleExtract, node: &Node) -> Result<(), ExtractError> {
        if extract.extract.contains(node.location) {
            extract.extract.write_node(node)?;
            extract.node_ids.set(node.id);
        }
        Ok(())
    }

    fn eway(&mut self, extract: &mut SimpleExtract, way: &Way) -> Result<(), ExtractError> {
        if way.refs.iter().any(|&node| extract.node_ids.get(node)) {
            extract.extract.write_way(way)?;
            extract.way_ids.set(way.id);
        }
        Ok(())
    }

    fn erelation(
        &mut self,
        extract: &mut SimpleExtract,
        relation: &Relation,
    ) -> Result<(), ExtractError> {
        if has_selected_member(relation, &extract.node_ids, &extract.way_ids) {
            extract.extract.write_relation(relation)?;
        }
        Ok(())
    }
}

impl Strategy for Simple {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn passes(&self) -> usize {
        1
    }

    fn run(
        &mut self,
        source: &dyn EntitySource,
        progress: &mut Progress,
    ) -> Result<Vec<ExtractReport>, ExtractError> {
        let mut pass = SelectAndWrite {
            order: OrderGuard::new(source, false),
        };
        progress.begin_pass("select and write", source.name());
        run_pass(source, KindFilter::ALL, &mut pass, &mut self.extracts, progress)?;
        for selection in &self.extracts {
            log_sets(
                selection.extract.name(),
                &[("nodes", &selection.node_ids), ("ways", &selection.way_ids)],
            );
        }
        close_all(&mut self.extracts)
    }
}
