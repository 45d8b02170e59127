//! Two-pass extraction with complete ways.
//!
//! The first pass selects nodes inside the region, ways touching a selected
//! node and relations with a selected node or way member. Every node of a
//! selected way is marked as extra so the way can be rebuilt in full. After
//! the pass, the parents of selected relations are added transitively. The
//! second pass writes everything selected in file order.

use log::debug;

use crate::{
    EntityKind, EntitySource, Extract, ExtractError, ExtractReport, IdSet, KindFilter, Node, Pass,
    Progress, Relation, Way,
    parents::{ParentIndexBuilder, close_relation_parents},
    run_pass,
};

use super::{
    OrderGuard, Selection, Strategy, WritePass, WriteSelection, close_all, has_selected_member,
    log_sets,
};

/// The `complete_ways` strategy.
#[derive(Debug)]
pub struct CompleteWays {
    extracts: Vec<CompleteExtract>,
    relations: bool,
}

/// Selections shared by both `complete_ways` variants.
#[derive(Debug)]
pub(super) struct CompleteExtract {
    pub(super) extract: Extract,
    pub(super) node_ids: IdSet,
    pub(super) extra_node_ids: IdSet,
    pub(super) way_ids: IdSet,
    pub(super) relation_ids: IdSet,
}

impl CompleteExtract {
    pub(super) fn new(extract: Extract) -> Self {
        Self {
            extract,
            node_ids: IdSet::default(),
            extra_node_ids: IdSet::default(),
            way_ids: IdSet::default(),
            relation_ids: IdSet::default(),
        }
    }

    pub(super) fn log_sets(&self) {
        log_sets(
            self.extract.name(),
            &[
                ("nodes", &self.node_ids),
                ("extra nodes", &self.extra_node_ids),
                ("ways", &self.way_ids),
                ("relations", &self.relation_ids),
            ],
        );
    }
}

impl Selection for CompleteExtract {
    fn extract_mut(&mut self) -> &mut Extract {
        &mut self.extract
    }
}

impl WriteSelection for CompleteExtract {
    fn wants_node(&self, id: i64) -> bool {
        self.node_ids.get(id) || self.extra_node_ids.get(id)
    }

    fn wants_way(&self, id: i64) -> bool {
        self.way_ids.get(id)
    }

    fn wants_relation(&self, id: i64) -> bool {
        self.relation_ids.get(id)
    }
}

/// Kinds read by both passes.
pub(super) const fn kinds(relations: bool) -> KindFilter {
    KindFilter {
        nodes: true,
        ways: true,
        relations,
    }
}

/// Close every extract's relation selection over the collected parents.
pub(super) fn close_parents(extracts: &mut [CompleteExtract], parents: ParentIndexBuilder) {
    if parents.is_empty() {
        return;
    }
    let index = parents.build_member_to_parent_index();
    for selection in extracts {
        let added = close_relation_parents(&index, &mut selection.relation_ids);
        if added > 0 {
            debug!(
                "Extract {}: added {added} parent relations",
                selection.extract.name()
            );
        }
    }
}

struct Select {
    order: OrderGuard,
    parents: ParentIndexBuilder,
}

impl Pass for Select {
    type Extract = CompleteExtract;

    fn node(&mut self, node: &Node) -> Result<(), ExtractError> {
        self.order.check(EntityKind::Node, node.id, node.version)
    }

    fn way(&mut self, way: &Way) -> Result<(), ExtractError> {
        self.order.check(EntityKind::Way, way.id, way.version)
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
        if way.refs.iter().any(|&node| extract.node_ids.get(node)) {
            extract.way_ids.set(way.id);
            for &node in &way.refs {
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

impl CompleteWays {
    /// Plan a `complete_ways` extraction; `relations` controls whether
    /// relations are selected and written at all.
    #[must_use]
    pub fn new(extracts: Vec<Extract>, relations: bool) -> Self {
        Self {
            extracts: extracts.into_iter().map(CompleteExtract::new).collect(),
            relations,
        }
    }
}

impl Strategy for CompleteWays {
    fn name(&self) -> &'static str {
        "complete_ways"
    }

    fn passes(&self) -> usize {
        2
    }

    fn run(
        &mut self,
        source: &dyn EntitySource,
        progress: &mut Progress,
    ) -> Result<Vec<ExtractReport>, ExtractError> {
        let kinds = kinds(self.relations);
        let mut select = Select {
            order: OrderGuard::new(source, false),
            parents: ParentIndexBuilder::default(),
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
