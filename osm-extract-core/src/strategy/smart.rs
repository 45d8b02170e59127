//! Three-pass extraction that also completes chosen relations.
//!
//! Pass one selects like `complete_ways` and counts, for every relation,
//! how many of its node and way members are selected. A relation with at
//! least one such member is selected; it is adopted in full, with every
//! member marked extra, when it passes the type and tag rules or when the
//! selected share of its members reaches the configured percentage. Parent
//! relations are closed after the pass. Member relations of an adopted
//! relation are adopted as well, down to any depth, from the member lists
//! collected during the pass. Pass two reads ways only and marks the nodes
//! of every selected or extra way. Pass three writes.

use std::collections::HashMap;

use log::debug;

use crate::{
    EntityKind, EntitySource, Extract, ExtractError, ExtractReport, IdSet, KindFilter, Member,
    Node, OptionError, Pass, Progress, Relation, Tags, Way,
    parents::{ParentIndexBuilder, close_relation_parents},
    run_pass,
};

use super::{
    OrderGuard, Selection, Strategy, StrategyOptions, WritePass, WriteSelection, close_all,
    log_sets,
};

/// Relation type completed when no `types` option is given.
const DEFAULT_RELATION_TYPE: &str = "multipolygon";

/// A `key` or `key=value` tag rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    /// Tag key.
    pub key: String,
    /// Required value, or any value when `None`.
    pub value: Option<String>,
}

impl TagRule {
    /// Parse `key` or `key=value`.
    #[must_use]
    pub fn parse(rule: &str) -> Self {
        match rule.split_once('=') {
            Some((key, value)) => Self {
                key: key.to_owned(),
                value: Some(value.to_owned()),
            },
            None => Self {
                key: rule.to_owned(),
                value: None,
            },
        }
    }

    /// Whether any tag satisfies the rule.
    #[must_use]
    pub fn matches(&self, tags: &Tags) -> bool {
        tags.iter().any(|(key, value)| {
            *key == self.key && self.value.as_ref().is_none_or(|wanted| wanted == value)
        })
    }
}

/// Options of the `smart` strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartSettings {
    /// Relation types completed in full; empty accepts every type.
    pub types: Vec<String>,
    /// Tag rules of which one must match; empty imposes no constraint.
    pub tags: Vec<TagRule>,
    /// Percentage of selected members from which any relation is completed.
    pub complete_partial_relations: u8,
}

impl Default for SmartSettings {
    fn default() -> Self {
        Self {
            types: vec![DEFAULT_RELATION_TYPE.to_owned()],
            tags: Vec::new(),
            complete_partial_relations: 100,
        }
    }
}

impl SmartSettings {
    /// Consume `types`, `tags` and `complete-partial-relations`.
    ///
    /// # Errors
    /// Returns [`OptionError::InvalidValue`] for a bad percentage.
    pub fn from_options(options: &mut StrategyOptions) -> Result<Self, OptionError> {
        let defaults = Self::default();
        Ok(Self {
            types: options.take_list("types").unwrap_or(defaults.types),
            tags: options
                .take_list("tags")
                .unwrap_or_default()
                .iter()
                .map(|rule| TagRule::parse(rule))
                .collect(),
            complete_partial_relations: options.take_percentage(
                "complete-partial-relations",
                defaults.complete_partial_relations,
            )?,
        })
    }

    /// Whether `relation` passes the type and tag rules.
    #[must_use]
    pub fn matches(&self, relation: &Relation) -> bool {
        let type_matches = self.types.is_empty()
            || relation
                .relation_type()
                .is_some_and(|kind| self.types.iter().any(|wanted| wanted == kind));
        let tags_match =
            self.tags.is_empty() || self.tags.iter().any(|rule| rule.matches(&relation.tags));
        type_matches && tags_match
    }

    /// Whether `wanted` of `total` members reach the completion percentage.
    #[must_use]
    pub fn reaches_threshold(&self, wanted: usize, total: usize) -> bool {
        total > 0 && wanted * 100 / total >= usize::from(self.complete_partial_relations)
    }
}

/// The `smart` strategy.
#[derive(Debug)]
pub struct Smart {
    extracts: Vec<SmartExtract>,
    settings: SmartSettings,
}

#[derive(Debug)]
struct SmartExtract {
    extract: Extract,
    node_ids: IdSet,
    extra_node_ids: IdSet,
    way_ids: IdSet,
    extra_way_ids: IdSet,
    relation_ids: IdSet,
    extra_relation_ids: IdSet,
    /// Adopted member relations whose own members are not marked yet.
    pending_relations: Vec<i64>,
}

impl SmartExtract {
    fn new(extract: Extract) -> Self {
        Self {
            extract,
            node_ids: IdSet::default(),
            extra_node_ids: IdSet::default(),
            way_ids: IdSet::default(),
            extra_way_ids: IdSet::default(),
            relation_ids: IdSet::default(),
            extra_relation_ids: IdSet::default(),
            pending_relations: Vec::new(),
        }
    }

    fn wanted_members(&self, relation: &Relation) -> usize {
        relation
            .members
            .iter()
            .filter(|member| match member.kind {
                EntityKind::Node => self.node_ids.get(member.id),
                EntityKind::Way => self.way_ids.get(member.id),
                EntityKind::Relation => false,
            })
            .count()
    }

    fn adopt(&mut self, relation: &Relation) {
        for member in &relation.members {
            self.mark_extra(member);
        }
    }

    fn mark_extra(&mut self, member: &Member) {
        match member.kind {
            EntityKind::Node => {
                self.extra_node_ids.set(member.id);
            }
            EntityKind::Way => {
                self.extra_way_ids.set(member.id);
            }
            EntityKind::Relation => {
                if self.extra_relation_ids.set(member.id) {
                    self.pending_relations.push(member.id);
                }
            }
        }
    }

    /// Mark the members of every adopted member relation, returning how
    /// many relations were expanded. Each relation enters the worklist at
    /// most once, so reference cycles terminate.
    fn adopt_nested(&mut self, members: &HashMap<i64, Vec<Member>>) -> usize {
        let mut expanded = 0;
        while let Some(id) = self.pending_relations.pop() {
            let Some(nested) = members.get(&id) else {
                continue;
            };
            expanded += 1;
            for member in nested {
                self.mark_extra(member);
            }
        }
        expanded
    }

    fn log_sets(&self) {
        log_sets(
            self.extract.name(),
            &[
                ("nodes", &self.node_ids),
                ("extra nodes", &self.extra_node_ids),
                ("ways", &self.way_ids),
                ("extra ways", &self.extra_way_ids),
                ("relations", &self.relation_ids),
                ("extra relations", &self.extra_relation_ids),
            ],
        );
    }
}

impl Selection for SmartExtract {
    fn extract_mut(&mut self) -> &mut Extract {
        &mut self.extract
    }
}

impl WriteSelection for SmartExtract {
    fn wants_node(&self, id: i64) -> bool {
        self.node_ids.get(id) || self.extra_node_ids.get(id)
    }

    fn wants_way(&self, id: i64) -> bool {
        self.way_ids.get(id) || self.extra_way_ids.get(id)
    }

    fn wants_relation(&self, id: i64) -> bool {
        self.relation_ids.get(id) || self.extra_relation_ids.get(id)
    }
}

struct Select<'a> {
    order: OrderGuard,
    parents: ParentIndexBuilder,
    members: HashMap<i64, Vec<Member>>,
    settings: &'a SmartSettings,
}

impl Pass for Select<'_> {
    type Extract = SmartExtract;

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
        if !relation.members.is_empty() {
            self.members.insert(relation.id, relation.members.clone());
        }
        Ok(())
    }

    fn enode(&mut self, extract: &mut SmartExtract, node: &Node) -> Result<(), ExtractError> {
        if extract.extract.contains(node.location) {
            extract.node_ids.set(node.id);
        }
        Ok(())
    }

    fn eway(&mut self, extract: &mut SmartExtract, way: &Way) -> Result<(), ExtractError> {
        if way.refs.iter().any(|&node| extract.node_ids.get(node)) {
            extract.way_ids.set(way.id);
        }
        Ok(())
    }

    fn erelation(
        &mut self,
        extract: &mut SmartExtract,
        relation: &Relation,
    ) -> Result<(), ExtractError> {
        let wanted = extract.wanted_members(relation);
        if wanted == 0 {
            return Ok(());
        }
        extract.relation_ids.set(relation.id);
        if self.settings.matches(relation)
            || self
                .settings
                .reaches_threshold(wanted, relation.members.len())
        {
            extract.adopt(relation);
        }
        Ok(())
    }
}

struct ExpandWays;

impl Pass for ExpandWays {
    type Extract = SmartExtract;

    const EXTRACT_KINDS: KindFilter = KindFilter::WAYS;

    fn eway(&mut self, extract: &mut SmartExtract, way: &Way) -> Result<(), ExtractError> {
        if extract.wants_way(way.id) {
            for &node in &way.refs {
                extract.extra_node_ids.set(node);
            }
        }
        Ok(())
    }
}

impl Smart {
    /// Plan a `smart` extraction.
    #[must_use]
    pub fn new(extracts: Vec<Extract>, settings: SmartSettings) -> Self {
        Self {
            extracts: extracts.into_iter().map(SmartExtract::new).collect(),
            settings,
        }
    }

    fn close_parents(&mut self, parents: ParentIndexBuilder) {
        if parents.is_empty() {
            return;
        }
        let index = parents.build_member_to_parent_index();
        for selection in &mut self.extracts {
            close_relation_parents(&index, &mut selection.relation_ids);
        }
    }

    fn adopt_nested(&mut self, members: &HashMap<i64, Vec<Member>>) {
        for selection in &mut self.extracts {
            let expanded = selection.adopt_nested(members);
            debug!(
                "Extract {}: adopted members of {expanded} nested relations",
                selection.extract.name()
            );
        }
    }
}

impl Strategy for Smart {
    fn name(&self) -> &'static str {
        "smart"
    }

    fn passes(&self) -> usize {
        3
    }

    fn run(
        &mut self,
        source: &dyn EntitySource,
        progress: &mut Progress,
    ) -> Result<Vec<ExtractReport>, ExtractError> {
        let mut select = Select {
            order: OrderGuard::new(source, false),
            parents: ParentIndexBuilder::default(),
            members: HashMap::new(),
            settings: &self.settings,
        };
        progress.begin_pass("select", source.name());
        run_pass(source, KindFilter::ALL, &mut select, &mut self.extracts, progress)?;
        let Select {
            parents, members, ..
        } = select;
        self.close_parents(parents);
        self.adopt_nested(&members);

        progress.begin_pass("complete ways", source.name());
        run_pass(source, KindFilter::WAYS, &mut ExpandWays, &mut self.extracts, progress)?;
        for selection in &self.extracts {
            selection.log_sets();
        }

        progress.begin_pass("write", source.name());
        run_pass(
            source,
            KindFilter::ALL,
            &mut WritePass::<SmartExtract>::new(),
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
        test_support::{SharedBuffer, bbox_extract, node, relation_of, typed_relation, way},
    };
    use rstest::rstest;

    fn run(entities: Vec<Entity>, settings: SmartSettings) -> SharedBuffer {
        let buffer = SharedBuffer::default();
        let source = MemorySource::new("memory", entities);
        let mut strategy = Smart::new(vec![bbox_extract("a", (0, 0, 10, 10), &buffer)], settings);
        strategy
            .run(&source, &mut Progress::new(3, None))
            .expect("run succeeds");
        buffer
    }

    fn multipolygon() -> Vec<Entity> {
        vec![
            node(1, 1, 1).into(),
            node(2, 20, 20).into(),
            node(3, 30, 30).into(),
            node(4, 40, 40).into(),
            way(10, &[1, 2]).into(),
            way(11, &[3, 4]).into(),
            typed_relation(
                20,
                "multipolygon",
                &[(EntityKind::Way, 10), (EntityKind::Way, 11)],
            )
            .into(),
        ]
    }

    #[rstest]
    fn multipolygons_are_completed_by_default() {
        let buffer = run(multipolygon(), SmartSettings::default());
        assert_eq!(
            buffer.lines(),
            vec!["n1", "n2", "n3", "n4", "w10", "w11", "r20"]
        );
    }

    #[rstest]
    fn other_types_are_selected_but_not_completed() {
        let settings = SmartSettings {
            types: vec!["route".to_owned()],
            ..SmartSettings::default()
        };
        let buffer = run(multipolygon(), settings);
        assert_eq!(buffer.lines(), vec!["n1", "n2", "w10", "r20"]);
    }

    #[rstest]
    #[case(Vec::new(), true)]
    #[case(vec![TagRule::parse("landuse")], true)]
    #[case(vec![TagRule::parse("landuse=forest")], true)]
    #[case(vec![TagRule::parse("landuse=meadow")], false)]
    #[case(vec![TagRule::parse("natural"), TagRule::parse("landuse")], true)]
    fn tag_rules_gate_completion(#[case] tags: Vec<TagRule>, #[case] matches: bool) {
        let mut relation = typed_relation(1, "multipolygon", &[]);
        relation
            .tags
            .push(("landuse".to_owned(), "forest".to_owned()));
        let settings = SmartSettings {
            tags,
            ..SmartSettings::default()
        };
        assert_eq!(settings.matches(&relation), matches);
    }

    #[rstest]
    fn empty_type_list_accepts_untyped_relations() {
        let settings = SmartSettings {
            types: Vec::new(),
            ..SmartSettings::default()
        };
        assert!(settings.matches(&relation_of(1, &[])));
    }

    #[rstest]
    #[case(50, true)]
    #[case(60, true)]
    #[case(70, false)]
    fn threshold_adopts_partial_relations(#[case] percent: u8, #[case] adopted: bool) {
        let settings = SmartSettings {
            types: vec!["route".to_owned()],
            complete_partial_relations: percent,
            ..SmartSettings::default()
        };
        assert_eq!(settings.reaches_threshold(6, 10), adopted);
    }

    #[rstest]
    fn adopted_relation_pulls_in_member_relations() {
        let mut entities = multipolygon();
        entities.push(relation_of(21, &[]).into());
        entities.push(
            typed_relation(
                22,
                "multipolygon",
                &[(EntityKind::Node, 1), (EntityKind::Relation, 21)],
            )
            .into(),
        );
        let buffer = run(entities, SmartSettings::default());
        assert_eq!(
            buffer.lines(),
            vec!["n1", "n2", "n3", "n4", "w10", "w11", "r20", "r21", "r22"]
        );
    }

    #[rstest]
    fn options_are_parsed() {
        let mut options = StrategyOptions::parse([
            "types=boundary,multipolygon",
            "tags=landuse,natural=wood",
            "complete-partial-relations=80",
        ])
        .expect("parse");
        let settings = SmartSettings::from_options(&mut options).expect("settings");
        assert!(options.is_empty());
        assert_eq!(settings.types, vec!["boundary", "multipolygon"]);
        assert_eq!(
            settings.tags,
            vec![TagRule::parse("landuse"), TagRule::parse("natural=wood")]
        );
        assert_eq!(settings.complete_partial_relations, 80);
    }
}
