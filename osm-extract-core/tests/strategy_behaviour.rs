//! Behavioural tests for the extraction strategies.

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs, path::PathBuf};

use osm_extract_core::{
    Entity, EntityKind, ExtractError, MemorySource, StrategyKind, StrategyOptions, build_strategy,
    run_strategy,
    test_support::{SharedBuffer, bbox_extract, node, relation_of, typed_relation, way},
};

type Outcome = RefCell<Option<Result<Vec<String>, ExtractError>>>;

#[fixture]
fn entities() -> RefCell<Vec<Entity>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn outcome() -> Outcome {
    RefCell::new(None)
}

fn execute(kind: StrategyKind, entities: &RefCell<Vec<Entity>>, history: bool) -> Result<Vec<String>, ExtractError> {
    execute_with(kind, &[], entities, history)
}

fn execute_with(
    kind: StrategyKind,
    options: &[&str],
    entities: &RefCell<Vec<Entity>>,
    history: bool,
) -> Result<Vec<String>, ExtractError> {
    let buffer = SharedBuffer::default();
    let extracts = vec![bbox_extract("inner", (0, 0, 10, 10), &buffer)];
    let options = StrategyOptions::parse(options)?;
    let mut strategy = build_strategy(kind, options, extracts, history)?;
    let source = MemorySource::new("memory", entities.borrow().clone());
    run_strategy(strategy.as_mut(), &source)?;
    Ok(buffer.lines())
}

fn expect_lines(outcome: &Outcome) -> Vec<String> {
    outcome
        .borrow()
        .as_ref()
        .expect("strategy was run")
        .as_ref()
        .expect("expected a successful run")
        .clone()
}

#[given("a way crossing the extract boundary inside a relation")]
fn crossing_way(#[from(entities)] entities: &RefCell<Vec<Entity>>) {
    *entities.borrow_mut() = vec![
        node(1, 1, 1).into(),
        node(2, 20, 20).into(),
        way(10, &[1, 2]).into(),
        relation_of(100, &[(EntityKind::Way, 10)]).into(),
    ];
}

#[given("a multipolygon with one way inside the extract")]
fn multipolygon(#[from(entities)] entities: &RefCell<Vec<Entity>>) {
    *entities.borrow_mut() = vec![
        node(1, 1, 1).into(),
        node(2, 20, 20).into(),
        node(3, 30, 30).into(),
        way(10, &[1, 2]).into(),
        way(11, &[2, 3]).into(),
        typed_relation(100, "multipolygon", &[(EntityKind::Way, 10), (EntityKind::Way, 11)])
            .into(),
    ];
}

#[given("a node inside the extract at the bottom of a chain of relations")]
fn relation_chain(#[from(entities)] entities: &RefCell<Vec<Entity>>) {
    *entities.borrow_mut() = vec![
        node(1, 1, 1).into(),
        relation_of(20, &[(EntityKind::Node, 1)]).into(),
        relation_of(21, &[(EntityKind::Relation, 20)]).into(),
        relation_of(22, &[(EntityKind::Relation, 21)]).into(),
    ];
}

#[given("a node inside the extract in a cycle of two relations")]
fn relation_cycle(#[from(entities)] entities: &RefCell<Vec<Entity>>) {
    *entities.borrow_mut() = vec![
        node(1, 1, 1).into(),
        relation_of(30, &[(EntityKind::Node, 1), (EntityKind::Relation, 31)]).into(),
        relation_of(31, &[(EntityKind::Relation, 30)]).into(),
    ];
}

#[given("a route with half of its ways inside the extract")]
fn partial_route(#[from(entities)] entities: &RefCell<Vec<Entity>>) {
    *entities.borrow_mut() = vec![
        node(1, 1, 1).into(),
        node(2, 20, 20).into(),
        node(3, 30, 30).into(),
        way(10, &[1, 2]).into(),
        way(11, &[2, 3]).into(),
        typed_relation(100, "route", &[(EntityKind::Way, 10), (EntityKind::Way, 11)]).into(),
    ];
}

#[given("a multipolygon whose member relation has a way outside the extract")]
fn nested_multipolygon(#[from(entities)] entities: &RefCell<Vec<Entity>>) {
    *entities.borrow_mut() = vec![
        node(1, 1, 1).into(),
        node(2, 20, 20).into(),
        node(3, 30, 30).into(),
        way(10, &[1, 2]).into(),
        way(30, &[3]).into(),
        relation_of(21, &[(EntityKind::Way, 30)]).into(),
        typed_relation(22, "multipolygon", &[(EntityKind::Way, 10), (EntityKind::Relation, 21)])
            .into(),
    ];
}

#[when("I run the complete_ways strategy")]
fn run_complete_ways(
    #[from(entities)] entities: &RefCell<Vec<Entity>>,
    #[from(outcome)] outcome: &Outcome,
) {
    *outcome.borrow_mut() = Some(execute(StrategyKind::CompleteWays, entities, false));
}

#[when("I run the simple strategy")]
fn run_simple(#[from(entities)] entities: &RefCell<Vec<Entity>>, #[from(outcome)] outcome: &Outcome) {
    *outcome.borrow_mut() = Some(execute(StrategyKind::Simple, entities, false));
}

#[when("I run the smart strategy")]
fn run_smart(#[from(entities)] entities: &RefCell<Vec<Entity>>, #[from(outcome)] outcome: &Outcome) {
    *outcome.borrow_mut() = Some(execute(StrategyKind::Smart, entities, false));
}

#[when("I run the smart strategy completing relations from 50 percent")]
fn run_smart_at_half(
    #[from(entities)] entities: &RefCell<Vec<Entity>>,
    #[from(outcome)] outcome: &Outcome,
) {
    *outcome.borrow_mut() = Some(execute_with(
        StrategyKind::Smart,
        &["complete-partial-relations=50"],
        entities,
        false,
    ));
}

#[when("I run the smart strategy completing relations from 70 percent")]
fn run_smart_at_seventy(
    #[from(entities)] entities: &RefCell<Vec<Entity>>,
    #[from(outcome)] outcome: &Outcome,
) {
    *outcome.borrow_mut() = Some(execute_with(
        StrategyKind::Smart,
        &["complete-partial-relations=70"],
        entities,
        false,
    ));
}

#[when("I run the simple strategy on history input")]
fn run_simple_with_history(
    #[from(entities)] entities: &RefCell<Vec<Entity>>,
    #[from(outcome)] outcome: &Outcome,
) {
    *outcome.borrow_mut() = Some(execute(StrategyKind::Simple, entities, true));
}

#[then("the output lists nodes 1 and 2, way 10 and relation 100")]
fn completed_output(#[from(outcome)] outcome: &Outcome) {
    assert_eq!(expect_lines(outcome), vec!["n1", "n2", "w10", "r100"]);
}

#[then("the output lists node 1, way 10 and relation 100")]
fn simple_output(#[from(outcome)] outcome: &Outcome) {
    assert_eq!(expect_lines(outcome), vec!["n1", "w10", "r100"]);
}

#[then("the output lists every node, both ways and the relation")]
fn multipolygon_output(#[from(outcome)] outcome: &Outcome) {
    assert_eq!(
        expect_lines(outcome),
        vec!["n1", "n2", "n3", "w10", "w11", "r100"]
    );
}

#[then("the output lists node 1 and relations 20, 21 and 22")]
fn chain_output(#[from(outcome)] outcome: &Outcome) {
    assert_eq!(expect_lines(outcome), vec!["n1", "r20", "r21", "r22"]);
}

#[then("the output lists node 1 and relations 30 and 31")]
fn cycle_output(#[from(outcome)] outcome: &Outcome) {
    assert_eq!(expect_lines(outcome), vec!["n1", "r30", "r31"]);
}

#[then("the output lists nodes 1 to 3, ways 10 and 30 and relations 21 and 22")]
fn nested_output(#[from(outcome)] outcome: &Outcome) {
    assert_eq!(
        expect_lines(outcome),
        vec!["n1", "n2", "n3", "w10", "w30", "r21", "r22"]
    );
}

#[then("the run is refused because the input has history")]
fn history_refused(#[from(outcome)] outcome: &Outcome) {
    let borrowed = outcome.borrow();
    match borrowed.as_ref().expect("strategy was run") {
        Err(ExtractError::HistoryUnsupported { strategy }) => assert_eq!(*strategy, "simple"),
        other => panic!("expected a history error, got {other:?}"),
    }
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature =
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/strategies.feature");
    let contents = fs::read_to_string(&feature).unwrap_or_else(|err| {
        panic!("failed to read feature file {feature:?}: {err}");
    });
    let titles: Vec<&str> = contents
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Scenario: "))
        .collect();
    assert_eq!(
        titles,
        [
            "completing ways that cross the boundary",
            "keeping only nodes inside the region",
            "completing a multipolygon",
            "refusing history input",
            "closing a chain of parent relations",
            "closing a relation cycle",
            "adopting a partial route at the threshold",
            "leaving a partial route below the threshold",
            "completing relations nested in a multipolygon",
        ],
        "scenario order changed in feature file"
    );
}

#[scenario(path = "tests/features/strategies.feature", index = 0)]
fn completing_crossing_ways(entities: RefCell<Vec<Entity>>, outcome: Outcome) {
    let _ = (entities, outcome);
}

#[scenario(path = "tests/features/strategies.feature", index = 1)]
fn keeping_inside_nodes(entities: RefCell<Vec<Entity>>, outcome: Outcome) {
    let _ = (entities, outcome);
}

#[scenario(path = "tests/features/strategies.feature", index = 2)]
fn completing_multipolygons(entities: RefCell<Vec<Entity>>, outcome: Outcome) {
    let _ = (entities, outcome);
}

#[scenario(path = "tests/features/strategies.feature", index = 3)]
fn refusing_history_input(entities: RefCell<Vec<Entity>>, outcome: Outcome) {
    let _ = (entities, outcome);
}

#[scenario(path = "tests/features/strategies.feature", index = 4)]
fn closing_relation_chains(entities: RefCell<Vec<Entity>>, outcome: Outcome) {
    let _ = (entities, outcome);
}

#[scenario(path = "tests/features/strategies.feature", index = 5)]
fn closing_relation_cycles(entities: RefCell<Vec<Entity>>, outcome: Outcome) {
    let _ = (entities, outcome);
}

#[scenario(path = "tests/features/strategies.feature", index = 6)]
fn adopting_at_the_threshold(entities: RefCell<Vec<Entity>>, outcome: Outcome) {
    let _ = (entities, outcome);
}

#[scenario(path = "tests/features/strategies.feature", index = 7)]
fn leaving_below_the_threshold(entities: RefCell<Vec<Entity>>, outcome: Outcome) {
    let _ = (entities, outcome);
}

#[scenario(path = "tests/features/strategies.feature", index = 8)]
fn completing_nested_relations(entities: RefCell<Vec<Entity>>, outcome: Outcome) {
    let _ = (entities, outcome);
}
