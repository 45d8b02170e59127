//! Behavioural tests for reading PBF input through `PbfSource`.

use camino::Utf8PathBuf;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::{cell::RefCell, fs, path::PathBuf};
use tempfile::TempPath;

use osm_extract_core::{
    Entity, EntitySource, EntityVisitor, ExtractError, KindFilter, Location,
};
use osm_extract_data::{PbfSource, PbfSourceError};

mod support;

use support::{decode_fixture, utf8};

enum FixtureTarget {
    Existing(TempPath),
    Missing(Utf8PathBuf),
}

impl FixtureTarget {
    fn path(&self) -> Utf8PathBuf {
        match self {
            Self::Existing(temp) => utf8(temp),
            Self::Missing(path) => path.clone(),
        }
    }
}

#[derive(Debug)]
struct ReadSummary {
    history: bool,
    entities: Vec<Entity>,
}

type Outcome = RefCell<Option<Result<ReadSummary, PbfSourceError>>>;

#[derive(Default)]
struct Collector(Vec<Entity>);

impl EntityVisitor for Collector {
    fn visit(&mut self, entity: Entity) -> Result<(), ExtractError> {
        self.0.push(entity);
        Ok(())
    }
}

#[fixture]
fn target_fixture() -> RefCell<Option<FixtureTarget>> {
    RefCell::new(None)
}

#[fixture]
fn read_result() -> Outcome {
    RefCell::new(None)
}

fn expect_summary(result: &Outcome) -> std::cell::Ref<'_, ReadSummary> {
    std::cell::Ref::map(result.borrow(), |outcome| {
        outcome
            .as_ref()
            .expect("read was attempted")
            .as_ref()
            .expect("expected a successful read")
    })
}

#[given("a PBF file with 3 nodes, 2 ways and 1 relation")]
fn crossing_dataset(#[from(target_fixture)] target: &RefCell<Option<FixtureTarget>>) {
    *target.borrow_mut() = Some(FixtureTarget::Existing(decode_fixture("crossing")));
}

#[given("a PBF file whose header declares history")]
fn history_dataset(#[from(target_fixture)] target: &RefCell<Option<FixtureTarget>>) {
    *target.borrow_mut() = Some(FixtureTarget::Existing(decode_fixture("history")));
}

#[given("a path to a missing PBF file")]
fn missing_dataset(#[from(target_fixture)] target: &RefCell<Option<FixtureTarget>>) {
    let missing = utf8(&support::fixtures_dir()).join("missing.osm.pbf");
    *target.borrow_mut() = Some(FixtureTarget::Missing(missing));
}

#[given("a path to a file containing invalid PBF data")]
fn invalid_dataset(#[from(target_fixture)] target: &RefCell<Option<FixtureTarget>>) {
    *target.borrow_mut() = Some(FixtureTarget::Existing(decode_fixture("invalid")));
}

#[when("I read every entity")]
fn read_everything(
    #[from(target_fixture)] target: &RefCell<Option<FixtureTarget>>,
    #[from(read_result)] result: &Outcome,
) {
    let path = target.borrow().as_ref().expect("target path prepared").path();
    let outcome = PbfSource::open(&path).map(|source| {
        let mut collector = Collector::default();
        source
            .read(KindFilter::ALL, &mut collector)
            .expect("valid fixtures decode completely");
        ReadSummary {
            history: source.has_history(),
            entities: collector.0,
        }
    });
    *result.borrow_mut() = Some(outcome);
}

#[then("the entities arrive as nodes, then ways, then relations")]
fn entity_order(#[from(read_result)] result: &Outcome) {
    let summary = expect_summary(result);
    let ids: Vec<String> = summary
        .entities
        .iter()
        .map(|entity| format!("{}{}", entity.kind().prefix(), entity.id()))
        .collect();
    assert_eq!(ids, ["n1", "n2", "n3", "w10", "w11", "r100"]);
    assert!(!summary.history, "plain files carry no history");
}

#[then("node 3 keeps its tags and location")]
fn node_details(#[from(read_result)] result: &Outcome) {
    let summary = expect_summary(result);
    let Some(Entity::Node(node)) = summary.entities.get(2) else {
        panic!("expected node 3 at index 2");
    };
    assert_eq!(node.version, Some(1));
    assert_eq!(node.location, Some(Location::new(55_000_000, 52_500_000)));
    assert_eq!(
        node.tags,
        vec![
            ("amenity".to_owned(), "cafe".to_owned()),
            ("name".to_owned(), "Café Zwei".to_owned()),
        ]
    );
}

#[then("the source reports history")]
fn reports_history(#[from(read_result)] result: &Outcome) {
    let summary = expect_summary(result);
    assert!(summary.history);
    let versions: Vec<Option<u32>> = summary.entities.iter().map(Entity::version).collect();
    assert_eq!(versions, [Some(1), Some(2)]);
}

#[then("an open error is returned")]
fn open_error(#[from(read_result)] result: &Outcome) {
    let borrowed = result.borrow();
    match borrowed.as_ref().expect("read was attempted") {
        Err(PbfSourceError::Open { input, .. }) => {
            assert!(input.ends_with("missing.osm.pbf"), "unexpected input: {input}");
        }
        other => panic!("expected an open error, got {other:?}"),
    }
}

#[then("a decode error is returned")]
fn decode_error(#[from(read_result)] result: &Outcome) {
    let borrowed = result.borrow();
    match borrowed.as_ref().expect("read was attempted") {
        Err(PbfSourceError::Decode { input, source }) => {
            assert!(input.ends_with(".osm.pbf"), "unexpected input: {input}");
            assert!(
                !source.to_string().is_empty(),
                "decode error should preserve the source message"
            );
        }
        other => panic!("expected a decode error, got {other:?}"),
    }
}

#[test]
fn scenario_indices_follow_feature_order() {
    let feature = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/features/pbf_source.feature");
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
            "reading a known dataset",
            "detecting history files",
            "reporting a missing file",
            "rejecting a corrupted dataset",
        ],
        "scenario order changed in feature file"
    );
}

#[scenario(path = "tests/features/pbf_source.feature", index = 0)]
fn reading_known_dataset(target_fixture: RefCell<Option<FixtureTarget>>, read_result: Outcome) {
    let _ = (target_fixture, read_result);
}

#[scenario(path = "tests/features/pbf_source.feature", index = 1)]
fn detecting_history(target_fixture: RefCell<Option<FixtureTarget>>, read_result: Outcome) {
    let _ = (target_fixture, read_result);
}

#[scenario(path = "tests/features/pbf_source.feature", index = 2)]
fn reporting_missing_file(target_fixture: RefCell<Option<FixtureTarget>>, read_result: Outcome) {
    let _ = (target_fixture, read_result);
}

#[scenario(path = "tests/features/pbf_source.feature", index = 3)]
fn rejecting_corrupted_dataset(target_fixture: RefCell<Option<FixtureTarget>>, read_result: Outcome) {
    let _ = (target_fixture, read_result);
}
