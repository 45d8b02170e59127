//! Configuration layering across files, environment and command line.

use super::*;
use crate::extract::{ExtractPlan, Input, settings_from_layers_for_test};
use camino::Utf8PathBuf;
use ortho_config::MergeComposer;
use osm_extract_core::StrategyKind;
use osm_extract_data::{BboxSpec, RegionSpec};
use rstest::rstest;
use serde_json::json;

#[rstest]
fn merge_layers_honours_precedence() {
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "input": "from-file.osm.pbf",
            "strategy": "smart",
            "bbox": "0,0,1,1",
            "commit_threshold": 4096,
        }),
        None,
    );
    composer.push_environment(json!({
        "input": "from-env.osm.pbf",
        "output": "from-env.opl",
    }));
    composer.push_cli(json!({
        "strategy": "simple",
        "output": "from-cli.opl",
    }));

    let settings = settings_from_layers_for_test(composer.layers()).expect("layers merge");
    assert_eq!(settings.input, Input::File(Utf8PathBuf::from("from-env.osm.pbf")));
    assert_eq!(settings.strategy, StrategyKind::Simple);
    assert_eq!(settings.commit_threshold, 4096);
    assert_eq!(
        settings.plan,
        ExtractPlan::Single {
            output: Utf8PathBuf::from("from-cli.opl"),
            region: RegionSpec::Bbox(BboxSpec::Array([0.0, 0.0, 1.0, 1.0])),
        }
    );
}

#[rstest]
fn invalid_layers_map_to_configuration_errors() {
    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "commit_threshold": "lots" }));

    let err = settings_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}
