//! Fixture files and argument builders shared by the CLI tests.

use super::*;
use base64::{Engine as _, engine::general_purpose};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Arguments selecting a single bounding box extract of `input`.
pub(super) fn bbox_args(input: &str, bbox: &str, output: &str) -> ExtractArgs {
    ExtractArgs {
        input: Some(Utf8PathBuf::from(input)),
        bbox: Some(bbox.to_owned()),
        output: Some(Utf8PathBuf::from(output)),
        ..ExtractArgs::default()
    }
}

/// Decode the named PBF fixture of the data crate into `dir`.
pub(super) fn write_fixture(dir: &Utf8Path, stem: &str) -> Utf8PathBuf {
    let encoded_path = Utf8Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../osm-extract-data/tests/fixtures")
        .join(format!("{stem}.osm.pbf.b64"));
    let encoded = fs::read_to_string(&encoded_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {encoded_path}: {err}"));
    let cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let decoded = general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .unwrap_or_else(|err| panic!("failed to decode fixture {encoded_path}: {err}"));
    let path = dir.join(format!("{stem}.osm.pbf"));
    fs::write(&path, decoded).unwrap_or_else(|err| panic!("failed to write {path}: {err}"));
    path
}

/// UTF-8 path of a temporary directory.
pub(super) fn utf8_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
}
