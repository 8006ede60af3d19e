//! Unit tests for plugin manifests.

use std::path::PathBuf;

use rstest::rstest;

use super::*;

fn make_manifest() -> PluginManifest {
    PluginManifest::new("summary", PathBuf::from("/usr/lib/speakline/summary"))
}

#[test]
fn new_manifest_has_defaults() {
    let m = make_manifest();
    assert_eq!(m.name(), "summary");
    assert_eq!(m.executable(), PathBuf::from("/usr/lib/speakline/summary"));
    assert!(m.args().is_empty());
    assert_eq!(m.timeout_secs(), 30);
}

#[test]
fn with_args_sets_arguments() {
    let m = make_manifest().with_args(vec!["--log-filter".into(), "debug".into()]);
    assert_eq!(m.args(), &["--log-filter", "debug"]);
}

#[test]
fn with_timeout_overrides_default() {
    let m = make_manifest().with_timeout_secs(5);
    assert_eq!(m.timeout_secs(), 5);
}

#[test]
fn valid_manifest_passes() {
    assert!(make_manifest().validate().is_ok());
}

#[rstest]
#[case::empty_name(
    PluginManifest::new("  ", PathBuf::from("/usr/bin/plugin")),
    "name must not be empty"
)]
#[case::relative_executable(
    PluginManifest::new("summary", PathBuf::from("plugins/summary")),
    "absolute path"
)]
#[case::zero_timeout(
    PluginManifest::new("summary", PathBuf::from("/usr/bin/plugin")).with_timeout_secs(0),
    "at least one second"
)]
fn invalid_manifests_are_rejected(#[case] manifest: PluginManifest, #[case] expected: &str) {
    let err = manifest.validate().expect_err("validation should fail");
    assert!(matches!(err, PluginError::Manifest { .. }));
    assert!(
        err.to_string().contains(expected),
        "expected '{expected}' in: {err}"
    );
}

#[test]
fn deserialise_applies_defaults() {
    let json = r#"{"name": "summary", "executable": "/usr/bin/summary"}"#;
    let m: PluginManifest = serde_json::from_str(json).expect("deserialise");
    assert!(m.args().is_empty());
    assert_eq!(m.timeout_secs(), 30);
}
