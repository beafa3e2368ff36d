//! Integration tests for the fixture corpus.
//!
//! Loads each legacy fixture through the default loader chain and checks the
//! resulting CanonicalSession against the expected summary in
//! `tests/fixtures/expected/<id>.json`.

use std::path::PathBuf;

use compat_session::chain::LoaderChain;
use compat_session::model::{CanonicalSession, Section};
use compat_session::raw::TextDecoding;

/// Root of the fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Load and parse the expected summary for a fixture.
fn load_expected(fixture_id: &str) -> serde_json::Value {
    let path = fixtures_dir().join(format!("expected/{fixture_id}.json"));
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read expected file for {fixture_id}: {e}"));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse expected JSON for {fixture_id}: {e}"))
}

fn load_fixture(fixture_id: &str) -> CanonicalSession {
    let path = fixtures_dir().join(format!("{fixture_id}.session"));
    LoaderChain::default_chain(TextDecoding::Replace)
        .load(&path)
        .unwrap_or_else(|e| panic!("[{fixture_id}] should load: {e}"))
}

/// Assert a session matches its expected summary.
fn assert_session_matches(session: &CanonicalSession, expected: &serde_json::Value, id: &str) {
    // Every section exists in the serialized form.
    let serialized = serde_json::to_value(session).expect("serialize session");
    for section in Section::ALL {
        assert!(
            serialized.get(section.name()).is_some(),
            "[{id}] section {section} missing from output"
        );
    }

    for (section, map) in [("compat", &session.compat), ("conf", &session.conf), ("env", &session.env)] {
        let wanted = expected[section]
            .as_object()
            .unwrap_or_else(|| panic!("[{id}] expected.{section} must be an object"));
        for (key, value) in wanted {
            assert_eq!(
                map.get(key),
                Some(value),
                "[{id}] {section}.{key} mismatch"
            );
        }
    }

    for (section, map) in [("conf_absent", &session.conf), ("env_absent", &session.env)] {
        if let Some(absent) = expected.get(section).and_then(|v| v.as_array()) {
            for key in absent {
                let key = key.as_str().expect("absent key must be a string");
                assert!(!map.contains_key(key), "[{id}] {key} should not be present");
            }
        }
    }

    // Sections the legacy layouts never populate.
    for section in [Section::Alias, Section::Cache, Section::Hist, Section::File] {
        assert!(
            session.is_section_empty(section),
            "[{id}] {section} should be empty"
        );
    }
}

fn check_fixture(fixture_id: &str) {
    let session = load_fixture(fixture_id);
    let expected = load_expected(fixture_id);
    assert_session_matches(&session, &expected, fixture_id);
}

#[test]
fn fixture_v1_linux() {
    check_fixture("v1_linux");
}

#[test]
fn fixture_v1_unknown_os() {
    check_fixture("v1_unknown_os");
}

#[test]
fn fixture_v2_1_4_windows() {
    check_fixture("v2_1_4_windows");
}

#[test]
fn fixture_hybrid_marker_3_falls_through_to_v1() {
    check_fixture("hybrid_marker_3");
}

#[test]
fn fixture_latin1_under_each_policy() {
    let path = fixtures_dir().join("latin1_v1.session");

    let latin1 = LoaderChain::default_chain(TextDecoding::Latin1)
        .load(&path)
        .expect("latin1 decoding should load");
    assert_eq!(latin1.env_str("PWD"), Some("/var/www/café"));
    assert_eq!(latin1.env_str("PLATFORM"), Some("sunos"));

    let replaced = LoaderChain::default_chain(TextDecoding::Replace)
        .load(&path)
        .expect("lossy decoding should load");
    assert_eq!(replaced.env_str("PWD"), Some("/var/www/caf\u{FFFD}"));

    let strict = LoaderChain::default_chain(TextDecoding::Strict).load(&path);
    assert!(strict.is_err(), "strict decoding must reject latin1 bytes");
}
