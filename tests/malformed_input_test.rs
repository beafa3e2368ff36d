//! Malformed input tolerance tests for the loader chain.
//!
//! Verifies that the chain returns `NoMatch` (never panics) when given empty
//! files, binary garbage, truncated JSON, wrong top-level shapes, or records
//! whose nested fields have the wrong types.

use compat_session::chain::LoaderChain;
use compat_session::error::CompatError;
use compat_session::raw::TextDecoding;

/// Write `content` to a temp file and assert every decoding policy yields
/// `NoMatch`.
fn assert_no_match(content: &[u8], label: &str) {
    let tmp = tempfile::NamedTempFile::with_suffix(".session").expect("create temp file");
    std::fs::write(tmp.path(), content).expect("write content");

    for decoding in [TextDecoding::Replace, TextDecoding::Strict, TextDecoding::Latin1] {
        let result = LoaderChain::default_chain(decoding).load(tmp.path());
        match result {
            Err(CompatError::NoMatch { attempts, .. }) => {
                assert_eq!(attempts.len(), 2, "{label}: one attempt per loader");
            }
            Err(other) => panic!("{label} ({decoding:?}): expected NoMatch, got {other:?}"),
            Ok(session) => panic!("{label} ({decoding:?}): unexpectedly loaded {session:?}"),
        }
    }
}

#[test]
fn malformed_empty_file() {
    assert_no_match(b"", "empty");
}

#[test]
fn malformed_binary_garbage() {
    assert_no_match(b"\x00\x01\x02\xff\xfe\xfd\x80\x81\x82garbage\n\x00", "garbage");
}

#[test]
fn malformed_pickle_header() {
    // Python pickle protocol 4 prefix: a legacy file that was never converted.
    assert_no_match(b"\x80\x04\x95\x1c\x00\x00\x00\x00\x00\x00\x00}\x94(\x8c\x03SET", "pickle");
}

#[test]
fn malformed_truncated_json() {
    assert_no_match(br#"{"SETTINGS": {"POSTVAR": "x""#, "truncated");
}

#[test]
fn malformed_top_level_array() {
    assert_no_match(br#"[{"SETTINGS": {}}]"#, "array");
}

#[test]
fn malformed_top_level_string() {
    assert_no_match(br#""SETTINGS""#, "string");
}

#[test]
fn malformed_empty_object() {
    assert_no_match(b"{}", "empty object");
}

#[test]
fn malformed_nested_types() {
    assert_no_match(
        br#"{"SETTINGS": "not a map", "ENV": [], "SERVER": 7, "PSCOREVER": "x"}"#,
        "nested types",
    );
}

#[test]
fn malformed_server_os_not_a_string() {
    assert_no_match(
        br#"{
            "SETTINGS": {"POSTVAR": "k"},
            "ENV": {},
            "SERVER": {
                "addr": "a", "home": "h", "host": "h", "phpver": "5",
                "separator": "/", "soft": "s", "user": "u", "port": 1,
                "client_addr": "c", "os": 42
            }
        }"#,
        "os number",
    );
}

#[test]
fn malformed_passkey_not_a_string() {
    assert_no_match(
        br#"{
            "SETTINGS": {"POSTVAR": ["k"]},
            "ENV": {},
            "SERVER": {
                "addr": "a", "home": "h", "host": "h", "phpver": "5",
                "separator": "/", "soft": "s", "user": "u", "port": 1,
                "client_addr": "c", "os": "Linux"
            }
        }"#,
        "passkey array",
    );
}
