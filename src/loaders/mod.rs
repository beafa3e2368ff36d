//! Versioned loaders and the field-mapping rules they apply.
//!
//! Each supported legacy layout is one [`LegacyVersion`] variant carrying a
//! fixed [`FieldMapper`] (a static table of section → transform rules) and an
//! optional [`VersionMarker`] check. A [`VersionedLoader`] binds those to a
//! [`RawReader`] and exposes a single [`load`](VersionedLoader::load).

pub mod v1;
pub mod v2_1_4;

use std::fmt;
use std::path::Path;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::CompatError;
use crate::model::{CanonicalSession, Section, SectionMap, SectionValue};
use crate::raw::{RawLegacyRecord, RawReader, TextDecoding, json_kind};

// ---------------------------------------------------------------------------
// Field mapper
// ---------------------------------------------------------------------------

/// Computes the content of one canonical section from a raw legacy record.
pub type Transform = fn(&RawLegacyRecord) -> Result<SectionValue, CompatError>;

/// A single mapping rule: the section it fills and how.
#[derive(Clone, Copy)]
pub struct FieldRule {
    /// Canonical section name (`"Conf"`, `"Env"`, …).
    pub target: &'static str,
    pub transform: Transform,
}

impl fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// The rule table translating one legacy layout into canonical sections.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapper {
    /// Legacy version label, recorded in errors.
    pub version: &'static str,
    pub rules: &'static [FieldRule],
}

impl FieldMapper {
    /// Check that every rule targets a section the schema defines.
    pub fn validate(&self) -> Result<(), CompatError> {
        for rule in self.rules {
            self.resolve(rule)?;
        }
        Ok(())
    }

    /// Build a fresh session and fill it rule by rule.
    ///
    /// Rules only read `raw`, so their order does not affect the result.
    pub fn apply(&self, raw: &RawLegacyRecord) -> Result<CanonicalSession, CompatError> {
        let mut session = CanonicalSession::new();
        for rule in self.rules {
            let section = self.resolve(rule)?;
            let value = (rule.transform)(raw)?;
            session.assign(section, value).map_err(|value| {
                let shape = match value {
                    SectionValue::Map(_) => "mapping",
                    SectionValue::Single(_) => "single value",
                };
                CompatError::UnknownTarget {
                    version: self.version.to_string(),
                    target: format!("{} (rule produced a {shape})", rule.target),
                }
            })?;
            trace!(version = self.version, section = %section, "applied field rule");
        }
        Ok(session)
    }

    fn resolve(&self, rule: &FieldRule) -> Result<Section, CompatError> {
        Section::from_name(rule.target).ok_or_else(|| CompatError::UnknownTarget {
            version: self.version.to_string(),
            target: rule.target.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Version marker
// ---------------------------------------------------------------------------

/// An integer field a legacy layout uses to identify its revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMarker {
    pub field: &'static str,
    pub expected: i64,
}

impl VersionMarker {
    /// Fail with [`CompatError::VersionMismatch`] unless `raw` carries the
    /// expected marker value.
    ///
    /// Integer numbers, whole floats and strings holding an integer are
    /// accepted, the same coercions the legacy tool applied.
    pub fn check(&self, raw: &RawLegacyRecord) -> Result<(), CompatError> {
        let mismatch = |found: Option<String>| CompatError::VersionMismatch {
            field: self.field.to_string(),
            expected: self.expected,
            found,
        };
        let value = raw.get(self.field).ok_or_else(|| mismatch(None))?;
        match marker_as_int(value) {
            Some(found) if found == self.expected => Ok(()),
            _ => Err(mismatch(Some(value.to_string()))),
        }
    }
}

fn marker_as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Legacy versions
// ---------------------------------------------------------------------------

/// Every legacy layout this crate can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyVersion {
    /// Sessions written by releases up to 2.1.4 (`PSCOREVER = 2`).
    V2_1_4,
    /// Sessions written by 1.x releases.
    V1,
}

impl LegacyVersion {
    /// Supported versions, newest first.
    pub const NEWEST_FIRST: [LegacyVersion; 2] = [LegacyVersion::V2_1_4, LegacyVersion::V1];

    /// Label stored in `Compat.id`.
    pub fn label(self) -> &'static str {
        match self {
            LegacyVersion::V2_1_4 => v2_1_4::LABEL,
            LegacyVersion::V1 => v1::LABEL,
        }
    }

    /// Rule table for this layout.
    pub fn mapper(self) -> FieldMapper {
        match self {
            LegacyVersion::V2_1_4 => v2_1_4::MAPPER,
            LegacyVersion::V1 => v1::MAPPER,
        }
    }

    /// Version marker the layout must carry, if it has one.
    pub fn marker(self) -> Option<VersionMarker> {
        match self {
            LegacyVersion::V2_1_4 => Some(v2_1_4::MARKER),
            LegacyVersion::V1 => None,
        }
    }

    /// Top-level fields that identify the layout, for `formats` listings.
    pub fn layout_keys(self) -> &'static [&'static str] {
        match self {
            LegacyVersion::V2_1_4 => &["PSCOREVER", "SET", "ENV", "SRV"],
            LegacyVersion::V1 => &["SETTINGS", "ENV", "SERVER", "ENV_HASH", "OPENER"],
        }
    }
}

// ---------------------------------------------------------------------------
// Versioned loader
// ---------------------------------------------------------------------------

/// Raw reader, optional marker check and field mapper for one legacy layout.
#[derive(Debug, Clone, Copy)]
pub struct VersionedLoader {
    reader: RawReader,
    marker: Option<VersionMarker>,
    mapper: FieldMapper,
}

impl VersionedLoader {
    pub fn new(reader: RawReader, marker: Option<VersionMarker>, mapper: FieldMapper) -> Self {
        Self {
            reader,
            marker,
            mapper,
        }
    }

    /// Loader for a built-in legacy layout.
    pub fn for_version(version: LegacyVersion, decoding: TextDecoding) -> Self {
        Self::new(
            RawReader::new(decoding),
            version.marker(),
            version.mapper(),
        )
    }

    /// Legacy version label of the bound mapper.
    pub fn version(&self) -> &'static str {
        self.mapper.version
    }

    pub fn mapper(&self) -> &FieldMapper {
        &self.mapper
    }

    /// Read `path`, check the version marker and map it to a canonical session.
    pub fn load(&self, path: &Path) -> Result<CanonicalSession, CompatError> {
        let raw = self.read_raw(path)?;
        let session = self.apply(&raw)?;
        debug!(
            path = %path.display(),
            version = self.version(),
            "legacy session loaded"
        );
        Ok(session)
    }

    /// Raw read plus marker check, without mapping.
    pub fn read_raw(&self, path: &Path) -> Result<RawLegacyRecord, CompatError> {
        let raw = self.reader.read(path)?;
        if let Some(marker) = &self.marker {
            marker.check(&raw)?;
        }
        Ok(raw)
    }

    /// Map an already-read record.
    pub fn apply(&self, raw: &RawLegacyRecord) -> Result<CanonicalSession, CompatError> {
        self.mapper.apply(raw)
    }
}

// ---------------------------------------------------------------------------
// Mapping helpers shared by the version modules
// ---------------------------------------------------------------------------

/// Legacy OS descriptions meaning "could not be determined".
const UNKNOWN_PLATFORMS: [&str; 3] = ["unknow", "unknown", ""];

/// Server-info fields copied into `Env` by every legacy layout.
pub const SERVER_ENV_FIELDS: &[(&str, &str)] = &[
    ("addr", "ADDR"),
    ("home", "HOME"),
    ("host", "HOST"),
    ("phpver", "PHP_VERSION"),
    ("separator", "PATH_SEP"),
    ("soft", "HTTP_SOFTWARE"),
    ("user", "USER"),
    ("port", "PORT"),
    ("client_addr", "CLIENT_ADDR"),
];

/// Move `old` to `new` if present. No-op otherwise.
pub fn rename_key(map: &mut SectionMap, old: &str, new: &str) {
    if let Some(value) = map.remove(old) {
        map.insert(new.to_string(), value);
    }
}

/// Drop `key` if present.
pub fn remove_key(map: &mut SectionMap, key: &str) {
    map.remove(key);
}

/// Guess the platform from an OS description and a path separator.
///
/// The first whitespace-separated token, lowercased, wins unless it is one of
/// the "unknown" sentinels; then a backslash separator means `windows` and
/// anything else `unix`.
pub fn derive_platform(os: &str, path_sep: Option<&Value>) -> String {
    let token = os
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();
    if !UNKNOWN_PLATFORMS.contains(&token.as_str()) {
        return token;
    }
    if path_sep.and_then(Value::as_str) == Some("\\") {
        "windows".to_string()
    } else {
        "unix".to_string()
    }
}

/// Top-level field that must be a mapping.
pub fn required_map<'a>(
    raw: &'a RawLegacyRecord,
    version: &str,
    key: &str,
) -> Result<&'a SectionMap, CompatError> {
    match raw.get(key) {
        Some(Value::Object(map)) => Ok(map),
        Some(other) => Err(missing(
            version,
            key,
            format!("expected a mapping, found {}", json_kind(other)),
        )),
        None => Err(missing(version, key, "field is absent".to_string())),
    }
}

/// Field of a nested record; `record` names the parent for error messages.
pub fn required_field<'a>(
    map: &'a SectionMap,
    version: &str,
    record: &str,
    field: &str,
) -> Result<&'a Value, CompatError> {
    map.get(field)
        .ok_or_else(|| missing(version, &format!("{record}.{field}"), "field is absent".into()))
}

/// Like [`required_field`] for string values.
pub fn required_str<'a>(
    map: &'a SectionMap,
    version: &str,
    record: &str,
    field: &str,
) -> Result<&'a str, CompatError> {
    let value = required_field(map, version, record, field)?;
    value.as_str().ok_or_else(|| {
        missing(
            version,
            &format!("{record}.{field}"),
            format!("expected a string, found {}", json_kind(value)),
        )
    })
}

/// Build the canonical `Env` section from a legacy environment map and the
/// nested server-info record named `server_key`.
///
/// `extra_fields` lists layout-specific server fields on top of
/// [`SERVER_ENV_FIELDS`].
pub fn build_env(
    raw: &RawLegacyRecord,
    version: &str,
    server_key: &str,
    extra_fields: &[(&str, &str)],
) -> Result<SectionMap, CompatError> {
    let mut env = required_map(raw, version, "ENV")?.clone();

    rename_key(&mut env, "CWD", "PWD");
    rename_key(&mut env, "WRITE_TMPDIR", "WRITEABLE_TMPDIR");
    rename_key(&mut env, "WRITE_WEBDIR", "WRITEABLE_WEBDIR");
    remove_key(&mut env, "TEXTEDITOR");

    let server = required_map(raw, version, server_key)?;
    for (legacy, canonical) in SERVER_ENV_FIELDS.iter().chain(extra_fields) {
        let value = required_field(server, version, server_key, legacy)?;
        env.insert((*canonical).to_string(), value.clone());
    }

    let os = required_str(server, version, server_key, "os")?;
    let platform = derive_platform(os, env.get("PATH_SEP"));
    env.insert("PLATFORM".to_string(), Value::String(platform));

    Ok(env)
}

fn missing(version: &str, field: &str, detail: String) -> CompatError {
    CompatError::MissingField {
        version: version.to_string(),
        field: field.to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> RawLegacyRecord {
        match value {
            Value::Object(map) => RawLegacyRecord::new(map),
            other => panic!("fixture must be an object, got {other}"),
        }
    }

    #[test]
    fn rename_moves_value_and_is_noop_when_absent() {
        let mut map = json!({"CWD": "/var/www", "HOME": "/home/w"})
            .as_object()
            .cloned()
            .expect("object");
        rename_key(&mut map, "CWD", "PWD");
        assert_eq!(map.get("PWD"), Some(&json!("/var/www")));
        assert!(!map.contains_key("CWD"));

        let before = map.clone();
        rename_key(&mut map, "CWD", "PWD");
        rename_key(&mut map, "MISSING", "OTHER");
        assert_eq!(map, before);
    }

    #[test]
    fn platform_from_os_token() {
        assert_eq!(derive_platform("Linux 5.x", Some(&json!("/"))), "linux");
        assert_eq!(derive_platform("  FreeBSD 13", None), "freebsd");
    }

    #[test]
    fn platform_falls_back_on_separator() {
        assert_eq!(
            derive_platform("Unknown flavor", Some(&json!("\\"))),
            "windows"
        );
        assert_eq!(derive_platform("Unknown flavor", Some(&json!("/"))), "unix");
        assert_eq!(derive_platform("unknow", Some(&json!("\\"))), "windows");
        assert_eq!(derive_platform("", None), "unix");
        assert_eq!(derive_platform("   ", Some(&json!("\\"))), "windows");
    }

    #[test]
    fn marker_accepts_integer_coercions() {
        let marker = VersionMarker {
            field: "PSCOREVER",
            expected: 2,
        };
        assert!(marker.check(&record(json!({"PSCOREVER": 2}))).is_ok());
        assert!(marker.check(&record(json!({"PSCOREVER": "2"}))).is_ok());
        assert!(marker.check(&record(json!({"PSCOREVER": 2.0}))).is_ok());
    }

    #[test]
    fn marker_rejects_absent_or_different() {
        let marker = VersionMarker {
            field: "PSCOREVER",
            expected: 2,
        };
        let err = marker.check(&record(json!({"SET": {}}))).unwrap_err();
        assert!(matches!(
            err,
            CompatError::VersionMismatch { found: None, .. }
        ));

        let err = marker.check(&record(json!({"PSCOREVER": 3}))).unwrap_err();
        match err {
            CompatError::VersionMismatch { found, expected, .. } => {
                assert_eq!(expected, 2);
                assert_eq!(found.as_deref(), Some("3"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(marker.check(&record(json!({"PSCOREVER": "two"}))).is_err());
    }

    fn empty_map(_: &RawLegacyRecord) -> Result<SectionValue, CompatError> {
        Ok(SectionValue::Map(SectionMap::new()))
    }

    #[test]
    fn unknown_target_is_reported() {
        static RULES: [FieldRule; 2] = [
            FieldRule {
                target: "Conf",
                transform: empty_map,
            },
            FieldRule {
                target: "Settings",
                transform: empty_map,
            },
        ];
        let mapper = FieldMapper {
            version: "test",
            rules: &RULES,
        };
        let err = mapper.validate().unwrap_err();
        assert!(err.is_config_defect());
        let err = mapper.apply(&RawLegacyRecord::default()).unwrap_err();
        match err {
            CompatError::UnknownTarget { target, .. } => assert_eq!(target, "Settings"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn shape_mismatch_is_a_config_defect() {
        static RULES: [FieldRule; 1] = [FieldRule {
            target: "File",
            transform: empty_map,
        }];
        let mapper = FieldMapper {
            version: "test",
            rules: &RULES,
        };
        assert!(mapper.validate().is_ok());
        let err = mapper.apply(&RawLegacyRecord::default()).unwrap_err();
        assert!(err.is_config_defect());
    }

    #[test]
    fn built_in_mappers_are_valid_and_section_disjoint() {
        for version in LegacyVersion::NEWEST_FIRST {
            let mapper = version.mapper();
            mapper.validate().expect("built-in mapper must be valid");
            let mut seen = std::collections::HashSet::new();
            for rule in mapper.rules {
                assert!(
                    seen.insert(rule.target),
                    "{} has two rules for {}",
                    version.label(),
                    rule.target
                );
            }
        }
    }

    #[test]
    fn build_env_reports_missing_server_field() {
        let raw = record(json!({
            "ENV": {},
            "SERVER": {"addr": "10.0.0.1"}
        }));
        let err = build_env(&raw, "v1", "SERVER", &[]).unwrap_err();
        match err {
            CompatError::MissingField { field, .. } => assert_eq!(field, "SERVER.home"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn build_env_rejects_non_mapping_env() {
        let raw = record(json!({"ENV": "nope", "SERVER": {}}));
        let err = build_env(&raw, "v1", "SERVER", &[]).unwrap_err();
        assert!(err.to_string().contains("expected a mapping, found string"));
    }
}
