//! Loader for 1.x session files.
//!
//! ## Layout
//!
//! ```json
//! {
//!   "SETTINGS": { "TEXTEDITOR": "…", "USERAGENT": "…", "POSTVAR": "…", "BACKDOOR": "…" },
//!   "ENV":      { "CWD": "…", "WRITE_TMPDIR": "…", "WRITE_WEBDIR": "…" },
//!   "SERVER":   { "addr", "home", "host", "phpver", "separator", "soft",
//!                 "user", "port", "client_addr", "os" },
//!   "OPENER":   { "URL": "…" },
//!   "ENV_HASH": "…"
//! }
//! ```
//!
//! There is no version marker: any record with this shape is accepted.

use serde_json::Value;

use super::{FieldMapper, FieldRule, build_env, remove_key, rename_key, required_map, required_str};
use crate::error::CompatError;
use crate::model::{SectionMap, SectionValue};
use crate::raw::RawLegacyRecord;

pub const LABEL: &str = "v1";

/// Legacy user-agent sentinel meaning "pick one at random".
pub const RANDOM_USER_AGENT: &str = "%%RAND_UA%%";

/// Current sentinel for the same semantic.
pub const DEFAULT_USER_AGENT: &str = "%%DEFAULT%%";

/// Placeholder in the legacy passkey replaced by the session hash.
pub const HASHKEY_PLACEHOLDER: &str = "%%HASHKEY%%";

const RULES: [FieldRule; 3] = [
    FieldRule {
        target: "Conf",
        transform: conf,
    },
    FieldRule {
        target: "Env",
        transform: env,
    },
    FieldRule {
        target: "Compat",
        transform: compat,
    },
];

pub const MAPPER: FieldMapper = FieldMapper {
    version: LABEL,
    rules: &RULES,
};

fn conf(raw: &RawLegacyRecord) -> Result<SectionValue, CompatError> {
    let mut conf = required_map(raw, LABEL, "SETTINGS")?.clone();

    rename_key(&mut conf, "TEXTEDITOR", "EDITOR");

    rename_key(&mut conf, "USERAGENT", "HTTP_USER_AGENT");
    if conf.get("HTTP_USER_AGENT").and_then(Value::as_str) == Some(RANDOM_USER_AGENT) {
        conf.insert(
            "HTTP_USER_AGENT".to_string(),
            Value::String(DEFAULT_USER_AGENT.to_string()),
        );
    }

    // No canonical equivalent; the passkey survives in Compat.
    remove_key(&mut conf, "POSTVAR");
    remove_key(&mut conf, "BACKDOOR");

    if let Some(url) = raw.get_map("OPENER").and_then(|opener| opener.get("URL")) {
        conf.insert("TARGET".to_string(), url.clone());
    }

    Ok(SectionValue::Map(conf))
}

fn env(raw: &RawLegacyRecord) -> Result<SectionValue, CompatError> {
    build_env(raw, LABEL, "SERVER", &[]).map(SectionValue::Map)
}

fn compat(raw: &RawLegacyRecord) -> Result<SectionValue, CompatError> {
    let mut compat = SectionMap::new();
    compat.insert("id".to_string(), Value::String(LABEL.to_string()));

    let settings = required_map(raw, LABEL, "SETTINGS")?;
    let passkey = required_str(settings, LABEL, "SETTINGS", "POSTVAR")?;
    let resolved = if passkey.contains(HASHKEY_PLACEHOLDER) {
        let hash = env_hash(raw)?;
        substitute_hashkey(passkey, hash)
    } else {
        passkey.to_string()
    };
    compat.insert("passkey".to_string(), Value::String(resolved));

    Ok(SectionValue::Map(compat))
}

fn env_hash(raw: &RawLegacyRecord) -> Result<&str, CompatError> {
    let missing = |detail: String| CompatError::MissingField {
        version: LABEL.to_string(),
        field: "ENV_HASH".to_string(),
        detail,
    };
    match raw.get("ENV_HASH") {
        Some(Value::String(hash)) => Ok(hash),
        Some(other) => Err(missing(format!(
            "expected a string, found {}",
            crate::raw::json_kind(other)
        ))),
        None => Err(missing(
            "passkey contains the hash placeholder but no hash is recorded".to_string(),
        )),
    }
}

/// Replace every hash placeholder in `passkey` with `hash`.
pub fn substitute_hashkey(passkey: &str, hash: &str) -> String {
    passkey.replace(HASHKEY_PLACEHOLDER, hash)
}
