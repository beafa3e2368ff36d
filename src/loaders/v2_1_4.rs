//! Loader for session files written by releases up to 2.1.4.
//!
//! ## Layout
//!
//! ```json
//! {
//!   "PSCOREVER": 2,
//!   "SET": { "TEXTEDITOR": "…", "WEBBROWSER": "…", "HTTP_USER_AGENT": "…", "SAVEFILE": "…" },
//!   "ENV": { "CWD": "…", "WRITE_TMPDIR": "…", "WRITE_WEBDIR": "…" },
//!   "SRV": { …same fields as 1.x SERVER…, "webroot": "…" }
//! }
//! ```

use serde_json::Value;

use super::{FieldMapper, FieldRule, VersionMarker, build_env, remove_key, rename_key, required_map};
use crate::error::CompatError;
use crate::model::{SectionMap, SectionValue};
use crate::raw::RawLegacyRecord;

pub const LABEL: &str = "v2.1.4";

pub const MARKER: VersionMarker = VersionMarker {
    field: "PSCOREVER",
    expected: 2,
};

/// Old default user-agent list locations. A session still pointing at one
/// of them gets the current default instead.
pub const OBSOLETE_USER_AGENT_LISTS: [&str; 2] = [
    "file://misc/http/User-Agent.lst",
    "file://framework/misc/http_user_agents.lst",
];

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
    let mut conf = required_map(raw, LABEL, "SET")?.clone();

    rename_key(&mut conf, "TEXTEDITOR", "EDITOR");
    rename_key(&mut conf, "WEBBROWSER", "BROWSER");

    if conf
        .get("HTTP_USER_AGENT")
        .and_then(Value::as_str)
        .is_some_and(|ua| OBSOLETE_USER_AGENT_LISTS.contains(&ua))
    {
        remove_key(&mut conf, "HTTP_USER_AGENT");
    }

    remove_key(&mut conf, "SAVEFILE");

    Ok(SectionValue::Map(conf))
}

fn env(raw: &RawLegacyRecord) -> Result<SectionValue, CompatError> {
    build_env(raw, LABEL, "SRV", &[("webroot", "WEB_ROOT")]).map(SectionValue::Map)
}

fn compat(_raw: &RawLegacyRecord) -> Result<SectionValue, CompatError> {
    let mut compat = SectionMap::new();
    compat.insert("id".to_string(), Value::String(LABEL.to_string()));
    Ok(SectionValue::Map(compat))
}
