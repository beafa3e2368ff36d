//! Canonical session model — the shape every legacy loader produces.
//!
//! A [`CanonicalSession`] always exposes the same seven sections. Six of them
//! are name → value mappings; `File` holds a single optional value. Callers
//! only ever need to check a section for emptiness, never for existence.
//!
//! The serialized form uses the section names exactly as the host tool
//! spells them (`Conf`, `Env`, `Alias`, `Cache`, `Hist`, `Compat`, `File`).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field name → value mapping used by the six mapping sections.
pub type SectionMap = serde_json::Map<String, Value>;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// A session in the current, version-independent schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanonicalSession {
    /// Framework settings (`EDITOR`, `TARGET`, `HTTP_USER_AGENT`, …).
    #[serde(rename = "Conf", default)]
    pub conf: SectionMap,
    /// Remote environment variables (`PWD`, `HOME`, `PLATFORM`, …).
    #[serde(rename = "Env", default)]
    pub env: SectionMap,
    /// Command aliases.
    #[serde(rename = "Alias", default)]
    pub alias: SectionMap,
    /// Cached command results.
    #[serde(rename = "Cache", default)]
    pub cache: SectionMap,
    /// Command history.
    #[serde(rename = "Hist", default)]
    pub hist: SectionMap,
    /// Which legacy version produced the session, plus resolved legacy values.
    #[serde(rename = "Compat", default)]
    pub compat: SectionMap,
    /// Path of the file the session is bound to, if any.
    #[serde(rename = "File", default)]
    pub file: Option<Value>,
}

/// One top-level section of the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Conf,
    Env,
    Alias,
    Cache,
    Hist,
    Compat,
    File,
}

/// Value produced by a field mapper rule for one section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionValue {
    /// Content of a mapping section.
    Map(SectionMap),
    /// Content of the single-valued `File` section.
    Single(Option<Value>),
}

impl Section {
    /// Every section, in schema order.
    pub const ALL: [Section; 7] = [
        Section::Conf,
        Section::Env,
        Section::Alias,
        Section::Cache,
        Section::Hist,
        Section::Compat,
        Section::File,
    ];

    /// Section name as it appears in the serialized session.
    pub fn name(self) -> &'static str {
        match self {
            Section::Conf => "Conf",
            Section::Env => "Env",
            Section::Alias => "Alias",
            Section::Cache => "Cache",
            Section::Hist => "Hist",
            Section::Compat => "Compat",
            Section::File => "File",
        }
    }

    /// Look a section up by its exact name. Returns `None` for names the
    /// schema does not define.
    pub fn from_name(name: &str) -> Option<Section> {
        Section::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Whether the section holds a mapping (everything except `File`).
    pub fn is_mapping(self) -> bool {
        !matches!(self, Section::File)
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl CanonicalSession {
    /// A fresh, fully-sectioned, empty session.
    ///
    /// Each call builds an independent value; nothing is shared between
    /// sessions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` into `section`.
    ///
    /// Returns the value back when its shape does not fit the section
    /// (a mapping for `File`, or a single value for a mapping section).
    pub fn assign(&mut self, section: Section, value: SectionValue) -> Result<(), SectionValue> {
        match (section, value) {
            (Section::File, SectionValue::Single(v)) => self.file = v,
            (Section::File, other) => return Err(other),
            (_, SectionValue::Map(map)) => {
                if let Some(slot) = self.map_mut(section) {
                    *slot = map;
                }
            }
            (_, other) => return Err(other),
        }
        Ok(())
    }

    /// Borrow a mapping section. `None` for `File`.
    pub fn map(&self, section: Section) -> Option<&SectionMap> {
        match section {
            Section::Conf => Some(&self.conf),
            Section::Env => Some(&self.env),
            Section::Alias => Some(&self.alias),
            Section::Cache => Some(&self.cache),
            Section::Hist => Some(&self.hist),
            Section::Compat => Some(&self.compat),
            Section::File => None,
        }
    }

    fn map_mut(&mut self, section: Section) -> Option<&mut SectionMap> {
        match section {
            Section::Conf => Some(&mut self.conf),
            Section::Env => Some(&mut self.env),
            Section::Alias => Some(&mut self.alias),
            Section::Cache => Some(&mut self.cache),
            Section::Hist => Some(&mut self.hist),
            Section::Compat => Some(&mut self.compat),
            Section::File => None,
        }
    }

    /// True when the section carries no data.
    pub fn is_section_empty(&self, section: Section) -> bool {
        match self.map(section) {
            Some(map) => map.is_empty(),
            None => self.file.as_ref().is_none_or(Value::is_null),
        }
    }

    /// Read-only lookup of an environment variable (e.g. `PWD`).
    pub fn env_var(&self, name: &str) -> Option<&Value> {
        self.env.get(name)
    }

    /// Like [`env_var`](Self::env_var), but only for string values.
    pub fn env_str(&self, name: &str) -> Option<&str> {
        self.env_var(name).and_then(Value::as_str)
    }

    /// Legacy version label recorded in `Compat.id`, if any.
    pub fn compat_id(&self) -> Option<&str> {
        self.compat.get("id").and_then(Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Render a value for human output: strings verbatim, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
