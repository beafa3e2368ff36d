//! Typed errors for legacy session loading.
//!
//! Each variant carries enough context to tell the user what went wrong.
//! Internal propagation in the binary uses `anyhow`; the library API exposes
//! these `thiserror` types.
//!
//! Per-loader variants only mean "this legacy version does not apply" and are
//! absorbed by the [`LoaderChain`](crate::chain::LoaderChain).
//! [`CompatError::NoMatch`] is the chain-wide outcome and is never produced by
//! a single loader.

use std::path::PathBuf;

/// Errors surfaced while loading a legacy session.
#[derive(Debug, thiserror::Error)]
pub enum CompatError {
    /// The session file could not be opened or read.
    #[error("Cannot read session file {}: {detail}", path.display())]
    FileUnreadable { path: PathBuf, detail: String },

    /// The bytes were read but do not form a nested key/value record.
    #[error("Malformed session record in {}: {detail}", path.display())]
    MalformedRecord { path: PathBuf, detail: String },

    /// The record's version marker is absent or differs from the loader's.
    #[error(
        "Version marker '{field}' mismatch: expected {expected}, found {}",
        found.as_deref().unwrap_or("nothing")
    )]
    VersionMismatch {
        field: String,
        expected: i64,
        found: Option<String>,
    },

    /// A field mapper rule targets a section the canonical schema lacks.
    ///
    /// This is a defect in the mapper definition, not in the session data.
    #[error(
        "Field mapper for {version} targets unknown section '{target}'. This is a bug in the loader table."
    )]
    UnknownTarget { version: String, target: String },

    /// A field the legacy layout requires is absent or has the wrong shape.
    #[error("Legacy {version} record is missing {field}: {detail}")]
    MissingField {
        version: String,
        field: String,
        detail: String,
    },

    /// No loader in the chain recognized the file.
    #[error(
        "Could not recognize session format of {} (tried {}).",
        path.display(),
        attempts.iter().map(|a| a.version.as_str()).collect::<Vec<_>>().join(", ")
    )]
    NoMatch {
        path: PathBuf,
        attempts: Vec<AttemptFailure>,
    },
}

impl CompatError {
    /// True when the failure comes from a broken loader definition rather
    /// than from the file being read.
    pub fn is_config_defect(&self) -> bool {
        matches!(self, CompatError::UnknownTarget { .. })
    }

    /// Stable machine-readable name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            CompatError::FileUnreadable { .. } => "file_unreadable",
            CompatError::MalformedRecord { .. } => "malformed_record",
            CompatError::VersionMismatch { .. } => "version_mismatch",
            CompatError::UnknownTarget { .. } => "unknown_target",
            CompatError::MissingField { .. } => "missing_field",
            CompatError::NoMatch { .. } => "no_match",
        }
    }
}

/// Summary of one discarded loader attempt, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AttemptFailure {
    /// Legacy version label of the loader (e.g. `"v2.1.4"`).
    pub version: String,
    /// [`CompatError::kind`] of the failure.
    pub kind: String,
    /// Rendered error message.
    pub detail: String,
}

impl AttemptFailure {
    pub fn new(version: &str, error: &CompatError) -> Self {
        Self {
            version: version.to_string(),
            kind: error.kind().to_string(),
            detail: error.to_string(),
        }
    }
}
