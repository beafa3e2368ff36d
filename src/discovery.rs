//! Directory scanning for legacy session files.
//!
//! [`scan_sessions`] walks a directory tree and runs every regular file
//! through a [`LoaderChain`], reporting which legacy layout (if any) each file
//! matched. Nothing is converted or written; this is a read-only survey.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::chain::LoaderChain;
use crate::error::{AttemptFailure, CompatError};

/// Default recursion depth for [`scan_sessions`].
pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Result of probing one file.
#[derive(Debug, Clone, Serialize)]
pub struct ScanEntry {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: ScanOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The file loaded; `version` is the matching legacy layout.
    Recognized { version: String },
    /// No loader accepted the file.
    Unrecognized { attempts: Vec<AttemptFailure> },
}

impl ScanEntry {
    pub fn is_recognized(&self) -> bool {
        matches!(self.outcome, ScanOutcome::Recognized { .. })
    }
}

/// Probe every regular file under `root` (up to `max_depth` levels deep).
///
/// Entries are returned sorted by path. Unreadable directory entries are
/// logged and skipped.
pub fn scan_sessions(root: &Path, max_depth: usize, chain: &LoaderChain) -> Vec<ScanEntry> {
    debug!(root = %root.display(), max_depth, "scanning for legacy sessions");

    let mut entries = Vec::new();
    for entry in WalkDir::new(root)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let outcome = match chain.load(path) {
            Ok(session) => ScanOutcome::Recognized {
                version: session.compat_id().unwrap_or("unknown").to_string(),
            },
            Err(CompatError::NoMatch { attempts, .. }) => ScanOutcome::Unrecognized { attempts },
            Err(e) => ScanOutcome::Unrecognized {
                attempts: vec![AttemptFailure::new("chain", &e)],
            },
        };
        trace!(path = %path.display(), ?outcome, "scanned file");
        entries.push(ScanEntry {
            path: path.to_path_buf(),
            outcome,
        });
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}
