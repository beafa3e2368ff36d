//! Loader chain — ordered fallback across legacy layouts.
//!
//! [`LoaderChain::load`] tries each [`VersionedLoader`] newest first and
//! returns the first success. Individual loader failures only mean "this
//! layout does not apply"; when every loader fails the chain reports a single
//! [`CompatError::NoMatch`].

use std::path::Path;

use tracing::{debug, error, info};

use crate::error::{AttemptFailure, CompatError};
use crate::loaders::{LegacyVersion, VersionedLoader};
use crate::model::CanonicalSession;
use crate::raw::TextDecoding;

/// Ordered list of versioned loaders, newest layout first.
#[derive(Debug, Clone)]
pub struct LoaderChain {
    loaders: Vec<VersionedLoader>,
}

impl LoaderChain {
    pub fn new(loaders: Vec<VersionedLoader>) -> Self {
        Self { loaders }
    }

    /// Chain with every built-in layout, newest first.
    pub fn default_chain(decoding: TextDecoding) -> Self {
        Self::new(
            LegacyVersion::NEWEST_FIRST
                .into_iter()
                .map(|version| VersionedLoader::for_version(version, decoding))
                .collect(),
        )
    }

    pub fn loaders(&self) -> &[VersionedLoader] {
        &self.loaders
    }

    /// Version labels in the order they are tried.
    pub fn versions(&self) -> Vec<&'static str> {
        self.loaders.iter().map(VersionedLoader::version).collect()
    }

    /// Load `path` with the first loader that accepts it.
    pub fn load(&self, path: &Path) -> Result<CanonicalSession, CompatError> {
        let mut attempts = Vec::with_capacity(self.loaders.len());

        for loader in &self.loaders {
            match loader.load(path) {
                Ok(session) => {
                    info!(
                        path = %path.display(),
                        version = loader.version(),
                        "recognized legacy session"
                    );
                    return Ok(session);
                }
                Err(e) => {
                    if e.is_config_defect() {
                        error!(
                            version = loader.version(),
                            error = %e,
                            "loader definition is broken; skipping"
                        );
                    } else {
                        debug!(
                            path = %path.display(),
                            version = loader.version(),
                            kind = e.kind(),
                            error = %e,
                            "legacy layout did not match"
                        );
                    }
                    attempts.push(AttemptFailure::new(loader.version(), &e));
                }
            }
        }

        Err(CompatError::NoMatch {
            path: path.to_path_buf(),
            attempts,
        })
    }
}

impl Default for LoaderChain {
    fn default() -> Self {
        Self::default_chain(TextDecoding::default())
    }
}

/// Load `path` through the default chain.
pub fn load(path: &Path, decoding: TextDecoding) -> Result<CanonicalSession, CompatError> {
    LoaderChain::default_chain(decoding).load(path)
}
