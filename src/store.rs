//! Typed TOML documents backing the three persisted namespaces.
//!
//! Each namespace (engine settings, whitelist, block counter) is one small
//! TOML file in the data directory. A [`Document`] is loaded once at startup
//! and rewritten in full on every mutation. Without a path it lives in memory
//! only, which is what tests and `persist = false` use.
//!
//! Loading never fails: a missing file yields `T::default()`, an unreadable
//! or invalid one is logged and also yields the default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};

/// One persisted namespace.
#[derive(Debug, Clone)]
pub struct Document {
    path: Option<PathBuf>,
}

impl Document {
    /// A document stored at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A document that is never written to disk.
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Reads the document, falling back to `T::default()`.
    pub fn load<T: DeserializeOwned + Default>(&self) -> T {
        match self.try_load() {
            Ok(Some(value)) => value,
            Ok(None) => T::default(),
            Err(e) => {
                warn!(error = %e, "Invalid persisted state, using defaults");
                T::default()
            }
        }
    }

    /// Reads the document. `Ok(None)` when there is nothing on disk.
    pub fn try_load<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.clone(),
                    source,
                });
            }
        };
        toml::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Deserialize {
                path: path.clone(),
                source,
            })
    }

    /// Rewrites the whole document.
    ///
    /// The content goes to a sibling temporary file first and is renamed over
    /// the target, so a crash mid-write leaves the previous version intact.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = toml::to_string_pretty(value)?;
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let tmp = path.with_extension("toml.tmp");
        fs::write(&tmp, content).map_err(io_err)?;
        fs::rename(&tmp, path).map_err(io_err)?;
        debug!(path = %path.display(), "State saved");
        Ok(())
    }
}
