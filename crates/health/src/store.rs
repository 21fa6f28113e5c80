//! Snapshot generation store.
//!
//! Holds at most two generations in a fixed directory: `current`
//! (`cluster_state.json`) and `previous` (`cluster_state_previous.json`).
//! A run rotates `current` into `previous`, writes the new snapshot as
//! `current`, and removes `previous` once it is done, so only `current`
//! survives between runs.
//!
//! There is no locking. Overlapping runs against the same directory are
//! not supported and must be prevented by the scheduler.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::model::ClusterSnapshot;

/// File name of the current generation.
pub const CURRENT_FILE: &str = "cluster_state.json";

/// File name of the previous generation.
pub const PREVIOUS_FILE: &str = "cluster_state_previous.json";

/// File-backed two-generation snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    current: PathBuf,
    previous: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let current = dir.join(CURRENT_FILE);
        let previous = dir.join(PREVIOUS_FILE);
        Self {
            dir,
            current,
            previous,
        }
    }

    pub fn current_path(&self) -> &Path {
        &self.current
    }

    pub fn previous_path(&self) -> &Path {
        &self.previous
    }

    /// Restore the start-of-run invariant and validate `current`.
    ///
    /// Runs before any cluster contact. A leftover `previous` next to a
    /// `current` is discarded; a `previous` with no `current` (a run that
    /// died between rotation and write) is moved back into place. A
    /// `current` that does not parse is a fatal [`StoreError::Corrupt`].
    pub fn prepare(&self) -> Result<(), StoreError> {
        match (self.current.exists(), self.previous.exists()) {
            (true, true) => {
                warn!(path = %self.previous.display(), "Removing stale previous snapshot");
                self.clear_previous()?;
            }
            (false, true) => {
                warn!(
                    path = %self.previous.display(),
                    "Restoring previous snapshot left by an interrupted run"
                );
                fs::rename(&self.previous, &self.current).map_err(|source| StoreError::Io {
                    path: self.current.clone(),
                    source,
                })?;
            }
            _ => {}
        }

        if self.current.exists() {
            self.load_current()?;
            debug!(path = %self.current.display(), "Current snapshot is readable");
        }
        Ok(())
    }

    /// Rotate `current` into `previous` and persist `snapshot` as `current`.
    ///
    /// Returns whether a previous generation now exists; this is the only
    /// signal the rest of the run uses to decide if a comparison is possible.
    pub fn rotate_and_persist(&self, snapshot: &ClusterSnapshot) -> Result<bool, StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let previous_existed = if self.current.exists() {
            fs::rename(&self.current, &self.previous).map_err(|source| StoreError::Io {
                path: self.previous.clone(),
                source,
            })?;
            true
        } else {
            false
        };

        self.write_current(snapshot)?;

        info!(
            path = %self.current.display(),
            previous_existed,
            "Persisted cluster snapshot"
        );
        Ok(previous_existed)
    }

    /// Undo [`Self::rotate_and_persist`].
    ///
    /// Moves `previous` back over `current` when a previous generation
    /// existed, otherwise removes `current`.
    pub fn revert(&self, previous_existed: bool) -> Result<(), StoreError> {
        if previous_existed {
            fs::rename(&self.previous, &self.current).map_err(|source| StoreError::Io {
                path: self.current.clone(),
                source,
            })?;
        } else {
            match fs::remove_file(&self.current) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(StoreError::Io {
                        path: self.current.clone(),
                        source,
                    })
                }
            }
        }

        info!(
            path = %self.current.display(),
            previous_existed,
            "Reverted snapshot rotation"
        );
        Ok(())
    }

    pub fn load_current(&self) -> Result<ClusterSnapshot, StoreError> {
        Self::load(&self.current)
    }

    pub fn load_previous(&self) -> Result<ClusterSnapshot, StoreError> {
        Self::load(&self.previous)
    }

    /// Remove the previous generation. Removing a missing file is not an error.
    pub fn clear_previous(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.previous) {
            Ok(()) => {
                debug!(path = %self.previous.display(), "Removed previous snapshot");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                path: self.previous.clone(),
                source,
            }),
        }
    }

    fn load(path: &Path) -> Result<ClusterSnapshot, StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write to a sibling temp file, then rename over `current`.
    fn write_current(&self, snapshot: &ClusterSnapshot) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(snapshot).map_err(|source| {
            StoreError::Corrupt {
                path: self.current.clone(),
                source,
            }
        })?;

        let tmp = self.current.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.current).map_err(|source| StoreError::Io {
            path: self.current.clone(),
            source,
        })
    }
}
