//! Regression-guarded snapshot publishing.
//!
//! A stage output replaces the previous snapshot only when it resolved at
//! least `threshold` items. The replacement is a temp file in the destination
//! directory renamed over the old one, so readers see either the old or the
//! new file and never a partial write.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    /// Undersized output discarded; the previous snapshot is untouched.
    Rejected,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(
        "refusing to create {path:?}: only {resolved} resolved (threshold {threshold}) and no previous snapshot"
    )]
    RegressionGuardAbort {
        path: PathBuf,
        resolved: usize,
        threshold: usize,
    },

    #[error("failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PersistError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            PersistError::RegressionGuardAbort { .. } => Some(ErrorKind::RegressionGuardAbort),
            _ => None,
        }
    }
}

pub struct SnapshotGuard {
    path: PathBuf,
    threshold: usize,
}

impl SnapshotGuard {
    pub fn new(path: impl Into<PathBuf>, threshold: usize) -> Self {
        Self {
            path: path.into(),
            threshold,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn publish<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        resolved_count: usize,
    ) -> Result<PublishOutcome, PersistError> {
        if resolved_count < self.threshold {
            if self.path.exists() {
                warn!(
                    "Below threshold ({} < {}), keeping existing {:?}",
                    resolved_count, self.threshold, self.path
                );
                return Ok(PublishOutcome::Rejected);
            }
            return Err(PersistError::RegressionGuardAbort {
                path: self.path.clone(),
                resolved: resolved_count,
                threshold: self.threshold,
            });
        }

        let mut body = serde_json::to_vec_pretty(payload)?;
        body.push(b'\n');
        self.write_atomically(&body)?;

        info!(
            "Wrote {:?} ({} resolved, threshold {})",
            self.path, resolved_count, self.threshold
        );
        Ok(PublishOutcome::Published)
    }

    fn write_atomically(&self, body: &[u8]) -> Result<(), PersistError> {
        let io_err = |source: std::io::Error| PersistError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(body).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}
