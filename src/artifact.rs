//! Artifacts and the existence oracle behind reuse decisions.
//!
//! An artifact's presence in the backing store is the sole signal that its
//! producing stage is already done; there is no manifest or checksum. The
//! oracle is a pure query and must never abort graph construction: a
//! transient store error is treated as "does not exist" (fail-open), so the
//! stage re-runs and rewrites the path.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[cfg(test)]
use mockall::automock;

/// Marker file written inside table and matrix-table directories on success.
const SUCCESS_MARKER: &str = "_SUCCESS";

/// The logical kind of a stored artifact, keyed by path extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// A tabular artifact (`.ht`), stored as a directory.
    Table,
    /// A matrix-table artifact (`.mt`), stored as a directory.
    MatrixTable,
    /// An exported variant-call file (`.vcf.gz` / `.vcf.bgz`).
    Vcf,
    /// Any other flat file (headers, pedigrees, recalibration reports).
    File,
}

impl ArtifactKind {
    /// Infers the kind from the path's extension convention.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        if path.ends_with(".ht") || path.ends_with(".ht/") {
            Self::Table
        } else if path.ends_with(".mt") || path.ends_with(".mt/") {
            Self::MatrixTable
        } else if path.ends_with(".vcf.gz") || path.ends_with(".vcf.bgz") {
            Self::Vcf
        } else {
            Self::File
        }
    }

    /// Whether the artifact is a directory whose completeness is signalled
    /// by a success marker rather than by the path itself.
    #[must_use]
    pub fn uses_success_marker(self) -> bool {
        matches!(self, Self::Table | Self::MatrixTable)
    }
}

/// Error raised by a storage backend during an existence check.
#[derive(Debug, Clone, Error)]
#[error("store error for '{path}': {message}")]
pub struct StoreError {
    /// The path being checked.
    pub path: String,
    /// The backend's message.
    pub message: String,
}

impl StoreError {
    /// Creates a new store error.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Backend capable of answering artifact existence queries.
#[cfg_attr(test, automock)]
pub trait ArtifactStore: Send + Sync {
    /// Returns whether the artifact at `path` is fully materialized.
    fn exists(&self, path: &str) -> Result<bool, StoreError>;
}

/// Fail-open existence check.
///
/// A backend error is logged and reported as "does not exist"; re-running
/// the producing stage is always safe because each path has a single writer.
pub fn file_exists(store: &dyn ArtifactStore, path: &str) -> bool {
    match store.exists(path) {
        Ok(exists) => exists,
        Err(err) => {
            warn!(path, error = %err, "existence check failed; treating artifact as absent");
            false
        }
    }
}

/// Reports whether a stage may be skipped because its outputs already exist.
///
/// Returns `false` unconditionally when `overwrite` is set; otherwise `true`
/// iff every listed path exists. An empty path set never permits reuse: a
/// stage that declares no outputs has nothing to prove it already ran, so it
/// re-runs. Pure query, no side effects.
pub fn can_reuse(store: &dyn ArtifactStore, paths: &[&str], overwrite: bool) -> bool {
    if overwrite {
        return false;
    }
    !paths.is_empty() && paths.iter().all(|p| file_exists(store, p))
}

/// Artifact store backed by the local filesystem.
///
/// Table and matrix-table paths count as existing only once their
/// `_SUCCESS` marker has been written.
#[derive(Debug, Clone, Default)]
pub struct LocalArtifactStore;

impl LocalArtifactStore {
    /// Creates a new local store.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactStore for LocalArtifactStore {
    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let kind = ArtifactKind::from_path(path);
        if kind.uses_success_marker() {
            Ok(Path::new(path).join(SUCCESS_MARKER).exists())
        } else {
            Ok(Path::new(path).exists())
        }
    }
}

/// In-memory artifact store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    paths: RwLock<HashSet<String>>,
    failing: RwLock<HashSet<String>>,
}

impl MemoryArtifactStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an artifact as materialized.
    pub fn add(&self, path: impl Into<String>) {
        self.paths.write().insert(path.into());
    }

    /// Marks several artifacts as materialized.
    pub fn add_all(&self, paths: impl IntoIterator<Item = impl Into<String>>) {
        let mut guard = self.paths.write();
        for p in paths {
            guard.insert(p.into());
        }
    }

    /// Makes existence checks for `path` fail with a backend error.
    pub fn fail_on(&self, path: impl Into<String>) {
        self.failing.write().insert(path.into());
    }

    /// Returns the number of materialized artifacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.read().len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.read().is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        if self.failing.read().contains(path) {
            return Err(StoreError::new(path, "simulated backend failure"));
        }
        Ok(self.paths.read().contains(path))
    }
}
