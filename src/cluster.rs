//! Compute-cluster handles.
//!
//! Each provisioned cluster is a distinct instance, even when two share a
//! display name: parallel pipeline branches each get their own. Long-lived
//! clusters host nested sub-pipelines that keep submitting stages after the
//! initial batch; the distinction affects provisioning only, never
//! scheduling semantics.

use crate::batch::JobHandle;
use serde::{Deserialize, Serialize};

/// Handle to a cluster provisioned within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterHandle(pub(crate) usize);

impl ClusterHandle {
    /// Returns the cluster's index within its batch.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Specification of a provisioned compute cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSpec {
    /// Display name; not unique.
    pub name: String,
    /// Worker scatter/parallelism count.
    pub scatter_count: usize,
    /// Whether the cluster is sized for test runs.
    pub is_test: bool,
    /// Whether the cluster outlives its initial batch of stages.
    pub long: bool,
    /// Readiness gate: stages on this cluster implicitly wait for these jobs
    /// in addition to their explicit edges.
    pub depends_on: Vec<JobHandle>,
}

impl ClusterSpec {
    /// Creates a new cluster specification.
    #[must_use]
    pub fn new(name: impl Into<String>, scatter_count: usize, is_test: bool) -> Self {
        Self {
            name: name.into(),
            scatter_count,
            is_test,
            long: false,
            depends_on: Vec::new(),
        }
    }

    /// Marks the cluster long-lived.
    #[must_use]
    pub fn long_lived(mut self) -> Self {
        self.long = true;
        self
    }

    /// Seeds the readiness gate.
    #[must_use]
    pub fn with_depends_on(mut self, deps: &[JobHandle]) -> Self {
        self.depends_on = deps.to_vec();
        self
    }
}
