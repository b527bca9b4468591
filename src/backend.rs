//! Batch submission seam.
//!
//! Graph construction is synchronous and single-threaded; actual stage
//! execution belongs to an external batch runtime. This module defines the
//! async handoff point and a dry-run backend that validates and walks the
//! plan without dispatching anything, useful for tests and `--dry-run`
//! invocations.

use crate::batch::Batch;
use crate::errors::PipelineError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Result of handing a batch to a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReport {
    /// The batch name.
    pub batch_name: String,
    /// Number of dependency waves in the plan.
    pub waves: usize,
    /// Jobs dispatched for execution.
    pub executed: usize,
    /// Reuse placeholders skipped.
    pub reused: usize,
    /// When the submission was accepted.
    pub submitted_at: DateTime<Utc>,
}

/// A batch execution runtime accepting a constructed job graph.
///
/// The backend owns scheduling, dependency waits, failure propagation and
/// retries; this crate's only responsibility ends at handing over a valid
/// plan.
#[async_trait]
pub trait BatchBackend: Send + Sync {
    /// Submits the batch for execution.
    async fn submit(&self, batch: &Batch) -> Result<SubmissionReport, PipelineError>;
}

/// Backend that validates the graph and logs the plan without executing it.
#[derive(Debug, Clone, Default)]
pub struct DryRunBackend;

impl DryRunBackend {
    /// Creates a new dry-run backend.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn dispatch(name: String, command: Option<String>) {
        match command {
            Some(cmd) => debug!(job = %name, command = %cmd, "dry-run dispatch"),
            None => debug!(job = %name, "dry-run skip (artifact reused)"),
        }
    }
}

#[async_trait]
impl BatchBackend for DryRunBackend {
    async fn submit(&self, batch: &Batch) -> Result<SubmissionReport, PipelineError> {
        let plan = batch.plan()?;

        for (i, wave) in plan.iter().enumerate() {
            debug!(wave = i, jobs = wave.len(), "dry-run wave");
            let mut dispatches = FuturesUnordered::new();
            for &handle in wave {
                let job = batch.job(handle);
                dispatches.push(Self::dispatch(
                    job.display_name(),
                    job.command().map(ToString::to_string),
                ));
            }
            while dispatches.next().await.is_some() {}
        }

        let summary = batch.summary();
        info!(
            batch = %summary.name,
            total = summary.total,
            executed = summary.executed,
            reused = summary.reused,
            "dry-run submission complete"
        );

        Ok(SubmissionReport {
            batch_name: summary.name,
            waves: plan.len(),
            executed: summary.executed,
            reused: summary.reused,
            submitted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ScriptCommand;

    #[tokio::test]
    async fn test_dry_run_counts_and_waves() {
        let mut b = Batch::new("test");
        let cluster = b.get_cluster("c", 10, true, &[], false);
        let a = b.add_job(cluster, ScriptCommand::new("a.py"), "a");
        let tail = b.add_job(cluster, ScriptCommand::new("b.py"), "b");
        b.depends_on(tail, &[a]);
        b.new_job("c");

        let report = DryRunBackend::new().submit(&b).await.unwrap();

        assert_eq!(report.waves, 2);
        assert_eq!(report.executed, 2);
        assert_eq!(report.reused, 1);
    }

    #[tokio::test]
    async fn test_dry_run_rejects_cycles() {
        let mut b = Batch::new("test");
        let cluster = b.get_cluster("c", 10, true, &[], false);
        let a = b.add_job(cluster, ScriptCommand::new("a.py"), "a");
        let z = b.add_job(cluster, ScriptCommand::new("z.py"), "z");
        b.depends_on(a, &[z]);
        b.depends_on(z, &[a]);

        let err = DryRunBackend::new().submit(&b).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
