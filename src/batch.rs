//! The batch job graph.
//!
//! A [`Batch`] owns the stage nodes of one pipeline run. Registering a job
//! only builds the plan; nothing executes at construction time. Jobs come in
//! two realized forms: EXECUTED nodes carrying a real command and cluster,
//! and REUSED placeholders that preserve graph shape when the job's output
//! artifact already exists. Jobs are never mutated after creation except to
//! append dependency edges.

use crate::cluster::{ClusterHandle, ClusterSpec};
use crate::command::ScriptCommand;
use crate::errors::{CycleDetectedError, GraphValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Handle to a job registered within a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(usize);

impl JobHandle {
    /// Returns the job's index within its batch.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The realized form of a job.
#[derive(Debug, Clone)]
pub enum JobKind {
    /// Dispatched to a cluster with a real command.
    Executed {
        /// The stage invocation.
        command: ScriptCommand,
        /// The target cluster.
        cluster: ClusterHandle,
    },
    /// Placeholder for a job whose output artifact already exists; succeeds
    /// immediately and carries no command.
    Reused,
}

/// One stage node in the job graph.
#[derive(Debug, Clone)]
pub struct Job {
    name: String,
    kind: JobKind,
    deps: Vec<JobHandle>,
}

impl Job {
    /// Returns the job's base name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name shown in logs, with a `[reuse]` suffix on
    /// placeholders.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.kind {
            JobKind::Executed { .. } => self.name.clone(),
            JobKind::Reused => format!("{} [reuse]", self.name),
        }
    }

    /// Returns the realized form.
    #[must_use]
    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    /// Returns the command for executed jobs.
    #[must_use]
    pub fn command(&self) -> Option<&ScriptCommand> {
        match &self.kind {
            JobKind::Executed { command, .. } => Some(command),
            JobKind::Reused => None,
        }
    }

    /// Returns whether the job is a reuse placeholder.
    #[must_use]
    pub fn is_reused(&self) -> bool {
        matches!(self.kind, JobKind::Reused)
    }

    /// Returns the explicit dependency edges.
    #[must_use]
    pub fn deps(&self) -> &[JobHandle] {
        &self.deps
    }
}

/// Serializable summary of a constructed batch, for run reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// The batch name.
    pub name: String,
    /// When the batch was created.
    pub created_at: DateTime<Utc>,
    /// Total number of jobs.
    pub total: usize,
    /// Number of jobs that will be dispatched.
    pub executed: usize,
    /// Number of reuse placeholders.
    pub reused: usize,
    /// Number of provisioned clusters.
    pub clusters: usize,
}

/// A directed acyclic graph of jobs and the clusters they run on.
#[derive(Debug)]
pub struct Batch {
    name: String,
    created_at: DateTime<Utc>,
    jobs: Vec<Job>,
    clusters: Vec<ClusterSpec>,
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
            jobs: Vec::new(),
            clusters: Vec::new(),
        }
    }

    /// Returns the batch name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Provisions a distinct cluster.
    ///
    /// Clusters are never deduplicated by name; two calls with the same name
    /// yield two independent instances, allowing parallel pipeline branches.
    pub fn get_cluster(
        &mut self,
        name: impl Into<String>,
        scatter_count: usize,
        is_test: bool,
        depends_on: &[JobHandle],
        long: bool,
    ) -> ClusterHandle {
        let mut spec =
            ClusterSpec::new(name, scatter_count, is_test).with_depends_on(depends_on);
        if long {
            spec = spec.long_lived();
        }
        info!(cluster = %spec.name, long, "provisioning cluster");
        self.clusters.push(spec);
        ClusterHandle(self.clusters.len() - 1)
    }

    /// Registers an executed job on a cluster.
    pub fn add_job(
        &mut self,
        cluster: ClusterHandle,
        command: ScriptCommand,
        name: impl Into<String>,
    ) -> JobHandle {
        let name = name.into();
        info!(job = %name, command = %command, "adding job");
        self.push(Job {
            name,
            kind: JobKind::Executed { command, cluster },
            deps: Vec::new(),
        })
    }

    /// Registers a reuse placeholder.
    pub fn new_job(&mut self, name: impl Into<String>) -> JobHandle {
        let name = name.into();
        info!(job = %name, "adding job [reuse]");
        self.push(Job {
            name,
            kind: JobKind::Reused,
            deps: Vec::new(),
        })
    }

    fn push(&mut self, job: Job) -> JobHandle {
        self.jobs.push(job);
        JobHandle(self.jobs.len() - 1)
    }

    /// Appends dependency edges to a job, skipping duplicates and self-edges.
    pub fn depends_on(&mut self, job: JobHandle, upstream: &[JobHandle]) {
        for &up in upstream {
            if up == job {
                continue;
            }
            let deps = &mut self.jobs[job.0].deps;
            if !deps.contains(&up) {
                deps.push(up);
            }
        }
    }

    /// Returns a job by handle.
    #[must_use]
    pub fn job(&self, handle: JobHandle) -> &Job {
        &self.jobs[handle.0]
    }

    /// Returns a cluster by handle.
    #[must_use]
    pub fn cluster(&self, handle: ClusterHandle) -> &ClusterSpec {
        &self.clusters[handle.0]
    }

    /// Iterates over all jobs with their handles.
    pub fn jobs(&self) -> impl Iterator<Item = (JobHandle, &Job)> {
        self.jobs.iter().enumerate().map(|(i, j)| (JobHandle(i), j))
    }

    /// Returns the number of jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns whether the batch has no jobs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Returns the explicit dependency edges of a job.
    #[must_use]
    pub fn edges(&self, handle: JobHandle) -> &[JobHandle] {
        self.jobs[handle.0].deps()
    }

    /// Returns the effective dependencies used for scheduling: explicit
    /// edges plus the readiness gate of the job's cluster.
    #[must_use]
    pub fn effective_deps(&self, handle: JobHandle) -> Vec<JobHandle> {
        let job = &self.jobs[handle.0];
        let mut deps = job.deps.clone();
        if let JobKind::Executed { cluster, .. } = job.kind {
            for &gate in &self.clusters[cluster.0].depends_on {
                if gate != handle && !deps.contains(&gate) {
                    deps.push(gate);
                }
            }
        }
        deps
    }

    /// Finds the first job with the given base name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<JobHandle> {
        self.jobs
            .iter()
            .position(|j| j.name == name)
            .map(JobHandle)
    }

    /// Returns handles of all jobs whose base name starts with `prefix`.
    #[must_use]
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<JobHandle> {
        self.jobs
            .iter()
            .enumerate()
            .filter(|(_, j)| j.name.starts_with(prefix))
            .map(|(i, _)| JobHandle(i))
            .collect()
    }

    /// Validates the graph: every effective dependency must reference a job
    /// in this batch, and there must be no cycles.
    pub fn validate(&self) -> Result<(), GraphValidationError> {
        for i in 0..self.jobs.len() {
            if let Some(bad) = self
                .effective_deps(JobHandle(i))
                .iter()
                .find(|d| d.0 >= self.jobs.len())
            {
                return Err(GraphValidationError::new(format!(
                    "job '{}' depends on a handle from another batch (index {})",
                    self.jobs[i].name, bad.0
                ))
                .with_jobs(vec![self.jobs[i].name.clone()]));
            }
        }
        self.detect_cycles()?;
        Ok(())
    }

    /// Produces a wave plan: each wave's jobs have all effective
    /// dependencies satisfied by earlier waves and may start concurrently.
    pub fn plan(&self) -> Result<Vec<Vec<JobHandle>>, GraphValidationError> {
        self.validate()?;

        let mut waves = Vec::new();
        let mut done: HashSet<usize> = HashSet::new();
        while done.len() < self.jobs.len() {
            let wave: Vec<JobHandle> = (0..self.jobs.len())
                .filter(|i| !done.contains(i))
                .map(JobHandle)
                .filter(|&h| {
                    self.effective_deps(h)
                        .iter()
                        .all(|d| done.contains(&d.0))
                })
                .collect();
            if wave.is_empty() {
                let stuck: Vec<String> = (0..self.jobs.len())
                    .filter(|i| !done.contains(i))
                    .map(|i| self.jobs[i].name.clone())
                    .collect();
                return Err(GraphValidationError::new("job graph is deadlocked")
                    .with_jobs(stuck));
            }
            for h in &wave {
                done.insert(h.0);
            }
            waves.push(wave);
        }
        Ok(waves)
    }

    /// Returns a serializable summary of the batch.
    #[must_use]
    pub fn summary(&self) -> BatchSummary {
        let reused = self.jobs.iter().filter(|j| j.is_reused()).count();
        BatchSummary {
            name: self.name.clone(),
            created_at: self.created_at,
            total: self.jobs.len(),
            executed: self.jobs.len() - reused,
            reused,
            clusters: self.clusters.len(),
        }
    }

    fn detect_cycles(&self) -> Result<(), CycleDetectedError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for i in 0..self.jobs.len() {
            if !visited.contains(&i) {
                if let Some(cycle) =
                    self.dfs_cycle(i, &mut visited, &mut rec_stack, &mut path)
                {
                    return Err(CycleDetectedError::new(cycle));
                }
            }
        }
        Ok(())
    }

    fn dfs_cycle(
        &self,
        node: usize,
        visited: &mut HashSet<usize>,
        rec_stack: &mut HashSet<usize>,
        path: &mut Vec<usize>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(node);

        for dep in self.effective_deps(JobHandle(node)) {
            if !visited.contains(&dep.0) {
                if let Some(cycle) = self.dfs_cycle(dep.0, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(&dep.0) {
                let start = path.iter().position(|&n| n == dep.0).unwrap_or(0);
                let mut cycle: Vec<String> =
                    path[start..].iter().map(|&n| self.jobs[n].name.clone()).collect();
                cycle.push(self.jobs[dep.0].name.clone());
                return Some(cycle);
            }
        }

        path.pop();
        rec_stack.remove(&node);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cmd(script: &str) -> ScriptCommand {
        ScriptCommand::new(script)
    }

    fn diamond() -> (Batch, [JobHandle; 4]) {
        let mut b = Batch::new("test");
        let cluster = b.get_cluster("c", 10, true, &[], false);
        let a = b.add_job(cluster, cmd("a.py"), "a");
        let left = b.add_job(cluster, cmd("l.py"), "left");
        let right = b.add_job(cluster, cmd("r.py"), "right");
        let tail = b.add_job(cluster, cmd("t.py"), "tail");
        b.depends_on(left, &[a]);
        b.depends_on(right, &[a]);
        b.depends_on(tail, &[left, right]);
        (b, [a, left, right, tail])
    }

    #[test]
    fn test_diamond_plan_waves() {
        let (b, [a, left, right, tail]) = diamond();
        let waves = b.plan().unwrap();

        assert_eq!(waves.len(), 3);
        assert_eq!(waves[0], vec![a]);
        assert_eq!(waves[1], vec![left, right]);
        assert_eq!(waves[2], vec![tail]);
    }

    #[test]
    fn test_cycle_detected() {
        let (mut b, [a, _, _, tail]) = diamond();
        b.depends_on(a, &[tail]);

        let err = b.validate().unwrap_err();
        assert!(err.message.contains("cycle"));
    }

    #[test]
    fn test_duplicate_and_self_edges_skipped() {
        let (mut b, [a, left, ..]) = diamond();
        b.depends_on(left, &[a, a, left]);

        assert_eq!(b.edges(left), &[a]);
    }

    #[test]
    fn test_cluster_gate_in_effective_deps_only() {
        let mut b = Batch::new("test");
        let c1 = b.get_cluster("c1", 10, true, &[], false);
        let seed = b.add_job(c1, cmd("seed.py"), "seed");
        let gated = b.get_cluster("gated", 10, true, &[seed], true);
        let j = b.add_job(gated, cmd("j.py"), "j");

        assert!(b.edges(j).is_empty());
        assert_eq!(b.effective_deps(j), vec![seed]);
    }

    #[test]
    fn test_foreign_handle_rejected() {
        let (mut b, [a, ..]) = diamond();
        b.depends_on(a, &[JobHandle(99)]);

        let err = b.validate().unwrap_err();
        assert!(err.message.contains("another batch"));
        assert_eq!(err.jobs, vec!["a"]);
    }

    #[test]
    fn test_reused_placeholder_has_no_command() {
        let mut b = Batch::new("test");
        let j = b.new_job("Var QC: generate info");
        let job = b.job(j);

        assert!(job.is_reused());
        assert!(job.command().is_none());
        assert_eq!(job.display_name(), "Var QC: generate info [reuse]");
    }

    #[test]
    fn test_clusters_not_deduplicated_by_name() {
        let mut b = Batch::new("test");
        let c1 = b.get_cluster("VarQC", 10, true, &[], false);
        let c2 = b.get_cluster("VarQC", 10, true, &[], false);

        assert_ne!(c1, c2);
        assert_eq!(b.cluster(c1).name, b.cluster(c2).name);
    }

    #[test]
    fn test_summary_counts() {
        let (mut b, _) = diamond();
        b.new_job("skipped");
        let summary = b.summary();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.executed, 4);
        assert_eq!(summary.reused, 1);
        assert_eq!(summary.clusters, 1);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"reused\":1"));
    }
}
