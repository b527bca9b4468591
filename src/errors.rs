//! Error types for pipeline graph construction.
//!
//! Configuration and missing-prerequisite errors are raised synchronously at
//! graph-construction time, before any stage is dispatched. Stage execution
//! failures belong to the batch backend and are not modelled here.

use thiserror::Error;

/// The main error type for graph-construction operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Mutually exclusive or jointly required parameters were violated.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// A required upstream artifact is absent at graph-construction time.
    #[error("missing prerequisite artifact '{artifact}' required by {stage}")]
    MissingPrerequisite {
        /// Path of the absent artifact.
        artifact: String,
        /// The stage or branch that required it.
        stage: String,
    },

    /// The constructed graph failed validation.
    #[error("{0}")]
    Validation(#[from] GraphValidationError),

    /// A cycle was detected in the job graph.
    #[error("{0}")]
    Cycle(#[from] CycleDetectedError),

    /// The batch backend rejected a submission.
    #[error("backend error: {0}")]
    Backend(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error raised when run-level parameters are inconsistent.
///
/// Reported before any stage of the affected sub-graph is registered; no
/// partial graph is submitted.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConfigError {
    /// The error message.
    pub message: String,
    /// The offending parameter names.
    pub parameters: Vec<String>,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            parameters: Vec::new(),
        }
    }

    /// Sets the parameters involved.
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.parameters = parameters.into_iter().map(Into::into).collect();
        self
    }
}

/// Error raised when the constructed job graph is malformed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct GraphValidationError {
    /// The error message.
    pub message: String,
    /// The jobs involved in the error.
    pub jobs: Vec<String>,
}

impl GraphValidationError {
    /// Creates a new graph validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            jobs: Vec::new(),
        }
    }

    /// Sets the jobs involved.
    #[must_use]
    pub fn with_jobs(mut self, jobs: Vec<String>) -> Self {
        self.jobs = jobs;
        self
    }
}

/// Error raised when a cycle is detected in the job graph.
#[derive(Debug, Clone, Error)]
#[error("cycle detected in job graph: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The job names forming the cycle.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

impl From<CycleDetectedError> for GraphValidationError {
    fn from(err: CycleDetectedError) -> Self {
        GraphValidationError {
            message: err.to_string(),
            jobs: err.cycle_path,
        }
    }
}
