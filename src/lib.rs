//! # joint-calling
//!
//! Job-graph orchestration for a genomic joint-calling and variant
//! quality-control pipeline.
//!
//! The crate builds a directed acyclic graph of pipeline stages — GVCF
//! combination outputs feeding annotation generation, variant filtering
//! (random forest or AS-VQSR) and per-chromosome VCF export — and hands the
//! plan to a batch execution backend. It provides:
//!
//! - **Reuse semantics**: a stage is skipped when its output artifact
//!   already exists, making whole-pipeline re-runs idempotent and resumable
//! - **Cluster pooling**: stages are dispatched onto named compute clusters,
//!   some long-lived to host nested sub-pipelines
//! - **Structured commands**: stage invocations are built from typed
//!   flag/value pairs, never string interpolation
//! - **Strategy selection**: random-forest and AS-VQSR filtering converge on
//!   a common final-filter artifact so downstream stages stay agnostic
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use joint_calling::prelude::*;
//!
//! let mut batch = Batch::new("joint-calling");
//! let store = LocalArtifactStore::new();
//! let config = VariantQcConfig::new(
//!     "my-project",
//!     "gs://bucket/work",
//!     "gs://bucket/raw.mt",
//!     "gs://bucket/filtered.mt",
//!     "gs://bucket/release/chr{CHROM}.vcf.bgz",
//!     1234,
//!     FilterCutoffs::bins(90, 80),
//! );
//!
//! let export_jobs = add_variant_qc_jobs(&mut batch, &store, &config, &[])?;
//! DryRunBackend::new().submit(&batch).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifact;
pub mod backend;
pub mod batch;
pub mod cluster;
pub mod command;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod observability;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::artifact::{
        can_reuse, file_exists, ArtifactKind, ArtifactStore, LocalArtifactStore,
        MemoryArtifactStore,
    };
    pub use crate::backend::{BatchBackend, DryRunBackend, SubmissionReport};
    pub use crate::batch::{Batch, BatchSummary, Job, JobHandle, JobKind};
    pub use crate::cluster::{ClusterHandle, ClusterSpec};
    pub use crate::command::ScriptCommand;
    pub use crate::config::{
        FilterCutoff, FilterCutoffs, FilterModel, RfFeatureSet, VariantClass, VariantQcConfig,
        VqsrParams,
    };
    pub use crate::errors::{ConfigError, CycleDetectedError, GraphValidationError, PipelineError};
    pub use crate::jobs::{add_variant_qc_jobs, add_vqsr_jobs, RfEvalInputs, VqsrEvalInputs};
    pub use crate::utils::{bucket_join, vcf_path_for_chrom, CHROMOSOMES};
}
