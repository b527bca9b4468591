//! Job-graph construction for the pipeline's stages.
//!
//! Each function here wires stage nodes into a [`crate::batch::Batch`]
//! according to true data dependencies, consulting the artifact existence
//! oracle to decide which stages become reuse placeholders.

mod variant_qc;
mod vqsr;

pub use variant_qc::{
    add_rf_eval_jobs, add_variant_qc_jobs, add_vqsr_eval_jobs, RfEvalInputs, VqsrEvalInputs,
};
pub use vqsr::add_vqsr_jobs;
