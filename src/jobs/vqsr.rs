//! AS-VQSR recalibration sub-pipeline.
//!
//! Exports a sites-only VCF from the combined dataset, trains the SNP and
//! indel recalibration models in parallel, and applies them to produce the
//! recalibrated VCF consumed by the evaluation sub-graph. The whole chain is
//! skipped by the caller when that final VCF already exists.

use crate::artifact::{can_reuse, ArtifactStore};
use crate::batch::{Batch, JobHandle};
use crate::command::ScriptCommand;
use crate::config::VariantQcConfig;
use crate::errors::PipelineError;
use crate::utils::bucket_join;

/// Adds the AS-VQSR jobs to a batch.
///
/// Returns the handle of the terminal job producing `output_vcf_path`.
pub fn add_vqsr_jobs(
    b: &mut Batch,
    store: &dyn ArtifactStore,
    config: &VariantQcConfig,
    work_bucket: &str,
    web_bucket: &str,
    output_vcf_path: &str,
    depends_on: &[JobHandle],
) -> Result<JobHandle, PipelineError> {
    let overwrite = config.overwrite;
    let cluster = b.get_cluster(
        "VQSR",
        config.scatter_count,
        config.is_test,
        depends_on,
        false,
    );

    let job_name = "AS-VQSR: MT to sites VCF";
    let sites_vcf_path = bucket_join(work_bucket, "input-sites.vcf.gz");
    let sites_job = if can_reuse(store, &[&sites_vcf_path], overwrite) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("mt_to_vcf.py"))
            .flag("--overwrite")
            .arg("--mt", &config.raw_combined_mt_path)
            .arg("--hard-filtered-samples-ht", &config.hard_filter_ht_path)
            .arg("--meta-ht", &config.meta_ht_path)
            .arg("--bucket", work_bucket)
            .arg("--out-vcf", &sites_vcf_path);
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, depends_on);
        j
    };

    let job_name = "AS-VQSR: SNP recalibrator";
    let snp_recalibration_path = bucket_join(work_bucket, "snp.recal");
    let snp_tranches_path = bucket_join(work_bucket, "snp.tranches");
    let snp_job = if can_reuse(
        store,
        &[&snp_recalibration_path, &snp_tranches_path],
        overwrite,
    ) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("snps_variant_recalibrator.py"))
            .arg("--sites-vcf", &sites_vcf_path)
            .arg("--out-recalibration", &snp_recalibration_path)
            .arg("--out-tranches", &snp_tranches_path)
            .arg("--sample-count", config.sample_count.to_string())
            .arg("--scatter-count", config.scatter_count.to_string())
            .arg("--web-bucket", web_bucket);
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, &[sites_job]);
        j
    };

    let job_name = "AS-VQSR: indel recalibrator";
    let indel_recalibration_path = bucket_join(work_bucket, "indel.recal");
    let indel_tranches_path = bucket_join(work_bucket, "indel.tranches");
    let indel_job = if can_reuse(
        store,
        &[&indel_recalibration_path, &indel_tranches_path],
        overwrite,
    ) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("indels_variant_recalibrator.py"))
            .arg("--sites-vcf", &sites_vcf_path)
            .arg("--out-recalibration", &indel_recalibration_path)
            .arg("--out-tranches", &indel_tranches_path)
            .arg("--sample-count", config.sample_count.to_string())
            .arg("--web-bucket", web_bucket);
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, &[sites_job]);
        j
    };

    let job_name = "AS-VQSR: apply recalibration";
    let apply_job = if can_reuse(store, &[output_vcf_path], overwrite) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("apply_recalibration.py"))
            .arg("--sites-vcf", &sites_vcf_path)
            .arg("--snp-recalibration", &snp_recalibration_path)
            .arg("--snp-tranches", &snp_tranches_path)
            .arg(
                "--snp-filter-level",
                config.vqsr_params.snp_filter_level.to_string(),
            )
            .arg("--indel-recalibration", &indel_recalibration_path)
            .arg("--indel-tranches", &indel_tranches_path)
            .arg(
                "--indel-filter-level",
                config.vqsr_params.indel_filter_level.to_string(),
            )
            .arg("--out-vcf", output_vcf_path);
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, &[snp_job, indel_job]);
        j
    };

    Ok(apply_job)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::MemoryArtifactStore;
    use crate::config::FilterCutoffs;

    fn config() -> VariantQcConfig {
        VariantQcConfig::new(
            "test-project",
            "gs://b/work",
            "gs://b/raw.mt",
            "gs://b/filtered.mt",
            "gs://b/release/chr{CHROM}.vcf.bgz",
            100,
            FilterCutoffs::bins(90, 80),
        )
    }

    #[test]
    fn test_recalibrators_run_in_parallel_after_sites_export() {
        let mut b = Batch::new("test");
        let store = MemoryArtifactStore::new();
        let terminal = add_vqsr_jobs(
            &mut b,
            &store,
            &config(),
            "gs://b/work/vqsr",
            "gs://b/work/web/vqsr",
            "gs://b/work/vqsr/output.vcf.gz",
            &[],
        )
        .unwrap();

        let sites = b.find_by_name("AS-VQSR: MT to sites VCF").unwrap();
        let snp = b.find_by_name("AS-VQSR: SNP recalibrator").unwrap();
        let indel = b.find_by_name("AS-VQSR: indel recalibrator").unwrap();

        assert_eq!(b.edges(snp), &[sites]);
        assert_eq!(b.edges(indel), &[sites]);
        assert_eq!(b.edges(terminal), &[snp, indel]);
    }

    #[test]
    fn test_apply_carries_filter_levels() {
        let mut b = Batch::new("test");
        let store = MemoryArtifactStore::new();
        let terminal = add_vqsr_jobs(
            &mut b,
            &store,
            &config(),
            "gs://b/work/vqsr",
            "gs://b/work/web/vqsr",
            "gs://b/work/vqsr/output.vcf.gz",
            &[],
        )
        .unwrap();

        let cmd = b.job(terminal).command().unwrap();
        assert_eq!(cmd.value_of("--snp-filter-level"), Some("99.7"));
        assert_eq!(cmd.value_of("--indel-filter-level"), Some("99"));
        assert_eq!(
            cmd.value_of("--out-vcf"),
            Some("gs://b/work/vqsr/output.vcf.gz")
        );
    }

    #[test]
    fn test_intermediate_artifacts_reused() {
        let mut b = Batch::new("test");
        let store = MemoryArtifactStore::new();
        store.add_all([
            "gs://b/work/vqsr/input-sites.vcf.gz",
            "gs://b/work/vqsr/snp.recal",
            "gs://b/work/vqsr/snp.tranches",
        ]);
        add_vqsr_jobs(
            &mut b,
            &store,
            &config(),
            "gs://b/work/vqsr",
            "gs://b/work/web/vqsr",
            "gs://b/work/vqsr/output.vcf.gz",
            &[],
        )
        .unwrap();

        let sites = b.find_by_name("AS-VQSR: MT to sites VCF").unwrap();
        let snp = b.find_by_name("AS-VQSR: SNP recalibrator").unwrap();
        let indel = b.find_by_name("AS-VQSR: indel recalibrator").unwrap();

        assert!(b.job(sites).is_reused());
        assert!(b.job(snp).is_reused());
        assert!(!b.job(indel).is_reused());
    }
}
