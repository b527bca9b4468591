//! Variant-QC job graph.
//!
//! Builds the stage machine for variant quality control: three independent
//! first-round stages (`info`, annotations, frequencies) on parallel
//! clusters, a joining RF-annotations stage, a static branch between the
//! random-forest and AS-VQSR filtering strategies converging on a common
//! final-filter table, the finalized dataset, and a per-chromosome VCF
//! export fan-out. Branch selection is fixed per run; there is no runtime
//! fallback from one strategy to the other.

use crate::artifact::{can_reuse, file_exists, ArtifactStore};
use crate::batch::{Batch, JobHandle};
use crate::cluster::ClusterHandle;
use crate::command::ScriptCommand;
use crate::config::{FilterModel, VariantClass, VariantQcConfig};
use crate::errors::PipelineError;
use crate::jobs::vqsr::add_vqsr_jobs;
use crate::utils::{bucket_join, rf_model_id, vcf_path_for_chrom, CHROMOSOMES};

/// Upstream artifact paths consumed by the RF evaluation sub-graph.
#[derive(Debug, Clone)]
pub struct RfEvalInputs {
    /// Raw combined matrix table.
    pub combined_mt_path: String,
    /// Info table with split multiallelics.
    pub info_split_ht_path: String,
    /// Per-variant RF scores.
    pub rf_result_ht_path: String,
    /// RF training annotations.
    pub rf_annotations_ht_path: String,
    /// Optional family-stats table.
    pub fam_stats_ht_path: Option<String>,
    /// Frequency table.
    pub freq_ht_path: String,
    /// Identifier of the trained model.
    pub rf_model_id: String,
    /// Working bucket for the sub-graph's artifacts.
    pub work_bucket: String,
}

/// Upstream artifact paths consumed by the AS-VQSR evaluation sub-graph.
#[derive(Debug, Clone)]
pub struct VqsrEvalInputs {
    /// Raw combined matrix table.
    pub combined_mt_path: String,
    /// RF training annotations (reused for evaluation binning).
    pub rf_annotations_ht_path: String,
    /// Info table with split multiallelics.
    pub info_split_ht_path: String,
    /// The recalibrated, gathered sites VCF.
    pub final_gathered_vcf_path: String,
    /// Optional family-stats table.
    pub fam_stats_ht_path: Option<String>,
    /// Frequency table.
    pub freq_ht_path: String,
    /// Working bucket for the sub-graph's artifacts.
    pub work_bucket: String,
}

/// Adds the variant-QC job graph to a batch.
///
/// Returns the per-chromosome export job handles. Stages whose output
/// artifacts already exist become reuse placeholders unless
/// `config.overwrite` forces re-execution.
pub fn add_variant_qc_jobs(
    b: &mut Batch,
    store: &dyn ArtifactStore,
    config: &VariantQcConfig,
    depends_on: &[JobHandle],
) -> Result<Vec<JobHandle>, PipelineError> {
    config.validate()?;

    for path in [
        &config.raw_combined_mt_path,
        &config.hard_filter_ht_path,
        &config.meta_ht_path,
    ] {
        if !file_exists(store, path) {
            return Err(PipelineError::MissingPrerequisite {
                artifact: path.clone(),
                stage: "variant QC".to_string(),
            });
        }
    }

    let work_bucket = &config.work_bucket;
    let rf_bucket = bucket_join(work_bucket, "rf");
    let vqsr_bucket = bucket_join(work_bucket, "vqsr");
    let overwrite = config.overwrite;

    // Three clusters working in parallel; the last one is long-lived to
    // host further submissions.
    let cluster1 = b.get_cluster("VarQC 1", config.scatter_count, config.is_test, depends_on, false);
    let cluster2 = b.get_cluster("VarQC 2", config.scatter_count, config.is_test, depends_on, false);
    let cluster3 = b.get_cluster("VarQC 3", config.scatter_count, config.is_test, depends_on, true);

    let fam_stats_ht_path = config
        .ped_file
        .as_ref()
        .map(|_| bucket_join(work_bucket, "fam-stats.ht"));
    let allele_data_ht_path = bucket_join(work_bucket, "allele-data.ht");
    let qc_ac_ht_path = bucket_join(work_bucket, "qc-ac.ht");

    let job_name = "Var QC: generate info";
    let info_ht_path = bucket_join(work_bucket, "info.ht");
    let info_split_ht_path = bucket_join(work_bucket, "info-split.ht");
    let info_job = if can_reuse(store, &[&info_ht_path, &info_split_ht_path], overwrite) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("generate_info_ht.py"))
            .flag("--overwrite")
            .arg("--mt", &config.raw_combined_mt_path)
            .arg("--out-info-ht", &info_ht_path)
            .arg("--out-split-info-ht", &info_split_ht_path);
        b.add_job(cluster1, cmd, job_name)
    };
    b.depends_on(info_job, depends_on);

    let job_name = "Var QC: generate annotations";
    let mut anno_outputs: Vec<&str> = vec![&allele_data_ht_path, &qc_ac_ht_path];
    if let Some(fam_stats) = &fam_stats_ht_path {
        anno_outputs.push(fam_stats);
    }
    let var_qc_anno_job = if can_reuse(store, &anno_outputs, overwrite) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("generate_variant_qc_annotations.py"))
            .flag_if(overwrite, "--overwrite")
            .arg("--mt", &config.raw_combined_mt_path)
            .arg("--hard-filtered-samples-ht", &config.hard_filter_ht_path)
            .arg("--meta-ht", &config.meta_ht_path)
            .arg("--out-allele-data-ht", &allele_data_ht_path)
            .arg("--out-qc-ac-ht", &qc_ac_ht_path)
            .arg_opt("--out-fam-stats-ht", fam_stats_ht_path.as_deref())
            .arg_opt("--fam-file", config.ped_file.as_deref())
            .arg("--bucket", work_bucket)
            .arg("--n-partitions", (config.scatter_count * 25).to_string());
        let j = b.add_job(cluster2, cmd, job_name);
        b.depends_on(j, depends_on);
        j
    };

    let job_name = "Var QC: generate frequencies";
    let freq_ht_path = bucket_join(work_bucket, "frequencies.ht");
    let freq_job = if can_reuse(store, &[&freq_ht_path], overwrite) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("generate_freq_data.py"))
            .flag("--overwrite")
            .arg("--mt", &config.raw_combined_mt_path)
            .arg("--hard-filtered-samples-ht", &config.hard_filter_ht_path)
            .arg("--meta-ht", &config.meta_ht_path)
            .arg("--out-ht", &freq_ht_path)
            .arg("--bucket", work_bucket);
        let j = b.add_job(cluster3, cmd, job_name);
        b.depends_on(j, depends_on);
        j
    };

    let job_name = "Var QC: create RF annotations";
    let rf_annotations_ht_path = bucket_join(work_bucket, "rf-annotations.ht");
    let rf_anno_job = if can_reuse(store, &[&rf_annotations_ht_path], overwrite) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("create_rf_annotations.py"))
            .flag("--overwrite")
            .arg("--info-split-ht", &info_split_ht_path)
            .arg("--freq-ht", &freq_ht_path)
            .arg_opt("--fam-stats-ht", fam_stats_ht_path.as_deref())
            .arg("--allele-data-ht", &allele_data_ht_path)
            .arg("--qc-ac-ht", &qc_ac_ht_path)
            .arg("--bucket", work_bucket)
            .flag("--use-adj-genotypes")
            .arg("--features", config.rf_features.as_flag_value())
            .arg("--out-ht", &rf_annotations_ht_path)
            .arg("--n-partitions", (config.scatter_count * 25).to_string());
        let j = b.add_job(cluster3, cmd, job_name);
        b.depends_on(j, &[freq_job, var_qc_anno_job, info_job]);
        j
    };

    let (eval_job, final_filter_ht_path, cluster) = match config.filter_model {
        FilterModel::RandomForest => {
            let cluster = b.get_cluster(
                "RF",
                config.scatter_count,
                config.is_test,
                &[rf_anno_job],
                true,
            );

            let job_name = "Random forest";
            let rf_result_ht_path = bucket_join(work_bucket, "rf-result.ht");
            let model_id = rf_model_id();
            let rf_job = if can_reuse(store, &[&rf_result_ht_path], overwrite) {
                b.new_job(job_name)
            } else {
                let cmd = ScriptCommand::new(config.script("random_forest.py"))
                    .flag("--overwrite")
                    .arg("--annotations-ht", &rf_annotations_ht_path)
                    .arg("--bucket", work_bucket)
                    .flag("--use-adj-genotypes")
                    .arg("--features", config.rf_features.as_flag_value())
                    .arg("--out-results-ht", &rf_result_ht_path)
                    .arg("--out-model-id", &model_id);
                let j = b.add_job(cluster, cmd, job_name);
                b.depends_on(j, &[rf_anno_job]);
                j
            };

            let inputs = RfEvalInputs {
                combined_mt_path: config.raw_combined_mt_path.clone(),
                info_split_ht_path: info_split_ht_path.clone(),
                rf_result_ht_path,
                rf_annotations_ht_path: rf_annotations_ht_path.clone(),
                fam_stats_ht_path: fam_stats_ht_path.clone(),
                freq_ht_path: freq_ht_path.clone(),
                rf_model_id: model_id,
                work_bucket: rf_bucket,
            };
            let (eval_job, final_filter_ht_path) = add_rf_eval_jobs(
                b,
                store,
                config,
                cluster,
                &inputs,
                &[rf_job, freq_job, rf_anno_job],
            )?;
            (eval_job, final_filter_ht_path, cluster)
        }

        FilterModel::Vqsr => {
            let vqsred_vcf_path = bucket_join(&vqsr_bucket, "output.vcf.gz");
            let vqsr_vcf_job = if can_reuse(store, &[&vqsred_vcf_path], overwrite) {
                b.new_job("AS-VQSR")
            } else {
                add_vqsr_jobs(
                    b,
                    store,
                    config,
                    &vqsr_bucket,
                    &bucket_join(&config.web_bucket, "vqsr"),
                    &vqsred_vcf_path,
                    depends_on,
                )?
            };

            let final_filter_ht_path = bucket_join(&vqsr_bucket, "final-filter.ht");
            let cluster = b.get_cluster(
                "VQSR eval",
                config.scatter_count,
                config.is_test,
                &[rf_anno_job, vqsr_vcf_job],
                true,
            );

            let inputs = VqsrEvalInputs {
                combined_mt_path: config.raw_combined_mt_path.clone(),
                rf_annotations_ht_path: rf_annotations_ht_path.clone(),
                info_split_ht_path: info_split_ht_path.clone(),
                final_gathered_vcf_path: vqsred_vcf_path,
                fam_stats_ht_path: fam_stats_ht_path.clone(),
                freq_ht_path: freq_ht_path.clone(),
                work_bucket: vqsr_bucket,
            };
            let eval_job = add_vqsr_eval_jobs(
                b,
                store,
                config,
                cluster,
                &inputs,
                vqsr_vcf_job,
                rf_anno_job,
                &final_filter_ht_path,
            )?;
            b.depends_on(eval_job, &[vqsr_vcf_job, rf_anno_job, info_job]);
            (eval_job, final_filter_ht_path, cluster)
        }
    };

    let job_name = "Making final MT";
    let final_mt_job = if can_reuse(store, &[&config.out_filtered_mt_path], overwrite) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("make_finalised_mt.py"))
            .flag("--overwrite")
            .arg("--mt", &config.raw_combined_mt_path)
            .arg("--final-filter-ht", &final_filter_ht_path)
            .arg("--freq-ht", &freq_ht_path)
            .arg("--info-ht", &info_split_ht_path)
            .arg("--out-mt", &config.out_filtered_mt_path)
            .arg("--meta-ht", &config.meta_ht_path);
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, &[eval_job]);
        j
    };

    let job_name = "Making final VCF: prepare HT";
    let export_ht_path = bucket_join(work_bucket, "export_vcf.ht");
    let export_vcf_header_path = bucket_join(work_bucket, "export_vcf_header.txt");
    let prepare_job = if can_reuse(store, &[&export_ht_path, &export_vcf_header_path], overwrite)
    {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("release_vcf_prepare_ht.py"))
            .arg("--mt", &config.out_filtered_mt_path)
            .arg("--out-ht", &export_ht_path)
            .arg("--out-vcf-header-txt", &export_vcf_header_path);
        b.add_job(cluster, cmd, job_name)
    };
    b.depends_on(prepare_job, &[final_mt_job]);

    let mut jobs = Vec::with_capacity(CHROMOSOMES.len());
    for chrom in CHROMOSOMES {
        let job_name = format!("Making final VCF: HT to VCF for chr{chrom}");
        let vcf_path = vcf_path_for_chrom(&config.out_vcf_pattern, chrom);
        let j = if can_reuse(store, &[&vcf_path], overwrite) {
            b.new_job(job_name)
        } else {
            let cmd = ScriptCommand::new(config.script("release_vcf_export_chrom.py"))
                .arg("--ht", &export_ht_path)
                .arg("--vcf-header-txt", &export_vcf_header_path)
                .arg("--out-vcf", &vcf_path)
                .arg("--name", &config.project_name)
                .arg("--chromosome", format!("chr{chrom}"));
            b.add_job(cluster, cmd, job_name)
        };
        b.depends_on(j, &[prepare_job]);
        jobs.push(j);
    }
    Ok(jobs)
}

/// Adds the jobs that evaluate the RF model and apply the final filters.
///
/// Returns the final-filter job handle and the path to the final filter
/// table.
pub fn add_rf_eval_jobs(
    b: &mut Batch,
    store: &dyn ArtifactStore,
    config: &VariantQcConfig,
    cluster: ClusterHandle,
    inputs: &RfEvalInputs,
    depends_on: &[JobHandle],
) -> Result<(JobHandle, String), PipelineError> {
    let overwrite = config.overwrite;

    let job_name = "RF: evaluation";
    let score_bin_ht_path = bucket_join(&inputs.work_bucket, "rf-score-bin.ht");
    let score_bin_agg_ht_path = bucket_join(&inputs.work_bucket, "rf-score-agg-bin.ht");
    let eval_job = if can_reuse(store, &[&score_bin_ht_path], overwrite) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("evaluation.py"))
            .flag("--overwrite")
            .arg("--mt", &inputs.combined_mt_path)
            .arg("--rf-annotations-ht", &inputs.rf_annotations_ht_path)
            .arg("--info-split-ht", &inputs.info_split_ht_path)
            .arg_opt("--fam-stats-ht", inputs.fam_stats_ht_path.as_deref())
            .arg("--rf-results-ht", &inputs.rf_result_ht_path)
            .arg("--bucket", &inputs.work_bucket)
            .arg("--out-bin-ht", &score_bin_ht_path)
            .arg("--out-aggregated-bin-ht", &score_bin_agg_ht_path)
            .flag("--run-sanity-checks");
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, depends_on);
        j
    };

    let job_name = "RF: final filter";
    let final_filter_ht_path = bucket_join(&inputs.work_bucket, "final-filter.ht");
    let final_filter_job = if can_reuse(store, &[&final_filter_ht_path], overwrite) {
        b.new_job(job_name)
    } else {
        let model = FilterModel::RandomForest;
        let cmd = ScriptCommand::new(config.script("final_filter.py"))
            .flag("--overwrite")
            .arg("--out-final-filter-ht", &final_filter_ht_path)
            .arg("--model-id", &inputs.rf_model_id)
            .arg("--model-name", model.model_name())
            .arg("--score-name", model.score_name())
            .arg("--info-split-ht", &inputs.info_split_ht_path)
            .arg("--freq-ht", &inputs.freq_ht_path)
            .arg("--score-bin-ht", &score_bin_ht_path)
            .arg("--score-bin-agg-ht", &score_bin_agg_ht_path)
            .arg("--bucket", &inputs.work_bucket);
        let cmd = with_filter_cutoffs(cmd, config);
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, &[eval_job]);
        j
    };

    Ok((final_filter_job, final_filter_ht_path))
}

/// Adds the jobs that load the AS-VQSR output, evaluate it and apply the
/// final filters.
///
/// Returns the final-filter job handle; the final filter table is written
/// to `output_ht_path`.
#[allow(clippy::too_many_arguments)]
pub fn add_vqsr_eval_jobs(
    b: &mut Batch,
    store: &dyn ArtifactStore,
    config: &VariantQcConfig,
    cluster: ClusterHandle,
    inputs: &VqsrEvalInputs,
    vqsr_vcf_job: JobHandle,
    rf_anno_job: JobHandle,
    output_ht_path: &str,
) -> Result<JobHandle, PipelineError> {
    let overwrite = config.overwrite;

    let job_name = "AS-VQSR: load filters";
    let filters_split_ht_path = bucket_join(&inputs.work_bucket, "vqsr-filters-split.ht");
    let load_filters_job = if can_reuse(store, &[&filters_split_ht_path], overwrite) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("load_vqsr.py"))
            .flag("--overwrite")
            .flag("--split-multiallelic")
            .arg("--out-path", &filters_split_ht_path)
            .arg("--vqsr-vcf-path", &inputs.final_gathered_vcf_path)
            .arg("--bucket", &inputs.work_bucket);
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, &[vqsr_vcf_job]);
        j
    };

    let job_name = "AS-VQSR: evaluation";
    let score_bin_ht_path = bucket_join(&inputs.work_bucket, "vqsr-score-bin.ht");
    let score_bin_agg_ht_path = bucket_join(&inputs.work_bucket, "vqsr-score-agg-bin.ht");
    let eval_job = if can_reuse(
        store,
        &[&score_bin_ht_path, &score_bin_agg_ht_path],
        overwrite,
    ) {
        b.new_job(job_name)
    } else {
        let cmd = ScriptCommand::new(config.script("evaluation.py"))
            .flag("--overwrite")
            .arg("--mt", &inputs.combined_mt_path)
            .arg("--rf-annotations-ht", &inputs.rf_annotations_ht_path)
            .arg("--info-split-ht", &inputs.info_split_ht_path)
            .arg_opt("--fam-stats-ht", inputs.fam_stats_ht_path.as_deref())
            .arg("--vqsr-filters-split-ht", &filters_split_ht_path)
            .arg("--bucket", &inputs.work_bucket)
            .arg("--out-bin-ht", &score_bin_ht_path)
            .arg("--out-aggregated-bin-ht", &score_bin_agg_ht_path)
            .flag("--run-sanity-checks");
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, &[load_filters_job, rf_anno_job]);
        j
    };

    let job_name = "AS-VQSR: final filter";
    let final_filter_job = if can_reuse(store, &[output_ht_path], overwrite) {
        b.new_job(job_name)
    } else {
        let model = FilterModel::Vqsr;
        let cmd = ScriptCommand::new(config.script("final_filter.py"))
            .flag("--overwrite")
            .arg("--out-final-filter-ht", output_ht_path)
            .arg("--vqsr-filters-split-ht", &filters_split_ht_path)
            .arg("--model-id", "vqsr_model")
            .arg("--model-name", model.model_name())
            .arg("--score-name", model.score_name())
            .arg("--info-split-ht", &inputs.info_split_ht_path)
            .arg("--freq-ht", &inputs.freq_ht_path)
            .arg("--score-bin-ht", &score_bin_ht_path)
            .arg("--score-bin-agg-ht", &score_bin_agg_ht_path)
            .arg("--bucket", &inputs.work_bucket);
        let cmd = with_filter_cutoffs(cmd, config);
        let j = b.add_job(cluster, cmd, job_name);
        b.depends_on(j, &[eval_job]);
        j
    };

    Ok(final_filter_job)
}

/// Appends the per-class cutoff flags and the InbreedingCoeff hard filter.
fn with_filter_cutoffs(cmd: ScriptCommand, config: &VariantQcConfig) -> ScriptCommand {
    let (snp_flag, snp_value) = config.cutoffs.snp.flag(VariantClass::Snp);
    let (indel_flag, indel_value) = config.cutoffs.indel.flag(VariantClass::Indel);
    cmd.arg(snp_flag, snp_value)
        .arg(indel_flag, indel_value)
        .arg(
            "--inbreeding-coeff-threshold",
            config.inbreeding_coeff_cutoff.to_string(),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::MemoryArtifactStore;
    use crate::config::{FilterCutoff, FilterCutoffs};

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
        .with_scatter_count(20)
        .with_test_mode(true)
    }

    fn seeded_store() -> MemoryArtifactStore {
        let store = MemoryArtifactStore::new();
        store.add_all([
            "gs://b/raw.mt",
            "gs://b/work/hard-filters.ht",
            "gs://b/work/meta.ht",
        ]);
        store
    }

    #[test]
    fn test_missing_input_aborts_construction() {
        let mut b = Batch::new("test");
        let store = MemoryArtifactStore::new();

        let err = add_variant_qc_jobs(&mut b, &store, &config(), &[]).unwrap_err();
        assert!(matches!(err, PipelineError::MissingPrerequisite { .. }));
        assert!(b.is_empty());
    }

    #[test]
    fn test_invalid_vcf_pattern_rejected_before_any_job() {
        let mut b = Batch::new("test");
        let store = seeded_store();
        let mut cfg = config();
        cfg.out_vcf_pattern = "gs://b/release/all.vcf.bgz".to_string();

        let err = add_variant_qc_jobs(&mut b, &store, &cfg, &[]).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
        assert!(b.is_empty());
    }

    #[test]
    fn test_info_command_outputs_both_tables() {
        let mut b = Batch::new("test");
        let store = seeded_store();
        add_variant_qc_jobs(&mut b, &store, &config(), &[]).unwrap();

        let info = b.find_by_name("Var QC: generate info").unwrap();
        let cmd = b.job(info).command().unwrap();
        assert_eq!(cmd.value_of("--out-info-ht"), Some("gs://b/work/info.ht"));
        assert_eq!(
            cmd.value_of("--out-split-info-ht"),
            Some("gs://b/work/info-split.ht")
        );
        assert_eq!(cmd.value_of("--mt"), Some("gs://b/raw.mt"));
    }

    #[test]
    fn test_pedigree_enables_fam_stats_flags() {
        let mut b = Batch::new("test");
        let store = seeded_store();
        let cfg = config().with_ped_file("gs://b/pedigree.ped");
        add_variant_qc_jobs(&mut b, &store, &cfg, &[]).unwrap();

        let anno = b.find_by_name("Var QC: generate annotations").unwrap();
        let cmd = b.job(anno).command().unwrap();
        assert_eq!(
            cmd.value_of("--out-fam-stats-ht"),
            Some("gs://b/work/fam-stats.ht")
        );
        assert_eq!(cmd.value_of("--fam-file"), Some("gs://b/pedigree.ped"));

        let rf_anno = b.find_by_name("Var QC: create RF annotations").unwrap();
        let cmd = b.job(rf_anno).command().unwrap();
        assert_eq!(
            cmd.value_of("--fam-stats-ht"),
            Some("gs://b/work/fam-stats.ht")
        );
    }

    #[test]
    fn test_no_pedigree_omits_fam_stats_flags() {
        let mut b = Batch::new("test");
        let store = seeded_store();
        add_variant_qc_jobs(&mut b, &store, &config(), &[]).unwrap();

        let anno = b.find_by_name("Var QC: generate annotations").unwrap();
        let cmd = b.job(anno).command().unwrap();
        assert!(cmd.value_of("--out-fam-stats-ht").is_none());
        assert!(cmd.value_of("--fam-file").is_none());
    }

    #[test]
    fn test_rf_annotations_partition_count_scales_with_scatter() {
        let mut b = Batch::new("test");
        let store = seeded_store();
        add_variant_qc_jobs(&mut b, &store, &config(), &[]).unwrap();

        let rf_anno = b.find_by_name("Var QC: create RF annotations").unwrap();
        let cmd = b.job(rf_anno).command().unwrap();
        assert_eq!(cmd.value_of("--n-partitions"), Some("500"));
        assert!(cmd.has_flag("--use-adj-genotypes"));
        assert!(cmd
            .value_of("--features")
            .unwrap()
            .contains("InbreedingCoeff"));
    }

    #[test]
    fn test_final_filter_carries_cutoffs() {
        let mut b = Batch::new("test");
        let store = seeded_store();
        let mut cfg = config();
        cfg.cutoffs = FilterCutoffs {
            snp: FilterCutoff::Bin(90),
            indel: FilterCutoff::Score(-1.5),
        };
        add_variant_qc_jobs(&mut b, &store, &cfg, &[]).unwrap();

        let ff = b.find_by_name("AS-VQSR: final filter").unwrap();
        let cmd = b.job(ff).command().unwrap();
        assert_eq!(cmd.value_of("--snp-bin-cutoff"), Some("90"));
        assert_eq!(cmd.value_of("--indel-score-cutoff"), Some("-1.5"));
        assert_eq!(cmd.value_of("--inbreeding-coeff-threshold"), Some("-0.3"));
        assert_eq!(cmd.value_of("--model-name"), Some("VQSR"));
        assert_eq!(cmd.value_of("--score-name"), Some("AS_VQSLOD"));
    }

    #[test]
    fn test_rf_final_filter_uses_minted_model_id() {
        let mut b = Batch::new("test");
        let store = seeded_store();
        let cfg = config().with_filter_model(FilterModel::RandomForest);
        add_variant_qc_jobs(&mut b, &store, &cfg, &[]).unwrap();

        let rf = b.find_by_name("Random forest").unwrap();
        let ff = b.find_by_name("RF: final filter").unwrap();
        let trained = b.job(rf).command().unwrap().value_of("--out-model-id");
        let applied = b.job(ff).command().unwrap().value_of("--model-id");

        assert!(trained.unwrap().starts_with("rf_"));
        assert_eq!(trained, applied);
        assert_eq!(
            b.job(ff).command().unwrap().value_of("--model-name"),
            Some("RF")
        );
    }
}
