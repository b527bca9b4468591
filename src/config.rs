//! Run-level configuration for the variant-QC job graph.
//!
//! Everything the graph builder branches on is decided here, once per run:
//! the filtering strategy, the per-class score/bin cutoffs, the optional
//! pedigree input, and the random-forest feature set. Values are immutable
//! after construction; the builder functions receive them by reference.

use crate::errors::ConfigError;
use crate::utils::bucket_join;
use serde::{Deserialize, Serialize};

/// InbreedingCoeff hard-filter threshold applied by the final filter.
pub const INBREEDING_COEFF_HARD_CUTOFF: f64 = -0.3;

/// Variant class a filtering cutoff applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantClass {
    /// Single-nucleotide variants.
    Snp,
    /// Insertions and deletions.
    Indel,
}

impl VariantClass {
    /// Flag-name fragment used in collaborator-script invocations.
    #[must_use]
    pub fn flag_name(self) -> &'static str {
        match self {
            Self::Snp => "snp",
            Self::Indel => "indel",
        }
    }
}

/// A filtering threshold for one variant class.
///
/// Exactly one of the two forms must be chosen per class: an absolute score
/// value, or a percentile-rank bin whose minimum score is looked up in the
/// aggregated-bin table produced by the evaluation stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterCutoff {
    /// Absolute score threshold (RF probability or AS_VQSLOD).
    Score(f64),
    /// Percentile-rank bin threshold, between 1 and 100.
    Bin(u32),
}

impl FilterCutoff {
    /// Resolves a cutoff from a pair of optional parameters.
    ///
    /// Supplying both, or neither, is a configuration error.
    pub fn resolve(
        class: VariantClass,
        score: Option<f64>,
        bin: Option<u32>,
    ) -> Result<Self, ConfigError> {
        let name = class.flag_name();
        match (score, bin) {
            (Some(_), Some(_)) => Err(ConfigError::new(format!(
                "{name}_bin_cutoff and {name}_score_cutoff are mutually exclusive, \
                 please only supply one {name} filtering cutoff"
            ))
            .with_parameters([format!("{name}_bin_cutoff"), format!("{name}_score_cutoff")])),
            (None, None) => Err(ConfigError::new(format!(
                "one (and only one) of {name}_bin_cutoff and {name}_score_cutoff \
                 must be supplied"
            ))
            .with_parameters([format!("{name}_bin_cutoff"), format!("{name}_score_cutoff")])),
            (Some(s), None) => Ok(Self::Score(s)),
            (None, Some(b)) => Ok(Self::Bin(b)),
        }
    }

    /// Returns the cutoff flag for this class, e.g. `--snp-bin-cutoff 90`.
    #[must_use]
    pub fn flag(self, class: VariantClass) -> (String, String) {
        let name = class.flag_name();
        match self {
            Self::Score(s) => (format!("--{name}-score-cutoff"), s.to_string()),
            Self::Bin(b) => (format!("--{name}-bin-cutoff"), b.to_string()),
        }
    }
}

/// The pair of per-class cutoffs applied by the final filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterCutoffs {
    /// Cutoff for SNVs.
    pub snp: FilterCutoff,
    /// Cutoff for indels.
    pub indel: FilterCutoff,
}

impl FilterCutoffs {
    /// Builds cutoffs from the four optional command-line-style parameters,
    /// validating mutual exclusion for each class.
    pub fn from_options(
        snp_score: Option<f64>,
        snp_bin: Option<u32>,
        indel_score: Option<f64>,
        indel_bin: Option<u32>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            snp: FilterCutoff::resolve(VariantClass::Snp, snp_score, snp_bin)?,
            indel: FilterCutoff::resolve(VariantClass::Indel, indel_score, indel_bin)?,
        })
    }

    /// Bin cutoffs for both classes.
    #[must_use]
    pub fn bins(snp: u32, indel: u32) -> Self {
        Self {
            snp: FilterCutoff::Bin(snp),
            indel: FilterCutoff::Bin(indel),
        }
    }

    /// Score cutoffs for both classes.
    #[must_use]
    pub fn scores(snp: f64, indel: f64) -> Self {
        Self {
            snp: FilterCutoff::Score(snp),
            indel: FilterCutoff::Score(indel),
        }
    }
}

/// The filtering strategy evaluated behind the final-filter contract.
///
/// Both variants converge on a final-filter table with the same schema:
/// a score column, bin annotations and filtering-model metadata globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterModel {
    /// Trained random-forest classifier.
    RandomForest,
    /// Allele-specific joint-genotyping quality-score recalibration.
    Vqsr,
}

impl FilterModel {
    /// Model name recorded in the final filter table's globals.
    #[must_use]
    pub fn model_name(self) -> &'static str {
        match self {
            Self::RandomForest => "RF",
            Self::Vqsr => "VQSR",
        }
    }

    /// Name used in place of `score` in the final filter table.
    #[must_use]
    pub fn score_name(self) -> &'static str {
        match self {
            Self::RandomForest => "RF",
            Self::Vqsr => "AS_VQSLOD",
        }
    }
}

/// Recalibration parameters for the AS-VQSR sub-pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VqsrParams {
    /// Truth-sensitivity filter level for SNVs.
    pub snp_filter_level: f64,
    /// Truth-sensitivity filter level for indels.
    pub indel_filter_level: f64,
}

impl Default for VqsrParams {
    fn default() -> Self {
        Self {
            snp_filter_level: 99.7,
            indel_filter_level: 99.0,
        }
    }
}

/// The feature set used to train and apply the random-forest model.
///
/// Constructed once per run as an explicit immutable value; extensions are
/// applied at construction time, never by mutating shared state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfFeatureSet {
    fields: Vec<String>,
}

impl RfFeatureSet {
    /// The standard training feature set.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            fields: [
                "allele_type",
                "AS_MQRankSum",
                "AS_pab_max",
                "AS_QD",
                "AS_ReadPosRankSum",
                "AS_SOR",
                "InbreedingCoeff",
                "n_alt_alleles",
                "variant_type",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }

    /// Extends the set with additional fields, skipping duplicates.
    #[must_use]
    pub fn with_extra(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for f in fields {
            let f = f.into();
            if !self.fields.contains(&f) {
                self.fields.push(f);
            }
        }
        self
    }

    /// Returns the fields in order.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Renders the set as a comma-separated flag value.
    #[must_use]
    pub fn as_flag_value(&self) -> String {
        self.fields.join(",")
    }
}

impl Default for RfFeatureSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Run-level parameters accepted by the variant-QC graph builder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantQcConfig {
    /// Dataset/project name, recorded in exported VCF headers.
    pub project_name: String,
    /// Directory holding the collaborator scripts.
    pub scripts_dir: String,
    /// Working-storage root for intermediate artifacts.
    pub work_bucket: String,
    /// Bucket root for web reports.
    pub web_bucket: String,
    /// Path to the raw combined matrix table.
    pub raw_combined_mt_path: String,
    /// Path to the hard-filtered-samples table.
    pub hard_filter_ht_path: String,
    /// Path to the sample metadata table.
    pub meta_ht_path: String,
    /// Output path for the finalized, filtered matrix table.
    pub out_filtered_mt_path: String,
    /// Output VCF path pattern with a `{CHROM}` placeholder.
    pub out_vcf_pattern: String,
    /// Number of samples in the combined dataset.
    pub sample_count: usize,
    /// Optional pedigree file; enables family-stats annotations.
    pub ped_file: Option<String>,
    /// Forces re-execution of every stage when set.
    pub overwrite: bool,
    /// AS-VQSR recalibration parameters.
    pub vqsr_params: VqsrParams,
    /// Worker scatter/parallelism count for clusters.
    pub scatter_count: usize,
    /// Provisions test-sized clusters when set.
    pub is_test: bool,
    /// The filtering strategy for this run; static, never adapted at run time.
    pub filter_model: FilterModel,
    /// Per-class final-filter cutoffs.
    pub cutoffs: FilterCutoffs,
    /// InbreedingCoeff hard-filter threshold.
    pub inbreeding_coeff_cutoff: f64,
    /// Random-forest feature set.
    pub rf_features: RfFeatureSet,
}

impl VariantQcConfig {
    /// Creates a configuration with defaults derived from the work bucket.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        project_name: impl Into<String>,
        work_bucket: impl Into<String>,
        raw_combined_mt_path: impl Into<String>,
        out_filtered_mt_path: impl Into<String>,
        out_vcf_pattern: impl Into<String>,
        sample_count: usize,
        cutoffs: FilterCutoffs,
    ) -> Self {
        let work_bucket = work_bucket.into();
        Self {
            project_name: project_name.into(),
            scripts_dir: "scripts".to_string(),
            web_bucket: bucket_join(&work_bucket, "web"),
            hard_filter_ht_path: bucket_join(&work_bucket, "hard-filters.ht"),
            meta_ht_path: bucket_join(&work_bucket, "meta.ht"),
            work_bucket,
            raw_combined_mt_path: raw_combined_mt_path.into(),
            out_filtered_mt_path: out_filtered_mt_path.into(),
            out_vcf_pattern: out_vcf_pattern.into(),
            sample_count,
            ped_file: None,
            overwrite: false,
            vqsr_params: VqsrParams::default(),
            scatter_count: 50,
            is_test: false,
            filter_model: FilterModel::Vqsr,
            cutoffs,
            inbreeding_coeff_cutoff: INBREEDING_COEFF_HARD_CUTOFF,
            rf_features: RfFeatureSet::standard(),
        }
    }

    /// Sets the web/report bucket root.
    #[must_use]
    pub fn with_web_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.web_bucket = bucket.into();
        self
    }

    /// Sets the hard-filtered-samples table path.
    #[must_use]
    pub fn with_hard_filter_ht(mut self, path: impl Into<String>) -> Self {
        self.hard_filter_ht_path = path.into();
        self
    }

    /// Sets the sample metadata table path.
    #[must_use]
    pub fn with_meta_ht(mut self, path: impl Into<String>) -> Self {
        self.meta_ht_path = path.into();
        self
    }

    /// Sets the pedigree file, enabling family-stats annotations.
    #[must_use]
    pub fn with_ped_file(mut self, path: impl Into<String>) -> Self {
        self.ped_file = Some(path.into());
        self
    }

    /// Forces re-execution of every stage.
    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets the scatter count.
    #[must_use]
    pub fn with_scatter_count(mut self, scatter_count: usize) -> Self {
        self.scatter_count = scatter_count;
        self
    }

    /// Provisions test-sized clusters.
    #[must_use]
    pub fn with_test_mode(mut self, is_test: bool) -> Self {
        self.is_test = is_test;
        self
    }

    /// Selects the filtering strategy.
    #[must_use]
    pub fn with_filter_model(mut self, model: FilterModel) -> Self {
        self.filter_model = model;
        self
    }

    /// Sets the AS-VQSR recalibration parameters.
    #[must_use]
    pub fn with_vqsr_params(mut self, params: VqsrParams) -> Self {
        self.vqsr_params = params;
        self
    }

    /// Sets the random-forest feature set.
    #[must_use]
    pub fn with_rf_features(mut self, features: RfFeatureSet) -> Self {
        self.rf_features = features;
        self
    }

    /// Validates the run-level parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.out_vcf_pattern.contains("{CHROM}") {
            return Err(ConfigError::new(
                "out_vcf_pattern must contain a {CHROM} placeholder",
            )
            .with_parameters(["out_vcf_pattern"]));
        }
        if self.scatter_count == 0 {
            return Err(
                ConfigError::new("scatter_count must be positive").with_parameters(["scatter_count"])
            );
        }
        if self.sample_count == 0 {
            return Err(
                ConfigError::new("sample_count must be positive").with_parameters(["sample_count"])
            );
        }
        Ok(())
    }

    /// Returns the path of a collaborator script.
    #[must_use]
    pub fn script(&self, name: &str) -> String {
        format!("{}/{}", self.scripts_dir.trim_end_matches('/'), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> VariantQcConfig {
        VariantQcConfig::new(
            "test-project",
            "gs://bucket/work",
            "gs://bucket/raw.mt",
            "gs://bucket/filtered.mt",
            "gs://bucket/release/chr{CHROM}.vcf.bgz",
            100,
            FilterCutoffs::bins(90, 80),
        )
    }

    #[test]
    fn test_cutoff_both_supplied_rejected() {
        let err = FilterCutoff::resolve(VariantClass::Snp, Some(0.3), Some(90)).unwrap_err();
        assert!(err.message.contains("mutually exclusive"));
        assert_eq!(
            err.parameters,
            vec!["snp_bin_cutoff", "snp_score_cutoff"]
        );
    }

    #[test]
    fn test_cutoff_neither_supplied_rejected() {
        let err = FilterCutoff::resolve(VariantClass::Indel, None, None).unwrap_err();
        assert!(err.message.contains("must be supplied"));
    }

    #[test]
    fn test_cutoff_exactly_one_succeeds() {
        assert_eq!(
            FilterCutoff::resolve(VariantClass::Snp, Some(0.3), None).unwrap(),
            FilterCutoff::Score(0.3)
        );
        assert_eq!(
            FilterCutoff::resolve(VariantClass::Indel, None, Some(80)).unwrap(),
            FilterCutoff::Bin(80)
        );
    }

    #[test]
    fn test_cutoff_flag_rendering() {
        let (name, value) = FilterCutoff::Bin(90).flag(VariantClass::Snp);
        assert_eq!(name, "--snp-bin-cutoff");
        assert_eq!(value, "90");

        let (name, value) = FilterCutoff::Score(-2.5).flag(VariantClass::Indel);
        assert_eq!(name, "--indel-score-cutoff");
        assert_eq!(value, "-2.5");
    }

    #[test]
    fn test_model_names() {
        assert_eq!(FilterModel::RandomForest.model_name(), "RF");
        assert_eq!(FilterModel::RandomForest.score_name(), "RF");
        assert_eq!(FilterModel::Vqsr.model_name(), "VQSR");
        assert_eq!(FilterModel::Vqsr.score_name(), "AS_VQSLOD");
    }

    #[test]
    fn test_feature_set_extension_is_explicit() {
        let features = RfFeatureSet::standard()
            .with_extra(["transmitted_singleton", "AS_QD"]);

        assert!(features.fields().contains(&"transmitted_singleton".to_string()));
        // No duplicate from re-adding an existing field.
        assert_eq!(
            features.fields().iter().filter(|f| *f == "AS_QD").count(),
            1
        );
        assert_eq!(RfFeatureSet::standard().fields().len(), 9);
    }

    #[test]
    fn test_vcf_pattern_validated() {
        let mut cfg = config();
        assert!(cfg.validate().is_ok());

        cfg.out_vcf_pattern = "gs://bucket/release/all.vcf.bgz".to_string();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.parameters, vec!["out_vcf_pattern"]);
    }

    #[test]
    fn test_defaults_derived_from_work_bucket() {
        let cfg = config();
        assert_eq!(cfg.hard_filter_ht_path, "gs://bucket/work/hard-filters.ht");
        assert_eq!(cfg.meta_ht_path, "gs://bucket/work/meta.ht");
        assert_eq!(cfg.web_bucket, "gs://bucket/work/web");
        assert_eq!(cfg.filter_model, FilterModel::Vqsr);
    }

    #[test]
    fn test_script_path() {
        let cfg = config();
        assert_eq!(
            cfg.script("generate_info_ht.py"),
            "scripts/generate_info_ht.py"
        );
    }
}
