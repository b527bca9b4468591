//! Path helpers and fixed genomic constants.

use uuid::Uuid;

/// The chromosomes exported as independent per-chromosome VCFs.
pub const CHROMOSOMES: [&str; 24] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16",
    "17", "18", "19", "20", "21", "22", "X", "Y",
];

/// Joins a bucket root and a relative name with a single slash.
#[must_use]
pub fn bucket_join(bucket: &str, name: &str) -> String {
    format!(
        "{}/{}",
        bucket.trim_end_matches('/'),
        name.trim_start_matches('/')
    )
}

/// Substitutes a chromosome into an output VCF path pattern.
#[must_use]
pub fn vcf_path_for_chrom(pattern: &str, chrom: &str) -> String {
    pattern.replace("{CHROM}", chrom)
}

/// Mints a fresh random-forest model identifier, one per run.
#[must_use]
pub fn rf_model_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("rf_{}", &id[..8])
}
