//! # somatic-classifier-rs - Germline/Somatic Variant Classifier
//!
//! Annotates variants called from a tumor sample with population-frequency evidence
//! (gnomAD) and mutation-catalog evidence (COSMIC), scores both, and assigns each
//! variant one of four classification labels.

pub mod germline;
pub mod pipeline;
pub mod scoring;
pub mod somatic;
pub mod utils;
pub mod vcf;

use serde::Serialize;
use std::fmt;

/// Strip a leading `chr` prefix from a chromosome name
pub fn normalize_chrom(chrom: &str) -> &str {
    chrom.strip_prefix("chr").unwrap_or(chrom)
}

/// Canonical identity of a variant, shared by the sample, gnomAD and COSMIC data
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub chrom: String,
    pub pos: u32,
    pub ref_allele: String,
    pub alt_allele: String,
}

impl VariantKey {
    /// Build a key, normalizing the chromosome name
    pub fn new(chrom: &str, pos: u32, ref_allele: &str, alt_allele: &str) -> Self {
        Self {
            chrom: normalize_chrom(chrom).to_string(),
            pos,
            ref_allele: ref_allele.to_string(),
            alt_allele: alt_allele.to_string(),
        }
    }
}

/// Classification label assigned from the germline and somatic scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    LikelyGermline,
    LikelySomatic,
    Conflicting,
    Unknown,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::LikelyGermline => "LIKELY_GERMLINE",
            Classification::LikelySomatic => "LIKELY_SOMATIC",
            Classification::Conflicting => "CONFLICTING",
            Classification::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One annotated output row: a single (sample variant, alternate allele) pair
///
/// Scores are kept at full precision; rounding happens only when the row is written.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredVariant {
    pub key: VariantKey,
    pub filter: Option<String>,
    pub sample_depth: Option<u64>,
    pub sample_allele_fraction: Option<f64>,
    pub germline: Option<germline::GermlineEvidence>,
    pub somatic: Option<somatic::SomaticEvidence>,
    pub germline_score: f64,
    pub somatic_score: f64,
    pub classification: Classification,
}

/// Configuration parameters for scoring and classification
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub germline_threshold: f64,     // Germline score at or above which a variant is germline-like
    pub somatic_threshold: f64,      // Somatic score at or above which a variant is somatic-like
    pub an_confidence_threshold: u64, // Allele number giving full confidence in gnomAD AF
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            germline_threshold: 0.1,
            somatic_threshold: 1.0,
            an_confidence_threshold: 100_000,
        }
    }
}

/// Validate classifier configuration parameters
pub fn validate_classifier_config(config: &ClassifierConfig) -> ClassifierResult<()> {
    if !config.germline_threshold.is_finite() {
        return Err(ClassifierError::InvalidConfig(
            "germline threshold must be a finite number".to_string(),
        ));
    }

    if !config.somatic_threshold.is_finite() {
        return Err(ClassifierError::InvalidConfig(
            "somatic threshold must be a finite number".to_string(),
        ));
    }

    if config.an_confidence_threshold == 0 {
        return Err(ClassifierError::InvalidConfig(
            "allele number confidence threshold must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Error types for the classifier library
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ClassifierResult<T> = Result<T, ClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_chrom() {
        assert_eq!(normalize_chrom("chr1"), "1");
        assert_eq!(normalize_chrom("1"), "1");
        assert_eq!(normalize_chrom("chrX"), "X");
        // only the leading prefix is removed
        assert_eq!(normalize_chrom("chrUn_chr1"), "Un_chr1");
    }

    #[test]
    fn test_variant_key_equality() {
        let a = VariantKey::new("chr7", 140753336, "A", "T");
        let b = VariantKey::new("7", 140753336, "A", "T");
        assert_eq!(a, b);
        assert_eq!(a.chrom, "7");

        let c = VariantKey::new("7", 140753336, "A", "G");
        assert_ne!(a, c);
    }

    #[test]
    fn test_classification_labels() {
        assert_eq!(Classification::LikelyGermline.to_string(), "LIKELY_GERMLINE");
        assert_eq!(Classification::LikelySomatic.to_string(), "LIKELY_SOMATIC");
        assert_eq!(Classification::Conflicting.to_string(), "CONFLICTING");
        assert_eq!(Classification::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn test_validate_classifier_config() {
        assert!(validate_classifier_config(&ClassifierConfig::default()).is_ok());

        let config = ClassifierConfig {
            an_confidence_threshold: 0,
            ..ClassifierConfig::default()
        };
        assert!(validate_classifier_config(&config).is_err());

        let config = ClassifierConfig {
            germline_threshold: f64::NAN,
            ..ClassifierConfig::default()
        };
        assert!(validate_classifier_config(&config).is_err());

        let config = ClassifierConfig {
            somatic_threshold: f64::INFINITY,
            ..ClassifierConfig::default()
        };
        assert!(validate_classifier_config(&config).is_err());
    }
}
