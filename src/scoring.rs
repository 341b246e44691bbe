//! Germline/somatic scoring and classification

use crate::Classification;

/// Confidence-weighted population allele frequency.
///
/// The allele number stands in for cohort size: frequencies backed by fewer than
/// `an_threshold` alleles are scaled down proportionally. Missing AF or AN gives 0.0.
pub fn germline_score(allele_frequency: Option<f64>, allele_number: Option<u64>, an_threshold: u64) -> f64 {
    let (Some(af), Some(an)) = (allele_frequency, allele_number) else {
        return 0.0;
    };

    // a zero threshold means every allele number carries full confidence
    let confidence = if an_threshold == 0 {
        1.0
    } else {
        (an as f64 / an_threshold as f64).min(1.0)
    };

    af * confidence
}

/// Log-compressed catalog observation count, `log10(count + 1)`
pub fn somatic_score(count: Option<u64>) -> f64 {
    match count {
        Some(count) => (count as f64 + 1.0).log10(),
        None => 0.0,
    }
}

/// Apply the 2x2 threshold matrix; both comparisons are inclusive
pub fn classify(
    germline_score: f64,
    somatic_score: f64,
    germline_threshold: f64,
    somatic_threshold: f64,
) -> Classification {
    let g_high = germline_score >= germline_threshold;
    let s_high = somatic_score >= somatic_threshold;

    match (g_high, s_high) {
        (true, false) => Classification::LikelyGermline,
        (false, true) => Classification::LikelySomatic,
        (true, true) => Classification::Conflicting,
        (false, false) => Classification::Unknown,
    }
}

/// Round a score to 4 decimal places for output
///
/// Rounds the exact binary value, so 0.30105 (stored just below the midpoint) becomes 0.301.
pub fn round_score(score: f64) -> f64 {
    format!("{:.4}", score).parse().unwrap_or(score)
}
