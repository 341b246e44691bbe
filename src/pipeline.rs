//! Annotation pipeline: index lookup, scoring, classification and TSV output

use crate::{
    germline::GermlineIndex,
    scoring::{classify, germline_score, round_score, somatic_score},
    somatic::SomaticIndex,
    utils::{create_output, ensure_parent_dirs, validate_file_readable, Timer},
    validate_classifier_config,
    vcf::{first_value, read_vcf_records, VcfRecord},
    Classification, ClassifierConfig, ClassifierError, ClassifierResult, ScoredVariant, VariantKey,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Output TSV columns, in order
pub const OUTPUT_HEADER: [&str; 14] = [
    "chrom",
    "pos",
    "ref",
    "alt",
    "filter",
    "sample_dp",
    "sample_af",
    "gnomad_af",
    "gnomad_an",
    "cosmic_count",
    "cosmic_tissues",
    "germline_score",
    "somatic_score",
    "classification",
];

/// Input and output locations for one classification run
#[derive(Debug, Clone)]
pub struct ClassifierPaths {
    pub sample_vcf: PathBuf,
    pub gnomad_vcf: PathBuf,
    pub cosmic_tsv: PathBuf,
    pub output: PathBuf,
}

/// Flat, serializable view of a [`ScoredVariant`]; `None` is written as an empty field
#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    chrom: &'a str,
    pos: u32,
    ref_allele: &'a str,
    alt_allele: &'a str,
    filter: Option<&'a str>,
    sample_dp: Option<u64>,
    sample_af: Option<f64>,
    gnomad_af: Option<f64>,
    gnomad_an: Option<u64>,
    cosmic_count: Option<u64>,
    cosmic_tissues: String,
    germline_score: f64,
    somatic_score: f64,
    classification: Classification,
}

impl<'a> From<&'a ScoredVariant> for OutputRow<'a> {
    fn from(row: &'a ScoredVariant) -> Self {
        OutputRow {
            chrom: &row.key.chrom,
            pos: row.key.pos,
            ref_allele: &row.key.ref_allele,
            alt_allele: &row.key.alt_allele,
            filter: row.filter.as_deref(),
            sample_dp: row.sample_depth,
            sample_af: row.sample_allele_fraction,
            gnomad_af: row.germline.and_then(|g| g.allele_frequency),
            gnomad_an: row.germline.and_then(|g| g.allele_number),
            cosmic_count: row.somatic.as_ref().map(|s| s.count),
            cosmic_tissues: row
                .somatic
                .as_ref()
                .map(|s| s.tissues_joined())
                .unwrap_or_default(),
            germline_score: round_score(row.germline_score),
            somatic_score: round_score(row.somatic_score),
            classification: row.classification,
        }
    }
}

/// Score and classify every alternate allele of one sample record
///
/// Rows come back in ALT order and share the record's sample depth and allele fraction.
pub fn annotate_record(
    record: &VcfRecord,
    germline: &GermlineIndex,
    somatic: &SomaticIndex,
    config: &ClassifierConfig,
) -> Vec<ScoredVariant> {
    let sample_depth = record
        .sample_value(0, "DP")
        .and_then(first_value)
        .and_then(|v| v.parse::<u64>().ok());
    let sample_allele_fraction = record
        .sample_value(0, "AF")
        .and_then(first_value)
        .and_then(|v| v.parse::<f64>().ok());
    // passing and unfiltered records both leave the column empty
    let filter = match record.filter.as_str() {
        "PASS" | "." | "" => None,
        filter => Some(filter.to_string()),
    };

    record
        .alt_alleles
        .iter()
        .map(|alt| {
            let key = VariantKey::new(&record.chrom, record.pos, &record.ref_allele, alt);
            let germline = germline.get(&key).copied();
            let somatic = somatic.get(&key).cloned();

            let g_score = germline_score(
                germline.and_then(|g| g.allele_frequency),
                germline.and_then(|g| g.allele_number),
                config.an_confidence_threshold,
            );
            let s_score = somatic_score(somatic.as_ref().map(|s| s.count));
            let classification = classify(
                g_score,
                s_score,
                config.germline_threshold,
                config.somatic_threshold,
            );

            ScoredVariant {
                key,
                filter: filter.clone(),
                sample_depth,
                sample_allele_fraction,
                germline,
                somatic,
                germline_score: g_score,
                somatic_score: s_score,
                classification,
            }
        })
        .collect()
}

/// Annotate sample records, in parallel when `num_threads > 1`
///
/// Output order always matches input order: records first, then ALT order within a record.
pub fn annotate_records(
    records: &[VcfRecord],
    germline: &GermlineIndex,
    somatic: &SomaticIndex,
    config: &ClassifierConfig,
    num_threads: usize,
) -> ClassifierResult<Vec<ScoredVariant>> {
    if num_threads <= 1 || records.len() <= 1 {
        return Ok(records
            .iter()
            .flat_map(|record| annotate_record(record, germline, somatic, config))
            .collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| ClassifierError::InvalidConfig(format!("Failed to build thread pool: {}", e)))?;

    // indexed collect keeps the per-record results in input order
    let per_record: Vec<Vec<ScoredVariant>> = pool.install(|| {
        records
            .par_iter()
            .map(|record| annotate_record(record, germline, somatic, config))
            .collect()
    });

    Ok(per_record.into_iter().flatten().collect())
}

/// Write scored variants as TSV with the fixed header to any writer
pub fn write_scored_variants_to<W: Write>(rows: &[ScoredVariant], writer: W) -> ClassifierResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(writer);

    csv_writer.write_record(OUTPUT_HEADER)?;
    for row in rows {
        csv_writer.serialize(OutputRow::from(row))?;
    }
    csv_writer.flush()?;

    Ok(())
}

/// Write scored variants to a TSV file (gzipped if the path ends in `.gz`)
pub fn write_scored_variants(rows: &[ScoredVariant], output_path: &Path) -> ClassifierResult<()> {
    ensure_parent_dirs(output_path)?;
    let mut writer = create_output(output_path)?;
    write_scored_variants_to(rows, &mut writer)?;
    writer.finish()
}

/// Count rows per classification label
pub fn summarize_classifications(rows: &[ScoredVariant]) -> BTreeMap<Classification, usize> {
    let mut summary = BTreeMap::new();
    for row in rows {
        *summary.entry(row.classification).or_insert(0) += 1;
    }
    summary
}

/// Run a full classification: build both indices, annotate the sample VCF, write the TSV
///
/// All inputs are checked before any work starts, so a missing file never leaves a
/// partial output behind.
pub fn run_classification(
    paths: &ClassifierPaths,
    config: &ClassifierConfig,
    num_threads: usize,
) -> ClassifierResult<Vec<ScoredVariant>> {
    validate_classifier_config(config)?;
    validate_file_readable(&paths.sample_vcf)?;
    validate_file_readable(&paths.gnomad_vcf)?;
    validate_file_readable(&paths.cosmic_tsv)?;

    log::info!("Loading gnomAD...");
    let germline = {
        let _timer = Timer::new("Loading gnomAD");
        GermlineIndex::from_path(&paths.gnomad_vcf)?
    };

    log::info!("Loading COSMIC...");
    let somatic = {
        let _timer = Timer::new("Loading COSMIC");
        SomaticIndex::from_path(&paths.cosmic_tsv)?
    };

    log::info!("Processing sample VCF...");
    let rows = {
        let _timer = Timer::new("Processing sample VCF");
        let records = read_vcf_records(&paths.sample_vcf)?;
        log::info!("Read {} records from sample VCF", records.len());
        annotate_records(&records, &germline, &somatic, config, num_threads)?
    };

    write_scored_variants(&rows, &paths.output)?;
    log::info!("Done. Output written to: {:?}", paths.output);

    Ok(rows)
}
