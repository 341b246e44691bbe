//! Germline evidence index built from a gnomAD population VCF

use crate::{
    utils::validate_file_readable,
    vcf::{first_value, VcfReader, VcfRecord},
    ClassifierResult, VariantKey,
};
use std::collections::HashMap;
use std::path::Path;

/// Population evidence for one variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GermlineEvidence {
    pub allele_frequency: Option<f64>,
    pub allele_number: Option<u64>,
}

impl GermlineEvidence {
    /// Extract `AF` and `AN` from a record's INFO column.
    ///
    /// A multi-valued `AF` keeps only its first entry. This is a known precision
    /// limitation for multi-allelic sites: every alternate allele of the record is
    /// given the frequency of the first one.
    pub fn from_record(record: &VcfRecord) -> Self {
        let allele_frequency = record
            .info_value("AF")
            .and_then(first_value)
            .and_then(|v| v.parse::<f64>().ok());
        let allele_number = record
            .info_value("AN")
            .and_then(first_value)
            .and_then(|v| v.parse::<u64>().ok());

        Self {
            allele_frequency,
            allele_number,
        }
    }
}

/// Lookup from variant key to gnomAD evidence
#[derive(Debug, Default)]
pub struct GermlineIndex {
    entries: HashMap<VariantKey, GermlineEvidence>,
}

impl GermlineIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from already parsed population records
    pub fn build<I: IntoIterator<Item = VcfRecord>>(records: I) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert_record(&record);
        }
        index
    }

    /// Load a gnomAD VCF (plain or gzipped)
    pub fn from_path<P: AsRef<Path>>(path: P) -> ClassifierResult<Self> {
        validate_file_readable(&path)?;

        let mut reader = VcfReader::new(&path)?;
        let mut index = Self::new();
        for record in reader.records() {
            index.insert_record(&record?);
        }

        log::info!("Indexed {} gnomAD alleles", index.len());
        Ok(index)
    }

    /// Insert one entry per alternate allele; a repeated key overwrites the earlier entry
    pub fn insert_record(&mut self, record: &VcfRecord) {
        let evidence = GermlineEvidence::from_record(record);
        for alt in &record.alt_alleles {
            let key = VariantKey::new(&record.chrom, record.pos, &record.ref_allele, alt);
            self.entries.insert(key, evidence);
        }
    }

    pub fn get(&self, key: &VariantKey) -> Option<&GermlineEvidence> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
