//! Somatic evidence index built from a COSMIC mutation catalog

use crate::{utils::open_input, utils::validate_file_readable, ClassifierResult, VariantKey};
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;
use std::path::Path;
use std::sync::LazyLock;

/// Minimum number of tab-separated fields for a usable catalog line
const MIN_FIELDS: usize = 6;

/// `count(tissue)` tokens in the catalog info column
static TISSUE_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\(([^)]+)\)").expect("valid tissue count pattern"));

/// Aggregated catalog evidence for one variant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SomaticEvidence {
    pub count: u64,
    pub tissues: BTreeSet<String>,
}

impl SomaticEvidence {
    pub fn add(&mut self, count: u64, tissue: &str) {
        self.count = self.count.saturating_add(count);
        self.tissues.insert(tissue.to_string());
    }

    /// Fold another evidence record into this one
    pub fn merge(&mut self, other: SomaticEvidence) {
        self.count = self.count.saturating_add(other.count);
        self.tissues.extend(other.tissues);
    }

    /// Tissues sorted and comma-joined
    pub fn tissues_joined(&self) -> String {
        self.tissues.iter().cloned().collect::<Vec<_>>().join(",")
    }
}

/// Extract all `count(tissue)` pairs from an info field
///
/// Counts that do not fit in a `u64` are dropped.
pub fn parse_tissue_counts(info: &str) -> Vec<(u64, &str)> {
    TISSUE_COUNT
        .captures_iter(info)
        .filter_map(|caps| {
            let count = caps.get(1)?.as_str().parse::<u64>().ok()?;
            let tissue = caps.get(2)?.as_str();
            Some((count, tissue))
        })
        .collect()
}

/// Lookup from variant key to aggregated COSMIC evidence
#[derive(Debug, Default)]
pub struct SomaticIndex {
    entries: HashMap<VariantKey, SomaticEvidence>,
}

impl SomaticIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from raw catalog lines
    pub fn build<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut index = Self::new();
        for line in lines {
            index.insert_line(line.as_ref());
        }
        index
    }

    /// Load a COSMIC TSV (plain or gzipped)
    pub fn from_path<P: AsRef<Path>>(path: P) -> ClassifierResult<Self> {
        validate_file_readable(&path)?;

        let reader = open_input(&path)?;
        let mut index = Self::new();
        let mut skipped = 0usize;
        for line in reader.lines() {
            if !index.insert_line(&line?) {
                skipped += 1;
            }
        }

        log::debug!("Skipped {} malformed COSMIC lines", skipped);
        log::info!("Indexed {} COSMIC variants", index.len());
        Ok(index)
    }

    /// Accumulate one catalog line; returns false if the line was skipped as malformed
    pub fn insert_line(&mut self, line: &str) -> bool {
        let fields: Vec<&str> = line.trim().split('\t').collect();
        if fields.len() < MIN_FIELDS {
            return false;
        }

        let Ok(pos) = fields[1].trim().parse::<u32>() else {
            log::debug!("Skipping COSMIC line with invalid start position: {}", fields[1]);
            return false;
        };

        let mut line_evidence = SomaticEvidence::default();
        for (count, tissue) in parse_tissue_counts(fields[5]) {
            line_evidence.add(count, tissue);
        }

        let key = VariantKey::new(fields[0], pos, fields[3], fields[4]);
        self.entries.entry(key).or_default().merge(line_evidence);
        true
    }

    pub fn get(&self, key: &VariantKey) -> Option<&SomaticEvidence> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClassifierError;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs::File;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tissues(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_parse_tissue_counts() {
        let pairs = parse_tissue_counts("GENE=BRAF;CNT=12(skin),3(thyroid)");
        assert_eq!(pairs, vec![(12, "skin"), (3, "thyroid")]);

        assert!(parse_tissue_counts("no tokens here").is_empty());
        assert!(parse_tissue_counts("").is_empty());
        assert_eq!(
            parse_tissue_counts("2(large_intestine)4(haematopoietic and lymphoid)"),
            vec![(2, "large_intestine"), (4, "haematopoietic and lymphoid")]
        );
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let a = "chr7\t140753336\tCOSV1\tA\tT\t3(lung)";
        let b = "7\t140753336\tCOSV2\tA\tT\t5(liver)";
        let key = VariantKey::new("7", 140753336, "A", "T");
        let expected = SomaticEvidence {
            count: 8,
            tissues: tissues(&["liver", "lung"]),
        };

        let forward = SomaticIndex::build([a, b]);
        let backward = SomaticIndex::build([b, a]);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward.get(&key), Some(&expected));
        assert_eq!(backward.get(&key), Some(&expected));
    }

    #[test]
    fn test_multiple_tokens_per_line() {
        let index = SomaticIndex::build(["1\t10\t.\tG\tC\t4(lung),6(lung),1(breast)"]);
        let evidence = index.get(&VariantKey::new("1", 10, "G", "C")).unwrap();
        assert_eq!(evidence.count, 11);
        assert_eq!(evidence.tissues_joined(), "breast,lung");
    }

    #[test]
    fn test_repeated_tissue_across_lines() {
        let index = SomaticIndex::build([
            "1\t10\t.\tG\tC\t3(lung)",
            "chr1\t10\t.\tG\tC\t5(lung),2(skin)",
        ]);
        let evidence = index.get(&VariantKey::new("1", 10, "G", "C")).unwrap();
        assert_eq!(evidence.count, 10);
        assert_eq!(evidence.tissues, tissues(&["lung", "skin"]));
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let mut index = SomaticIndex::new();
        assert!(!index.insert_line("1\t10\t.\tG\tC"));
        assert!(!index.insert_line("#chrom\tstart\tid\tref\talt\tinfo"));
        assert!(!index.insert_line(""));
        assert!(index.is_empty());
    }

    #[test]
    fn test_line_without_tokens_creates_entry() {
        let index = SomaticIndex::build(["1\t10\t.\tG\tC\tnothing"]);
        let evidence = index.get(&VariantKey::new("1", 10, "G", "C")).unwrap();
        assert_eq!(evidence.count, 0);
        assert!(evidence.tissues.is_empty());
        assert_eq!(evidence.tissues_joined(), "");
    }

    #[test]
    fn test_merge() {
        let mut left = SomaticEvidence::default();
        left.add(3, "lung");
        let mut right = SomaticEvidence::default();
        right.add(5, "liver");
        right.add(1, "lung");

        left.merge(right);
        assert_eq!(left.count, 9);
        assert_eq!(left.tissues, tissues(&["liver", "lung"]));
    }

    #[test]
    fn test_from_path_gzipped() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut encoder =
            GzEncoder::new(File::create(temp_file.path()).unwrap(), Compression::default());
        writeln!(encoder, "chr12\t25245350\tCOSV55497369\tC\tA\t40(lung),2(pancreas)").unwrap();
        writeln!(encoder, "short\tline").unwrap();
        writeln!(encoder, "chr12\t25245350\tCOSV55497369\tC\tA\t8(pancreas)").unwrap();
        encoder.finish().unwrap();

        let index = SomaticIndex::from_path(temp_file.path()).unwrap();
        let evidence = index.get(&VariantKey::new("12", 25245350, "C", "A")).unwrap();
        assert_eq!(evidence.count, 50);
        assert_eq!(evidence.tissues_joined(), "lung,pancreas");
    }

    #[test]
    fn test_from_path_missing() {
        assert!(matches!(
            SomaticIndex::from_path("/nonexistent/cosmic.tsv.gz"),
            Err(ClassifierError::FileNotFound(_))
        ));
    }
}
