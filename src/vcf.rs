//! VCF file processing functionality

use crate::{utils::open_input, ClassifierError, ClassifierResult};
use std::io::BufRead;
use std::path::Path;

/// Column indices for VCF parsing
#[derive(Debug, Clone)]
pub struct VcfColumnIndices {
    pub chrom: usize,
    pub pos: usize,
    pub ref_allele: usize,
    pub alt: usize,
    pub filter: usize,
    pub info: usize,
    pub format: Option<usize>,
    pub samples_start: usize,
}

impl Default for VcfColumnIndices {
    /// Standard VCF column order
    fn default() -> Self {
        Self {
            chrom: 0,
            pos: 1,
            ref_allele: 3,
            alt: 4,
            filter: 6,
            info: 7,
            format: Some(8),
            samples_start: 9,
        }
    }
}

impl VcfColumnIndices {
    pub fn from_header(header_line: &str) -> ClassifierResult<Self> {
        let fields: Vec<&str> = header_line.trim().split('\t').collect();
        let find = |name: &str| {
            fields.iter().position(|&col| col == name).ok_or_else(|| {
                ClassifierError::InvalidRecord(format!("{} column not found in VCF header", name))
            })
        };

        let chrom = fields
            .iter()
            .position(|&col| col == "CHROM" || col == "#CHROM")
            .ok_or_else(|| {
                ClassifierError::InvalidRecord("CHROM column not found in VCF header".to_string())
            })?;
        let pos = find("POS")?;
        let ref_allele = find("REF")?;
        let alt = find("ALT")?;
        let filter = find("FILTER")?;
        let info = find("INFO")?;
        let format = fields.iter().position(|&col| col == "FORMAT");
        let samples_start = format.map(|f| f + 1).unwrap_or(fields.len());

        Ok(VcfColumnIndices {
            chrom,
            pos,
            ref_allele,
            alt,
            filter,
            info,
            format,
            samples_start,
        })
    }
}

/// A parsed VCF data line
#[derive(Debug, Clone, PartialEq)]
pub struct VcfRecord {
    pub chrom: String,
    pub pos: u32,
    pub ref_allele: String,
    pub alt_alleles: Vec<String>,
    pub filter: String,
    pub info: String,
    pub format: Option<String>,
    pub samples: Vec<String>,
}

impl VcfRecord {
    pub fn from_line_with_indices(line: &str, indices: &VcfColumnIndices) -> ClassifierResult<Self> {
        let fields: Vec<&str> = line.split('\t').collect();

        let required = [
            indices.chrom,
            indices.pos,
            indices.ref_allele,
            indices.alt,
            indices.filter,
            indices.info,
        ];
        if required.iter().any(|&idx| idx >= fields.len()) {
            return Err(ClassifierError::InvalidRecord(format!(
                "Invalid VCF line format - not enough columns: {}",
                line
            )));
        }

        let pos = fields[indices.pos].parse::<u32>().map_err(|_| {
            ClassifierError::InvalidRecord(format!("Invalid position: {}", fields[indices.pos]))
        })?;

        // "." marks a record without alternate alleles
        let alt_alleles = match fields[indices.alt] {
            "." | "" => Vec::new(),
            alts => alts.split(',').map(|a| a.to_string()).collect(),
        };

        let format = indices
            .format
            .and_then(|f| fields.get(f))
            .map(|f| f.to_string());
        let samples = if indices.format.is_some() && indices.samples_start < fields.len() {
            fields[indices.samples_start..]
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            Vec::new()
        };

        Ok(VcfRecord {
            chrom: fields[indices.chrom].to_string(),
            pos,
            ref_allele: fields[indices.ref_allele].to_string(),
            alt_alleles,
            filter: fields[indices.filter].to_string(),
            info: fields[indices.info].to_string(),
            format,
            samples,
        })
    }

    /// Parse a data line assuming the standard VCF column order
    pub fn from_line(line: &str) -> ClassifierResult<Self> {
        Self::from_line_with_indices(line, &VcfColumnIndices::default())
    }

    /// Raw value of an INFO key; flags yield an empty string
    pub fn info_value(&self, key: &str) -> Option<&str> {
        self.info.split(';').find_map(|entry| match entry.split_once('=') {
            Some((k, v)) if k == key => Some(v),
            None if entry == key => Some(""),
            _ => None,
        })
    }

    /// Raw value of a FORMAT key in the given sample column
    pub fn sample_value(&self, sample_idx: usize, key: &str) -> Option<&str> {
        let format = self.format.as_deref()?;
        let field_idx = format.split(':').position(|k| k == key)?;
        self.samples.get(sample_idx)?.split(':').nth(field_idx)
    }
}

/// First comma-separated entry of a VCF value, with "." treated as missing
pub fn first_value(value: &str) -> Option<&str> {
    match value.split(',').next() {
        Some("") | Some(".") | None => None,
        Some(first) => Some(first),
    }
}

/// VCF file reader that handles both compressed and uncompressed files
pub struct VcfReader {
    reader: Box<dyn BufRead>,
}

impl VcfReader {
    pub fn new<P: AsRef<Path>>(path: P) -> ClassifierResult<Self> {
        Ok(VcfReader {
            reader: open_input(path)?,
        })
    }

    pub fn records(&mut self) -> VcfRecordIterator<'_> {
        VcfRecordIterator {
            reader: &mut self.reader,
            indices: VcfColumnIndices::default(),
        }
    }
}

/// Iterator over VCF records
///
/// Column positions are taken from the `#CHROM` line when present.
pub struct VcfRecordIterator<'a> {
    reader: &'a mut Box<dyn BufRead>,
    indices: VcfColumnIndices,
}

impl Iterator for VcfRecordIterator<'_> {
    type Item = ClassifierResult<VcfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();

        loop {
            line.clear();
            match self.reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    let line = line.trim_end_matches(['\n', '\r']);
                    if line.starts_with("##") || line.trim().is_empty() {
                        continue;
                    }
                    if line.starts_with('#') {
                        match VcfColumnIndices::from_header(line) {
                            Ok(indices) => self.indices = indices,
                            Err(e) => return Some(Err(e)),
                        }
                        continue;
                    }

                    return Some(VcfRecord::from_line_with_indices(line, &self.indices));
                }
                Err(e) => return Some(Err(ClassifierError::Io(e))),
            }
        }
    }
}

/// Read all VCF records from a file
pub fn read_vcf_records<P: AsRef<Path>>(path: P) -> ClassifierResult<Vec<VcfRecord>> {
    VcfReader::new(path)?.records().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_vcf_record_from_line() {
        let line = "chr1\t100\t.\tA\tT,G\t.\tPASS\tAF=0.5;AN=1000;DB\tGT:DP:AF\t0/1:42:0.31,0.02";
        let record = VcfRecord::from_line(line).unwrap();

        assert_eq!(record.chrom, "chr1");
        assert_eq!(record.pos, 100);
        assert_eq!(record.ref_allele, "A");
        assert_eq!(record.alt_alleles, vec!["T", "G"]);
        assert_eq!(record.filter, "PASS");
        assert_eq!(record.info_value("AF"), Some("0.5"));
        assert_eq!(record.info_value("AN"), Some("1000"));
        assert_eq!(record.info_value("DB"), Some(""));
        assert_eq!(record.info_value("DP"), None);
        assert_eq!(record.sample_value(0, "DP"), Some("42"));
        assert_eq!(record.sample_value(0, "AF"), Some("0.31,0.02"));
        assert_eq!(record.sample_value(1, "DP"), None);
        assert_eq!(record.sample_value(0, "AD"), None);
    }

    #[test]
    fn test_vcf_record_without_samples() {
        let record = VcfRecord::from_line("1\t5\t.\tC\t.\t.\t.\t.").unwrap();
        assert!(record.alt_alleles.is_empty());
        assert_eq!(record.format, None);
        assert!(record.samples.is_empty());
        assert_eq!(record.sample_value(0, "DP"), None);
    }

    #[test]
    fn test_vcf_record_invalid() {
        assert!(VcfRecord::from_line("chr1\t100\t.\tA").is_err());
        assert!(VcfRecord::from_line("chr1\tabc\t.\tA\tT\t.\tPASS\t.").is_err());
    }

    #[test]
    fn test_first_value() {
        assert_eq!(first_value("0.25,0.5"), Some("0.25"));
        assert_eq!(first_value("7"), Some("7"));
        assert_eq!(first_value("."), None);
        assert_eq!(first_value(""), None);
    }

    #[test]
    fn test_read_vcf_records_with_reordered_header() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "##fileformat=VCFv4.2").unwrap();
        writeln!(temp_file, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").unwrap();
        writeln!(temp_file, "chr1\t100\t.\tA\tT\t.\tPASS\tDP=30").unwrap();
        writeln!(temp_file).unwrap();
        writeln!(temp_file, "chr2\t200\t.\tG\tC,A\t.\tPASS\tDP=40").unwrap();

        let records = read_vcf_records(temp_file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].chrom, "chr1");
        assert_eq!(records[1].alt_alleles, vec!["C", "A"]);
        // no FORMAT column in the header
        assert_eq!(records[0].format, None);
    }

    #[test]
    fn test_read_vcf_records_bad_position() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO").unwrap();
        writeln!(temp_file, "chr1\tnope\t.\tA\tT\t.\tPASS\t.").unwrap();

        assert!(matches!(
            read_vcf_records(temp_file.path()),
            Err(ClassifierError::InvalidRecord(_))
        ));
    }
}
