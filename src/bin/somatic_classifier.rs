//! CLI binary for germline/somatic classification of tumor variants

use clap::Parser;
use env_logger::Env;
use std::path::PathBuf;
use somatic_classifier_rs::{
    pipeline::{run_classification, summarize_classifications, ClassifierPaths},
    utils::{check_output_path, get_num_cpus},
    ClassifierConfig, ClassifierError, ClassifierResult,
};

#[derive(Parser)]
#[command(name = "somatic_classifier")]
#[command(about = "Somatic Variant Classifier using gnomAD and COSMIC")]
#[command(long_about = "
Annotates variants from a tumor sample VCF (e.g. Mutect2 output) with population
allele frequencies from gnomAD and observation counts from COSMIC, then labels
each alternate allele as LIKELY_GERMLINE, LIKELY_SOMATIC, CONFLICTING or UNKNOWN.

The germline score is the gnomAD allele frequency scaled down when the allele
number is below the confidence threshold. The somatic score is log10(count + 1)
of the COSMIC observations. Each score is compared against its threshold (>=).

Inputs may be plain or gzip compressed. The output is a tab-separated file with
one row per alternate allele; it is gzip compressed if its name ends in .gz.
")]
struct Args {
    /// Path to the tumor sample VCF file
    #[arg(long, value_name = "FILE")]
    sample_vcf: PathBuf,

    /// Path to the gnomAD reference VCF file
    #[arg(long, value_name = "FILE")]
    gnomad_vcf: PathBuf,

    /// Path to the COSMIC TSV file (usually gzipped)
    #[arg(long, value_name = "FILE")]
    cosmic_tsv: PathBuf,

    /// Path to the output TSV file
    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Germline score at or above which a variant counts as germline-like
    #[arg(long, default_value_t = 0.1)]
    germline_threshold: f64,

    /// Somatic score at or above which a variant counts as somatic-like
    #[arg(long, default_value_t = 1.0)]
    somatic_threshold: f64,

    /// gnomAD allele number at which the allele frequency gets full confidence
    #[arg(long, default_value_t = 100_000)]
    an_confidence_threshold: u64,

    /// Number of threads used to annotate sample variants
    #[arg(long, default_value_t = get_num_cpus())]
    threads: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Force overwrite of output file if it exists
    #[arg(short, long)]
    force: bool,
}

impl Args {
    fn config(&self) -> ClassifierConfig {
        ClassifierConfig {
            germline_threshold: self.germline_threshold,
            somatic_threshold: self.somatic_threshold,
            an_confidence_threshold: self.an_confidence_threshold,
        }
    }

    fn paths(&self) -> ClassifierPaths {
        ClassifierPaths {
            sample_vcf: self.sample_vcf.clone(),
            gnomad_vcf: self.gnomad_vcf.clone(),
            cosmic_tsv: self.cosmic_tsv.clone(),
            output: self.output.clone(),
        }
    }
}

fn run() -> ClassifierResult<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_secs()
        .init();

    let config = args.config();
    log::info!("Sample VCF: {:?}", args.sample_vcf);
    log::info!("gnomAD VCF: {:?}", args.gnomad_vcf);
    log::info!("COSMIC TSV: {:?}", args.cosmic_tsv);
    log::info!("Output file: {:?}", args.output);
    log::info!(
        "Configuration: germline threshold={}, somatic threshold={}, AN confidence threshold={}",
        config.germline_threshold,
        config.somatic_threshold,
        config.an_confidence_threshold
    );

    check_output_path(&args.output, args.force)?;

    let rows = run_classification(&args.paths(), &config, args.threads)?;

    if rows.is_empty() {
        log::warn!("No variants found in the sample VCF file");
        return Ok(());
    }

    log::info!("Results summary:");
    for (label, count) in summarize_classifications(&rows) {
        log::info!(
            "  {}: {} ({:.1}%)",
            label,
            count,
            (count as f64 / rows.len() as f64) * 100.0
        );
    }

    Ok(())
}

/// Handle application errors and provide user-friendly messages
fn handle_error(error: ClassifierError) -> ! {
    match error {
        ClassifierError::FileNotFound(path) => {
            eprintln!("ERROR: File not found: {}", path);
            eprintln!("Please check that the file exists and is readable.");
        }
        ClassifierError::InvalidRecord(msg) => {
            eprintln!("ERROR: Invalid variant data: {}", msg);
            eprintln!("Please check that your VCF files are properly formatted.");
        }
        ClassifierError::InvalidConfig(msg) => {
            eprintln!("ERROR: Invalid configuration: {}", msg);
            eprintln!("Please check the threshold parameters.");
        }
        ClassifierError::Io(ref e) => {
            eprintln!("ERROR: I/O error: {}", e);
            eprintln!("Please check file permissions and disk space.");
        }
        ClassifierError::Csv(ref e) => {
            eprintln!("ERROR: TSV output error: {}", e);
        }
    }
    std::process::exit(1);
}

fn main() {
    if let Err(e) = run() {
        handle_error(e);
    }
}
