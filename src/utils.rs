//! Utility functions for file handling and common operations

use crate::{ClassifierError, ClassifierResult};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Check if a file is gzip compressed
pub fn is_gzipped<P: AsRef<Path>>(path: P) -> ClassifierResult<bool> {
    let mut file = File::open(path)?;
    let mut buffer = [0; 2];

    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(ClassifierError::Io(e)),
    }
}

/// Open a plain or gzipped text file for buffered reading
pub fn open_input<P: AsRef<Path>>(path: P) -> ClassifierResult<Box<dyn BufRead>> {
    let file = File::open(&path)
        .map_err(|_| ClassifierError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    let reader: Box<dyn BufRead> = if is_gzipped(&path)? {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    Ok(reader)
}

/// Output file writer, plain or gzip compressed
pub enum OutputWriter {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl OutputWriter {
    /// Flush all data, writing the gzip trailer for compressed output
    pub fn finish(self) -> ClassifierResult<()> {
        match self {
            OutputWriter::Plain(mut writer) => writer.flush()?,
            OutputWriter::Gzip(encoder) => encoder.finish()?.flush()?,
        }
        Ok(())
    }
}

impl Write for OutputWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            OutputWriter::Plain(writer) => writer.write(buf),
            OutputWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            OutputWriter::Plain(writer) => writer.flush(),
            OutputWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Create an output file, gzip compressed if the path ends in `.gz`
pub fn create_output<P: AsRef<Path>>(path: P) -> ClassifierResult<OutputWriter> {
    let file = BufWriter::new(File::create(&path)?);

    if has_extension(&path, "gz") {
        Ok(OutputWriter::Gzip(GzEncoder::new(file, Compression::default())))
    } else {
        Ok(OutputWriter::Plain(file))
    }
}

/// Refuse to replace an existing output file unless `force` is set
pub fn check_output_path<P: AsRef<Path>>(path: P, force: bool) -> ClassifierResult<()> {
    if path.as_ref().exists() && !force {
        return Err(ClassifierError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!(
                "Output file {:?} already exists. Use --force to overwrite.",
                path.as_ref()
            ),
        )));
    }
    Ok(())
}

/// Get the number of CPU cores, with a fallback default
pub fn get_num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1)
}

/// Validate file paths and check if they exist
pub fn validate_file_exists<P: AsRef<Path>>(path: P) -> ClassifierResult<()> {
    if !path.as_ref().exists() {
        return Err(ClassifierError::FileNotFound(
            path.as_ref().to_string_lossy().to_string(),
        ));
    }
    Ok(())
}

/// Validate that a file is readable
pub fn validate_file_readable<P: AsRef<Path>>(path: P) -> ClassifierResult<()> {
    validate_file_exists(&path)?;

    File::open(&path)
        .map_err(|_| ClassifierError::FileNotFound(path.as_ref().to_string_lossy().to_string()))?;

    Ok(())
}

/// Check if a path has a specific extension
pub fn has_extension<P: AsRef<Path>>(path: P, extension: &str) -> bool {
    path.as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Create parent directories if they don't exist
pub fn ensure_parent_dirs<P: AsRef<Path>>(path: P) -> ClassifierResult<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Timer utility for measuring execution time
pub struct Timer {
    start: std::time::Instant,
    name: String,
}

impl Timer {
    pub fn new(name: &str) -> Self {
        log::info!("Starting timer: {}", name);
        Timer {
            start: std::time::Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    pub fn log_elapsed(&self) {
        let duration = self.elapsed();
        log::info!("Timer '{}' elapsed: {:.2?}", self.name, duration);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.log_elapsed();
    }
}
