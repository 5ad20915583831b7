//! One-shot XML to CSV conversion, wired as a single-step job.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    core::{
        job::{Job, JobBuilder},
        step::StepBuilder,
    },
    item::{
        csv::csv_writer::CsvTableWriterBuilder,
        flatten::{MetadataFlattener, DEFAULT_METADATA_PREFIX},
        xml::{RecordItemReaderBuilder, XmlDocument, DEFAULT_METADATA_TAG, DEFAULT_RECORD_TAG},
    },
    record::{FlatRecord, Record},
    BatchError,
};

/// Input read by the binary, relative to the working directory.
pub const DEFAULT_INPUT_PATH: &str = "export.xml";

/// Output written by the binary, relative to the working directory.
pub const DEFAULT_OUTPUT_PATH: &str = "output.csv";

/// Records handed to the writer at a time.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

const JOB_NAME: &str = "xml-to-csv";
const STEP_NAME: &str = "flatten-records";

/// Settings of a conversion run.
///
/// ```
/// use record_flatten::conversion::ConversionConfig;
///
/// let config = ConversionConfig::default()
///     .input_path("data/export.xml")
///     .output_path("data/records.csv")
///     .delimiter(b';');
///
/// assert_eq!(config.get_record_tag(), "Record");
/// assert_eq!(config.get_output_path().to_str(), Some("data/records.csv"));
/// ```
#[derive(Debug, Clone)]
pub struct ConversionConfig {
    input_path: PathBuf,
    output_path: PathBuf,
    record_tag: String,
    metadata_tag: String,
    metadata_prefix: String,
    delimiter: u8,
    chunk_size: usize,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            record_tag: DEFAULT_RECORD_TAG.to_string(),
            metadata_tag: DEFAULT_METADATA_TAG.to_string(),
            metadata_prefix: DEFAULT_METADATA_PREFIX.to_string(),
            delimiter: b',',
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ConversionConfig {
    pub fn input_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.input_path = path.as_ref().to_path_buf();
        self
    }

    pub fn output_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_path = path.as_ref().to_path_buf();
        self
    }

    pub fn record_tag<S: AsRef<str>>(mut self, tag: S) -> Self {
        self.record_tag = tag.as_ref().to_string();
        self
    }

    pub fn metadata_tag<S: AsRef<str>>(mut self, tag: S) -> Self {
        self.metadata_tag = tag.as_ref().to_string();
        self
    }

    pub fn metadata_prefix<S: AsRef<str>>(mut self, prefix: S) -> Self {
        self.metadata_prefix = prefix.as_ref().to_string();
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn get_input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn get_output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn get_record_tag(&self) -> &str {
        &self.record_tag
    }
}

/// Counts reported at the end of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSummary {
    pub output_path: PathBuf,
    pub record_count: usize,
    pub row_count: usize,
    pub column_count: usize,
    pub metadata_folded: usize,
    pub metadata_skipped: usize,
    pub duration: Duration,
}

impl fmt::Display for ConversionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records read, {} rows x {} columns written to {}, {} metadata entries folded, {} skipped, in {:?}",
            self.record_count,
            self.row_count,
            self.column_count,
            self.output_path.display(),
            self.metadata_folded,
            self.metadata_skipped,
            self.duration
        )
    }
}

/// Converts the configured XML export into a CSV table.
///
/// The input is parsed completely before anything else happens: a missing or
/// malformed document fails with [`BatchError::XmlParse`] and leaves the
/// output path untouched. Otherwise every record is flattened and the table is
/// written to the output path, replacing any previous file.
pub fn run(config: &ConversionConfig) -> Result<ConversionSummary, BatchError> {
    let document = XmlDocument::from_path(&config.input_path)?;

    let reader = RecordItemReaderBuilder::new()
        .record_tag(&config.record_tag)
        .metadata_tag(&config.metadata_tag)
        .from_document(document);
    let processor = MetadataFlattener::new(&config.metadata_prefix);
    let writer = CsvTableWriterBuilder::new()
        .delimiter(config.delimiter)
        .from_path(&config.output_path);

    let step = StepBuilder::<Record, FlatRecord>::new()
        .name(STEP_NAME.to_string())
        .reader(&reader)
        .processor(&processor)
        .writer(&writer)
        .chunk(config.chunk_size)
        .build()?;

    let job = JobBuilder::new()
        .name(JOB_NAME.to_string())
        .start(&step)
        .build();
    let execution = job.run()?;

    let summary = ConversionSummary {
        output_path: config.output_path.clone(),
        record_count: step.get_read_count(),
        row_count: step.get_write_count(),
        column_count: writer.column_count(),
        metadata_folded: processor.folded_count(),
        metadata_skipped: processor.skipped_count(),
        duration: execution.duration,
    };

    Ok(summary)
}
