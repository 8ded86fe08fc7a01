//! High-level conversion API.
//!
//! Combines reading, the stage executor and the writer for one file, one
//! upload or a whole batch of files.
//!
//! # Example
//!
//! ```rust,ignore
//! use arreglar::{convert_batch, ColumnCatalog, ConvertOptions};
//!
//! let report = convert_batch(&paths, &ColumnCatalog::afip(), &ConvertOptions::default())?;
//! println!("{} converted, {} failed", report.converted.len(), report.failed.len());
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::catalog::ColumnCatalog;
use super::executor::{execute, ExecuteResult};
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{PipelineError, PipelineResult};
use crate::parser::{parse_bytes, parse_file, Encoding, ParseResult};
use crate::writer::{output_path_for, table_to_bytes, write_file, LineTerminator};

/// Options for a conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertOptions {
    /// Directory receiving `<stem>_arreglado.csv` files
    pub output_dir: PathBuf,

    /// Record terminator of output files
    #[serde(default)]
    pub line_terminator: LineTerminator,

    /// Stop the batch at the first failing file
    #[serde(default)]
    pub fail_fast: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            line_terminator: LineTerminator::default(),
            fail_fast: false,
        }
    }
}

/// Source file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: Encoding,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl CsvInfo {
    fn from_parse(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding,
            headers: parsed.table.headers().to_vec(),
            row_count: parsed.table.row_count(),
        }
    }
}

/// One successfully converted file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    pub csv_info: CsvInfo,
    pub remaining_columns: Vec<String>,
}

/// Converted bytes of an in-memory upload
#[derive(Debug, Clone)]
pub struct ConvertedBytes {
    pub csv: Vec<u8>,
    pub csv_info: CsvInfo,
    pub remaining_columns: Vec<String>,
}

/// A file the batch could not convert
#[derive(Debug)]
pub struct FailedFile {
    pub input: PathBuf,
    pub error: PipelineError,
}

/// Outcome of a batch
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<ConvertedFile>,
    pub failed: Vec<FailedFile>,
}

impl BatchReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} converted, {} failed",
            self.converted.len(),
            self.failed.len()
        )
    }
}

/// Read, transform and write one file.
pub fn convert_file(
    path: &Path,
    catalog: &ColumnCatalog,
    options: &ConvertOptions,
) -> PipelineResult<ConvertedFile> {
    log_info(format!("📄 Processing: {}", path.display()));

    let output = output_path_for(path, &options.output_dir)?;
    let parsed = parse_file(
        path,
        &catalog.candidate_encodings,
        &catalog.expected_source_columns(),
    )?;
    let csv_info = CsvInfo::from_parse(&parsed);
    log_csv_info(&csv_info);

    let ExecuteResult {
        table,
        remaining_columns,
        dropped,
    } = execute(parsed.table, catalog)?;
    log_dropped(&dropped);

    write_file(&table, &output, options.line_terminator)?;
    log_success(format!("Wrote {} rows to {}", table.row_count(), output.display()));

    Ok(ConvertedFile {
        input: path.to_path_buf(),
        output,
        csv_info,
        remaining_columns,
    })
}

/// Transform an in-memory upload without touching the disk.
pub fn convert_bytes(
    bytes: &[u8],
    catalog: &ColumnCatalog,
    terminator: LineTerminator,
) -> PipelineResult<ConvertedBytes> {
    let parsed = parse_bytes(
        bytes,
        &catalog.candidate_encodings,
        &catalog.expected_source_columns(),
    )?;
    let csv_info = CsvInfo::from_parse(&parsed);
    log_csv_info(&csv_info);

    let result = execute(parsed.table, catalog)?;
    log_dropped(&result.dropped);
    let csv = table_to_bytes(&result.table, terminator)?;

    Ok(ConvertedBytes {
        csv,
        csv_info,
        remaining_columns: result.remaining_columns,
    })
}

/// Read an upload and report what the pipeline would see, without converting.
pub fn inspect_bytes(bytes: &[u8], catalog: &ColumnCatalog) -> PipelineResult<CsvInfo> {
    let parsed = parse_bytes(
        bytes,
        &catalog.candidate_encodings,
        &catalog.expected_source_columns(),
    )?;
    Ok(CsvInfo::from_parse(&parsed))
}

/// Convert files one at a time, in order.
///
/// A failing file is recorded and the batch moves on, unless
/// `options.fail_fast` is set, in which case the first error is returned.
pub fn convert_batch(
    paths: &[PathBuf],
    catalog: &ColumnCatalog,
    options: &ConvertOptions,
) -> PipelineResult<BatchReport> {
    let mut report = BatchReport::default();

    for path in paths {
        match convert_file(path, catalog, options) {
            Ok(converted) => report.converted.push(converted),
            Err(error) if options.fail_fast => return Err(error),
            Err(error) => {
                log_error(format!("{}: {}", path.display(), error));
                report.failed.push(FailedFile {
                    input: path.clone(),
                    error,
                });
            }
        }
    }

    if report.is_ok() {
        log_success(report.summary());
    } else {
        log_warning(report.summary());
    }

    Ok(report)
}

fn log_dropped(dropped: &[String]) {
    if !dropped.is_empty() {
        log_info(format!("Dropped {} columns: {}", dropped.len(), dropped.join(", ")));
    }
}

fn log_csv_info(info: &CsvInfo) {
    log_success(format!("Detected encoding: {}", info.encoding));
    log_success(format!("Read {} rows, {} columns", info.row_count, info.headers.len()));
}
