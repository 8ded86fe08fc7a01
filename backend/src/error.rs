//! Error types for the Comprobantes conversion pipeline.
//!
//! - [`CsvError`] - Reading and decoding errors
//! - [`TransformError`] - Column reshaping errors
//! - [`PipelineError`] - Per-file orchestration errors (read, transform, write)
//! - [`ServerError`] - HTTP server errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// CSV Reading Errors
// =============================================================================

/// Errors while reading and decoding a source file.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// No candidate encoding (nor the UTF-8 fallback) could decode the bytes.
    #[error("Could not decode file with any of [{tried}]: {message}")]
    EncodingError { tried: String, message: String },

    /// Unknown encoding label in a catalog.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// Invalid CSV format.
    #[error("Invalid CSV format: {0}")]
    ParseError(#[from] csv::Error),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors while reshaping the invoice table.
#[derive(Debug, Error)]
pub enum TransformError {
    /// A column the pipeline needs is absent.
    #[error("Missing column '{column}'. Detected headers: {}", .available.join(" | "))]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// The catalog contradicts itself.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    /// The catalog is not valid JSON for the catalog schema.
    #[error("Invalid catalog JSON: {0}")]
    CatalogFormat(#[from] serde_json::Error),
}

// =============================================================================
// Pipeline Errors
// =============================================================================

/// Errors converting a single file, end to end.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Transformation error.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// Failed to write the output file.
    #[error("Failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize the output table.
    #[error("Failed to serialize output: {0}")]
    Serialize(#[from] csv::Error),

    /// The input path has no usable file name.
    #[error("Input path has no file name: {}", .0.display())]
    InvalidInputPath(PathBuf),

    /// Failed to read a catalog file.
    #[error("Failed to read catalog '{}': {source}", .path.display())]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A catalog file was read but is not usable.
    #[error("Failed to load catalog '{}': {source}", .path.display())]
    Catalog {
        path: PathBuf,
        #[source]
        source: TransformError,
    },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind or serve.
    #[error("Server IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for reading operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
