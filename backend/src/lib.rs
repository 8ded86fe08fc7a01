//! # Arreglar - AFIP Comprobantes CSV normalizer
//!
//! Arreglar reads the "Mis Comprobantes" CSV exports downloaded from AFIP,
//! whatever their encoding, and rewrites them in the fixed semicolon layout
//! expected by the accounting import.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Transform  │────▶│   Writer    │
//! │ (latin-1/…) │     │ (encoding)  │     │  (catalog)  │     │ (UTF-8, ;)  │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arreglar::{convert_file, ColumnCatalog, ConvertOptions};
//!
//! let converted = convert_file(
//!     "comprobantes.csv".as_ref(),
//!     &ColumnCatalog::afip(),
//!     &ConvertOptions::default(),
//! )?;
//! println!("Wrote {}", converted.output.display());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - In-memory table
//! - [`parser`] - Encoding detection and CSV reading
//! - [`transform`] - Catalog, stages and pipeline
//! - [`writer`] - Output CSV
//! - [`api`] - HTTP upload server

// Core modules
pub mod error;
pub mod models;

// Reading
pub mod parser;

// Transformation
pub mod transform;

// Writing
pub mod writer;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError,
    CsvResult,
    PipelineError,
    PipelineResult,
    ServerError,
    ServerResult,
    TransformError,
    TransformResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::InvoiceTable;

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    detect_encoding,
    normalize_column_name,
    parse_bytes,
    parse_file,
    parse_table,
    Decoded,
    Encoding,
    ParseResult,
};

// =============================================================================
// Re-exports - Catalog and stages
// =============================================================================

pub use transform::{
    execute,
    operations_description,
    ColumnCatalog,
    ColumnFixup,
    DerivedColumn,
    ExecuteResult,
    Operation,
    Rename,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    convert_batch,
    convert_bytes,
    convert_file,
    inspect_bytes,
    BatchReport,
    ConvertOptions,
    ConvertedBytes,
    ConvertedFile,
    CsvInfo,
    FailedFile,
};

// =============================================================================
// Re-exports - Writer
// =============================================================================

pub use writer::{output_path_for, table_to_bytes, write_file, write_table, LineTerminator};

// =============================================================================
// Re-exports - API
// =============================================================================

pub use api::types::{error_response, CsvMetadata, InspectResponse};

// Server
pub mod server {
    pub use crate::api::server::{download_name, router, start_server, AppState};
}
