//! Transformation module.
//!
//! This module turns a decoded Comprobantes table into the import layout:
//! - Catalog: drop/derive/rename/output lists and value fixups
//! - Operations: value-level fixups
//! - Executor: the ordered stages
//! - Pipeline: read, transform and write files or uploads

pub mod catalog;
pub mod executor;
pub mod operations;
pub mod pipeline;

pub use catalog::*;
pub use executor::*;
pub use operations::*;
pub use pipeline::*;
