//! HTTP API module.
//!
//! This module provides the upload server, its response types, the zip
//! bundle for multi-file uploads and the log broadcaster shared with the CLI.

pub mod archive;
pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{download_name, router, start_server, AppState};
pub use types::*;
