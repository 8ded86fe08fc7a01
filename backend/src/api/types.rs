//! REST API types for the upload page.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::transform::catalog::ColumnCatalog;
use crate::transform::pipeline::CsvInfo;

/// Response to `POST /api/inspect`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectResponse {
    /// "ready" when every expected column is present, otherwise "warning"
    pub status: String,

    /// Name the converted file would be downloaded as
    pub download_name: String,

    pub csv_info: CsvMetadata,

    /// Source columns the catalog needs but the upload lacks
    pub missing_columns: Vec<String>,

    /// Layout of the converted file
    pub output_columns: Vec<String>,
}

/// Source file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<CsvInfo> for CsvMetadata {
    fn from(info: CsvInfo) -> Self {
        Self {
            encoding: info.encoding.to_string(),
            row_count: info.row_count,
            columns: info.headers,
        }
    }
}

impl InspectResponse {
    pub fn new(info: CsvInfo, catalog: &ColumnCatalog, download_name: String) -> Self {
        let missing_columns = catalog.missing_output_columns(&info.headers);
        Self {
            status: if missing_columns.is_empty() { "ready" } else { "warning" }.to_string(),
            download_name,
            csv_info: info.into(),
            missing_columns,
            output_columns: catalog.output_columns.clone(),
        }
    }
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}
