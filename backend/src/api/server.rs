//! HTTP server: an upload page in front of the conversion pipeline.
//!
//! # API Endpoints
//!
//! | Method | Path            | Description                              |
//! |--------|-----------------|------------------------------------------|
//! | GET    | `/`             | Upload page                              |
//! | GET    | `/health`       | Health check                             |
//! | POST   | `/api/convert`  | Upload CSVs, download converted CSV/zip  |
//! | POST   | `/api/inspect`  | Upload a CSV, get encoding and columns   |
//!
//! One uploaded file comes back as `<name>_arreglado.csv`. Several come back
//! as one zip archive; files that fail are listed in its `errores.txt`.
//! | GET    | `/api/logs`     | SSE stream of pipeline logs              |

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Html, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::archive::{bundle, ARCHIVE_NAME};
use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{error_response, InspectResponse};
use crate::error::{PipelineResult, ServerResult};
use crate::transform::catalog::ColumnCatalog;
use crate::transform::pipeline::{convert_bytes, inspect_bytes, ConvertedBytes};
use crate::writer::{LineTerminator, OUTPUT_SUFFIX};

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Multipart field names accepted for uploaded files.
const FILE_FIELDS: [&str; 4] = ["csv", "csv[]", "file", "files"];

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9 _()\[\].-]+").expect("static regex")
});

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="es">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Arreglar Archivos CSV</title>
</head>
<body>
  <h1>Arreglar Archivos CSV</h1>
  <form method="post" action="/api/convert" enctype="multipart/form-data">
    <label for="csv">Seleccionar archivos CSV</label>
    <input id="csv" type="file" name="csv" accept=".csv,text/csv" multiple required />
    <button type="submit">Convertir</button>
  </form>
</body>
</html>
"#;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ColumnCatalog>,
    pub line_terminator: LineTerminator,
}

impl AppState {
    pub fn new(catalog: ColumnCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
            line_terminator: LineTerminator::default(),
        }
    }
}

type ApiError = (StatusCode, Json<Value>);

fn bad_request(message: impl AsRef<str>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response(message.as_ref())))
}

fn internal_error(message: impl AsRef<str>) -> ApiError {
    log_error(message.as_ref());
    (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response(message.as_ref())))
}

/// One uploaded file.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/convert", post(convert_upload))
        .route("/api/inspect", post(inspect_upload))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(port: u16, state: AppState) -> ServerResult<()> {
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Arreglar server running on http://localhost:{}", port);
    println!("   POST /api/convert - Convert a CSV file");
    println!("   POST /api/inspect - Inspect a CSV file");
    println!("   GET  /api/logs    - SSE log stream");
    println!("   GET  /health      - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "arreglar",
        "version": env!("CARGO_PKG_VERSION"),
        "catalog": state.catalog.description,
        "endpoints": {
            "convert": "POST /api/convert",
            "inspect": "POST /api/inspect",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        let entry = result.ok()?;
        let json = serde_json::to_string(&entry).ok()?;
        Some(Ok(Event::default().data(json)))
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Collect every file field of a multipart body, in order.
async fn read_uploads(mut multipart: Multipart) -> Result<Vec<Upload>, ApiError> {
    let mut uploads = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if !FILE_FIELDS.contains(&name.as_str()) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("archivo.csv").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("Read error: {e}")))?;
        uploads.push(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    if uploads.is_empty() {
        return Err(bad_request("No file provided (field \"csv\")"));
    }
    Ok(uploads)
}

fn attachment(content_type: &str, file_name: &str, body: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
        ],
        body,
    )
        .into_response()
}

async fn convert_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let uploads = read_uploads(multipart).await?;
    for upload in &uploads {
        log_info(format!("📄 Upload: {} ({} bytes)", upload.file_name, upload.bytes.len()));
    }

    let catalog = Arc::clone(&state.catalog);
    let terminator = state.line_terminator;
    let results = tokio::task::spawn_blocking(move || convert_uploads(uploads, &catalog, terminator))
        .await
        .map_err(|e| internal_error(format!("Conversion task failed: {e}")))?;

    let mut converted = Vec::new();
    let mut errors = Vec::new();
    for (upload_name, result) in results {
        match result {
            Ok(output) => converted.push((download_name(&upload_name), output.csv)),
            Err(e) => {
                log_error(format!("{upload_name}: {e}"));
                errors.push(format!("{upload_name}: {e}"));
            }
        }
    }

    if converted.is_empty() {
        return Err(bad_request(format!("Could not process CSV: {}", errors.join("; "))));
    }

    if converted.len() == 1 && errors.is_empty() {
        let (name, csv) = converted.remove(0);
        return Ok(attachment("text/csv; charset=UTF-8", &name, csv));
    }

    let archive = bundle(&converted, &errors)
        .map_err(|e| internal_error(format!("Could not build archive: {e}")))?;
    Ok(attachment("application/zip", ARCHIVE_NAME, archive))
}

/// Convert each upload independently; one failure never stops the others.
fn convert_uploads(
    uploads: Vec<Upload>,
    catalog: &ColumnCatalog,
    terminator: LineTerminator,
) -> Vec<(String, PipelineResult<ConvertedBytes>)> {
    uploads
        .into_iter()
        .map(|upload| {
            let result = convert_bytes(&upload.bytes, catalog, terminator);
            (upload.file_name, result)
        })
        .collect()
}

/// Inspect the first uploaded file.
async fn inspect_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<InspectResponse>, ApiError> {
    let Upload { file_name, bytes } = read_uploads(multipart).await?.swap_remove(0);

    let catalog = Arc::clone(&state.catalog);
    let info = tokio::task::spawn_blocking(move || inspect_bytes(&bytes, &catalog))
        .await
        .map_err(|e| internal_error(format!("Inspection task failed: {e}")))?
        .map_err(|e| bad_request(format!("Could not read CSV: {e}")))?;

    Ok(Json(InspectResponse::new(
        info,
        &state.catalog,
        download_name(&file_name),
    )))
}

/// Download name for an uploaded file: base name, last extension removed,
/// unsafe characters replaced, `_arreglado.csv` appended.
pub fn download_name(upload_name: &str) -> String {
    let base = upload_name.rsplit(['/', '\\']).next().unwrap_or(upload_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => stem,
        _ => base,
    };
    let safe = UNSAFE_FILENAME_CHARS.replace_all(stem, "_");
    let safe = if safe.is_empty() { "archivo" } else { &*safe };
    format!("{safe}{OUTPUT_SUFFIX}.csv")
}
