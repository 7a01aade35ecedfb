//! HTTP API for price uploads and exports
//!
//! - `POST /api/v0/prices?type=zip|tar` with a multipart `file` part
//! - `GET /api/v0/prices?start=&end=&min=&max=` returning a zip

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::archive::ArchiveKind;
use crate::error::{ArchiveError, Error};
use crate::models::{FilterCriteria, IngestOutcome};
use crate::pipeline;

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Download name of export archives
const EXPORT_FILENAME: &str = "prices.zip";

type ApiError = (StatusCode, String);

/// Shared application state (the process-wide database connection)
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| {
            log::error!("Database mutex poisoned");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "database unavailable".to_string(),
            )
        })
    }
}

/// Upload query parameters
#[derive(Deserialize)]
struct UploadParams {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Export query parameters, all optional
#[derive(Deserialize, Default)]
struct ExportParams {
    start: Option<String>,
    end: Option<String>,
    min: Option<String>,
    max: Option<String>,
}

/// Summary returned after an upload
#[derive(Debug, Serialize)]
struct PricesResponse {
    total_count: usize,
    inserted_count: usize,
    duplicates_count: usize,
    malformed_count: usize,
    total_items: i64,
    total_categories: i64,
    #[serde(with = "rust_decimal::serde::float")]
    total_price: Decimal,
}

impl From<IngestOutcome> for PricesResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            total_count: outcome.rows_read,
            inserted_count: outcome.inserted,
            duplicates_count: outcome.duplicates,
            malformed_count: outcome.malformed,
            total_items: outcome.totals.total_items,
            total_categories: outcome.totals.total_categories,
            total_price: outcome.totals.total_price,
        }
    }
}

/// Map a pipeline error to a status code and plain-text message
fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::Archive(ArchiveError::MemberNotFound) => StatusCode::NOT_FOUND,
        e if e.is_input_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        log::error!("Request failed: {}", err);
    } else {
        log::warn!("Request rejected: {}", err);
    }
    (status, err.to_string())
}

/// Pull the `file` part out of a multipart body
async fn read_file_part(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    let bad_request = |e: axum::extract::multipart::MultipartError| {
        log::warn!("Failed to read upload: {}", e);
        (StatusCode::BAD_REQUEST, "failed to read file".to_string())
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        if field.name() == Some("file") {
            let bytes = field.bytes().await.map_err(bad_request)?;
            return Ok(bytes.to_vec());
        }
    }

    Err((StatusCode::BAD_REQUEST, "missing file part".to_string()))
}

/// POST /api/v0/prices?type={zip|tar}
async fn post_prices_handler(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<PricesResponse>, ApiError> {
    let kind = match params.kind.as_deref().filter(|k| !k.is_empty()) {
        Some(k) => k.parse::<ArchiveKind>().map_err(|e| error_response(e.into()))?,
        None => ArchiveKind::default(),
    };

    let upload = read_file_part(&mut multipart).await?;
    log::info!("Received {} upload ({} bytes)", kind, upload.len());

    let mut conn = state.lock()?;
    let outcome = pipeline::ingest(&mut conn, kind, &upload).map_err(error_response)?;
    Ok(Json(outcome.into()))
}

/// GET /api/v0/prices?start={date}&end={date}&min={price}&max={price}
async fn get_prices_handler(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let criteria = FilterCriteria::parse(
        params.start.as_deref(),
        params.end.as_deref(),
        params.min.as_deref(),
        params.max.as_deref(),
    )
    .map_err(error_response)?;

    let archive = {
        let conn = state.lock()?;
        pipeline::export(&conn, &criteria).map_err(error_response)?
    };

    let disposition = format!("attachment; filename={}", EXPORT_FILENAME);
    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response())
}

/// Build the web server router
pub fn create_router(db: Arc<Mutex<Connection>>) -> Router {
    let state = AppState { db };

    Router::new()
        .route(
            "/api/v0/prices",
            get(get_prices_handler).post(post_prices_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 (all interfaces) and shuts down on Ctrl-C.
pub async fn serve(db: Arc<Mutex<Connection>>, port: u16) -> std::io::Result<()> {
    let app = create_router(db);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Price API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Price API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
}
