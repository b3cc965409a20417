use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::ConvertError;
use crate::format::FileFormat;
use crate::table::{ColumnKind, Table, Value};
use crate::workflow::{self, ProcessOptions, UploadedFile};

/// Read-only state shared by every handler.
pub struct AppState {
    config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        AppState { config }
    }
}

#[derive(Serialize)]
struct ColumnInfo {
    name: String,
    kind: ColumnKind,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum FilePreview {
    Ok {
        name: String,
        format: FileFormat,
        columns: Vec<ColumnInfo>,
        rows: Vec<Vec<Value>>,
        row_count: usize,
    },
    Error {
        name: String,
        kind: &'static str,
        message: String,
    },
}

#[derive(Serialize)]
struct PreviewResponse {
    files: Vec<FilePreview>,
}

#[derive(Serialize)]
struct ErrorResponse {
    status: &'static str,
    kind: &'static str,
    message: String,
}

impl IntoResponse for ConvertError {
    fn into_response(self) -> Response {
        let status = match &self {
            ConvertError::UnsupportedFormat { .. } | ConvertError::Parse { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ConvertError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ConvertError::Export { .. } | ConvertError::Chart { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse {
            status: "error",
            kind: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router; split from [`run`] so tests can drive it directly.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = match state.config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/", get(serve_index))
        .route("/api/preview", post(preview_files))
        .route("/api/convert", post(convert_file))
        .route("/api/visualize", post(visualize_file))
        .layer(body_limit)
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.bind_addr();
    let app = router(Arc::new(AppState::new(config)));

    // Start server
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("./static/index.html"))
}

async fn preview_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<PreviewResponse>, ConvertError> {
    let mut files = Vec::new();

    while let Some(field) = next_field(&mut multipart).await? {
        if field.name() != Some("files") {
            continue;
        }
        let name = field.file_name().unwrap_or("unnamed").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ConvertError::InvalidRequest(e.to_string()))?;

        let upload = UploadedFile::new(name, bytes.to_vec());
        files.push(preview_one(&upload, state.config.preview_rows));
    }

    if files.is_empty() {
        return Err(ConvertError::InvalidRequest(
            "no 'files' field in upload".to_string(),
        ));
    }

    Ok(Json(PreviewResponse { files }))
}

fn preview_one(upload: &UploadedFile, preview_rows: usize) -> FilePreview {
    match workflow::load(upload) {
        Ok((format, table)) => FilePreview::Ok {
            name: upload.name.clone(),
            format,
            columns: table
                .columns()
                .iter()
                .map(|c| ColumnInfo {
                    name: c.name.clone(),
                    kind: c.kind(),
                })
                .collect(),
            rows: preview_rows_of(&table, preview_rows),
            row_count: table.height(),
        },
        Err(e) => {
            log::warn!("Skipping {}: {}", upload.name, e);
            FilePreview::Error {
                name: upload.name.clone(),
                kind: e.kind(),
                message: e.to_string(),
            }
        }
    }
}

fn preview_rows_of(table: &Table, n: usize) -> Vec<Vec<Value>> {
    table
        .head(n)
        .rows()
        .map(|row| row.into_iter().cloned().collect())
        .collect()
}

async fn convert_file(multipart: Multipart) -> Result<Response, ConvertError> {
    let (upload, mut options) = read_single_upload(multipart).await?;
    if options.convert_to.is_none() {
        options.convert_to = Some(FileFormat::Csv);
    }
    options.visualize = false;

    let report = workflow::process_file(&upload, &options)?;
    let artifact = report.artifact.ok_or_else(|| ConvertError::Export {
        format: "output".to_string(),
        detail: "no artifact produced".to_string(),
    })?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        header_safe(&artifact.file_name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, artifact.mime_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response())
}

async fn visualize_file(multipart: Multipart) -> Result<Response, ConvertError> {
    let (upload, mut options) = read_single_upload(multipart).await?;
    options.visualize = true;
    options.convert_to = None;

    let report = workflow::process_file(&upload, &options)?;
    let visualization = report.visualization.ok_or_else(|| ConvertError::Chart {
        detail: "no chart produced".to_string(),
    })?;
    Ok(Json(visualization).into_response())
}

/// Pull the `file` and optional `options` fields out of a form.
async fn read_single_upload(
    mut multipart: Multipart,
) -> Result<(UploadedFile, ProcessOptions), ConvertError> {
    let mut upload = None;
    let mut options = ProcessOptions::default();

    while let Some(field) = next_field(&mut multipart).await? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("unnamed").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ConvertError::InvalidRequest(e.to_string()))?;
                upload = Some(UploadedFile::new(name, bytes.to_vec()));
            }
            Some("options") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ConvertError::InvalidRequest(e.to_string()))?;
                options = serde_json::from_str(&text)
                    .map_err(|e| ConvertError::InvalidRequest(format!("bad options: {e}")))?;
            }
            _ => {}
        }
    }

    let upload =
        upload.ok_or_else(|| ConvertError::InvalidRequest("no 'file' field in upload".into()))?;
    Ok((upload, options))
}

async fn next_field(
    multipart: &mut Multipart,
) -> Result<Option<axum::extract::multipart::Field<'_>>, ConvertError> {
    multipart
        .next_field()
        .await
        .map_err(|e| ConvertError::InvalidRequest(e.to_string()))
}

/// Keep a file name usable inside a quoted header value.
fn header_safe(name: &str) -> String {
    name.chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
