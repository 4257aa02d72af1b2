//! HTTP routes: the upload/list/delete API and serving of extracted projects.

use crate::state::AppState;
use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Multipart, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use registry::{ProjectRecord, RegistryError};
use serde::Deserialize;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Build the application router.
pub fn router(state: AppState, max_upload: usize) -> Router {
    Router::new()
        .route(
            "/api/upload",
            post(upload).layer(DefaultBodyLimit::max(max_upload)),
        )
        .route("/api/list", get(list))
        .route("/api/delete", get(delete))
        .route("/project/*rest", get(render_project))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error response: a status code and a plain-text message.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, message.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        let status = match &e {
            RegistryError::MissingName
            | RegistryError::ProjectExists(_)
            | RegistryError::SizeMismatch { .. } => StatusCode::BAD_REQUEST,
            RegistryError::ProjectNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %e, "Request failed");
        }
        Self(status, e.to_string())
    }
}

/// Fields of the upload form
#[derive(Debug, Default)]
struct UploadForm {
    action: String,
    id: String,
    name: String,
    desc: String,
    file: Option<UploadedFile>,
}

#[derive(Debug)]
struct UploadedFile {
    content_type: String,
    data: Bytes,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.body_text()))?
        {
            let field_name = field.name().unwrap_or_default().to_string();
            if field_name == "file" {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.body_text()))?;
                // Browsers send an empty part when no file was picked
                if !data.is_empty() {
                    form.file = Some(UploadedFile { content_type, data });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            match field_name.as_str() {
                "action" => form.action = value,
                "id" => form.id = value,
                "name" => form.name = value,
                "desc" => form.desc = value,
                _ => {}
            }
        }
        Ok(form)
    }

    /// The uploaded archive, if it is one.
    fn archive(&self) -> Result<Option<&UploadedFile>, ApiError> {
        match &self.file {
            Some(file) if !file.content_type.contains("zip") => {
                Err(ApiError::bad_request("Only zip files are accepted"))
            }
            other => Ok(other.as_ref()),
        }
    }
}

/// Add a new project or update an existing one
async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ProjectRecord>, ApiError> {
    let form = UploadForm::read(multipart).await?;
    if form.name.trim().is_empty() {
        return Err(ApiError::bad_request("project name is required"));
    }

    let service = state.service.clone();
    let record = match form.action.as_str() {
        "add" => {
            let archive = form
                .archive()?
                .ok_or_else(|| ApiError::bad_request("a zip file is required"))?
                .data
                .clone();
            blocking(move || service.create(&form.name, &form.desc, &archive)).await??
        }
        "update" => {
            let archive = form.archive()?.map(|file| file.data.clone());
            blocking(move || service.update(&form.id, &form.name, &form.desc, archive.as_deref()))
                .await??
        }
        _ => return Err(ApiError::bad_request("action can not be empty")),
    };
    Ok(Json(record))
}

/// All projects, most recently written first
async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProjectRecord>>, ApiError> {
    let service = state.service.clone();
    Ok(Json(blocking(move || service.list()).await?))
}

#[derive(Debug, Deserialize)]
struct DeleteParams {
    #[serde(default)]
    id: String,
}

/// Remove a project and its files
async fn delete(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    let service = state.service.clone();
    blocking(move || service.remove(&params.id)).await??;
    Ok(StatusCode::OK)
}

/// Serve `/project/{id}/{file}` from the project's extracted tree
async fn render_project(State(state): State<AppState>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let rest = path.strip_prefix("/project/").unwrap_or_default();
    let (id, file) = match rest.find('/') {
        Some(at) => rest.split_at(at),
        None => (rest, ""),
    };

    let service = state.service.clone();
    let lookup = id.to_string();
    let dir = match blocking(move || service.project_dir(&lookup)).await {
        Ok(Some(dir)) => dir,
        Ok(None) => return (StatusCode::NOT_FOUND, "Project not found").into_response(),
        Err(e) => return e.into_response(),
    };
    if file.is_empty() {
        return found(&format!("{path}/"));
    }
    let file = if file == "/" { "/index.html" } else { file };

    let (mut parts, body) = req.into_parts();
    parts.uri = match file.parse() {
        Ok(uri) => uri,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };
    serve_dir(ServeDir::new(dir), Request::from_parts(parts, body)).await
}

/// `/{id}` jumps to the project; anything else is a front-end asset
async fn fallback(State(state): State<AppState>, req: Request) -> Response {
    let name = req.uri().path().trim_start_matches('/').to_string();
    if !name.is_empty() {
        let service = state.service.clone();
        let lookup = name.clone();
        match blocking(move || service.get(&lookup).is_some()).await {
            Ok(true) => return found(&format!("/project/{name}/")),
            Ok(false) => {}
            Err(e) => return e.into_response(),
        }
    }
    serve_dir(ServeDir::new(&state.web_dir), req).await
}

/// Runs a registry call off the async workers; writers hold the registry
/// lock through the snapshot fsync.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!(error = %e, "Registry task failed");
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

async fn serve_dir(dir: ServeDir, req: Request<Body>) -> Response {
    match dir.oneshot(req).await {
        Ok(res) => res.into_response(),
        Err(never) => match never {},
    }
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
