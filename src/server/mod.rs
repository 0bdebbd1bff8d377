//! HTTP surface over the notes state store, for browser front ends.

use std::net::SocketAddr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::entity::{Note, NoteDraft, NotePatch};
use crate::error::{NotesError, StorageError};
use crate::markdown;
use crate::state::NotesState;
use crate::storage::BackendKind;
use crate::ui::banner::{format_banner, ErrorBanner};
use crate::ui::sidebar::filter_notes;

pub const DEFAULT_BIND: &str = "127.0.0.1:4280";

pub fn router(state: NotesState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/status", get(status))
        .route("/api/notes", get(list_notes).post(create_note))
        .route(
            "/api/notes/{id}",
            get(get_note).patch(update_note).delete(delete_note),
        )
        .route("/api/notes/{id}/preview", get(preview_note))
        .route("/api/selection", put(select_note))
        .route("/api/error", axum::routing::delete(clear_error))
        .with_state(state)
}

/// Serve the router on `addr` until Ctrl-C.
pub async fn serve(state: NotesState, addr: SocketAddr) -> crate::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "HTTP server listening");
    println!("Serving notes on http://{}", local_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    backend: BackendKind,
    is_remote: bool,
    loading: bool,
    selected_id: Option<String>,
    error: Option<ErrorBanner>,
    banner: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SelectionRequest {
    id: Option<String>,
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn status(State(state): State<NotesState>) -> Json<StatusResponse> {
    let snapshot = state.snapshot().await;
    Json(StatusResponse {
        backend: snapshot.backend,
        is_remote: snapshot.backend == BackendKind::Remote,
        loading: snapshot.loading,
        selected_id: snapshot.selected_id,
        banner: snapshot.error.as_ref().map(format_banner),
        error: snapshot.error,
    })
}

async fn list_notes(
    State(state): State<NotesState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<Note>> {
    let notes = state.notes().await;
    let query = query.q.unwrap_or_default();
    Json(filter_notes(&notes, &query).into_iter().cloned().collect())
}

async fn create_note(
    State(state): State<NotesState>,
    Json(draft): Json<NoteDraft>,
) -> Result<(StatusCode, Json<Note>), ApiError> {
    let note = state.create_note_from(draft).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

async fn get_note(
    State(state): State<NotesState>,
    Path(id): Path<String>,
) -> Result<Json<Note>, ApiError> {
    let id = state.resolve_id(&id).await?;
    let Some(note) = state.note(&id).await else {
        return Err(NotesError::NoteNotFound(id).into());
    };
    Ok(Json(note))
}

async fn update_note(
    State(state): State<NotesState>,
    Path(id): Path<String>,
    Json(patch): Json<NotePatch>,
) -> Result<Json<Note>, ApiError> {
    let id = state.resolve_id(&id).await?;
    match state.update_note(&id, patch).await {
        Some(note) => Ok(Json(note)),
        None => Err(last_error(&state).await),
    }
}

async fn delete_note(
    State(state): State<NotesState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = state.resolve_id(&id).await?;
    state.delete_note(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn preview_note(
    State(state): State<NotesState>,
    Path(id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let id = state.resolve_id(&id).await?;
    let Some(note) = state.note(&id).await else {
        return Err(NotesError::NoteNotFound(id).into());
    };
    Ok(Html(markdown::render(&note.content)))
}

async fn select_note(
    State(state): State<NotesState>,
    Json(req): Json<SelectionRequest>,
) -> Result<StatusCode, ApiError> {
    let id = match req.id {
        Some(id) => Some(state.resolve_id(&id).await?),
        None => None,
    };
    state.select_note(id.as_deref()).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_error(State(state): State<NotesState>) -> StatusCode {
    state.clear_error().await;
    StatusCode::NO_CONTENT
}

/// The update path reports failures only through the banner.
async fn last_error(state: &NotesState) -> ApiError {
    match state.error().await {
        Some(banner) => ApiError::new(StatusCode::BAD_GATEWAY, "storage_error", banner.message),
        None => ApiError::new(
            StatusCode::ACCEPTED,
            "pending",
            "update queued until the note is saved",
        ),
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: String,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_code: String,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let (status, code) = match &err {
            StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            StorageError::WriteRejected(_) => (StatusCode::INTERNAL_SERVER_ERROR, "write_rejected"),
            StorageError::Malformed(_) => (StatusCode::BAD_GATEWAY, "malformed"),
            StorageError::Unavailable(_) | StorageError::Remote { .. } => {
                (StatusCode::BAD_GATEWAY, "storage_error")
            }
        };
        ApiError::new(status, code, err.message())
    }
}

impl From<NotesError> for ApiError {
    fn from(err: NotesError) -> Self {
        match err {
            NotesError::NoteNotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "not_found", err.to_string())
            }
            NotesError::AmbiguousId(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "ambiguous_id", err.to_string())
            }
            NotesError::Storage(e) => e.into(),
            other => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                other.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
