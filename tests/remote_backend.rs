use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

use ocean_notes::storage::RemoteNotesStore;
use ocean_notes::ui::BannerKind;
use ocean_notes::{
    BackendConfig, BackendKind, BackendSelector, NoteDraft, NotePatch, NotesBackend, NotesState,
    StorageError,
};

const API_KEY: &str = "anon-test-key";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

type Table = Arc<Mutex<Vec<Value>>>;

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "code": code, "message": message, "details": null, "hint": null })),
    )
        .into_response()
}

fn check_key(headers: &HeaderMap) -> Result<(), Response> {
    let apikey = headers.get("apikey").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if apikey == Some(API_KEY) && bearer == Some(API_KEY) {
        Ok(())
    } else {
        Err(error(StatusCode::UNAUTHORIZED, "PGRST301", "Invalid API key"))
    }
}

fn wants_single(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == SINGLE_OBJECT)
}

fn id_param(params: &HashMap<String, String>) -> Option<String> {
    params
        .get("id")
        .and_then(|v| v.strip_prefix("eq."))
        .map(str::to_string)
}

fn updated_at(row: &Value) -> DateTime<Utc> {
    row["updated_at"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_default()
}

fn no_rows() -> Response {
    error(
        StatusCode::NOT_ACCEPTABLE,
        "PGRST116",
        "JSON object requested, multiple (or no) rows returned",
    )
}

async fn select(
    State(table): State<Table>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(denied) = check_key(&headers) {
        return denied;
    }
    let rows = table.lock().unwrap().clone();

    if let Some(id) = id_param(&params) {
        let found = rows.into_iter().find(|r| r["id"] == id.as_str());
        return match found {
            Some(row) => Json(row).into_response(),
            None if wants_single(&headers) => no_rows(),
            None => Json(json!([])).into_response(),
        };
    }

    let mut rows = rows;
    rows.sort_by_key(|r| std::cmp::Reverse(updated_at(r)));
    Json(rows).into_response()
}

async fn insert(State(table): State<Table>, headers: HeaderMap, Json(row): Json<Value>) -> Response {
    if let Err(denied) = check_key(&headers) {
        return denied;
    }
    table.lock().unwrap().push(row.clone());
    (StatusCode::CREATED, Json(row)).into_response()
}

async fn modify(
    State(table): State<Table>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(changes): Json<Value>,
) -> Response {
    if let Err(denied) = check_key(&headers) {
        return denied;
    }
    let Some(id) = id_param(&params) else {
        return error(StatusCode::BAD_REQUEST, "21000", "UPDATE requires a WHERE clause");
    };

    let mut rows = table.lock().unwrap();
    let Some(row) = rows.iter_mut().find(|r| r["id"] == id.as_str()) else {
        return no_rows();
    };
    if let (Some(row), Some(changes)) = (row.as_object_mut(), changes.as_object()) {
        for (key, value) in changes {
            row.insert(key.clone(), value.clone());
        }
    }
    Json(row.clone()).into_response()
}

async fn remove(
    State(table): State<Table>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(denied) = check_key(&headers) {
        return denied;
    }
    if let Some(id) = id_param(&params) {
        table.lock().unwrap().retain(|r| r["id"] != id.as_str());
    }
    StatusCode::NO_CONTENT.into_response()
}

/// Returns rows in storage order, ignoring the `order` parameter.
async fn select_unordered(State(table): State<Table>, headers: HeaderMap) -> Response {
    if let Err(denied) = check_key(&headers) {
        return denied;
    }
    let rows = table.lock().unwrap().clone();
    Json(rows).into_response()
}

async fn missing_table() -> Response {
    error(
        StatusCode::NOT_FOUND,
        "42P01",
        "relation \"public.notes\" does not exist",
    )
}

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn mock_table() -> (String, Table) {
    let table: Table = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/rest/v1/notes",
            get(select).post(insert).patch(modify).delete(remove),
        )
        .with_state(table.clone());
    (spawn(app).await, table)
}

async fn unordered_table(rows: Vec<Value>) -> String {
    let app = Router::new()
        .route("/rest/v1/notes", get(select_unordered))
        .with_state(Arc::new(Mutex::new(rows)));
    spawn(app).await
}

async fn broken_table() -> String {
    let app = Router::new().route(
        "/rest/v1/notes",
        get(missing_table)
            .post(missing_table)
            .patch(missing_table)
            .delete(missing_table),
    );
    spawn(app).await
}

fn remote_store(base: &str, key: &str) -> RemoteNotesStore {
    RemoteNotesStore::connect(&base.parse().unwrap(), key, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_remote_crud_round_trip() {
    let (base, table) = mock_table().await;
    let store = remote_store(&base, API_KEY);

    let first = store.create(NoteDraft::new("First", "one")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = store.create(NoteDraft::new("", "")).await.unwrap();
    assert_eq!(second.title, "Untitled");
    assert_eq!(table.lock().unwrap().len(), 2);

    let listed = store.list().await.unwrap();
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);

    let fetched = store.get(&first.id).await.unwrap().unwrap();
    assert_eq!(fetched.content, "one");

    tokio::time::sleep(Duration::from_millis(5)).await;
    let updated = store
        .update(&first.id, NotePatch::content("changed"))
        .await
        .unwrap();
    assert_eq!(updated.title, "First");
    assert_eq!(updated.content, "changed");
    assert!(updated.updated_at > first.updated_at);

    store.remove(&first.id).await.unwrap();
    assert!(store.get(&first.id).await.unwrap().is_none());
    store.remove(&first.id).await.unwrap();
    assert_eq!(store.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_remote_list_sorted_when_server_ignores_order() {
    let row = |id: &str, updated_at: &str| {
        json!({ "id": id, "title": id, "content": "", "updated_at": updated_at })
    };
    let base = unordered_table(vec![
        row("oldest", "2024-06-01T08:00:00Z"),
        row("newest", "2024-06-01T12:00:00Z"),
        row("middle", "2024-06-01T10:00:00Z"),
    ])
    .await;
    let store = remote_store(&base, API_KEY);

    let ids: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(ids, vec!["newest", "middle", "oldest"]);
}

#[tokio::test]
async fn test_remote_missing_note() {
    let (base, _table) = mock_table().await;
    let store = remote_store(&base, API_KEY);

    assert!(store.get("missing").await.unwrap().is_none());
    let err = store
        .update("missing", NotePatch::title("x"))
        .await
        .unwrap_err();
    assert_eq!(err, StorageError::NotFound("missing".to_string()));
}

#[tokio::test]
async fn test_remote_rejects_bad_key() {
    let (base, _table) = mock_table().await;
    let store = remote_store(&base, "wrong-key");

    let err = store.list().await.unwrap_err();
    assert_eq!(err.message(), "Invalid API key");
}

#[tokio::test]
async fn test_state_uses_remote_backend() {
    let (base, table) = mock_table().await;
    let tmp = TempDir::new().unwrap();
    let state = NotesState::new(BackendSelector::new(
        BackendConfig::remote(base, API_KEY),
        tmp.path(),
    ));
    state.initialize().await;

    assert!(state.is_remote_backend().await);
    assert!(state.error().await.is_none());

    let note = state.create_note().await.unwrap();
    assert!(!note.is_pending());
    assert_eq!(state.selected_id().await, Some(note.id.clone()));
    assert_eq!(table.lock().unwrap().len(), 1);

    let updated = state
        .update_note(&note.id, NotePatch::title("Remote"))
        .await
        .unwrap();
    assert_eq!(updated.title, "Remote");

    state.delete_note(&note.id).await.unwrap();
    assert!(table.lock().unwrap().is_empty());
    assert!(!tmp.path().join("pnm.notes.v1.json").exists());
}

#[tokio::test]
async fn test_remote_failure_falls_back_to_local() {
    let base = broken_table().await;
    let tmp = TempDir::new().unwrap();
    let local = ocean_notes::storage::LocalNotesStore::open(tmp.path());
    let saved = local.create(NoteDraft::new("Offline", "kept")).await.unwrap();

    let state = NotesState::new(BackendSelector::new(
        BackendConfig::remote(base, API_KEY),
        tmp.path(),
    ));
    state.initialize().await;

    assert!(!state.is_remote_backend().await);
    assert_eq!(state.backend_kind().await, BackendKind::Local);

    let banner = state.error().await.unwrap();
    assert_eq!(banner.kind, BannerKind::RemoteFallback);
    assert_eq!(banner.message, "relation \"public.notes\" does not exist");

    let snapshot = state.snapshot().await;
    assert_eq!(snapshot.notes.len(), 1);
    assert_eq!(snapshot.selected_id, Some(saved.id));

    let created = state.create_note().await.unwrap();
    assert_eq!(local.list().await.unwrap()[0].id, created.id);
}
