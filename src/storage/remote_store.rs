use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{BackendKind, NotesBackend};
use crate::entity::{sort_newest_first, Note, NoteDraft, NotePatch};
use crate::error::{StorageError, StorageResult};

pub const TABLE_NAME: &str = "notes";
pub const NOTE_COLUMNS: &str = "id,title,content,updated_at";

/// PostgREST code for "the result contains 0 rows" on a single-object request.
pub const NOT_FOUND_CODE: &str = "PGRST116";

const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const RETURN_REPRESENTATION: &str = "return=representation";

/// Error payload returned by the table API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    code: Option<String>,
    #[serde(default)]
    details: Option<Value>,
}

/// Notes stored in a hosted `notes` table behind a PostgREST-style API.
pub struct RemoteNotesStore {
    client: Client,
    table_url: Url,
}

impl RemoteNotesStore {
    /// Build a client for `base_url` authenticated with `api_key`.
    ///
    /// Fails when the key is not a valid header value or the HTTP client
    /// cannot be constructed.
    pub fn connect(base_url: &Url, api_key: &str, timeout: Duration) -> StorageResult<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(api_key)
            .map_err(|e| StorageError::Unavailable(format!("invalid access key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| StorageError::Unavailable(format!("invalid access key: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let mut table_url = base_url.clone();
        {
            let mut segments = table_url
                .path_segments_mut()
                .map_err(|_| StorageError::Unavailable(format!("invalid base url: {}", base_url)))?;
            segments.pop_if_empty().extend(["rest", "v1", TABLE_NAME]);
        }

        Ok(Self { client, table_url })
    }

    pub fn table_url(&self) -> &Url {
        &self.table_url
    }

    fn single(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(ACCEPT, SINGLE_OBJECT)
    }

    async fn send(&self, request: RequestBuilder) -> StorageResult<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            return Ok(response);
        }
        Err(api_error(response).await)
    }
}

/// Translate a non-success response into a `StorageError`, keeping the backend message.
async fn api_error(response: Response) -> StorageError {
    let status = response.status();
    let text = match response.text().await {
        Ok(text) => text,
        Err(e) => return e.into(),
    };

    match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => {
            if let Some(details) = body.details.as_ref().filter(|d| !d.is_null()) {
                tracing::debug!(%status, %details, "remote api error details");
            }
            StorageError::Remote {
                message: body
                    .message
                    .unwrap_or_else(|| format!("remote request failed with {}", status)),
                code: body.code,
            }
        }
        Err(_) if text.trim().is_empty() => StorageError::Remote {
            message: format!("remote request failed with {}", status),
            code: None,
        },
        Err(_) => StorageError::Remote {
            message: text.trim().to_string(),
            code: None,
        },
    }
}

fn is_not_found(err: &StorageError) -> bool {
    matches!(err, StorageError::Remote { code: Some(code), .. } if code == NOT_FOUND_CODE)
}

fn id_filter(id: &str) -> (&'static str, String) {
    ("id", format!("eq.{}", id))
}

#[async_trait]
impl NotesBackend for RemoteNotesStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn list(&self) -> StorageResult<Vec<Note>> {
        let request = self
            .client
            .get(self.table_url.clone())
            .query(&[("select", NOTE_COLUMNS), ("order", "updated_at.desc")]);
        let mut notes: Vec<Note> = self.send(request).await?.json().await?;

        sort_newest_first(&mut notes);
        tracing::debug!(count = notes.len(), "listed remote notes");
        Ok(notes)
    }

    async fn get(&self, id: &str) -> StorageResult<Option<Note>> {
        let request = self
            .single(self.client.get(self.table_url.clone()))
            .query(&[("select", NOTE_COLUMNS.to_string()), id_filter(id)]);

        match self.send(request).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, draft: NoteDraft) -> StorageResult<Note> {
        let note = Note::new(draft, Utc::now());
        let request = self
            .single(self.client.post(self.table_url.clone()))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("select", NOTE_COLUMNS)])
            .json(&note);

        let created: Note = self.send(request).await?.json().await?;
        tracing::debug!(id = %created.id, "created remote note");
        Ok(created)
    }

    async fn update(&self, id: &str, patch: NotePatch) -> StorageResult<Note> {
        let mut body = serde_json::to_value(&patch)?;
        if let Value::Object(ref mut fields) = body {
            fields.insert("updated_at".to_string(), json!(Utc::now()));
        }

        let request = self
            .single(self.client.patch(self.table_url.clone()))
            .header("Prefer", RETURN_REPRESENTATION)
            .query(&[("select", NOTE_COLUMNS.to_string()), id_filter(id)])
            .json(&body);

        match self.send(request).await {
            Ok(response) => Ok(response.json().await?),
            Err(e) if is_not_found(&e) => Err(StorageError::NotFound(id.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn remove(&self, id: &str) -> StorageResult<()> {
        let request = self
            .client
            .delete(self.table_url.clone())
            .query(&[id_filter(id)]);
        self.send(request).await?;
        Ok(())
    }
}
