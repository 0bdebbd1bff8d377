//! Notes state store.
//!
//! Owns the canonical in-memory collection, the selection and the current
//! error banner, and bridges them to the active storage backend. Every
//! mutation runs in three phases: apply locally, await the backend, then
//! reconcile with the backend's answer or revert. The lock is released while
//! the backend call is in flight, so other operations can observe and act on
//! the optimistic state.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::entity::{is_placeholder_id, placeholder_id, sort_newest_first, Note, NoteDraft, NotePatch};
use crate::error::{NotesError, StorageError, StorageResult};
use crate::storage::{BackendKind, BackendSelector, NotesBackend};
use crate::ui::banner::ErrorBanner;

/// Point-in-time copy of everything a view renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotesSnapshot {
    pub notes: Vec<Note>,
    pub selected_id: Option<String>,
    pub loading: bool,
    pub error: Option<ErrorBanner>,
    pub backend: BackendKind,
}

struct Inner {
    backend: Arc<dyn NotesBackend>,
    selector: Option<BackendSelector>,
    notes: Vec<Note>,
    selected_id: Option<String>,
    loading: bool,
    error: Option<ErrorBanner>,
    placeholder_seq: u64,
    next_ticket: u64,
    // Newest in-flight update per note; older responses are discarded.
    update_tickets: HashMap<String, u64>,
    // Edits made to a note that has not been confirmed yet.
    queued_patches: HashMap<String, NotePatch>,
    // Placeholder id -> confirmed id, for callers still holding the old id.
    confirmed_ids: HashMap<String, String>,
    deleted_placeholders: HashSet<String>,
}

impl Inner {
    fn resolve(&self, id: &str) -> String {
        self.confirmed_ids
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|n| n.id == id)
    }

    /// Drop aliases whose confirmed note is no longer in the collection.
    fn prune_aliases(&mut self) {
        let notes = &self.notes;
        self.confirmed_ids
            .retain(|_, confirmed| notes.iter().any(|n| n.id == *confirmed));
    }

    fn set_error(&mut self, banner: ErrorBanner) {
        tracing::warn!(kind = ?banner.kind, message = %banner.message, "notes error");
        self.error = Some(banner);
    }
}

/// Cloneable handle to the shared notes state.
#[derive(Clone)]
pub struct NotesState {
    inner: Arc<Mutex<Inner>>,
}

impl NotesState {
    /// Create a state store whose backend comes from `selector`, with
    /// automatic fallback to local storage if the remote backend fails to list.
    pub fn new(selector: BackendSelector) -> Self {
        let backend = selector.select();
        Self::build(backend, Some(selector))
    }

    /// Create a state store over a fixed backend, without fallback.
    pub fn with_backend(backend: Arc<dyn NotesBackend>) -> Self {
        Self::build(backend, None)
    }

    /// Create a state store over `backend`, falling back through `selector`.
    pub fn with_fallback(backend: Arc<dyn NotesBackend>, selector: BackendSelector) -> Self {
        Self::build(backend, Some(selector))
    }

    fn build(backend: Arc<dyn NotesBackend>, selector: Option<BackendSelector>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                backend,
                selector,
                notes: Vec::new(),
                selected_id: None,
                loading: false,
                error: None,
                placeholder_seq: 0,
                next_ticket: 0,
                update_tickets: HashMap::new(),
                queued_patches: HashMap::new(),
                confirmed_ids: HashMap::new(),
                deleted_placeholders: HashSet::new(),
            })),
        }
    }

    /// Load the collection from the active backend.
    ///
    /// A remote listing failure swaps the session over to local storage and
    /// reports the remote error as a fallback banner. Any other failure is
    /// reported as a storage error. Never fails the caller.
    pub async fn initialize(&self) {
        let backend = {
            let mut inner = self.inner.lock().await;
            inner.loading = true;
            inner.backend.clone()
        };

        match backend.list().await {
            Ok(notes) => self.replace_collection(notes).await,
            Err(e) if backend.kind() == BackendKind::Remote => self.fall_back(e).await,
            Err(e) => {
                let mut inner = self.inner.lock().await;
                inner.set_error(ErrorBanner::storage(e.message()));
                inner.loading = false;
            }
        }
    }

    async fn fall_back(&self, cause: StorageError) {
        let local = {
            let mut inner = self.inner.lock().await;
            let Some(selector) = inner.selector.as_mut() else {
                inner.set_error(ErrorBanner::storage(cause.message()));
                inner.loading = false;
                return;
            };
            selector.disable_remote();
            let local = selector.select();
            inner.backend = local.clone();
            inner.set_error(ErrorBanner::remote_fallback(cause.message()));
            local
        };

        match local.list().await {
            Ok(notes) => self.replace_collection(notes).await,
            Err(e) => {
                let mut inner = self.inner.lock().await;
                inner.set_error(ErrorBanner::storage(e.message()));
                inner.loading = false;
            }
        }
    }

    async fn replace_collection(&self, mut notes: Vec<Note>) {
        sort_newest_first(&mut notes);
        let mut inner = self.inner.lock().await;

        let keep = inner
            .selected_id
            .as_ref()
            .filter(|id| notes.iter().any(|n| &&n.id == id))
            .cloned();
        inner.selected_id = keep.or_else(|| notes.first().map(|n| n.id.clone()));
        inner.notes = notes;
        inner.prune_aliases();
        inner.loading = false;
    }

    /// Create an empty note. See [`NotesState::create_note_from`].
    pub async fn create_note(&self) -> StorageResult<Note> {
        self.create_note_from(NoteDraft::default()).await
    }

    /// Insert a pending note at the head of the collection and select it,
    /// then persist it. On success the placeholder is swapped for the
    /// confirmed record; on failure it is removed and the error surfaced.
    pub async fn create_note_from(&self, draft: NoteDraft) -> StorageResult<Note> {
        let draft = draft.normalized();
        let (backend, pending_id, previous_selection) = {
            let mut inner = self.inner.lock().await;
            let now = Utc::now();
            inner.placeholder_seq += 1;
            let pending_id = placeholder_id(now, inner.placeholder_seq);

            inner.notes.insert(
                0,
                Note {
                    id: pending_id.clone(),
                    title: draft.title.clone(),
                    content: draft.content.clone(),
                    updated_at: now,
                },
            );
            let previous_selection = inner.selected_id.replace(pending_id.clone());
            (inner.backend.clone(), pending_id, previous_selection)
        };

        let created = match backend.create(draft).await {
            Ok(created) => created,
            Err(e) => {
                let mut inner = self.inner.lock().await;
                inner.notes.retain(|n| n.id != pending_id);
                inner.queued_patches.remove(&pending_id);
                inner.deleted_placeholders.remove(&pending_id);
                if inner.selected_id.as_deref() == Some(pending_id.as_str()) {
                    let restored =
                        previous_selection.filter(|id| inner.notes.iter().any(|n| &n.id == id));
                    inner.selected_id = restored;
                }
                inner.set_error(ErrorBanner::storage(e.message()));
                return Err(e);
            }
        };

        let (queued, orphaned) = {
            let mut inner = self.inner.lock().await;
            let queued = inner.queued_patches.remove(&pending_id);

            if inner.deleted_placeholders.remove(&pending_id) {
                (None, true)
            } else {
                let mut confirmed = created.clone();
                if let Some(ref patch) = queued {
                    patch.apply_to(&mut confirmed);
                }

                match inner.position(&pending_id) {
                    Some(pos) => inner.notes[pos] = confirmed,
                    None if inner.position(&created.id).is_none() => inner.notes.insert(0, confirmed),
                    None => {}
                }
                sort_newest_first(&mut inner.notes);

                if inner.selected_id.as_deref() == Some(pending_id.as_str()) {
                    inner.selected_id = Some(created.id.clone());
                }
                inner
                    .confirmed_ids
                    .insert(pending_id.clone(), created.id.clone());
                (queued, false)
            }
        };

        if orphaned {
            tracing::debug!(id = %created.id, "note deleted while pending, removing confirmed record");
            if let Err(e) = backend.remove(&created.id).await {
                self.inner
                    .lock()
                    .await
                    .set_error(ErrorBanner::storage(e.message()));
            }
            return Ok(created);
        }

        if let Some(patch) = queued {
            if let Some(updated) = self.update_note(&created.id, patch).await {
                return Ok(updated);
            }
        }

        Ok(created)
    }

    /// Apply `patch` optimistically, then persist it.
    ///
    /// Returns the backend's record on success. On failure the error is
    /// surfaced and the optimistic change stays visible. When several updates
    /// to one note overlap, the one started last wins.
    pub async fn update_note(&self, id: &str, patch: NotePatch) -> Option<Note> {
        let (backend, id, ticket) = {
            let mut inner = self.inner.lock().await;
            let id = inner.resolve(id);

            if let Some(pos) = inner.position(&id) {
                let note = &mut inner.notes[pos];
                patch.apply_to(note);
                note.updated_at = Utc::now();
                sort_newest_first(&mut inner.notes);
            }

            if is_placeholder_id(&id) {
                let merged = match inner.queued_patches.remove(&id) {
                    Some(earlier) => earlier.merge(patch),
                    None => patch,
                };
                inner.queued_patches.insert(id, merged);
                return None;
            }

            inner.next_ticket += 1;
            let ticket = inner.next_ticket;
            inner.update_tickets.insert(id.clone(), ticket);
            (inner.backend.clone(), id, ticket)
        };

        let result = backend.update(&id, patch).await;

        let mut inner = self.inner.lock().await;
        let latest = inner.update_tickets.get(&id) == Some(&ticket);
        if latest {
            inner.update_tickets.remove(&id);
        }

        match result {
            Ok(updated) => {
                if !latest {
                    tracing::debug!(%id, "discarding response of superseded update");
                } else if let Some(pos) = inner.position(&id) {
                    inner.notes[pos] = updated.clone();
                    sort_newest_first(&mut inner.notes);
                }
                Some(updated)
            }
            Err(e) => {
                inner.set_error(ErrorBanner::storage(e.message()));
                None
            }
        }
    }

    /// Remove a note optimistically, then delete it from the backend.
    ///
    /// If the selected note is removed the selection moves to its neighbour:
    /// the note that followed it in list order, else the one before it. This
    /// is not always the first remaining note. On failure the whole previous
    /// collection is restored.
    pub async fn delete_note(&self, id: &str) -> StorageResult<()> {
        let (backend, id, previous, previous_selection, new_selection) = {
            let mut inner = self.inner.lock().await;
            let id = inner.resolve(id);
            let previous = inner.notes.clone();
            let previous_selection = inner.selected_id.clone();

            if let Some(pos) = inner.position(&id) {
                inner.notes.remove(pos);
                if inner.selected_id.as_deref() == Some(id.as_str()) {
                    let next = inner
                        .notes
                        .get(pos)
                        .or_else(|| pos.checked_sub(1).and_then(|p| inner.notes.get(p)))
                        .map(|n| n.id.clone());
                    inner.selected_id = next;
                }
            }
            inner.update_tickets.remove(&id);

            if is_placeholder_id(&id) {
                inner.queued_patches.remove(&id);
                inner.deleted_placeholders.insert(id);
                return Ok(());
            }

            let new_selection = inner.selected_id.clone();
            (inner.backend.clone(), id, previous, previous_selection, new_selection)
        };

        if let Err(e) = backend.remove(&id).await {
            let mut inner = self.inner.lock().await;
            inner.notes = previous;
            if inner.selected_id == new_selection {
                inner.selected_id = previous_selection;
            }
            inner.set_error(ErrorBanner::storage(e.message()));
            return Err(e);
        }

        self.inner
            .lock()
            .await
            .confirmed_ids
            .retain(|_, confirmed| *confirmed != id);
        tracing::debug!(%id, "note deleted");
        Ok(())
    }

    /// Change the selection. No backend interaction.
    pub async fn select_note(&self, id: Option<&str>) {
        let mut inner = self.inner.lock().await;
        let id = id.map(|id| inner.resolve(id));
        inner.selected_id = id;
    }

    pub async fn clear_error(&self) {
        self.inner.lock().await.error = None;
    }

    pub async fn snapshot(&self) -> NotesSnapshot {
        let inner = self.inner.lock().await;
        NotesSnapshot {
            notes: inner.notes.clone(),
            selected_id: inner.selected_id.clone(),
            loading: inner.loading,
            error: inner.error.clone(),
            backend: inner.backend.kind(),
        }
    }

    pub async fn notes(&self) -> Vec<Note> {
        self.inner.lock().await.notes.clone()
    }

    pub async fn note(&self, id: &str) -> Option<Note> {
        let inner = self.inner.lock().await;
        let id = inner.resolve(id);
        inner.notes.iter().find(|n| n.id == id).cloned()
    }

    pub async fn selected_id(&self) -> Option<String> {
        self.inner.lock().await.selected_id.clone()
    }

    pub async fn selected_note(&self) -> Option<Note> {
        let inner = self.inner.lock().await;
        let id = inner.selected_id.as_ref()?;
        inner.notes.iter().find(|n| &n.id == id).cloned()
    }

    pub async fn is_remote_backend(&self) -> bool {
        self.inner.lock().await.backend.kind() == BackendKind::Remote
    }

    pub async fn backend_kind(&self) -> BackendKind {
        self.inner.lock().await.backend.kind()
    }

    pub async fn is_loading(&self) -> bool {
        self.inner.lock().await.loading
    }

    pub async fn error(&self) -> Option<ErrorBanner> {
        self.inner.lock().await.error.clone()
    }

    /// Resolve a full id or a unique id prefix to a note id.
    pub async fn resolve_id(&self, input: &str) -> crate::Result<String> {
        let inner = self.inner.lock().await;
        let input = inner.resolve(input.trim());

        if inner.position(&input).is_some() {
            return Ok(input);
        }

        let mut matches = inner.notes.iter().filter(|n| n.id.starts_with(&input));
        match (matches.next(), matches.next()) {
            (Some(note), None) if !input.is_empty() => Ok(note.id.clone()),
            (Some(_), Some(_)) => Err(NotesError::AmbiguousId(input)),
            _ => Err(NotesError::NoteNotFound(input)),
        }
    }
}
