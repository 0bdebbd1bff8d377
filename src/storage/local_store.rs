use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use super::{BackendKind, NotesBackend};
use crate::entity::{sort_newest_first, Note, NoteDraft, NotePatch};
use crate::error::{StorageError, StorageResult};

/// Key of the single slot that holds the whole collection.
pub const STORAGE_KEY: &str = "pnm.notes.v1";

/// Notes persisted as one JSON array in a file named after [`STORAGE_KEY`].
///
/// Every operation reads the whole array, mutates it and writes it back.
pub struct LocalNotesStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl LocalNotesStore {
    /// Open the store rooted at `data_dir`. Nothing is touched on disk until the first write.
    pub fn open(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{}.json", STORAGE_KEY)),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> StorageResult<Vec<Note>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            StorageError::Malformed(format!("{}: {}", self.path.display(), e))
        })
    }

    fn write_all(&self, notes: &[Note]) -> StorageResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }

        let bytes = serde_json::to_vec(notes)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, bytes).map_err(|e| StorageError::WriteRejected(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StorageError::WriteRejected(e.to_string()))?;
        Ok(())
    }
}

/// A timestamp strictly newer than every note in `notes`.
fn next_timestamp(notes: &[Note]) -> DateTime<Utc> {
    let now = Utc::now();
    match notes.iter().map(|n| n.updated_at).max() {
        Some(latest) if latest >= now => latest + Duration::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl NotesBackend for LocalNotesStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn list(&self) -> StorageResult<Vec<Note>> {
        let _guard = self.lock.lock().await;
        let mut notes = self.read_all()?;
        sort_newest_first(&mut notes);
        Ok(notes)
    }

    async fn get(&self, id: &str) -> StorageResult<Option<Note>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all()?.into_iter().find(|n| n.id == id))
    }

    async fn create(&self, draft: NoteDraft) -> StorageResult<Note> {
        let _guard = self.lock.lock().await;
        let mut notes = self.read_all()?;

        let note = Note::new(draft, next_timestamp(&notes));
        notes.push(note.clone());
        self.write_all(&notes)?;

        tracing::debug!(id = %note.id, "created local note");
        Ok(note)
    }

    async fn update(&self, id: &str, patch: NotePatch) -> StorageResult<Note> {
        let _guard = self.lock.lock().await;
        let mut notes = self.read_all()?;

        let updated_at = next_timestamp(&notes);
        let note = notes
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        patch.apply_to(note);
        note.updated_at = updated_at;
        let note = note.clone();

        self.write_all(&notes)?;
        Ok(note)
    }

    async fn remove(&self, id: &str) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut notes = self.read_all()?;

        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            tracing::debug!(id, "remove of unknown local note ignored");
        }

        self.write_all(&notes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, LocalNotesStore) {
        let tmp = TempDir::new().unwrap();
        let store = LocalNotesStore::open(tmp.path());
        (tmp, store)
    }

    #[tokio::test]
    async fn test_list_missing_file_is_empty() {
        let (_tmp, store) = store();
        assert!(store.list().await.unwrap().is_empty());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_create_normalizes_empty_fields() {
        let (_tmp, store) = store();
        let note = store.create(NoteDraft::default()).await.unwrap();
        assert_eq!(note.title, "Untitled");
        assert_eq!(note.content, "");

        let stored = store.get(&note.id).await.unwrap().unwrap();
        assert_eq!(stored, note);
    }

    #[tokio::test]
    async fn test_collection_stored_under_fixed_key() {
        let (tmp, store) = store();
        store.create(NoteDraft::new("a", "b")).await.unwrap();

        let raw = fs::read_to_string(tmp.path().join("pnm.notes.v1.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 1);
        let obj = items[0].as_object().unwrap();
        for field in ["id", "title", "content", "updated_at"] {
            assert!(obj.contains_key(field), "missing {}", field);
        }
    }

    #[tokio::test]
    async fn test_list_sorted_newest_first() {
        let (_tmp, store) = store();
        let a = store.create(NoteDraft::new("a", "")).await.unwrap();
        let b = store.create(NoteDraft::new("b", "")).await.unwrap();
        let c = store.create(NoteDraft::new("c", "")).await.unwrap();
        store.update(&a.id, NotePatch::content("touched")).await.unwrap();

        let ids: Vec<_> = store.list().await.unwrap().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![a.id, c.id, b.id]);
    }

    #[tokio::test]
    async fn test_list_sorts_unsorted_file() {
        let (tmp, store) = store();
        let raw = r#"[
            {"id":"1","title":"old","content":"","updated_at":"2024-01-01T00:00:00Z"},
            {"id":"2","title":"new","content":"","updated_at":"2024-03-01T00:00:00.000Z"},
            {"id":"3","title":"mid","content":"","updated_at":"2024-02-01T00:00:00+00:00"}
        ]"#;
        fs::write(tmp.path().join("pnm.notes.v1.json"), raw).unwrap();

        let titles: Vec<_> = store.list().await.unwrap().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp_and_merges() {
        let (_tmp, store) = store();
        let note = store.create(NoteDraft::new("title", "body")).await.unwrap();
        let updated = store.update(&note.id, NotePatch::title("renamed")).await.unwrap();

        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.content, "body");
        assert!(updated.updated_at > note.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (_tmp, store) = store();
        let err = store.update("nope", NotePatch::title("x")).await.unwrap_err();
        assert_eq!(err, StorageError::NotFound("nope".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let (_tmp, store) = store();
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (_tmp, store) = store();
        let note = store.create(NoteDraft::default()).await.unwrap();
        store.remove(&note.id).await.unwrap();
        store.remove(&note.id).await.unwrap();
        store.remove("never-existed").await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_size_tracks_creates_minus_deletes() {
        let (_tmp, store) = store();
        let mut live = Vec::new();
        for i in 0..6 {
            let note = store.create(NoteDraft::new(format!("n{}", i), "")).await.unwrap();
            live.push(note.id);
            if i % 2 == 1 {
                let id = live.remove(0);
                store.remove(&id).await.unwrap();
            }
            if let Some(id) = live.last() {
                store.update(id, NotePatch::content("edit")).await.unwrap();
            }
        }
        assert_eq!(store.list().await.unwrap().len(), 3);
        assert_eq!(live.len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_file_is_error() {
        let (tmp, store) = store();
        fs::write(tmp.path().join("pnm.notes.v1.json"), "{not json").unwrap();

        let err = store.list().await.unwrap_err();
        assert!(matches!(err, StorageError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let (tmp, store) = store();
        let note = store.create(NoteDraft::new("keep", "me")).await.unwrap();
        drop(store);

        let reopened = LocalNotesStore::open(tmp.path());
        assert_eq!(reopened.list().await.unwrap(), vec![note]);
    }
}
