//! Document store
//!
//! `DocumentStore` is the only writer of the document collection. It is
//! constructed once per surface and handed to whoever needs it.
//!
//! Every mutation is a whole-collection read-modify-write through the
//! backend. There is no version check, so two processes writing the same
//! collection resolve as last-writer-wins.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = DocumentStore::open()?;
//!
//! let doc = store.add_document(NewDocument::manual("Notes", "# Notes"))?;
//! store.update_last_read_time(&doc.id)?;
//!
//! let last = store.get_last_read_document()?;
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Document, DocumentPatch, DocumentSource, NewDocument};
use crate::storage::{DocumentBackend, JsonFileBackend};

/// Length of the random part of a document id
const ID_SUFFIX_LEN: usize = 7;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Wall clock that never runs backwards within one store
#[derive(Debug, Default)]
struct MonotonicClock {
    last: i64,
}

impl MonotonicClock {
    fn now(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis().max(self.last);
        self.last = now;
        now
    }
}

/// Owner of the document collection
pub struct DocumentStore<B: DocumentBackend = JsonFileBackend> {
    backend: B,
    clock: MonotonicClock,
}

impl DocumentStore<JsonFileBackend> {
    /// Open the store at the configured location
    pub fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Ok(Self::open_with_config(&config))
    }

    /// Open the store with a specific configuration
    pub fn open_with_config(config: &Config) -> Self {
        Self::with_backend(JsonFileBackend::from_config(config))
    }
}

impl<B: DocumentBackend> DocumentStore<B> {
    /// Wrap an arbitrary backend
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            clock: MonotonicClock::default(),
        }
    }

    /// Get the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn load(&self) -> Result<Vec<Document>> {
        self.backend
            .load_all()
            .context("Failed to load documents")
    }

    fn save(&mut self, documents: &[Document]) -> Result<()> {
        self.backend
            .save_all(documents)
            .context("Failed to save documents")
    }

    // ==================== Mutations ====================

    /// Create a document from `input` and persist it
    pub fn add_document(&mut self, input: NewDocument) -> Result<Document> {
        let source_url = match input.source {
            DocumentSource::Manual => {
                if input.source_url.is_some() {
                    debug!("Dropping source URL from manual document");
                }
                None
            }
            DocumentSource::Web => Some(
                input
                    .source_url
                    .filter(|url| !url.trim().is_empty())
                    .context("Web documents need a source URL")?,
            ),
        };

        let mut documents = self.load()?;
        let now = self.clock.now();
        let id = unused_id(now, &documents);

        let document = Document {
            id,
            title: input.title,
            content: input.content,
            created_at: now,
            updated_at: now,
            last_read_time: input.last_read_time,
            source: input.source,
            source_url,
        };

        documents.push(document.clone());
        self.save(&documents)?;

        info!(id = %document.id, source = %document.source, "Added document");
        Ok(document)
    }

    /// Merge `patch` into the document with `id`
    ///
    /// Returns `None` (and writes nothing) when the id is unknown.
    pub fn update_document(&mut self, id: &str, patch: DocumentPatch) -> Result<Option<Document>> {
        let mut documents = self.load()?;
        let Some(document) = documents.iter_mut().find(|d| d.id == id) else {
            debug!(id, "Update skipped, document not found");
            return Ok(None);
        };

        patch.apply(document);
        document.updated_at = self.clock.now().max(document.created_at);
        let updated = document.clone();

        self.save(&documents)?;
        debug!(id, "Updated document");
        Ok(Some(updated))
    }

    /// Remove the document with `id`
    ///
    /// Returns whether a document was removed. Nothing is written otherwise.
    pub fn delete_document(&mut self, id: &str) -> Result<bool> {
        let mut documents = self.load()?;
        let before = documents.len();
        documents.retain(|d| d.id != id);

        if documents.len() == before {
            return Ok(false);
        }

        self.save(&documents)?;
        info!(id, "Deleted document");
        Ok(true)
    }

    /// Replace the collection with an empty one
    pub fn clear_all_documents(&mut self) -> Result<()> {
        self.save(&[])?;
        info!("Cleared all documents");
        Ok(())
    }

    /// Stamp the document as read now
    pub fn update_last_read_time(&mut self, id: &str) -> Result<bool> {
        let now = self.clock.now();
        Ok(self
            .update_document(id, DocumentPatch::last_read_time(now))?
            .is_some())
    }

    // ==================== Queries ====================

    /// Get all documents, in storage order
    pub fn get_documents(&self) -> Result<Vec<Document>> {
        self.load()
    }

    /// Get a document by ID
    pub fn get_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.load()?.into_iter().find(|d| d.id == id))
    }

    /// Number of stored documents
    pub fn get_document_count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    /// Case-insensitive substring search over title and content
    ///
    /// A blank query matches nothing.
    pub fn search_documents(&self, query: &str) -> Result<Vec<Document>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let needle = query.to_lowercase();
        Ok(self
            .load()?
            .into_iter()
            .filter(|d| d.matches_lowercase(&needle))
            .collect())
    }

    /// Documents with the given provenance
    pub fn get_documents_by_source(&self, source: DocumentSource) -> Result<Vec<Document>> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|d| d.source == source)
            .collect())
    }

    /// The most recently read document, if any was ever read
    ///
    /// Equal read times are broken by the greater id.
    pub fn get_last_read_document(&self) -> Result<Option<Document>> {
        Ok(self
            .load()?
            .into_iter()
            .filter_map(|d| Some((d.last_read_time?, d)))
            .max_by(|(ta, a), (tb, b)| ta.cmp(tb).then_with(|| a.id.cmp(&b.id)))
            .map(|(_, d)| d))
    }

    /// Up to `limit` documents, most recently updated first
    pub fn get_recent_documents(&self, limit: usize) -> Result<Vec<Document>> {
        let mut documents = self.load()?;
        documents.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        documents.truncate(limit);
        Ok(documents)
    }
}

/// Draw ids until one is not already taken
fn unused_id(now: i64, existing: &[Document]) -> String {
    unused_id_with(now, existing, random_suffix)
}

fn unused_id_with(
    now: i64,
    existing: &[Document],
    mut suffix: impl FnMut() -> String,
) -> String {
    loop {
        let id = format!("{}-{}", now, suffix());
        if !existing.iter().any(|d| d.id == id) {
            return id;
        }
        debug!(%id, "Generated id collided, drawing again");
    }
}

fn random_suffix() -> String {
    let mut bits = Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(ID_SUFFIX_LEN);
    for _ in 0..ID_SUFFIX_LEN {
        suffix.push(BASE36[(bits % 36) as usize] as char);
        bits /= 36;
    }
    suffix
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn memory_store() -> DocumentStore<MemoryBackend> {
        DocumentStore::with_backend(MemoryBackend::new())
    }

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_add_sets_timestamps_and_id() {
        let mut store = memory_store();

        let doc = store
            .add_document(NewDocument::manual("Rust", "Ownership"))
            .unwrap();

        assert_eq!(doc.created_at, doc.updated_at);
        assert!(doc.last_read_time.is_none());
        assert_eq!(doc.source, DocumentSource::Manual);

        let (millis, suffix) = doc.id.split_once('-').unwrap();
        assert_eq!(millis.parse::<i64>().unwrap(), doc.created_at);
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut store = memory_store();
        let mut seen = HashSet::new();

        for i in 0..200 {
            let doc = store
                .add_document(NewDocument::manual(format!("Doc {}", i), "body"))
                .unwrap();
            assert!(seen.insert(doc.id), "duplicate id generated");
        }
        assert_eq!(store.get_document_count().unwrap(), 200);
    }

    #[test]
    fn test_unused_id_uses_timestamp_prefix() {
        let id = unused_id(5, &[]);
        assert!(id.starts_with("5-"));
        assert_eq!(id.len(), 2 + ID_SUFFIX_LEN);
    }

    #[test]
    fn test_unused_id_redraws_on_collision() {
        let mut store = memory_store();
        let taken = store
            .add_document(NewDocument::manual("Taken", "body"))
            .unwrap();
        let documents = store.get_documents().unwrap();
        let (millis, taken_suffix) = taken.id.split_once('-').unwrap();
        let now: i64 = millis.parse().unwrap();

        let mut draws = vec!["fresh00".to_string(), taken_suffix.to_string()];
        let mut calls = 0;
        let id = unused_id_with(now, &documents, || {
            calls += 1;
            draws.pop().unwrap()
        });

        assert_eq!(calls, 2);
        assert_eq!(id, format!("{}-fresh00", now));
        assert_ne!(id, taken.id);
    }

    #[test]
    fn test_manual_document_drops_source_url() {
        let mut store = memory_store();
        let mut input = NewDocument::manual("Notes", "body");
        input.source_url = Some("https://example.com/stray".to_string());

        let doc = store.add_document(input).unwrap();

        assert_eq!(doc.source, DocumentSource::Manual);
        assert!(doc.source_url.is_none());
        let stored = store.get_document(&doc.id).unwrap().unwrap();
        assert!(stored.source_url.is_none());
    }

    #[test]
    fn test_web_document_requires_source_url() {
        let mut store = memory_store();
        let mut input = NewDocument::web("Article", "body", "https://example.com/a");
        input.source_url = None;

        let err = store.add_document(input).unwrap_err();

        assert!(err.to_string().contains("source URL"));
        assert_eq!(store.get_document_count().unwrap(), 0);
        assert_eq!(store.backend().write_count(), 0);
    }

    #[test]
    fn test_add_and_get_round_trip() {
        let mut store = memory_store();

        let created = store
            .add_document(NewDocument::web(
                "Article",
                "# Article",
                "https://example.com/a",
            ))
            .unwrap();

        let fetched = store.get_document(&created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.source_url.as_deref(), Some("https://example.com/a"));
    }

    #[test]
    fn test_get_documents_empty() {
        let store = memory_store();
        assert!(store.get_documents().unwrap().is_empty());
        assert!(store.get_document("missing").unwrap().is_none());
    }

    #[test]
    fn test_update_document() {
        let mut store = memory_store();
        let doc = store
            .add_document(NewDocument::manual("Draft", "v1"))
            .unwrap();

        let updated = store
            .update_document(
                &doc.id,
                DocumentPatch {
                    title: Some("Final".to_string()),
                    content: Some("v2".to_string()),
                    last_read_time: None,
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "Final");
        assert_eq!(updated.content, "v2");
        assert_eq!(updated.created_at, doc.created_at);
        assert!(updated.updated_at >= updated.created_at);
        assert_eq!(store.get_document(&doc.id).unwrap().unwrap(), updated);
    }

    #[test]
    fn test_missing_id_is_not_found_and_unchanged() {
        let mut store = memory_store();
        store
            .add_document(NewDocument::manual("Keep", "me"))
            .unwrap();
        let before = store.get_documents().unwrap();
        let writes = store.backend().write_count();

        assert!(store
            .update_document("nope", DocumentPatch::title("x"))
            .unwrap()
            .is_none());
        assert!(!store.delete_document("nope").unwrap());
        assert!(!store.update_last_read_time("nope").unwrap());

        assert_eq!(store.get_documents().unwrap(), before);
        assert_eq!(store.backend().write_count(), writes);
    }

    #[test]
    fn test_delete_document() {
        let mut store = memory_store();
        let a = store.add_document(NewDocument::manual("A", "a")).unwrap();
        let b = store.add_document(NewDocument::manual("B", "b")).unwrap();

        assert!(store.delete_document(&a.id).unwrap());
        assert!(store.get_document(&a.id).unwrap().is_none());
        assert_eq!(store.get_documents().unwrap(), vec![b]);
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let mut store = memory_store();
        store.add_document(NewDocument::manual("A", "a")).unwrap();
        store.add_document(NewDocument::manual("B", "b")).unwrap();

        store.clear_all_documents().unwrap();
        assert_eq!(store.get_document_count().unwrap(), 0);

        store.clear_all_documents().unwrap();
        assert_eq!(store.get_document_count().unwrap(), 0);
        assert!(store.get_documents().unwrap().is_empty());
    }

    #[test]
    fn test_search_documents() {
        let mut store = memory_store();
        let in_title = store
            .add_document(NewDocument::manual("Zebra-Token notes", "plain"))
            .unwrap();
        let in_content = store
            .add_document(NewDocument::manual("Other", "mentions zebra-token here"))
            .unwrap();
        store
            .add_document(NewDocument::manual("Unrelated", "nothing to see"))
            .unwrap();

        let results = store.search_documents("ZEBRA-TOKEN").unwrap();
        let ids: HashSet<_> = results.iter().map(|d| d.id.clone()).collect();

        assert_eq!(results.len(), 2);
        assert!(ids.contains(&in_title.id));
        assert!(ids.contains(&in_content.id));
    }

    #[test]
    fn test_search_blank_query_returns_nothing() {
        let mut store = memory_store();
        store.add_document(NewDocument::manual("A", "a")).unwrap();

        assert!(store.search_documents("").unwrap().is_empty());
        assert!(store.search_documents("   ").unwrap().is_empty());
    }

    #[test]
    fn test_get_documents_by_source() {
        let mut store = memory_store();
        store.add_document(NewDocument::manual("Typed", "t")).unwrap();
        let web = store
            .add_document(NewDocument::web("Fetched", "f", "https://example.com"))
            .unwrap();

        let webs = store.get_documents_by_source(DocumentSource::Web).unwrap();
        assert_eq!(webs, vec![web]);

        let manuals = store
            .get_documents_by_source(DocumentSource::Manual)
            .unwrap();
        assert_eq!(manuals.len(), 1);
        assert_eq!(manuals[0].title, "Typed");
    }

    #[test]
    fn test_last_read_none_when_never_read() {
        let mut store = memory_store();
        store.add_document(NewDocument::manual("A", "a")).unwrap();

        assert!(store.get_last_read_document().unwrap().is_none());
    }

    #[test]
    fn test_last_read_picks_max_read_time() {
        let mut store = memory_store();
        let a = store.add_document(NewDocument::manual("A", "a")).unwrap();
        let b = store.add_document(NewDocument::manual("B", "b")).unwrap();
        let c = store.add_document(NewDocument::manual("C", "c")).unwrap();

        store
            .update_document(&a.id, DocumentPatch::last_read_time(3_000))
            .unwrap();
        store
            .update_document(&b.id, DocumentPatch::last_read_time(9_000))
            .unwrap();
        store
            .update_document(&c.id, DocumentPatch::last_read_time(5_000))
            .unwrap();

        let last = store.get_last_read_document().unwrap().unwrap();
        assert_eq!(last.id, b.id);
    }

    #[test]
    fn test_last_read_tie_breaks_on_id() {
        let mut store = memory_store();
        let a = store.add_document(NewDocument::manual("A", "a")).unwrap();
        let b = store.add_document(NewDocument::manual("B", "b")).unwrap();

        for id in [&a.id, &b.id] {
            store
                .update_document(id, DocumentPatch::last_read_time(1_000))
                .unwrap();
        }

        let expected = std::cmp::max(a.id.clone(), b.id.clone());
        let last = store.get_last_read_document().unwrap().unwrap();
        assert_eq!(last.id, expected);
    }

    #[test]
    fn test_update_last_read_time() {
        let mut store = memory_store();
        let doc = store.add_document(NewDocument::manual("A", "a")).unwrap();

        assert!(store.update_last_read_time(&doc.id).unwrap());

        let read = store.get_document(&doc.id).unwrap().unwrap();
        let read_time = read.last_read_time.unwrap();
        assert!(read_time >= doc.created_at);
        assert!(read.updated_at >= read_time);
        assert_eq!(store.get_last_read_document().unwrap().unwrap().id, doc.id);
    }

    #[test]
    fn test_recent_documents_ordered_by_update() {
        let mut store = memory_store();
        let a = store.add_document(NewDocument::manual("A", "a")).unwrap();
        let b = store.add_document(NewDocument::manual("B", "b")).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        store
            .update_document(&a.id, DocumentPatch::content("a2"))
            .unwrap();

        let recent = store.get_recent_documents(10).unwrap();
        assert_eq!(recent[0].id, a.id);
        assert_eq!(recent[1].id, b.id);

        assert_eq!(store.get_recent_documents(1).unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let id = {
            let mut store = DocumentStore::open_with_config(&config);
            store
                .add_document(NewDocument::manual("Persistent", "Body content"))
                .unwrap()
                .id
        };

        let store = DocumentStore::open_with_config(&config);
        assert!(store.backend().exists());
        let doc = store.get_document(&id).unwrap().unwrap();
        assert_eq!(doc.title, "Persistent");
        assert_eq!(doc.content, "Body content");
    }

    #[test]
    fn test_last_writer_wins_between_stores() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let mut popup = DocumentStore::open_with_config(&config);
        let mut sidebar = DocumentStore::open_with_config(&config);

        let doc = popup
            .add_document(NewDocument::manual("Shared", "v1"))
            .unwrap();

        // Each call re-reads the collection, so sequential writes from
        // different stores see each other
        sidebar
            .update_document(&doc.id, DocumentPatch::content("v2"))
            .unwrap();
        popup
            .update_document(&doc.id, DocumentPatch::title("Renamed"))
            .unwrap();

        let final_doc = sidebar.get_document(&doc.id).unwrap().unwrap();
        assert_eq!(final_doc.content, "v2");
        assert_eq!(final_doc.title, "Renamed");
    }

    #[test]
    fn test_monotonic_clock_never_goes_back() {
        let mut clock = MonotonicClock {
            last: i64::MAX - 1,
        };
        assert_eq!(clock.now(), i64::MAX - 1);
        assert_eq!(clock.now(), i64::MAX - 1);
    }
}
