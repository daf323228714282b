//! Document command handlers

use anyhow::{anyhow, bail, Context, Result};

use lector_core::{DocumentBackend, DocumentPatch, DocumentSource, DocumentStore, NewDocument};

use crate::editor::{confirm, edit_text, read_new_content};
use crate::output::Output;

/// Create a manual document
///
/// Content comes from `--content`, piped stdin, or the editor, in that order.
pub fn add<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    title: String,
    content: Option<String>,
    output: &Output,
) -> Result<()> {
    let content = match content {
        Some(content) => content,
        None => read_new_content()?,
    };

    let title = title.trim();
    if title.is_empty() {
        bail!("Title cannot be empty");
    }
    if content.trim().is_empty() {
        bail!("Content cannot be empty");
    }

    let doc = store
        .add_document(NewDocument::manual(title, content))
        .context("Failed to create document")?;

    output.success(&format!("Created document: {}", doc.id));
    if output.is_json() || output.is_quiet() {
        output.print_document(&doc);
    }
    Ok(())
}

/// List documents, most recently updated first
pub fn list<B: DocumentBackend>(
    store: &DocumentStore<B>,
    source: Option<DocumentSource>,
    recent: Option<usize>,
    output: &Output,
) -> Result<()> {
    let mut docs = store.get_recent_documents(usize::MAX)?;
    if let Some(source) = source {
        docs.retain(|d| d.source == source);
    }
    if let Some(limit) = recent {
        docs.truncate(limit);
    }

    output.print_documents(&docs);
    Ok(())
}

/// Show a document's details and content
pub fn show<B: DocumentBackend>(
    store: &DocumentStore<B>,
    id: String,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(store, &id)?;
    let doc = store
        .get_document(&id)?
        .ok_or_else(|| anyhow!("Document not found: {}", id))?;

    output.print_document(&doc);
    Ok(())
}

/// Print a document's content and mark it read
pub fn read<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    id: String,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(store, &id)?;
    store
        .update_last_read_time(&id)
        .context("Failed to mark document as read")?;

    let doc = store
        .get_document(&id)?
        .ok_or_else(|| anyhow!("Document not found: {}", id))?;

    output.print_content(&doc);
    Ok(())
}

/// Open a web document's source page in the browser
pub fn open<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    id: String,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(store, &id)?;
    let doc = store
        .get_document(&id)?
        .ok_or_else(|| anyhow!("Document not found: {}", id))?;

    let Some(url) = doc.source_url.as_deref() else {
        bail!("Document {} has no source page (source: {})", doc.id, doc.source);
    };

    open::that(url).with_context(|| format!("Failed to open {}", url))?;
    store
        .update_last_read_time(&id)
        .context("Failed to mark document as read")?;

    output.success(&format!("Opened {}", url));
    Ok(())
}

/// Change a document's title and/or content
///
/// With neither given, the content opens in the editor.
pub fn edit<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    id: String,
    title: Option<String>,
    content: Option<String>,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(store, &id)?;
    let doc = store
        .get_document(&id)?
        .ok_or_else(|| anyhow!("Document not found: {}", id))?;

    let patch = if title.is_none() && content.is_none() {
        let edited = edit_text(&doc.content)?;
        if edited.trim_end() == doc.content.trim_end() {
            output.message("No changes.");
            return Ok(());
        }
        DocumentPatch::content(edited)
    } else {
        DocumentPatch {
            title,
            content,
            last_read_time: None,
        }
    };

    if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        bail!("Title cannot be empty");
    }
    if patch.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
        bail!("Content cannot be empty");
    }

    let updated = store
        .update_document(&id, patch)
        .context("Failed to update document")?
        .ok_or_else(|| anyhow!("Document not found: {}", id))?;

    output.success(&format!("Updated document: {}", updated.id));
    Ok(())
}

/// Delete a document
pub fn delete<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    id: String,
    output: &Output,
) -> Result<()> {
    let id = resolve_id(store, &id)?;
    let doc = store
        .get_document(&id)?
        .ok_or_else(|| anyhow!("Document not found: {}", id))?;

    if output.should_prompt() {
        println!("Delete document: {} - {}", doc.id, doc.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    if !store
        .delete_document(&id)
        .context("Failed to delete document")?
    {
        bail!("Document not found: {}", id);
    }

    output.success(&format!("Deleted document: {}", id));
    Ok(())
}

/// Delete every document
pub fn clear<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let count = store.get_document_count()?;

    if !yes && output.should_prompt() {
        println!("Delete all {} document(s)?", count);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .clear_all_documents()
        .context("Failed to clear documents")?;

    output.success(&format!("Deleted {} document(s)", count));
    Ok(())
}

/// Search titles and content
pub fn search<B: DocumentBackend>(
    store: &DocumentStore<B>,
    query: String,
    output: &Output,
) -> Result<()> {
    let docs = store.search_documents(&query)?;
    output.print_documents(&docs);
    Ok(())
}

/// Show the most recently read document
pub fn last<B: DocumentBackend>(store: &DocumentStore<B>, output: &Output) -> Result<()> {
    match store.get_last_read_document()? {
        Some(doc) => output.print_document(&doc),
        None => output.message("No document has been read yet."),
    }
    Ok(())
}

/// Resolve a full id or a unique id prefix
pub fn resolve_id<B: DocumentBackend>(store: &DocumentStore<B>, id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        bail!("Document ID cannot be empty");
    }

    let docs = store.get_documents()?;
    if docs.iter().any(|d| d.id == id) {
        return Ok(id.to_string());
    }

    let matches: Vec<_> = docs.iter().filter(|d| d.id.starts_with(id)).collect();

    match matches.len() {
        0 => bail!("No document found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple documents match '{}':", id);
            for doc in &matches {
                eprintln!("  {} - {}", doc.id, doc.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lector_core::{Document, MemoryBackend};

    use crate::output::OutputFormat;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    fn store_with(ids: &[&str]) -> DocumentStore<MemoryBackend> {
        let mut backend = MemoryBackend::new();
        let docs: Vec<Document> = ids
            .iter()
            .map(|id| Document {
                id: id.to_string(),
                title: format!("Title {}", id),
                content: "content".to_string(),
                created_at: 1,
                updated_at: 1,
                last_read_time: None,
                source: DocumentSource::Manual,
                source_url: None,
            })
            .collect();
        backend.save_all(&docs).unwrap();
        DocumentStore::with_backend(backend)
    }

    #[test]
    fn test_resolve_full_id() {
        let store = store_with(&["100-aaaaaaa", "100-aaaaaab"]);
        assert_eq!(resolve_id(&store, "100-aaaaaaa").unwrap(), "100-aaaaaaa");
    }

    #[test]
    fn test_resolve_unique_prefix() {
        let store = store_with(&["100-abc0000", "200-xyz0000"]);
        assert_eq!(resolve_id(&store, "200").unwrap(), "200-xyz0000");
    }

    #[test]
    fn test_resolve_ambiguous_and_missing() {
        let store = store_with(&["100-abc0000", "100-abd0000"]);
        let err = resolve_id(&store, "100-ab").unwrap_err();
        assert!(err.to_string().contains("Ambiguous"));

        let err = resolve_id(&store, "999").unwrap_err();
        assert!(err.to_string().contains("No document found"));

        assert!(resolve_id(&store, "  ").is_err());
    }

    #[test]
    fn test_add_rejects_empty_content() {
        let mut store = store_with(&[]);
        let err = add(&mut store, "Title".to_string(), Some("  \n".to_string()), &quiet())
            .unwrap_err();

        assert!(err.to_string().contains("Content cannot be empty"));
        assert_eq!(store.get_document_count().unwrap(), 0);
    }

    #[test]
    fn test_add_manual_document() {
        let mut store = store_with(&[]);
        add(
            &mut store,
            " Notes ".to_string(),
            Some("# Notes".to_string()),
            &quiet(),
        )
        .unwrap();

        let docs = store.get_documents().unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Notes");
        assert_eq!(docs[0].source, DocumentSource::Manual);
    }

    #[test]
    fn test_read_marks_document() {
        let mut store = store_with(&["100-abc0000"]);
        read(&mut store, "100".to_string(), &quiet()).unwrap();

        let doc = store.get_document("100-abc0000").unwrap().unwrap();
        assert!(doc.last_read_time.is_some());
        assert_eq!(
            store.get_last_read_document().unwrap().unwrap().id,
            "100-abc0000"
        );
    }

    #[test]
    fn test_edit_with_flags() {
        let mut store = store_with(&["100-abc0000"]);
        edit(
            &mut store,
            "100".to_string(),
            Some("Renamed".to_string()),
            None,
            &quiet(),
        )
        .unwrap();

        let doc = store.get_document("100-abc0000").unwrap().unwrap();
        assert_eq!(doc.title, "Renamed");
        assert_eq!(doc.content, "content");

        let err = edit(
            &mut store,
            "100".to_string(),
            None,
            Some(" ".to_string()),
            &quiet(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Content cannot be empty"));
    }

    #[test]
    fn test_delete_and_clear_without_prompt() {
        let mut store = store_with(&["100-abc0000", "200-abc0000", "300-abc0000"]);

        delete(&mut store, "100".to_string(), &quiet()).unwrap();
        assert_eq!(store.get_document_count().unwrap(), 2);

        clear(&mut store, false, &quiet()).unwrap();
        assert_eq!(store.get_document_count().unwrap(), 0);
    }

    #[test]
    fn test_open_requires_source_url() {
        let mut store = store_with(&["100-abc0000"]);
        let err = open(&mut store, "100".to_string(), &quiet()).unwrap_err();
        assert!(err.to_string().contains("no source page"));
    }
}
