//! Extract command handler

use anyhow::{Context, Result};
use tracing::info;

use lector_core::extract::check_supported_url;
use lector_core::{Config, ContentExtractor, DocumentBackend, DocumentStore};

use crate::fetch::{fetch_page, FetchedPage};
use crate::output::Output;

/// Extract a page into Markdown, optionally storing it as a web document
pub async fn extract<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    config: &Config,
    url: String,
    save: bool,
    output: &Output,
) -> Result<()> {
    // Unreadable pages are reported by the extractor without a download
    let page = match check_supported_url(&url) {
        Ok(()) => {
            let html = fetch_page(&url, config.fetch_timeout_secs).await?;
            FetchedPage::new(url.clone(), Some(html))
        }
        Err(_) => FetchedPage::unfetched(url.clone()),
    };

    let extractor = ContentExtractor::new(config.extractor.clone());
    let extracted = extractor
        .extract_from_current_tab(&page)
        .with_context(|| format!("Failed to extract content from {}", url))?;

    if !save {
        output.print_extracted(&extracted);
        return Ok(());
    }

    let doc = store
        .add_document(extracted.into())
        .context("Failed to save extracted document")?;
    info!(id = %doc.id, url = %url, "Saved extracted page");

    output.success(&format!("Saved \"{}\" as {}", doc.title, doc.id));
    if output.is_json() || output.is_quiet() {
        output.print_document(&doc);
    }
    Ok(())
}
