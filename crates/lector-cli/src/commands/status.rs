//! Status command handler

use anyhow::Result;

use lector_core::{Config, DocumentSource, DocumentStore, JsonFileBackend};

use crate::output::{Output, OutputFormat};

/// Show status information
pub fn show(store: &DocumentStore<JsonFileBackend>, config: &Config, output: &Output) -> Result<()> {
    let backend = store.backend();
    let total = store.get_document_count()?;
    let manual = store.get_documents_by_source(DocumentSource::Manual)?.len();
    let web = store.get_documents_by_source(DocumentSource::Web)?.len();
    let last_read = store.get_last_read_document()?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "storage": {
                        "path": backend.path(),
                        "exists": backend.exists(),
                        "size": backend.file_size()
                    },
                    "counts": {
                        "documents": total,
                        "manual": manual,
                        "web": web
                    },
                    "last_read": last_read.as_ref().map(|d| &d.id)
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", total);
        }
        OutputFormat::Human => {
            println!("Lector Status");
            println!("=============");
            println!();
            println!("Storage:");
            println!("  Location: {}", backend.path().display());
            println!("  Size:     {}", human_size(backend.file_size()));
            println!();
            println!("Contents:");
            println!("  Documents: {}", total);
            println!("  Manual:    {}", manual);
            println!("  Web:       {}", web);
            if let Some(doc) = last_read {
                println!();
                println!("Last read: {} ({})", doc.title, doc.id);
            }
        }
    }

    Ok(())
}

fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
