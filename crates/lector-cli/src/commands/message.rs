//! Message command handler
//!
//! Dispatches one reading request, given as JSON, the way a reading
//! surface would, and prints the response envelope.

use anyhow::Result;

use lector_core::message::handle_json;
use lector_core::{DocumentBackend, DocumentStore};

use crate::output::{Output, OutputFormat};

/// Handle a raw JSON reading request
pub fn dispatch<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    raw: String,
    output: &Output,
) -> Result<()> {
    let response = handle_json(store, &raw);

    match output.format {
        OutputFormat::Quiet => {
            if let Some(ref id) = response.id {
                println!("{}", id);
            }
        }
        OutputFormat::Human => println!("{}", serde_json::to_string_pretty(&response)?),
        OutputFormat::Json => println!("{}", serde_json::to_string(&response)?),
    }

    if !response.success {
        std::process::exit(1);
    }
    Ok(())
}
