//! Lector Core Library
//!
//! This crate provides the core functionality for Lector, a reader that
//! captures web pages and manual notes as Markdown documents.
//!
//! # Architecture
//!
//! - **Document store**: the only writer of the document collection,
//!   persisted through a pluggable backend (a JSON file by default)
//! - **Content extractor**: page HTML -> main content -> Markdown
//!
//! # Quick Start
//!
//! ```text
//! let mut store = DocumentStore::open()?;
//!
//! // Extract a page and keep it
//! let extracted = ContentExtractor::default().extract_from_html(&html, url)?;
//! let doc = store.add_document(extracted.into())?;
//!
//! // Query documents
//! let found = store.search_documents("rust")?;
//! ```
//!
//! # Modules
//!
//! - `store`: document CRUD and queries (main entry point)
//! - `models`: documents, creation input, patches
//! - `storage`: persistence backends and storage errors
//! - `extract`: content extraction and Markdown conversion
//! - `message`: reading surface requests and responses
//! - `config`: application configuration

pub mod config;
pub mod extract;
pub mod message;
pub mod models;
pub mod storage;
pub mod store;

pub use config::Config;
pub use extract::{ActiveTab, ContentExtractor, ExtractError, ExtractorOptions, TabSource};
pub use message::{handle_request, MessageError, ReadingRequest, ReadingResponse};
pub use models::{Document, DocumentPatch, DocumentSource, ExtractedContent, NewDocument};
pub use storage::{DocumentBackend, JsonFileBackend, MemoryBackend, StorageError};
pub use store::DocumentStore;
