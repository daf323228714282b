//! Storage layer
//!
//! Persists the document collection under a single logical key.
//!
//! ## Architecture
//!
//! - **Backend trait**: `load_all` / `save_all` over the whole collection
//! - **JSON file**: default backend, atomic writes, versioned envelope
//! - **Memory**: backend for tests and ephemeral sessions

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::{DocumentBackend, JsonFileBackend, MemoryBackend, SCHEMA_VERSION};
