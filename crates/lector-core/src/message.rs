//! Reading message contract
//!
//! Requests sent by a reading surface (the editor or side panel) and the
//! response envelope returned for each. Requests are a closed tagged union
//! keyed on `action`; anything else is rejected when parsed.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::extract::UNTITLED;
use crate::models::{DocumentPatch, NewDocument};
use crate::storage::DocumentBackend;
use crate::store::DocumentStore;

/// Error text for actions on an id that does not exist
pub const NOT_FOUND: &str = "Document not found";

/// Actions accepted from a reading surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ReadingRequest {
    /// Show content for reading; marks the document read when `id` exists
    OpenReading {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    CloseReading,

    /// Replace a document's content
    SaveDocument { id: String, content: String },

    /// Store new manual content
    CreateDocument { content: String, title: String },

    GetDocument { id: String },

    DeleteDocument { id: String },
}

impl ReadingRequest {
    /// Every action name, as it appears on the wire
    pub const ACTIONS: &'static [&'static str] = &[
        "openReading",
        "closeReading",
        "saveDocument",
        "createDocument",
        "getDocument",
        "deleteDocument",
    ];

    /// Parse a request, distinguishing unknown actions from bad payloads
    pub fn from_json(raw: &str) -> Result<Self, MessageError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| MessageError::Malformed(e.to_string()))?;

        let action = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| MessageError::Malformed("missing \"action\" field".to_string()))?;

        if !Self::ACTIONS.contains(&action) {
            return Err(MessageError::UnknownAction(action.to_string()));
        }

        serde_json::from_value(value).map_err(|e| MessageError::Malformed(e.to_string()))
    }

    pub fn action(&self) -> &'static str {
        match self {
            ReadingRequest::OpenReading { .. } => "openReading",
            ReadingRequest::CloseReading => "closeReading",
            ReadingRequest::SaveDocument { .. } => "saveDocument",
            ReadingRequest::CreateDocument { .. } => "createDocument",
            ReadingRequest::GetDocument { .. } => "getDocument",
            ReadingRequest::DeleteDocument { .. } => "deleteDocument",
        }
    }
}

/// Why a request could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Malformed message: {0}")]
    Malformed(String),
}

/// Reply to a reading request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ReadingResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn with_data(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Apply `request` to the store
///
/// Never fails: storage errors are reported in the response.
pub fn handle_request<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    request: ReadingRequest,
) -> ReadingResponse {
    let action = request.action();
    debug!(action, "Handling reading request");

    match dispatch(store, request) {
        Ok(response) => response,
        Err(e) => {
            warn!(action, error = %e, "Reading request failed");
            ReadingResponse::failure(format!("{:#}", e))
        }
    }
}

/// Parse and apply a raw JSON request
pub fn handle_json<B: DocumentBackend>(store: &mut DocumentStore<B>, raw: &str) -> ReadingResponse {
    match ReadingRequest::from_json(raw) {
        Ok(request) => handle_request(store, request),
        Err(e) => ReadingResponse::failure(e.to_string()),
    }
}

fn dispatch<B: DocumentBackend>(
    store: &mut DocumentStore<B>,
    request: ReadingRequest,
) -> Result<ReadingResponse> {
    let response = match request {
        ReadingRequest::OpenReading { content, title, id } => {
            if let Some(id) = &id {
                if !store.update_last_read_time(id)? {
                    debug!(id = %id, "Opened content without a stored document");
                }
            }
            ReadingResponse::with_data(json!({
                "title": title.unwrap_or_else(|| UNTITLED.to_string()),
                "content": content,
                "id": id,
            }))
        }

        ReadingRequest::CloseReading => ReadingResponse::ok(),

        ReadingRequest::SaveDocument { id, content } => {
            match store.update_document(&id, DocumentPatch::content(content))? {
                Some(_) => ReadingResponse::with_id(id),
                None => ReadingResponse::failure(NOT_FOUND),
            }
        }

        ReadingRequest::CreateDocument { content, title } => {
            let document = store.add_document(NewDocument::manual(title, content))?;
            ReadingResponse::with_id(document.id)
        }

        ReadingRequest::GetDocument { id } => match store.get_document(&id)? {
            Some(document) => ReadingResponse::with_data(serde_json::to_value(&document)?),
            None => ReadingResponse::failure(NOT_FOUND),
        },

        ReadingRequest::DeleteDocument { id } => {
            if store.delete_document(&id)? {
                ReadingResponse::with_id(id)
            } else {
                ReadingResponse::failure(NOT_FOUND)
            }
        }
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, DocumentSource};
    use crate::storage::{MemoryBackend, StorageError, StorageResult};

    fn store() -> DocumentStore<MemoryBackend> {
        DocumentStore::with_backend(MemoryBackend::new())
    }

    #[test]
    fn test_parse_known_actions() {
        let request = ReadingRequest::from_json(
            r##"{"action":"saveDocument","id":"1-abc","content":"# New"}"##,
        )
        .unwrap();
        assert_eq!(
            request,
            ReadingRequest::SaveDocument {
                id: "1-abc".to_string(),
                content: "# New".to_string()
            }
        );

        let request = ReadingRequest::from_json(r#"{"action":"closeReading"}"#).unwrap();
        assert_eq!(request, ReadingRequest::CloseReading);

        let request =
            ReadingRequest::from_json(r#"{"action":"openReading","content":"text"}"#).unwrap();
        assert_eq!(
            request,
            ReadingRequest::OpenReading {
                content: "text".to_string(),
                title: None,
                id: None
            }
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_malformed() {
        assert_eq!(
            ReadingRequest::from_json(r#"{"action":"generateOutline"}"#),
            Err(MessageError::UnknownAction("generateOutline".to_string()))
        );
        assert!(matches!(
            ReadingRequest::from_json(r#"{"action":"saveDocument","id":"x"}"#),
            Err(MessageError::Malformed(_))
        ));
        assert!(matches!(
            ReadingRequest::from_json(r#"{"id":"x"}"#),
            Err(MessageError::Malformed(_))
        ));
        assert!(matches!(
            ReadingRequest::from_json("not json"),
            Err(MessageError::Malformed(_))
        ));
    }

    #[test]
    fn test_action_names_round_trip() {
        let request = ReadingRequest::GetDocument {
            id: "x".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["action"], request.action());
        assert!(ReadingRequest::ACTIONS.contains(&request.action()));
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let json = serde_json::to_string(&ReadingResponse::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let json = serde_json::to_string(&ReadingResponse::failure(NOT_FOUND)).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"Document not found"}"#);
    }

    #[test]
    fn test_create_then_save() {
        let mut store = store();

        let created = handle_request(
            &mut store,
            ReadingRequest::CreateDocument {
                content: "draft".to_string(),
                title: "Draft".to_string(),
            },
        );
        assert!(created.success);
        let id = created.id.unwrap();

        let doc = store.get_document(&id).unwrap().unwrap();
        assert_eq!(doc.source, DocumentSource::Manual);
        assert_eq!(doc.title, "Draft");

        let saved = handle_request(
            &mut store,
            ReadingRequest::SaveDocument {
                id: id.clone(),
                content: "final".to_string(),
            },
        );
        assert!(saved.success);
        assert_eq!(store.get_document(&id).unwrap().unwrap().content, "final");
    }

    #[test]
    fn test_save_missing_document() {
        let mut store = store();
        let response = handle_request(
            &mut store,
            ReadingRequest::SaveDocument {
                id: "missing".to_string(),
                content: "x".to_string(),
            },
        );

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some(NOT_FOUND));
        assert_eq!(store.backend().write_count(), 0);
    }

    #[test]
    fn test_open_reading_marks_read() {
        let mut store = store();
        let doc = store
            .add_document(NewDocument::manual("Essay", "body"))
            .unwrap();
        assert!(doc.last_read_time.is_none());

        let response = handle_request(
            &mut store,
            ReadingRequest::OpenReading {
                content: doc.content.clone(),
                title: None,
                id: Some(doc.id.clone()),
            },
        );

        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data["title"], UNTITLED);
        assert_eq!(data["content"], "body");
        assert_eq!(data["id"], doc.id.as_str());
        assert!(store
            .get_document(&doc.id)
            .unwrap()
            .unwrap()
            .last_read_time
            .is_some());
    }

    #[test]
    fn test_open_reading_without_stored_document() {
        let mut store = store();
        let response = handle_json(
            &mut store,
            r#"{"action":"openReading","content":"scratch","title":"Scratch"}"#,
        );

        assert!(response.success);
        assert_eq!(response.data.unwrap()["title"], "Scratch");
        assert_eq!(store.backend().write_count(), 0);
    }

    #[test]
    fn test_get_and_delete() {
        let mut store = store();
        let doc = store
            .add_document(NewDocument::web("Page", "text", "https://example.com"))
            .unwrap();

        let response = handle_json(
            &mut store,
            &format!(r#"{{"action":"getDocument","id":"{}"}}"#, doc.id),
        );
        let data = response.data.unwrap();
        assert_eq!(data["sourceUrl"], "https://example.com");
        assert_eq!(data["source"], "web");

        let deleted = handle_request(
            &mut store,
            ReadingRequest::DeleteDocument { id: doc.id.clone() },
        );
        assert!(deleted.success);

        let again = handle_request(&mut store, ReadingRequest::DeleteDocument { id: doc.id });
        assert!(!again.success);
    }

    #[test]
    fn test_handle_json_reports_parse_errors() {
        let mut store = store();
        let response = handle_json(&mut store, r#"{"action":"explode"}"#);

        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("Unknown action: explode"));
    }

    struct FailingBackend;

    impl DocumentBackend for FailingBackend {
        fn load_all(&self) -> StorageResult<Vec<Document>> {
            Err(StorageError::UnsupportedVersion {
                path: "/tmp/documents.json".into(),
                found: 9,
                supported: 1,
            })
        }

        fn save_all(&mut self, _documents: &[Document]) -> StorageResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_backend_errors_become_failures() {
        let mut store = DocumentStore::with_backend(FailingBackend);
        let response = handle_request(
            &mut store,
            ReadingRequest::GetDocument {
                id: "x".to_string(),
            },
        );

        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.contains("Failed to load documents"));
        assert!(error.contains("schema version 9"));
    }
}
