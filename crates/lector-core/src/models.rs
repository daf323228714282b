//! Data models for Lector
//!
//! Defines the persisted `Document` record, the inputs used to create and
//! patch it, and the transient `ExtractedContent` produced by the extractor.
//! Field names serialize in camelCase so the stored collection keeps the
//! layout used by the browser extension.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Where a document came from
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    /// Typed or pasted by the user
    #[default]
    Manual,
    /// Extracted from a web page
    Web,
}

impl DocumentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSource::Manual => "manual",
            DocumentSource::Web => "web",
        }
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(DocumentSource::Manual),
            "web" => Ok(DocumentSource::Web),
            other => Err(format!("Unknown source '{}'. Use 'manual' or 'web'.", other)),
        }
    }
}

/// A stored document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Unique identifier, generated by the store
    pub id: String,
    /// Display title
    pub title: String,
    /// Markdown body
    pub content: String,
    /// Creation time in milliseconds since the Unix epoch
    pub created_at: i64,
    /// Last mutation time in milliseconds since the Unix epoch
    pub updated_at: i64,
    /// When the document was last opened for reading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_read_time: Option<i64>,
    /// Provenance tag
    #[serde(default)]
    pub source: DocumentSource,
    /// Original page URL (web documents only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

impl Document {
    pub fn created(&self) -> DateTime<Utc> {
        millis_to_datetime(self.created_at)
    }

    pub fn updated(&self) -> DateTime<Utc> {
        millis_to_datetime(self.updated_at)
    }

    pub fn last_read(&self) -> Option<DateTime<Utc>> {
        self.last_read_time.map(millis_to_datetime)
    }

    /// Whether the title or content contains `needle` (already lowercased)
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle) || self.content.to_lowercase().contains(needle)
    }
}

/// Input for creating a document
///
/// The store fills in `id`, `createdAt` and `updatedAt`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source: DocumentSource,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub last_read_time: Option<i64>,
}

impl NewDocument {
    /// A manually entered document
    pub fn manual(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            source: DocumentSource::Manual,
            source_url: None,
            last_read_time: None,
        }
    }

    /// A document extracted from the page at `url`
    pub fn web(
        title: impl Into<String>,
        content: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            source: DocumentSource::Web,
            source_url: Some(url.into()),
            last_read_time: None,
        }
    }
}

/// Partial update applied by `DocumentStore::update_document`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub last_read_time: Option<i64>,
}

impl DocumentPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn last_read_time(timestamp: i64) -> Self {
        Self {
            last_read_time: Some(timestamp),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.last_read_time.is_none()
    }

    /// Merge the set fields into `document`
    pub(crate) fn apply(self, document: &mut Document) {
        if let Some(title) = self.title {
            document.title = title;
        }
        if let Some(content) = self.content {
            document.content = content;
        }
        if let Some(timestamp) = self.last_read_time {
            document.last_read_time = Some(timestamp);
        }
    }
}

/// Result of running the content extractor over a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Title derived from the Markdown body
    pub title: String,
    /// Markdown body
    pub content: String,
    /// Page the content came from
    pub url: String,
}

impl From<ExtractedContent> for NewDocument {
    fn from(extracted: ExtractedContent) -> Self {
        NewDocument::web(extracted.title, extracted.content, extracted.url)
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}
