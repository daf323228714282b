//! Extraction errors

use thiserror::Error;

/// Why a page could not be turned into a document
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Could not identify the active tab")]
    NoActiveTab,

    #[error("Could not determine the current page URL")]
    MissingTabUrl,

    #[error("Browser internal pages are not supported: {url}")]
    UnsupportedPage { url: String },

    #[error("Local files are not supported: {url}")]
    LocalFile { url: String },

    #[error("Could not determine the tab ID for {url}")]
    MissingTabId { url: String },

    #[error("Could not read page content: {0}")]
    ScriptInjection(String),

    #[error("No readable content found on the page")]
    NoContent,
}

impl ExtractError {
    /// Whether the page itself can never be extracted, as opposed to a
    /// transient failure reading it
    pub fn is_unsupported_page(&self) -> bool {
        matches!(
            self,
            ExtractError::UnsupportedPage { .. } | ExtractError::LocalFile { .. }
        )
    }
}
