//! Web content extraction
//!
//! Turns a page's HTML into a Markdown document:
//!
//! 1. site-specific containers (GitHub READMEs) when the URL matches,
//! 2. otherwise readability-style main content detection,
//! 3. HTML to Markdown through the converter's rule table,
//! 4. a title derived from the resulting Markdown.
//!
//! The browser tab the page lives in is abstracted as a [`TabSource`], so
//! callers decide how HTML is obtained (a fetched page, a test fixture).

pub mod error;
pub mod language;
pub mod markdown;
pub mod readability;
pub mod site;
pub mod title;

use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::ExtractedContent;

pub use error::ExtractError;
pub use language::normalize_language;
pub use markdown::{MarkdownConverter, Rule};
pub use readability::Readability;
pub use title::{title_from_markdown, UNTITLED};

/// URL prefixes of browser-internal pages that cannot be read
const BROWSER_INTERNAL_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "edge://",
    "about:",
    "moz-extension://",
];

const LOCAL_FILE_PREFIX: &str = "file://";

/// Extraction tuning, stored under `[extractor]` in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorOptions {
    /// A site container must have more text than this to be used
    pub min_site_text_len: usize,
    /// Below this much article text the relaxed pass runs
    pub char_threshold: usize,
    /// Longest title taken from a plain line
    pub title_max_chars: usize,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            min_site_text_len: 100,
            char_threshold: 500,
            title_max_chars: 50,
        }
    }
}

/// The tab a page is extracted from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveTab {
    pub id: Option<u32>,
    pub url: Option<String>,
}

impl ActiveTab {
    pub fn new(id: u32, url: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            url: Some(url.into()),
        }
    }
}

/// Access to the user's current page
pub trait TabSource {
    /// The active tab, if one can be identified
    fn active_tab(&self) -> Option<ActiveTab>;

    /// Full HTML of the page in `tab_id`
    ///
    /// `Ok(None)` means the page produced no document.
    fn page_html(&self, tab_id: u32) -> anyhow::Result<Option<String>>;
}

/// Reject URLs whose pages can never be extracted
pub fn check_supported_url(url: &str) -> Result<(), ExtractError> {
    let lower = url.trim().to_lowercase();

    if BROWSER_INTERNAL_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
    {
        return Err(ExtractError::UnsupportedPage {
            url: url.to_string(),
        });
    }
    if lower.starts_with(LOCAL_FILE_PREFIX) {
        return Err(ExtractError::LocalFile {
            url: url.to_string(),
        });
    }
    Ok(())
}

/// Stateless extractor; each call parses and converts independently
#[derive(Debug, Clone, Default)]
pub struct ContentExtractor {
    options: ExtractorOptions,
}

impl ContentExtractor {
    pub fn new(options: ExtractorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ExtractorOptions {
        &self.options
    }

    /// Extract the active tab's page
    ///
    /// Checks run in order: a tab exists, it has a URL, the URL is
    /// readable, it has an id, its HTML can be obtained.
    pub fn extract_from_current_tab(
        &self,
        tabs: &dyn TabSource,
    ) -> Result<ExtractedContent, ExtractError> {
        let tab = tabs.active_tab().ok_or(ExtractError::NoActiveTab)?;
        let url = tab
            .url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ExtractError::MissingTabUrl)?;

        check_supported_url(&url)?;

        let tab_id = tab
            .id
            .ok_or_else(|| ExtractError::MissingTabId { url: url.clone() })?;

        let html = tabs
            .page_html(tab_id)
            .map_err(|e| ExtractError::ScriptInjection(format!("{:#}", e)))?
            .filter(|html| !html.trim().is_empty())
            .ok_or_else(|| ExtractError::ScriptInjection("page returned no HTML".to_string()))?;

        self.extract_from_html(&html, &url)
    }

    /// Extract Markdown and a title from `html` loaded from `url`
    pub fn extract_from_html(
        &self,
        html: &str,
        url: &str,
    ) -> Result<ExtractedContent, ExtractError> {
        let document = Html::parse_document(html);
        let converter = MarkdownConverter::for_page(url);

        let site_content = if site::is_github_project_page(url) {
            let readme =
                site::github_readme(&document, &converter, self.options.min_site_text_len);
            if readme.is_none() {
                debug!(url, "No README container, using generic extraction");
            }
            readme
        } else {
            None
        };

        let content = match site_content {
            Some(content) => content,
            None => self.extract_article(&document, converter)?,
        };

        let title = title_from_markdown(&content, self.options.title_max_chars);
        debug!(url, title = %title, len = content.len(), "Extracted page");

        Ok(ExtractedContent {
            title,
            content,
            url: url.to_string(),
        })
    }

    fn extract_article(
        &self,
        document: &Html,
        converter: MarkdownConverter,
    ) -> Result<String, ExtractError> {
        let article = Readability::new(self.options.char_threshold)
            .parse(document)
            .ok_or(ExtractError::NoContent)?;

        let converter = if article.strict {
            converter.with_rule_first(Rule::new(
                "boilerplate",
                readability::is_boilerplate,
                markdown::drop_element,
            ))
        } else {
            converter
        };

        let markdown = converter.convert_all(&article.elements);
        if markdown.trim().is_empty() {
            warn!("Article detected but converted to empty Markdown");
            return Err(ExtractError::NoContent);
        }
        Ok(markdown)
    }
}
