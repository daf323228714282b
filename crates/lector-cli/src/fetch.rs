//! Page fetching
//!
//! Downloads a page so the extractor can treat it as the active tab.

use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::debug;

use lector_core::{ActiveTab, TabSource};

/// Tab id given to a fetched page
const FETCHED_TAB_ID: u32 = 1;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; Lector/1.0)";

/// A downloaded page standing in for a browser tab
#[derive(Debug, Clone)]
pub struct FetchedPage {
    url: String,
    html: Option<String>,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, html: Option<String>) -> Self {
        Self {
            url: url.into(),
            html,
        }
    }

    /// A page that was never downloaded (unsupported URLs)
    pub fn unfetched(url: impl Into<String>) -> Self {
        Self::new(url, None)
    }
}

impl TabSource for FetchedPage {
    fn active_tab(&self) -> Option<ActiveTab> {
        Some(ActiveTab::new(FETCHED_TAB_ID, self.url.clone()))
    }

    fn page_html(&self, tab_id: u32) -> Result<Option<String>> {
        if tab_id != FETCHED_TAB_ID {
            bail!("No tab with id {}", tab_id);
        }
        Ok(self.html.clone())
    }
}

/// Download `url` and return its HTML
pub async fn fetch_page(url: &str, timeout_secs: u64) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    debug!(url, timeout_secs, "Fetching page");
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Fetching {} returned HTTP {}", url, status);
    }

    response
        .text()
        .await
        .with_context(|| format!("Failed to read response body from {}", url))
}
