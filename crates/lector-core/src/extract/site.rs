//! Site-specific extraction
//!
//! Hosts whose main content lives in a known container skip readability
//! scoring. Currently only GitHub project pages (the rendered README).

use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::markdown::MarkdownConverter;

/// README containers on GitHub, most specific first
const GITHUB_README_SELECTORS: &[&str] = &[
    r#"article[itemprop="text"]"#,
    ".markdown-body",
    "#readme .Box-body",
    r#"[data-target="readme-toc.content"]"#,
];

/// Paths on github.com that are not project pages
const GITHUB_EXCLUDED_PATHS: &[&str] = &["/issues/", "/pull/", "/discussions/"];

/// Whether `url` is a GitHub repository page with a README
pub fn is_github_project_page(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or("");
    let path = parsed.path();

    host.contains("github.com")
        && !GITHUB_EXCLUDED_PATHS
            .iter()
            .any(|excluded| path.contains(excluded))
}

/// Markdown of the rendered README, when a container with enough text exists
pub fn github_readme(
    document: &Html,
    converter: &MarkdownConverter,
    min_text_len: usize,
) -> Option<String> {
    for raw in GITHUB_README_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else {
            continue;
        };
        let Some(container) = document.select(&selector).next() else {
            continue;
        };

        let text_len = container.text().collect::<String>().trim().chars().count();
        if text_len <= min_text_len {
            debug!(selector = raw, text_len, "README container too short");
            continue;
        }

        let markdown = converter.convert(container);
        if !markdown.is_empty() {
            debug!(selector = raw, "Using README container");
            return Some(markdown);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_project_pages() {
        assert!(is_github_project_page("https://github.com/rust-lang/rust"));
        assert!(is_github_project_page(
            "https://github.com/rust-lang/rust/blob/master/README.md"
        ));
        assert!(is_github_project_page("https://www.github.com/owner/repo"));
    }

    #[test]
    fn test_github_excluded_pages() {
        assert!(!is_github_project_page(
            "https://github.com/rust-lang/rust/issues/1"
        ));
        assert!(!is_github_project_page(
            "https://github.com/rust-lang/rust/pull/2"
        ));
        assert!(!is_github_project_page(
            "https://github.com/rust-lang/rust/discussions/3"
        ));
    }

    #[test]
    fn test_other_hosts_and_bad_urls() {
        assert!(!is_github_project_page("https://gitlab.com/owner/repo"));
        assert!(!is_github_project_page("not a url"));
        assert!(!is_github_project_page(""));
    }

    #[test]
    fn test_readme_selector_order_and_length() {
        let long = "Install with cargo and run the binary. ".repeat(5);
        let html = format!(
            r#"<html><body>
                <div class="markdown-body"><p>short</p></div>
                <div id="readme"><div class="Box-body"><h1>Tool</h1><p>{long}</p></div></div>
            </body></html>"#
        );
        let document = Html::parse_document(&html);
        let converter = MarkdownConverter::new(None);

        let markdown = github_readme(&document, &converter, 100).unwrap();
        assert!(markdown.starts_with("# Tool"));
        assert!(markdown.contains("Install with cargo"));
    }

    #[test]
    fn test_no_readme_container() {
        let document = Html::parse_document("<html><body><p>Issue text</p></body></html>");
        let converter = MarkdownConverter::new(None);
        assert!(github_readme(&document, &converter, 100).is_none());
    }
}
