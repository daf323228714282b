//! Readability-style main content detection
//!
//! Scores block candidates by the paragraphs they contain and returns the
//! best-scoring container together with its qualifying siblings. The first
//! pass skips nodes that look like page furniture (navigation, comments,
//! sidebars); when that pass yields too little text a second, relaxed pass
//! runs and the longer result wins.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::markdown::visible_text;

/// Paragraphs shorter than this contribute nothing
const MIN_PARAGRAPH_LEN: usize = 25;

/// Ancestors that receive a share of each paragraph's score
const SCORED_ANCESTORS: usize = 3;

const SCORABLE_TAGS: &[&str] = &["p", "pre", "td", "section", "h2", "h3", "h4", "h5", "h6"];

/// A `div` containing none of these is scored like a paragraph
const DIV_BLOCK_TAGS: &[&str] = &[
    "blockquote", "dl", "div", "img", "ol", "p", "pre", "table", "ul",
];

const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "template", "object", "embed",
];

const UNLIKELY_TAGS: &[&str] = &["nav", "aside", "footer", "form"];

const UNLIKELY_ROLES: &[&str] = &[
    "menu",
    "menubar",
    "complementary",
    "navigation",
    "alert",
    "alertdialog",
    "dialog",
];

const UNLIKELY_HINTS: &[&str] = &[
    "-ad-",
    "ai2html",
    "banner",
    "breadcrumbs",
    "combx",
    "comment",
    "community",
    "cover-wrap",
    "disqus",
    "extra",
    "footer",
    "gdpr",
    "header",
    "legends",
    "menu",
    "related",
    "remark",
    "replies",
    "rss",
    "shoutbox",
    "sidebar",
    "skyscraper",
    "social",
    "sponsor",
    "supplemental",
    "ad-break",
    "agegate",
    "pagination",
    "pager",
    "popup",
    "yom-remote",
];

const MAYBE_HINTS: &[&str] = &["and", "article", "body", "column", "content", "main", "shadow"];

const POSITIVE_HINTS: &[&str] = &[
    "article", "body", "content", "entry", "hentry", "h-entry", "main", "page", "pagination",
    "post", "text", "blog", "story",
];

const NEGATIVE_HINTS: &[&str] = &[
    "-ad-", "hidden", "hid", "banner", "combx", "comment", "com-", "contact", "footer", "gdpr",
    "masthead", "media", "meta", "outbrain", "promo", "related", "scroll", "share", "shoutbox",
    "sidebar", "skyscraper", "sponsor", "shopping", "tags", "widget",
];

/// Main content of a page
#[derive(Debug)]
pub struct Article<'a> {
    /// Elements to convert, in document order
    pub elements: Vec<ElementRef<'a>>,
    /// Visible characters across `elements`
    pub text_length: usize,
    /// Whether the unlikely-candidate filter was active
    pub strict: bool,
}

/// Main content detector
#[derive(Debug, Clone)]
pub struct Readability {
    char_threshold: usize,
}

impl Readability {
    pub fn new(char_threshold: usize) -> Self {
        Self { char_threshold }
    }

    /// Locate the main content of `document`
    ///
    /// Returns `None` when the page has neither text nor images.
    pub fn parse<'a>(&self, document: &'a Html) -> Option<Article<'a>> {
        let root = content_root(document)?;

        let strict = grab_article(root, true);
        if let Some(article) = &strict {
            if article.text_length >= self.char_threshold {
                return strict;
            }
        }

        debug!(
            threshold = self.char_threshold,
            "Article text below threshold, retrying without the unlikely filter"
        );
        let relaxed = grab_article(root, false);

        // Strict wins ties so boilerplate stripping stays on
        match (strict, relaxed) {
            (Some(s), Some(r)) if r.text_length > s.text_length => Some(r),
            (Some(s), _) => Some(s),
            (None, r) => r,
        }
    }
}

/// Whether `element` looks like page furniture rather than content
pub fn is_boilerplate(element: &ElementRef<'_>) -> bool {
    is_hidden(element) || is_unlikely(element)
}

fn content_root(document: &Html) -> Option<ElementRef<'_>> {
    if let Ok(selector) = Selector::parse("body") {
        if let Some(body) = document.select(&selector).next() {
            return Some(body);
        }
    }
    Some(document.root_element())
}

fn grab_article(root: ElementRef<'_>, strict: bool) -> Option<Article<'_>> {
    let mut scores = HashMap::new();
    let mut candidates: Vec<ElementRef<'_>> = Vec::new();

    for element in root.descendants().filter_map(ElementRef::wrap) {
        if !is_scorable(&element) || is_excluded(&element, root, strict) {
            continue;
        }

        let text = visible_text(&element);
        let length = text.chars().count();
        if length < MIN_PARAGRAPH_LEN {
            continue;
        }

        let commas = text.matches(',').count() as f64;
        let score = 1.0 + commas + (length as f64 / 100.0).floor().min(3.0);

        for (level, ancestor) in ancestors_within(&element, root)
            .into_iter()
            .take(SCORED_ANCESTORS)
            .enumerate()
        {
            let entry = scores.entry(ancestor.id()).or_insert_with(|| {
                candidates.push(ancestor);
                initial_score(&ancestor)
            });
            let divider = match level {
                0 => 1.0,
                1 => 2.0,
                l => l as f64 * 3.0,
            };
            *entry += score / divider;
        }
    }

    let mut top: Option<(ElementRef<'_>, f64)> = None;
    let mut final_scores = HashMap::new();
    for candidate in &candidates {
        let raw = scores.get(&candidate.id()).copied().unwrap_or(0.0);
        let score = raw * (1.0 - link_density(candidate));
        final_scores.insert(candidate.id(), score);
        // Earlier candidates win ties
        if top.map_or(true, |(_, best)| score > best) {
            top = Some((*candidate, score));
        }
    }

    let Some((top, top_score)) = top else {
        return if strict { None } else { fallback(root) };
    };

    debug!(
        tag = top.value().name(),
        score = top_score,
        candidates = candidates.len(),
        strict,
        "Selected top candidate"
    );

    let elements = match top.parent().and_then(ElementRef::wrap) {
        Some(parent) if top.id() != root.id() => {
            let threshold = (top_score * 0.2).max(10.0);
            parent
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|sibling| {
                    if sibling.id() == top.id() {
                        return true;
                    }
                    if is_excluded(sibling, root, strict) {
                        return false;
                    }
                    let bonus = if shares_class(sibling, &top) {
                        top_score * 0.2
                    } else {
                        0.0
                    };
                    if let Some(score) = final_scores.get(&sibling.id()) {
                        if score + bonus >= threshold {
                            return true;
                        }
                    }
                    is_related_sibling(sibling, &top)
                })
                .collect()
        }
        _ => vec![top],
    };

    let text_length = elements
        .iter()
        .map(|e| visible_text(e).chars().count())
        .sum();

    Some(Article {
        elements,
        text_length,
        strict,
    })
}

/// The whole root, used when nothing scored in either pass
fn fallback(root: ElementRef<'_>) -> Option<Article<'_>> {
    let text_length = visible_text(&root).chars().count();
    let has_images = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .any(|e| e.value().name() == "img");

    if text_length == 0 && !has_images {
        return None;
    }

    debug!("No scored candidates, using the whole page body");
    Some(Article {
        elements: vec![root],
        text_length,
        strict: false,
    })
}

/// Ancestors of `element` up to and including `root`, nearest first
fn ancestors_within<'a>(element: &ElementRef<'a>, root: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut ancestors = Vec::new();
    for ancestor in element.ancestors().filter_map(ElementRef::wrap) {
        ancestors.push(ancestor);
        if ancestor.id() == root.id() {
            break;
        }
    }
    ancestors
}

fn is_scorable(element: &ElementRef<'_>) -> bool {
    let name = element.value().name();
    if SCORABLE_TAGS.contains(&name) {
        return true;
    }
    name == "div"
        && !element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .any(|e| DIV_BLOCK_TAGS.contains(&e.value().name()))
}

/// Whether `element` or an ancestor below `root` should not be scored
fn is_excluded(element: &ElementRef<'_>, root: ElementRef<'_>, strict: bool) -> bool {
    let mut current = Some(*element);
    while let Some(node) = current {
        if node.id() == root.id() {
            break;
        }
        if SKIPPED_TAGS.contains(&node.value().name()) || is_hidden(&node) {
            return true;
        }
        if strict && is_unlikely(&node) {
            return true;
        }
        current = node.parent().and_then(ElementRef::wrap);
    }
    false
}

fn is_hidden(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() || value.attr("aria-hidden") == Some("true") {
        return true;
    }
    value
        .attr("style")
        .map(|style| style.replace(' ', "").to_lowercase().contains("display:none"))
        .unwrap_or(false)
}

fn is_unlikely(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    let name = value.name();
    if matches!(name, "body" | "html" | "a" | "article" | "main") {
        return false;
    }
    if UNLIKELY_TAGS.contains(&name) {
        return true;
    }
    if let Some(role) = value.attr("role") {
        if UNLIKELY_ROLES.contains(&role.trim().to_lowercase().as_str()) {
            return true;
        }
    }

    let hints = class_and_id(element);
    UNLIKELY_HINTS.iter().any(|hint| hints.contains(hint))
        && !MAYBE_HINTS.iter().any(|hint| hints.contains(hint))
}

fn class_and_id(element: &ElementRef<'_>) -> String {
    let value = element.value();
    format!(
        "{} {}",
        value.attr("class").unwrap_or(""),
        value.attr("id").unwrap_or("")
    )
    .to_lowercase()
}

fn class_weight(element: &ElementRef<'_>) -> f64 {
    let value = element.value();
    let mut weight = 0.0;
    for attr in [value.attr("class"), value.attr("id")].into_iter().flatten() {
        let attr = attr.to_lowercase();
        if NEGATIVE_HINTS.iter().any(|hint| attr.contains(hint)) {
            weight -= 25.0;
        }
        if POSITIVE_HINTS.iter().any(|hint| attr.contains(hint)) {
            weight += 25.0;
        }
    }
    weight
}

fn initial_score(element: &ElementRef<'_>) -> f64 {
    let base = match element.value().name() {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    base + class_weight(element)
}

/// Share of an element's text that sits inside links
fn link_density(element: &ElementRef<'_>) -> f64 {
    let total = visible_text(element).chars().count();
    if total == 0 {
        return 0.0;
    }
    let linked: usize = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "a")
        .map(|a| visible_text(&a).chars().count())
        .sum();
    linked as f64 / total as f64
}

fn shares_class(a: &ElementRef<'_>, b: &ElementRef<'_>) -> bool {
    match (a.value().attr("class"), b.value().attr("class")) {
        (Some(x), Some(y)) => !x.trim().is_empty() && x == y,
        _ => false,
    }
}

/// Unscored siblings kept alongside the top candidate
fn is_related_sibling(sibling: &ElementRef<'_>, top: &ElementRef<'_>) -> bool {
    match sibling.value().name() {
        // A page heading just before the content keeps the title with it
        "h1" => sibling
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .any(|e| e.id() == top.id()),
        "p" => {
            let text = visible_text(sibling);
            let length = text.chars().count();
            let density = link_density(sibling);
            (length > 80 && density < 0.25)
                || (length > 0 && length <= 80 && density == 0.0 && text.contains(". "))
        }
        _ => false,
    }
}
