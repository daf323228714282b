//! Code block language detection
//!
//! Recovers a language tag from the class names and data attributes that
//! syntax highlighters leave on `<pre>`/`<code>` elements, and collapses
//! common aliases to one canonical fence tag.

use scraper::ElementRef;

/// Alias -> canonical fence tag
const LANGUAGE_ALIASES: &[(&str, &str)] = &[
    // Shell family
    ("sh", "bash"),
    ("shell", "bash"),
    ("zsh", "bash"),
    ("fish", "bash"),
    ("ps1", "powershell"),
    ("bat", "batch"),
    ("cmd", "batch"),
    // JavaScript family
    ("js", "javascript"),
    ("jsx", "javascript"),
    ("ts", "typescript"),
    ("tsx", "typescript"),
    // Short names
    ("py", "python"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("kt", "kotlin"),
    ("cs", "csharp"),
    ("cc", "c"),
    ("h", "c"),
    ("yml", "yaml"),
];

const HIGHLIGHT_SOURCE_PREFIX: &str = "highlight-source-";
const LANGUAGE_PREFIX: &str = "language-";

/// Normalize a language identifier for a code fence
///
/// Unknown identifiers pass through lower-cased; empty input stays empty.
pub fn normalize_language(language: &str) -> String {
    let normalized = language.trim().to_lowercase();
    if normalized.is_empty() {
        return normalized;
    }

    LANGUAGE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(normalized)
}

/// First language hint found on `nodes`, checked in order
///
/// Per node: a `highlight-source-*` class, then `data-lang` /
/// `data-language`, then a `language-*` class.
pub fn language_from_nodes(nodes: &[Option<ElementRef<'_>>]) -> Option<String> {
    nodes.iter().flatten().find_map(|node| language_from_node(node))
}

fn language_from_node(node: &ElementRef<'_>) -> Option<String> {
    let element = node.value();

    if let Some(lang) = element
        .classes()
        .find_map(|class| class.strip_prefix(HIGHLIGHT_SOURCE_PREFIX))
        .filter(|lang| !lang.is_empty())
    {
        return Some(lang.to_string());
    }

    if let Some(lang) = element
        .attr("data-lang")
        .or_else(|| element.attr("data-language"))
        .map(str::trim)
        .filter(|lang| !lang.is_empty())
    {
        return Some(lang.to_string());
    }

    element.attr("class").and_then(language_from_class)
}

/// Extract the word following `language-` in a class attribute
pub fn language_from_class(class_name: &str) -> Option<String> {
    let start = class_name.find(LANGUAGE_PREFIX)? + LANGUAGE_PREFIX.len();
    let lang: String = class_name[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if lang.is_empty() {
        None
    } else {
        Some(lang)
    }
}
