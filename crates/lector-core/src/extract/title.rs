//! Title derivation
//!
//! Titles come from the converted Markdown, never from the page's `<title>`.

/// Placeholder when the Markdown has no usable line
pub const UNTITLED: &str = "Untitled document";

/// Derive a title from Markdown
///
/// First `# ` heading, else first `## ` heading, else the first non-empty
/// line that is not an image or blockquote, cut to `max_chars` characters
/// with `...` appended when cut.
pub fn title_from_markdown(markdown: &str, max_chars: usize) -> String {
    let lines = || markdown.lines().map(str::trim);

    if let Some(title) = lines().find_map(|line| heading_text(line, "# ")) {
        return title;
    }
    if let Some(title) = lines().find_map(|line| heading_text(line, "## ")) {
        return title;
    }

    lines()
        .find(|line| !line.is_empty() && !line.starts_with('!') && !line.starts_with('>'))
        .map(|line| truncate_chars(line, max_chars))
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn heading_text(line: &str, marker: &str) -> Option<String> {
    line.strip_prefix(marker)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn truncate_chars(line: &str, max_chars: usize) -> String {
    match line.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &line[..cut]),
        None => line.to_string(),
    }
}
