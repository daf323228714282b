//! HTML to Markdown conversion
//!
//! Conversion walks the element tree once. For each element the ordered
//! rule table is consulted and the first rule whose filter matches renders
//! the element; elements no rule claims fall through to the default
//! rendering (ATX headings, `-` bullets, `_` emphasis, `**` strong, inline
//! links, `---` rules).
//!
//! Block output is wrapped in blank lines and `join` collapses adjacent
//! separators, so the finished document never has more than one blank line
//! between blocks outside of code fences.

use scraper::{ElementRef, Node};
use url::Url;

use super::language::{language_from_nodes, normalize_language};

/// Elements that never carry readable content
const REMOVED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "ins", "ads", "frame", "object", "embed", "template",
];

/// Elements rendered as blocks by the default rendering
const BLOCK_TAGS: &[&str] = &[
    "address",
    "article",
    "aside",
    "body",
    "center",
    "dd",
    "details",
    "dialog",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "header",
    "main",
    "nav",
    "p",
    "section",
    "summary",
];

/// Markup with no text worth keeping
const IGNORED_TAGS: &[&str] = &[
    "head", "title", "meta", "link", "base", "svg", "canvas", "button", "input", "select",
    "textarea", "option",
];

/// Decides whether a rule applies to an element
pub type Filter = fn(&ElementRef<'_>) -> bool;

/// Renders an element claimed by a rule
pub type Replacement = fn(&MarkdownConverter, &ElementRef<'_>) -> String;

/// One entry of the rule table
#[derive(Clone, Copy)]
pub struct Rule {
    name: &'static str,
    filter: Filter,
    replacement: Replacement,
}

impl Rule {
    pub const fn new(name: &'static str, filter: Filter, replacement: Replacement) -> Self {
        Self {
            name,
            filter,
            replacement,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Converter state for one extraction
#[derive(Debug)]
pub struct MarkdownConverter {
    rules: Vec<Rule>,
    base_url: Option<Url>,
}

impl MarkdownConverter {
    /// Converter with the default rule table
    pub fn new(base_url: Option<Url>) -> Self {
        Self {
            rules: default_rules(),
            base_url,
        }
    }

    /// Converter resolving relative URLs against `page_url`
    pub fn for_page(page_url: &str) -> Self {
        Self::new(Url::parse(page_url).ok())
    }

    /// Put `rule` ahead of every existing rule
    pub fn with_rule_first(mut self, rule: Rule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(Rule::name).collect()
    }

    /// Convert `root` (including itself) to Markdown
    pub fn convert(&self, root: ElementRef<'_>) -> String {
        finish(&self.render(&root))
    }

    /// Convert several elements, in order, into one document
    pub fn convert_all(&self, roots: &[ElementRef<'_>]) -> String {
        let mut out = String::new();
        for root in roots {
            join(&mut out, &block(self.render(root)));
        }
        finish(&out)
    }

    /// Resolve `raw` against the page URL when possible
    pub fn resolve_url(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return String::new();
        }
        match &self.base_url {
            Some(base) => base
                .join(raw)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| raw.to_string()),
            None => raw.to_string(),
        }
    }

    fn render(&self, element: &ElementRef<'_>) -> String {
        match self.rules.iter().find(|rule| (rule.filter)(element)) {
            Some(rule) => (rule.replacement)(self, element),
            None => self.render_default(element),
        }
    }

    fn render_children(&self, element: &ElementRef<'_>) -> String {
        let mut out = String::new();
        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    // Leading space survives here; block edges trim it later
                    let collapsed = collapse_whitespace(text);
                    let piece = if out.ends_with('\n') || out.ends_with(' ') {
                        collapsed.trim_start()
                    } else {
                        collapsed.as_str()
                    };
                    out.push_str(&escape_text(piece));
                }
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        let rendered = self.render(&child);
                        join(&mut out, &rendered);
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn render_default(&self, element: &ElementRef<'_>) -> String {
        let name = element.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                let text = single_line(&self.render_children(element));
                if text.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{} {}\n\n", "#".repeat(level), text)
                }
            }
            "br" => "  \n".to_string(),
            "hr" => "\n\n---\n\n".to_string(),
            "strong" | "b" => wrap_inline(&self.render_children(element), "**"),
            "em" | "i" => wrap_inline(&self.render_children(element), "_"),
            "code" | "kbd" | "samp" => with_edges(
                &collapse_whitespace(&raw_text(element)),
                inline_code(&visible_text(element)),
            ),
            "a" => self.render_link(element),
            "blockquote" => {
                let body = finish(&self.render_children(element));
                let quoted: Vec<String> = body
                    .lines()
                    .map(|line| {
                        if line.is_empty() {
                            ">".to_string()
                        } else {
                            format!("> {}", line)
                        }
                    })
                    .collect();
                block(quoted.join("\n"))
            }
            "ul" => self.render_list(element, false),
            "ol" => self.render_list(element, true),
            "li" => block(format!("- {}", finish(&self.render_children(element)))),
            "pre" => fenced(&raw_text(element), ""),
            _ if IGNORED_TAGS.contains(&name) => String::new(),
            _ if BLOCK_TAGS.contains(&name) => block(self.render_children(element)),
            _ => self.render_children(element),
        }
    }

    fn render_link(&self, element: &ElementRef<'_>) -> String {
        let content = self.render_children(element);
        let text = content.trim();
        let href = element.value().attr("href").unwrap_or("").trim();

        if text.is_empty() {
            return String::new();
        }
        if href.is_empty() || href.starts_with("javascript:") {
            return content;
        }

        let href = self.resolve_url(href);
        let link = match element.value().attr("title").map(str::trim) {
            Some(title) if !title.is_empty() => {
                format!("[{}]({} \"{}\")", text, href, title.replace('"', "\\\""))
            }
            _ => format!("[{}]({})", text, href),
        };
        with_edges(&content, link)
    }

    fn render_list(&self, element: &ElementRef<'_>, ordered: bool) -> String {
        let mut index: usize = element
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);

        let mut items = Vec::new();
        for item in element.children().filter_map(ElementRef::wrap) {
            if item.value().name() != "li" {
                let rendered = finish(&self.render(&item));
                if !rendered.is_empty() {
                    items.push(rendered);
                }
                continue;
            }

            let marker = if ordered {
                format!("{}. ", index)
            } else {
                "- ".to_string()
            };
            index += 1;

            let body = finish(&self.render_children(&item));
            let indent = " ".repeat(marker.len());
            let mut rendered = marker;
            for (i, line) in body.lines().enumerate() {
                if i > 0 {
                    rendered.push('\n');
                    if !line.is_empty() {
                        rendered.push_str(&indent);
                    }
                }
                rendered.push_str(line);
            }
            items.push(rendered);
        }

        block(items.join("\n"))
    }
}

/// The built-in rule table, in priority order
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule::new("remove-elements", is_removed, drop_element),
        Rule::new("images", is_image, image_markdown),
        Rule::new(
            "highlight-code-blocks",
            is_highlight_code_block,
            highlight_code_block,
        ),
        Rule::new("code-blocks", is_code_block, code_block),
        Rule::new("tables", is_table, table_markdown),
    ]
}

/// Replacement that renders nothing
pub fn drop_element(_: &MarkdownConverter, _: &ElementRef<'_>) -> String {
    String::new()
}

fn is_removed(element: &ElementRef<'_>) -> bool {
    REMOVED_TAGS.contains(&element.value().name())
}

fn is_image(element: &ElementRef<'_>) -> bool {
    element.value().name() == "img"
}

fn image_markdown(converter: &MarkdownConverter, element: &ElementRef<'_>) -> String {
    let alt = single_line(element.value().attr("alt").unwrap_or(""));
    let src = converter.resolve_url(element.value().attr("src").unwrap_or(""));
    format!("![{}]({})", alt, src)
}

/// The `div` wrapping a `pre`, when its classes mark a highlighter container
fn highlight_container<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    if element.value().name() != "pre" {
        return None;
    }
    let parent = element.parent().and_then(ElementRef::wrap)?;
    let is_container = parent.value().name() == "div"
        && parent
            .value()
            .classes()
            .any(|class| class.starts_with("highlight-"));
    is_container.then_some(parent)
}

fn is_highlight_code_block(element: &ElementRef<'_>) -> bool {
    highlight_container(element).is_some()
}

fn highlight_code_block(_: &MarkdownConverter, element: &ElementRef<'_>) -> String {
    let container = highlight_container(element);
    let language = language_from_nodes(&[container, Some(*element)]).unwrap_or_default();
    // Highlighter spans are flattened by taking the text only
    fenced(&raw_text(element), &normalize_language(&language))
}

fn first_code_descendant<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "code")
}

fn is_code_block(element: &ElementRef<'_>) -> bool {
    element.value().name() == "pre" && first_code_descendant(element).is_some()
}

fn code_block(_: &MarkdownConverter, element: &ElementRef<'_>) -> String {
    let code = first_code_descendant(element);
    let language = language_from_nodes(&[Some(*element), code]).unwrap_or_default();
    fenced(&raw_text(element), &normalize_language(&language))
}

fn is_table(element: &ElementRef<'_>) -> bool {
    element.value().name() == "table"
}

fn table_markdown(_: &MarkdownConverter, element: &ElementRef<'_>) -> String {
    let rows: Vec<ElementRef<'_>> = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tr")
        .collect();
    if rows.is_empty() {
        return String::new();
    }

    let mut markdown = String::new();
    for (index, row) in rows.iter().enumerate() {
        let cells: Vec<ElementRef<'_>> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .collect();

        let texts: Vec<String> = cells
            .iter()
            .map(|cell| visible_text(cell).replace('|', "\\|"))
            .collect();
        markdown.push_str(&format!("| {} |\n", texts.join(" | ")));

        if index == 0 && cells.iter().any(|cell| cell.value().name() == "th") {
            let separator = vec!["---"; cells.len()].join(" | ");
            markdown.push_str(&format!("| {} |\n", separator));
        }
    }

    block(markdown)
}

/// Fence `code` with an optional language tag
fn fenced(code: &str, language: &str) -> String {
    let code = code.trim_matches('\n');
    if code.trim().is_empty() {
        return String::new();
    }

    let mut fence = "```".to_string();
    while code.contains(fence.as_str()) {
        fence.push('`');
    }
    format!("\n\n{fence}{language}\n{code}\n{fence}\n\n")
}

fn inline_code(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    if text.contains('`') {
        format!("`` {} ``", text)
    } else {
        format!("`{}`", text)
    }
}

fn wrap_inline(content: &str, delimiter: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_string();
    }
    with_edges(content, format!("{delimiter}{trimmed}{delimiter}"))
}

/// Carry the outer whitespace of `content` over to `rendered`
fn with_edges(content: &str, rendered: String) -> String {
    if rendered.is_empty() {
        return rendered;
    }
    let lead = if content.starts_with(char::is_whitespace) {
        " "
    } else {
        ""
    };
    let trail = if content.ends_with(char::is_whitespace) {
        " "
    } else {
        ""
    };
    format!("{lead}{rendered}{trail}")
}

/// Backslash-escape text that Markdown would otherwise read as syntax
fn escape_text(text: &str) -> String {
    let body = text.trim_start();
    if body.is_empty() {
        return text.to_string();
    }

    let mut escaped = String::with_capacity(body.len() + 4);
    for c in body.chars() {
        if matches!(c, '\\' | '*' | '_' | '`' | '[' | ']') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    let indent = &text[..text.len() - body.len()];
    format!("{}{}", indent, escape_line_start(&escaped))
}

/// Escape a leading heading, quote, list or rule marker
fn escape_line_start(text: &str) -> String {
    let hashes = text.chars().take_while(|&c| c == '#').count();
    if (1..=6).contains(&hashes) && text[hashes..].starts_with(' ') {
        return format!("\\{}", text);
    }
    if text.starts_with(&['-', '=', '>'][..])
        || text.starts_with("+ ")
        || text.starts_with("~~~")
    {
        return format!("\\{}", text);
    }

    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && text[digits..].starts_with(". ") {
        return format!("{}\\{}", &text[..digits], &text[digits..]);
    }
    text.to_string()
}

/// Wrap content as a block separated by blank lines
fn block(content: String) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("\n\n{}\n\n", trimmed)
    }
}

/// Append `piece`, merging the newlines on either side of the seam
fn join(out: &mut String, piece: &str) {
    if piece.is_empty() {
        return;
    }

    let body = piece.trim_start_matches('\n');
    let leading = piece.len() - body.len();
    let trailing = out.len() - out.trim_end_matches('\n').len();
    let separator = leading.max(trailing).min(2);

    if separator > 0 {
        // A single newline can end a `<br>` hard break, keep its spaces
        let kept = if separator == 1 {
            out.trim_end_matches('\n').len()
        } else {
            out.trim_end().len()
        };
        out.truncate(kept);
        if !out.is_empty() {
            out.push_str(&"\n".repeat(separator));
        }
        if body.trim().is_empty() {
            out.push_str(body);
        } else {
            out.push_str(body.trim_start_matches(' '));
        }
    } else if out.ends_with(' ') && piece.starts_with(' ') {
        let kept = out.trim_end_matches(' ').len();
        out.truncate(kept);
        out.push_str(piece);
    } else {
        out.push_str(piece);
    }
}

fn finish(markdown: &str) -> String {
    markdown.trim().to_string()
}

/// Text of an element with whitespace preserved (for code)
fn raw_text(element: &ElementRef<'_>) -> String {
    element.text().collect()
}

/// Text of an element with whitespace collapsed, skipping non-content tags
pub(crate) fn visible_text(element: &ElementRef<'_>) -> String {
    let mut text = String::new();
    push_visible_text(element, &mut text);
    collapse_whitespace(&text).trim().to_string()
}

fn push_visible_text(element: &ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if !REMOVED_TAGS.contains(&e.name()) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_visible_text(&child, out);
                }
            }
            _ => {}
        }
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn single_line(text: &str) -> String {
    collapse_whitespace(text).trim().to_string()
}
