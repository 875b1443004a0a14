//! Extract heading-scoped prose blocks from Wikipedia HTML pages.
//!
//! This crate walks the main article body in document order, tracks the
//! heading hierarchy, and emits one [`RawBlock`] per paragraph or list item
//! together with the chain of headings it sits under. Navigation boxes,
//! infoboxes, reference lists and similar non-content subtrees are skipped
//! before any text is collected, and everything below a "References",
//! "External links" (and similar) heading is dropped until a heading of equal
//! or shallower level starts a new branch.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{node::Node, ElementRef, Html, Selector};
use serde::Serialize;

const IGNORE_TAGS: &[&str] = &[
    "script", "style", "table", "sup", "noscript", "figure", "header", "footer", "nav", "aside",
];

const IGNORE_CLASSES: &[&str] = &[
    "ambox",
    "authority-control",
    "autocollapse",
    "catlinks",
    "cmbox",
    "collapsible-list",
    "dablink",
    "fmbox",
    "hatnote",
    "imbox",
    "infobox",
    "metadata",
    "messagebox",
    "mw-collapsible",
    "mw-editsection",
    "mw-editsection-bracket",
    "mw-footer",
    "mw-jump-link",
    "mw-references-wrap",
    "navbox",
    "navbox-inner",
    "navbox-list",
    "navbox-title",
    "ombox",
    "printfooter",
    "refbegin",
    "reference",
    "reference-text",
    "reflist",
    "references",
    "shortdescription",
    "sidebar",
    "thumb",
    "thumbcaption",
    "toc",
    "toccolours",
    "vertical-navbox",
];

const IGNORE_CLASS_PREFIXES: &[&str] = &["vector-toc", "toclimit-", "infobox-", "navbox-"];

/// Heading titles that open a suppressed region (matched at the start, case-insensitively).
const SUPPRESSED_HEADINGS: &str =
    r"(?i)^(?:references|external links|see also|notes|further reading|bibliography)";

/// A prose block together with the headings it appears under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawBlock {
    /// Active heading titles, outermost first. Suppressed branches never appear here.
    pub context_path: Vec<String>,
    /// Visible text with whitespace collapsed.
    pub text: String,
}

impl RawBlock {
    /// Heading chain joined with `" > "`, or an empty string before the first heading.
    pub fn joined_path(&self) -> String {
        self.context_path.join(" > ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum HeadingSlot {
    Title(String),
    Suppressed,
}

/// Per-document heading hierarchy keyed by level (1-6).
///
/// Recording a heading at level `L` discards every entry deeper than `L`. A
/// suppressed entry silences all content until a heading at level `<= L`
/// replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadingState {
    levels: BTreeMap<u8, HeadingSlot>,
}

impl HeadingState {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cleaned heading title at `level`, classifying it as suppressed when it
    /// names a reference-style section. Returns `true` when the heading was suppressed.
    pub fn record(&mut self, level: u8, title: &str) -> bool {
        let suppressed = is_suppressed_title(title);
        let slot = if suppressed {
            HeadingSlot::Suppressed
        } else {
            HeadingSlot::Title(title.to_string())
        };
        self.levels.retain(|&existing, _| existing < level);
        self.levels.insert(level, slot);
        suppressed
    }

    /// Whether any active level is suppressed.
    pub fn is_suppressed(&self) -> bool {
        self.levels
            .values()
            .any(|slot| matches!(slot, HeadingSlot::Suppressed))
    }

    /// Active, non-suppressed heading titles ordered from outermost to innermost.
    pub fn context_path(&self) -> Vec<String> {
        self.levels
            .values()
            .filter_map(|slot| match slot {
                HeadingSlot::Title(title) => Some(title.clone()),
                HeadingSlot::Suppressed => None,
            })
            .collect()
    }
}

/// Extracts prose blocks from a Wikipedia HTML document.
///
/// Headings update the hierarchy and are never emitted themselves. Documents
/// without any surviving paragraph or list item produce an empty vector.
///
/// # Example
///
/// ```
/// use wiki_parser::extract_blocks;
///
/// let html = r#"<div id="mw-content-text"><h2>Intro</h2><p>Hello <sup>[1]</sup>world.</p></div>"#;
/// let blocks = extract_blocks(html);
/// assert_eq!(blocks.len(), 1);
/// assert_eq!(blocks[0].text, "Hello world.");
/// assert_eq!(blocks[0].context_path, vec!["Intro".to_string()]);
/// ```
pub fn extract_blocks(html: &str) -> Vec<RawBlock> {
    let document = Html::parse_document(html);
    let root = select_content_root(&document).unwrap_or_else(|| document.root_element());

    let mut headings = HeadingState::new();
    let mut blocks = Vec::new();
    for node in root.select(content_selector()) {
        if has_ignored_ancestor(&node) {
            continue;
        }
        match classify_node(node.value().name()) {
            Some(NodeKind::Heading(level)) => {
                let mut buf = String::new();
                collect_text(&node, &mut buf, false);
                let title = clean_heading(&buf);
                if title.is_empty() {
                    continue;
                }
                if headings.record(level, &title) {
                    tracing::debug!(level, heading = %title, "suppressing section");
                }
            }
            Some(kind) => {
                if headings.is_suppressed() || has_content_ancestor(&node, &root) {
                    continue;
                }
                let mut buf = String::new();
                collect_text(&node, &mut buf, kind == NodeKind::ListItem);
                let text = normalize_whitespace(&buf);
                if !text.is_empty() {
                    blocks.push(RawBlock {
                        context_path: headings.context_path(),
                        text,
                    });
                }
            }
            None => {}
        }
    }

    blocks
}

/// Extracts the prose text of a Wikipedia HTML document, one block per line.
///
/// # Example
///
/// ```
/// use wiki_parser::extract_text;
///
/// let html = r#"<div id="mw-content-text"><p>Hello <sup>[1]</sup>world.</p></div>"#;
/// assert_eq!(extract_text(html), "Hello world.");
/// ```
pub fn extract_text(html: &str) -> String {
    extract_blocks(html)
        .into_iter()
        .map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a cleaned heading title opens a suppressed region.
pub fn is_suppressed_title(title: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(SUPPRESSED_HEADINGS).expect("valid suppression pattern"))
        .is_match(title)
}

/// Strips footnote markers and a trailing edit annotation, then collapses whitespace.
pub fn clean_heading(raw: &str) -> String {
    static FOOTNOTE: OnceLock<Regex> = OnceLock::new();
    static EDIT: OnceLock<Regex> = OnceLock::new();
    let footnote =
        FOOTNOTE.get_or_init(|| Regex::new(r"\[\s*\d+\s*\]").expect("valid footnote pattern"));
    let edit = EDIT.get_or_init(|| {
        Regex::new(r"(?i)\s*[\[(]\s*edit\s*[\])]\s*$").expect("valid edit pattern")
    });
    let collapsed = normalize_whitespace(&footnote.replace_all(raw, " "));
    normalize_whitespace(&edit.replace(&collapsed, ""))
}

fn content_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| {
        Selector::parse("h1, h2, h3, h4, h5, h6, p, li").expect("valid selector for content nodes")
    })
}

fn select_content_root(document: &Html) -> Option<ElementRef<'_>> {
    let selectors = [
        "#mw-content-text .mw-parser-output",
        "#mw-content-text",
        "#bodyContent .mw-parser-output",
        "#bodyContent",
        "body .mw-parser-output",
        "body",
    ];
    for selector in selectors {
        let parsed = Selector::parse(selector).expect("valid selector");
        if let Some(node) = document.select(&parsed).next() {
            return Some(node);
        }
    }
    None
}

fn collect_text(node: &ElementRef<'_>, out: &mut String, separate: bool) {
    for child in node.children() {
        match child.value() {
            Node::Text(text) => {
                if separate && !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(text);
            }
            Node::Element(element) => {
                if should_ignore_element(element) {
                    continue;
                }
                if let Some(child) = ElementRef::wrap(child) {
                    collect_text(&child, out, separate);
                }
            }
            _ => {}
        }
    }
}

fn should_ignore_element(element: &scraper::node::Element) -> bool {
    let tag_name = element.name();
    if tag_name == "body" || tag_name == "html" {
        return false;
    }
    if IGNORE_TAGS.contains(&tag_name) {
        return true;
    }
    element.classes().any(|class_name| {
        IGNORE_CLASSES.contains(&class_name)
            || IGNORE_CLASS_PREFIXES
                .iter()
                .any(|prefix| class_name.starts_with(prefix))
    })
}

fn has_ignored_ancestor(node: &ElementRef<'_>) -> bool {
    if should_ignore_element(node.value()) {
        return true;
    }
    node.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|element| should_ignore_element(element.value()))
}

/// Paragraphs nested in list items (and nested list items) are already covered by
/// the enclosing block's text.
fn has_content_ancestor(node: &ElementRef<'_>, root: &ElementRef<'_>) -> bool {
    for ancestor in node.ancestors() {
        if ancestor.id() == root.id() {
            return false;
        }
        if let Some(element) = ElementRef::wrap(ancestor) {
            if matches!(element.value().name(), "p" | "li") {
                return true;
            }
        }
    }
    false
}

/// Collapses runs of whitespace into single spaces and trims both ends.
pub fn normalize_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Heading(u8),
    Paragraph,
    ListItem,
}

fn classify_node(tag: &str) -> Option<NodeKind> {
    match tag {
        "h1" => Some(NodeKind::Heading(1)),
        "h2" => Some(NodeKind::Heading(2)),
        "h3" => Some(NodeKind::Heading(3)),
        "h4" => Some(NodeKind::Heading(4)),
        "h5" => Some(NodeKind::Heading(5)),
        "h6" => Some(NodeKind::Heading(6)),
        "p" => Some(NodeKind::Paragraph),
        "li" => Some(NodeKind::ListItem),
        _ => None,
    }
}
