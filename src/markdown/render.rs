//! Markup subtree → Markdown rendering.
//!
//! Rendering is a pure string build over a [`MarkupTree`]. Block elements
//! come back wrapped in blank lines, inline elements come back bare, and a
//! final pass squeezes blank-line runs down to the configured maximum.

use crate::address::AddressResolver;
use crate::dom::{MarkupTree, NodeData, NodeId};
use crate::normalize::TagPolicy;

use super::escape::{
    calculate_fence_length, calculate_inline_code_ticks, collapse_whitespace, encode_link_target,
    escape_markdown,
};

/// Options controlling Markdown output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Marker for unordered list items.
    pub bullet_marker: char,
    /// Longest run of newlines kept in the output (2 = one blank line).
    pub max_consecutive_newlines: usize,
    /// Keep images whose source is already a `data:` URI.
    pub keep_data_images: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            bullet_marker: '-',
            max_consecutive_newlines: 2,
            keep_data_images: true,
        }
    }
}

/// Renders markup subtrees to Markdown, resolving link and image targets
/// through an [`AddressResolver`].
pub struct MarkdownRenderer<'a> {
    options: &'a MarkdownOptions,
    resolver: &'a dyn AddressResolver,
}

/// Elements nested deeper than this below the rendered node contribute
/// their plain text only.
const MAX_DEPTH: usize = 128;

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "body", "caption", "center", "dd", "details", "div", "dl",
    "dt", "figcaption", "figure", "footer", "header", "hgroup", "html", "main", "nav", "p",
    "section", "summary",
];

impl<'a> MarkdownRenderer<'a> {
    pub fn new(options: &'a MarkdownOptions, resolver: &'a dyn AddressResolver) -> Self {
        Self { options, resolver }
    }

    /// Render the content of `node`, excluding the node's own tag.
    pub fn render_inner(&self, tree: &MarkupTree, node: NodeId) -> String {
        self.finish(&self.children(tree, node, 0))
    }

    /// Render `node` itself, so container semantics (list numbering,
    /// quoting) are kept.
    pub fn render_outer(&self, tree: &MarkupTree, node: NodeId) -> String {
        self.finish(&self.node(tree, node, 0))
    }

    fn node(&self, tree: &MarkupTree, id: NodeId, depth: usize) -> String {
        match tree.get(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => escape_markdown(&collapse_whitespace(text)),
            Some(NodeData::Element { .. }) if depth >= MAX_DEPTH => {
                escape_markdown(&collapse_whitespace(&tree.text_content(id)))
            }
            Some(NodeData::Element { .. }) => self.element(tree, id, depth + 1),
            Some(NodeData::Document) => self.children(tree, id, depth),
            _ => String::new(),
        }
    }

    fn children(&self, tree: &MarkupTree, id: NodeId, depth: usize) -> String {
        let mut out = String::new();
        for child in tree.children(id) {
            push_piece(&mut out, &self.node(tree, child, depth));
        }
        out
    }

    fn element(&self, tree: &MarkupTree, id: NodeId, depth: usize) -> String {
        let tag = tree.tag_name(id).unwrap_or_default().to_ascii_lowercase();
        if TagPolicy::of(&tag) == TagPolicy::Omit {
            return String::new();
        }

        match tag.as_str() {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(tag.as_bytes()[1] - b'0');
                let text = single_line(&self.children(tree, id, depth));
                if text.is_empty() {
                    String::new()
                } else {
                    block(&format!("{} {text}", "#".repeat(level)))
                }
            }
            "blockquote" => block(&quote(self.children(tree, id, depth).trim())),
            "ul" => block(&self.list(tree, id, false, depth)),
            "ol" => block(&self.list(tree, id, true, depth)),
            "li" => {
                let marker = format!("{} ", self.options.bullet_marker);
                block(&self.list_item(tree, id, &marker, depth))
            }
            "pre" => block(&fenced(&tree.text_content(id))),
            "code" | "kbd" | "samp" | "tt" => inline_code(&tree.text_content(id)),
            "em" | "i" | "cite" | "dfn" | "var" => wrap("_", &self.children(tree, id, depth)),
            "strong" | "b" => wrap("**", &self.children(tree, id, depth)),
            "del" | "s" | "strike" => wrap("~~", &self.children(tree, id, depth)),
            "br" => "  \n".to_string(),
            "hr" => block("---"),
            "a" => self.link(tree, id, depth),
            "img" => self.image(tree, id),
            "sup" => self.superscript(tree, id, depth),
            "sub" => format!("<sub>{}</sub>", self.children(tree, id, depth).trim()),
            "table" => block(&self.table(tree, id, depth)),
            "noscript" | "template" | "title" => String::new(),
            t if BLOCK_TAGS.contains(&t) => block(&self.children(tree, id, depth)),
            _ => self.children(tree, id, depth),
        }
    }

    fn list(&self, tree: &MarkupTree, id: NodeId, ordered: bool, depth: usize) -> String {
        let mut number = if ordered {
            tree.attr(id, "start")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(1)
        } else {
            1
        };

        let mut items = Vec::new();
        for child in tree.children(id) {
            if tree.tag_name(child) == Some("li") {
                let marker = if ordered {
                    format!("{number}. ")
                } else {
                    format!("{} ", self.options.bullet_marker)
                };
                number += 1;
                items.push(self.list_item(tree, child, &marker, depth));
            } else {
                let stray = self.node(tree, child, depth);
                let stray = stray.trim();
                if !stray.is_empty() {
                    items.push(stray.to_string());
                }
            }
        }
        items.join("\n")
    }

    /// One list item: the marker on the first line, continuation lines
    /// indented to align with the item text.
    fn list_item(&self, tree: &MarkupTree, id: NodeId, marker: &str, depth: usize) -> String {
        let content = self.children(tree, id, depth);
        let indent = " ".repeat(marker.len());
        let mut out = String::new();
        for (i, line) in content.trim().lines().filter(|l| !l.trim().is_empty()).enumerate() {
            if i == 0 {
                out.push_str(marker);
            } else {
                out.push('\n');
                out.push_str(&indent);
            }
            out.push_str(line);
        }
        if out.is_empty() {
            marker.trim_end().to_string()
        } else {
            out
        }
    }

    fn link(&self, tree: &MarkupTree, id: NodeId, depth: usize) -> String {
        let content = self.children(tree, id, depth);
        let Some(href) = tree.attr(id, "href").filter(|h| !h.is_empty()) else {
            return content;
        };

        let target = encode_link_target(&self.resolver.resolve_href(href));
        let title = title_suffix(tree, id);
        let text = content.replace(['\r', '\n'], " ");
        let (lead, text, trail) = split_padding(&text);
        format!("{lead}[{text}]({target}{title}){trail}")
    }

    fn image(&self, tree: &MarkupTree, id: NodeId) -> String {
        let src = tree.attr(id, "src").unwrap_or_default();
        let is_data = src
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"));
        if src.is_empty() || (is_data && !self.options.keep_data_images) {
            return String::new();
        }

        let target = self.resolver.resolve_src(src);
        let alt = escape_markdown(&collapse_whitespace(tree.attr(id, "alt").unwrap_or_default()));
        let title = title_suffix(tree, id);
        format!("![{}]({target}{title})", alt.trim())
    }

    /// Superscripts keep their tag; numeric ones double as reference
    /// markers.
    fn superscript(&self, tree: &MarkupTree, id: NodeId, depth: usize) -> String {
        let content = self.children(tree, id, depth);
        let content = content.trim();
        if is_numeric(content) {
            format!("<sup>({content})[#refs:{content}]</sup>")
        } else {
            format!("<sup>{content}</sup>")
        }
    }

    fn table(&self, tree: &MarkupTree, id: NodeId, depth: usize) -> String {
        let mut rows = Vec::new();
        self.collect_rows(tree, id, &mut rows, depth);

        let mut out = Vec::with_capacity(rows.len() + 1);
        for (i, cells) in rows.iter().enumerate() {
            out.push(format!("| {} |", cells.join(" | ")));
            if i == 0 {
                let rule = vec!["---"; cells.len().max(1)].join(" | ");
                out.push(format!("| {rule} |"));
            }
        }
        out.join("\n")
    }

    fn collect_rows(
        &self,
        tree: &MarkupTree,
        id: NodeId,
        rows: &mut Vec<Vec<String>>,
        depth: usize,
    ) {
        for child in tree.children(id) {
            match tree.tag_name(child) {
                Some("tr") => {
                    let cells = tree
                        .children(child)
                        .filter(|&c| matches!(tree.tag_name(c), Some("td" | "th")))
                        .map(|c| single_line(&self.children(tree, c, depth)).replace('|', "\\|"))
                        .collect();
                    rows.push(cells);
                }
                Some("thead" | "tbody" | "tfoot") if depth < MAX_DEPTH => {
                    self.collect_rows(tree, child, rows, depth + 1)
                }
                _ => {}
            }
        }
    }

    /// Squeeze blank-line runs and strip whitespace-only lines.
    fn finish(&self, raw: &str) -> String {
        let max = self.options.max_consecutive_newlines.max(1);
        let mut out = String::with_capacity(raw.len());
        let mut pending = 0;

        for (i, line) in raw.split('\n').enumerate() {
            if i > 0 {
                pending += 1;
            }
            if line.trim().is_empty() {
                continue;
            }
            if !out.is_empty() {
                out.extend(std::iter::repeat_n('\n', pending.min(max)));
            }
            pending = 0;
            out.push_str(line);
        }

        out.trim().to_string()
    }
}

/// Append a rendered piece, keeping spacing sane across block boundaries.
fn push_piece(out: &mut String, piece: &str) {
    if piece.is_empty() {
        return;
    }
    if out.ends_with('\n') {
        out.push_str(piece.trim_start_matches(' '));
    } else if piece.starts_with('\n') {
        let kept = out.trim_end_matches(' ').len();
        out.truncate(kept);
        out.push_str(piece);
    } else if out.ends_with(' ') && piece.starts_with(' ') {
        out.push_str(&piece[1..]);
    } else {
        out.push_str(piece);
    }
}

fn block(content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        String::new()
    } else {
        format!("\n\n{content}\n\n")
    }
}

fn single_line(content: &str) -> String {
    collapse_whitespace(content).trim().to_string()
}

fn quote(content: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in content.lines() {
        if line.trim().is_empty() {
            if lines.last().is_some_and(|l| l != ">") {
                lines.push(">".to_string());
            }
        } else {
            lines.push(format!("> {line}"));
        }
    }
    lines.join("\n")
}

fn fenced(code: &str) -> String {
    let code = code.strip_prefix('\n').unwrap_or(code).trim_end();
    if code.trim().is_empty() {
        return String::new();
    }
    let fence = "`".repeat(calculate_fence_length(code, '`'));
    format!("{fence}\n{code}\n{fence}")
}

fn inline_code(code: &str) -> String {
    let code = collapse_whitespace(code);
    if code.trim().is_empty() {
        return code;
    }
    let ticks = "`".repeat(calculate_inline_code_ticks(&code));
    let pad = if code.starts_with('`') || code.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{ticks}{pad}{code}{pad}{ticks}")
}

/// Wrap inline content in a delimiter, keeping surrounding spaces outside it.
fn wrap(marker: &str, content: &str) -> String {
    let (lead, inner, trail) = split_padding(content);
    if inner.is_empty() {
        return content.to_string();
    }
    format!("{lead}{marker}{inner}{marker}{trail}")
}

fn split_padding(content: &str) -> (&str, &str, &str) {
    let inner = content.trim();
    if inner.is_empty() {
        return ("", "", "");
    }
    let lead = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if content.ends_with(char::is_whitespace) { " " } else { "" };
    (lead, inner, trail)
}

fn title_suffix(tree: &MarkupTree, id: NodeId) -> String {
    tree.attr(id, "title")
        .filter(|t| !t.is_empty())
        .map(|t| format!(" \"{}\"", t.replace('"', "\\\"")))
        .unwrap_or_default()
}

/// True when `value` starts with a finite number, the way lenient float
/// parsing reads footnote markers such as `12` or `3a`.
pub(crate) fn is_numeric(value: &str) -> bool {
    let value = value.trim_start();
    value
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .rev()
        .any(|end| {
            value[..end]
                .parse::<f64>()
                .is_ok_and(|n| n.is_finite())
        })
}
