//! Markup → content tree normalization.
//!
//! The normalizer walks a parsed [`MarkupTree`] and produces a sequence of
//! [`ContentNode`]s:
//!
//! - non-content subtrees (`script`, `style`, ...) are dropped
//! - grouping tags (`div`, `span`, ...) are spliced away
//! - prose blocks and lists are flattened into a single Markdown text child
//! - everything else is kept as a structured element
//! - `href`/`src` attributes are rewritten through an [`AddressResolver`]
//!
//! No node without content is ever emitted.

mod node;
mod orphan;
mod policy;

use std::collections::BTreeMap;

use crate::address::AddressResolver;
use crate::dom::{MarkupTree, NodeData, NodeId, parse_html};
use crate::markdown::{MarkdownOptions, MarkdownRenderer};

pub use node::{Attr, ContentNode};
pub use orphan::resolve_orphan;
pub use policy::{MARKDOWN_INNER_TAGS, MARKDOWN_OUTER_TAGS, OMITTED_TAGS, TagPolicy, UNWRAP_TAGS};

/// Options for normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Options for the Markdown flattening of prose blocks and lists.
    pub markdown: MarkdownOptions,
}

/// Parse `html` and normalize the whole document.
pub fn normalize_html(
    html: &str,
    resolver: &dyn AddressResolver,
    options: &NormalizeOptions,
) -> Vec<ContentNode> {
    let tree = parse_html(html);
    Normalizer::new(&tree, resolver, options).normalize_document()
}

/// Normalizes nodes of one markup tree.
pub struct Normalizer<'a> {
    tree: &'a MarkupTree,
    resolver: &'a dyn AddressResolver,
    renderer: MarkdownRenderer<'a>,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        tree: &'a MarkupTree,
        resolver: &'a dyn AddressResolver,
        options: &'a NormalizeOptions,
    ) -> Self {
        Self {
            tree,
            resolver,
            renderer: MarkdownRenderer::new(&options.markdown, resolver),
        }
    }

    /// Normalize everything under the document root.
    pub fn normalize_document(&self) -> Vec<ContentNode> {
        self.normalize([self.tree.document()])
    }

    /// Normalize a sequence of sibling nodes, in order.
    pub fn normalize(&self, nodes: impl IntoIterator<Item = NodeId>) -> Vec<ContentNode> {
        let mut out = Vec::new();
        for id in nodes {
            self.push_node(id, &mut out);
        }
        out
    }

    /// Walk the subtree under `root` with an explicit stack of open frames,
    /// so nesting depth is bounded by the heap rather than the call stack.
    fn push_node(&self, root: NodeId, out: &mut Vec<ContentNode>) {
        let mut stack = match self.visit(root) {
            Visit::Enter(frame) => vec![frame],
            Visit::Emit(node) => {
                out.push(node);
                return;
            }
            Visit::Skip => return,
        };

        while let Some(top) = stack.last_mut() {
            if let Some(child) = top.next {
                top.next = self.tree.get(child).and_then(|node| node.next_sibling);
                match self.visit(child) {
                    Visit::Enter(frame) => stack.push(frame),
                    Visit::Emit(node) => top.children.push(node),
                    Visit::Skip => {}
                }
                continue;
            }

            let Some(done) = stack.pop() else { break };
            match stack.last_mut() {
                Some(parent) => done.finish(&mut parent.children),
                None => done.finish(out),
            }
        }
    }

    fn visit(&self, id: NodeId) -> Visit {
        let Some(node) = self.tree.get(id) else {
            return Visit::Skip;
        };

        match &node.data {
            NodeData::Document => Visit::Enter(Frame::splice(node.first_child)),
            NodeData::Element { name, .. } => {
                let tag = name.local.as_ref().to_ascii_lowercase();
                let children = match TagPolicy::of(&tag) {
                    TagPolicy::Omit => return Visit::Skip,
                    TagPolicy::Unwrap => return Visit::Enter(Frame::splice(node.first_child)),
                    TagPolicy::Structured => {
                        return Visit::Enter(Frame {
                            shell: Some((tag, self.attrs(id))),
                            next: node.first_child,
                            children: Vec::new(),
                        });
                    }
                    TagPolicy::FlattenInner => flattened(self.renderer.render_inner(self.tree, id)),
                    TagPolicy::FlattenOuter => flattened(self.renderer.render_outer(self.tree, id)),
                };
                if children.is_empty() {
                    return Visit::Skip;
                }
                Visit::Emit(ContentNode::Element {
                    tag,
                    attrs: self.attrs(id),
                    children,
                })
            }
            NodeData::Text(text) => {
                let text = text.trim();
                if text.is_empty() {
                    Visit::Skip
                } else if self.is_loose(node.parent) {
                    Visit::Emit(resolve_orphan(self.tree, id, text))
                } else {
                    Visit::Emit(ContentNode::text(text))
                }
            }
            NodeData::Comment(_) | NodeData::Doctype(_) => Visit::Skip,
        }
    }

    fn attrs(&self, id: NodeId) -> BTreeMap<Attr, String> {
        Attr::ALL
            .into_iter()
            .filter_map(|attr| {
                let value = self.tree.attr(id, attr.as_str()).filter(|v| !v.is_empty())?;
                let value = match attr {
                    Attr::Href => self.resolver.resolve_href(value),
                    Attr::Src => self.resolver.resolve_src(value),
                    Attr::Id => value.to_string(),
                };
                Some((attr, value))
            })
            .collect()
    }

    /// Text is loose when its parent carries no meaning of its own: the
    /// document itself or an unwrap tag.
    fn is_loose(&self, parent: Option<NodeId>) -> bool {
        let Some(parent) = parent else {
            return true;
        };
        match self.tree.tag_name(parent) {
            Some(tag) => TagPolicy::of(tag) == TagPolicy::Unwrap,
            None => true,
        }
    }
}

enum Visit {
    Enter(Frame),
    Emit(ContentNode),
    Skip,
}

/// An element whose children are still being walked. Frames without a
/// shell (the document and unwrap tags) splice their children into the
/// enclosing frame.
struct Frame {
    shell: Option<(String, BTreeMap<Attr, String>)>,
    next: Option<NodeId>,
    children: Vec<ContentNode>,
}

impl Frame {
    fn splice(first_child: Option<NodeId>) -> Self {
        Self {
            shell: None,
            next: first_child,
            children: Vec::new(),
        }
    }

    fn finish(self, out: &mut Vec<ContentNode>) {
        let Some((tag, attrs)) = self.shell else {
            out.extend(self.children);
            return;
        };
        let element = ContentNode::Element {
            tag,
            attrs,
            children: self.children,
        };
        if !element.is_empty() {
            out.push(element);
        }
    }
}

fn flattened(markdown: String) -> Vec<ContentNode> {
    let text = markdown.trim();
    if text.is_empty() {
        Vec::new()
    } else {
        vec![ContentNode::text(text)]
    }
}
