//! Markup parsing into an arena tree.
//!
//! html5ever does the parsing; [`TreeBuilder`] receives its callbacks and
//! materializes a [`MarkupTree`] that the normalizer then walks as a plain,
//! immutable structure.

mod arena;
mod tree_sink;

pub use arena::{Ancestors, Attribute, Children, MarkupTree, Node, NodeData, NodeId};
pub use tree_sink::TreeBuilder;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

/// Parse a markup document into a [`MarkupTree`].
///
/// Parsing never fails: malformed markup is repaired the way a browser
/// would repair it.
pub fn parse_html(html: &str) -> MarkupTree {
    parse_document(TreeBuilder::new(), ParseOpts::default())
        .from_utf8()
        .one(html.as_bytes())
        .into_tree()
}
