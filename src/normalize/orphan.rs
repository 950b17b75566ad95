//! Placement of text that sits directly under grouping tags.

use crate::dom::{MarkupTree, NodeId};

use super::node::ContentNode;
use super::policy::TagPolicy;

/// Shape the emitted node for loose text.
///
/// Walks up from `text_node` to the first ancestor that is not an unwrap
/// tag. When one exists the text stays bare, since unwrap splicing already
/// places it inside that ancestor. When the walk reaches the document root
/// the text is wrapped in a synthesized `p`.
pub fn resolve_orphan(tree: &MarkupTree, text_node: NodeId, text: &str) -> ContentNode {
    let container = tree
        .ancestors(text_node)
        .filter_map(|id| tree.tag_name(id))
        .find(|tag| TagPolicy::of(tag) != TagPolicy::Unwrap);

    match container {
        Some(_) => ContentNode::text(text),
        None => ContentNode::element("p", vec![ContentNode::text(text)]),
    }
}
