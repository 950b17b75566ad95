//! Normalized content nodes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attributes carried over from the source markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attr {
    Href,
    Src,
    Id,
}

impl Attr {
    /// Every carried attribute, in output order.
    pub const ALL: [Attr; 3] = [Attr::Href, Attr::Src, Attr::Id];

    pub fn as_str(self) -> &'static str {
        match self {
            Attr::Href => "href",
            Attr::Src => "src",
            Attr::Id => "id",
        }
    }
}

/// One node of a normalized chapter tree.
///
/// Serializes as `{"tag": "p", "attrs": {...}, "children": [...]}` or
/// `{"text": "..."}`. Element `attrs` are left out when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentNode {
    Element {
        tag: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        attrs: BTreeMap<Attr, String>,
        #[serde(default)]
        children: Vec<ContentNode>,
    },
    Text {
        text: String,
    },
}

impl ContentNode {
    /// Element without attributes.
    pub fn element(tag: impl Into<String>, children: Vec<ContentNode>) -> Self {
        ContentNode::Element {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentNode::Text { text: text.into() }
    }

    /// Tag name, for elements.
    pub fn tag(&self) -> Option<&str> {
        match self {
            ContentNode::Element { tag, .. } => Some(tag),
            ContentNode::Text { .. } => None,
        }
    }

    /// Text content, for text nodes.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentNode::Text { text } => Some(text),
            ContentNode::Element { .. } => None,
        }
    }

    /// Child nodes; empty for text nodes.
    pub fn children(&self) -> &[ContentNode] {
        match self {
            ContentNode::Element { children, .. } => children,
            ContentNode::Text { .. } => &[],
        }
    }

    pub fn attr(&self, attr: Attr) -> Option<&str> {
        match self {
            ContentNode::Element { attrs, .. } => attrs.get(&attr).map(String::as_str),
            ContentNode::Text { .. } => None,
        }
    }

    /// True for nodes that carry nothing: elements without children and
    /// blank text. Such nodes are never emitted by the normalizer.
    pub fn is_empty(&self) -> bool {
        match self {
            ContentNode::Element { children, .. } => children.is_empty(),
            ContentNode::Text { text } => text.trim().is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialize_shapes() {
        let mut attrs = BTreeMap::new();
        attrs.insert(Attr::Id, "n1".to_string());
        attrs.insert(Attr::Href, "#c2,n1".to_string());
        let node = ContentNode::Element {
            tag: "a".into(),
            attrs,
            children: vec![ContentNode::text("1")],
        };

        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"tag": "a", "attrs": {"href": "#c2,n1", "id": "n1"}, "children": [{"text": "1"}]})
        );
        assert_eq!(
            serde_json::to_value(ContentNode::element("p", vec![ContentNode::text("x")])).unwrap(),
            json!({"tag": "p", "children": [{"text": "x"}]})
        );
    }

    #[test]
    fn test_deserialize_shapes() {
        let nodes: Vec<ContentNode> = serde_json::from_value(json!([
            {"tag": "section", "attrs": {"id": "s"}, "children": [{"text": "a"}]},
            {"text": "b"}
        ]))
        .unwrap();

        assert_eq!(nodes[0].tag(), Some("section"));
        assert_eq!(nodes[0].attr(Attr::Id), Some("s"));
        assert_eq!(nodes[0].children()[0].as_text(), Some("a"));
        assert_eq!(nodes[1].as_text(), Some("b"));
    }

    #[test]
    fn test_is_empty() {
        assert!(ContentNode::element("p", vec![]).is_empty());
        assert!(ContentNode::text("  ").is_empty());
        assert!(!ContentNode::text("x").is_empty());
    }
}
