//! Arena-allocated markup tree.
//!
//! Nodes live in a single vector and link to each other by index, so the
//! tree can be walked in any direction (children, siblings, ancestors)
//! without reference counting. Once parsing finishes the tree is only read.

use html5ever::{LocalName, QualName, ns};

/// Index of a node in a [`MarkupTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeId(pub u32);

/// Payload of a tree node.
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root.
    Document,
    /// Element with name and attributes.
    Element {
        name: QualName,
        attrs: Vec<Attribute>,
    },
    /// Character data.
    Text(String),
    /// Comment or processing instruction. Kept so the parser can address it.
    Comment(String),
    /// Document type declaration.
    Doctype(String),
}

/// Element attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: QualName,
    pub value: String,
}

/// A node in the arena with its structural links.
#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

/// Markup document stored as an arena of [`Node`]s.
#[derive(Debug)]
pub struct MarkupTree {
    nodes: Vec<Node>,
}

impl Default for MarkupTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkupTree {
    /// Create a tree holding only the document root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::Document)],
        }
    }

    /// The document root.
    pub fn document(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    pub fn create_element(&mut self, name: QualName, attrs: Vec<Attribute>) -> NodeId {
        self.alloc(NodeData::Element { name, attrs })
    }

    pub fn create_text(&mut self, text: String) -> NodeId {
        self.alloc(NodeData::Text(text))
    }

    pub fn create_comment(&mut self, text: String) -> NodeId {
        self.alloc(NodeData::Comment(text))
    }

    pub fn create_doctype(&mut self, name: String) -> NodeId {
        self.alloc(NodeData::Doctype(name))
    }

    /// Append `child` as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last = self.get(parent).and_then(|n| n.last_child);

        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
            node.prev_sibling = last;
            node.next_sibling = None;
        }
        if let Some(last) = last
            && let Some(node) = self.get_mut(last)
        {
            node.next_sibling = Some(child);
        }
        if let Some(node) = self.get_mut(parent) {
            if node.first_child.is_none() {
                node.first_child = Some(child);
            }
            node.last_child = Some(child);
        }
    }

    /// Append text under `parent`, merging into a trailing text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last = self.get(parent).and_then(|n| n.last_child);
        if let Some(last) = last
            && let Some(Node {
                data: NodeData::Text(existing),
                ..
            }) = self.get_mut(last)
        {
            existing.push_str(text);
            return;
        }

        let node = self.create_text(text.to_string());
        self.append(parent, node);
    }

    /// Insert `new_node` immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new_node: NodeId) {
        let (parent, prev) = match self.get(sibling) {
            Some(n) => (n.parent, n.prev_sibling),
            None => return,
        };

        if let Some(node) = self.get_mut(new_node) {
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = Some(sibling);
        }
        if let Some(node) = self.get_mut(sibling) {
            node.prev_sibling = Some(new_node);
        }
        match prev {
            Some(prev) => {
                if let Some(node) = self.get_mut(prev) {
                    node.next_sibling = Some(new_node);
                }
            }
            None => {
                if let Some(parent) = parent
                    && let Some(node) = self.get_mut(parent)
                {
                    node.first_child = Some(new_node);
                }
            }
        }
    }

    /// Insert text before `sibling`, merging into a preceding text node.
    pub fn insert_text_before(&mut self, sibling: NodeId, text: &str) {
        let prev = self.get(sibling).and_then(|n| n.prev_sibling);
        if let Some(prev) = prev
            && let Some(Node {
                data: NodeData::Text(existing),
                ..
            }) = self.get_mut(prev)
        {
            existing.push_str(text);
            return;
        }

        let node = self.create_text(text.to_string());
        self.insert_before(sibling, node);
    }

    /// Unlink a node from its parent and siblings. Its subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = match self.get(id) {
            Some(n) => (n.parent, n.prev_sibling, n.next_sibling),
            None => return,
        };

        match prev {
            Some(prev) => {
                if let Some(node) = self.get_mut(prev) {
                    node.next_sibling = next;
                }
            }
            None => {
                if let Some(parent) = parent
                    && let Some(node) = self.get_mut(parent)
                {
                    node.first_child = next;
                }
            }
        }
        match next {
            Some(next) => {
                if let Some(node) = self.get_mut(next) {
                    node.prev_sibling = prev;
                }
            }
            None => {
                if let Some(parent) = parent
                    && let Some(node) = self.get_mut(parent)
                {
                    node.last_child = prev;
                }
            }
        }

        if let Some(node) = self.get_mut(id) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    /// Move every child of `from` to the end of `to`, preserving order.
    pub fn reparent_children(&mut self, from: NodeId, to: NodeId) {
        let children: Vec<_> = self.children(from).collect();
        for child in children {
            self.detach(child);
            self.append(to, child);
        }
    }

    /// Iterate over the children of a node in document order.
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(parent).and_then(|n| n.first_child),
        }
    }

    /// Iterate over the ancestors of a node, nearest first. The node itself
    /// is not included.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(id).and_then(|n| n.parent),
        }
    }
}

/// Iterator over the children of a node.
pub struct Children<'a> {
    tree: &'a MarkupTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.get(id).and_then(|n| n.next_sibling);
        Some(id)
    }
}

/// Iterator over the ancestors of a node.
pub struct Ancestors<'a> {
    tree: &'a MarkupTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.get(id).and_then(|n| n.parent);
        Some(id)
    }
}

/// Read accessors.
impl MarkupTree {
    /// Local tag name of an element, as produced by the parser.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Element { name, .. } => Some(name.local.as_ref()),
            _ => None,
        }
    }

    /// Value of an element attribute, matched by local name.
    pub fn attr(&self, id: NodeId, attr_name: &str) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name.local.as_ref() == attr_name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    /// Content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.get(id)?.data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Concatenated text of every descendant text node.
    ///
    /// Walks with an explicit stack, so nesting depth is not bounded by the
    /// call stack.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(text) = self.text(id) {
                out.push_str(text);
                continue;
            }
            let mut children: Vec<_> = self.children(id).collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// First element with the given tag, in document order.
    pub fn find_element(&self, tag: &str) -> Option<NodeId> {
        let mut stack = vec![self.document()];
        while let Some(id) = stack.pop() {
            if self.tag_name(id) == Some(tag) {
                return Some(id);
            }
            let mut children: Vec<_> = self.children(id).collect();
            children.reverse();
            stack.extend(children);
        }
        None
    }
}

/// Builders for assembling trees by hand.
impl MarkupTree {
    /// Append an HTML element with the given attributes under `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(name, value)| Attribute {
                name: QualName::new(None, ns!(), LocalName::from(*name)),
                value: (*value).to_string(),
            })
            .collect();
        let id = self.create_element(QualName::new(None, ns!(html), LocalName::from(tag)), attrs);
        self.append(parent, id);
        id
    }

    /// Append a text node under `parent`. Adjacent text is not merged.
    pub fn text_node(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_text(text.to_string());
        self.append(parent, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_walk() {
        let mut tree = MarkupTree::new();
        let doc = tree.document();
        let div = tree.element(doc, "div", &[("id", "main")]);
        let p1 = tree.element(div, "p", &[]);
        let p2 = tree.element(div, "p", &[]);
        let text = tree.text_node(p2, "Hello");

        assert_eq!(tree.children(div).collect::<Vec<_>>(), vec![p1, p2]);
        assert_eq!(tree.tag_name(div), Some("div"));
        assert_eq!(tree.attr(div, "id"), Some("main"));
        assert_eq!(tree.attr(div, "class"), None);
        assert_eq!(tree.ancestors(text).collect::<Vec<_>>(), vec![p2, div, doc]);
        assert_eq!(tree.text_content(div), "Hello");
        assert_eq!(tree.find_element("p"), Some(p1));
    }

    #[test]
    fn test_text_content_of_deep_tree() {
        let mut tree = MarkupTree::new();
        let mut parent = tree.document();
        for _ in 0..20_000 {
            parent = tree.element(parent, "span", &[]);
        }
        tree.text_node(parent, "deep");

        assert_eq!(tree.text_content(tree.document()), "deep");
    }

    #[test]
    fn test_text_merging() {
        let mut tree = MarkupTree::new();
        let p = tree.element(tree.document(), "p", &[]);

        tree.append_text(p, "Hello, ");
        tree.append_text(p, "World!");

        let children: Vec<_> = tree.children(p).collect();
        assert_eq!(children.len(), 1);
        assert_eq!(tree.text(children[0]), Some("Hello, World!"));
    }

    #[test]
    fn test_detach_and_insert() {
        let mut tree = MarkupTree::new();
        let doc = tree.document();
        let source = tree.element(doc, "div", &[]);
        let target = tree.element(doc, "span", &[]);
        let a = tree.element(source, "a", &[]);
        let b = tree.element(source, "b", &[]);
        let c = tree.element(source, "i", &[]);

        tree.detach(b);
        assert_eq!(tree.children(source).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(tree.ancestors(b).count(), 0);

        tree.insert_before(a, b);
        assert_eq!(tree.children(source).collect::<Vec<_>>(), vec![b, a, c]);

        tree.reparent_children(source, target);
        assert_eq!(tree.children(source).count(), 0);
        assert_eq!(tree.children(target).collect::<Vec<_>>(), vec![b, a, c]);
        assert_eq!(tree.ancestors(a).next(), Some(target));
    }
}
