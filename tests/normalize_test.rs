//! Normalization through the public API.

use std::collections::HashMap;

use epubtree::dom::{MarkupTree, parse_html};
use epubtree::normalize::Normalizer;
use epubtree::{
    Attr, ChapterResolver, ContainerLookup, ContentNode, NormalizeOptions, PassThrough,
    normalize_html,
};
use proptest::prelude::*;
use serde_json::json;

struct Book {
    ids: HashMap<&'static str, &'static str>,
    bytes: HashMap<&'static str, Vec<u8>>,
}

impl Book {
    fn new() -> Self {
        Self {
            ids: HashMap::from([
                ("chapter1.xhtml", "c1"),
                ("chapter2.xhtml", "c2"),
            ]),
            bytes: HashMap::from([("images/cover.png", vec![0xFF, 0xD8])]),
        }
    }
}

impl ContainerLookup for Book {
    fn id_for_path(&self, path: &str) -> Option<&str> {
        self.ids.get(path).copied()
    }

    fn bytes_for_path(&self, path: &str) -> Option<&[u8]> {
        self.bytes.get(path).map(Vec::as_slice)
    }
}

fn normalize_in_chapter(html: &str) -> Vec<ContentNode> {
    let book = Book::new();
    let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &book);
    normalize_html(html, &resolver, &NormalizeOptions::default())
}

#[test]
fn test_json_shape() {
    let nodes = normalize_in_chapter(
        r#"<section id="intro"><a href="chapter2.xhtml#note1">1</a><p>Hi</p></section>"#,
    );

    assert_eq!(
        serde_json::to_value(&nodes).unwrap(),
        json!([{
            "tag": "section",
            "attrs": {"id": "intro"},
            "children": [
                {"tag": "a", "attrs": {"href": "#c2,note1"}, "children": [{"text": "1"}]},
                {"tag": "p", "children": [{"text": "Hi"}]}
            ]
        }])
    );
}

#[test]
fn test_json_round_trip() {
    let nodes = normalize_in_chapter(
        r#"<article><h2>T</h2><ol start="2"><li>x</li></ol><aside>note</aside></article>"#,
    );
    let json = serde_json::to_string(&nodes).unwrap();
    let back: Vec<ContentNode> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, nodes);
}

#[test]
fn test_src_attribute_inlined() {
    let nodes = normalize_in_chapter(
        r#"<section><video src="images/cover.png"><track src="subs.vtt">captions</video></section>"#,
    );
    let video = &nodes[0].children()[0];
    assert_eq!(video.tag(), Some("video"));
    assert_eq!(video.attr(Attr::Src), Some("data:image/png;base64,/9g="));
}

#[test]
fn test_unwrap_and_omission() {
    // Unwrapping a grouping tag contributes nothing of its own.
    assert_eq!(
        normalize_html("<div><p>A</p><span>B</span></div>", &PassThrough, &NormalizeOptions::default()),
        normalize_html("<p>A</p><span>B</span>", &PassThrough, &NormalizeOptions::default()),
    );

    // Omitted subtrees vanish whatever they contain.
    assert!(
        normalize_html(
            "<script><p>not content</p></script><style>.x{}</style>",
            &PassThrough,
            &NormalizeOptions::default()
        )
        .is_empty()
    );
}

#[test]
fn test_normalizer_on_subtree() {
    let tree = parse_html("<main><nav><a href='#top'>Top</a></nav><p>Body</p></main>");
    let main = tree.find_element("main").unwrap();
    let book = Book::new();
    let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &book);
    let options = NormalizeOptions::default();

    let nodes = Normalizer::new(&tree, &resolver, &options).normalize(tree.children(main));
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].tag(), Some("nav"));
    assert_eq!(nodes[0].children()[0].attr(Attr::Href), Some("#c1,top"));
    assert_eq!(nodes[1], ContentNode::element("p", vec![ContentNode::text("Body")]));
}

#[test]
fn test_hand_built_orphans() {
    let mut tree = MarkupTree::new();
    let doc = tree.document();
    let html = tree.element(doc, "html", &[]);
    let body = tree.element(html, "body", &[]);
    tree.text_node(body, "  first  ");
    let span = tree.element(body, "span", &[]);
    tree.text_node(span, "second");

    let options = NormalizeOptions::default();
    let nodes = Normalizer::new(&tree, &PassThrough, &options).normalize_document();
    assert_eq!(
        nodes,
        vec![
            ContentNode::element("p", vec![ContentNode::text("first")]),
            ContentNode::element("p", vec![ContentNode::text("second")]),
        ]
    );
}

#[test]
fn test_deep_markup_keeps_innermost_content() {
    let depth = 2_000;
    let html = format!(
        r#"{}<p>See <a href="chapter2.xhtml#n1">note</a>{}</p>{}"#,
        "<aside>".repeat(depth),
        "<span>".repeat(depth),
        "</aside>".repeat(depth),
    );
    let mut nodes = normalize_in_chapter(&html);
    assert_eq!(nodes.len(), 1);

    // Unnest one level at a time so the deep result is not dropped
    // recursively.
    let mut node = nodes.pop().unwrap();
    let mut asides = 0;
    while node.tag() == Some("aside") {
        asides += 1;
        let ContentNode::Element { mut children, .. } = node else {
            unreachable!()
        };
        assert_eq!(children.len(), 1);
        node = children.pop().unwrap();
    }

    assert_eq!(asides, depth);
    assert_eq!(node.tag(), Some("p"));
    assert_eq!(node.children(), &[ContentNode::text("See [note](#c2,n1)")]);
}

fn count_nodes(nodes: &[ContentNode]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(n.children())).sum()
}

proptest! {
    #[test]
    fn prop_fragment_links_stay_in_chapter(fragment in "[A-Za-z][A-Za-z0-9_-]{0,12}") {
        let html = format!(r##"<section><a href="#{fragment}">x</a></section>"##);
        let nodes = normalize_in_chapter(&html);
        let expected = format!("#c1,{fragment}");
        prop_assert_eq!(nodes[0].children()[0].attr(Attr::Href), Some(expected.as_str()));
    }

    #[test]
    fn prop_omitted_content_contributes_nothing(
        body in "[a-z <>/]{0,40}",
        tag in prop::sample::select(vec!["script", "style", "textarea"]),
    ) {
        let html = format!("<section><p>kept</p><{tag}>{body}</{tag}></section>");
        let nodes = normalize_in_chapter(&html);
        prop_assert_eq!(count_nodes(&nodes), 3);
    }
}
