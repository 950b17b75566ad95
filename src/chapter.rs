//! Chapter units.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::address::{ChapterResolver, ContainerLookup};
use crate::normalize::{ContentNode, NormalizeOptions, normalize_html};

/// One spine entry: its markup plus what is needed to resolve the
/// references inside it.
///
/// The content tree is computed on first access and cached for the
/// lifetime of the chapter.
pub struct Chapter {
    id: String,
    href: String,
    markup: String,
    lookup: Arc<dyn ContainerLookup>,
    options: Arc<NormalizeOptions>,
    content: OnceLock<Vec<ContentNode>>,
}

impl Chapter {
    /// Create a chapter. `href` is the package-relative path of the
    /// chapter document; relative references are resolved against it.
    pub fn new(
        id: impl Into<String>,
        href: impl Into<String>,
        markup: impl Into<String>,
        lookup: Arc<dyn ContainerLookup>,
        options: Arc<NormalizeOptions>,
    ) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            markup: markup.into(),
            lookup,
            options,
            content: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    /// Raw chapter markup.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// The normalized content tree, computed once.
    pub fn content(&self) -> &[ContentNode] {
        self.content.get_or_init(|| self.normalize())
    }

    /// Whether [`content`](Self::content) has already been computed.
    pub fn is_expanded(&self) -> bool {
        self.content.get().is_some()
    }

    /// Parse and normalize the markup again, bypassing the cache.
    pub fn normalize(&self) -> Vec<ContentNode> {
        let resolver = ChapterResolver::new(&self.id, &self.href, self.lookup.as_ref());
        let nodes = normalize_html(&self.markup, &resolver, &self.options);
        debug!(chapter = %self.id, nodes = nodes.len(), "normalized chapter");
        nodes
    }
}

impl fmt::Debug for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chapter")
            .field("id", &self.id)
            .field("href", &self.href)
            .field("markup_len", &self.markup.len())
            .field("expanded", &self.is_expanded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::normalize::Attr;

    #[derive(Default)]
    struct Lookup {
        ids: HashMap<String, String>,
        bytes: HashMap<String, Vec<u8>>,
    }

    impl ContainerLookup for Lookup {
        fn id_for_path(&self, path: &str) -> Option<&str> {
            self.ids.get(path).map(String::as_str)
        }

        fn bytes_for_path(&self, path: &str) -> Option<&[u8]> {
            self.bytes.get(path).map(Vec::as_slice)
        }
    }

    fn chapter(markup: &str) -> Chapter {
        let mut lookup = Lookup::default();
        lookup.ids.insert("text/ch2.xhtml".into(), "c2".into());
        lookup.bytes.insert("images/dot.gif".into(), b"GIF89a".to_vec());
        Chapter::new(
            "c1",
            "text/ch1.xhtml",
            markup,
            Arc::new(lookup),
            Arc::new(NormalizeOptions::default()),
        )
    }

    #[test]
    fn test_content_is_cached() {
        let ch = chapter("<section><p>One</p></section>");
        assert!(!ch.is_expanded());

        let first = ch.content().as_ptr();
        assert!(ch.is_expanded());
        assert_eq!(ch.content().as_ptr(), first);
        assert_eq!(ch.content(), ch.normalize().as_slice());
    }

    #[test]
    fn test_references_resolve_relative_to_chapter() {
        let ch = chapter(
            r##"<section><a href="ch2.xhtml#n1">next</a><a href="#top">up</a>
            <figure id="f"><p><img src="../images/dot.gif" alt="dot"></p></figure></section>"##,
        );
        let section = &ch.content()[0];
        let children = section.children();

        assert_eq!(children[0].attr(Attr::Href), Some("#c2,n1"));
        assert_eq!(children[1].attr(Attr::Href), Some("#c1,top"));

        let figure = &children[2];
        assert_eq!(figure.attr(Attr::Id), Some("f"));
        let md = figure.children()[0].children()[0].as_text().unwrap();
        assert!(md.starts_with("![dot](data:image/gif;base64,"), "got {md}");
    }

    #[test]
    fn test_chapters_normalize_across_threads() {
        let chapters: Vec<Chapter> = (0..4)
            .map(|i| chapter(&format!("<article><p>Chapter {i}</p></article>")))
            .collect();

        std::thread::scope(|s| {
            for ch in &chapters {
                s.spawn(move || {
                    ch.content();
                });
            }
        });

        for (i, ch) in chapters.iter().enumerate() {
            assert!(ch.is_expanded());
            let p = &ch.content()[0].children()[0];
            assert_eq!(p.children()[0].as_text(), Some(format!("Chapter {i}").as_str()));
        }
    }
}
