//! Address resolution for in-book references.
//!
//! Chapters address each other through file paths (`chapter2.xhtml#note1`)
//! and embed resources through paths relative to the chapter. Neither
//! survives once a chapter is lifted out of its container, so every
//! reference is rewritten into a self-contained form:
//!
//! - links become `#<chapter id>` or `#<chapter id>,<fragment>`
//! - resources become `data:` URIs carrying the bytes
//! - external references pass through unchanged
//!
//! The container itself is only reached through [`ContainerLookup`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

use crate::util::{
    detect_media_format, file_name, normalize_path, parent_dir, percent_decode, split_fragment,
    strip_query,
};

/// Read-only lookups supplied by the container that owns the chapters.
///
/// Paths are relative to the package root, percent-decoded, without
/// fragment or query. Implementations must be pure lookups so chapters can
/// be resolved from several threads at once.
pub trait ContainerLookup: Send + Sync {
    /// Logical chapter id of the document at exactly `path`.
    fn id_for_path(&self, path: &str) -> Option<&str>;

    /// Chapter id of a document whose file name alone is `name`, for links
    /// whose directory part does not match the package layout.
    fn id_for_file_name(&self, _name: &str) -> Option<&str> {
        None
    }

    /// Raw bytes of the resource at `path`.
    fn bytes_for_path(&self, path: &str) -> Option<&[u8]>;

    /// Media type the container declares for the resource at `path`.
    fn media_type_for_path(&self, _path: &str) -> Option<&str> {
        None
    }
}

/// Rewrites link and resource attributes during normalization.
pub trait AddressResolver {
    /// Resolve an `href` value.
    fn resolve_href(&self, href: &str) -> String;

    /// Resolve a `src` value.
    fn resolve_src(&self, src: &str) -> String;
}

/// Resolver that leaves every reference untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl AddressResolver for PassThrough {
    fn resolve_href(&self, href: &str) -> String {
        href.to_string()
    }

    fn resolve_src(&self, src: &str) -> String {
        src.to_string()
    }
}

/// Attribute a reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Hyperlink target (`href`).
    Href,
    /// Embedded resource (`src`).
    Src,
}

/// Classified reference value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference<'a> {
    /// Carries a URI scheme (`http:`, `https:`, `mailto:`, `data:`, ...).
    External(&'a str),
    /// Fragment-only reference into the current document (`#note1`).
    SameDocument(&'a str),
    /// Path inside the container, with an optional fragment.
    Internal {
        path: &'a str,
        fragment: Option<&'a str>,
    },
}

impl<'a> Reference<'a> {
    /// Classify a raw attribute value.
    pub fn parse(value: &'a str) -> Self {
        if has_uri_scheme(value) {
            return Reference::External(value);
        }
        if let Some(fragment) = value.strip_prefix('#') {
            return Reference::SameDocument(fragment);
        }
        let (path, fragment) = split_fragment(value);
        Reference::Internal { path, fragment }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, Reference::External(_))
    }
}

/// Check for an RFC 3986 scheme prefix (`scheme:`).
///
/// Single-letter schemes are rejected so `C:\...` style paths stay
/// internal.
fn has_uri_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    scheme.len() > 1
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Build a base64 `data:` URI for a resource. A declared media type wins;
/// otherwise the type is sniffed from the path and leading bytes.
pub fn data_uri(path: &str, bytes: &[u8], media_type: Option<&str>) -> String {
    let mime = media_type
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| detect_media_format(path, bytes).mime_type());
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Resolves references found in one chapter against its container.
pub struct ChapterResolver<'a> {
    chapter_id: &'a str,
    base_dir: &'a str,
    lookup: &'a dyn ContainerLookup,
}

impl<'a> ChapterResolver<'a> {
    /// Create a resolver for the chapter `chapter_id` stored at
    /// `chapter_path` (package-relative).
    pub fn new(chapter_id: &'a str, chapter_path: &'a str, lookup: &'a dyn ContainerLookup) -> Self {
        Self {
            chapter_id,
            base_dir: parent_dir(chapter_path),
            lookup,
        }
    }

    /// Resolve a reference of the given kind.
    ///
    /// Lookup misses are not errors: an unknown link keeps an empty id slot
    /// and an unknown resource is returned as written.
    pub fn resolve(&self, value: &str, kind: ReferenceKind) -> String {
        match (Reference::parse(value), kind) {
            (Reference::External(value), _) => value.to_string(),
            (Reference::SameDocument(fragment), ReferenceKind::Href) => {
                link_address(self.chapter_id, Some(fragment))
            }
            (Reference::SameDocument(_), ReferenceKind::Src) => value.to_string(),
            (Reference::Internal { path, fragment }, ReferenceKind::Href) => {
                let id = self.chapter_id_for(path);
                if id.is_none() {
                    debug!(href = value, chapter = self.chapter_id, "no chapter for link target");
                }
                link_address(id.unwrap_or_default(), fragment)
            }
            (Reference::Internal { path, .. }, ReferenceKind::Src) => {
                self.inline_resource(path).unwrap_or_else(|| {
                    debug!(src = value, chapter = self.chapter_id, "resource not found");
                    value.to_string()
                })
            }
        }
    }

    /// Candidate package paths for a reference: relative to the chapter
    /// first, then relative to the package root.
    fn candidates(&self, path: &str) -> Vec<String> {
        let path = percent_decode(strip_query(path));
        let relative = normalize_path(self.base_dir, &path);
        let rooted = normalize_path("", &path);
        if relative == rooted {
            vec![relative]
        } else {
            vec![relative, rooted]
        }
    }

    /// Every candidate path is tried exactly before falling back to a
    /// file-name match.
    fn chapter_id_for(&self, path: &str) -> Option<&'a str> {
        let lookup = self.lookup;
        let candidates = self.candidates(path);
        candidates
            .iter()
            .find_map(|candidate| lookup.id_for_path(candidate))
            .or_else(|| {
                let name = file_name(candidates.first()?);
                lookup.id_for_file_name(name)
            })
    }

    fn inline_resource(&self, path: &str) -> Option<String> {
        self.candidates(path).iter().find_map(|candidate| {
            let bytes = self.lookup.bytes_for_path(candidate)?;
            let media_type = self.lookup.media_type_for_path(candidate);
            Some(data_uri(candidate, bytes, media_type))
        })
    }
}

impl AddressResolver for ChapterResolver<'_> {
    fn resolve_href(&self, href: &str) -> String {
        self.resolve(href, ReferenceKind::Href)
    }

    fn resolve_src(&self, src: &str) -> String {
        self.resolve(src, ReferenceKind::Src)
    }
}

fn link_address(id: &str, fragment: Option<&str>) -> String {
    match fragment.filter(|f| !f.is_empty()) {
        Some(fragment) => format!("#{id},{fragment}"),
        None => format!("#{id}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;

    use super::*;

    #[derive(Default)]
    struct Lookup {
        ids: HashMap<String, String>,
        names: HashMap<String, String>,
        bytes: HashMap<String, Vec<u8>>,
        types: HashMap<String, String>,
    }

    impl ContainerLookup for Lookup {
        fn id_for_path(&self, path: &str) -> Option<&str> {
            self.ids.get(path).map(String::as_str)
        }

        fn id_for_file_name(&self, name: &str) -> Option<&str> {
            self.names.get(name).map(String::as_str)
        }

        fn bytes_for_path(&self, path: &str) -> Option<&[u8]> {
            self.bytes.get(path).map(Vec::as_slice)
        }

        fn media_type_for_path(&self, path: &str) -> Option<&str> {
            self.types.get(path).map(String::as_str)
        }
    }

    fn book() -> Lookup {
        let mut lookup = Lookup::default();
        lookup.ids.insert("chapter2.xhtml".into(), "c2".into());
        lookup.ids.insert("text/notes.xhtml".into(), "notes".into());
        lookup.ids.insert("My Chapter.xhtml".into(), "spaced".into());
        lookup.bytes.insert("images/cover.png".into(), vec![0xFF, 0xD8]);
        lookup
    }

    fn decode_payload(uri: &str) -> Vec<u8> {
        let (_, payload) = uri.split_once(";base64,").expect("base64 data uri");
        STANDARD.decode(payload).expect("valid base64")
    }

    #[test]
    fn test_classify() {
        assert!(Reference::parse("http://example.com/x").is_external());
        assert!(Reference::parse("https://example.com").is_external());
        assert!(Reference::parse("mailto:someone@example.com").is_external());
        assert!(Reference::parse("data:image/png;base64,AAAA").is_external());
        assert_eq!(Reference::parse("#n1"), Reference::SameDocument("n1"));
        assert_eq!(
            Reference::parse("c:/books/a.xhtml"),
            Reference::Internal {
                path: "c:/books/a.xhtml",
                fragment: None
            }
        );
        assert_eq!(
            Reference::parse("chapter2.xhtml#note1"),
            Reference::Internal {
                path: "chapter2.xhtml",
                fragment: Some("note1")
            }
        );
    }

    #[test]
    fn test_link_resolution() {
        let lookup = book();
        let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &lookup);

        assert_eq!(resolver.resolve_href("chapter2.xhtml#note1"), "#c2,note1");
        assert_eq!(resolver.resolve_href("chapter2.xhtml"), "#c2");
        assert_eq!(resolver.resolve_href("chapter2.xhtml#"), "#c2");
        assert_eq!(
            resolver.resolve_href("http://example.com/x"),
            "http://example.com/x"
        );
        assert_eq!(resolver.resolve_href("My%20Chapter.xhtml"), "#spaced");
    }

    #[test]
    fn test_link_relative_to_chapter() {
        let lookup = book();
        let resolver = ChapterResolver::new("c7", "text/ch7.xhtml", &lookup);

        assert_eq!(resolver.resolve_href("notes.xhtml#n3"), "#notes,n3");
        assert_eq!(resolver.resolve_href("../chapter2.xhtml"), "#c2");
        // Falls back to the package root when the chapter-relative path misses.
        assert_eq!(resolver.resolve_href("chapter2.xhtml"), "#c2");
    }

    #[test]
    fn test_fragment_only_targets_current_chapter() {
        let lookup = book();
        let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &lookup);

        assert_eq!(resolver.resolve_href("#fn3"), "#c1,fn3");
        assert_eq!(resolver.resolve_href("#"), "#c1");
    }

    #[test]
    fn test_unknown_link_keeps_empty_slot() {
        let lookup = book();
        let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &lookup);

        assert_eq!(resolver.resolve_href("missing.xhtml#x"), "#,x");
        assert_eq!(resolver.resolve_href("missing.xhtml"), "#");
    }

    #[test]
    fn test_resource_inlining() {
        let lookup = book();
        let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &lookup);

        let uri = resolver.resolve_src("images/cover.png");
        assert!(uri.starts_with("data:image/png;base64,"), "got {uri}");
        assert_eq!(decode_payload(&uri), vec![0xFF, 0xD8]);

        let nested = ChapterResolver::new("c7", "text/ch7.xhtml", &lookup);
        assert_eq!(nested.resolve_src("../images/cover.png"), uri);
        assert_eq!(nested.resolve_src("/images/cover.png"), uri);
    }

    #[test]
    fn test_missing_resource_passes_through() {
        let lookup = book();
        let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &lookup);

        assert_eq!(resolver.resolve_src("images/none.png"), "images/none.png");
        assert_eq!(
            resolver.resolve_src("https://example.com/a.png"),
            "https://example.com/a.png"
        );
        assert_eq!(resolver.resolve_src("#frag"), "#frag");
    }

    #[test]
    fn test_exact_path_beats_file_name() {
        let mut lookup = Lookup::default();
        lookup.ids.insert("ch.xhtml".into(), "root".into());
        lookup.names.insert("ch.xhtml".into(), "other".into());
        lookup.names.insert("away.xhtml".into(), "away".into());
        let resolver = ChapterResolver::new("x", "text/x.xhtml", &lookup);

        // "text/ch.xhtml" misses, the root candidate matches exactly.
        assert_eq!(resolver.resolve_href("ch.xhtml#a"), "#root,a");
        assert_eq!(resolver.resolve_href("elsewhere/away.xhtml"), "#away");
    }

    #[test]
    fn test_declared_media_type_wins() {
        let mut lookup = Lookup::default();
        lookup.bytes.insert("images/figure.bin".into(), vec![0x89, b'P', b'N', b'G']);
        lookup.types.insert("images/figure.bin".into(), "image/webp".into());
        lookup.bytes.insert("images/plain.bin".into(), vec![0x89, b'P', b'N', b'G']);
        let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &lookup);

        assert!(resolver.resolve_src("images/figure.bin").starts_with("data:image/webp;base64,"));
        assert!(resolver.resolve_src("images/plain.bin").starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_data_uri_content_type() {
        assert!(data_uri("font.otf", b"OTTO", None).starts_with("data:font/otf;base64,"));
        assert!(data_uri("blob", &[0xFF, 0xD8, 0xFF], None).starts_with("data:image/jpeg;base64,"));
        assert!(
            data_uri("notes.txt", b"hi", None).starts_with("data:application/octet-stream;base64,")
        );
        assert!(data_uri("notes.txt", b"hi", Some("text/plain")).starts_with("data:text/plain;base64,"));
        assert!(data_uri("a.png", b"x", Some(" ")).starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_pass_through() {
        assert_eq!(PassThrough.resolve_href("a.xhtml#b"), "a.xhtml#b");
        assert_eq!(PassThrough.resolve_src("a.png"), "a.png");
    }

    proptest! {
        #[test]
        fn prop_inlined_bytes_round_trip(
            bytes in prop::collection::vec(any::<u8>(), 0..256),
            name in "[a-z]{1,12}",
        ) {
            let path = format!("images/{name}.png");
            let mut lookup = Lookup::default();
            lookup.bytes.insert(path.clone(), bytes.clone());
            let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &lookup);

            let uri = resolver.resolve_src(&path);
            prop_assert_eq!(decode_payload(&uri), bytes);
        }

        #[test]
        fn prop_external_references_pass_through(
            scheme in prop_oneof![Just("http"), Just("https"), Just("mailto"), Just("tel")],
            rest in "[A-Za-z0-9/_.#-]{0,24}",
        ) {
            let value = format!("{scheme}:{rest}");
            let lookup = book();
            let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &lookup);
            prop_assert_eq!(resolver.resolve_href(&value), value.clone());
            prop_assert_eq!(resolver.resolve_src(&value), value);
        }

        #[test]
        fn prop_link_carries_fragment(fragment in "[A-Za-z0-9_-]{1,16}") {
            let lookup = book();
            let resolver = ChapterResolver::new("c1", "chapter1.xhtml", &lookup);
            let href = format!("chapter2.xhtml#{fragment}");
            prop_assert_eq!(resolver.resolve_href(&href), format!("#c2,{fragment}"));
        }
    }
}
