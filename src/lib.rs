//! # epubtree
//!
//! Turns the chapters of an EPUB into normalized, self-contained content
//! trees.
//!
//! ## Features
//!
//! - Reads EPUB 2/3 containers (`container.xml`, OPF metadata, manifest, spine)
//! - Normalizes chapter markup into [`ContentNode`] trees: non-content tags
//!   dropped, grouping tags spliced away, prose blocks and lists flattened to
//!   Markdown
//! - Rewrites in-book links to `#<chapter id>,<fragment>` addresses
//! - Inlines images and other embedded resources as `data:` URIs
//!
//! ## Quick Start
//!
//! ```no_run
//! use epubtree::Epub;
//!
//! let book = Epub::open("input.epub").unwrap();
//! for (id, content) in book.contents() {
//!     println!("{id}: {}", serde_json::to_string(content).unwrap());
//! }
//! ```
//!
//! ## Normalizing markup directly
//!
//! ```
//! use epubtree::{ContentNode, NormalizeOptions, PassThrough, normalize_html};
//!
//! let nodes = normalize_html(
//!     "<div><p>Hello <em>world</em></p><script>x()</script></div>",
//!     &PassThrough,
//!     &NormalizeOptions::default(),
//! );
//! assert_eq!(
//!     nodes,
//!     vec![ContentNode::element("p", vec![ContentNode::text("Hello _world_")])]
//! );
//! ```

pub mod address;
pub mod chapter;
pub mod dom;
pub mod epub;
pub mod error;
pub mod markdown;
pub mod normalize;
pub(crate) mod util;

pub use address::{AddressResolver, ChapterResolver, ContainerLookup, PassThrough};
pub use chapter::Chapter;
pub use epub::{Epub, EpubOptions, Metadata};
pub use error::{Error, Result};
pub use markdown::MarkdownOptions;
pub use normalize::{Attr, ContentNode, NormalizeOptions, normalize_html};
