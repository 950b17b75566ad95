//! EPUB container access.
//!
//! Loads an EPUB archive, reads its package document and exposes the spine
//! as [`Chapter`]s. The loaded archive doubles as the [`ContainerLookup`]
//! every chapter resolves its links and resources against.
//!
//! ```no_run
//! use epubtree::Epub;
//!
//! let book = Epub::open("book.epub")?;
//! for chapter in book.chapters() {
//!     println!("{}: {} nodes", chapter.id(), chapter.content().len());
//! }
//! # Ok::<(), epubtree::Error>(())
//! ```

mod archive;
mod package;

use package::{ManifestItem, Package};

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::address::ContainerLookup;
use crate::chapter::Chapter;
use crate::error::{Error, Result};
use crate::markdown::MarkdownOptions;
use crate::normalize::{ContentNode, NormalizeOptions};
use crate::util::{decode_markup, file_name, normalize_path, parent_dir, percent_decode};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Book metadata from the package document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    /// First `dc:creator`.
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub language: Option<String>,
    /// First `dc:identifier`.
    pub identifier: Option<String>,
}

/// Options for opening a book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpubOptions {
    /// Normalize every chapter while opening instead of on first access.
    pub expand: bool,
    /// Markdown options used when flattening chapter content.
    pub markdown: MarkdownOptions,
}

/// Archive contents plus the manifest indexes: path → id, file name → id
/// and path → declared media type.
struct Container {
    root: String,
    files: HashMap<String, Vec<u8>>,
    ids_by_path: HashMap<String, String>,
    ids_by_name: HashMap<String, String>,
    media_types: HashMap<String, String>,
}

impl Container {
    /// Index every manifest item. Spine documents are indexed first so they
    /// win file-name collisions; the rest follow in id order.
    fn new(root: String, files: HashMap<String, Vec<u8>>, package: &Package) -> Self {
        let mut items: Vec<_> = package.manifest.iter().collect();
        items.sort_by_key(|&(id, _)| (!package.spine.contains(id), id));

        let mut container = Self {
            root,
            files,
            ids_by_path: HashMap::new(),
            ids_by_name: HashMap::new(),
            media_types: HashMap::new(),
        };
        for (id, item) in items {
            let href = manifest_path(item);
            if !item.media_type.is_empty() {
                container
                    .media_types
                    .entry(href.clone())
                    .or_insert_with(|| item.media_type.clone());
            }
            container
                .ids_by_name
                .entry(file_name(&href).to_string())
                .or_insert_with(|| id.clone());
            container.ids_by_path.entry(href).or_insert_with(|| id.clone());
        }
        container
    }
}

impl ContainerLookup for Container {
    fn id_for_path(&self, path: &str) -> Option<&str> {
        self.ids_by_path.get(path).map(String::as_str)
    }

    fn id_for_file_name(&self, name: &str) -> Option<&str> {
        self.ids_by_name.get(name).map(String::as_str)
    }

    fn bytes_for_path(&self, path: &str) -> Option<&[u8]> {
        self.files
            .get(&format!("{}{path}", self.root))
            .or_else(|| self.files.get(path))
            .map(Vec::as_slice)
    }

    fn media_type_for_path(&self, path: &str) -> Option<&str> {
        self.media_types.get(path).map(String::as_str)
    }
}

/// Package-relative, percent-decoded path of a manifest item.
fn manifest_path(item: &ManifestItem) -> String {
    normalize_path("", &percent_decode(&item.href))
}

/// An opened EPUB book.
pub struct Epub {
    metadata: Metadata,
    package_root: String,
    chapters: Vec<Chapter>,
}

impl Epub {
    /// Open a book from a file path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, EpubOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: EpubOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader_with_options(BufReader::new(file), options)
    }

    /// Open a book held in memory.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes_with_options(bytes, EpubOptions::default())
    }

    pub fn from_bytes_with_options(bytes: &[u8], options: EpubOptions) -> Result<Self> {
        Self::from_reader_with_options(Cursor::new(bytes), options)
    }

    /// Open a book from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, EpubOptions::default())
    }

    pub fn from_reader_with_options<R: Read + Seek>(
        reader: R,
        options: EpubOptions,
    ) -> Result<Self> {
        let files = archive::read_entries(reader)?;

        let container_xml = files
            .get(CONTAINER_PATH)
            .ok_or_else(|| Error::InvalidEpub(format!("missing {CONTAINER_PATH}")))?;
        let opf_path = package::parse_container_xml(container_xml)?;
        let opf = files
            .get(&opf_path)
            .ok_or_else(|| Error::MissingResource(opf_path.clone()))?;
        let package_root = parent_dir(&opf_path).to_string();
        let package = package::parse_opf(&decode_markup(opf))?;

        let spine = package
            .spine
            .iter()
            .map(|idref| -> Result<(String, String)> {
                let item = package.manifest.get(idref).ok_or_else(|| {
                    Error::MissingElement(format!("manifest item for spine idref '{idref}'"))
                })?;
                Ok((idref.clone(), manifest_path(item)))
            })
            .collect::<Result<Vec<_>>>()?;

        let container = Arc::new(Container::new(package_root.clone(), files, &package));
        let normalize_options = Arc::new(NormalizeOptions {
            markdown: options.markdown,
        });

        let mut chapters = Vec::with_capacity(spine.len());
        for (id, href) in spine {
            let bytes = container
                .bytes_for_path(&href)
                .ok_or_else(|| Error::MissingResource(format!("{package_root}{href}")))?;
            let markup = decode_markup(bytes);
            let lookup: Arc<dyn ContainerLookup> = container.clone();
            chapters.push(Chapter::new(
                id,
                href,
                markup,
                lookup,
                normalize_options.clone(),
            ));
        }

        info!(
            title = package.metadata.title.as_deref().unwrap_or_default(),
            chapters = chapters.len(),
            root = %package_root,
            "opened epub"
        );

        if options.expand {
            for chapter in &chapters {
                chapter.content();
            }
        }

        Ok(Self {
            metadata: package.metadata,
            package_root,
            chapters,
        })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Chapters in spine order.
    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn chapter(&self, id: &str) -> Option<&Chapter> {
        self.chapters.iter().find(|c| c.id() == id)
    }

    /// Every chapter's content tree, in spine order.
    pub fn contents(&self) -> Vec<(&str, &[ContentNode])> {
        self.chapters
            .iter()
            .map(|c| (c.id(), c.content()))
            .collect()
    }

    /// Directory of the package document inside the archive, with a
    /// trailing `/` (empty when the package sits at the archive root).
    pub fn package_root(&self) -> &str {
        &self.package_root
    }
}
