//! Package document parsing (`container.xml` and OPF).

use std::collections::{HashMap, HashSet};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::Metadata;
use crate::error::{Error, Result};
use crate::util::strip_bom;

/// Parsed OPF package.
#[derive(Debug, Default)]
pub(crate) struct Package {
    pub metadata: Metadata,
    /// Manifest id → item.
    pub manifest: HashMap<String, ManifestItem>,
    /// Spine idrefs in reading order, without repeats.
    pub spine: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ManifestItem {
    /// Href relative to the package document, as written.
    pub href: String,
    pub media_type: String,
}

/// Find the package document path in `META-INF/container.xml`.
pub(crate) fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attr(&e, b"full-path")?.filter(|p| !p.is_empty()) {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "no rootfile found in container.xml".to_string(),
    ))
}

/// Parse the OPF package document.
pub(crate) fn parse_opf(content: &str) -> Result<Package> {
    let mut reader = Reader::from_str(content);

    let mut package = Package::default();
    let mut seen = HashSet::new();

    let mut in_metadata = false;
    let mut current: Option<Vec<u8>> = None;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"publisher" | b"language" | b"identifier"
                        if in_metadata =>
                    {
                        current = Some(local.to_vec());
                        text.clear();
                    }
                    _ => add_entry(&mut package, &mut seen, &e)?,
                }
            }
            Event::Empty(e) => add_entry(&mut package, &mut seen, &e)?,
            Event::Text(e) => {
                if current.is_some() {
                    text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if current.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    text.push_str(&resolved);
                }
            }
            Event::End(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if local == b"metadata" {
                    in_metadata = false;
                }
                if current.as_deref() == Some(local) {
                    set_metadata(&mut package.metadata, local, text.trim());
                    current = None;
                    text.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(package)
}

/// Record a manifest item or spine itemref. Repeated itemrefs are skipped.
fn add_entry(package: &mut Package, seen: &mut HashSet<String>, e: &BytesStart<'_>) -> Result<()> {
    let name = e.name();
    match local_name(name.as_ref()) {
        b"item" => {
            if let Some(id) = attr(e, b"id")?.filter(|id| !id.is_empty()) {
                let item = ManifestItem {
                    href: attr(e, b"href")?.unwrap_or_default(),
                    media_type: attr(e, b"media-type")?.unwrap_or_default(),
                };
                package.manifest.insert(id, item);
            }
        }
        b"itemref" => {
            if let Some(idref) = attr(e, b"idref")?
                && seen.insert(idref.clone())
            {
                package.spine.push(idref);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Record a metadata field. The first non-empty value of each field wins.
fn set_metadata(metadata: &mut Metadata, field: &[u8], value: &str) {
    if value.is_empty() {
        return;
    }
    let slot = match field {
        b"title" => &mut metadata.title,
        b"creator" => &mut metadata.author,
        b"publisher" => &mut metadata.publisher,
        b"language" => &mut metadata.language,
        b"identifier" => &mut metadata.identifier,
        _ => return,
    };
    slot.get_or_insert_with(|| value.to_string());
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return Ok(Some(String::from_utf8(attr.value.to_vec())?));
        }
    }
    Ok(None)
}

/// Extract the local name from a namespaced XML name (`dc:title` → `title`).
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

/// Resolve predefined and numeric XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    let c = match entity {
        "apos" => '\'',
        "quot" => '"',
        "lt" => '<',
        "gt" => '>',
        "amp" => '&',
        _ => {
            let code = if let Some(hex) = entity.strip_prefix("#x") {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                entity.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)?
        }
    };
    Some(c.to_string())
}
