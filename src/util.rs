//! Text decoding, media sniffing and container path helpers.

use std::borrow::Cow;

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding (from `<?xml encoding="..."?>`)
/// 3. Falls back to Windows-1252 (common in old ebooks)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Decode a markup document, honoring its XML declaration when UTF-8 fails.
pub fn decode_markup(bytes: &[u8]) -> String {
    decode_text(bytes, extract_xml_encoding(bytes)).into_owned()
}

/// Extract encoding from XML declaration.
///
/// Parses `<?xml ... encoding="..." ?>` within the first 100 bytes.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let check_len = bytes.len().min(100);
    let prefix = &bytes[..check_len];

    let xml_start = prefix.windows(5).position(|w| w == b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let (&quote, rest) = after_enc.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = rest.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&rest[..value_end]).ok()
}

/// Strip UTF-8 BOM (byte order mark) if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

// ============================================================================
// Resource Format Detection
// ============================================================================

/// Media formats an inlined resource can be labelled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Gif,
    Svg,
    WebP,
    Ttf,
    Otf,
    /// Unknown/binary format
    Binary,
}

impl MediaFormat {
    /// Get the MIME type string for this format.
    pub fn mime_type(self) -> &'static str {
        match self {
            MediaFormat::Jpeg => "image/jpeg",
            MediaFormat::Png => "image/png",
            MediaFormat::Gif => "image/gif",
            MediaFormat::Svg => "image/svg+xml",
            MediaFormat::WebP => "image/webp",
            MediaFormat::Ttf => "font/ttf",
            MediaFormat::Otf => "font/otf",
            MediaFormat::Binary => "application/octet-stream",
        }
    }
}

/// Detect resource format from its path, falling back to magic bytes.
pub fn detect_media_format(path: &str, data: &[u8]) -> MediaFormat {
    let extension = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => return MediaFormat::Jpeg,
        "png" => return MediaFormat::Png,
        "gif" => return MediaFormat::Gif,
        "svg" => return MediaFormat::Svg,
        "webp" => return MediaFormat::WebP,
        "ttf" => return MediaFormat::Ttf,
        "otf" => return MediaFormat::Otf,
        _ => {}
    }

    if data.starts_with(&[0xFF, 0xD8]) {
        MediaFormat::Jpeg
    } else if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        MediaFormat::Png
    } else if data.starts_with(b"GIF") {
        MediaFormat::Gif
    } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        MediaFormat::WebP
    } else {
        MediaFormat::Binary
    }
}

// ============================================================================
// Container Paths
// ============================================================================

/// Split an href into its path and optional fragment (text after `#`).
pub fn split_fragment(href: &str) -> (&str, Option<&str>) {
    match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    }
}

/// Drop a `?query` suffix from a path.
pub fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(path, _)| path)
}

/// Directory part of a container path, including the trailing `/`.
///
/// Returns an empty string for paths at the container root.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

/// Final segment of a container path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Percent-decode a path, replacing invalid UTF-8 sequences.
pub fn percent_decode(path: &str) -> Cow<'_, str> {
    percent_encoding::percent_decode_str(path).decode_utf8_lossy()
}

/// Resolve `href` against `base_dir`, collapsing `.` and `..` segments.
///
/// A leading `/` makes `href` relative to the container root and ignores
/// `base_dir`. `..` never climbs above the root. The result carries no
/// leading separator.
pub fn normalize_path(base_dir: &str, href: &str) -> String {
    let (rest, base) = match href.strip_prefix('/') {
        Some(rest) => (rest, ""),
        None => (href, base_dir),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(rest.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
