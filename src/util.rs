//! Path, encoding, and media-type helpers shared by the reader and converter.

use std::borrow::Cow;

use memchr::memmem;
use percent_encoding::percent_decode_str;

// ============================================================================
// Archive Paths
// ============================================================================

/// Strip a `#fragment` suffix from an href.
pub fn strip_fragment(href: &str) -> &str {
    match memchr::memchr(b'#', href.as_bytes()) {
        Some(pos) => &href[..pos],
        None => href,
    }
}

/// Directory portion of an in-archive path, without a trailing slash.
///
/// ```ignore
/// assert_eq!(parent_dir("OEBPS/text/ch1.xhtml"), "OEBPS/text");
/// assert_eq!(parent_dir("ch1.xhtml"), "");
/// ```
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

/// Final component of a path. Both `/` and `\` count as separators, since
/// some packagers write Windows-style entry names.
pub fn basename(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Percent-decode an href, leaving it untouched when the result is not UTF-8.
pub fn percent_decode(href: &str) -> Cow<'_, str> {
    percent_decode_str(href)
        .decode_utf8()
        .unwrap_or(Cow::Borrowed(href))
}

/// Resolve `href` against `base_dir`, collapsing `.` and `..` segments.
///
/// A leading `/` anchors the href at the archive root. `..` above the root is
/// dropped rather than kept, so the result is always a plain archive path.
///
/// ```ignore
/// assert_eq!(resolve_relative("OEBPS/text", "../images/a.png"), "OEBPS/images/a.png");
/// assert_eq!(resolve_relative("", "./a/./b.png"), "a/b.png");
/// ```
pub fn resolve_relative(base_dir: &str, href: &str) -> String {
    let (mut parts, href): (Vec<&str>, &str) = match href.strip_prefix('/') {
        Some(rest) => (Vec::new(), rest),
        None => (
            base_dir.split('/').filter(|s| !s.is_empty()).collect(),
            href,
        ),
    };

    for segment in href.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            s => parts.push(s),
        }
    }

    parts.join("/")
}

/// Normalize a standalone archive path (no base directory).
pub fn normalize_path(path: &str) -> String {
    resolve_relative("", path)
}

/// Turn a reference found inside a document into a normalized archive path.
///
/// Returns `None` for references that can never name an archive entry:
/// absolute URLs (`http:`, `data:`, `mailto:` ...) and empty or fragment-only
/// hrefs. Query strings and fragments are dropped before resolution.
pub fn resolve_reference(base_dir: &str, reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with('#') || has_url_scheme(reference) {
        return None;
    }
    let reference = strip_fragment(reference);
    let reference = reference.split('?').next().unwrap_or(reference);
    let decoded = percent_decode(reference);
    Some(resolve_relative(base_dir, &decoded))
}

/// Whether `s` starts with a URL scheme such as `https:` or `data:`.
fn has_url_scheme(s: &str) -> bool {
    let Some(colon) = s.find(':') else {
        return false;
    };
    let scheme = &s[..colon];
    // Single letters are Windows drive letters, not schemes.
    scheme.len() > 1
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

// ============================================================================
// Encoding Detection
// ============================================================================

/// Decode bytes to a string, handling various encodings.
///
/// 1. UTF-8 first (BOM handled by encoding_rs)
/// 2. The hint encoding, usually from `<?xml encoding="..."?>`
/// 3. Windows-1252 (common in old ebooks)
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

/// Decode a content document using its own XML declaration as the hint.
pub fn decode_document(bytes: &[u8]) -> Cow<'_, str> {
    decode_text(bytes, extract_xml_encoding(bytes))
}

/// Extract the encoding name from an `<?xml ... encoding="..."?>` declaration.
///
/// Only the first 100 bytes are inspected.
pub fn extract_xml_encoding(bytes: &[u8]) -> Option<&str> {
    let prefix = &bytes[..bytes.len().min(100)];

    let xml_start = memmem::find(prefix, b"<?xml")?;
    let after_xml = &prefix[xml_start..];

    let enc_pos = after_xml
        .windows(9)
        .position(|w| w.eq_ignore_ascii_case(b"encoding="))?;
    let after_enc = &after_xml[enc_pos + 9..];

    let (&quote, rest) = after_enc.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }

    let value_end = memchr::memchr(quote, rest)?;
    std::str::from_utf8(&rest[..value_end]).ok()
}

// ============================================================================
// Media Type Fallback
// ============================================================================

/// Guess a media type from a file extension, for manifest items that omit one.
pub fn guess_media_type(path: &str) -> Option<&'static str> {
    let ext = basename(path).rsplit_once('.')?.1.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "xhtml" | "xht" => "application/xhtml+xml",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "ncx" => "application/x-dtbncx+xml",
        _ => return None,
    };
    Some(media_type)
}
