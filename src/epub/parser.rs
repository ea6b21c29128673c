//! EPUB parsing utilities (container.xml, OPF, NCX, EPUB 3 nav)

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::book::{Metadata, TocNode};
use crate::error::{Error, Result};
use crate::util::{percent_decode, resolve_relative};

/// Parsed OPF package data.
pub struct OpfData {
    pub metadata: Metadata,
    /// Manifest items in document order.
    pub manifest: Vec<ManifestItem>,
    /// `toc` attribute of `<spine>` (NCX manifest id), if any.
    pub toc_id: Option<String>,
}

/// One `<item>` of the OPF manifest. `href` is relative to the OPF file.
#[derive(Debug, Clone)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
    pub properties: Option<String>,
}

impl ManifestItem {
    fn has_property(&self, name: &str) -> bool {
        self.properties
            .as_deref()
            .is_some_and(|props| props.split_ascii_whitespace().any(|p| p == name))
    }
}

impl OpfData {
    /// Manifest href of the NCX document: the spine's `toc` reference, else
    /// the first item with the NCX media type.
    pub fn ncx_href(&self) -> Option<&str> {
        self.toc_id
            .as_deref()
            .and_then(|id| self.manifest.iter().find(|item| item.id == id))
            .or_else(|| {
                self.manifest
                    .iter()
                    .find(|item| item.media_type == "application/x-dtbncx+xml")
            })
            .map(|item| item.href.as_str())
    }

    /// Manifest href of the EPUB 3 navigation document.
    pub fn nav_href(&self) -> Option<&str> {
        self.manifest
            .iter()
            .find(|item| item.has_property("nav"))
            .map(|item| item.href.as_str())
    }
}

/// Parse META-INF/container.xml to find the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8(strip_bom(bytes).to_vec())?;

    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if local_name(e.name().as_ref()) == b"rootfile" =>
            {
                if let Some(path) = attr_value(&e, b"full-path")? {
                    return Ok(path);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Err(Error::MissingElement(
        "rootfile in META-INF/container.xml".into(),
    ))
}

/// Parse the OPF package document.
pub fn parse_opf(content: &str) -> Result<OpfData> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut metadata = Metadata::default();
    let mut manifest: Vec<ManifestItem> = Vec::new();
    let mut toc_id: Option<String> = None;

    let mut in_metadata = false;
    let mut current_element: Option<Vec<u8>> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"metadata" => in_metadata = true,
                    b"title" | b"creator" | b"language" | b"identifier" | b"publisher"
                    | b"date"
                        if in_metadata =>
                    {
                        current_element = Some(local.to_vec());
                        buf_text.clear();
                    }
                    b"spine" => toc_id = attr_value(&e, b"toc")?,
                    b"item" => manifest.extend(manifest_item(&e)?),
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"item" => manifest.extend(manifest_item(&e)?),
                    b"spine" => toc_id = attr_value(&e, b"toc")?,
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if current_element.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if current_element.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    buf_text.push_str(&resolved);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if local == b"metadata" {
                    in_metadata = false;
                }

                if current_element.as_deref() == Some(local) {
                    let value = collapse_whitespace(&buf_text);
                    match local {
                        // First title wins; later ones are usually subtitles.
                        b"title" if metadata.title.is_empty() => metadata.title = value,
                        b"creator" if !value.is_empty() => metadata.authors.push(value),
                        b"language" if metadata.language.is_empty() => metadata.language = value,
                        b"identifier" if metadata.identifier.is_empty() => {
                            metadata.identifier = value
                        }
                        b"publisher" => metadata.publisher = Some(value),
                        b"date" => metadata.date = Some(value),
                        _ => {}
                    }
                    current_element = None;
                    buf_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(OpfData {
        metadata,
        manifest,
        toc_id,
    })
}

fn manifest_item(e: &BytesStart) -> Result<Option<ManifestItem>> {
    let mut id = String::new();
    let mut href = String::new();
    let mut media_type = String::new();
    let mut properties = None;

    for attr in e.attributes().flatten() {
        let value = unescape(&String::from_utf8(attr.value.to_vec())?);
        match attr.key.as_ref() {
            b"id" => id = value,
            b"href" => href = value,
            b"media-type" => media_type = value,
            b"properties" => properties = Some(value),
            _ => {}
        }
    }

    if href.is_empty() {
        return Ok(None);
    }
    Ok(Some(ManifestItem {
        id,
        href,
        media_type,
        properties,
    }))
}

/// Partially built toc entry, shared by the NCX and nav parsers.
#[derive(Default)]
struct PendingNode {
    title: String,
    href: Option<String>,
    children: Vec<TocNode>,
}

impl PendingNode {
    /// Entries with children become sections; childless entries need a link.
    fn finish(self) -> Option<TocNode> {
        let title = collapse_whitespace(&self.title);
        if !self.children.is_empty() {
            Some(TocNode::Section {
                title,
                children: self.children,
            })
        } else {
            self.href.map(|href| TocNode::Leaf { title, href })
        }
    }
}

/// Parse an NCX table of contents.
///
/// `base_dir` is the archive directory of the NCX file; `content src`
/// attributes are resolved against it into full archive paths.
pub fn parse_ncx(content: &str, base_dir: &str) -> Result<Vec<TocNode>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<PendingNode> = vec![PendingNode::default()];
    let mut in_nav_map = false;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"navMap" => in_nav_map = true,
                    b"navPoint" if in_nav_map => stack.push(PendingNode::default()),
                    b"text" if in_nav_map && stack.len() > 1 => in_text = true,
                    b"content" if in_nav_map => set_ncx_src(&e, &mut stack, base_dir)?,
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                if in_nav_map && local_name(name.as_ref()) == b"content" {
                    set_ncx_src(&e, &mut stack, base_dir)?;
                }
            }
            Ok(Event::Text(e)) => {
                if in_text && let Some(state) = stack.last_mut() {
                    state.title.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_text
                    && let Some(state) = stack.last_mut()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    state.title.push_str(&resolved);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"text" => in_text = false,
                    b"navMap" => in_nav_map = false,
                    b"navPoint" if in_nav_map && stack.len() > 1 => {
                        if let Some(node) = stack.pop().and_then(PendingNode::finish)
                            && let Some(parent) = stack.last_mut()
                        {
                            parent.children.push(node);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(stack.into_iter().next().map(|s| s.children).unwrap_or_default())
}

fn set_ncx_src(e: &BytesStart, stack: &mut [PendingNode], base_dir: &str) -> Result<()> {
    // The root entry only collects children; a stray <content> there is ignored.
    if stack.len() > 1
        && let Some(src) = attr_value(e, b"src")?
        && let Some(state) = stack.last_mut()
        && state.href.is_none()
    {
        state.href = Some(resolve_toc_href(base_dir, &src));
    }
    Ok(())
}

/// Parse an EPUB 3 XHTML navigation document.
///
/// Reads the `<nav epub:type="toc">` element (or, if none is typed, the first
/// untyped `<nav>`), turning its nested `<ol>/<li>` structure into toc nodes.
/// Labels come from the `<a>` or `<span>` heading each `<li>`.
pub fn parse_nav(content: &str, base_dir: &str) -> Result<Vec<TocNode>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut results: Vec<TocNode> = Vec::new();
    let mut found_toc = false;
    let mut in_toc = false;
    let mut item_stack: Vec<PendingNode> = Vec::new();
    let mut label_depth = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"nav" if !found_toc => {
                        let nav_type = nav_type(&e)?;
                        let is_toc = match &nav_type {
                            Some(t) => t.split_ascii_whitespace().any(|t| t == "toc"),
                            None => results.is_empty(),
                        };
                        if is_toc {
                            in_toc = true;
                            results.clear();
                            item_stack.clear();
                            found_toc = nav_type.is_some();
                        }
                    }
                    b"li" if in_toc => item_stack.push(PendingNode::default()),
                    b"a" if in_toc => {
                        label_depth += 1;
                        if let Some(href) = attr_value(&e, b"href")?
                            && let Some(item) = item_stack.last_mut()
                            && item.href.is_none()
                        {
                            item.href = Some(resolve_toc_href(base_dir, &href));
                        }
                    }
                    b"span" if in_toc => label_depth += 1,
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if in_toc && label_depth > 0 && let Some(item) = item_stack.last_mut() {
                    item.title.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_toc
                    && label_depth > 0
                    && let Some(item) = item_stack.last_mut()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    item.title.push_str(&resolved);
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                match local_name(name.as_ref()) {
                    b"a" | b"span" if in_toc => label_depth = label_depth.saturating_sub(1),
                    b"li" if in_toc => {
                        if let Some(node) = item_stack.pop().and_then(PendingNode::finish) {
                            match item_stack.last_mut() {
                                Some(parent) => parent.children.push(node),
                                None => results.push(node),
                            }
                        }
                    }
                    b"nav" if in_toc => {
                        in_toc = false;
                        label_depth = 0;
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(results)
}

fn nav_type(e: &BytesStart) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == b"type" {
            return Ok(Some(String::from_utf8(attr.value.to_vec())?));
        }
    }
    Ok(None)
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

/// Resolve a toc href against the navigation document's directory.
///
/// The path part is percent-decoded and normalized into a full archive path;
/// any `#fragment` is carried over unchanged.
pub fn resolve_toc_href(base_dir: &str, href: &str) -> String {
    let href = href.trim();
    let (path, fragment) = match href.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (href, None),
    };
    let mut resolved = resolve_relative(base_dir, &percent_decode(path));
    if let Some(fragment) = fragment {
        resolved.push('#');
        resolved.push_str(fragment);
    }
    resolved
}

/// Read an attribute by local name, unescaping XML entities.
fn attr_value(e: &BytesStart, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes().flatten() {
        if local_name(attr.key.as_ref()) == key {
            let raw = String::from_utf8(attr.value.to_vec())?;
            return Ok(Some(unescape(&raw)));
        }
    }
    Ok(None)
}

/// Strip UTF-8 BOM if present.
pub fn strip_bom(data: &[u8]) -> &[u8] {
    data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data)
}

/// Extract local name from namespaced XML name (e.g., "dc:title" -> "title").
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace `&name;` references in raw attribute text.
fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';').and_then(|semi| {
            resolve_entity(&after[..semi]).map(|resolved| (semi, resolved))
        }) {
            Some((semi, resolved)) => {
                out.push_str(&resolved);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some("\u{a0}".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x").or_else(|| entity.strip_prefix("#X")) {
        u32::from_str_radix(hex, 16).ok()?
    } else {
        entity.strip_prefix('#')?.parse::<u32>().ok()?
    };
    char::from_u32(code).map(|c| c.to_string())
}
