use std::io::{Read, Seek};
use std::path::Path;

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::book::{Book, TocNode};
use crate::error::{Error, Result};
use crate::util::{decode_text, parent_dir, percent_decode, resolve_relative};

use super::parser::{OpfData, parse_container_xml, parse_nav, parse_ncx, parse_opf, strip_bom};

/// Read an EPUB file from disk into a [`Book`].
///
/// Loads every manifest item (documents, images, stylesheets ...) keyed by
/// its full in-archive path, plus the table of contents from the NCX, or from
/// the EPUB 3 navigation document when there is no usable NCX.
///
/// # Example
///
/// ```no_run
/// use epub2md::read_epub;
///
/// let book = read_epub("path/to/book.epub")?;
/// println!("Title: {}", book.metadata.title);
/// # Ok::<(), epub2md::Error>(())
/// ```
pub fn read_epub<P: AsRef<Path>>(path: P) -> Result<Book> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path)?;
    read_epub_from_reader(file)
}

/// Read an EPUB from any [`Read`] + [`Seek`] source.
///
/// # Example
///
/// ```no_run
/// use std::io::Cursor;
/// use epub2md::epub::read_epub_from_reader;
///
/// let epub_data: Vec<u8> = std::fs::read("book.epub")?;
/// let book = read_epub_from_reader(Cursor::new(epub_data))?;
/// # Ok::<(), epub2md::Error>(())
/// ```
pub fn read_epub_from_reader<R: Read + Seek>(reader: R) -> Result<Book> {
    let mut archive = ZipArchive::new(reader)?;

    // 1. Find the OPF file path from container.xml
    let container = read_archive_file_bytes(&mut archive, "META-INF/container.xml")?;
    let opf_path = resolve_relative("", &parse_container_xml(&container)?);
    let opf_dir = parent_dir(&opf_path).to_string();

    // 2. Parse the OPF file
    let opf_bytes = read_archive_file_bytes(&mut archive, &opf_path)?;
    let opf_content = decode_text(strip_bom(&opf_bytes), None);
    let opf = parse_opf(&opf_content)?;

    // 3. Load all manifest items in manifest order
    let mut book = Book::new();
    for item in &opf.manifest {
        let full_path = resolve_relative(&opf_dir, &percent_decode(&item.href));
        match read_archive_file_bytes(&mut archive, &full_path) {
            Ok(data) => book.add_item(full_path, data, item.media_type.clone()),
            Err(Error::Zip(zip::result::ZipError::FileNotFound)) => {
                debug!(path = %full_path, "Manifest item missing from archive");
            }
            Err(e) => return Err(e),
        }
    }

    // 4. Table of contents
    book.toc = read_toc(&book, &opf, &opf_dir)?;
    book.metadata = opf.metadata;

    Ok(book)
}

/// Parse the NCX if present and non-empty, otherwise the nav document.
fn read_toc(book: &Book, opf: &OpfData, opf_dir: &str) -> Result<Vec<TocNode>> {
    let candidates = [
        (opf.ncx_href(), parse_ncx as fn(&str, &str) -> Result<Vec<TocNode>>),
        (opf.nav_href(), parse_nav),
    ];

    for (href, parse) in candidates {
        let Some(href) = href else {
            continue;
        };
        let path = resolve_relative(opf_dir, &percent_decode(href));
        let Some(item) = book.items.iter().find(|item| item.path == path) else {
            debug!(path = %path, "Navigation document listed but not loaded");
            continue;
        };
        let content = decode_text(strip_bom(&item.data), None);
        let toc = parse(&content, parent_dir(&path))?;
        if !toc.is_empty() {
            return Ok(toc);
        }
    }

    warn!("No table of contents found; only the title will be emitted");
    Ok(Vec::new())
}

fn read_archive_file_bytes<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Vec<u8>> {
    // Try direct lookup first
    match archive.by_name(path) {
        Ok(mut file) => {
            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            return Ok(contents);
        }
        Err(zip::result::ZipError::FileNotFound) => {}
        Err(e) => return Err(e.into()),
    }

    // Fallback: entries stored percent-encoded, or with a leading slash
    let encoded = percent_encoding::utf8_percent_encode(path, PATH_ENCODE_SET).to_string();
    for candidate in [encoded, format!("/{path}")] {
        match archive.by_name(&candidate) {
            Ok(mut file) => {
                let mut contents = Vec::new();
                file.read_to_end(&mut contents)?;
                return Ok(contents);
            }
            Err(zip::result::ZipError::FileNotFound) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Err(zip::result::ZipError::FileNotFound.into())
}

/// Characters packagers commonly percent-encode in entry names.
const PATH_ENCODE_SET: &percent_encoding::AsciiSet = &percent_encoding::CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');
