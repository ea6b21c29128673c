//! EPUB → Markdown conversion.
//!
//! Per book: read the archive, extract images into `<out>/<title>/images/`,
//! walk the table of contents emitting one heading per entry (level = depth)
//! followed by the chapter body, and write `<out>/<title>/<title>.md`.
//!
//! ```no_run
//! use epub2md::{ConvertOptions, convert_epub};
//!
//! let options = ConvertOptions::new().with_output_dir("out");
//! let report = convert_epub("book.epub", &options)?;
//! println!("wrote {}", report.markdown_path.display());
//! # Ok::<(), epub2md::Error>(())
//! ```

mod assemble;
mod chapter;
mod emit;
mod images;
mod resolver;

pub use assemble::{AssembledDocument, Assembler, AssemblyStats, ROOT_DEPTH, assemble};
pub use chapter::{
    ProcessedChapter, fold_title, process_chapter, remove_duplicate_heading, rewrite_images,
    titles_overlap,
};
pub use emit::{render_document, sanitize_title, write_atomic};
pub use images::{IMAGES_DIR, ImageMap, extract_images};
pub use resolver::ChapterResolver;

use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::book::Book;
use crate::epub::read_epub;
use crate::error::{Error, Result};

/// Default root for converted books.
pub const DEFAULT_OUTPUT_DIR: &str = "markdown_output";

/// Conversion settings.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Root directory; each book gets its own subdirectory.
    pub output_dir: PathBuf,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl ConvertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }
}

/// What one successful conversion produced.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub title: String,
    pub book_dir: PathBuf,
    pub markdown_path: PathBuf,
    pub images: usize,
    pub chapters: usize,
    /// Toc entries that were skipped (missing or non-document targets).
    pub skipped: usize,
}

/// Convert a single EPUB file.
pub fn convert_epub<P: AsRef<Path>>(path: P, options: &ConvertOptions) -> Result<ConversionReport> {
    let path = path.as_ref();
    let book = read_epub(path)?;
    convert_book(&book, &file_stem(path), options)
}

/// Convert an already-read book. `stem` names the book when its metadata
/// has no title.
pub fn convert_book(book: &Book, stem: &str, options: &ConvertOptions) -> Result<ConversionReport> {
    let title = book.title_or(stem).to_string();
    let dir_name = sanitize_title(&title, stem);
    let book_dir = options.output_dir.join(&dir_name);
    info!(title = %title, dir = %book_dir.display(), "Converting book");

    let images = extract_images(book, &book_dir)?;
    let (body, stats) = assemble(book, &title, &images);
    let markdown = render_document(&title, &body);

    let markdown_path = book_dir.join(format!("{dir_name}.md"));
    write_atomic(&markdown_path, markdown.as_bytes())?;
    info!(
        path = %markdown_path.display(),
        chapters = stats.chapters,
        images = images.len(),
        "Wrote Markdown"
    );

    Ok(ConversionReport {
        title,
        book_dir,
        markdown_path,
        images: images.len(),
        chapters: stats.chapters,
        skipped: stats.skipped,
    })
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub converted: Vec<ConversionReport>,
    pub failed: Vec<(PathBuf, Error)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len()
    }
}

/// Convert every path in turn. A failing book is logged and recorded; the
/// remaining books are still converted.
pub fn convert_all<I, P>(paths: I, options: &ConvertOptions) -> BatchSummary
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut summary = BatchSummary::default();
    for path in paths {
        let path = path.as_ref();
        match convert_epub(path, options) {
            Ok(report) => summary.converted.push(report),
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to convert book");
                summary.failed.push((path.to_path_buf(), e));
            }
        }
    }
    info!(
        converted = summary.converted.len(),
        failed = summary.failed.len(),
        "Batch finished"
    );
    summary
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::book::{Metadata, TocNode};

    fn sample_book() -> Book {
        let mut book = Book::new();
        book.metadata = Metadata::new("Foo: A Story");
        book.add_item(
            "OEBPS/text/ch1.xhtml",
            br#"<html><body><h1>One</h1><p><img src="../img/p.png"/></p></body></html>"#.to_vec(),
            "application/xhtml+xml",
        );
        book.add_item("OEBPS/img/p.png", vec![7, 7], "image/png");
        book.toc = vec![TocNode::leaf("Chapter One", "OEBPS/text/ch1.xhtml")];
        book
    }

    #[test]
    fn test_convert_book_layout() {
        let out = TempDir::new().unwrap();
        let options = ConvertOptions::new().with_output_dir(out.path());

        let report = convert_book(&sample_book(), "stem", &options).unwrap();

        let book_dir = out.path().join("Foo A Story");
        assert_eq!(report.book_dir, book_dir);
        assert_eq!(report.markdown_path, book_dir.join("Foo A Story.md"));
        assert_eq!(fs::read(book_dir.join("images/p.png")).unwrap(), vec![7, 7]);

        let md = fs::read_to_string(&report.markdown_path).unwrap();
        assert_eq!(md, "# Foo: A Story\n\n## Chapter One\n\n![](images/p.png)\n");
    }

    #[test]
    fn test_title_falls_back_to_stem() {
        let out = TempDir::new().unwrap();
        let options = ConvertOptions::new().with_output_dir(out.path());
        let mut book = sample_book();
        book.metadata.title.clear();

        let report = convert_book(&book, "my-book", &options).unwrap();

        assert_eq!(report.title, "my-book");
        assert!(out.path().join("my-book/my-book.md").is_file());
    }

    #[test]
    fn test_convert_all_isolates_failures() {
        let out = TempDir::new().unwrap();
        let options = ConvertOptions::new().with_output_dir(out.path());
        let missing = out.path().join("nope.epub");

        let summary = convert_all([&missing], &options);

        assert!(summary.converted.is_empty());
        assert_eq!(summary.failed.len(), 1);
        assert!(matches!(summary.failed[0].1, Error::NotFound(_)));
        assert_eq!(summary.total(), 1);
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(ConvertOptions::default().output_dir, PathBuf::from("markdown_output"));
    }
}
