//! # epub2md
//!
//! Convert EPUB ebooks into Markdown, one file per book, with images
//! extracted next to it and chapter structure taken from the table of
//! contents.
//!
//! ## Quick Start
//!
//! ```no_run
//! use epub2md::{ConvertOptions, convert_epub};
//!
//! let report = convert_epub("input.epub", &ConvertOptions::default())?;
//! println!("{} chapters -> {}", report.chapters, report.markdown_path.display());
//! # Ok::<(), epub2md::Error>(())
//! ```
//!
//! ## Output layout
//!
//! ```text
//! markdown_output/
//! └── <Title>/
//!     ├── <Title>.md
//!     └── images/
//! ```
//!
//! The Markdown file starts with `# <Title>`. Each table-of-contents entry
//! becomes a heading whose level is its depth (top-level entries are `##`),
//! followed by the chapter body with its own headings nested below it.
//!
//! ## Working with Books
//!
//! [`read_epub`] gives access to the parsed [`Book`] without converting it:
//!
//! ```
//! use epub2md::{Book, Metadata, TocNode};
//!
//! let mut book = Book::new();
//! book.metadata = Metadata::new("My Book")
//!     .with_author("Author Name")
//!     .with_language("en");
//! book.add_item("OEBPS/ch1.xhtml", b"<p>Hello</p>".to_vec(), "application/xhtml+xml");
//! book.toc.push(TocNode::leaf("Chapter 1", "OEBPS/ch1.xhtml"));
//!
//! assert_eq!(book.chapter_count(), 1);
//! ```

pub mod book;
pub mod convert;
pub mod epub;
pub mod error;
pub mod html;
pub mod markdown;
pub mod split;
pub(crate) mod util;

pub use book::{Book, ContentItem, ItemKind, Metadata, TocNode};
pub use convert::{BatchSummary, ConversionReport, ConvertOptions, convert_all, convert_book, convert_epub};
pub use epub::read_epub;
pub use error::{Error, Result};
pub use split::{SplitOptions, split_file};
