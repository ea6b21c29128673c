//! Table-of-contents driven assembly of the Markdown document.

use tracing::{debug, warn};

use crate::book::{Book, ItemKind, TocNode};

use super::chapter::{fold_title, process_chapter};
use super::images::ImageMap;
use super::resolver::ChapterResolver;

/// Toc depth of top-level entries; the book title sits at level 1.
pub const ROOT_DEPTH: usize = 2;

/// Ordered Markdown blocks, joined with blank lines on output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledDocument {
    blocks: Vec<String>,
}

impl AssembledDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an ATX heading line.
    pub fn push_heading(&mut self, level: usize, title: &str) {
        self.blocks.push(format!("{} {}", "#".repeat(level), title.trim()));
    }

    /// Append a block of Markdown; blank blocks are dropped.
    pub fn push_block(&mut self, block: impl Into<String>) {
        let block = block.into();
        if !block.trim().is_empty() {
            self.blocks.push(block);
        }
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Join all blocks with blank-line separators and a final newline.
    pub fn join(&self) -> String {
        let mut out = self.blocks.join("\n\n");
        out.push('\n');
        out
    }
}

/// Counters collected while walking the toc.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub chapters: usize,
    pub skipped: usize,
}

/// Walks a book's toc forest, emitting headings by depth and chapter bodies.
pub struct Assembler<'a> {
    resolver: ChapterResolver<'a>,
    images: &'a ImageMap,
    book_title: String,
    doc: AssembledDocument,
    stats: AssemblyStats,
}

impl<'a> Assembler<'a> {
    pub fn new(book: &'a Book, book_title: &str, images: &'a ImageMap) -> Self {
        Self {
            resolver: ChapterResolver::new(book),
            images,
            book_title: fold_title(book_title),
            doc: AssembledDocument::new(),
            stats: AssemblyStats::default(),
        }
    }

    /// Assemble `nodes` as top-level entries.
    pub fn run(mut self, nodes: &[TocNode]) -> (AssembledDocument, AssemblyStats) {
        self.assemble(nodes, ROOT_DEPTH);
        (self.doc, self.stats)
    }

    fn assemble(&mut self, nodes: &[TocNode], depth: usize) {
        for node in nodes {
            match node {
                TocNode::Leaf { title, href } => self.assemble_leaf(title, href, depth),
                TocNode::Section { title, children } => {
                    self.push_title_heading(depth, title);
                    self.assemble(children, depth + 1);
                }
            }
        }
    }

    fn assemble_leaf(&mut self, title: &str, href: &str, depth: usize) {
        let Some(item) = self.resolver.resolve(href) else {
            warn!(href = %href, title = %title, "Toc entry points at a missing document, skipping");
            self.stats.skipped += 1;
            return;
        };
        if item.kind() != ItemKind::Document {
            warn!(href = %href, media_type = %item.media_type, "Toc entry is not a content document, skipping");
            self.stats.skipped += 1;
            return;
        }

        debug!(title = %title, path = %item.path, depth, "Processing chapter");
        self.push_title_heading(depth, title);
        let chapter = process_chapter(item, title, self.images);
        self.doc.push_block(chapter.render(depth));
        self.stats.chapters += 1;
    }

    /// Emit a toc heading unless it merely repeats the book title.
    fn push_title_heading(&mut self, depth: usize, title: &str) {
        let folded = fold_title(title);
        if folded.is_empty() || folded == self.book_title {
            return;
        }
        self.doc.push_heading(depth, title);
    }
}

/// Assemble the chapters of `book` in toc order.
pub fn assemble(book: &Book, book_title: &str, images: &ImageMap) -> (AssembledDocument, AssemblyStats) {
    Assembler::new(book, book_title, images).run(&book.toc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book_with(items: &[(&str, &str)], toc: Vec<TocNode>) -> Book {
        let mut book = Book::new();
        for (path, html) in items {
            book.add_item(*path, html.as_bytes().to_vec(), "application/xhtml+xml");
        }
        book.toc = toc;
        book
    }

    fn headings(doc: &AssembledDocument) -> Vec<&str> {
        doc.blocks()
            .iter()
            .flat_map(|b| b.lines())
            .filter(|l| l.starts_with('#'))
            .collect()
    }

    #[test]
    fn test_nested_toc_levels() {
        let book = book_with(
            &[("a.xhtml", "<p>intro</p>"), ("b.xhtml", "<p>one</p>")],
            vec![
                TocNode::leaf("Intro", "a.xhtml"),
                TocNode::section("Part I", vec![TocNode::leaf("Ch.1", "b.xhtml")]),
            ],
        );
        let (doc, stats) = assemble(&book, "Foo", &ImageMap::new());

        assert_eq!(headings(&doc), vec!["## Intro", "## Part I", "### Ch.1"]);
        assert_eq!(stats, AssemblyStats { chapters: 2, skipped: 0 });
    }

    #[test]
    fn test_missing_target_skipped_siblings_kept() {
        let book = book_with(
            &[("a.xhtml", "<p>A</p>"), ("c.xhtml", "<p>C</p>")],
            vec![
                TocNode::leaf("A", "a.xhtml"),
                TocNode::leaf("B", "missing.xhtml#x"),
                TocNode::leaf("C", "c.xhtml"),
            ],
        );
        let (doc, stats) = assemble(&book, "Book", &ImageMap::new());

        assert_eq!(doc.blocks(), &["## A", "A", "## C", "C"]);
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_non_document_target_skipped() {
        let mut book = book_with(&[], vec![TocNode::leaf("Cover", "cover.jpg")]);
        book.add_item("cover.jpg", vec![0xFF], "image/jpeg");
        let (doc, stats) = assemble(&book, "Book", &ImageMap::new());
        assert!(doc.is_empty());
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn test_title_equal_to_book_title_suppresses_heading_only() {
        let book = book_with(
            &[("t.xhtml", "<p>Title page</p>")],
            vec![TocNode::leaf("  foo ", "t.xhtml")],
        );
        let (doc, _) = assemble(&book, "Foo", &ImageMap::new());
        assert_eq!(doc.blocks(), &["Title page"]);
    }

    #[test]
    fn test_fragments_share_a_document() {
        let book = book_with(
            &[("all.xhtml", "<p>Body</p>")],
            vec![
                TocNode::leaf("One", "all.xhtml#one"),
                TocNode::leaf("Two", "all.xhtml#two"),
            ],
        );
        let (doc, stats) = assemble(&book, "Book", &ImageMap::new());
        assert_eq!(stats.chapters, 2);
        assert_eq!(headings(&doc), vec!["## One", "## Two"]);
    }

    #[test]
    fn test_join() {
        let mut doc = AssembledDocument::new();
        doc.push_heading(1, "Foo");
        doc.push_block("   ");
        doc.push_block("text");
        assert_eq!(doc.join(), "# Foo\n\ntext\n");
    }
}
