use crate::util::guess_media_type;

/// An EPUB as the converter sees it: metadata, every manifest item in
/// manifest order, and the table of contents.
#[derive(Debug, Clone, Default)]
pub struct Book {
    pub metadata: Metadata,
    pub items: Vec<ContentItem>,
    pub toc: Vec<TocNode>,
}

/// Book metadata (Dublin Core subset)
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct Metadata {
    pub title: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Vec::is_empty"))]
    pub authors: Vec<String>,
    pub language: String,
    pub identifier: String,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub publisher: Option<String>,
    #[cfg_attr(feature = "cli", serde(skip_serializing_if = "Option::is_none"))]
    pub date: Option<String>,
}

/// A table of contents node.
///
/// Order is significant: it is the order chapters appear in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
#[cfg_attr(feature = "cli", serde(tag = "type", rename_all = "snake_case"))]
pub enum TocNode {
    /// A chapter pointing at a content document. `href` is an in-archive
    /// path and may carry a `#fragment`.
    Leaf { title: String, href: String },
    /// A grouping node whose own content is not emitted.
    Section {
        title: String,
        children: Vec<TocNode>,
    },
}

/// How the converter treats a manifest item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Image,
    Document,
    Other,
}

/// A resource inside the container (document, image, stylesheet, etc.)
#[derive(Debug, Clone)]
pub struct ContentItem {
    /// Full in-archive path, normalized and percent-decoded.
    pub path: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

impl Book {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a content item
    pub fn add_item(&mut self, path: impl Into<String>, data: Vec<u8>, media_type: impl Into<String>) {
        self.items.push(ContentItem {
            path: path.into(),
            media_type: media_type.into(),
            data,
        });
    }

    /// Iterate over items classified as images, in manifest order.
    pub fn images(&self) -> impl Iterator<Item = &ContentItem> {
        self.items.iter().filter(|item| item.kind() == ItemKind::Image)
    }

    /// The book title, or `fallback` when the metadata has none.
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        let title = self.metadata.title.trim();
        if title.is_empty() { fallback } else { title }
    }

    /// Number of chapter (leaf) entries in the table of contents.
    pub fn chapter_count(&self) -> usize {
        fn count(nodes: &[TocNode]) -> usize {
            nodes
                .iter()
                .map(|node| match node {
                    TocNode::Leaf { .. } => 1,
                    TocNode::Section { children, .. } => count(children),
                })
                .sum()
        }
        count(&self.toc)
    }
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl TocNode {
    pub fn leaf(title: impl Into<String>, href: impl Into<String>) -> Self {
        TocNode::Leaf {
            title: title.into(),
            href: href.into(),
        }
    }

    pub fn section(title: impl Into<String>, children: Vec<TocNode>) -> Self {
        TocNode::Section {
            title: title.into(),
            children,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            TocNode::Leaf { title, .. } | TocNode::Section { title, .. } => title,
        }
    }
}

impl ContentItem {
    /// Classify by media type, falling back to the file extension when the
    /// manifest left the media type empty.
    pub fn kind(&self) -> ItemKind {
        let media_type = if self.media_type.is_empty() {
            guess_media_type(&self.path).unwrap_or("")
        } else {
            self.media_type.as_str()
        };
        ItemKind::from_media_type(media_type)
    }
}

impl ItemKind {
    pub fn from_media_type(media_type: &str) -> Self {
        let media_type = media_type.trim().to_ascii_lowercase();
        if media_type.starts_with("image/") {
            ItemKind::Image
        } else if matches!(
            media_type.as_str(),
            "application/xhtml+xml" | "text/html" | "application/x-dtbook+xml"
        ) {
            ItemKind::Document
        } else {
            ItemKind::Other
        }
    }
}
