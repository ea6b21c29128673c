use std::collections::HashMap;

use crate::book::{Book, ContentItem};
use crate::util::strip_fragment;

/// Lookup from in-archive path to content item, for resolving toc hrefs.
pub struct ChapterResolver<'a> {
    by_path: HashMap<&'a str, &'a ContentItem>,
}

impl<'a> ChapterResolver<'a> {
    pub fn new(book: &'a Book) -> Self {
        let by_path = book
            .items
            .iter()
            .map(|item| (item.path.as_str(), item))
            .collect();
        Self { by_path }
    }

    /// Resolve a toc href, ignoring any `#fragment`.
    pub fn resolve(&self, href: &str) -> Option<&'a ContentItem> {
        self.by_path.get(strip_fragment(href)).copied()
    }
}
