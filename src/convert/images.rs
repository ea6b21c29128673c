//! Image extraction into a flat `images/` directory.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::book::Book;
use crate::error::{Error, Result};
use crate::util::basename;

/// Name of the per-book image directory, relative to the Markdown file.
pub const IMAGES_DIR: &str = "images";

/// Original in-archive image path → output path relative to the book
/// directory (`images/<basename>`, always with `/`).
#[derive(Debug, Clone, Default)]
pub struct ImageMap(HashMap<String, String>);

impl ImageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an archive path to `images/<basename>` and return the new path.
    pub fn insert(&mut self, archive_path: &str) -> &str {
        let target = format!("{IMAGES_DIR}/{}", basename(archive_path));
        self.0.insert(archive_path.to_string(), target);
        &self.0[archive_path]
    }

    pub fn get(&self, archive_path: &str) -> Option<&str> {
        self.0.get(archive_path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Write every image item of `book` into `<book_dir>/images/`.
///
/// The directory is created even when the book has no images. Images from
/// different directories that share a basename overwrite each other; the
/// one later in the manifest wins, and all of them map to the same file.
pub fn extract_images(book: &Book, book_dir: &Path) -> Result<ImageMap> {
    let images_dir = book_dir.join(IMAGES_DIR);
    fs::create_dir_all(&images_dir).map_err(|e| Error::write(&images_dir, e))?;

    let mut map = ImageMap::new();
    for item in book.images() {
        let name = basename(&item.path);
        if name.is_empty() {
            continue;
        }
        let dest = images_dir.join(name);
        fs::write(&dest, &item.data).map_err(|e| Error::write(&dest, e))?;
        let mapped = map.insert(&item.path);
        debug!(from = %item.path, to = %mapped, "Extracted image");
    }

    Ok(map)
}
