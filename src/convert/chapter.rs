//! Per-chapter processing: image rewriting, duplicate title removal and
//! heading normalization.

use tracing::debug;

use crate::book::ContentItem;
use crate::html::{ArenaDom, ArenaNodeId, parse_xhtml};
use crate::markdown::{RenderOptions, render_html};
use crate::util::{decode_document, parent_dir, resolve_reference};

use super::images::ImageMap;

/// A chapter document ready to render.
pub struct ProcessedChapter {
    dom: ArenaDom,
    /// Whether the first body heading was dropped as a duplicate of the
    /// toc title.
    pub removed_heading: bool,
    /// Number of image references pointed at extracted files.
    pub rewritten_images: usize,
}

impl ProcessedChapter {
    /// Render the chapter body with its headings placed below a toc heading
    /// at `depth`: the shallowest remaining heading becomes `depth + 1` and
    /// the rest keep their relative nesting.
    pub fn render(&self, depth: usize) -> String {
        let body = self.dom.body();
        let offset = match min_heading_level(&self.dom, body) {
            Some(min) => depth as i32 + 1 - min as i32,
            None => 0,
        };
        render_html(&self.dom, body, RenderOptions::default().with_heading_offset(offset))
    }
}

/// Parse a chapter and apply the image and title fixes.
pub fn process_chapter(item: &ContentItem, toc_title: &str, images: &ImageMap) -> ProcessedChapter {
    let html = decode_document(&item.data);
    let mut dom = parse_xhtml(&html);

    let rewritten_images = rewrite_images(&mut dom, parent_dir(&item.path), images);
    let removed_heading = remove_duplicate_heading(&mut dom, toc_title);
    if removed_heading {
        debug!(path = %item.path, title = %toc_title, "Removed duplicate chapter heading");
    }

    ProcessedChapter {
        dom,
        removed_heading,
        rewritten_images,
    }
}

/// Point `<img src>` and SVG `<image href>` at extracted images.
///
/// References are resolved against `chapter_dir`. Anything that does not
/// resolve to a known image is left untouched.
pub fn rewrite_images(dom: &mut ArenaDom, chapter_dir: &str, images: &ImageMap) -> usize {
    let targets: Vec<(ArenaNodeId, &'static str)> = dom
        .descendants(dom.document())
        .filter_map(|id| match dom.element_name(id)?.as_ref() {
            "img" => Some((id, "src")),
            "image" => Some((id, "href")),
            _ => None,
        })
        .collect();

    let mut rewritten = 0;
    for (id, attr) in targets {
        let Some(reference) = dom.get_attr(id, attr) else {
            continue;
        };
        let Some(archive_path) = resolve_reference(chapter_dir, reference) else {
            continue;
        };
        match images.get(&archive_path) {
            Some(mapped) => {
                let mapped = mapped.to_string();
                dom.set_attr(id, attr, mapped);
                rewritten += 1;
            }
            None => debug!(reference = %archive_path, "Image reference not among extracted images"),
        }
    }
    rewritten
}

/// Detach the first body heading if its text overlaps `toc_title`.
pub fn remove_duplicate_heading(dom: &mut ArenaDom, toc_title: &str) -> bool {
    let Some(heading) = first_heading(dom, dom.body()) else {
        return false;
    };
    if !titles_overlap(&dom.collect_text(heading), toc_title) {
        return false;
    }
    dom.detach(heading);
    true
}

/// Case-insensitive containment in either direction, after whitespace
/// folding. An empty side never overlaps.
pub fn titles_overlap(heading: &str, toc_title: &str) -> bool {
    let heading = fold_title(heading);
    let title = fold_title(toc_title);
    if heading.is_empty() || title.is_empty() {
        return false;
    }
    heading.contains(&title) || title.contains(&heading)
}

/// Collapse whitespace runs, trim and lowercase.
pub fn fold_title(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn first_heading(dom: &ArenaDom, root: ArenaNodeId) -> Option<ArenaNodeId> {
    dom.descendants(root).find(|&id| dom.heading_level(id).is_some())
}

fn min_heading_level(dom: &ArenaDom, root: ArenaNodeId) -> Option<usize> {
    dom.descendants(root)
        .filter_map(|id| dom.heading_level(id))
        .min()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(path: &str, html: &str) -> ContentItem {
        ContentItem {
            path: path.to_string(),
            media_type: "application/xhtml+xml".to_string(),
            data: html.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_titles_overlap() {
        assert!(titles_overlap("Beginnings", "Chapter 1: Beginnings"));
        assert!(titles_overlap("CHAPTER 1:  Beginnings", "Chapter 1"));
        assert!(titles_overlap("  chapter\n one ", "Chapter One"));
        assert!(!titles_overlap("Prologue", "Chapter 1"));
        assert!(!titles_overlap("", "Chapter 1"));
    }

    #[test]
    fn test_duplicate_heading_removed_others_kept() {
        let item = chapter(
            "OEBPS/ch1.xhtml",
            "<html><body><h1>Beginnings</h1><p>Text</p><h2>A scene</h2></body></html>",
        );
        let processed = process_chapter(&item, "Chapter 1: Beginnings", &ImageMap::new());

        assert!(processed.removed_heading);
        let md = processed.render(2);
        assert!(!md.contains("Beginnings"));
        assert!(md.contains("### A scene"));
        assert!(md.contains("Text"));
    }

    #[test]
    fn test_non_matching_heading_kept_and_shifted() {
        let item = chapter(
            "ch.xhtml",
            "<body><h2>Prologue</h2><h3>Part</h3><h2>Next</h2></body>",
        );
        let processed = process_chapter(&item, "Chapter 1", &ImageMap::new());

        assert!(!processed.removed_heading);
        assert_eq!(processed.render(2), "### Prologue\n\n#### Part\n\n### Next");
        assert_eq!(processed.render(3), "#### Prologue\n\n##### Part\n\n#### Next");
    }

    #[test]
    fn test_only_first_heading_is_considered() {
        let item = chapter(
            "ch.xhtml",
            "<body><h1>Preface</h1><h1>Chapter 1</h1></body>",
        );
        let processed = process_chapter(&item, "Chapter 1", &ImageMap::new());
        assert!(!processed.removed_heading);
        assert_eq!(processed.render(2), "### Preface\n\n### Chapter 1");
    }

    #[test]
    fn test_xhtml_self_closing_tags() {
        let item = chapter(
            "OEBPS/ch.xhtml",
            r#"<?xml version="1.0" encoding="utf-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title/></head>
<body><p>Real chapter text.</p></body></html>"#,
        );
        let processed = process_chapter(&item, "Ch", &ImageMap::new());
        assert_eq!(processed.render(2), "Real chapter text.");

        let item = chapter(
            "OEBPS/ch.xhtml",
            r#"<html><body><div class="x"/><h1>Ch</h1><p>Body</p></body></html>"#,
        );
        let processed = process_chapter(&item, "Other", &ImageMap::new());
        assert_eq!(processed.render(2), "### Ch\n\nBody");
    }

    #[test]
    fn test_rewrite_relative_image() {
        let mut images = ImageMap::new();
        images.insert("OEBPS/images/fig 1.png");

        let item = chapter(
            "OEBPS/text/ch1.xhtml",
            r#"<body><p><img src="../images/fig%201.png" alt="Fig"/></p>
<p><img src="../images/unknown.png"/></p>
<svg><image xlink:href="../images/fig%201.png"/></svg></body>"#,
        );
        let processed = process_chapter(&item, "Ch", &images);

        assert_eq!(processed.rewritten_images, 2);
        let md = processed.render(2);
        assert!(md.contains("![Fig](<images/fig 1.png>)"));
        assert!(md.contains("![](../images/unknown.png)"));
        assert!(md.contains("![](<images/fig 1.png>)"));
    }
}
