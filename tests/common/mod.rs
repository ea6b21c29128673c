//! Builds small EPUB archives for integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub struct EpubBuilder {
    title: Option<String>,
    /// (path under OEBPS/, data, media type)
    items: Vec<(String, Vec<u8>, String)>,
    nav_map: String,
}

impl EpubBuilder {
    pub fn new() -> Self {
        Self {
            title: None,
            items: Vec::new(),
            nav_map: String::new(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn chapter(self, path: &str, body: &str) -> Self {
        let html = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>x</title></head>\
             <body>{body}</body></html>"
        );
        self.document(path, &html)
    }

    /// A content document given verbatim, prolog and head included.
    pub fn document(mut self, path: &str, xhtml: &str) -> Self {
        self.items.push((
            path.to_string(),
            xhtml.as_bytes().to_vec(),
            "application/xhtml+xml".to_string(),
        ));
        self
    }

    pub fn image(mut self, path: &str, data: &[u8]) -> Self {
        self.items
            .push((path.to_string(), data.to_vec(), "image/png".to_string()));
        self
    }

    /// Raw `<navPoint>` elements for the NCX `navMap`.
    pub fn nav_map(mut self, nav_points: &str) -> Self {
        self.nav_map = nav_points.to_string();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut manifest = String::new();
        let mut spine = String::new();
        for (i, (path, _, media_type)) in self.items.iter().enumerate() {
            let href = path.replace(' ', "%20");
            manifest.push_str(&format!(
                "<item id=\"item{i}\" href=\"{href}\" media-type=\"{media_type}\"/>\n"
            ));
            if media_type == "application/xhtml+xml" {
                spine.push_str(&format!("<itemref idref=\"item{i}\"/>"));
            }
        }
        let title = self
            .title
            .as_ref()
            .map(|t| format!("<dc:title>{t}</dc:title>"))
            .unwrap_or_default();
        let opf = format!(
            "<?xml version=\"1.0\"?>\n\
             <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"2.0\">\
             <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">{title}\
             <dc:language>en</dc:language></metadata>\
             <manifest>{manifest}<item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/></manifest>\
             <spine toc=\"ncx\">{spine}</spine></package>"
        );
        let ncx = format!(
            "<?xml version=\"1.0\"?>\n\
             <ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\" version=\"2005-1\">\
             <navMap>{}</navMap></ncx>",
            self.nav_map
        );

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default();

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        zip.start_file("META-INF/container.xml", deflated).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
<rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#,
        )
        .unwrap();
        zip.start_file("OEBPS/content.opf", deflated).unwrap();
        zip.write_all(opf.as_bytes()).unwrap();
        zip.start_file("OEBPS/toc.ncx", deflated).unwrap();
        zip.write_all(ncx.as_bytes()).unwrap();
        for (path, data, _) in &self.items {
            zip.start_file(format!("OEBPS/{path}"), deflated).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}

/// A `<navPoint>` with optional nested children.
pub fn nav_point(label: &str, src: &str, children: &str) -> String {
    format!(
        "<navPoint><navLabel><text>{label}</text></navLabel>\
         <content src=\"{src}\"/>{children}</navPoint>"
    )
}

/// Lines of `markdown` that are ATX headings.
pub fn headings(markdown: &str) -> Vec<&str> {
    markdown.lines().filter(|l| l.starts_with('#')).collect()
}
