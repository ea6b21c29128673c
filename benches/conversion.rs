use std::hint::black_box;
use std::io::{Cursor, Write};

use criterion::{Criterion, criterion_group, criterion_main};
use epub2md::epub::read_epub_from_reader;
use epub2md::html::parse_html;
use epub2md::markdown::{RenderOptions, render_html};
use epub2md::{ConvertOptions, convert_book};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const CHAPTERS: usize = 40;

fn chapter_html(n: usize) -> String {
    let mut body = format!("<h1>Chapter {n}</h1>");
    for i in 0..30 {
        body.push_str(&format!(
            "<p>Paragraph {i} with <em>emphasis</em>, <strong>weight</strong> and a \
             <a href=\"c{n}.xhtml#p{i}\">link</a>. Some *literal* markers_in_text.</p>"
        ));
    }
    body.push_str("<h2>Notes</h2><ul><li>One</li><li>Two <code>x</code></li></ul>");
    body.push_str("<blockquote><p>Quoted.</p></blockquote><img src=\"img/fig.png\" alt=\"Fig\"/>");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>c</title></head>\
         <body>{body}</body></html>"
    )
}

/// Synthetic EPUB 2 with an NCX, `CHAPTERS` chapters and one image.
fn build_epub() -> Vec<u8> {
    let mut manifest = String::new();
    let mut spine = String::new();
    let mut nav = String::new();
    for n in 0..CHAPTERS {
        manifest.push_str(&format!(
            "<item id=\"c{n}\" href=\"c{n}.xhtml\" media-type=\"application/xhtml+xml\"/>"
        ));
        spine.push_str(&format!("<itemref idref=\"c{n}\"/>"));
        nav.push_str(&format!(
            "<navPoint><navLabel><text>Chapter {n}</text></navLabel><content src=\"c{n}.xhtml\"/></navPoint>"
        ));
    }
    let opf = format!(
        "<?xml version=\"1.0\"?>\n\
         <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"2.0\">\
         <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\"><dc:title>Bench</dc:title></metadata>\
         <manifest>{manifest}\
         <item id=\"fig\" href=\"img/fig.png\" media-type=\"image/png\"/>\
         <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/></manifest>\
         <spine toc=\"ncx\">{spine}</spine></package>"
    );
    let ncx = format!(
        "<?xml version=\"1.0\"?>\n\
         <ncx xmlns=\"http://www.daisy.org/z3986/2005/ncx/\"><navMap>{nav}</navMap></ncx>"
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let mut add = |name: &str, data: &[u8]| {
        zip.start_file(name, options).unwrap();
        zip.write_all(data).unwrap();
    };
    add("mimetype", b"application/epub+zip");
    add(
        "META-INF/container.xml",
        br#"<?xml version="1.0"?><container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container"><rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles></container>"#,
    );
    add("OEBPS/content.opf", opf.as_bytes());
    add("OEBPS/toc.ncx", ncx.as_bytes());
    add("OEBPS/img/fig.png", &[0x89, b'P', b'N', b'G']);
    for n in 0..CHAPTERS {
        add(&format!("OEBPS/c{n}.xhtml"), chapter_html(n).as_bytes());
    }
    zip.finish().unwrap().into_inner()
}

// ============================================================================
// Reading
// ============================================================================

fn bench_read_epub(c: &mut Criterion) {
    let bytes = build_epub();

    c.bench_function("read_epub", |b| {
        b.iter(|| read_epub_from_reader(Cursor::new(black_box(&bytes))).unwrap());
    });
}

// ============================================================================
// Chapter rendering
// ============================================================================

fn bench_parse_html(c: &mut Criterion) {
    let html = chapter_html(1);

    c.bench_function("parse_html", |b| {
        b.iter(|| parse_html(black_box(&html)));
    });
}

fn bench_render_html(c: &mut Criterion) {
    let dom = parse_html(&chapter_html(1));
    let root = dom.body();
    let options = RenderOptions::default().with_heading_offset(2);

    c.bench_function("render_html", |b| {
        b.iter(|| render_html(black_box(&dom), root, options));
    });
}

// ============================================================================
// End to end
// ============================================================================

fn bench_convert_book(c: &mut Criterion) {
    let book = read_epub_from_reader(Cursor::new(build_epub())).unwrap();
    let out = TempDir::new().unwrap();
    let options = ConvertOptions::new().with_output_dir(out.path());

    c.bench_function("convert_book", |b| {
        b.iter(|| convert_book(&book, "bench", &options).unwrap());
    });
}

criterion_group!(
    benches,
    bench_read_epub,
    bench_parse_html,
    bench_render_html,
    bench_convert_book,
);
criterion_main!(benches);
