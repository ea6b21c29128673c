//! Lenient HTML/XHTML parsing into an editable arena DOM.

mod arena;
mod tree_sink;
mod xhtml;

pub use arena::{ArenaDom, ArenaNode, ArenaNodeData, ArenaNodeId, Attribute};
pub use tree_sink::ArenaSink;
pub use xhtml::expand_self_closing;

use html5ever::driver::ParseOpts;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;

/// Parse a chapter document.
///
/// XHTML is fed through the HTML5 parser: it never fails, and malformed
/// markup is repaired the way a browser would repair it.
pub fn parse_html(html: &str) -> ArenaDom {
    parse_document(ArenaSink::new(), ParseOpts::default())
        .one(html)
        .into_dom()
}

/// Parse an EPUB content document.
///
/// Well-formed XHTML has its self-closing elements expanded first, so that
/// `<title/>` or `<div/>` mean what they mean in XML. Anything else goes to
/// [`parse_html`] as is.
pub fn parse_xhtml(xhtml: &str) -> ArenaDom {
    match expand_self_closing(xhtml) {
        Some(expanded) => parse_html(&expanded),
        None => parse_html(xhtml),
    }
}
