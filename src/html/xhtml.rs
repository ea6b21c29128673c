//! XHTML syntax the HTML5 tree builder does not understand.

use quick_xml::events::Event;
use quick_xml::{Reader, Writer};

/// Elements that never have content. Their `<x/>` form is valid HTML too.
const VOID_ELEMENTS: &[&[u8]] = &[
    b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"link", b"meta",
    b"param", b"source", b"track", b"wbr",
];

fn is_void(local_name: &[u8]) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|void| local_name.eq_ignore_ascii_case(void))
}

/// Rewrite every self-closing non-void element `<x .../>` as `<x ...></x>`.
///
/// The HTML tree builder ignores the self-closing flag outside foreign
/// content: `<title/>` swallows the rest of the file as title text and
/// `<div/>` wraps all of its following siblings.
///
/// Returns `None` when the input is not well-formed XML (it is then left to
/// the HTML parser's own recovery) or when there was nothing to expand.
pub fn expand_self_closing(xhtml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xhtml);
    let mut writer = Writer::new(Vec::with_capacity(xhtml.len() + 64));
    let mut expanded = false;

    loop {
        match reader.read_event().ok()? {
            Event::Eof => break,
            Event::Empty(e) if !is_void(e.local_name().as_ref()) => {
                writer.write_event(Event::Start(e.borrow())).ok()?;
                writer.write_event(Event::End(e.to_end())).ok()?;
                expanded = true;
            }
            event => writer.write_event(event).ok()?,
        }
    }

    if !expanded {
        return None;
    }
    String::from_utf8(writer.into_inner()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_void_elements_expanded() {
        let out = expand_self_closing(
            r#"<html><head><title/></head><body><a id="top"/><div class="x"/><p>Text</p></body></html>"#,
        )
        .unwrap();
        assert_eq!(
            out,
            r#"<html><head><title></title></head><body><a id="top"></a><div class="x"></div><p>Text</p></body></html>"#
        );
    }

    #[test]
    fn test_void_elements_and_markup_preserved() {
        let input = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
            "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title/></head>",
            "<body><p>a<br/>b &amp; c&#233;<img src=\"x.png\" alt=\"\"/></p><!-- note --></body></html>",
        );
        let out = expand_self_closing(input).unwrap();
        assert_eq!(
            out,
            input.replace("<title/>", "<title></title>"),
            "only the title tag changes"
        );
    }

    #[test]
    fn test_prefixed_names_keep_their_prefix() {
        let out = expand_self_closing(r#"<svg:svg><svg:image xlink:href="a.png"/></svg:svg>"#)
            .unwrap();
        assert_eq!(out, r#"<svg:svg><svg:image xlink:href="a.png"></svg:image></svg:svg>"#);
    }

    #[test]
    fn test_nothing_to_expand() {
        assert_eq!(expand_self_closing("<p>plain<br/></p>"), None);
    }

    #[test]
    fn test_malformed_xml_left_alone() {
        assert_eq!(expand_self_closing("<p>one<p>two</div>"), None);
        assert_eq!(expand_self_closing("<div/><p>unclosed <br></p>"), None);
    }
}
