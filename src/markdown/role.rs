//! Maps HTML elements to the Markdown constructs they render as.

use html5ever::LocalName;

/// Inline emphasis carried by an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Strong,
    Em,
    Code,
    /// Styling with no Markdown equivalent (`span`, `sup`, `u` ...).
    Plain,
}

/// How an element renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Dropped along with its whole subtree.
    Skip,
    Container,
    Paragraph,
    Heading(usize),
    Link,
    Image,
    Break,
    Rule,
    BlockQuote,
    OrderedList,
    UnorderedList,
    ListItem,
    CodeBlock,
    Table,
    TableRow,
    DefinitionList,
    DefinitionTerm,
    DefinitionDescription,
    Caption,
    Inline(Emphasis),
}

impl Role {
    /// Block roles are separated from their neighbours by a blank line.
    pub fn is_block(self) -> bool {
        !matches!(
            self,
            Role::Skip | Role::Link | Role::Image | Role::Break | Role::Inline(_)
        )
    }
}

/// Map an HTML element name to its role.
pub fn element_role(local_name: &LocalName) -> Role {
    match local_name.as_ref() {
        // Non-content
        "head" | "title" | "script" | "style" | "template" | "noscript" | "meta" | "link" => {
            Role::Skip
        }

        // Block containers
        "html" | "body" | "div" | "section" | "article" | "nav" | "header" | "footer"
        | "main" | "aside" | "address" | "details" | "summary" | "hgroup" | "figure"
        | "svg" | "center" => Role::Container,

        "p" => Role::Paragraph,
        "br" => Role::Break,
        "hr" => Role::Rule,
        "pre" => Role::CodeBlock,
        "blockquote" => Role::BlockQuote,
        "figcaption" | "caption" => Role::Caption,

        "h1" => Role::Heading(1),
        "h2" => Role::Heading(2),
        "h3" => Role::Heading(3),
        "h4" => Role::Heading(4),
        "h5" => Role::Heading(5),
        "h6" => Role::Heading(6),

        "a" => Role::Link,
        // `image` is the SVG element used for cover pages
        "img" | "image" => Role::Image,

        "ul" => Role::UnorderedList,
        "ol" => Role::OrderedList,
        "li" => Role::ListItem,

        "dl" => Role::DefinitionList,
        "dt" => Role::DefinitionTerm,
        "dd" => Role::DefinitionDescription,

        "table" => Role::Table,
        "tr" => Role::TableRow,
        "thead" | "tbody" | "tfoot" => Role::Container,

        "strong" | "b" => Role::Inline(Emphasis::Strong),
        "em" | "i" | "cite" | "var" | "dfn" => Role::Inline(Emphasis::Em),
        "code" | "kbd" | "samp" | "tt" => Role::Inline(Emphasis::Code),

        "span" | "sup" | "sub" | "u" | "ins" | "s" | "strike" | "del" | "small" | "mark"
        | "abbr" | "time" | "q" | "label" | "font" | "big" | "ruby" | "rt" | "rp" | "bdi"
        | "bdo" | "wbr" | "td" | "th" => Role::Inline(Emphasis::Plain),

        // Unknown elements are treated as containers
        _ => Role::Container,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(tag: &str) -> Role {
        element_role(&LocalName::from(tag))
    }

    #[test]
    fn test_element_roles() {
        assert_eq!(role("p"), Role::Paragraph);
        assert_eq!(role("h3"), Role::Heading(3));
        assert_eq!(role("b"), Role::Inline(Emphasis::Strong));
        assert_eq!(role("cite"), Role::Inline(Emphasis::Em));
        assert_eq!(role("script"), Role::Skip);
        assert_eq!(role("image"), Role::Image);
        assert_eq!(role("custom-element"), Role::Container);
    }

    #[test]
    fn test_block_classification() {
        assert!(role("p").is_block());
        assert!(role("table").is_block());
        assert!(!role("a").is_block());
        assert!(!role("span").is_block());
    }
}
