//! HTML DOM → Markdown rendering.
//!
//! Pure string accumulation over an [`ArenaDom`]; the caller decides where
//! the text goes.

use crate::html::{ArenaDom, ArenaNodeData, ArenaNodeId};

use super::escape::{
    calculate_fence_length, calculate_inline_code_ticks, escape_markdown, format_destination,
};
use super::role::{Emphasis, Role, element_role};

/// Rendering knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Added to every `<hN>` level. The result is never allowed below 1.
    pub heading_offset: i32,
}

impl RenderOptions {
    pub fn with_heading_offset(mut self, offset: i32) -> Self {
        self.heading_offset = offset;
        self
    }
}

/// Tracks list context for numbering.
#[derive(Debug, Clone)]
struct ListContext {
    is_ordered: bool,
    start: usize,
    items: usize,
    is_tight: bool,
}

/// Context for rendering (pure string accumulation, no I/O).
pub struct RenderContext<'a> {
    dom: &'a ArenaDom,
    options: RenderOptions,
    output: String,
    line_prefix: String,
    list_stack: Vec<ListContext>,
    /// Inline markers opened but not yet followed by any content.
    pending_open: String,
    at_line_start: bool,
    has_line_content: bool,
    pending_newline: bool,
    pending_space: bool,
    in_heading: bool,
}

impl<'a> RenderContext<'a> {
    pub fn new(dom: &'a ArenaDom, options: RenderOptions) -> Self {
        Self {
            dom,
            options,
            output: String::new(),
            line_prefix: String::new(),
            list_stack: Vec::new(),
            pending_open: String::new(),
            at_line_start: true,
            has_line_content: false,
            pending_newline: false,
            pending_space: false,
            in_heading: false,
        }
    }

    /// Render the subtree rooted at `root`, consuming the context.
    ///
    /// The result has no leading or trailing blank lines.
    pub fn render(mut self, root: ArenaNodeId) -> String {
        self.walk_node(root);
        let trimmed = self.output.trim_end();
        trimmed.trim_start_matches('\n').to_string()
    }

    // ------------------------------------------------------------------------
    // Output primitives
    // ------------------------------------------------------------------------

    /// Flush a pending block separator, then write the line prefix if needed.
    fn ensure_line_started(&mut self) {
        self.flush_separator();
        if self.at_line_start {
            self.output.push_str(&self.line_prefix);
            self.at_line_start = false;
        }
    }

    /// Emit the blank line requested by [`Self::block_boundary`], if any.
    fn flush_separator(&mut self) {
        if self.pending_newline {
            self.pending_newline = false;
            if !self.output.is_empty() {
                if !self.at_line_start {
                    self.write_newline();
                }
                let blank = self.line_prefix.trim_end().to_string();
                self.output.push_str(&blank);
                self.write_newline();
            }
        }
    }

    fn write_newline(&mut self) {
        self.output.push('\n');
        self.at_line_start = true;
        self.has_line_content = false;
        self.pending_space = false;
    }

    /// Request a blank line before the next content.
    ///
    /// Ignored right after a list bullet or quote marker, so the first block
    /// of an item stays on the marker's line.
    fn block_boundary(&mut self) {
        if self.in_heading {
            self.pending_space = true;
            return;
        }
        if self.at_line_start || self.has_line_content {
            self.pending_newline = true;
        }
    }

    /// Make the line ready for inline content: separator, pending space and
    /// any opened emphasis markers.
    fn flush_inline(&mut self) {
        self.ensure_line_started();
        if self.pending_space && self.has_line_content {
            self.output.push(' ');
        }
        self.pending_space = false;
        if !self.pending_open.is_empty() {
            let open = std::mem::take(&mut self.pending_open);
            self.output.push_str(&open);
            self.has_line_content = true;
        }
    }

    fn open_inline(&mut self, marker: &str) {
        self.pending_open.push_str(marker);
    }

    fn close_inline(&mut self, marker: &str) {
        if self.pending_open.ends_with(marker) {
            let len = self.pending_open.len() - marker.len();
            self.pending_open.truncate(len);
        } else {
            self.output.push_str(marker);
        }
    }

    fn write_text(&mut self, text: &str) {
        let text = strip_invisible(text);
        let has_leading = text.starts_with(char::is_whitespace);
        let has_trailing = text.ends_with(char::is_whitespace);

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            if !text.is_empty() {
                self.pending_space = true;
            }
            return;
        }

        if has_leading {
            self.pending_space = true;
        }
        let line_start = !self.has_line_content && self.pending_open.is_empty();
        self.flush_inline();
        let escaped = escape_markdown(&words.join(" "), line_start);
        self.output.push_str(&escaped);
        self.has_line_content = true;

        if has_trailing {
            self.pending_space = true;
        }
    }

    // ------------------------------------------------------------------------
    // Tree walk
    // ------------------------------------------------------------------------

    fn walk_node(&mut self, id: ArenaNodeId) {
        let Some(node) = self.dom.get(id) else {
            return;
        };
        match &node.data {
            ArenaNodeData::Text(text) => self.write_text(text),
            ArenaNodeData::Element { name, .. } => self.walk_element(id, element_role(&name.local)),
            ArenaNodeData::Document => self.walk_children(id),
            ArenaNodeData::Comment(_) | ArenaNodeData::Doctype => {}
        }
    }

    fn walk_children(&mut self, id: ArenaNodeId) {
        for child in self.dom.children(id) {
            self.walk_node(child);
        }
    }

    fn walk_element(&mut self, id: ArenaNodeId, role: Role) {
        match role {
            Role::Skip => {}

            Role::Container | Role::Paragraph | Role::DefinitionList => {
                self.block_boundary();
                self.walk_children(id);
                self.block_boundary();
            }

            Role::Heading(level) => {
                if self.dom.collect_text(id).is_empty() && !self.has_image(id) {
                    return;
                }
                let level = (level as i32 + self.options.heading_offset).max(1) as usize;
                self.block_boundary();
                self.ensure_line_started();
                self.output.push_str(&"#".repeat(level));
                self.output.push(' ');
                self.in_heading = true;
                self.walk_children(id);
                self.in_heading = false;
                self.pending_space = false;
                self.block_boundary();
            }

            Role::OrderedList | Role::UnorderedList => {
                let nested = !self.list_stack.is_empty();
                if nested {
                    if !self.at_line_start {
                        self.write_newline();
                    }
                    self.pending_newline = false;
                } else {
                    self.block_boundary();
                }
                let start = self
                    .dom
                    .get_attr(id, "start")
                    .and_then(|s| s.trim().parse::<usize>().ok())
                    .unwrap_or(1);
                let is_tight = self.is_tight_list(id);
                self.list_stack.push(ListContext {
                    is_ordered: role == Role::OrderedList,
                    start,
                    items: 0,
                    is_tight,
                });
                self.walk_children(id);
                self.list_stack.pop();
                self.block_boundary();
            }

            Role::ListItem => self.walk_list_item(id),

            Role::BlockQuote => {
                self.block_boundary();
                self.flush_separator();
                if !self.at_line_start {
                    // Quote opens right after a list bullet.
                    self.output.push_str("> ");
                }
                let old_prefix = self.line_prefix.clone();
                self.line_prefix.push_str("> ");
                self.walk_children(id);
                self.line_prefix = old_prefix;
                self.block_boundary();
            }

            Role::CodeBlock => self.walk_code_block(id),

            Role::Table => self.walk_table(id),

            Role::TableRow => {
                // A row outside a table; render it like one.
                self.block_boundary();
                self.write_table_row(id);
                self.block_boundary();
            }

            Role::Rule => {
                self.block_boundary();
                self.ensure_line_started();
                self.output.push_str("---");
                self.has_line_content = true;
                self.block_boundary();
            }

            Role::Break => {
                if self.in_heading {
                    self.pending_space = true;
                } else if self.has_line_content {
                    self.output.push('\\');
                    self.write_newline();
                }
            }

            Role::Link => self.walk_link(id),

            Role::Image => self.write_image(id),

            Role::DefinitionTerm => {
                self.block_boundary();
                self.walk_emphasized(id, "**");
                self.block_boundary();
            }

            Role::DefinitionDescription => {
                self.block_boundary();
                self.ensure_line_started();
                self.output.push_str(": ");
                self.walk_children(id);
                self.block_boundary();
            }

            Role::Caption => {
                self.block_boundary();
                self.walk_emphasized(id, "*");
                self.block_boundary();
            }

            Role::Inline(Emphasis::Strong) => self.walk_emphasized(id, "**"),
            Role::Inline(Emphasis::Em) => self.walk_emphasized(id, "*"),
            Role::Inline(Emphasis::Code) => self.write_inline_code(id),
            Role::Inline(Emphasis::Plain) => self.walk_children(id),
        }
    }

    fn walk_emphasized(&mut self, id: ArenaNodeId, marker: &str) {
        if self.dom.collect_text(id).is_empty() {
            self.walk_children(id);
            return;
        }
        self.open_inline(marker);
        self.walk_children(id);
        self.close_inline(marker);
    }

    fn walk_list_item(&mut self, id: ArenaNodeId) {
        let (is_tight, items) = self
            .list_stack
            .last()
            .map(|ctx| (ctx.is_tight, ctx.items))
            .unwrap_or((true, 0));

        // The first item keeps whatever separator the list itself asked for.
        if items > 0 {
            self.pending_newline = !is_tight;
        }
        if !self.pending_newline && !self.at_line_start {
            self.write_newline();
        }
        self.ensure_line_started();

        let bullet = match self.list_stack.last_mut() {
            Some(ctx) => {
                ctx.items += 1;
                if ctx.is_ordered {
                    format!("{}. ", ctx.start + ctx.items - 1)
                } else {
                    "- ".to_string()
                }
            }
            None => "- ".to_string(),
        };
        self.output.push_str(&bullet);

        let old_prefix = self.line_prefix.clone();
        self.line_prefix.push_str(&" ".repeat(bullet.len()));
        self.walk_children(id);
        self.line_prefix = old_prefix;
        self.pending_newline = false;
    }

    /// A list is tight when no item holds more than one paragraph or any
    /// block other than a nested list.
    fn is_tight_list(&self, list: ArenaNodeId) -> bool {
        for item in self.dom.children(list) {
            if self.dom.element_name(item).is_none_or(|n| n.as_ref() != "li") {
                continue;
            }
            let mut paragraphs = 0;
            for child in self.dom.children(item) {
                let Some(name) = self.dom.element_name(child) else {
                    continue;
                };
                match element_role(name) {
                    Role::Paragraph => paragraphs += 1,
                    Role::OrderedList | Role::UnorderedList => {}
                    Role::Container => {}
                    role if role.is_block() => return false,
                    _ => {}
                }
            }
            if paragraphs > 1 {
                return false;
            }
        }
        true
    }

    fn walk_link(&mut self, id: ArenaNodeId) {
        let href = self.dom.get_attr(id, "href").map(str::trim).unwrap_or("");
        if href.is_empty() || href.starts_with('#') || self.in_heading {
            self.walk_children(id);
            return;
        }
        if self.dom.collect_text(id).is_empty() && !self.has_image(id) {
            return;
        }
        let destination = format_destination(href);
        self.flush_inline();
        self.output.push('[');
        self.has_line_content = true;
        self.walk_children(id);
        self.output.push_str("](");
        self.output.push_str(&destination);
        self.output.push(')');
    }

    fn write_image(&mut self, id: ArenaNodeId) {
        let src = self
            .dom
            .get_attr(id, "src")
            .or_else(|| self.dom.get_attr(id, "href"))
            .map(str::trim)
            .unwrap_or("");
        if src.is_empty() {
            return;
        }
        let alt = self.dom.get_attr(id, "alt").unwrap_or("");
        let alt = escape_markdown(&alt.split_whitespace().collect::<Vec<_>>().join(" "), false);
        let destination = format_destination(src);
        self.flush_inline();
        self.output.push_str(&format!("![{alt}]({destination})"));
        self.has_line_content = true;
    }

    fn write_inline_code(&mut self, id: ArenaNodeId) {
        let content = strip_invisible(&self.dom.collect_text(id));
        if content.is_empty() {
            return;
        }
        let ticks = "`".repeat(calculate_inline_code_ticks(&content));
        let spacer = if content.starts_with('`') || content.ends_with('`') {
            " "
        } else {
            ""
        };
        self.flush_inline();
        self.output
            .push_str(&format!("{ticks}{spacer}{content}{spacer}{ticks}"));
        self.has_line_content = true;
    }

    fn walk_code_block(&mut self, id: ArenaNodeId) {
        let mut text = String::new();
        for node in self.dom.descendants(id) {
            if let Some(t) = self.dom.text_content(node) {
                text.push_str(t);
            } else if self.dom.element_name(node).is_some_and(|n| n.as_ref() == "br") {
                text.push('\n');
            }
        }
        let text = text.strip_prefix('\n').unwrap_or(&text).trim_end();
        if text.is_empty() {
            return;
        }

        let fence = "`".repeat(calculate_fence_length(text, '`'));
        self.block_boundary();
        self.ensure_line_started();
        self.output.push_str(&fence);
        self.write_newline();
        for line in text.lines() {
            self.ensure_line_started();
            self.output.push_str(line);
            self.write_newline();
        }
        self.ensure_line_started();
        self.output.push_str(&fence);
        self.has_line_content = true;
        self.block_boundary();
    }

    fn walk_table(&mut self, table: ArenaNodeId) {
        let rows: Vec<_> = self
            .dom
            .descendants(table)
            .filter(|&n| self.dom.element_name(n).is_some_and(|name| name.as_ref() == "tr"))
            .collect();
        self.block_boundary();
        for row in rows {
            self.write_table_row(row);
        }
        self.block_boundary();
    }

    /// One line per row, cells joined with ` | `.
    fn write_table_row(&mut self, row: ArenaNodeId) {
        let cells: Vec<String> = self
            .dom
            .children(row)
            .filter(|&c| {
                self.dom
                    .element_name(c)
                    .is_some_and(|n| matches!(n.as_ref(), "td" | "th"))
            })
            .map(|c| escape_markdown(&strip_invisible(&self.dom.collect_text(c)), false))
            .collect();
        if cells.iter().all(|c| c.is_empty()) {
            return;
        }
        self.ensure_line_started();
        self.output.push_str(&cells.join(" | "));
        self.write_newline();
    }

    fn has_image(&self, id: ArenaNodeId) -> bool {
        self.dom.descendants(id).any(|n| {
            self.dom
                .element_name(n)
                .is_some_and(|name| matches!(name.as_ref(), "img" | "image"))
        })
    }
}

/// Soft hyphens and zero-width characters are layout hints in ebooks.
fn strip_invisible(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{00AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}'))
        .collect()
}

/// Render the subtree at `root` to Markdown.
pub fn render_html(dom: &ArenaDom, root: ArenaNodeId, options: RenderOptions) -> String {
    RenderContext::new(dom, options).render(root)
}
