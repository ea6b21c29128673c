//! HTML → Markdown rendering.
//!
//! - [`escape`]: context-aware escaping and fence/tick sizing
//! - [`role`]: which Markdown construct each HTML element becomes
//! - [`render`]: the DOM walk itself
//!
//! The renderer covers prose: headings, paragraphs, emphasis, links, images,
//! lists, quotes, code and simple tables (one line per row). Layout, styling
//! and footnote wiring are not reproduced.

mod escape;
mod render;
mod role;

pub use escape::{
    calculate_fence_length, calculate_inline_code_ticks, escape_markdown, format_destination,
};
pub use render::{RenderContext, RenderOptions, render_html};
pub use role::{Emphasis, Role, element_role};
