//! Markdown escaping utilities.
//!
//! Escaping is deliberately narrow: only characters that would change the
//! meaning of prose are escaped, so ordinary text such as `snake_case` or
//! `a < b` survives unchanged.

/// Escape Markdown syntax in a run of collapsed text.
///
/// `line_start` says whether the text begins a fresh output line, in which
/// case block markers (`#`, `>`, `- `, `+ `, `1. `) are neutralized too.
/// Inline, the following are escaped wherever they occur: `\`, `` ` ``, `*`,
/// `[` and `]`. `_` is escaped only when it is not inside a word, and `<` only
/// when it could open an HTML tag.
///
/// # Examples
///
/// ```
/// use epub2md::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*", false), "\\*bold\\*");
/// assert_eq!(escape_markdown("# not a heading", true), "\\# not a heading");
/// assert_eq!(escape_markdown("snake_case", false), "snake_case");
/// ```
pub fn escape_markdown(text: &str, line_start: bool) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    let chars: Vec<char> = text.chars().collect();

    let marker_end = if line_start { block_marker_end(&chars) } else { None };

    for (i, &c) in chars.iter().enumerate() {
        if marker_end == Some(i) {
            result.push('\\');
        }
        match c {
            '\\' | '`' | '*' | '[' | ']' => {
                result.push('\\');
                result.push(c);
            }
            '_' => {
                let inside_word = i > 0
                    && chars[i - 1].is_alphanumeric()
                    && chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
                if !inside_word {
                    result.push('\\');
                }
                result.push(c);
            }
            '<' if chars
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_alphabetic() || matches!(n, '/' | '!' | '?')) =>
            {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }

    result
}

/// Index of the character that makes the start of `chars` read as a block
/// marker, and so must be escaped.
fn block_marker_end(chars: &[char]) -> Option<usize> {
    match chars.first()? {
        '#' | '>' => Some(0),
        '-' | '+' if chars.get(1).is_none_or(|c| c.is_whitespace()) => Some(0),
        '=' if chars.iter().all(|&c| c == '=') => Some(0),
        c if c.is_ascii_digit() => {
            let digits = chars.iter().take_while(|c| c.is_ascii_digit()).count();
            let after = chars.get(digits)?;
            let follows_space = chars.get(digits + 1).is_none_or(|c| c.is_whitespace());
            (matches!(after, '.' | ')') && follows_space && digits <= 9).then_some(digits)
        }
        _ => None,
    }
}

/// Format a link or image destination.
///
/// Destinations containing spaces or parentheses are wrapped in `<...>` so
/// that extracted image names like `my pic (1).png` still link correctly.
pub fn format_destination(url: &str) -> String {
    if url.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", url.replace('<', "%3C").replace('>', "%3E"))
    } else {
        url.to_string()
    }
}

/// Calculate the minimum fence length needed for a code block.
///
/// Returns the smallest number of fence characters (at least 3) that
/// doesn't appear as a run in the content.
///
/// ```
/// use epub2md::markdown::calculate_fence_length;
///
/// assert_eq!(calculate_fence_length("let x = 1;", '`'), 3);
/// assert_eq!(calculate_fence_length("```rust\ncode\n```", '`'), 4);
/// ```
pub fn calculate_fence_length(content: &str, fence_char: char) -> usize {
    longest_run(content, fence_char).max(2) + 1
}

/// Calculate the minimum backtick count needed for inline code.
pub fn calculate_inline_code_ticks(content: &str) -> usize {
    longest_run(content, '`') + 1
}

fn longest_run(content: &str, target: char) -> usize {
    let mut max_run = 0;
    let mut current_run = 0;

    for c in content.chars() {
        if c == target {
            current_run += 1;
            max_run = max_run.max(current_run);
        } else {
            current_run = 0;
        }
    }

    max_run
}
