//! Splitting one Markdown file into numbered files at a heading level.
//!
//! ```no_run
//! use epub2md::split::{SplitOptions, split_file};
//!
//! let options = SplitOptions::new().with_level(2).with_relevel(true);
//! let report = split_file("Book.md", &options)?;
//! println!("{} files in {}", report.files.len(), report.output_dir.display());
//! # Ok::<(), epub2md::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::convert::write_atomic;
use crate::error::{Error, Result};

/// Any ATX heading line.
static HEADING_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#+)[ \t](.*)$").unwrap());

/// Characters that may not appear in a split file name.
static NOT_NAME_CHAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());

/// Runs of separators collapsed to `_` in file names.
static SEPARATOR_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Splitter settings.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Heading level to split at (2 splits at `## `).
    pub level: usize,
    /// Shift headings so each file's top heading becomes level 1.
    pub relevel: bool,
    /// Drop each file's top heading and shift the rest up by `level`.
    pub strip_top_heading: bool,
    /// Directory the `<stem>_split_level_<N>` folder is created in.
    pub output_parent: PathBuf,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            level: 2,
            relevel: false,
            strip_top_heading: false,
            output_parent: PathBuf::from("."),
        }
    }
}

impl SplitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: usize) -> Self {
        self.level = level;
        self
    }

    pub fn with_relevel(mut self, relevel: bool) -> Self {
        self.relevel = relevel;
        self
    }

    pub fn with_strip_top_heading(mut self, strip: bool) -> Self {
        self.strip_top_heading = strip;
        self
    }

    pub fn with_output_parent(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_parent = dir.into();
        self
    }
}

/// A Markdown document cut at one heading level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownSplit<'a> {
    /// Everything before the first split heading (may be blank).
    pub introduction: &'a str,
    /// One entry per split heading, each starting with that heading line.
    pub sections: Vec<&'a str>,
}

/// Cut `content` before every line that starts with exactly `level` `#`
/// characters followed by a space.
pub fn split_markdown(content: &str, level: usize) -> MarkdownSplit<'_> {
    let marker = format!("{} ", "#".repeat(level));
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if line.starts_with(&marker) {
            starts.push(offset);
        }
        offset += line.len();
    }

    let introduction = &content[..starts.first().copied().unwrap_or(content.len())];
    let sections = starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(content.len());
            &content[start..end]
        })
        .collect();

    MarkdownSplit {
        introduction,
        sections,
    }
}

/// Make a heading usable as a file name: keep word characters, whitespace
/// and `-`, then turn separator runs into `_`.
pub fn sanitize_filename(name: &str) -> String {
    let kept = NOT_NAME_CHAR_RE.replace_all(name.trim(), "");
    let joined = SEPARATOR_RUN_RE.replace_all(&kept, "_");
    if joined.is_empty() {
        "untitled".to_string()
    } else {
        joined.into_owned()
    }
}

/// Apply the relevel / strip options to one section.
pub fn process_chunk_headings(
    chunk: &str,
    level: usize,
    relevel: bool,
    strip_top_heading: bool,
) -> String {
    let chunk = chunk.trim();
    if !relevel && !strip_top_heading {
        return chunk.to_string();
    }

    let (content, shift) = if strip_top_heading {
        let rest = chunk.split_once('\n').map_or("", |(_, rest)| rest);
        (rest, level)
    } else {
        (chunk, level.saturating_sub(1))
    };

    if shift == 0 {
        return content.to_string();
    }

    HEADING_LINE_RE
        .replace_all(content, |caps: &Captures| {
            let current = caps[1].len();
            let new_level = current.saturating_sub(shift).max(1);
            format!("{} {}", "#".repeat(new_level), &caps[2])
        })
        .into_owned()
}

/// A file the splitter will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitFile {
    pub name: String,
    pub content: String,
}

/// Compute the output files for `content` without touching the disk.
pub fn plan_split(content: &str, options: &SplitOptions) -> Vec<SplitFile> {
    let split = split_markdown(content, options.level);
    let marker = format!("{} ", "#".repeat(options.level));
    let mut files = Vec::with_capacity(split.sections.len() + 1);

    let intro = split.introduction.trim();
    if !intro.is_empty() {
        files.push(SplitFile {
            name: numbered_name(files.len(), "introduction"),
            content: intro.to_string(),
        });
    }

    for section in split.sections {
        let first_line = section.lines().next().unwrap_or("");
        let title = first_line.strip_prefix(&marker).unwrap_or(first_line).trim();
        files.push(SplitFile {
            name: numbered_name(files.len(), &sanitize_filename(title)),
            content: process_chunk_headings(
                section,
                options.level,
                options.relevel,
                options.strip_top_heading,
            ),
        });
    }

    files
}

fn numbered_name(counter: usize, stem: &str) -> String {
    format!("{counter:02}_{stem}.md")
}

/// Result of splitting a file on disk.
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub output_dir: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Split the Markdown file at `path` into `<stem>_split_level_<N>/`.
pub fn split_file<P: AsRef<Path>>(path: P, options: &SplitOptions) -> Result<SplitReport> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let content = String::from_utf8(fs::read(path)?)?;

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output_dir = options
        .output_parent
        .join(format!("{stem}_split_level_{}", options.level));
    fs::create_dir_all(&output_dir).map_err(|e| Error::write(&output_dir, e))?;
    info!(dir = %output_dir.display(), "Writing split files");

    let mut files = Vec::new();
    for file in plan_split(&content, options) {
        let dest = output_dir.join(&file.name);
        write_atomic(&dest, file.content.as_bytes())?;
        debug!(path = %dest.display(), "Created");
        files.push(dest);
    }

    Ok(SplitReport { output_dir, files })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const BOOK: &str = "# Foo\n\nPreface text.\n\n## One\n\nBody one.\n\n### Scene\n\nMore.\n\n## Two: The End\n\nBody two.\n";

    #[test]
    fn test_split_markdown_exact_level() {
        let split = split_markdown(BOOK, 2);
        assert_eq!(split.introduction, "# Foo\n\nPreface text.\n\n");
        assert_eq!(split.sections.len(), 2);
        assert!(split.sections[0].starts_with("## One\n"));
        assert!(split.sections[0].contains("### Scene"));
        assert!(split.sections[1].starts_with("## Two: The End"));
    }

    #[test]
    fn test_split_without_headings() {
        let split = split_markdown("just text\n", 2);
        assert_eq!(split.introduction, "just text\n");
        assert!(split.sections.is_empty());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("  Two: The End "), "Two_The_End");
        assert_eq!(sanitize_filename("a - b"), "a_b");
        assert_eq!(sanitize_filename("Café au lait"), "Café_au_lait");
        assert_eq!(sanitize_filename("?!"), "untitled");
    }

    #[test]
    fn test_process_chunk_headings_modes() {
        let chunk = "## One\n\nText\n\n### Scene\n";
        assert_eq!(process_chunk_headings(chunk, 2, false, false), "## One\n\nText\n\n### Scene");
        assert_eq!(process_chunk_headings(chunk, 2, true, false), "# One\n\nText\n\n## Scene");
        assert_eq!(process_chunk_headings(chunk, 2, false, true), "\nText\n\n# Scene");
        // Strip wins over relevel when both are set
        assert_eq!(process_chunk_headings(chunk, 2, true, true), "\nText\n\n# Scene");
    }

    #[test]
    fn test_process_chunk_headings_clamps_and_no_shift() {
        assert_eq!(process_chunk_headings("### A\n## B", 3, true, false), "# A\n# B");
        assert_eq!(process_chunk_headings("# A\n## B", 1, true, false), "# A\n## B");
    }

    #[test]
    fn test_plan_split_names() {
        let files = plan_split(BOOK, &SplitOptions::new());
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["00_introduction.md", "01_One.md", "02_Two_The_End.md"]);
        assert_eq!(files[2].content, "## Two: The End\n\nBody two.");
    }

    #[test]
    fn test_plan_split_without_introduction() {
        let files = plan_split("## A\nx\n## B\ny", &SplitOptions::new());
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["00_A.md", "01_B.md"]);
    }

    #[test]
    fn test_split_file_writes_directory() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("Book.md");
        fs::write(&input, BOOK).unwrap();
        let options = SplitOptions::new()
            .with_relevel(true)
            .with_output_parent(dir.path());

        let report = split_file(&input, &options).unwrap();

        assert_eq!(report.output_dir, dir.path().join("Book_split_level_2"));
        assert_eq!(report.files.len(), 3);
        let one = fs::read_to_string(report.output_dir.join("01_One.md")).unwrap();
        assert_eq!(one, "# One\n\nBody one.\n\n## Scene\n\nMore.");
    }

    #[test]
    fn test_split_file_missing_input() {
        let err = split_file("/no/such/file.md", &SplitOptions::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
