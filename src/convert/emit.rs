//! Final Markdown serialization and output naming.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

use super::assemble::AssembledDocument;

/// Characters removed from titles used as file and directory names.
const FORBIDDEN: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Turn a book title into a file system name.
///
/// Forbidden characters are dropped, not replaced. When nothing usable is
/// left, `fallback` (the input file stem) gets the same treatment, and after
/// that the name is `untitled`.
pub fn sanitize_title(title: &str, fallback: &str) -> String {
    [title, fallback]
        .into_iter()
        .map(strip_forbidden)
        .find(|name| !name.is_empty() && name != "." && name != "..")
        .unwrap_or_else(|| "untitled".to_string())
}

fn strip_forbidden(name: &str) -> String {
    name.chars()
        .filter(|c| !FORBIDDEN.contains(c) && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

/// The complete Markdown text: `# <title>`, then every block.
pub fn render_document(title: &str, body: &AssembledDocument) -> String {
    let mut doc = AssembledDocument::new();
    doc.push_heading(1, title);
    for block in body.blocks() {
        doc.push_block(block.as_str());
    }
    doc.join()
}

/// Write `contents` to `path` through a temp file in the same directory, so
/// readers never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(|e| Error::write(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::write(dir, e))?;
    tmp.write_all(contents).map_err(|e| Error::write(path, e))?;
    #[cfg(unix)]
    tmp.as_file()
        .set_permissions(output_permissions(path))
        .map_err(|e| Error::write(path, e))?;
    tmp.persist(path).map_err(|e| Error::write(path, e.error))?;
    Ok(())
}

/// Temp files are created owner-only. Outputs get `0644`, or keep the mode
/// of the file they replace.
#[cfg(unix)]
fn output_permissions(path: &Path) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.permissions())
        .unwrap_or_else(|_| fs::Permissions::from_mode(0o644))
}
