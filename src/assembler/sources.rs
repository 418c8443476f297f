//! `lcsrc.txt`: every kernel source file concatenated into one text file.
//!
//! Files are ordered by their `/`-separated path relative to the source
//! root. Each entry is:
//!
//! ```text
//! // <relative path>
//! <content, newline-terminated>
//! <blank line>
//! ```
//!
//! Identical trees render to identical bytes.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SOURCE_DUMP_FILENAME: &str = "lcsrc.txt";

/// Conditions that make a bootable ramdisk impossible.
#[derive(Debug, thiserror::Error)]
pub enum FatalPipelineError {
    #[error("kernel source directory '{}' does not exist", .0.display())]
    SourcesMissing(PathBuf),
    #[error("no files found under kernel source directory '{}'", .0.display())]
    SourcesEmpty(PathBuf),
}

/// Regular files under `root`, as (relative path, absolute path), sorted.
pub fn collect_sources(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    if !root.is_dir() {
        return Err(FatalPipelineError::SourcesMissing(root.to_path_buf()).into());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry =
            entry.with_context(|| format!("walking kernel sources under '{}'", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        files.push((rel, entry.into_path()));
    }

    if files.is_empty() {
        return Err(FatalPipelineError::SourcesEmpty(root.to_path_buf()).into());
    }

    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

/// Render the concatenated dump of every file under `root`.
pub fn render_source_dump(root: &Path) -> Result<Vec<u8>> {
    render(&collect_sources(root)?)
}

fn render(files: &[(String, PathBuf)]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for (rel, path) in files {
        let content =
            fs::read(path).with_context(|| format!("reading source '{}'", path.display()))?;
        out.extend_from_slice(format!("// {rel}\n").as_bytes());
        out.extend_from_slice(&content);
        if !content.ends_with(b"\n") {
            out.push(b'\n');
        }
        out.push(b'\n');
    }
    Ok(out)
}

/// Regenerate `dest` from `root`. Returns the number of files dumped.
pub fn write_source_dump(root: &Path, dest: &Path) -> Result<usize> {
    let files = collect_sources(root)?;
    let count = files.len();
    fs::write(dest, render(&files)?)
        .with_context(|| format!("writing source dump '{}'", dest.display()))?;
    log::info!(
        "Dumped {count} kernel source files into '{}'",
        dest.display()
    );
    Ok(count)
}
