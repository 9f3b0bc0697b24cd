//! Document model
//!
//! A document is re-read from disk whenever it is viewed; nothing is cached
//! between commands.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::toc::{self, Heading};

/// The main document structure
#[derive(Clone, Debug)]
pub struct Document {
    pub path: PathBuf,
    pub content: String,
    pub headings: Vec<Heading>,
    pub loaded_mtime: Option<SystemTime>,
    pub rev: u64,
}

fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok().and_then(|m| m.modified().ok())
}

impl Document {
    /// Load a document from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let abs_path = path
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize path: {}", path.display()))?;

        let content = fs::read_to_string(&abs_path)
            .with_context(|| format!("Failed to read file: {}", abs_path.display()))?;
        let headings = toc::extract_headings(&content);

        Ok(Self {
            loaded_mtime: mtime(&abs_path),
            path: abs_path,
            content,
            headings,
            rev: 1,
        })
    }

    /// Load, refusing files larger than `max_bytes`
    pub fn load_limited(path: &Path, max_bytes: u64) -> Result<Self> {
        let size = fs::metadata(path)
            .with_context(|| format!("Failed to stat file: {}", path.display()))?
            .len();
        if size > max_bytes {
            bail!(
                "File {} is too large ({} bytes, limit {} bytes)",
                path.display(),
                size,
                max_bytes
            );
        }
        Self::load(path)
    }

    /// Reload the document from disk
    pub fn reload(&mut self) -> Result<()> {
        self.content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to reload file: {}", self.path.display()))?;
        self.headings = toc::extract_headings(&self.content);
        self.loaded_mtime = mtime(&self.path);
        self.rev += 1;
        Ok(())
    }

    /// Replace the content and write it back to disk
    pub fn save(&mut self, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        fs::write(&self.path, &content)
            .with_context(|| format!("Failed to save file: {}", self.path.display()))?;
        log::info!("saved {} ({} bytes)", self.path.display(), content.len());

        self.content = content;
        self.headings = toc::extract_headings(&self.content);
        self.loaded_mtime = mtime(&self.path);
        self.rev += 1;
        Ok(())
    }

    /// True when the file changed on disk since it was loaded
    pub fn is_stale(&self) -> bool {
        mtime(&self.path) != self.loaded_mtime
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }

    /// File name, e.g. `notes.md`
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without a `.md` or `.markdown` extension
    pub fn base_name(&self) -> String {
        strip_markdown_extension(&self.file_name()).to_string()
    }

    pub fn folder(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Drop a trailing `.md` or `.markdown`, case-insensitively.
pub fn strip_markdown_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    for ext in [".markdown", ".md"] {
        if lower.ends_with(ext) {
            return &name[..name.len() - ext.len()];
        }
    }
    name
}
