//! Markdown file discovery, folder trees and link resolution

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Extensions link targets must carry
pub const MARKDOWN_EXTENSIONS: [&str; 2] = [".md", ".markdown"];

/// True when the path's extension is one of `extensions`.
///
/// Entries may be written with or without the leading dot; case is ignored.
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|m| m.as_ref().trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// True for `.md` / `.markdown`, any case
pub fn is_markdown(path: &Path) -> bool {
    has_extension(path, &MARKDOWN_EXTENSIONS)
}

/// Relative path with `/` separators regardless of platform
pub fn to_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every file below `dir` with one of `extensions`, as sorted
/// `(relative, full)` pairs.
///
/// A missing directory yields an empty list. Unreadable entries are skipped.
pub fn find_markdown_files<S: AsRef<str>>(
    dir: &Path,
    extensions: &[S],
) -> Vec<(String, PathBuf)> {
    if !dir.exists() {
        return Vec::new();
    }

    let mut files: Vec<(String, PathBuf)> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), extensions))
        .filter_map(|e| {
            let rel = e.path().strip_prefix(dir).ok()?;
            Some((to_key(rel), e.path().to_path_buf()))
        })
        .collect();

    files.sort();
    log::debug!("found {} markdown files under {}", files.len(), dir.display());
    files
}

/// Markdown files nested by folder
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FileTree {
    pub dirs: BTreeMap<String, FileTree>,
    /// `(file name, full path)`
    pub files: Vec<(String, PathBuf)>,
}

impl FileTree {
    pub fn build(files: &[(String, PathBuf)]) -> Self {
        let mut root = FileTree::default();
        for (rel, full) in files {
            let mut parts: Vec<&str> = rel.split('/').collect();
            let Some(name) = parts.pop() else { continue };

            let mut node = &mut root;
            for part in parts {
                node = node.dirs.entry(part.to_string()).or_default();
            }
            node.files.push((name.to_string(), full.clone()));
        }
        root
    }

    pub fn file_count(&self) -> usize {
        self.files.len() + self.dirs.values().map(FileTree::file_count).sum::<usize>()
    }

    /// Indented listing: folders first, then files, each sorted ignoring case.
    /// The selected file is marked with `>`.
    pub fn render(&self, selected: Option<&Path>) -> String {
        let mut out = String::new();
        self.render_into(&mut out, selected, 0);
        out
    }

    fn render_into(&self, out: &mut String, selected: Option<&Path>, depth: usize) {
        let indent = "  ".repeat(depth);

        let mut dirs: Vec<(&String, &FileTree)> = self.dirs.iter().collect();
        dirs.sort_by_key(|(name, _)| name.to_lowercase());
        for (name, child) in dirs {
            out.push_str(&format!("{}  {}/\n", indent, name));
            child.render_into(out, selected, depth + 1);
        }

        let mut files: Vec<&(String, PathBuf)> = self.files.iter().collect();
        files.sort_by_key(|(name, _)| name.to_lowercase());
        for (name, full) in files {
            let marker = if selected == Some(full.as_path()) { '>' } else { ' ' };
            out.push_str(&format!("{}{} {}\n", indent, marker, name));
        }
    }
}

/// Resolve `..` and `.` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve a link found in `current_file` to an existing markdown file.
///
/// Relative hrefs are taken from the file's folder. A `#fragment` suffix is
/// ignored. Returns `None` for anything that is not an existing markdown file.
pub fn resolve_markdown_link(current_file: &Path, href: &str) -> Option<PathBuf> {
    let href = href.split('#').next().unwrap_or_default();
    if href.is_empty() {
        return None;
    }

    let href_path = Path::new(href);
    let target = if href_path.has_root() {
        href_path.to_path_buf()
    } else {
        current_file
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(href_path)
    };
    let target = normalize(&target);

    (target.exists() && is_markdown(&target)).then_some(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> Result<TempDir> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("guide/deep"))?;
        fs::create_dir_all(dir.path().join("Assets"))?;
        fs::write(dir.path().join("README.md"), "# Readme")?;
        fs::write(dir.path().join("notes.MARKDOWN"), "notes")?;
        fs::write(dir.path().join("todo.txt"), "skip")?;
        fs::write(dir.path().join("guide/intro.md"), "[next](deep/more.md)")?;
        fs::write(dir.path().join("guide/deep/more.md"), "[back](../intro.md)")?;
        fs::write(dir.path().join("Assets/logo.md"), "")?;
        Ok(dir)
    }

    #[test]
    fn finds_markdown_recursively_and_sorted() -> Result<()> {
        let dir = fixture()?;
        let rels: Vec<String> = find_markdown_files(dir.path(), &MARKDOWN_EXTENSIONS)
            .into_iter()
            .map(|(rel, _)| rel)
            .collect();
        assert_eq!(
            rels,
            vec![
                "Assets/logo.md",
                "README.md",
                "guide/deep/more.md",
                "guide/intro.md",
                "notes.MARKDOWN",
            ]
        );
        Ok(())
    }

    #[test]
    fn missing_dir_is_empty() {
        assert!(find_markdown_files(Path::new("/no/such/dir"), &MARKDOWN_EXTENSIONS).is_empty());
    }

    #[test]
    fn tree_lists_dirs_first_ignoring_case() -> Result<()> {
        let dir = fixture()?;
        let files = find_markdown_files(dir.path(), &MARKDOWN_EXTENSIONS);
        let tree = FileTree::build(&files);
        assert_eq!(tree.file_count(), 5);

        let selected = dir.path().join("guide/intro.md");
        let rendered = tree.render(Some(&selected));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(
            lines,
            vec![
                "  Assets/",
                "    logo.md",
                "  guide/",
                "    deep/",
                "      more.md",
                "  > intro.md",
                "  notes.MARKDOWN",
                "  README.md",
            ]
        );
        Ok(())
    }

    #[test]
    fn normalizes_lexically() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d.md")), PathBuf::from("/a/c/d.md"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/../x")), PathBuf::from("/x"));
    }

    #[test]
    fn resolves_relative_links() -> Result<()> {
        let dir = fixture()?;
        let intro = dir.path().join("guide/intro.md");
        let more = dir.path().join("guide/deep/more.md");

        assert_eq!(resolve_markdown_link(&intro, "deep/more.md"), Some(more.clone()));
        assert_eq!(resolve_markdown_link(&more, "../intro.md#top"), Some(intro.clone()));
        assert_eq!(resolve_markdown_link(&intro, "../todo.txt"), None);
        assert_eq!(resolve_markdown_link(&intro, "missing.md"), None);
        assert_eq!(resolve_markdown_link(&intro, "#section"), None);
        Ok(())
    }

    #[test]
    fn resolves_absolute_links() -> Result<()> {
        let dir = fixture()?;
        let readme = dir.path().join("README.md");
        let href = readme.to_string_lossy().into_owned();
        assert_eq!(
            resolve_markdown_link(Path::new("/elsewhere/x.md"), &href),
            Some(readme)
        );
        Ok(())
    }

    #[test]
    fn configured_extensions_widen_discovery() -> Result<()> {
        let dir = fixture()?;
        let extensions = vec![".txt".to_string(), "MD".to_string()];
        let rels: Vec<String> = find_markdown_files(dir.path(), &extensions)
            .into_iter()
            .map(|(rel, _)| rel)
            .collect();
        assert_eq!(
            rels,
            vec![
                "Assets/logo.md",
                "README.md",
                "guide/deep/more.md",
                "guide/intro.md",
                "todo.txt",
            ]
        );
        Ok(())
    }

    #[test]
    fn extension_match_needs_an_extension() {
        assert!(!has_extension(Path::new("Makefile"), &MARKDOWN_EXTENSIONS));
        assert!(has_extension(Path::new("a.Markdown"), &MARKDOWN_EXTENSIONS));
    }
}
