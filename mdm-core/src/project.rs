//! Per-project files: sync configuration and saved summaries

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::doc::strip_markdown_extension;

/// Location of the sync config below a project root
pub const SYNC_CONFIG_DIR: [&str; 3] = [".fyiai", "cloud", "sync"];
pub const SYNC_CONFIG_FILE: &str = "config.json";
pub const SUMMARY_DIR: &str = "ai-summary";

static UNSAFE_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9_-]").expect("valid regex"));

/// What to sync and where
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSyncConfig {
    #[serde(default)]
    pub project_root_folder: String,
    #[serde(default)]
    pub project_doc_folder: String,
    #[serde(default)]
    pub azure_connection_string: String,
}

impl ProjectSyncConfig {
    pub fn config_path(project_root: &Path) -> PathBuf {
        let mut path = project_root.to_path_buf();
        path.extend(SYNC_CONFIG_DIR);
        path.join(SYNC_CONFIG_FILE)
    }

    /// Write the config under `project_root_folder`, which must be a directory.
    pub fn save(&self) -> Result<PathBuf> {
        let root = Path::new(&self.project_root_folder);
        if self.project_root_folder.is_empty() || !root.is_dir() {
            bail!("Project Root Folder is not a valid directory.");
        }

        let path = Self::config_path(root);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config folder: {}", dir.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write sync config: {}", path.display()))?;

        log::info!("sync configuration saved to {}", path.display());
        Ok(path)
    }

    /// Read the config stored below `project_root`; `None` when absent.
    pub fn load(project_root: &Path) -> Result<Option<Self>> {
        let path = Self::config_path(project_root);
        if !path.exists() {
            log::warn!("no sync config at {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read sync config: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse sync config: {}", path.display()))?;
        Ok(Some(config))
    }

    pub fn is_complete(&self) -> bool {
        !self.project_root_folder.trim().is_empty()
            && !self.project_doc_folder.trim().is_empty()
            && !self.azure_connection_string.trim().is_empty()
    }
}

/// Folder name for a template: spaces to `-`, lowercase, then anything
/// outside `[a-z0-9_-]` dropped.
pub fn template_slug(template_name: &str) -> String {
    let lowered = template_name.replace(' ', "-").to_lowercase();
    UNSAFE_SLUG.replace_all(&lowered, "").into_owned()
}

/// Summary body with its metadata header
pub fn summary_document(
    summary: &str,
    source_name: &str,
    template_name: &str,
    generated: DateTime<Local>,
) -> String {
    format!(
        "# AI Summary: {source}\n\n\
         **Template**: {template}  \n\
         **Generated**: {generated}  \n\
         **Source**: {source}  \n\n\
         ---\n\n\
         {summary}",
        source = source_name,
        template = template_name,
        generated = generated.format("%Y-%m-%d %H:%M:%S"),
        summary = summary,
    )
}

/// Save to `<folder>/ai-summary/<template-slug>/<base>_summary.md`.
pub fn save_summary(
    folder: &Path,
    source_name: &str,
    template_name: &str,
    summary: &str,
) -> Result<PathBuf> {
    if !folder.is_dir() {
        bail!("Invalid project folder path: {}", folder.display());
    }

    let target_dir = folder.join(SUMMARY_DIR).join(template_slug(template_name));
    fs::create_dir_all(&target_dir)
        .with_context(|| format!("Failed to create summary folder: {}", target_dir.display()))?;

    let path = target_dir.join(format!("{}_summary.md", strip_markdown_extension(source_name)));
    let content = summary_document(summary, source_name, template_name, Local::now());
    fs::write(&path, content)
        .with_context(|| format!("Failed to save summary: {}", path.display()))?;

    log::info!("summary saved to {}", path.display());
    Ok(path)
}
