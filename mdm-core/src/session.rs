//! Session state and recent project history
//!
//! Interactive state lives in an explicit [`SessionContext`] that is loaded
//! at the start of a command and saved at the end, instead of a process-wide
//! mutable store.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SESSION_FILE: &str = "session.json";
pub const RECENT_PROJECTS_FILE: &str = "recent_projects.json";

/// Number of entries kept in the recent project list.
pub const MAX_RECENT_PROJECTS: usize = 10;

/// Reading preferences applied to rendered pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub font_size: u32,
    pub line_height: f32,
    pub reading_width: u32,
    pub high_contrast: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            font_size: 16,
            line_height: 1.7,
            reading_width: 800,
            high_contrast: false,
        }
    }
}

/// Per-user interactive state carried between commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionContext {
    /// Folder currently being browsed
    pub last_folder_path: Option<PathBuf>,
    pub selected_file: Option<PathBuf>,
    pub project_root_folder: Option<PathBuf>,
    /// Prompt template key preselected for summaries
    pub summary_template: String,
    pub view: ViewSettings,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            last_folder_path: None,
            selected_file: None,
            project_root_folder: None,
            summary_template: "high_level".to_string(),
            view: ViewSettings::default(),
        }
    }
}

impl SessionContext {
    /// Load from `dir`, falling back to defaults when no session was saved.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SESSION_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))
    }

    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create sessions folder: {}", dir.display()))?;
        let path = dir.join(SESSION_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write session file: {}", path.display()))
    }
}

/// One entry in the recent project list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentProject {
    pub project_name: String,
    pub project_root: PathBuf,
    /// Local wall-clock time, written without an offset
    #[serde(deserialize_with = "local_timestamp")]
    pub last_accessed: NaiveDateTime,
    pub display_name: String,
}

/// Accept naive ISO timestamps as well as ones carrying an offset.
fn local_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse::<NaiveDateTime>()
        .or_else(|_| {
            DateTime::parse_from_rfc3339(&raw).map(|t| t.with_timezone(&Local).naive_local())
        })
        .map_err(serde::de::Error::custom)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecentProjectsFile {
    #[serde(default)]
    recent_projects: Vec<RecentProject>,
}

fn read_recent(path: &Path) -> Result<RecentProjectsFile> {
    if !path.exists() {
        return Ok(RecentProjectsFile::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project history: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse project history: {}", path.display()))
}

fn write_recent(path: &Path, file: &RecentProjectsFile) -> Result<()> {
    let content = serde_json::to_string_pretty(file)?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write project history: {}", path.display()))
}

/// Move `project_root` to the front of the recent project list.
///
/// Returns `false` without touching the history when the folder is missing.
pub fn record_recent_project(dir: &Path, project_root: &Path) -> Result<bool> {
    if !project_root.exists() {
        return Ok(false);
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create sessions folder: {}", dir.display()))?;
    let path = dir.join(RECENT_PROJECTS_FILE);
    let mut file = read_recent(&path)?;

    let project_name = project_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let entry = RecentProject {
        display_name: format!("{} ({})", project_name, project_root.display()),
        project_name,
        project_root: project_root.to_path_buf(),
        last_accessed: Local::now().naive_local(),
    };

    file.recent_projects.retain(|p| p.project_root != project_root);
    file.recent_projects.insert(0, entry);
    file.recent_projects.truncate(MAX_RECENT_PROJECTS);

    write_recent(&path, &file)?;
    Ok(true)
}

/// Recent projects whose folders still exist, most recent first.
///
/// Stale entries are pruned from the history file.
pub fn load_recent_projects(dir: &Path) -> Result<Vec<RecentProject>> {
    let path = dir.join(RECENT_PROJECTS_FILE);
    let mut file = read_recent(&path)?;

    let before = file.recent_projects.len();
    file.recent_projects.retain(|p| p.project_root.exists());
    if file.recent_projects.len() != before {
        log::info!(
            "dropping {} missing projects from history",
            before - file.recent_projects.len()
        );
        write_recent(&path, &file)?;
    }

    Ok(file.recent_projects)
}
