//! Cloud sync of a project's document folder
//!
//! A project maps to one blob container named `fyiai-<project>`. Push uploads
//! every file under the doc folder keyed by its `/`-separated relative path;
//! pull writes every blob in the container back under the doc folder. Both
//! stop at the first error with no rollback.

pub mod azure;
pub mod memory;

use serde::Serialize;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::browse::to_key;
use crate::error::SyncError;
use crate::project::ProjectSyncConfig;

pub use azure::{AzureBlobStore, ConnectionString};
pub use memory::MemoryBlobStore;

pub const CONTAINER_PREFIX: &str = "fyiai-";

/// Container-level blob operations
pub trait BlobStore {
    /// Fails with [`SyncError::ContainerAlreadyExists`] if it is already there.
    fn create_container(&self, container: &str) -> Result<(), SyncError>;
    fn container_exists(&self, container: &str) -> Result<bool, SyncError>;
    fn list_blobs(&self, container: &str) -> Result<Vec<String>, SyncError>;
    /// Overwrites any existing blob
    fn upload_blob(&self, container: &str, key: &str, data: &[u8]) -> Result<(), SyncError>;
    fn download_blob(&self, container: &str, key: &str) -> Result<Vec<u8>, SyncError>;
}

/// Which direction a sync ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Push,
    Pull,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub direction: Direction,
    pub container: String,
    pub created_container: bool,
    /// Keys transferred, in transfer order
    pub keys: Vec<String>,
}

impl SyncReport {
    pub fn files(&self) -> usize {
        self.keys.len()
    }
}

/// `fyiai-` plus the project folder's name, lowercased, spaces as `-`.
pub fn container_name(project_root: &Path) -> String {
    let base = project_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{}{}", CONTAINER_PREFIX, base.to_lowercase().replace(' ', "-"))
}

/// Local path for a blob key, or an error if the key would leave `doc_folder`.
pub fn local_path_for_key(doc_folder: &Path, key: &str) -> Result<PathBuf, SyncError> {
    let rel = Path::new(key);
    let safe = !key.is_empty()
        && !key.starts_with('/')
        && rel
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !safe {
        return Err(SyncError::UnsafeBlobKey(key.to_string()));
    }

    let mut path = doc_folder.to_path_buf();
    path.extend(key.split('/').filter(|s| !s.is_empty() && *s != "."));
    Ok(path)
}

/// Validated push/pull inputs
#[derive(Debug, Clone, Copy)]
pub struct SyncTarget<'a> {
    pub project_root: &'a Path,
    pub doc_folder: &'a Path,
}

impl<'a> SyncTarget<'a> {
    /// Rejects a config with any blank field before a client is built.
    pub fn from_config(config: &'a ProjectSyncConfig) -> Result<Self, SyncError> {
        if !config.is_complete() {
            return Err(SyncError::MissingConfiguration);
        }
        Ok(Self {
            project_root: Path::new(&config.project_root_folder),
            doc_folder: Path::new(&config.project_doc_folder),
        })
    }

    pub fn container(&self) -> String {
        container_name(self.project_root)
    }
}

/// Upload every file under the doc folder.
pub fn push(store: &dyn BlobStore, target: SyncTarget<'_>) -> Result<SyncReport, SyncError> {
    let container = target.container();

    let created_container = match store.create_container(&container) {
        Ok(()) => {
            log::info!("container '{}' created", container);
            true
        }
        Err(SyncError::ContainerAlreadyExists(_)) => {
            log::info!("container '{}' already exists", container);
            false
        }
        Err(e) => return Err(e),
    };

    let doc_folder = target.doc_folder;
    if !doc_folder.is_dir() {
        return Err(SyncError::io(
            doc_folder,
            std::io::Error::new(std::io::ErrorKind::NotFound, "document folder not found"),
        ));
    }

    let mut keys = Vec::new();
    for entry in WalkDir::new(doc_folder).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(doc_folder).to_path_buf();
            SyncError::io(path, e.into())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(doc_folder)
            .map_err(|_| SyncError::UnsafeBlobKey(entry.path().display().to_string()))?;
        let key = to_key(rel);
        let data = fs::read(entry.path()).map_err(|e| SyncError::io(entry.path(), e))?;

        log::debug!("uploading {} ({} bytes)", key, data.len());
        store.upload_blob(&container, &key, &data)?;
        keys.push(key);
    }

    log::info!("push complete: {} files uploaded to '{}'", keys.len(), container);
    Ok(SyncReport {
        direction: Direction::Push,
        container,
        created_container,
        keys,
    })
}

/// Download every blob in the project's container into the doc folder.
pub fn pull(store: &dyn BlobStore, target: SyncTarget<'_>) -> Result<SyncReport, SyncError> {
    let container = target.container();
    if !store.container_exists(&container)? {
        return Err(SyncError::ContainerNotFound(container));
    }

    let mut keys = Vec::new();
    for key in store.list_blobs(&container)? {
        let local = local_path_for_key(target.doc_folder, &key)?;
        if let Some(parent) = local.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
        }

        let data = store.download_blob(&container, &key)?;
        log::debug!("downloaded {} ({} bytes)", key, data.len());
        fs::write(&local, &data).map_err(|e| SyncError::io(&local, e))?;
        keys.push(key);
    }

    log::info!("pull complete: {} files downloaded from '{}'", keys.len(), container);
    Ok(SyncReport {
        direction: Direction::Pull,
        container,
        created_container: false,
        keys,
    })
}

/// Push using the project's saved connection string.
pub fn push_project(config: &ProjectSyncConfig) -> Result<SyncReport, SyncError> {
    let target = SyncTarget::from_config(config)?;
    let store = AzureBlobStore::from_connection_string(&config.azure_connection_string)?;
    push(&store, target)
}

/// Pull using the project's saved connection string.
pub fn pull_project(config: &ProjectSyncConfig) -> Result<SyncReport, SyncError> {
    let target = SyncTarget::from_config(config)?;
    let store = AzureBlobStore::from_connection_string(&config.azure_connection_string)?;
    pull(&store, target)
}
