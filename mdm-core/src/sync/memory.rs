//! In-process blob store for exercising push and pull without an account

use std::cell::RefCell;
use std::collections::BTreeMap;

use super::BlobStore;
use crate::error::SyncError;

type Container = BTreeMap<String, Vec<u8>>;

/// Containers held in memory; listing is in key order
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    containers: RefCell<BTreeMap<String, Container>>,
}

impl MemoryBlobStore {
    pub fn get(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.containers.borrow().get(container)?.get(key).cloned()
    }

    fn missing(container: &str) -> SyncError {
        SyncError::Service {
            status: 404,
            message: format!("ContainerNotFound: {}", container),
        }
    }
}

impl BlobStore for MemoryBlobStore {
    fn create_container(&self, container: &str) -> Result<(), SyncError> {
        let mut containers = self.containers.borrow_mut();
        if containers.contains_key(container) {
            return Err(SyncError::ContainerAlreadyExists(container.to_string()));
        }
        containers.insert(container.to_string(), Container::new());
        Ok(())
    }

    fn container_exists(&self, container: &str) -> Result<bool, SyncError> {
        Ok(self.containers.borrow().contains_key(container))
    }

    fn list_blobs(&self, container: &str) -> Result<Vec<String>, SyncError> {
        self.containers
            .borrow()
            .get(container)
            .map(|c| c.keys().cloned().collect())
            .ok_or_else(|| Self::missing(container))
    }

    fn upload_blob(&self, container: &str, key: &str, data: &[u8]) -> Result<(), SyncError> {
        self.containers
            .borrow_mut()
            .get_mut(container)
            .ok_or_else(|| Self::missing(container))?
            .insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn download_blob(&self, container: &str, key: &str) -> Result<Vec<u8>, SyncError> {
        self.get(container, key).ok_or_else(|| SyncError::Service {
            status: 404,
            message: format!("BlobNotFound: {}/{}", container, key),
        })
    }
}
