use tracing::{info, warn};

use crate::config::{StorageBackendKind, StorageConfig};
use crate::error::{MedlensError, Result};

use super::cloudinary::CloudinaryClient;
use super::local::LocalStore;

#[derive(Clone)]
enum StorageBackend {
    Local(LocalStore),
    Cloudinary(CloudinaryClient),
    Unavailable { reason: String },
}

/// Object store for uploaded images.
#[derive(Clone)]
pub struct StorageProvider {
    backend: StorageBackend,
    kind: StorageBackendKind,
}

impl StorageProvider {
    pub fn new(config: &StorageConfig) -> Self {
        let backend = match config.backend {
            StorageBackendKind::Local => {
                info!(dir = %config.local_dir, "Local storage backend initialized");
                StorageBackend::Local(LocalStore::new(config))
            }
            StorageBackendKind::Cloudinary => match CloudinaryClient::new(config) {
                Ok(client) => {
                    info!("Cloudinary storage backend initialized");
                    StorageBackend::Cloudinary(client)
                }
                Err(e) => {
                    let reason = format!("Cloudinary backend unavailable: {e}");
                    warn!("{}", reason);
                    StorageBackend::Unavailable { reason }
                }
            },
        };

        Self {
            backend,
            kind: config.backend,
        }
    }

    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: StorageBackend::Unavailable {
                reason: reason.to_string(),
            },
            kind: StorageBackendKind::Local,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, StorageBackend::Unavailable { .. })
    }

    pub fn kind(&self) -> StorageBackendKind {
        self.kind
    }

    /// Directory to serve at `/uploads`, when files live on local disk.
    pub fn local_root(&self) -> Option<&std::path::Path> {
        match &self.backend {
            StorageBackend::Local(store) => Some(store.root()),
            _ => None,
        }
    }

    /// Store `bytes` and return a publicly reachable URL for them.
    pub async fn upload(&self, bytes: &[u8], filename: Option<&str>) -> Result<String> {
        match &self.backend {
            StorageBackend::Local(store) => store.upload(bytes, filename).await,
            StorageBackend::Cloudinary(client) => client.upload(bytes, filename).await,
            StorageBackend::Unavailable { reason } => {
                Err(MedlensError::StorageUnavailable(reason.clone()))
            }
        }
    }
}
