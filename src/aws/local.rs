//! Mapping document read from the local filesystem

use super::{MappingStore, StoreError};
use crate::config::BootstrapConfig;
use async_trait::async_trait;
use secrecy::SecretString;
use std::path::PathBuf;
use tokio::fs;

/// Treats the mapping key as a path below `root`; bucket and role are
/// ignored. Used for offline resolution.
#[derive(Debug, Clone)]
pub struct LocalMappingStore {
    root: PathBuf,
}

impl LocalMappingStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl MappingStore for LocalMappingStore {
    async fn fetch(
        &self,
        location: &BootstrapConfig,
        _web_identity_token: &SecretString,
    ) -> Result<Vec<u8>, StoreError> {
        let path = self.root.join(&location.mapping_key);
        fs::read(&path)
            .await
            .map_err(|source| StoreError::Read { path, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(key: &str) -> BootstrapConfig {
        BootstrapConfig {
            role_arn: "unused".to_string(),
            mapping_bucket: "unused".to_string(),
            mapping_key: key.to_string(),
        }
    }

    #[tokio::test]
    async fn test_reads_key_below_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mappings.json"), b"{}").unwrap();

        let store = LocalMappingStore::new(dir.path());
        let token = SecretString::from("token".to_string());
        let body = store.fetch(&location("mappings.json"), &token).await.unwrap();
        assert_eq!(body, b"{}");

        let err = store.fetch(&location("missing.json"), &token).await.unwrap_err();
        assert!(matches!(err, StoreError::Read { .. }));
    }
}
