//! Token store implementations
//!
//! Two tiers plus their composition: a volatile in-memory store, a durable
//! JSON file store, and a read-through [`TieredTokenStore`] that keeps the
//! volatile tier warm while writing through to the durable one.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::TokenStore;
use super::types::TokenRecord;

/// Volatile in-memory token store (the fast tier).
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    record: RwLock<Option<TokenRecord>>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self) -> Result<Option<TokenRecord>, String> {
        Ok(self.record.read().await.clone())
    }

    async fn set(&self, record: &TokenRecord) -> Result<(), String> {
        *self.record.write().await = Some(record.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<(), String> {
        *self.record.write().await = None;
        Ok(())
    }
}

/// Durable token store persisting the record as JSON on disk.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Create a store backed by the given file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the record is persisted at.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Result<Option<TokenRecord>, String> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => {
                let record: TokenRecord = serde_json::from_slice(&bytes)
                    .map_err(|e| format!("corrupt token file {}: {e}", self.path.display()))?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("failed to read {}: {e}", self.path.display())),
        }
    }

    async fn set(&self, record: &TokenRecord) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }

        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| format!("failed to serialize token record: {e}"))?;

        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| format!("failed to write {}: {e}", self.path.display()))
    }

    async fn remove(&self) -> Result<(), String> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("failed to remove {}: {e}", self.path.display())),
        }
    }
}

/// Two-tier store: volatile read-through cache over a durable backend.
///
/// Reads hit the volatile tier first and fall through to the durable one
/// (warming the cache); writes and removals go to both tiers.
pub struct TieredTokenStore<D: TokenStore> {
    volatile: MemoryTokenStore,
    durable: D,
}

impl<D: TokenStore> TieredTokenStore<D> {
    /// Compose the tiers.
    #[must_use]
    pub fn new(durable: D) -> Self {
        Self { volatile: MemoryTokenStore::new(), durable }
    }
}

#[async_trait]
impl<D: TokenStore> TokenStore for TieredTokenStore<D> {
    async fn get(&self) -> Result<Option<TokenRecord>, String> {
        if let Some(record) = self.volatile.get().await? {
            return Ok(Some(record));
        }

        match self.durable.get().await? {
            Some(record) => {
                debug!("token record loaded from durable tier");
                self.volatile.set(&record).await?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, record: &TokenRecord) -> Result<(), String> {
        self.volatile.set(record).await?;
        self.durable.set(record).await
    }

    async fn remove(&self) -> Result<(), String> {
        self.volatile.remove().await?;
        self.durable.remove().await
    }
}
