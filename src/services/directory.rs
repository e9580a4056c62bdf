use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::services::appwrite::{AppwriteClient, AppwriteError};
use crate::services::cache::{CacheKey, CacheManager};

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Directory lookup failed: {0}")]
    Appwrite(#[from] AppwriteError),
}

impl DirectoryError {
    pub fn is_transient(&self) -> bool {
        match self {
            DirectoryError::Appwrite(e) => e.is_transient(),
        }
    }
}

/// Existence lookups for user IDs owned by the profile service
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn exists(&self, user_id: &str) -> Result<bool, DirectoryError>;
}

#[async_trait]
impl UserDirectory for AppwriteClient {
    async fn exists(&self, user_id: &str) -> Result<bool, DirectoryError> {
        Ok(self.user_exists(user_id).await?)
    }
}

/// Directory decorator that remembers users known to exist.
///
/// Only positive lookups are cached so a freshly created profile is never
/// reported missing for a whole TTL.
pub struct CachedDirectory {
    inner: Arc<dyn UserDirectory>,
    cache: Arc<CacheManager>,
}

impl CachedDirectory {
    pub fn new(inner: Arc<dyn UserDirectory>, cache: Arc<CacheManager>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl UserDirectory for CachedDirectory {
    async fn exists(&self, user_id: &str) -> Result<bool, DirectoryError> {
        let key = CacheKey::user_exists(user_id);

        if let Ok(true) = self.cache.get::<bool>(&key).await {
            return Ok(true);
        }

        let exists = self.inner.exists(user_id).await?;
        if exists {
            if let Err(e) = self.cache.set(&key, &true).await {
                tracing::warn!("Failed to cache directory lookup for {}: {}", user_id, e);
            }
        }

        Ok(exists)
    }
}
