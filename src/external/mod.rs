//! Traits for the external collaborators the core depends on by reference
//! but does not implement: blob storage and the model service. Production
//! implementations are a documented extension point; this crate ships
//! only what's needed for testing.

pub mod cache;

use async_trait::async_trait;

use crate::error::Result;

pub use cache::CachingModelService;

/// Artifact storage the agent toolset reads/writes; the core never
/// touches it directly.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Opaque chat-completion endpoint each agent invocation calls through.
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn complete(&self, messages: &[String], max_tokens: u32) -> Result<String>;
}

/// In-memory blob store used for tests and local development.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| crate::error::EngineError::other(format!("blob not found: {path}")))
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        self.objects.write().await.insert(path.to_string(), content.to_vec());
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
