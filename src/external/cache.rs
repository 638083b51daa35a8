//! Bounded response cache wrapping a [`ModelService`], keyed by a content
//! hash of the prompt so repeated identical calls (common across phase
//! retries) skip the round trip entirely.

use async_trait::async_trait;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use super::ModelService;
use crate::error::Result;

fn prompt_digest(messages: &[String], max_tokens: u32) -> String {
    let mut hasher = Sha256::new();
    for message in messages {
        hasher.update(message.as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(max_tokens.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct CachingModelService {
    inner: Arc<dyn ModelService>,
    cache: Mutex<LruCache<String, String>>,
}

impl CachingModelService {
    pub fn new(inner: Arc<dyn ModelService>, capacity: usize) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1"))),
        }
    }
}

#[async_trait]
impl ModelService for CachingModelService {
    async fn complete(&self, messages: &[String], max_tokens: u32) -> Result<String> {
        let key = prompt_digest(messages, max_tokens);

        if let Some(cached) = self.cache.lock().await.get(&key) {
            debug!("model response cache hit for digest {key}");
            return Ok(cached.clone());
        }

        let response = self.inner.complete(messages, max_tokens).await?;
        self.cache.lock().await.put(key, response.clone());
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingService {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ModelService for CountingService {
        async fn complete(&self, messages: &[String], _max_tokens: u32) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(messages.join(" "))
        }
    }

    #[tokio::test]
    async fn identical_prompts_hit_the_cache() {
        let inner = Arc::new(CountingService { calls: AtomicUsize::new(0) });
        let service = CachingModelService::new(inner.clone(), 4);

        let prompt = vec!["hello".to_string()];
        let first = service.complete(&prompt, 100).await.unwrap();
        let second = service.complete(&prompt, 100).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_prompts_both_invoke_the_inner_service() {
        let inner = Arc::new(CountingService { calls: AtomicUsize::new(0) });
        let service = CachingModelService::new(inner.clone(), 4);

        service.complete(&["a".to_string()], 100).await.unwrap();
        service.complete(&["b".to_string()], 100).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
