//! The queue protocol contract: lease-based polling with visibility
//! timeouts, delete-on-success, return-or-dead-letter on failure.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::model::{DeliveryMetadata, QueueMessage};

/// A leased message plus the metadata needed to ack/return/dead-letter it.
#[derive(Debug, Clone)]
pub struct LeasedMessage {
    pub message: QueueMessage,
    pub delivery: DeliveryMetadata,
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Lease up to `max` messages, each invisible to other consumers for
    /// `visibility_timeout`.
    async fn receive(&self, max: usize, visibility_timeout: Duration) -> Result<Vec<LeasedMessage>>;

    /// Permanently remove a successfully processed message.
    async fn delete(&self, lease_token: &str) -> Result<()>;

    /// Make a message visible again immediately (used on retryable
    /// failure, ahead of its visibility timeout expiring naturally).
    async fn release(&self, lease_token: &str) -> Result<()>;

    /// Move a message to the sibling dead-letter queue with a failure
    /// summary attached.
    async fn dead_letter(&self, lease_token: &str, failure_summary: &str) -> Result<()>;
}

/// In-memory queue used for tests and local development; a production
/// implementation adapts a message-queue SDK to this trait.
pub struct InMemoryQueueClient {
    inner: tokio::sync::Mutex<InMemoryQueueState>,
}

struct InMemoryQueueState {
    pending: std::collections::VecDeque<QueueMessage>,
    leased: std::collections::HashMap<String, QueueMessage>,
    dequeue_counts: std::collections::HashMap<String, u32>,
    dead_letters: Vec<(QueueMessage, String)>,
}

impl InMemoryQueueClient {
    pub fn new(messages: impl IntoIterator<Item = QueueMessage>) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(InMemoryQueueState {
                pending: messages.into_iter().collect(),
                leased: std::collections::HashMap::new(),
                dequeue_counts: std::collections::HashMap::new(),
                dead_letters: Vec::new(),
            }),
        }
    }

    pub async fn dead_letter_count(&self) -> usize {
        self.inner.lock().await.dead_letters.len()
    }
}

#[async_trait]
impl QueueClient for InMemoryQueueClient {
    async fn receive(&self, max: usize, _visibility_timeout: Duration) -> Result<Vec<LeasedMessage>> {
        let mut state = self.inner.lock().await;
        let mut out = Vec::new();
        for _ in 0..max {
            let Some(message) = state.pending.pop_front() else {
                break;
            };
            let token = uuid::Uuid::new_v4().to_string();
            // The first delivery already counts as one, matching storage-queue
            // convention; `dequeue_counts` only gains an entry once a message
            // has been released back onto the queue at least once.
            let dequeue_count = *state.dequeue_counts.get(&message.process_id).unwrap_or(&1);
            state.leased.insert(token.clone(), message.clone());
            out.push(LeasedMessage {
                message,
                delivery: DeliveryMetadata {
                    lease_token: token,
                    dequeue_count,
                },
            });
        }
        Ok(out)
    }

    async fn delete(&self, lease_token: &str) -> Result<()> {
        self.inner.lock().await.leased.remove(lease_token);
        Ok(())
    }

    async fn release(&self, lease_token: &str) -> Result<()> {
        let mut state = self.inner.lock().await;
        if let Some(message) = state.leased.remove(lease_token) {
            *state.dequeue_counts.entry(message.process_id.clone()).or_insert(1) += 1;
            state.pending.push_back(message);
        }
        Ok(())
    }

    async fn dead_letter(&self, lease_token: &str, failure_summary: &str) -> Result<()> {
        let mut state = self.inner.lock().await;
        if let Some(message) = state.leased.remove(lease_token) {
            state.dead_letters.push((message, failure_summary.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(process_id: &str) -> QueueMessage {
        QueueMessage {
            process_id: process_id.to_string(),
            user_id: "u1".to_string(),
            migration_request: None,
        }
    }

    #[tokio::test]
    async fn receive_caps_at_requested_max_and_leaves_the_rest_pending() {
        let queue = InMemoryQueueClient::new(vec![message("p1"), message("p2"), message("p3")]);
        let leased = queue.receive(2, Duration::from_secs(30)).await.unwrap();
        assert_eq!(leased.len(), 2);
    }

    #[tokio::test]
    async fn lease_tokens_are_unique_per_message() {
        let queue = InMemoryQueueClient::new(vec![message("p1"), message("p2")]);
        let leased = queue.receive(2, Duration::from_secs(30)).await.unwrap();
        assert_ne!(leased[0].delivery.lease_token, leased[1].delivery.lease_token);
    }

    #[tokio::test]
    async fn first_lease_reports_dequeue_count_of_one() {
        let queue = InMemoryQueueClient::new(vec![message("p1")]);
        let leased = queue.receive(1, Duration::from_secs(30)).await.unwrap();
        assert_eq!(leased[0].delivery.dequeue_count, 1);
    }

    #[tokio::test]
    async fn release_increments_dequeue_count_and_requeues() {
        let queue = InMemoryQueueClient::new(vec![message("p1")]);
        let leased = queue.receive(1, Duration::from_secs(30)).await.unwrap();
        queue.release(&leased[0].delivery.lease_token).await.unwrap();

        let redelivered = queue.receive(1, Duration::from_secs(30)).await.unwrap();
        assert_eq!(redelivered[0].delivery.dequeue_count, 2);
    }

    #[tokio::test]
    async fn repeated_releases_keep_incrementing_dequeue_count() {
        let queue = InMemoryQueueClient::new(vec![message("p1")]);
        for expected in 1..=3u32 {
            let leased = queue.receive(1, Duration::from_secs(30)).await.unwrap();
            assert_eq!(leased[0].delivery.dequeue_count, expected);
            queue.release(&leased[0].delivery.lease_token).await.unwrap();
        }
    }

    #[tokio::test]
    async fn dead_letter_removes_the_message_and_records_it() {
        let queue = InMemoryQueueClient::new(vec![message("p1")]);
        let leased = queue.receive(1, Duration::from_secs(30)).await.unwrap();
        queue.dead_letter(&leased[0].delivery.lease_token, "exceeded retries").await.unwrap();

        assert_eq!(queue.dead_letter_count().await, 1);
        let empty = queue.receive(1, Duration::from_secs(30)).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_the_lease_without_requeueing() {
        let queue = InMemoryQueueClient::new(vec![message("p1")]);
        let leased = queue.receive(1, Duration::from_secs(30)).await.unwrap();
        queue.delete(&leased[0].delivery.lease_token).await.unwrap();

        let empty = queue.receive(1, Duration::from_secs(30)).await.unwrap();
        assert!(empty.is_empty());
        assert_eq!(queue.dead_letter_count().await, 0);
    }
}
