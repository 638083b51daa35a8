//! The message shape the dispatcher pulls off the job queue.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationRequest {
    pub container_name: String,
    pub source_folder: String,
    pub workspace_folder: String,
    pub output_folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueMessage {
    pub process_id: String,
    pub user_id: String,
    #[serde(default)]
    pub migration_request: Option<MigrationRequest>,
}

/// Delivery metadata attached by the queue adapter, not part of the wire
/// payload itself.
#[derive(Debug, Clone)]
pub struct DeliveryMetadata {
    pub lease_token: String,
    pub dequeue_count: u32,
}
