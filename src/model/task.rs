//! Types shared by the parallel task executor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
    Retrying,
}

#[derive(Debug, Clone)]
pub struct TaskConfig {
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub timeout: Option<Duration>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
            timeout: None,
        }
    }
}

/// Outcome of one task as seen by `executeAll`'s result map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub name: String,
    pub status: TaskStatus,
    pub value: Option<serde_json::Value>,
    pub error: Option<String>,
    pub attempts: u32,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

impl TaskResult {
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Success
    }
}
