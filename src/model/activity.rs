//! Telemetry projection types: per-process status and per-agent activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Cap on how many recent activity entries are retained per agent.
pub const ACTIVITY_HISTORY_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Running,
    Completed,
    Failed,
    UnderReview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub message_preview: String,
    pub step: Option<String>,
    pub tool_used: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub current_action: String,
    pub last_message_preview: String,
    pub is_speaking: bool,
    pub is_thinking: bool,
    pub participating: bool,
    pub last_update: DateTime<Utc>,
    pub history: VecDeque<ActivityEntry>,
}

impl AgentRecord {
    pub fn new(name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            current_action: String::new(),
            last_message_preview: String::new(),
            is_speaking: false,
            is_thinking: false,
            participating: true,
            last_update: now,
            history: VecDeque::new(),
        }
    }

    /// Apply an activity update, enforcing the monotonic-last-update and
    /// bounded-history invariants.
    pub fn record_activity(&mut self, entry: ActivityEntry, now: DateTime<Utc>) {
        self.current_action = entry.action.clone();
        self.last_message_preview = entry.message_preview.clone();
        self.history.push_back(entry);
        while self.history.len() > ACTIVITY_HISTORY_CAP {
            self.history.pop_front();
        }
        self.last_update = now;
    }
}

/// The read-only projection of a process's telemetry state, returned by the
/// store's `snapshot` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessActivitySnapshot {
    pub process_id: String,
    pub phase: String,
    pub step: String,
    pub status: ProcessStatus,
    pub started_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    pub agents: Vec<AgentRecord>,
}
