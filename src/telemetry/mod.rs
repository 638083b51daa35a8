//! The telemetry store: per-process status and per-agent activity,
//! projected into a read-only snapshot for external consumers.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{Phase, ProcessActivitySnapshot};

pub use memory::InMemoryTelemetryStore;

/// Final outcome attached when a process is finalized.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub succeeded: bool,
    pub generated_files: Vec<String>,
    pub summary: String,
}

/// Telemetry persistence, split so that a production implementation can
/// back each concern with the storage technology that fits it best; the
/// in-memory backend implements all of them over one lock table.
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    async fn create_process(&self, process_id: &str, step: &str, phase: Phase) -> Result<()>;

    async fn update_agent_activity(
        &self,
        process_id: &str,
        agent_name: &str,
        action: &str,
        message_preview: &str,
        step: Option<&str>,
        tool_used: Option<&str>,
    ) -> Result<()>;

    async fn track_tool_usage(
        &self,
        process_id: &str,
        agent_name: &str,
        tool_name: &str,
        tool_action: &str,
        tool_result_preview: &str,
    ) -> Result<()> {
        self.update_agent_activity(
            process_id,
            agent_name,
            tool_action,
            tool_result_preview,
            None,
            Some(tool_name),
        )
        .await
    }

    async fn set_phase(&self, process_id: &str, phase: Phase, step: &str) -> Result<()>;

    async fn finalize(&self, process_id: &str, outcome: ProcessOutcome) -> Result<()>;

    async fn snapshot(&self, process_id: &str) -> Result<Option<ProcessActivitySnapshot>>;
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}
