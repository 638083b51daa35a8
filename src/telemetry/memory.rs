//! In-memory telemetry backend: one `RwLock`-guarded record per process id,
//! used as the reference implementation and in tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{now, ProcessOutcome, TelemetryStore};
use crate::error::{EngineError, ErrorCode, Result};
use crate::model::{ActivityEntry, AgentRecord, Phase, ProcessActivitySnapshot, ProcessStatus};

struct ProcessRecord {
    phase: Phase,
    step: String,
    status: ProcessStatus,
    started_at: chrono::DateTime<chrono::Utc>,
    last_update: chrono::DateTime<chrono::Utc>,
    agents: HashMap<String, AgentRecord>,
    outcome: Option<ProcessOutcome>,
}

#[derive(Default)]
pub struct InMemoryTelemetryStore {
    processes: Arc<RwLock<HashMap<String, ProcessRecord>>>,
}

impl InMemoryTelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TelemetryStore for InMemoryTelemetryStore {
    async fn create_process(&self, process_id: &str, step: &str, phase: Phase) -> Result<()> {
        let mut processes = self.processes.write().await;
        if processes.contains_key(process_id) {
            return Err(EngineError::storage(
                ErrorCode::STORAGE_ALREADY_EXISTS,
                format!("process {process_id} already exists"),
                Some(process_id.to_string()),
            ));
        }
        let ts = now();
        processes.insert(
            process_id.to_string(),
            ProcessRecord {
                phase,
                step: step.to_string(),
                status: ProcessStatus::Running,
                started_at: ts,
                last_update: ts,
                agents: HashMap::new(),
                outcome: None,
            },
        );
        Ok(())
    }

    async fn update_agent_activity(
        &self,
        process_id: &str,
        agent_name: &str,
        action: &str,
        message_preview: &str,
        step: Option<&str>,
        tool_used: Option<&str>,
    ) -> Result<()> {
        let mut processes = self.processes.write().await;
        let record = processes.get_mut(process_id).ok_or_else(|| {
            EngineError::storage(
                ErrorCode::STORAGE_NOT_FOUND,
                format!("process {process_id} not found"),
                Some(process_id.to_string()),
            )
        })?;
        let ts = now();
        let agent = record
            .agents
            .entry(agent_name.to_string())
            .or_insert_with(|| AgentRecord::new(agent_name, ts));
        agent.record_activity(
            ActivityEntry {
                timestamp: ts,
                action: action.to_string(),
                message_preview: message_preview.to_string(),
                step: step.map(str::to_string),
                tool_used: tool_used.map(str::to_string),
            },
            ts,
        );
        record.last_update = ts;
        Ok(())
    }

    async fn set_phase(&self, process_id: &str, phase: Phase, step: &str) -> Result<()> {
        let mut processes = self.processes.write().await;
        let record = processes.get_mut(process_id).ok_or_else(|| {
            EngineError::storage(
                ErrorCode::STORAGE_NOT_FOUND,
                format!("process {process_id} not found"),
                Some(process_id.to_string()),
            )
        })?;
        if phase < record.phase {
            return Err(EngineError::storage(
                ErrorCode::STORAGE_PHASE_REGRESSION,
                format!("cannot move process {process_id} back to {}", phase.name()),
                Some(process_id.to_string()),
            ));
        }
        record.phase = phase;
        record.step = step.to_string();
        record.last_update = now();
        Ok(())
    }

    async fn finalize(&self, process_id: &str, outcome: ProcessOutcome) -> Result<()> {
        let mut processes = self.processes.write().await;
        let record = processes.get_mut(process_id).ok_or_else(|| {
            EngineError::storage(
                ErrorCode::STORAGE_NOT_FOUND,
                format!("process {process_id} not found"),
                Some(process_id.to_string()),
            )
        })?;
        record.status = if outcome.succeeded {
            ProcessStatus::Completed
        } else {
            ProcessStatus::Failed
        };
        record.phase = if outcome.succeeded { Phase::Completed } else { Phase::Failed };
        record.last_update = now();
        record.outcome = Some(outcome);
        Ok(())
    }

    async fn snapshot(&self, process_id: &str) -> Result<Option<ProcessActivitySnapshot>> {
        let processes = self.processes.read().await;
        Ok(processes.get(process_id).map(|record| ProcessActivitySnapshot {
            process_id: process_id.to_string(),
            phase: record.phase.name().to_string(),
            step: record.step.clone(),
            status: record.status,
            started_at: record.started_at,
            last_update: record.last_update,
            agents: record.agents.values().cloned().collect(),
        }))
    }
}
