//! The shared process state threaded through the phase pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// The fixed phase sequence. Ordering matters: `Ord` is used to enforce the
/// monotonic-transition invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initialization,
    Analysis,
    Design,
    Yaml,
    Documentation,
    Completed,
    Failed,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Initialization => "initialization",
            Self::Analysis => "analysis",
            Self::Design => "design",
            Self::Yaml => "yaml",
            Self::Documentation => "documentation",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// The phase that should run after this one completes successfully, or
    /// `None` once the pipeline is exhausted.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Self::Initialization => Some(Self::Analysis),
            Self::Analysis => Some(Self::Design),
            Self::Design => Some(Self::Yaml),
            Self::Yaml => Some(Self::Documentation),
            Self::Documentation => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }
}

/// Process state for a single migration job. The state machine is the sole
/// writer of `current_phase`; phase steps may only mutate the fields they
/// own (insights, logs, completion flags).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessState {
    pub process_id: String,
    pub user_id: String,
    pub source_platform: Option<String>,
    pub target_platform: String,
    pub workspace_folder: String,
    pub source_folder: String,
    pub output_folder: String,
    /// File names surfaced by the analysis phase, carried forward so later
    /// failures can report what the step was working on.
    pub discovered_files: Vec<String>,
    pub current_phase: Phase,
    pub analysis_completed: bool,
    pub design_completed: bool,
    pub yaml_completed: bool,
    pub documentation_completed: bool,
    pub expert_insights: Vec<String>,
    pub error_log: Vec<String>,
    pub warning_log: Vec<String>,
    pub completed_phases: Vec<String>,
    pub phase_started_at: DateTime<Utc>,
    /// Free-text description of what the user asked for; carried through
    /// untouched for downstream narrative reporting.
    pub user_request: Option<String>,
    pub migration_type: Option<String>,
}

impl ProcessState {
    pub fn new(
        process_id: impl Into<String>,
        user_id: impl Into<String>,
        workspace_folder: impl Into<String>,
        source_folder: impl Into<String>,
        output_folder: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            process_id: process_id.into(),
            user_id: user_id.into(),
            source_platform: None,
            target_platform: "aks".to_string(),
            workspace_folder: workspace_folder.into(),
            source_folder: source_folder.into(),
            output_folder: output_folder.into(),
            discovered_files: Vec::new(),
            current_phase: Phase::Initialization,
            analysis_completed: false,
            design_completed: false,
            yaml_completed: false,
            documentation_completed: false,
            expert_insights: Vec::new(),
            error_log: Vec::new(),
            warning_log: Vec::new(),
            completed_phases: Vec::new(),
            phase_started_at: now,
            user_request: None,
            migration_type: None,
        }
    }

    /// Advance to `phase`, enforcing that transitions never regress.
    pub fn transition_to(&mut self, phase: Phase, now: DateTime<Utc>) -> Result<()> {
        if phase < self.current_phase {
            return Err(EngineError::storage(
                crate::error::ErrorCode::STORAGE_PHASE_REGRESSION,
                format!(
                    "cannot transition from {} back to {}",
                    self.current_phase.name(),
                    phase.name()
                ),
                Some(self.process_id.clone()),
            ));
        }
        if !self.completed_phases.contains(&self.current_phase.name().to_string())
            && !matches!(self.current_phase, Phase::Initialization | Phase::Completed | Phase::Failed)
        {
            self.completed_phases.push(self.current_phase.name().to_string());
        }
        self.current_phase = phase;
        self.phase_started_at = now;
        Ok(())
    }

    pub fn append_insight(&mut self, insight: impl Into<String>) {
        let insight = insight.into();
        if !self.expert_insights.contains(&insight) {
            self.expert_insights.push(insight);
        }
    }

    pub fn append_error(&mut self, phase: Phase, message: impl std::fmt::Display) {
        let entry = format!("[{}] {}", phase.name(), message);
        if !self.error_log.contains(&entry) {
            self.error_log.push(entry);
        }
    }

    pub fn append_warning(&mut self, phase: Phase, message: impl std::fmt::Display) {
        let entry = format!("[{}] {}", phase.name(), message);
        if !self.warning_log.contains(&entry) {
            self.warning_log.push(entry);
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.current_phase, Phase::Completed | Phase::Failed)
    }
}
