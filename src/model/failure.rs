//! Structured failure records and the escalation-level/manual-intervention
//! derivation logic used when a phase step reports a failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::termination::{TerminationKind, TerminationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Failure arising from an exception thrown while a step was executing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemFailure {
    pub exception_class: String,
    pub message: String,
    pub stack_trace: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub process_id: String,
    pub step_name: String,
    pub step_phase: String,
    pub input_summary: String,
    pub exception_module: String,
    pub exception_args: Vec<String>,
    pub exception_cause: Option<String>,
    pub exception_context: Option<String>,
}

/// The slice of process state a failure collector is allowed to see: enough
/// to describe what the step was working on, nothing it would need to dig
/// through a live process to find.
#[derive(Debug, Clone, Default)]
pub struct InputContext {
    pub source_folder: Option<String>,
    pub analyzed_files: Vec<String>,
    pub platform_detected: Option<String>,
    pub has_analysis_result: bool,
    pub has_design_result: bool,
}

/// Short, comma-joined description of whatever input context is present.
/// Mirrors the original collector's summary: only present keys are
/// mentioned, and an empty context renders as a fixed placeholder rather
/// than an empty string.
pub fn summarize_input_context(ctx: &InputContext) -> String {
    let mut parts = Vec::new();
    if let Some(folder) = ctx.source_folder.as_ref().filter(|f| !f.is_empty()) {
        parts.push(format!("source: {folder}"));
    }
    if !ctx.analyzed_files.is_empty() {
        parts.push(format!("files: {}", ctx.analyzed_files.len()));
    }
    if let Some(platform) = ctx.platform_detected.as_ref().filter(|p| !p.is_empty()) {
        parts.push(format!("platform: {platform}"));
    }
    if ctx.has_analysis_result {
        parts.push("has_analysis_result".to_string());
    }
    if ctx.has_design_result {
        parts.push("has_design_result".to_string());
    }
    if parts.is_empty() {
        "no context available".to_string()
    } else {
        parts.join(", ")
    }
}

/// De-duplicated file names drawn from whatever analysis output the process
/// has produced so far.
pub fn extract_input_files(ctx: &InputContext) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ctx.analyzed_files
        .iter()
        .filter(|f| seen.insert((*f).clone()))
        .cloned()
        .collect()
}

/// Failure arising from a hard termination result returned by a group chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardTerminationFailure {
    pub kind: TerminationKind,
    pub reason: String,
    pub blocking_issues: Vec<String>,
    pub retry_suggestions: Vec<String>,
    pub confidence: f64,
    pub input_files: Vec<String>,
    pub manual_intervention_required: bool,
    pub escalation_level: EscalationLevel,
}

/// Exactly one variant is populated per record, mirroring the mutually
/// exclusive system-failure / hard-termination split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FailureContext {
    System(SystemFailure),
    HardTermination(HardTerminationFailure),
}

impl FailureContext {
    pub fn process_id(&self) -> Option<&str> {
        match self {
            Self::System(s) => Some(&s.process_id),
            Self::HardTermination(_) => None,
        }
    }

    pub fn escalation_level(&self) -> EscalationLevel {
        match self {
            Self::System(_) => EscalationLevel::High,
            Self::HardTermination(h) => h.escalation_level,
        }
    }

    pub fn manual_intervention_required(&self) -> bool {
        match self {
            Self::System(_) => true,
            Self::HardTermination(h) => h.manual_intervention_required,
        }
    }
}

/// Build a system-failure record from a caught error. `input_summary` should
/// already be a short, pre-truncated description; this function performs no
/// I/O and never fails.
#[allow(clippy::too_many_arguments)]
pub fn build_system_failure(
    exception_class: impl Into<String>,
    message: impl Into<String>,
    stack_trace: Option<String>,
    process_id: impl Into<String>,
    step_name: impl Into<String>,
    step_phase: impl Into<String>,
    input_summary: impl Into<String>,
    exception_module: impl Into<String>,
    exception_args: Vec<String>,
    exception_cause: Option<String>,
    exception_context: Option<String>,
    now: DateTime<Utc>,
) -> SystemFailure {
    SystemFailure {
        exception_class: exception_class.into(),
        message: message.into(),
        stack_trace,
        timestamp: now,
        process_id: process_id.into(),
        step_name: step_name.into(),
        step_phase: step_phase.into(),
        input_summary: input_summary.into(),
        exception_module: exception_module.into(),
        exception_args,
        exception_cause,
        exception_context,
    }
}

/// Build a hard-termination failure record from an extended termination
/// result, deriving the manual-intervention flag and escalation level.
pub fn build_hard_termination_failure(
    termination: &TerminationResult,
    input_files: Vec<String>,
) -> HardTerminationFailure {
    let manual_intervention_required = requires_manual_intervention(termination);
    let escalation_level = determine_escalation_level(termination);
    HardTerminationFailure {
        kind: termination.kind,
        reason: termination.reason.clone(),
        blocking_issues: termination.blocking_issues.clone(),
        retry_suggestions: termination.retry_suggestions.clone(),
        confidence: termination.confidence,
        input_files,
        manual_intervention_required,
        escalation_level,
    }
}

fn requires_manual_intervention(termination: &TerminationResult) -> bool {
    matches!(
        termination.kind,
        TerminationKind::HardBlocked | TerminationKind::HardError | TerminationKind::HardResourceLimit
    ) || termination.confidence < 0.5
        || termination.blocking_issues.len() > 2
}

fn determine_escalation_level(termination: &TerminationResult) -> EscalationLevel {
    let mut level = match termination.kind {
        TerminationKind::HardError => EscalationLevel::High,
        TerminationKind::HardBlocked => EscalationLevel::Critical,
        _ => EscalationLevel::Low,
    };
    let confidence_level = if termination.confidence < 0.3 {
        EscalationLevel::High
    } else if termination.confidence < 0.7 {
        EscalationLevel::Medium
    } else {
        EscalationLevel::Low
    };
    if confidence_level > level {
        level = confidence_level;
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn termination(kind: TerminationKind, confidence: f64, issues: usize) -> TerminationResult {
        let blocking_issues = (0..issues).map(|i| format!("issue-{i}")).collect();
        TerminationResult::new(true, "stopped", true, kind, blocking_issues, Vec::new(), confidence)
            .unwrap_or_else(|_| TerminationResult::hard_timeout("stopped"))
    }

    #[test]
    fn hard_error_escalates_to_high() {
        let t = termination(TerminationKind::HardError, 0.9, 0);
        let failure = build_hard_termination_failure(&t, vec![]);
        assert_eq!(failure.escalation_level, EscalationLevel::High);
        assert!(failure.manual_intervention_required);
    }

    #[test]
    fn hard_blocked_wins_over_high_confidence() {
        let t = termination(TerminationKind::HardBlocked, 0.95, 1);
        let failure = build_hard_termination_failure(&t, vec![]);
        assert_eq!(failure.escalation_level, EscalationLevel::Critical);
    }

    #[test]
    fn low_confidence_alone_raises_escalation() {
        let t = TerminationResult::hard_timeout("turn cap");
        let t = TerminationResult { confidence: 0.2, ..t };
        let failure = build_hard_termination_failure(&t, vec![]);
        assert_eq!(failure.escalation_level, EscalationLevel::High);
        assert!(failure.manual_intervention_required);
    }

    #[test]
    fn many_blocking_issues_forces_manual_intervention() {
        let t = TerminationResult::new(
            true,
            "many issues",
            false,
            TerminationKind::SoftCompletion,
            vec!["a".into(), "b".into(), "c".into()],
            vec![],
            0.9,
        )
        .unwrap();
        let failure = build_hard_termination_failure(&t, vec![]);
        assert!(failure.manual_intervention_required);
    }

    #[test]
    fn empty_input_context_summarizes_as_no_context_available() {
        let ctx = InputContext::default();
        assert_eq!(summarize_input_context(&ctx), "no context available");
    }

    #[test]
    fn input_context_summary_lists_only_present_keys() {
        let ctx = InputContext {
            source_folder: Some("src/app".to_string()),
            analyzed_files: vec!["a.yaml".to_string(), "b.yaml".to_string()],
            platform_detected: None,
            has_analysis_result: true,
            has_design_result: false,
        };
        assert_eq!(summarize_input_context(&ctx), "source: src/app, files: 2, has_analysis_result");
    }

    #[test]
    fn extract_input_files_deduplicates() {
        let ctx = InputContext {
            analyzed_files: vec!["a.yaml".to_string(), "b.yaml".to_string(), "a.yaml".to_string()],
            ..InputContext::default()
        };
        let files = extract_input_files(&ctx);
        assert_eq!(files.len(), 2);
        assert!(files.contains(&"a.yaml".to_string()));
        assert!(files.contains(&"b.yaml".to_string()));
    }

    #[test]
    fn build_system_failure_carries_exception_metadata() {
        let failure = build_system_failure(
            "PayloadExtractionError",
            "boom",
            None,
            "p1",
            "analysis",
            "analysis",
            "no context available",
            "migration_engine::error::EngineError::Phase",
            vec!["code=7001".to_string()],
            Some("underlying cause".to_string()),
            None,
            Utc::now(),
        );
        assert_eq!(failure.exception_module, "migration_engine::error::EngineError::Phase");
        assert_eq!(failure.exception_args, vec!["code=7001".to_string()]);
        assert_eq!(failure.exception_cause.as_deref(), Some("underlying cause"));
        assert_eq!(failure.exception_context, None);
    }
}
