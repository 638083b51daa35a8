//! The extended termination result returned by a group-chat termination rule.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{EngineError, Result};

/// The kind of termination a group-chat run ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationKind {
    /// The phase finished its work and the output is usable.
    SoftCompletion,
    /// A hard stop because progress is impossible without more input.
    HardBlocked,
    /// A hard stop because an unrecoverable error occurred mid-conversation.
    HardError,
    /// A hard stop because the turn or wall-clock budget was exceeded.
    HardTimeout,
    /// A hard stop because a hard resource limit (message cap) was hit.
    HardResourceLimit,
    /// A soft stop that exits early without completing normally (e.g. a
    /// supervisor agent deciding no further turns are useful).
    SoftEarlyExit,
}

impl TerminationKind {
    fn is_hard(self) -> bool {
        matches!(
            self,
            Self::HardBlocked | Self::HardError | Self::HardTimeout | Self::HardResourceLimit
        )
    }
}

/// Structured decision emitted when a group-chat conversation ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminationResult {
    pub terminate: bool,
    pub reason: String,
    pub hard: bool,
    pub kind: TerminationKind,
    pub blocking_issues: Vec<String>,
    pub retry_suggestions: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl TerminationResult {
    /// Construct a validated result; enforces the confidence-range and
    /// hard/kind/blocking-issue invariants rather than trusting the caller.
    pub fn new(
        terminate: bool,
        reason: impl Into<String>,
        hard: bool,
        kind: TerminationKind,
        blocking_issues: Vec<String>,
        retry_suggestions: Vec<String>,
        confidence: f64,
    ) -> Result<Self> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(EngineError::validation("termination reason must not be empty"));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(EngineError::validation_with_field(
                format!("confidence {confidence} is outside [0,1]"),
                "confidence",
            ));
        }
        if hard && !kind.is_hard() {
            return Err(EngineError::validation(
                "hard=true requires a hard-* termination kind",
            ));
        }
        if kind == TerminationKind::HardBlocked && blocking_issues.is_empty() {
            return Err(EngineError::validation(
                "hard-blocked termination requires at least one blocking issue",
            ));
        }
        Ok(Self {
            terminate,
            reason,
            hard,
            kind,
            blocking_issues,
            retry_suggestions,
            confidence,
            metadata: HashMap::new(),
        })
    }

    pub fn soft_completion(reason: impl Into<String>) -> Self {
        Self::new(
            true,
            reason,
            false,
            TerminationKind::SoftCompletion,
            Vec::new(),
            Vec::new(),
            1.0,
        )
        .expect("soft completion parameters are always valid")
    }

    pub fn hard_blocked(
        reason: impl Into<String>,
        blocking_issues: Vec<String>,
        retry_suggestions: Vec<String>,
        confidence: f64,
    ) -> Result<Self> {
        Self::new(
            true,
            reason,
            true,
            TerminationKind::HardBlocked,
            blocking_issues,
            retry_suggestions,
            confidence,
        )
    }

    pub fn hard_error(reason: impl Into<String>, confidence: f64) -> Result<Self> {
        Self::new(
            true,
            reason,
            true,
            TerminationKind::HardError,
            Vec::new(),
            Vec::new(),
            confidence,
        )
    }

    pub fn hard_timeout(reason: impl Into<String>) -> Self {
        Self::new(
            true,
            reason,
            true,
            TerminationKind::HardTimeout,
            Vec::new(),
            Vec::new(),
            0.5,
        )
        .expect("hard timeout parameters are always valid")
    }

    pub fn continue_conversation() -> Self {
        Self {
            terminate: false,
            reason: "conversation still in progress".to_string(),
            hard: false,
            kind: TerminationKind::SoftCompletion,
            blocking_issues: Vec::new(),
            retry_suggestions: Vec::new(),
            confidence: 0.0,
            metadata: HashMap::new(),
        }
    }

    pub fn is_successful_completion(&self) -> bool {
        self.terminate && !self.hard && self.kind == TerminationKind::SoftCompletion
    }

    pub fn is_blocking_termination(&self) -> bool {
        self.terminate && self.hard
    }

    pub fn should_retry(&self) -> bool {
        matches!(
            self.kind,
            TerminationKind::HardError | TerminationKind::HardTimeout | TerminationKind::HardResourceLimit
        )
    }

    pub fn should_escalate(&self) -> bool {
        self.hard && self.kind == TerminationKind::HardBlocked
    }

    /// Narrow view used by simple termination rules (tests, stubs) that only
    /// care about whether to stop and why.
    pub fn to_minimal(&self) -> (bool, String) {
        (self.terminate, self.reason.clone())
    }

    pub fn from_minimal(terminate: bool, reason: impl Into<String>) -> Self {
        if terminate {
            Self::soft_completion(reason)
        } else {
            let mut r = Self::continue_conversation();
            r.reason = reason.into();
            r
        }
    }
}

/// A more general decision record for agent-selection bookkeeping: not just
/// which agent was picked, but why, and what the runner-up choices were.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionDecision {
    pub primary_choice: String,
    pub confidence: f64,
    pub reasoning: String,
    pub alternatives: Vec<String>,
}

impl SelectionDecision {
    pub fn new(primary_choice: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            primary_choice: primary_choice.into(),
            confidence: 1.0,
            reasoning: reasoning.into(),
            alternatives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hard_blocked_requires_blocking_issue() {
        let result = TerminationResult::hard_blocked("stuck", Vec::new(), Vec::new(), 0.2);
        assert!(result.is_err());
    }

    #[test]
    fn confidence_out_of_range_is_rejected() {
        let result = TerminationResult::new(
            true,
            "done",
            false,
            TerminationKind::SoftCompletion,
            Vec::new(),
            Vec::new(),
            1.5,
        );
        assert!(result.is_err());
    }

    #[test]
    fn predicates_match_soft_completion() {
        let r = TerminationResult::soft_completion("analysis complete");
        assert!(r.is_successful_completion());
        assert!(!r.is_blocking_termination());
        assert!(!r.should_retry());
    }

    #[test]
    fn hard_blocked_should_escalate_not_retry() {
        let r = TerminationResult::hard_blocked("no source", vec!["missing folder".into()], vec![], 0.9).unwrap();
        assert!(r.should_escalate());
        assert!(!r.should_retry());
        assert!(r.is_blocking_termination());
    }

    #[test]
    fn hard_timeout_should_retry() {
        let r = TerminationResult::hard_timeout("turn cap hit");
        assert!(r.should_retry());
    }

    #[test]
    fn minimal_round_trip_preserves_reason() {
        let r = TerminationResult::from_minimal(true, "done early");
        let (terminate, reason) = r.to_minimal();
        assert!(terminate);
        assert_eq!(reason, "done early");
    }
}
