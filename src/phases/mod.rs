//! The four phase steps share one execution shape: mark the phase
//! started, assemble the agent roster for that phase, delegate to the
//! group-chat runtime, and interpret the resulting termination.

pub mod analysis;
pub mod design;
pub mod documentation;
pub mod yaml_gen;

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::groupchat::observer::AgentResponseObserver;
use crate::groupchat::{Agent, GroupChatConfig, GroupChatRuntime, Message, SelectionRule, TerminationRule};
use crate::model::{
    build_hard_termination_failure, build_system_failure, extract_input_files, summarize_input_context, FailureContext,
    InputContext, Phase, PhasePayload, PhaseResult,
};
use crate::telemetry::TelemetryStore;

pub use analysis::AnalysisStep;
pub use design::DesignStep;
pub use documentation::DocumentationStep;
pub use yaml_gen::YamlStep;

/// Builds the concrete agent for a named role. Agent prompt content lives
/// entirely behind this trait; the engine only ever references roles by
/// name.
pub trait AgentFactory: Send + Sync {
    fn create(&self, role: &str) -> Arc<dyn Agent>;
}

/// Final agent message in the transcript, or an empty string if the
/// conversation somehow produced none.
pub(crate) fn final_message_text(transcript: &[Message]) -> &str {
    transcript.last().map(|m| m.content.as_str()).unwrap_or("")
}

/// Best-effort JSON object embedded in the final message; phase payload
/// builders fall back to treating the whole message as narrative text
/// when the agent didn't emit structured output.
pub(crate) fn final_message_json(transcript: &[Message]) -> Option<serde_json::Value> {
    let text = final_message_text(transcript);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    serde_json::from_str(&text[start..=end]).ok()
}

pub struct PhaseStepConfig {
    pub phase: Phase,
    pub step_name: &'static str,
    pub roles: Vec<&'static str>,
    pub phase_retry: u32,
}

pub enum PhaseOutcome {
    Success(PhaseResult),
    Failed(FailureContext),
}

#[async_trait]
pub trait PhaseStep: Send + Sync {
    fn config(&self) -> &PhaseStepConfig;

    /// Extract the phase-specific payload from the finished conversation.
    fn build_payload(&self, transcript: &[Message]) -> Result<PhasePayload>;

    #[allow(clippy::too_many_arguments)]
    async fn run(
        &self,
        process_id: &str,
        telemetry: &dyn TelemetryStore,
        agent_factory: &dyn AgentFactory,
        selection_rule: Arc<dyn SelectionRule>,
        termination_rule: Arc<dyn TerminationRule>,
        observer: Arc<dyn AgentResponseObserver>,
        cancellation: &CancellationToken,
        input_context: &InputContext,
    ) -> PhaseOutcome {
        let config = self.config();
        let _ = telemetry.set_phase(process_id, config.phase, config.step_name).await;

        let roster: Vec<Arc<dyn Agent>> = config.roles.iter().map(|role| agent_factory.create(role)).collect();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let runtime = GroupChatRuntime::new(
                roster.clone(),
                selection_rule.clone(),
                termination_rule.clone(),
                observer.clone(),
                GroupChatConfig::default(),
            );
            let start = Instant::now();
            let outcome = runtime.run(process_id, config.step_name, cancellation).await;
            let elapsed = start.elapsed();

            if outcome.termination.is_successful_completion() {
                return match self.build_payload(&outcome.transcript) {
                    Ok(payload) => PhaseOutcome::Success(PhaseResult::success(elapsed, outcome.termination.reason.clone(), payload)),
                    Err(err) => {
                        let exception_module = err.exception_module();
                        let exception_args = err.exception_args();
                        let exception_cause = err.exception_cause();
                        let exception_context = err.exception_context();
                        PhaseOutcome::Failed(FailureContext::System(build_system_failure(
                            "PayloadExtractionError",
                            err.to_string(),
                            None,
                            process_id,
                            config.step_name,
                            config.phase.name(),
                            summarize_input_context(input_context),
                            exception_module,
                            exception_args,
                            exception_cause,
                            exception_context,
                            Utc::now(),
                        )))
                    }
                };
            }

            if outcome.termination.should_retry() && attempt <= config.phase_retry {
                continue;
            }

            if outcome.termination.is_blocking_termination() {
                return PhaseOutcome::Failed(FailureContext::HardTermination(build_hard_termination_failure(
                    &outcome.termination,
                    extract_input_files(input_context),
                )));
            }

            return PhaseOutcome::Failed(FailureContext::System(build_system_failure(
                "PhaseTerminationError",
                outcome.termination.reason.clone(),
                None,
                process_id,
                config.step_name,
                config.phase.name(),
                summarize_input_context(input_context),
                "",
                Vec::new(),
                None,
                None,
                Utc::now(),
            )));
        }
    }
}
