//! Sequences the four phase steps over one migration job, as the sole
//! writer of `current_phase`, and finalizes the process through telemetry.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::groupchat::observer::AgentResponseObserver;
use crate::groupchat::{SelectionRule, TerminationRule};
use crate::model::{FailureContext, InputContext, Phase, PhasePayload, ProcessState, ProcessStatus};
use crate::phases::{AgentFactory, PhaseOutcome, PhaseStep};
use crate::telemetry::{ProcessOutcome, TelemetryStore};

/// The fixed pipeline: analysis, design, yaml generation, documentation, in
/// that order. Each step advances `ProcessState.current_phase` before it
/// runs and records the outcome after.
pub struct ProcessPipeline {
    steps: Vec<Arc<dyn PhaseStep>>,
    telemetry: Arc<dyn TelemetryStore>,
    agent_factory: Arc<dyn AgentFactory>,
    selection_rule: Arc<dyn SelectionRule>,
    termination_rule: Arc<dyn TerminationRule>,
    observer: Arc<dyn AgentResponseObserver>,
}

pub struct ProcessRunResult {
    pub state: ProcessState,
    pub succeeded: bool,
    pub failure: Option<FailureContext>,
}

impl ProcessPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        steps: Vec<Arc<dyn PhaseStep>>,
        telemetry: Arc<dyn TelemetryStore>,
        agent_factory: Arc<dyn AgentFactory>,
        selection_rule: Arc<dyn SelectionRule>,
        termination_rule: Arc<dyn TerminationRule>,
        observer: Arc<dyn AgentResponseObserver>,
    ) -> Self {
        Self {
            steps,
            telemetry,
            agent_factory,
            selection_rule,
            termination_rule,
            observer,
        }
    }

    /// The process id is a primary key in the telemetry store, so a
    /// redelivered message for an already-finalized process is a no-op
    /// rather than a reprocessing attempt.
    #[instrument(skip_all, fields(process_id = %state.process_id))]
    pub async fn run(&self, mut state: ProcessState, cancellation: &CancellationToken) -> Result<ProcessRunResult> {
        if let Some(snapshot) = self.telemetry.snapshot(&state.process_id).await? {
            match snapshot.status {
                ProcessStatus::Completed => {
                    info!("process {} already completed, treating redelivery as a no-op", state.process_id);
                    state.transition_to(Phase::Completed, crate::telemetry::now())?;
                    return Ok(ProcessRunResult {
                        state,
                        succeeded: true,
                        failure: None,
                    });
                }
                ProcessStatus::Failed => {
                    info!("process {} already failed, treating redelivery as a no-op", state.process_id);
                    state.transition_to(Phase::Failed, crate::telemetry::now())?;
                    return Ok(ProcessRunResult {
                        state,
                        succeeded: false,
                        failure: None,
                    });
                }
                ProcessStatus::Running | ProcessStatus::UnderReview => {
                    warn!("process {} already has a telemetry record in progress, resuming", state.process_id);
                }
            }
        } else {
            self.telemetry
                .create_process(&state.process_id, "initialization", state.current_phase)
                .await?;
        }

        for step in &self.steps {
            let phase = step.config().phase;
            state.transition_to(phase, crate::telemetry::now())?;

            if cancellation.is_cancelled() {
                warn!("process {} cancelled before phase {}", state.process_id, phase.name());
                return self.finalize_failed(state, None).await;
            }

            let input_context = build_input_context(&state);
            let outcome = step
                .run(
                    &state.process_id,
                    self.telemetry.as_ref(),
                    self.agent_factory.as_ref(),
                    self.selection_rule.clone(),
                    self.termination_rule.clone(),
                    self.observer.clone(),
                    cancellation,
                    &input_context,
                )
                .await;

            match outcome {
                PhaseOutcome::Success(result) => {
                    result.validate()?;
                    let payload = result.payload.as_ref().expect("validated success result carries a payload");
                    apply_phase_result(&mut state, phase, payload);
                    state.append_insight(result.message.clone());
                    info!("process {} completed phase {}", state.process_id, phase.name());
                }
                PhaseOutcome::Failed(failure) => {
                    state.append_error(phase, describe_failure(&failure));
                    return self.finalize_failed(state, Some(failure)).await;
                }
            }
        }

        state.transition_to(Phase::Completed, crate::telemetry::now())?;
        self.telemetry
            .finalize(
                &state.process_id,
                ProcessOutcome {
                    succeeded: true,
                    generated_files: Vec::new(),
                    summary: "migration pipeline completed".to_string(),
                },
            )
            .await?;

        Ok(ProcessRunResult {
            state,
            succeeded: true,
            failure: None,
        })
    }

    async fn finalize_failed(&self, mut state: ProcessState, failure: Option<FailureContext>) -> Result<ProcessRunResult> {
        state.transition_to(Phase::Failed, crate::telemetry::now())?;
        let summary = failure.as_ref().map(describe_failure).unwrap_or_else(|| "cancelled".to_string());
        self.telemetry
            .finalize(
                &state.process_id,
                ProcessOutcome {
                    succeeded: false,
                    generated_files: Vec::new(),
                    summary,
                },
            )
            .await?;
        Ok(ProcessRunResult {
            state,
            succeeded: false,
            failure,
        })
    }
}

fn apply_phase_result(state: &mut ProcessState, phase: Phase, payload: &PhasePayload) {
    match phase {
        Phase::Analysis => {
            state.analysis_completed = true;
            if let PhasePayload::Analysis(analysis) = payload {
                if !analysis.detected_platform.is_empty() {
                    state.source_platform = Some(analysis.detected_platform.clone());
                }
                state.discovered_files = analysis.files_discovered.clone();
            }
        }
        Phase::Design => state.design_completed = true,
        Phase::Yaml => state.yaml_completed = true,
        Phase::Documentation => state.documentation_completed = true,
        _ => {}
    }
}

/// Only the keys the collector ever reports on: present source folder,
/// files discovered so far, detected platform, and whether the earlier
/// phases have already produced a result.
fn build_input_context(state: &ProcessState) -> InputContext {
    InputContext {
        source_folder: Some(state.source_folder.clone()).filter(|f| !f.is_empty()),
        analyzed_files: state.discovered_files.clone(),
        platform_detected: state.source_platform.clone(),
        has_analysis_result: state.analysis_completed,
        has_design_result: state.design_completed,
    }
}

fn describe_failure(failure: &FailureContext) -> String {
    match failure {
        FailureContext::System(s) => format!("{}: {}", s.exception_class, s.message),
        FailureContext::HardTermination(h) => h.reason.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groupchat::observer::ToolUsageObserver;
    use crate::groupchat::{Agent, Message};
    use crate::model::{AnalysisPayload, PhasePayload, TerminationResult};
    use crate::phases::PhaseStepConfig;
    use crate::telemetry::InMemoryTelemetryStore;
    use async_trait::async_trait;

    struct EchoAgent(&'static str);

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            self.0
        }
        async fn invoke(&self, _transcript: &[Message]) -> Result<Message> {
            Ok(Message {
                agent_name: self.0.to_string(),
                content: r#"{"detected_platform": "eks", "files_discovered": ["a.yaml"]}"#.to_string(),
            })
        }
    }

    struct StubFactory;

    impl AgentFactory for StubFactory {
        fn create(&self, role: &str) -> Arc<dyn Agent> {
            Arc::new(EchoAgent(Box::leak(role.to_string().into_boxed_str())))
        }
    }

    struct AlwaysSelectFirst;

    #[async_trait]
    impl SelectionRule for AlwaysSelectFirst {
        async fn select_raw(&self, _transcript: &[Message]) -> Result<String> {
            Ok("platform_analyst".to_string())
        }
    }

    struct StopImmediately;

    #[async_trait]
    impl TerminationRule for StopImmediately {
        async fn evaluate(&self, _transcript: &[Message]) -> Result<TerminationResult> {
            Ok(TerminationResult::soft_completion("done"))
        }
    }

    struct SingleAnalysisStep;

    impl PhaseStep for SingleAnalysisStep {
        fn config(&self) -> &PhaseStepConfig {
            static CONFIG: std::sync::OnceLock<PhaseStepConfig> = std::sync::OnceLock::new();
            CONFIG.get_or_init(|| PhaseStepConfig {
                phase: Phase::Analysis,
                step_name: "analysis",
                roles: vec!["platform_analyst"],
                phase_retry: 0,
            })
        }

        fn build_payload(&self, _transcript: &[Message]) -> Result<crate::model::PhasePayload> {
            Ok(PhasePayload::Analysis(AnalysisPayload {
                detected_platform: "eks".into(),
                files_discovered: vec!["a.yaml".into()],
                narrative: None,
            }))
        }
    }

    fn pipeline() -> ProcessPipeline {
        let telemetry: Arc<dyn TelemetryStore> = Arc::new(InMemoryTelemetryStore::new());
        ProcessPipeline::new(
            vec![Arc::new(SingleAnalysisStep)],
            telemetry.clone(),
            Arc::new(StubFactory),
            Arc::new(AlwaysSelectFirst),
            Arc::new(StopImmediately),
            Arc::new(ToolUsageObserver::new(telemetry)),
        )
    }

    #[tokio::test]
    async fn successful_single_step_pipeline_completes() {
        let state = ProcessState::new("p1", "u1", "ws", "src", "out", crate::telemetry::now());
        let result = pipeline().run(state, &CancellationToken::new()).await.unwrap();
        assert!(result.succeeded);
        assert_eq!(result.state.current_phase, Phase::Completed);
        assert!(result.state.analysis_completed);
    }

    #[tokio::test]
    async fn analysis_payload_populates_platform_and_discovered_files() {
        let state = ProcessState::new("p1", "u1", "ws", "src", "out", crate::telemetry::now());
        let result = pipeline().run(state, &CancellationToken::new()).await.unwrap();
        assert_eq!(result.state.source_platform.as_deref(), Some("eks"));
        assert_eq!(result.state.discovered_files, vec!["a.yaml".to_string()]);
    }

    #[tokio::test]
    async fn redelivery_of_a_completed_process_id_is_a_no_op() {
        let telemetry: Arc<dyn TelemetryStore> = Arc::new(InMemoryTelemetryStore::new());
        let pipeline = ProcessPipeline::new(
            vec![Arc::new(SingleAnalysisStep)],
            telemetry.clone(),
            Arc::new(StubFactory),
            Arc::new(AlwaysSelectFirst),
            Arc::new(StopImmediately),
            Arc::new(ToolUsageObserver::new(telemetry.clone())),
        );

        let state = ProcessState::new("p3", "u1", "ws", "src", "out", crate::telemetry::now());
        let first = pipeline.run(state, &CancellationToken::new()).await.unwrap();
        assert!(first.succeeded);

        let redelivered = ProcessState::new("p3", "u1", "ws", "src", "out", crate::telemetry::now());
        let second = pipeline.run(redelivered, &CancellationToken::new()).await.unwrap();
        assert!(second.succeeded);
        assert_eq!(second.state.current_phase, Phase::Completed);
    }

    #[tokio::test]
    async fn cancellation_before_a_phase_finalizes_as_failed() {
        let state = ProcessState::new("p2", "u1", "ws", "src", "out", crate::telemetry::now());
        let token = CancellationToken::new();
        token.cancel();
        let result = pipeline().run(state, &token).await.unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.state.current_phase, Phase::Failed);
    }
}
