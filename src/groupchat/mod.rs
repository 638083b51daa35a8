//! The bounded multi-agent group-chat runtime: given a roster, a selection
//! rule, and a termination rule, runs turns until the termination rule
//! says stop, a turn cap is hit, or a message cap is hit.

pub mod observer;
pub mod selection;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::Result;
use crate::model::TerminationResult;
use observer::AgentResponseObserver;
use selection::parse_agent_selection;

/// One entry in the conversation transcript.
#[derive(Debug, Clone)]
pub struct Message {
    pub agent_name: String,
    pub content: String,
}

/// A participant in the group chat. Implementations wrap the model-service
/// call for a specific agent role; prompt content is out of scope here.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;
    async fn invoke(&self, transcript: &[Message]) -> Result<Message>;
}

/// Decides which agent speaks next.
#[async_trait]
pub trait SelectionRule: Send + Sync {
    async fn select_raw(&self, transcript: &[Message]) -> Result<String>;
}

/// Decides whether the conversation should stop, and with what result.
#[async_trait]
pub trait TerminationRule: Send + Sync {
    async fn evaluate(&self, transcript: &[Message]) -> Result<TerminationResult>;
}

pub struct GroupChatConfig {
    pub turn_cap: usize,
    pub message_cap: usize,
}

impl Default for GroupChatConfig {
    fn default() -> Self {
        Self {
            turn_cap: 25,
            message_cap: 200,
        }
    }
}

pub struct GroupChatRuntime {
    agents: Vec<Arc<dyn Agent>>,
    selection_rule: Arc<dyn SelectionRule>,
    termination_rule: Arc<dyn TerminationRule>,
    observer: Arc<dyn AgentResponseObserver>,
    config: GroupChatConfig,
}

pub struct GroupChatOutcome {
    pub termination: TerminationResult,
    pub transcript: Vec<Message>,
}

impl GroupChatRuntime {
    pub fn new(
        agents: Vec<Arc<dyn Agent>>,
        selection_rule: Arc<dyn SelectionRule>,
        termination_rule: Arc<dyn TerminationRule>,
        observer: Arc<dyn AgentResponseObserver>,
        config: GroupChatConfig,
    ) -> Self {
        Self {
            agents,
            selection_rule,
            termination_rule,
            observer,
            config,
        }
    }

    fn whitelist(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name().to_string()).collect()
    }

    fn find_agent(&self, name: &str) -> Option<&Arc<dyn Agent>> {
        self.agents.iter().find(|a| a.name() == name)
    }

    #[instrument(skip_all, fields(process_id = %process_id))]
    pub async fn run(&self, process_id: &str, step: &str, cancellation: &CancellationToken) -> GroupChatOutcome {
        let mut transcript: Vec<Message> = Vec::new();

        for turn in 0..self.config.turn_cap {
            if cancellation.is_cancelled() {
                return GroupChatOutcome {
                    termination: TerminationResult::hard_timeout("cancelled at a turn boundary"),
                    transcript,
                };
            }

            if transcript.len() >= self.config.message_cap {
                return GroupChatOutcome {
                    termination: crate::model::TerminationResult::new(
                        true,
                        "message cap reached",
                        true,
                        crate::model::TerminationKind::HardResourceLimit,
                        Vec::new(),
                        Vec::new(),
                        0.5,
                    )
                    .expect("hard-resource-limit parameters are valid"),
                    transcript,
                };
            }

            let raw_selection = match self.selection_rule.select_raw(&transcript).await {
                Ok(raw) => raw,
                Err(err) => {
                    info!("selection rule failed on turn {turn}: {err}");
                    self.agents.first().map(|a| a.name().to_string()).unwrap_or_default()
                }
            };
            let decision = parse_agent_selection(&raw_selection, &self.whitelist(), step);

            let Some(agent) = self.find_agent(&decision.primary_choice) else {
                return GroupChatOutcome {
                    termination: TerminationResult::hard_error(
                        format!("selected agent '{}' is not in the roster", decision.primary_choice),
                        0.3,
                    )
                    .expect("hard-error parameters are valid"),
                    transcript,
                };
            };

            let message = match agent.invoke(&transcript).await {
                Ok(msg) => msg,
                Err(err) => {
                    return GroupChatOutcome {
                        termination: TerminationResult::hard_error(format!("agent invocation failed: {err}"), 0.4)
                            .expect("hard-error parameters are valid"),
                        transcript,
                    };
                }
            };

            self.observer.observe(process_id, &message.agent_name, &message.content).await;
            transcript.push(message);

            match self.termination_rule.evaluate(&transcript).await {
                Ok(result) if result.terminate => {
                    return GroupChatOutcome {
                        termination: result,
                        transcript,
                    };
                }
                Ok(_) => continue,
                Err(err) => {
                    return GroupChatOutcome {
                        termination: TerminationResult::hard_error(format!("termination rule failed: {err}"), 0.3)
                            .expect("hard-error parameters are valid"),
                        transcript,
                    };
                }
            }
        }

        GroupChatOutcome {
            termination: TerminationResult::hard_timeout("turn cap exceeded"),
            transcript,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::InMemoryTelemetryStore;

    struct EchoAgent(&'static str);

    #[async_trait]
    impl Agent for EchoAgent {
        fn name(&self) -> &str {
            self.0
        }
        async fn invoke(&self, _transcript: &[Message]) -> Result<Message> {
            Ok(Message {
                agent_name: self.0.to_string(),
                content: format!("{} spoke", self.0),
            })
        }
    }

    struct AlwaysSelect(&'static str);

    #[async_trait]
    impl SelectionRule for AlwaysSelect {
        async fn select_raw(&self, _transcript: &[Message]) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct StopAfterNTurns(usize);

    #[async_trait]
    impl TerminationRule for StopAfterNTurns {
        async fn evaluate(&self, transcript: &[Message]) -> Result<TerminationResult> {
            if transcript.len() >= self.0 {
                Ok(TerminationResult::soft_completion("reached turn target"))
            } else {
                Ok(TerminationResult::continue_conversation())
            }
        }
    }

    #[tokio::test]
    async fn stops_on_soft_completion() {
        let telemetry: Arc<dyn crate::telemetry::TelemetryStore> = Arc::new(InMemoryTelemetryStore::new());
        let runtime = GroupChatRuntime::new(
            vec![Arc::new(EchoAgent("qa"))],
            Arc::new(AlwaysSelect("qa")),
            Arc::new(StopAfterNTurns(2)),
            Arc::new(observer::ToolUsageObserver::new(telemetry)),
            GroupChatConfig::default(),
        );
        let outcome = runtime.run("p1", "analysis", &CancellationToken::new()).await;
        assert!(outcome.termination.is_successful_completion());
        assert_eq!(outcome.transcript.len(), 2);
    }

    #[tokio::test]
    async fn cancellation_yields_hard_timeout() {
        let telemetry: Arc<dyn crate::telemetry::TelemetryStore> = Arc::new(InMemoryTelemetryStore::new());
        let token = CancellationToken::new();
        token.cancel();
        let runtime = GroupChatRuntime::new(
            vec![Arc::new(EchoAgent("qa"))],
            Arc::new(AlwaysSelect("qa")),
            Arc::new(StopAfterNTurns(100)),
            Arc::new(observer::ToolUsageObserver::new(telemetry)),
            GroupChatConfig::default(),
        );
        let outcome = runtime.run("p1", "analysis", &token).await;
        assert_eq!(outcome.termination.kind, crate::model::TerminationKind::HardTimeout);
        assert!(outcome.transcript.is_empty());
    }

    #[tokio::test]
    async fn turn_cap_produces_hard_timeout() {
        let telemetry: Arc<dyn crate::telemetry::TelemetryStore> = Arc::new(InMemoryTelemetryStore::new());
        let runtime = GroupChatRuntime::new(
            vec![Arc::new(EchoAgent("qa"))],
            Arc::new(AlwaysSelect("qa")),
            Arc::new(StopAfterNTurns(usize::MAX)),
            Arc::new(observer::ToolUsageObserver::new(telemetry)),
            GroupChatConfig { turn_cap: 3, message_cap: 200 },
        );
        let outcome = runtime.run("p1", "analysis", &CancellationToken::new()).await;
        assert_eq!(outcome.termination.kind, crate::model::TerminationKind::HardTimeout);
        assert_eq!(outcome.transcript.len(), 3);
    }
}
