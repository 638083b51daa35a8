use crate::error::Result;
use crate::groupchat::Message;
use crate::model::{DesignPayload, Phase, PhasePayload};

use super::{final_message_json, final_message_text, PhaseStep, PhaseStepConfig};

/// Turns the analysis output into a target architecture and migration
/// strategy.
pub struct DesignStep {
    config: PhaseStepConfig,
}

impl Default for DesignStep {
    fn default() -> Self {
        Self {
            config: PhaseStepConfig {
                phase: Phase::Design,
                step_name: "design",
                roles: vec!["solution_architect", "cost_optimizer"],
                phase_retry: 1,
            },
        }
    }
}

impl PhaseStep for DesignStep {
    fn config(&self) -> &PhaseStepConfig {
        &self.config
    }

    fn build_payload(&self, transcript: &[Message]) -> Result<PhasePayload> {
        let json = final_message_json(transcript);
        let architecture_summary = json
            .as_ref()
            .and_then(|v| v.get("architecture_summary"))
            .and_then(|v| v.as_str())
            .unwrap_or_else(|| final_message_text(transcript))
            .to_string();
        let migration_strategy = json
            .as_ref()
            .and_then(|v| v.get("migration_strategy"))
            .and_then(|v| v.as_str())
            .unwrap_or("lift-and-shift")
            .to_string();
        let recommended_target_services = json
            .as_ref()
            .and_then(|v| v.get("recommended_target_services"))
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        Ok(PhasePayload::Design(DesignPayload {
            architecture_summary,
            recommended_target_services,
            migration_strategy,
            narrative: Some(final_message_text(transcript).to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> Message {
        Message {
            agent_name: "solution_architect".into(),
            content: content.into(),
        }
    }

    #[test]
    fn falls_back_to_narrative_without_structured_output() {
        let step = DesignStep::default();
        let transcript = vec![msg("Recommend AKS with managed identity.")];
        let payload = step.build_payload(&transcript).unwrap();
        match payload {
            PhasePayload::Design(p) => {
                assert_eq!(p.architecture_summary, "Recommend AKS with managed identity.");
                assert_eq!(p.migration_strategy, "lift-and-shift");
            }
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn reads_target_services_from_json_tail() {
        let step = DesignStep::default();
        let transcript = vec![msg(
            r#"{"architecture_summary": "AKS cluster with AGIC", "recommended_target_services": ["aks", "acr"], "migration_strategy": "replatform"}"#,
        )];
        let payload = step.build_payload(&transcript).unwrap();
        match payload {
            PhasePayload::Design(p) => {
                assert_eq!(p.recommended_target_services, vec!["aks".to_string(), "acr".to_string()]);
                assert_eq!(p.migration_strategy, "replatform");
            }
            _ => panic!("wrong payload variant"),
        }
    }
}
