use crate::error::Result;
use crate::groupchat::Message;
use crate::model::{DocumentationPayload, Phase, PhasePayload};

use super::{final_message_json, final_message_text, PhaseStep, PhaseStepConfig};

/// Writes the final migration report; the last phase in the pipeline.
pub struct DocumentationStep {
    config: PhaseStepConfig,
}

impl Default for DocumentationStep {
    fn default() -> Self {
        Self {
            config: PhaseStepConfig {
                phase: Phase::Documentation,
                step_name: "documentation",
                roles: vec!["technical_writer"],
                phase_retry: 1,
            },
        }
    }
}

impl PhaseStep for DocumentationStep {
    fn config(&self) -> &PhaseStepConfig {
        &self.config
    }

    fn build_payload(&self, transcript: &[Message]) -> Result<PhasePayload> {
        let json = final_message_json(transcript);
        let final_report_path = json
            .as_ref()
            .and_then(|v| v.get("final_report_path"))
            .and_then(|v| v.as_str())
            .unwrap_or("MIGRATION_REPORT.md")
            .to_string();

        Ok(PhasePayload::Documentation(DocumentationPayload {
            narrative: final_message_text(transcript).to_string(),
            final_report_path,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> Message {
        Message {
            agent_name: "technical_writer".into(),
            content: content.into(),
        }
    }

    #[test]
    fn defaults_report_path_without_structured_output() {
        let step = DocumentationStep::default();
        let transcript = vec![msg("Migration report complete.")];
        let payload = step.build_payload(&transcript).unwrap();
        match payload {
            PhasePayload::Documentation(p) => {
                assert_eq!(p.final_report_path, "MIGRATION_REPORT.md");
                assert_eq!(p.narrative, "Migration report complete.");
            }
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn reads_explicit_report_path() {
        let step = DocumentationStep::default();
        let transcript = vec![msg(r#"{"final_report_path": "reports/final.md"}"#)];
        let payload = step.build_payload(&transcript).unwrap();
        match payload {
            PhasePayload::Documentation(p) => assert_eq!(p.final_report_path, "reports/final.md"),
            _ => panic!("wrong payload variant"),
        }
    }
}
