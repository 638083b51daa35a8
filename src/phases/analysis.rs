use crate::error::{EngineError, Result};
use crate::groupchat::Message;
use crate::model::{AnalysisPayload, Phase, PhasePayload};

use super::{final_message_json, final_message_text, PhaseStep, PhaseStepConfig};

/// Detects the source platform and inventories the files that need
/// converting.
pub struct AnalysisStep {
    config: PhaseStepConfig,
}

impl Default for AnalysisStep {
    fn default() -> Self {
        Self {
            config: PhaseStepConfig {
                phase: Phase::Analysis,
                step_name: "analysis",
                roles: vec!["platform_analyst", "workload_surveyor"],
                phase_retry: 1,
            },
        }
    }
}

impl PhaseStep for AnalysisStep {
    fn config(&self) -> &PhaseStepConfig {
        &self.config
    }

    fn build_payload(&self, transcript: &[Message]) -> Result<PhasePayload> {
        let json = final_message_json(transcript);
        let detected_platform = json
            .as_ref()
            .and_then(|v| v.get("detected_platform"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        let files_discovered = json
            .as_ref()
            .and_then(|v| v.get("files_discovered"))
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        if files_discovered.is_empty() {
            return Err(EngineError::validation(
                "analysis completed without discovering any source files",
            ));
        }

        Ok(PhasePayload::Analysis(AnalysisPayload {
            detected_platform,
            files_discovered,
            narrative: Some(final_message_text(transcript).to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> Message {
        Message {
            agent_name: "platform_analyst".into(),
            content: content.into(),
        }
    }

    #[test]
    fn extracts_platform_and_files_from_json_tail() {
        let step = AnalysisStep::default();
        let transcript = vec![msg(
            r#"Analysis complete. {"detected_platform": "eks", "files_discovered": ["deployment.yaml", "service.yaml"]}"#,
        )];
        let payload = step.build_payload(&transcript).unwrap();
        match payload {
            PhasePayload::Analysis(p) => {
                assert_eq!(p.detected_platform, "eks");
                assert_eq!(p.files_discovered.len(), 2);
            }
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn rejects_empty_file_list() {
        let step = AnalysisStep::default();
        let transcript = vec![msg(r#"{"detected_platform": "eks", "files_discovered": []}"#)];
        assert!(step.build_payload(&transcript).is_err());
    }
}
