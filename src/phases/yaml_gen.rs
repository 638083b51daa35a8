use crate::error::Result;
use crate::groupchat::Message;
use crate::model::{FileConversionStatus, Phase, PhasePayload, YamlPayload};

use super::{final_message_json, final_message_text, PhaseStep, PhaseStepConfig};

/// Converts the design into concrete manifests: network, security, storage,
/// and compute sub-analyses plus one conversion record per source file.
pub struct YamlStep {
    config: PhaseStepConfig,
}

impl Default for YamlStep {
    fn default() -> Self {
        Self {
            config: PhaseStepConfig {
                phase: Phase::Yaml,
                step_name: "yaml_generation",
                roles: vec![
                    "network_engineer",
                    "security_engineer",
                    "storage_engineer",
                    "compute_engineer",
                    "manifest_author",
                ],
                phase_retry: 2,
            },
        }
    }
}

fn string_field(json: &Option<serde_json::Value>, field: &str) -> String {
    json.as_ref()
        .and_then(|v| v.get(field))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

impl PhaseStep for YamlStep {
    fn config(&self) -> &PhaseStepConfig {
        &self.config
    }

    fn build_payload(&self, transcript: &[Message]) -> Result<PhasePayload> {
        let json = final_message_json(transcript);

        let artifacts = json
            .as_ref()
            .and_then(|v| v.get("artifacts"))
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
            .unwrap_or_default();

        let conversions = json
            .as_ref()
            .and_then(|v| v.get("conversions"))
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|entry| {
                        Some(FileConversionStatus {
                            source_file: entry.get("source_file")?.as_str()?.to_string(),
                            output_file: entry.get("output_file")?.as_str()?.to_string(),
                            succeeded: entry.get("succeeded").and_then(|v| v.as_bool()).unwrap_or(false),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(PhasePayload::Yaml(YamlPayload {
            artifacts,
            conversions,
            network_analysis: string_field(&json, "network_analysis"),
            security_analysis: string_field(&json, "security_analysis"),
            storage_analysis: string_field(&json, "storage_analysis"),
            compute_analysis: string_field(&json, "compute_analysis"),
            narrative: Some(final_message_text(transcript).to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> Message {
        Message {
            agent_name: "manifest_author".into(),
            content: content.into(),
        }
    }

    #[test]
    fn extracts_conversions_and_sub_analyses() {
        let step = YamlStep::default();
        let transcript = vec![msg(
            r#"{"artifacts": ["deployment.yaml"], "conversions": [{"source_file": "app.yml", "output_file": "deployment.yaml", "succeeded": true}], "network_analysis": "uses AGIC ingress", "security_analysis": "workload identity", "storage_analysis": "azure disk", "compute_analysis": "standard_d4s"}"#,
        )];
        let payload = step.build_payload(&transcript).unwrap();
        match payload {
            PhasePayload::Yaml(p) => {
                assert_eq!(p.conversions.len(), 1);
                assert!(p.conversions[0].succeeded);
                assert_eq!(p.network_analysis, "uses AGIC ingress");
            }
            _ => panic!("wrong payload variant"),
        }
    }

    #[test]
    fn missing_structured_output_yields_empty_conversions() {
        let step = YamlStep::default();
        let transcript = vec![msg("manifests are on disk")];
        let payload = step.build_payload(&transcript).unwrap();
        match payload {
            PhasePayload::Yaml(p) => assert!(p.conversions.is_empty()),
            _ => panic!("wrong payload variant"),
        }
    }
}
