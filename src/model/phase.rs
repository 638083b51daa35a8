//! Phase-specific result payloads produced by the four phase steps.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub detected_platform: String,
    pub files_discovered: Vec<String>,
    pub narrative: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignPayload {
    pub architecture_summary: String,
    pub recommended_target_services: Vec<String>,
    pub migration_strategy: String,
    pub narrative: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConversionStatus {
    pub source_file: String,
    pub output_file: String,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YamlPayload {
    pub artifacts: Vec<String>,
    pub conversions: Vec<FileConversionStatus>,
    pub network_analysis: String,
    pub security_analysis: String,
    pub storage_analysis: String,
    pub compute_analysis: String,
    pub narrative: Option<String>,
}

impl YamlPayload {
    /// Render the artifact list and per-file conversion record as the YAML
    /// summary document written alongside the generated manifests.
    pub fn manifest_summary_yaml(&self) -> Result<String> {
        #[derive(Serialize)]
        struct ManifestSummary<'a> {
            artifacts: &'a [String],
            conversions: &'a [FileConversionStatus],
        }

        serde_yaml::to_string(&ManifestSummary {
            artifacts: &self.artifacts,
            conversions: &self.conversions,
        })
        .map_err(|err| EngineError::other(format!("failed to render manifest summary as YAML: {err}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentationPayload {
    pub narrative: String,
    pub final_report_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PhasePayload {
    Analysis(AnalysisPayload),
    Design(DesignPayload),
    Yaml(YamlPayload),
    Documentation(DocumentationPayload),
}

/// The outcome of a single phase attempt. A successful result must carry a
/// payload; this is enforced at construction time rather than left to
/// callers to remember.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseResult {
    pub success: bool,
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub message: String,
    pub payload: Option<PhasePayload>,
}

impl PhaseResult {
    pub fn success(duration: Duration, message: impl Into<String>, payload: PhasePayload) -> Self {
        Self {
            success: true,
            duration,
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn failure(duration: Duration, message: impl Into<String>) -> Self {
        Self {
            success: false,
            duration,
            message: message.into(),
            payload: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.success && self.payload.is_none() {
            return Err(EngineError::validation(
                "a successful phase result must carry a phase-specific payload",
            ));
        }
        Ok(())
    }
}
