//! Passive observer that scans each streamed agent message for tool usage
//! and forwards what it finds to the telemetry store. Detection must never
//! raise: a pattern-matching mistake here should not interrupt a phase.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::telemetry::TelemetryStore;

const PREVIEW_LEN: usize = 160;

struct ToolCategory {
    name: &'static str,
    patterns: &'static [&'static str],
}

static TOOL_CATALOG: Lazy<Vec<ToolCategory>> = Lazy::new(|| {
    vec![
        ToolCategory {
            name: "blob",
            patterns: &["list_blobs_in_container", "download_blob", "upload_blob", "read_blob"],
        },
        ToolCategory {
            name: "file",
            patterns: &["read_file", "write_file", "list_files", "create_file"],
        },
        ToolCategory {
            name: "docs",
            patterns: &["search_docs", "fetch_documentation", "lookup_reference"],
        },
        ToolCategory {
            name: "datetime",
            patterns: &["get_current_time", "get_current_date"],
        },
        ToolCategory {
            name: "context",
            patterns: &["get_library_docs", "resolve_library_id"],
        },
        ToolCategory {
            name: "memory",
            patterns: &["store_memory", "recall_memory", "search_memory"],
        },
        ToolCategory {
            name: "functionapp",
            patterns: &["deploy_function_app", "list_function_apps"],
        },
        ToolCategory {
            name: "infrastructure",
            patterns: &["generate_bicep", "validate_bicep_template", "convert_to_bicep"],
        },
    ]
});

const GENERIC_FUNCTION_INDICATORS: &[&str] = &["calling function", "invoking tool", "executing:"];

struct ToolMatch<'a> {
    category: &'static str,
    action: &'a str,
    context: String,
}

fn first_match<'a>(content: &'a str) -> Option<ToolMatch<'a>> {
    for category in TOOL_CATALOG.iter() {
        for pattern in category.patterns {
            if let Some(pos) = content.find(pattern) {
                let line_start = content[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
                let line_end = content[pos..].find('\n').map(|i| pos + i).unwrap_or(content.len());
                let context = truncate(&content[line_start..line_end]);
                return Some(ToolMatch {
                    category: category.name,
                    action: pattern,
                    context,
                });
            }
        }
    }
    None
}

fn has_generic_invocation(content: &str) -> bool {
    let lower = content.to_lowercase();
    GENERIC_FUNCTION_INDICATORS.iter().any(|marker| lower.contains(marker))
}

/// Truncates on the last UTF-8 char boundary at or before `PREVIEW_LEN`
/// bytes, never in the middle of a multi-byte character.
fn truncate(s: &str) -> String {
    if s.len() <= PREVIEW_LEN {
        return s.to_string();
    }
    let boundary = s
        .char_indices()
        .map(|(i, _)| i)
        .take_while(|&i| i <= PREVIEW_LEN)
        .last()
        .unwrap_or(0);
    format!("{}...", &s[..boundary])
}

/// Invoked once per streamed agent message.
#[async_trait]
pub trait AgentResponseObserver: Send + Sync {
    async fn observe(&self, process_id: &str, agent_name: &str, content: &str);
}

pub struct ToolUsageObserver {
    telemetry: Arc<dyn TelemetryStore>,
}

impl ToolUsageObserver {
    pub fn new(telemetry: Arc<dyn TelemetryStore>) -> Self {
        Self { telemetry }
    }
}

#[async_trait]
impl AgentResponseObserver for ToolUsageObserver {
    async fn observe(&self, process_id: &str, agent_name: &str, content: &str) {
        let outcome = match first_match(content) {
            Some(m) => {
                self.telemetry
                    .track_tool_usage(process_id, agent_name, m.category, m.action, &m.context)
                    .await
            }
            None if has_generic_invocation(content) => {
                self.telemetry
                    .track_tool_usage(process_id, agent_name, "unknown", "function_call", &truncate(content))
                    .await
            }
            None => return,
        };
        if let Err(err) = outcome {
            debug!("tool usage tracking failed for process {process_id}: {err}");
        }
    }
}

/// One observed agent turn, as surfaced to a live-tailing consumer.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub process_id: String,
    pub agent_name: String,
    pub preview: String,
}

/// Forwards every observed message onto an unbounded channel, exposed to
/// callers as a `Stream` rather than a channel receiver so it composes
/// with `StreamExt` combinators the way embedding callers expect.
pub struct ProgressStreamObserver {
    sender: tokio::sync::mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressStreamObserver {
    /// Returns the observer plus the stream of events it will emit. The
    /// stream ends once every clone of the returned observer is dropped.
    pub fn new() -> (Self, UnboundedReceiverStream<ProgressEvent>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, UnboundedReceiverStream::new(receiver))
    }
}

#[async_trait]
impl AgentResponseObserver for ProgressStreamObserver {
    async fn observe(&self, process_id: &str, agent_name: &str, content: &str) {
        let event = ProgressEvent {
            process_id: process_id.to_string(),
            agent_name: agent_name.to_string(),
            preview: truncate(content),
        };
        // A closed/dropped receiver just means nobody is tailing progress;
        // that's not a reason to fail the phase.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn progress_stream_observer_forwards_observed_messages() {
        use futures_util::StreamExt;

        let (observer, mut stream) = ProgressStreamObserver::new();
        observer.observe("p1", "platform_analyst", "looking at deployment.yaml").await;
        drop(observer);

        let event = stream.next().await.unwrap();
        assert_eq!(event.process_id, "p1");
        assert_eq!(event.agent_name, "platform_analyst");
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn detects_blob_tool_from_substring() {
        let m = first_match("calling list_blobs_in_container(\"source\")").unwrap();
        assert_eq!(m.category, "blob");
        assert_eq!(m.action, "list_blobs_in_container");
    }

    #[test]
    fn only_first_match_is_returned() {
        let m = first_match("read_file then write_file").unwrap();
        assert_eq!(m.action, "read_file");
    }

    #[test]
    fn generic_invocation_detected_without_catalog_match() {
        assert!(has_generic_invocation("Invoking tool: custom_helper"));
    }

    #[test]
    fn plain_prose_has_no_match() {
        assert!(first_match("the deployment looks healthy").is_none());
        assert!(!has_generic_invocation("the deployment looks healthy"));
    }

    #[test]
    fn truncate_never_splits_a_multi_byte_char_straddling_the_preview_boundary() {
        let filler = "a".repeat(PREVIEW_LEN - 1);
        let s = format!("{filler}\u{2014}more agent prose that runs well past the preview window");
        let truncated = truncate(&s);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= PREVIEW_LEN + 3);
    }

    #[test]
    fn truncate_passes_through_short_strings_unchanged() {
        assert_eq!(truncate("short"), "short");
    }
}
