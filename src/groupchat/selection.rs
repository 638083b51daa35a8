//! Robust extraction of the next agent's name from a selection step's raw
//! (and often messy) free-form response.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::model::SelectionDecision;

const STRIP_PREFIXES: &[&str] = &[
    "select ",
    "selected ",
    "agent: ",
    "next: ",
    "next agent: ",
    "choose ",
    "i choose ",
    "the next agent is ",
];

const TERMINAL_WORDS: &[&str] = &[
    "success", "complete", "terminate", "finished", "done", "end", "yes", "no", "true", "false",
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w]").unwrap());

#[derive(Debug, Deserialize)]
struct JsonSelection {
    result: String,
    #[serde(default)]
    reason: Option<String>,
}

/// Step name -> human-readable expertise phrase, used to compose a reason
/// string when the model didn't supply one.
fn expertise_for_step(step: &str) -> &'static str {
    match step {
        "analysis" => "platform and workload analysis",
        "design" => "target architecture design",
        "yaml" => "Kubernetes manifest conversion",
        "documentation" => "migration documentation",
        _ => "this step",
    }
}

fn sanitize_agent_name(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let first_line = trimmed.lines().next().unwrap_or("");
    let stripped_invisible: String = first_line
        .chars()
        .filter(|c| !c.is_control() && *c != '\u{feff}' && *c != '\u{200b}')
        .collect();
    let mut candidate = stripped_invisible.trim().to_lowercase();
    for prefix in STRIP_PREFIXES {
        if candidate.starts_with(prefix) {
            candidate = candidate[prefix.len()..].to_string();
            break;
        }
    }
    let normalized = WHITESPACE.replace_all(candidate.trim(), "_");
    NON_WORD.replace_all(&normalized, "").to_string()
}

fn is_terminal_word(candidate: &str) -> bool {
    TERMINAL_WORDS.contains(&candidate)
}

fn find_closest_agent(candidate: &str, whitelist: &[String]) -> Option<String> {
    if candidate.is_empty() {
        return None;
    }
    if let Some(exact) = whitelist.iter().find(|name| name.to_lowercase() == candidate) {
        return Some(exact.clone());
    }
    whitelist
        .iter()
        .find(|name| {
            let lower = name.to_lowercase();
            lower.contains(candidate) || candidate.contains(&lower)
        })
        .cloned()
}

/// Parse a selection-step response into a resolved agent name plus the
/// reasoning behind it. Never fails: absent a confident match, falls back
/// to the first whitelisted agent and logs a warning. When `whitelist` is
/// empty, the sanitized (possibly empty) candidate name is returned as-is.
pub fn parse_agent_selection(raw: &str, whitelist: &[String], step: &str) -> SelectionDecision {
    if let Ok(parsed) = serde_json::from_str::<JsonSelection>(raw.trim()) {
        let reason = parsed
            .reason
            .unwrap_or_else(|| format!("Selected {} for {}", parsed.result, expertise_for_step(step)));
        return SelectionDecision::new(parsed.result, reason);
    }

    let candidate = sanitize_agent_name(raw);
    let candidate = if is_terminal_word(&candidate) {
        String::new()
    } else {
        candidate
    };

    if whitelist.is_empty() {
        let reason = format!("Selected {candidate} for {}", expertise_for_step(step));
        return SelectionDecision::new(candidate, reason);
    }

    match find_closest_agent(&candidate, whitelist) {
        Some(name) => {
            let reason = format!("Selected {name} for {}", expertise_for_step(step));
            SelectionDecision::new(name, reason)
        }
        None => {
            warn!("could not resolve agent selection from '{raw}', falling back to first whitelisted agent");
            let fallback = whitelist[0].clone();
            let reason = format!(
                "Fell back to {fallback} for {} after an unresolvable selection response",
                expertise_for_step(step)
            );
            SelectionDecision::new(fallback, reason)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn whitelist() -> Vec<String> {
        vec!["QA_Engineer".to_string(), "Architect".to_string()]
    }

    #[test]
    fn json_response_parses_directly() {
        let decision = parse_agent_selection(r#"{"result": "Architect", "reason": "needs design"}"#, &whitelist(), "design");
        assert_eq!(decision.primary_choice, "Architect");
        assert_eq!(decision.reasoning, "needs design");
    }

    #[test]
    fn free_text_with_prefix_resolves_by_exact_match() {
        let decision = parse_agent_selection("Select QA_Engineer\nBecause tests are needed", &whitelist(), "yaml");
        assert_eq!(decision.primary_choice, "QA_Engineer");
    }

    #[test]
    fn fuzzy_substring_match_resolves_case_insensitively() {
        let decision = parse_agent_selection("i choose the architect to continue", &whitelist(), "design");
        assert_eq!(decision.primary_choice, "Architect");
    }

    #[test]
    fn terminal_word_forces_fallback_to_first_whitelisted() {
        let decision = parse_agent_selection("Terminate", &whitelist(), "analysis");
        assert_eq!(decision.primary_choice, "QA_Engineer");
    }

    #[test]
    fn unresolvable_text_falls_back_to_first_whitelisted() {
        let decision = parse_agent_selection("???", &whitelist(), "analysis");
        assert_eq!(decision.primary_choice, "QA_Engineer");
    }

    #[test]
    fn empty_whitelist_returns_sanitized_candidate_verbatim() {
        let decision = parse_agent_selection("Select Reviewer", &[], "analysis");
        assert_eq!(decision.primary_choice, "reviewer");
    }
}
