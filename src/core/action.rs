//! Action envelope parsing from thread service responses.
//!
//! The model must reply with a JSON object of the form
//! `{"actions": [{"type": "message", "text": ...}, ...]}`, optionally
//! wrapped in a ```json fence. Parsing is synchronous and side-effect free:
//! it never consults the workspace or the command runner.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde_json::Value;

use crate::core::path::sanitize_path;

/// One step of the agent's plan for a single iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Informational note; no side effect beyond the transcript.
    Message { text: String },
    /// Full replacement of a workspace file's contents.
    UpdateFile { path: String, content: String },
    /// Execution of exactly one allow-listed command string.
    RunCommand { command: String },
    /// Request to terminate the run successfully.
    Finish { summary: String },
}

static JSON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json\s*(.*?)```").unwrap());

/// Parse the ordered action list out of a raw model response.
///
/// A fenced ```json block, when present, is the candidate payload; otherwise
/// the entire response text is. A payload that is not valid JSON propagates
/// the underlying parse error unchanged and is fatal for the run.
pub fn parse_actions(response_text: &str) -> Result<Vec<Action>> {
    let candidate = JSON_FENCE_RE
        .captures(response_text)
        .and_then(|caps| caps.get(1))
        .map_or(response_text, |m| m.as_str());

    let envelope: Value = serde_json::from_str(candidate).context("parse agent response json")?;
    let actions = envelope
        .get("actions")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Agent response missing actions array."))?;

    actions.iter().map(parse_action).collect()
}

fn parse_action(raw: &Value) -> Result<Action> {
    let kind = field_string(raw, "type");
    if kind.is_empty() {
        return Err(anyhow!("Agent action missing type."));
    }

    match kind.as_str() {
        "message" => Ok(Action::Message {
            text: field_string(raw, "text"),
        }),
        "update_file" => Ok(Action::UpdateFile {
            path: sanitize_path(&field_string(raw, "path"))?,
            content: field_string(raw, "content"),
        }),
        "run_command" => Ok(Action::RunCommand {
            command: field_string(raw, "command"),
        }),
        "finish" => Ok(Action::Finish {
            summary: field_string(raw, "summary"),
        }),
        other => Err(anyhow!("Unsupported action type: {other}")),
    }
}

/// Read a declared field as a string, coercing other primitives and
/// defaulting missing or null fields to the empty string.
fn field_string(raw: &Value, key: &str) -> String {
    match raw.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json_envelope() {
        let actions = parse_actions(
            r#"{"actions":[{"type":"message","text":"hi"},{"type":"finish","summary":"done"}]}"#,
        )
        .expect("parse");

        assert_eq!(
            actions,
            vec![
                Action::Message {
                    text: "hi".to_string()
                },
                Action::Finish {
                    summary: "done".to_string()
                },
            ]
        );
    }

    #[test]
    fn parses_fenced_json_with_surrounding_prose() {
        let response = "Here is my plan:\n```json\n{\"actions\":[{\"type\":\"run_command\",\"command\":\"npm install\"}]}\n```\nThanks!";
        let actions = parse_actions(response).expect("parse");
        assert_eq!(
            actions,
            vec![Action::RunCommand {
                command: "npm install".to_string()
            }]
        );
    }

    #[test]
    fn fence_tag_is_case_insensitive() {
        let response = "```JSON\n{\"actions\":[]}\n```";
        assert!(parse_actions(response).expect("parse").is_empty());
    }

    #[test]
    fn missing_actions_array_fails() {
        for payload in ["{}", r#"{"actions": "nope"}"#, "[]", "3"] {
            let err = parse_actions(payload).unwrap_err();
            assert!(
                err.to_string().contains("missing actions array"),
                "payload: {payload}"
            );
        }
    }

    #[test]
    fn malformed_json_propagates_parse_error() {
        let err = parse_actions("```json\n{invalid json}\n```").unwrap_err();
        assert!(err.to_string().contains("parse agent response json"));
    }

    #[test]
    fn action_without_type_fails() {
        let err = parse_actions(r#"{"actions":[{"text":"hi"}]}"#).unwrap_err();
        assert!(err.to_string().contains("missing type"));
    }

    #[test]
    fn non_object_action_fails_as_missing_type() {
        let err = parse_actions(r#"{"actions":[null]}"#).unwrap_err();
        assert!(err.to_string().contains("missing type"));
    }

    #[test]
    fn unsupported_type_names_the_offender() {
        let err = parse_actions(r#"{"actions":[{"type":"unexpected"}]}"#).unwrap_err();
        assert!(err.to_string().contains("Unsupported action type: unexpected"));
    }

    #[test]
    fn missing_fields_default_to_empty_strings() {
        let actions = parse_actions(r#"{"actions":[{"type":"message"}]}"#).expect("parse");
        assert_eq!(
            actions,
            vec![Action::Message {
                text: String::new()
            }]
        );
    }

    #[test]
    fn non_string_fields_are_coerced() {
        let actions = parse_actions(r#"{"actions":[{"type":"message","text":42}]}"#).expect("parse");
        assert_eq!(
            actions,
            vec![Action::Message {
                text: "42".to_string()
            }]
        );
    }

    #[test]
    fn unsafe_update_file_path_fails_during_parsing() {
        let err = parse_actions(
            r#"{"actions":[{"type":"update_file","path":"../outside.txt","content":"x"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("is not allowed"));
    }

    #[test]
    fn update_file_path_separators_are_normalized() {
        let actions = parse_actions(
            r#"{"actions":[{"type":"update_file","path":"src\\app.ts","content":"x"}]}"#,
        )
        .expect("parse");
        assert_eq!(
            actions,
            vec![Action::UpdateFile {
                path: "src/app.ts".to_string(),
                content: "x".to_string()
            }]
        );
    }
}
