//! Events emitted while an agent works on a task, and the parser for the
//! runtime's `stream-json` output.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single unit of task output.
///
/// Serialized with a `"type"` discriminator; text chunks are
/// `{"type":"text","content":"..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Answer text from the assistant.
    Text { content: String },
    /// The agent invoked a tool.
    ToolCall {
        tool: String,
        input: serde_json::Value,
    },
    /// A tool returned.
    ToolResult {
        tool: String,
        output: serde_json::Value,
    },
    TokenUsage {
        input_tokens: u64,
        output_tokens: u64,
    },
    /// The runtime reported a failure.
    Error { message: String },
    /// The run finished.
    Completed,
}

impl TaskEvent {
    /// Text payload, if this is a text event.
    pub fn text(&self) -> Option<&str> {
        match self {
            TaskEvent::Text { content } => Some(content),
            _ => None,
        }
    }
}

fn usage_event(usage: &serde_json::Value) -> Option<TaskEvent> {
    let input_tokens = usage.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
    let output_tokens = usage.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0);
    (input_tokens > 0 || output_tokens > 0).then_some(TaskEvent::TokenUsage {
        input_tokens,
        output_tokens,
    })
}

fn tool_name(v: &serde_json::Value) -> String {
    v.get("name")
        .or_else(|| v.get("tool"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Parse one JSONL line of `stream-json` output into zero or more events.
///
/// Returns `Err` only for malformed JSON; callers log it and keep reading.
/// The final `result` line repeats the answer text already streamed in
/// `assistant` lines, so only its usage (or its failure) is kept.
pub fn parse_stream_json_line(line: &str) -> Result<Vec<TaskEvent>> {
    let v: serde_json::Value =
        serde_json::from_str(line).context("malformed JSON in stream output")?;

    let mut events = Vec::new();
    let event_type = v.get("type").and_then(|t| t.as_str()).unwrap_or("");

    match event_type {
        "assistant" => {
            let Some(message) = v.get("message") else {
                return Ok(events);
            };
            if let Some(blocks) = message.get("content").and_then(|c| c.as_array()) {
                for block in blocks {
                    match block.get("type").and_then(|t| t.as_str()).unwrap_or("") {
                        "text" => {
                            if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                                events.push(TaskEvent::Text {
                                    content: text.to_string(),
                                });
                            }
                        }
                        "tool_use" => events.push(TaskEvent::ToolCall {
                            tool: tool_name(block),
                            input: block.get("input").cloned().unwrap_or_default(),
                        }),
                        _ => {}
                    }
                }
            }
            events.extend(message.get("usage").and_then(usage_event));
        }

        "user" => {
            // Tool results come back wrapped in a user turn.
            if let Some(blocks) = v
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(|c| c.as_array())
            {
                for block in blocks {
                    if block.get("type").and_then(|t| t.as_str()) == Some("tool_result") {
                        events.push(TaskEvent::ToolResult {
                            tool: block
                                .get("tool_use_id")
                                .and_then(|id| id.as_str())
                                .unwrap_or("unknown")
                                .to_string(),
                            output: block.get("content").cloned().unwrap_or_default(),
                        });
                    }
                }
            }
        }

        "tool_use" => events.push(TaskEvent::ToolCall {
            tool: tool_name(&v),
            input: v.get("input").cloned().unwrap_or_default(),
        }),

        "tool_result" => events.push(TaskEvent::ToolResult {
            tool: tool_name(&v),
            output: v
                .get("output")
                .or_else(|| v.get("content"))
                .cloned()
                .unwrap_or_default(),
        }),

        "result" => {
            let is_error = v.get("is_error").and_then(|e| e.as_bool()).unwrap_or(false);
            if is_error {
                let message = v
                    .get("result")
                    .and_then(|r| r.as_str())
                    .or_else(|| v.get("subtype").and_then(|s| s.as_str()))
                    .unwrap_or("task failed")
                    .to_string();
                events.push(TaskEvent::Error { message });
            }
            events.extend(v.get("usage").and_then(usage_event));
            events.push(TaskEvent::Completed);
        }

        "error" => {
            let message = v
                .get("error")
                .and_then(|e| e.get("message").and_then(|m| m.as_str()))
                .or_else(|| v.get("message").and_then(|m| m.as_str()))
                .unwrap_or("unknown error")
                .to_string();
            events.push(TaskEvent::Error { message });
        }

        other => {
            debug!(event_type = other, "ignoring unrecognised stream-json event type");
        }
    }

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_event_serializes_with_type_marker() {
        let event = TaskEvent::Text {
            content: "hi".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json, serde_json::json!({"type": "text", "content": "hi"}));
    }

    #[test]
    fn text_accessor_only_matches_text() {
        let text = TaskEvent::Text {
            content: "hello".to_string(),
        };
        assert_eq!(text.text(), Some("hello"));
        assert_eq!(TaskEvent::Completed.text(), None);
        assert_eq!(
            TaskEvent::Error {
                message: "x".to_string()
            }
            .text(),
            None
        );
    }

    #[test]
    fn parse_assistant_message_with_text_and_usage() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"Hello, world!"}],"usage":{"input_tokens":10,"output_tokens":5}}}"#;
        let events = parse_stream_json_line(line).unwrap();
        assert_eq!(
            events,
            vec![
                TaskEvent::Text {
                    content: "Hello, world!".to_string()
                },
                TaskEvent::TokenUsage {
                    input_tokens: 10,
                    output_tokens: 5
                },
            ]
        );
    }

    #[test]
    fn parse_assistant_tool_use_block() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"tool_use","name":"Read","input":{"file_path":"src/main.rs"}}]}}"#;
        let events = parse_stream_json_line(line).unwrap();
        assert_eq!(
            events,
            vec![TaskEvent::ToolCall {
                tool: "Read".to_string(),
                input: serde_json::json!({"file_path": "src/main.rs"}),
            }]
        );
    }

    #[test]
    fn parse_user_tool_result_block() {
        let line = r#"{"type":"user","message":{"content":[{"type":"tool_result","tool_use_id":"toolu_1","content":"fn main() {}"}]}}"#;
        let events = parse_stream_json_line(line).unwrap();
        assert_eq!(
            events,
            vec![TaskEvent::ToolResult {
                tool: "toolu_1".to_string(),
                output: serde_json::json!("fn main() {}"),
            }]
        );
    }

    #[test]
    fn parse_result_does_not_repeat_text() {
        let line = r#"{"type":"result","subtype":"success","is_error":false,"result":"Final answer.","usage":{"input_tokens":500,"output_tokens":200}}"#;
        let events = parse_stream_json_line(line).unwrap();
        assert_eq!(
            events,
            vec![
                TaskEvent::TokenUsage {
                    input_tokens: 500,
                    output_tokens: 200
                },
                TaskEvent::Completed,
            ]
        );
    }

    #[test]
    fn parse_failed_result_reports_error() {
        let line = r#"{"type":"result","subtype":"error_max_turns","is_error":true}"#;
        let events = parse_stream_json_line(line).unwrap();
        assert_eq!(
            events,
            vec![
                TaskEvent::Error {
                    message: "error_max_turns".to_string()
                },
                TaskEvent::Completed,
            ]
        );
    }

    #[test]
    fn parse_nested_and_flat_errors() {
        let nested = r#"{"type":"error","error":{"message":"rate limited"}}"#;
        let flat = r#"{"type":"error","message":"bad key"}"#;
        assert_eq!(
            parse_stream_json_line(nested).unwrap(),
            vec![TaskEvent::Error {
                message: "rate limited".to_string()
            }]
        );
        assert_eq!(
            parse_stream_json_line(flat).unwrap(),
            vec![TaskEvent::Error {
                message: "bad key".to_string()
            }]
        );
    }

    #[test]
    fn parse_unknown_type_returns_empty() {
        let line = r#"{"type":"system","subtype":"init"}"#;
        assert!(parse_stream_json_line(line).unwrap().is_empty());
    }

    #[test]
    fn parse_malformed_json_returns_error() {
        assert!(parse_stream_json_line("not json {{").is_err());
    }
}
