//! Real-time structured-call executor.
//!
//! Scans text forwarded by the [`crate::formatter::InlineCallFormatter`] for the
//! canonical `TOOL_CALL:` marker, accumulates the structured object that follows it
//! across arbitrary chunk boundaries, validates and dispatches the call against a
//! [`crate::tools::ToolRegistry`], and splices the tool's result back into the output
//! in place of the marker and object.

use crate::history::{CallHistory, CallHistoryEntry, ErrorKind};
use crate::tools::ToolRegistry;
use serde_json::Value;
use std::time::Duration;

const MARKER: &str = "TOOL_CALL:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Scan,
    AwaitObject,
    InObject,
}

/// Streaming state machine that locates `TOOL_CALL:` markers, accumulates the
/// structured object that follows, and dispatches it to the registry.
pub struct StructuredCallExecutor {
    registry: ToolRegistry,
    default_timeout: Duration,
    state: State,
    buffer: String,
    object_buffer: String,
    brace_depth: i32,
    in_string: bool,
    escaped: bool,
    history: CallHistory,
}

impl StructuredCallExecutor {
    pub fn new(registry: ToolRegistry, default_timeout: Duration) -> Self {
        Self {
            registry,
            default_timeout,
            state: State::Scan,
            buffer: String::new(),
            object_buffer: String::new(),
            brace_depth: 0,
            in_string: false,
            escaped: false,
            history: CallHistory::new(),
        }
    }

    pub fn history(&self) -> &CallHistory {
        &self.history
    }

    /// Feed text that may contain zero or more structured calls. Returns the text
    /// with each marker-and-object replaced by the corresponding tool's output.
    pub async fn feed(&mut self, text: &str) -> String {
        self.buffer.push_str(text);
        let mut output = String::new();

        loop {
            match self.state {
                State::Scan => {
                    let Some(idx) = self.buffer.find(MARKER) else {
                        let keep = longest_marker_suffix(&self.buffer);
                        let emit_len = self.buffer.len() - keep;
                        output.push_str(&self.buffer[..emit_len]);
                        self.buffer.drain(..emit_len);
                        break;
                    };
                    output.push_str(&self.buffer[..idx]);
                    self.buffer.drain(..idx + MARKER.len());
                    self.state = State::AwaitObject;
                }
                State::AwaitObject => {
                    let trimmed_start = self
                        .buffer
                        .find(|c: char| !c.is_whitespace())
                        .unwrap_or(self.buffer.len());
                    if trimmed_start == self.buffer.len() {
                        // All whitespace so far; keep waiting without losing it.
                        break;
                    }
                    if self.buffer.as_bytes()[trimmed_start] != b'{' {
                        // Not actually an object: recover by emitting the marker
                        // literally and resuming the scan from here.
                        tracing::warn!("TOOL_CALL: marker not followed by an object");
                        output.push_str(MARKER);
                        self.state = State::Scan;
                        continue;
                    }
                    self.buffer.drain(..trimmed_start);
                    self.buffer.remove(0);
                    self.object_buffer.clear();
                    self.object_buffer.push('{');
                    self.brace_depth = 1;
                    self.in_string = false;
                    self.escaped = false;
                    self.state = State::InObject;
                }
                State::InObject => {
                    let chars: Vec<char> = self.buffer.chars().collect();
                    let mut consumed = 0;
                    let mut completed = false;
                    for ch in chars {
                        consumed += ch.len_utf8();
                        self.object_buffer.push(ch);
                        self.accumulate(ch);
                        if self.brace_depth == 0 {
                            completed = true;
                            break;
                        }
                    }
                    self.buffer.drain(..consumed);

                    if !completed {
                        break;
                    }

                    let object_text = std::mem::take(&mut self.object_buffer);
                    let result = self.dispatch(&object_text).await;
                    output.push('\n');
                    output.push_str(&result);
                    output.push('\n');
                    self.state = State::Scan;
                }
            }
        }

        output
    }

    fn accumulate(&mut self, ch: char) {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            return;
        }

        match ch {
            '"' => self.in_string = true,
            '{' => self.brace_depth += 1,
            '}' => self.brace_depth -= 1,
            _ => {}
        }
    }

    /// Parse, validate, and dispatch one complete structured-object text (including
    /// its surrounding braces), returning the text to splice into the output.
    async fn dispatch(&mut self, object_text: &str) -> String {
        let parsed: Value = match serde_json::from_str(object_text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "malformed structured call object");
                self.history
                    .push(CallHistoryEntry::fail("", Value::Null, ErrorKind::ParseError));
                return format!("[TOOL ERROR: PARSE_ERROR: {e}]");
            }
        };

        let Some(obj) = parsed.as_object() else {
            self.history
                .push(CallHistoryEntry::fail("", Value::Null, ErrorKind::ParseError));
            return "[TOOL ERROR: PARSE_ERROR: structured call must be a JSON object]".to_string();
        };

        let Some(tool_name) = obj.get("tool").and_then(Value::as_str) else {
            self.history
                .push(CallHistoryEntry::fail("", Value::Null, ErrorKind::BadShape));
            return "[TOOL ERROR: BAD_SHAPE: missing 'tool' field]".to_string();
        };

        let Some(input_schema) = obj.get("input_schema") else {
            self.history.push(CallHistoryEntry::fail(
                tool_name,
                Value::Null,
                ErrorKind::BadShape,
            ));
            return "[TOOL ERROR: BAD_SHAPE: missing 'input_schema' field]".to_string();
        };

        if !input_schema.is_object() {
            self.history.push(CallHistoryEntry::fail(
                tool_name,
                input_schema.clone(),
                ErrorKind::BadShape,
            ));
            return "[TOOL ERROR: BAD_SHAPE: 'input_schema' must be an object]".to_string();
        }

        let Some(tool) = self.registry.get(tool_name) else {
            tracing::warn!(tool = tool_name, "dispatch to unknown tool");
            self.history.push(CallHistoryEntry::fail(
                tool_name,
                input_schema.clone(),
                ErrorKind::UnknownTool,
            ));
            return format!("[TOOL ERROR: UNKNOWN_TOOL: '{tool_name}' is not registered]");
        };

        if let Err(violation) = tool.schema().validate(input_schema) {
            tracing::warn!(tool = tool_name, error = %violation, "tool input failed schema validation");
            self.history.push(CallHistoryEntry::fail(
                tool_name,
                input_schema.clone(),
                ErrorKind::BadShape,
            ));
            return format!("[TOOL ERROR: BAD_SHAPE: {violation}]");
        }

        let timeout = tool.timeout().unwrap_or(self.default_timeout);
        let input = input_schema.clone();
        match tokio::time::timeout(timeout, tool.invoke(input.clone())).await {
            Ok(result) if result.is_ok() => {
                tracing::info!(tool = tool_name, status = "ok", "tool dispatched");
                self.history.push(CallHistoryEntry::ok(
                    tool_name,
                    input,
                    result.content.clone(),
                ));
                result.content
            }
            Ok(result) => {
                tracing::info!(tool = tool_name, status = "fail", "tool dispatched");
                self.history.push(CallHistoryEntry::fail(
                    tool_name,
                    input,
                    ErrorKind::ToolFailure,
                ));
                format!("[TOOL ERROR: TOOL_FAILURE: {}]", result.content)
            }
            Err(_) => {
                tracing::warn!(tool = tool_name, timeout_ms = timeout.as_millis() as u64, "tool invocation timed out");
                self.history.push(CallHistoryEntry::fail(
                    tool_name,
                    input,
                    ErrorKind::ToolTimeout,
                ));
                format!(
                    "[TOOL ERROR: TOOL_TIMEOUT: '{tool_name}' exceeded {:?}]",
                    timeout
                )
            }
        }
    }

    /// Clear buffer, state, and history. Called at the start of a new LLM turn.
    pub fn reset(&mut self) {
        self.state = State::Scan;
        self.buffer.clear();
        self.object_buffer.clear();
        self.brace_depth = 0;
        self.in_string = false;
        self.escaped = false;
        self.history.clear();
    }
}

/// Length of the longest suffix of `buf` that is a strict prefix of the marker, so it
/// can be retained in case the rest of the marker arrives in the next chunk.
fn longest_marker_suffix(buf: &str) -> usize {
    let max = MARKER.len().saturating_sub(1).min(buf.len());
    for len in (1..=max).rev() {
        if buf.ends_with(&MARKER[..len]) {
            return len;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FieldKind, ToolResult, tool};

    fn registry() -> ToolRegistry {
        ToolRegistry::builder()
            .tool(
                tool("shell", "Run a shell command")
                    .field("command", FieldKind::String, true)
                    .build(|input| async move {
                        let command = input["command"].as_str().unwrap_or_default();
                        ToolResult::ok(format!("ran: {command}"))
                    }),
            )
            .tool(
                tool("slow", "Never responds in time")
                    .timeout(Duration::from_millis(5))
                    .build(|_| async move {
                        tokio::time::sleep(Duration::from_secs(10)).await;
                        ToolResult::ok("too late")
                    }),
            )
            .tool(
                tool("failer", "Always fails")
                    .build(|_| async move { ToolResult::error("boom") }),
            )
            .build()
    }

    fn executor() -> StructuredCallExecutor {
        StructuredCallExecutor::new(registry(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn dispatches_single_chunk_call() {
        let mut e = executor();
        let out = e
            .feed(r#"TOOL_CALL: {"tool":"shell","input_schema":{"command":"echo hi"}}"#)
            .await;
        assert!(out.contains("ran: echo hi"));
        assert_eq!(e.history().len(), 1);
        assert!(e.history().entries()[0].is_ok());
    }

    #[tokio::test]
    async fn marker_split_across_chunks() {
        let mut e = executor();
        let first = e.feed("prefix TOOL_").await;
        assert_eq!(first, "prefix ");
        let second = e
            .feed(r#"CALL: {"tool":"shell","input_schema":{"command":"echo ok"}} suffix"#)
            .await;
        assert!(second.contains("ran: echo ok"));
        assert!(second.trim_end().ends_with("suffix"));
    }

    #[tokio::test]
    async fn object_split_across_chunks() {
        let mut e = executor();
        let first = e
            .feed(r#"TOOL_CALL: {"tool":"shell","input_schema":{"#)
            .await;
        assert_eq!(first, "");
        let second = e.feed(r#""command":"pwd"}}"#).await;
        assert!(second.contains("ran: pwd"));
    }

    #[tokio::test]
    async fn marker_not_followed_by_object_recovers() {
        let mut e = executor();
        let out = e.feed("TOOL_CALL: not actually json, just words.").await;
        assert!(out.contains("TOOL_CALL:"));
        assert!(out.contains("not actually json"));
        assert!(e.history().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_reports_error() {
        let mut e = executor();
        let out = e
            .feed(r#"TOOL_CALL: {"tool":"nope","input_schema":{}}"#)
            .await;
        assert!(out.contains("UNKNOWN_TOOL"));
        assert!(!e.history().entries()[0].is_ok());
    }

    #[tokio::test]
    async fn bad_shape_missing_field() {
        let mut e = executor();
        let out = e
            .feed(r#"TOOL_CALL: {"tool":"shell","input_schema":{}}"#)
            .await;
        assert!(out.contains("BAD_SHAPE"));
    }

    #[tokio::test]
    async fn malformed_json_is_recovered() {
        let mut e = executor();
        let out = e.feed(r#"TOOL_CALL: {"tool": "shell", }}"#).await;
        assert!(out.contains("TOOL ERROR"));
    }

    #[tokio::test]
    async fn tool_failure_is_annotated() {
        let mut e = executor();
        let out = e
            .feed(r#"TOOL_CALL: {"tool":"failer","input_schema":{}}"#)
            .await;
        assert!(out.contains("TOOL_FAILURE"));
        assert!(out.contains("boom"));
    }

    #[tokio::test]
    async fn tool_timeout_is_annotated() {
        let mut e = executor();
        let out = e
            .feed(r#"TOOL_CALL: {"tool":"slow","input_schema":{}}"#)
            .await;
        assert!(out.contains("TOOL_TIMEOUT"));
    }

    #[tokio::test]
    async fn ordering_two_calls_in_one_fragment() {
        let mut e = executor();
        let out = e
            .feed(
                r#"TOOL_CALL: {"tool":"shell","input_schema":{"command":"a"}} mid TOOL_CALL: {"tool":"shell","input_schema":{"command":"b"}}"#,
            )
            .await;
        let pos_a = out.find("ran: a").unwrap();
        let pos_b = out.find("ran: b").unwrap();
        assert!(pos_a < pos_b);
        assert_eq!(e.history().len(), 2);
    }

    #[tokio::test]
    async fn plain_text_passes_through() {
        let mut e = executor();
        let out = e.feed("just some prose, nothing special").await;
        assert_eq!(out, "just some prose, nothing special");
    }

    #[tokio::test]
    async fn reset_clears_state_and_history() {
        let mut e = executor();
        e.feed(r#"TOOL_CALL: {"tool":"shell","input_schema":{"command":"x"}}"#)
            .await;
        assert_eq!(e.history().len(), 1);
        e.reset();
        assert_eq!(e.history().len(), 0);
        let out = e.feed("TOOL_").await;
        assert_eq!(out, "");
    }
}
