//! Append-only record of tool invocations made by the structured-call executor.

use chrono::{DateTime, Utc};
use serde_json::Value;

/// In-band failure kinds the pipeline can recover from without raising to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed structured object after the marker.
    ParseError,
    /// `tool` field did not name a registered tool.
    UnknownTool,
    /// Missing required fields or a field of the wrong kind.
    BadShape,
    /// The tool's invoker returned an error status.
    ToolFailure,
    /// The tool's invoker exceeded its timeout.
    ToolTimeout,
    /// An inline call's projected input failed schema validation.
    ValidationError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::UnknownTool => "UNKNOWN_TOOL",
            ErrorKind::BadShape => "BAD_SHAPE",
            ErrorKind::ToolFailure => "TOOL_FAILURE",
            ErrorKind::ToolTimeout => "TOOL_TIMEOUT",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a call history entry records a success or a recovered failure.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    Ok { result_content: String },
    Fail { error_kind: ErrorKind },
}

/// One append-only record of a dispatched (or attempted) tool call.
#[derive(Debug, Clone)]
pub struct CallHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub input_fields: Value,
    pub outcome: CallOutcome,
}

impl CallHistoryEntry {
    pub fn ok(tool_name: impl Into<String>, input_fields: Value, result_content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            tool_name: tool_name.into(),
            input_fields,
            outcome: CallOutcome::Ok {
                result_content: result_content.into(),
            },
        }
    }

    pub fn fail(tool_name: impl Into<String>, input_fields: Value, error_kind: ErrorKind) -> Self {
        Self {
            timestamp: Utc::now(),
            tool_name: tool_name.into(),
            input_fields,
            outcome: CallOutcome::Fail { error_kind },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, CallOutcome::Ok { .. })
    }
}

/// Per-stream, append-only log of dispatched tool calls.
///
/// Cleared on [`crate::pipeline::Pipeline::reset`] to avoid carrying one LLM turn's
/// history into the next.
#[derive(Debug, Clone, Default)]
pub struct CallHistory {
    entries: Vec<CallHistoryEntry>,
}

impl CallHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: CallHistoryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CallHistoryEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn push_and_read_back() {
        let mut history = CallHistory::new();
        history.push(CallHistoryEntry::ok("shell", json!({"command": "echo hi"}), "hi\n"));
        history.push(CallHistoryEntry::fail("nope", json!({}), ErrorKind::UnknownTool));

        assert_eq!(history.len(), 2);
        assert!(history.entries()[0].is_ok());
        assert!(!history.entries()[1].is_ok());
    }

    #[test]
    fn clear_empties_history() {
        let mut history = CallHistory::new();
        history.push(CallHistoryEntry::ok("shell", json!({}), "ok"));
        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::ToolTimeout.to_string(), "TOOL_TIMEOUT");
    }
}
