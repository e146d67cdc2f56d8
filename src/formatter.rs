//! Recognizes free-form function-style tool invocations in model prose and rewrites
//! them as canonical `TOOL_CALL: {...}` structured calls.

use crate::tools::{FieldKind, ToolSchema};
use serde_json::{json, Value};

const MARKER: &str = "TOOL_CALL:";

/// Scans fragments for inline calls like `shell("df -h")`, validates the projected
/// input against the target tool's schema, and rewrites recognized calls in place.
/// Unrecognized text passes through unchanged.
pub struct InlineCallFormatter {
    buffer: String,
}

impl Default for InlineCallFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl InlineCallFormatter {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feed one fragment. Every fully-recognized inline call in the accumulated buffer
    /// is rewritten; any call left incomplete at the end of the buffer is preserved for
    /// the next `feed`, along with everything before it that hasn't been emitted yet.
    pub fn feed(&mut self, fragment: &str) -> String {
        self.buffer.push_str(fragment);
        let mut output = String::new();

        loop {
            match find_next_call(&self.buffer) {
                CallScan::Found(call) => {
                    output.push_str(&self.buffer[..call.name_start]);

                    match project(&call.func_name, &call.args) {
                        Ok((tool, input_schema)) => {
                            let rewritten = format!(
                                "{MARKER}{}",
                                serde_json::to_string(
                                    &json!({"tool": tool, "input_schema": input_schema})
                                )
                                .expect("tool call object is always serializable")
                            );
                            tracing::debug!(func = %call.func_name, tool = %tool, "rewrote inline call");
                            output.push_str(&rewritten);
                        }
                        Err(ProjectionError::UnknownSurface) => {
                            // Not a recognized surface name: pass the original call text through.
                            output.push_str(&self.buffer[call.name_start..call.end]);
                        }
                        Err(ProjectionError::Validation(msg)) => {
                            tracing::warn!(func = %call.func_name, error = %msg, "inline call failed validation");
                            output.push_str(&self.buffer[call.name_start..call.end]);
                            output.push_str(&format!("\n[VALIDATION ERROR: {msg}]\n"));
                        }
                    }

                    self.buffer.drain(..call.end);
                }
                CallScan::Pending(name_start) => {
                    // A call-start is present but its closing `)` hasn't arrived yet:
                    // emit everything before it and keep the rest buffered.
                    output.push_str(&self.buffer[..name_start]);
                    self.buffer.drain(..name_start);
                    return output;
                }
                CallScan::None => break,
            }
        }

        output.push_str(&self.buffer);
        self.buffer.clear();
        output
    }
}

struct InlineCall {
    name_start: usize,
    end: usize,
    func_name: String,
    args: ParsedArgs,
}

/// Result of scanning for the next `ident(...)` call in a buffer.
enum CallScan {
    /// A complete call was found.
    Found(InlineCall),
    /// A call-start was found at this index, but its closing `)` hasn't arrived yet.
    Pending(usize),
    /// No call-start anywhere in the buffer.
    None,
}

/// Find the next `ident(...)` call in `buf`, distinguishing a fully-formed call from
/// one whose closing `)` hasn't arrived yet so the caller can wait for more input
/// instead of discarding the partial call.
fn find_next_call(buf: &str) -> CallScan {
    let bytes = buf.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if is_ident_start(bytes[i]) && (i == 0 || !is_ident_char(bytes[i - 1])) {
            let name_start = i;
            let mut j = i + 1;
            while j < bytes.len() && is_ident_char(bytes[j]) {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'(' {
                let func_name = buf[name_start..j].to_string();
                return match find_matching_paren(buf, j + 1) {
                    Some((args_end, close)) => {
                        let args_str = &buf[j + 1..args_end];
                        CallScan::Found(InlineCall {
                            name_start,
                            end: close + 1,
                            func_name,
                            args: parse_args(args_str),
                        })
                    }
                    None => CallScan::Pending(name_start),
                };
            }
            i = j;
        } else {
            i += 1;
        }
    }
    CallScan::None
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Starting just past the opening `(` at `start`, find the index of the matching `)`,
/// honoring nested parens and quoted strings (with backslash escapes). Returns
/// `(args_end, close_idx)` where `args_end == close_idx`, or `None` if unterminated.
fn find_matching_paren(buf: &str, start: usize) -> Option<(usize, usize)> {
    let bytes = buf.as_bytes();
    let mut depth = 1i32;
    let mut i = start;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
        } else {
            match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some((i, i));
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

#[derive(Debug, Default)]
struct ParsedArgs {
    positional: Vec<String>,
    named: std::collections::HashMap<String, String>,
}

impl ParsedArgs {
    fn named_or(&self, key: &str, default: &str) -> String {
        self.named.get(key).cloned().unwrap_or_else(|| default.to_string())
    }

    fn positional(&self, idx: usize) -> &str {
        self.positional.get(idx).map(|s| s.as_str()).unwrap_or("")
    }
}

/// Split `args_str` at top-level commas (not inside quotes), then classify each part
/// as `key=value` (named) or a bare/quoted literal (positional).
fn parse_args(args_str: &str) -> ParsedArgs {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in args_str.chars() {
        match quote {
            Some(q) => {
                current.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ',' => {
                    parts.push(std::mem::take(&mut current));
                }
                _ => current.push(ch),
            },
        }
    }
    if !current.is_empty() || !parts.is_empty() {
        parts.push(current);
    }

    let mut result = ParsedArgs::default();
    for part in parts {
        let trimmed = part.trim();
        if let Some(eq) = trimmed.find('=') {
            let key = trimmed[..eq].trim().to_string();
            let value = unquote(trimmed[eq + 1..].trim());
            result.named.insert(key, value);
        } else if !trimmed.is_empty() {
            result.positional.push(unquote(trimmed));
        }
    }
    result
}

fn unquote(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

enum ProjectionError {
    UnknownSurface,
    Validation(String),
}

/// Map a recognized surface name to its canonical tool and projected `input_schema`,
/// validating the result against the tool's declared schema.
fn project(func_name: &str, args: &ParsedArgs) -> Result<(&'static str, Value), ProjectionError> {
    let (tool, input_schema) = match func_name {
        "file_read" => ("file", json!({"operation": "read", "path": args.positional(0)})),
        "file_write" => (
            "file",
            json!({"operation": "write", "path": args.positional(0), "content": args.positional(1)}),
        ),
        "file_delete" => ("file", json!({"operation": "delete", "path": args.positional(0)})),
        "shell" => ("shell", json!({"command": args.positional(0)})),
        "code_runner" | "print" => (
            "code_runner",
            json!({
                "files": [{"path": "main.py", "content": args.positional(0)}],
                "main_file": "main.py",
                "language": args.named_or("language", "python"),
            }),
        ),
        "web_search" => {
            let max_results: i64 = args.named_or("max_results", "5").parse().unwrap_or(5);
            (
                "web_search",
                json!({"query": args.positional(0), "max_results": max_results}),
            )
        }
        "web_browser" => {
            let extract_links = args.named_or("extract_links", "false") == "true";
            (
                "web_browser",
                json!({
                    "url": args.positional(0),
                    "extract_type": if extract_links { "links" } else { "text" },
                }),
            )
        }
        "documentation_check" => ("documentation_check", json!({"path": args.positional(0)})),
        "http_request" => (
            "http_request",
            json!({"method": args.positional(0), "url": args.positional(1)}),
        ),
        "package_manager" => (
            "package_manager",
            json!({"action": args.positional(0), "package": args.positional(1)}),
        ),
        "write_memory" | "read_memory" | "list_memory" => {
            let operation = match func_name {
                "write_memory" => "write",
                "read_memory" => "read",
                _ => "list",
            };
            (
                "memory",
                json!({"operation": operation, "key": args.positional(0), "value": args.positional(1)}),
            )
        }
        _ => return Err(ProjectionError::UnknownSurface),
    };

    if let Err(violation) = projection_schema(tool).validate(&input_schema) {
        return Err(ProjectionError::Validation(violation.to_string()));
    }

    Ok((tool, input_schema))
}

/// The schema each canonical tool's projected `input_schema` must satisfy, per the
/// formatter's own validation step (distinct from whatever schema the tool itself
/// registers in the live [`crate::tools::ToolRegistry`]).
fn projection_schema(tool: &str) -> ToolSchema {
    match tool {
        "file" => ToolSchema::new()
            .field("operation", FieldKind::String, true)
            .field("path", FieldKind::String, true)
            .field("content", FieldKind::String, false),
        "shell" => ToolSchema::new().field("command", FieldKind::String, true),
        "code_runner" => ToolSchema::new()
            .require("files")
            .field("main_file", FieldKind::String, true)
            .field("language", FieldKind::String, false),
        "web_search" => ToolSchema::new()
            .field("query", FieldKind::String, true)
            .field("max_results", FieldKind::Integer, false),
        "web_browser" => ToolSchema::new()
            .field("url", FieldKind::String, true)
            .field("extract_type", FieldKind::String, false),
        "documentation_check" => ToolSchema::new().field("path", FieldKind::String, true),
        "http_request" => ToolSchema::new()
            .field("method", FieldKind::String, true)
            .field("url", FieldKind::String, true),
        "package_manager" => ToolSchema::new()
            .field("action", FieldKind::String, true)
            .field("package", FieldKind::String, false),
        "memory" => ToolSchema::new()
            .field("operation", FieldKind::String, true)
            .field("key", FieldKind::String, true)
            .field("value", FieldKind::String, false),
        _ => ToolSchema::new(),
    }
}
