//! Boundary-safe chunking of an incremental character stream.
//!
//! Fragments never end mid-parenthesis, mid-brace, or mid-string, so a downstream
//! scanner never has to reassemble a call that was cut in half by an arbitrary chunk
//! boundary — unless nothing balances out before the idle-flush fires.

use std::time::{Duration, Instant};

const BOUNDARY_CHARS: &[char] = &[' ', '\t', '\r', '\n', ',', '.', ';', ':', '!', '?'];

/// Splits an incremental text stream into fragments that never bisect a paren-nested
/// call or a brace-delimited object.
pub struct SafeChunker {
    buffer: String,
    paren_depth: i32,
    brace_depth: i32,
    in_string: bool,
    idle_flush: Duration,
    last_flush: Instant,
}

impl SafeChunker {
    pub fn new(idle_flush: Duration) -> Self {
        Self {
            buffer: String::new(),
            paren_depth: 0,
            brace_depth: 0,
            in_string: false,
            idle_flush,
            last_flush: Instant::now(),
        }
    }

    /// Whether the chunker is at a zero-nesting, non-string boundary right now.
    pub fn at_boundary(&self) -> bool {
        self.paren_depth == 0 && self.brace_depth == 0 && !self.in_string
    }

    /// Feed incoming text, returning zero or more boundary-safe fragments.
    pub fn process(&mut self, incoming: &str) -> Vec<String> {
        self.buffer.push_str(incoming);
        let mut fragments = Vec::new();

        loop {
            match self.find_smart_boundary() {
                Some(idx) => {
                    let safe_chunk: String = self.buffer.drain(..=idx).collect();
                    self.advance_depth(&safe_chunk);
                    self.last_flush = Instant::now();
                    fragments.push(safe_chunk);
                }
                None => {
                    if !self.buffer.is_empty() && self.last_flush.elapsed() >= self.idle_flush {
                        tracing::debug!(
                            buffered = self.buffer.len(),
                            "chunker force-flushing on idle"
                        );
                        let forced: String = self.buffer.drain(..).collect();
                        self.advance_depth(&forced);
                        self.last_flush = Instant::now();
                        fragments.push(forced);
                    }
                    break;
                }
            }
        }

        fragments
    }

    /// Flush any leftover text at the end of a stream. Does not reset depth state —
    /// the caller is expected to construct a fresh chunker (or the pipeline resets it)
    /// for the next turn.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let leftover: String = self.buffer.drain(..).collect();
        self.advance_depth(&leftover);
        Some(leftover)
    }

    /// Find the earliest index `i` in the buffer such that consuming `0..=i` lands
    /// back at zero nesting and outside a string, and `buffer[i]` is a boundary char.
    /// Scans from the chunker's persisted depth state, as if replaying the buffer.
    fn find_smart_boundary(&self) -> Option<usize> {
        let mut paren_depth = self.paren_depth;
        let mut brace_depth = self.brace_depth;
        let mut in_string = self.in_string;
        let mut escaped = false;

        for (i, ch) in self.buffer.char_indices() {
            if in_string {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    in_string = false;
                }
            } else {
                match ch {
                    '"' => in_string = true,
                    '(' => paren_depth += 1,
                    ')' => paren_depth = (paren_depth - 1).max(0),
                    '{' => brace_depth += 1,
                    '}' => brace_depth = (brace_depth - 1).max(0),
                    _ => {}
                }
            }

            let outside = !in_string && paren_depth == 0 && brace_depth == 0;
            if outside && BOUNDARY_CHARS.contains(&ch) {
                return Some(i);
            }
        }

        None
    }

    /// Replay `text` against the persisted depth state (used once a chunk has
    /// actually been emitted, to carry nesting into the next `process` call).
    fn advance_depth(&mut self, text: &str) {
        let mut escaped = false;
        for ch in text.chars() {
            if self.in_string {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == '"' {
                    self.in_string = false;
                }
                continue;
            }

            match ch {
                '"' => self.in_string = true,
                '(' => self.paren_depth += 1,
                ')' => self.paren_depth = (self.paren_depth - 1).max(0),
                '{' => self.brace_depth += 1,
                '}' => self.brace_depth = (self.brace_depth - 1).max(0),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> SafeChunker {
        SafeChunker::new(Duration::from_secs_f64(1.5))
    }

    #[test]
    fn plain_prose_splits_on_boundary_chars() {
        let mut c = chunker();
        let fragments = c.process("hello world. more text");
        assert_eq!(fragments, vec!["hello ", "world. "]);
        assert_eq!(c.flush(), Some("more text".to_string()));
    }

    #[test]
    fn does_not_split_inside_parens() {
        let mut c = chunker();
        let fragments = c.process("shell(\"echo hi, there\") done.");
        assert_eq!(fragments, vec!["shell(\"echo hi, there\") ", "done. "]);
    }

    #[test]
    fn does_not_split_inside_braces_across_calls() {
        let mut c = chunker();
        let first = c.process("TOOL_CALL: {\"tool\": \"shell\",");
        assert!(first.is_empty());
        let second = c.process(" \"input_schema\": {\"command\": \"pwd\"}} done.");
        assert_eq!(
            second,
            vec!["TOOL_CALL: {\"tool\": \"shell\", \"input_schema\": {\"command\": \"pwd\"}} done. "]
        );
    }

    #[test]
    fn quoted_comma_does_not_count_as_depth() {
        let mut c = chunker();
        let fragments = c.process("before \"a, b\" after.");
        assert_eq!(fragments, vec!["before ", "\"a, b\" ", "after. "]);
    }

    #[test]
    fn escaped_quote_does_not_end_string() {
        let mut c = chunker();
        let fragments = c.process("\"a \\\" b\" done.");
        assert_eq!(fragments, vec!["\"a \\\" b\" ", "done. "]);
    }

    #[test]
    fn idle_flush_forces_emission() {
        let mut c = SafeChunker::new(Duration::from_millis(1));
        let fragments = c.process("shell(\"unterminated");
        assert!(fragments.is_empty());
        std::thread::sleep(Duration::from_millis(5));
        let fragments = c.process("");
        assert_eq!(fragments, vec!["shell(\"unterminated".to_string()]);
    }

    #[test]
    fn flush_returns_none_on_empty_buffer() {
        let mut c = chunker();
        assert_eq!(c.flush(), None);
    }

    #[test]
    fn concatenation_equals_input_with_no_tool_calls() {
        let mut c = chunker();
        let input = "just some plain prose, nothing special here.";
        let mut out = String::new();
        for fragment in c.process(input) {
            out.push_str(&fragment);
        }
        if let Some(rest) = c.flush() {
            out.push_str(&rest);
        }
        assert_eq!(out, input);
    }
}
