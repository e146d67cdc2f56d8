//! Top-level orchestrator wiring the safe chunker, inline-call formatter,
//! structured-call executor, and typed-lag smoother into the provider contract
//! described in §6: `feed`, `flush`, `reset`.

use crate::chunker::SafeChunker;
use crate::executor::StructuredCallExecutor;
use crate::formatter::InlineCallFormatter;
use crate::history::CallHistory;
use crate::smoother::{CharStream, TypedLagSmoother};
use crate::tools::ToolRegistry;
use crate::PipelineConfig;

/// Composes the four pipeline stages for one LLM stream.
///
/// A `Pipeline` is per-stream, stateful, mutable state: construct one per turn (or
/// call [`Pipeline::reset`] between turns) so residual buffers and call history from
/// one turn never leak into the next.
pub struct Pipeline {
    chunker: SafeChunker,
    chunker_idle_flush: std::time::Duration,
    formatter: InlineCallFormatter,
    executor: StructuredCallExecutor,
    smoother: TypedLagSmoother,
}

impl Pipeline {
    pub fn new(registry: ToolRegistry, config: &PipelineConfig) -> Self {
        Self {
            chunker: SafeChunker::new(config.chunker_idle_flush),
            chunker_idle_flush: config.chunker_idle_flush,
            formatter: InlineCallFormatter::new(),
            executor: StructuredCallExecutor::new(registry, config.default_tool_timeout),
            smoother: TypedLagSmoother::new(
                config.smoother_initial_delay_ms,
                config.smoother_zero_delay_queue,
            ),
        }
    }

    /// Feed one chunk from the LLM provider through chunking, inline-call rewriting,
    /// and structured-call execution. Returns the user-visible text produced so far;
    /// pass it to [`Pipeline::smooth`] for paced character output.
    pub async fn feed(&mut self, chunk: &str) -> String {
        let mut text = String::new();
        for fragment in self.chunker.process(chunk) {
            let rewritten = self.formatter.feed(&fragment);
            text.push_str(&self.executor.feed(&rewritten).await);
        }
        text
    }

    /// Flush any residual buffered text at the end of a stream, running it through the
    /// same formatter/executor path as `feed`.
    pub async fn flush(&mut self) -> String {
        match self.chunker.flush() {
            Some(residual) => {
                let rewritten = self.formatter.feed(&residual);
                self.executor.feed(&rewritten).await
            }
            None => String::new(),
        }
    }

    /// Pace `text` into a stream of individual characters for the transport.
    pub fn smooth(&self, text: &str) -> CharStream {
        self.smoother.smooth(text)
    }

    /// This stream's append-only call history.
    pub fn history(&self) -> &CallHistory {
        self.executor.history()
    }

    /// Clear all residual buffers and call history. Call at the start of a new LLM
    /// turn to prevent cross-turn contamination.
    pub fn reset(&mut self) {
        self.chunker = SafeChunker::new(self.chunker_idle_flush);
        self.formatter = InlineCallFormatter::new();
        self.executor.reset();
    }
}
