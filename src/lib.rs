//! # tool-pipeline
//!
//! The real-time tool-call streaming pipeline at the heart of an autonomous LLM agent.
//!
//! An LLM emits characters incrementally. Somewhere in that stream the model may write
//! a tool invocation — either a free-form call like `shell("df -h")` or, further along
//! in a more disciplined model's output, the canonical `TOOL_CALL: {...}` structured
//! form. This crate turns that raw character stream into user-visible output with tool
//! calls transparently executed and their results spliced back in, never splitting a
//! call across a chunk boundary and never blocking the reader on a slow tool longer
//! than its configured timeout.
//!
//! ## Pipeline stages
//!
//! ```text
//! LLM stream → [SafeChunker] → [InlineCallFormatter] → [StructuredCallExecutor] → [TypedLagSmoother] → user
//! ```
//!
//! - [`chunker`]: splits an incremental stream into fragments that never bisect a
//!   parenthesized call or brace-delimited object.
//! - [`formatter`]: recognizes free-form calls in a fragment and rewrites them as
//!   canonical `TOOL_CALL:` structured calls.
//! - [`executor`]: locates the marker, accumulates the structured object across chunk
//!   boundaries, validates it against the [`tools::ToolRegistry`], dispatches, and
//!   splices the result inline.
//! - [`smoother`]: paces the resulting text into a steady, human-readable character
//!   stream.
//!
//! [`Pipeline`] composes all four stages behind the provider contract: `feed`, `flush`,
//! `reset`.
//!
//! ## Example
//!
//! ```no_run
//! use tool_pipeline::{Pipeline, PipelineConfig, ToolRegistry, ToolResult, FieldKind, tool};
//! use futures::StreamExt;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = ToolRegistry::builder()
//!     .tool(
//!         tool("shell", "Run a shell command")
//!             .field("command", FieldKind::String, true)
//!             .build(|input| async move {
//!                 let command = input["command"].as_str().unwrap_or_default().to_string();
//!                 ToolResult::ok(format!("ran: {command}"))
//!             }),
//!     )
//!     .build();
//!
//! let mut pipeline = Pipeline::new(registry, &PipelineConfig::from_env());
//! let text = pipeline.feed("shell(\"echo hi\")\n").await;
//! let mut chars = pipeline.smooth(&text);
//! while let Some(ch) = chars.next().await {
//!     print!("{ch}");
//! }
//! # }
//! ```

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// Boundary-safe chunking of an incremental character stream.
mod chunker;

/// Pipeline configuration resolved from environment variables and builder overrides.
mod config;

/// Crate-wide error type for programmer-facing failures.
mod error;

/// Real-time structured-call parser and dispatcher.
mod executor;

/// Free-form inline-call recognition and rewriting to the canonical structured form.
mod formatter;

/// Append-only per-stream call history.
mod history;

/// Top-level orchestrator composing all four pipeline stages.
mod pipeline;

/// Typed-lag output pacing.
mod smoother;

/// Tool registry and tool contract.
mod tools;

// ============================================================================
// PUBLIC EXPORTS
// ============================================================================

pub use chunker::SafeChunker;
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{Error, Result};
pub use executor::StructuredCallExecutor;
pub use formatter::InlineCallFormatter;
pub use history::{CallHistory, CallHistoryEntry, CallOutcome, ErrorKind};
pub use pipeline::Pipeline;
pub use smoother::{CharStream, TypedLagSmoother};
pub use tools::{
    FieldKind, SchemaViolation, Tool, ToolBuilder, ToolHandler, ToolRegistry,
    ToolRegistryBuilder, ToolResult, ToolSchema, ToolStatus, tool,
};

/// Install a default `tracing` subscriber reading `RUST_LOG` (or `info` if unset).
///
/// A convenience for examples and tests; embedding applications that already manage
/// their own subscriber should not call this (see the crate's Non-goals around log
/// sink configuration).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

// ============================================================================
// CONVENIENCE PRELUDE
// ============================================================================

/// Convenience module for the most commonly used types. Import with
/// `use tool_pipeline::prelude::*;`.
pub mod prelude {
    pub use crate::{
        CallHistory, CallHistoryEntry, Error, ErrorKind, FieldKind, Pipeline, PipelineConfig,
        Result, Tool, ToolRegistry, ToolResult, tool,
    };
}
