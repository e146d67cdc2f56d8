//! Round-trip laws: an inline call fed through the formatter then the executor must
//! produce the same output as feeding the equivalent structured call directly, and
//! `reset()` must make a pipeline behave like a freshly constructed one.

use tool_pipeline::{FieldKind, Pipeline, PipelineConfig, ToolRegistry, ToolResult, tool};

fn registry() -> ToolRegistry {
    ToolRegistry::builder()
        .tool(
            tool("shell", "Run a shell command")
                .field("command", FieldKind::String, true)
                .build(|input| async move {
                    let command = input["command"].as_str().unwrap_or_default().to_string();
                    ToolResult::ok(format!("ran: {command}"))
                }),
        )
        .build()
}

async fn feed_to_end(pipeline: &mut Pipeline, text: &str) -> String {
    let mut out = pipeline.feed(text).await;
    out.push_str(&pipeline.flush().await);
    out
}

#[tokio::test]
async fn inline_call_matches_equivalent_structured_call() {
    let mut via_inline = Pipeline::new(registry(), &PipelineConfig::default());
    let inline_out = feed_to_end(&mut via_inline, "shell(\"echo hi\")").await;

    let mut via_structured = Pipeline::new(registry(), &PipelineConfig::default());
    let structured_out = feed_to_end(
        &mut via_structured,
        "TOOL_CALL: {\"tool\":\"shell\",\"input_schema\":{\"command\":\"echo hi\"}}",
    )
    .await;

    assert_eq!(inline_out, structured_out);
}

#[tokio::test]
async fn reset_then_feed_matches_a_fresh_pipeline() {
    let mut reused = Pipeline::new(registry(), &PipelineConfig::default());
    feed_to_end(&mut reused, "shell(\"first call\")").await;
    reused.reset();
    let reused_out = feed_to_end(&mut reused, "shell(\"second call\")").await;

    let mut fresh = Pipeline::new(registry(), &PipelineConfig::default());
    let fresh_out = feed_to_end(&mut fresh, "shell(\"second call\")").await;

    assert_eq!(reused_out, fresh_out);
    assert_eq!(reused.history().len(), fresh.history().len());
}

#[tokio::test]
async fn reset_clears_partial_state_from_a_prior_turn() {
    let mut pipeline = Pipeline::new(registry(), &PipelineConfig::default());
    // Leave the executor mid-object and the formatter mid-call.
    pipeline.feed("shell(\"unterminated").await;
    pipeline
        .feed("TOOL_CALL: {\"tool\":\"shell\",\"input_schema\":{\"command\":\"x")
        .await;

    pipeline.reset();

    let out = feed_to_end(&mut pipeline, "shell(\"echo hi\")").await;
    assert!(out.contains("ran: echo hi"));
    assert_eq!(pipeline.history().len(), 1);
}
