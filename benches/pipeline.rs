use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tool_pipeline::{tool, FieldKind, PipelineConfig, Pipeline, ToolRegistry, ToolResult};

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

// Benchmark: SafeChunker's boundary scan on prose with varying unbalanced-punctuation
// density, via the full Pipeline::feed (chunker -> formatter -> executor, no calls).
fn bench_chunker_boundary_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunker_boundary_scan");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for size in [100, 1_000, 10_000].iter() {
        let text = "the quick brown fox jumps over the lazy dog, again and again. "
            .repeat(size / 60 + 1);
        group.bench_with_input(BenchmarkId::from_parameter(size), &text, |b, text| {
            b.iter(|| {
                rt.block_on(async {
                    let mut pipeline = Pipeline::new(registry(), &PipelineConfig::default());
                    black_box(pipeline.feed(black_box(text)).await)
                })
            });
        });
    }

    group.finish();
}

// Benchmark: structured-call brace accumulation for objects of varying size, fed as a
// single chunk so the whole cost lands in the executor's IN_OBJECT accumulation loop.
fn bench_executor_brace_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor_brace_accumulation");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for padding in [10, 100, 1_000].iter() {
        let command = "echo ".to_string() + &"x".repeat(*padding);
        let text = format!(
            r#"TOOL_CALL: {{"tool":"shell","input_schema":{{"command":"{command}"}}}}"#
        );
        group.bench_with_input(BenchmarkId::from_parameter(padding), &text, |b, text| {
            b.iter(|| {
                rt.block_on(async {
                    let mut pipeline = Pipeline::new(registry(), &PipelineConfig::default());
                    black_box(pipeline.feed(black_box(text)).await)
                })
            });
        });
    }

    group.finish();
}

// Benchmark: a structured call split across many small chunk boundaries, stressing the
// executor's residual-state carrying rather than single-shot accumulation.
fn bench_executor_fragmented_feed(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor_fragmented_feed");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for chunk_size in [1, 4, 16].iter() {
        let text = r#"TOOL_CALL: {"tool":"shell","input_schema":{"command":"echo hi"}}"#;
        let chunks: Vec<String> = text
            .as_bytes()
            .chunks(*chunk_size)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect();
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunks,
            |b, chunks| {
                b.iter(|| {
                    rt.block_on(async {
                        let mut pipeline = Pipeline::new(registry(), &PipelineConfig::default());
                        let mut out = String::new();
                        for chunk in chunks {
                            out.push_str(&pipeline.feed(black_box(chunk)).await);
                        }
                        black_box(out)
                    })
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_chunker_boundary_scan,
    bench_executor_brace_accumulation,
    bench_executor_fragmented_feed,
);
criterion_main!(benches);
