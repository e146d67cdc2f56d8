//! Pipeline configuration: resolves the options in the crate's configuration surface.
//!
//! Each option is resolved once, at construction time, with the same priority order:
//! environment variable, then an explicit override passed by the embedding application,
//! then a documented default. Resolution never happens on the hot path.
//!
//! ## Environment variables
//!
//! - `TOOL_PIPELINE_SANDBOX_ROOT`
//! - `TOOL_PIPELINE_CHUNKER_IDLE_FLUSH_SECONDS`
//! - `TOOL_PIPELINE_SMOOTHER_INITIAL_DELAY_MS`
//! - `TOOL_PIPELINE_SMOOTHER_ZERO_DELAY_QUEUE`
//! - `TOOL_PIPELINE_DEFAULT_TOOL_TIMEOUT_SECONDS`

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CHUNKER_IDLE_FLUSH_SECONDS: f64 = 1.5;
const DEFAULT_SMOOTHER_INITIAL_DELAY_MS: u64 = 32;
const DEFAULT_SMOOTHER_ZERO_DELAY_QUEUE: u64 = 64;
const DEFAULT_TOOL_TIMEOUT_SECONDS: u64 = 60;

/// Resolved pipeline configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Absolute path prefix the filesystem tool enforces. `None` means no sandbox.
    pub sandbox_root: Option<PathBuf>,
    /// How long the chunker waits with no natural boundary before force-flushing.
    pub chunker_idle_flush: Duration,
    /// `D₀` in the smoother's delay formula.
    pub smoother_initial_delay_ms: u64,
    /// `Q₀` in the smoother's delay formula.
    pub smoother_zero_delay_queue: u64,
    /// Per-tool invocation cap used when a tool doesn't declare its own timeout.
    pub default_tool_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sandbox_root: None,
            chunker_idle_flush: Duration::from_secs_f64(DEFAULT_CHUNKER_IDLE_FLUSH_SECONDS),
            smoother_initial_delay_ms: DEFAULT_SMOOTHER_INITIAL_DELAY_MS,
            smoother_zero_delay_queue: DEFAULT_SMOOTHER_ZERO_DELAY_QUEUE,
            default_tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECONDS),
        }
    }
}

impl PipelineConfig {
    /// Resolve configuration purely from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        PipelineConfigBuilder::new().build()
    }

    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
    }
}

/// Builds a [`PipelineConfig`], letting an embedding application override individual
/// fields before environment resolution. Priority per field: env var, then override,
/// then default.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    sandbox_root: Option<PathBuf>,
    chunker_idle_flush: Option<Duration>,
    smoother_initial_delay_ms: Option<u64>,
    smoother_zero_delay_queue: Option<u64>,
    default_tool_timeout: Option<Duration>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sandbox_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sandbox_root = Some(root.into());
        self
    }

    pub fn chunker_idle_flush(mut self, duration: Duration) -> Self {
        self.chunker_idle_flush = Some(duration);
        self
    }

    pub fn smoother_initial_delay_ms(mut self, ms: u64) -> Self {
        self.smoother_initial_delay_ms = Some(ms);
        self
    }

    pub fn smoother_zero_delay_queue(mut self, queue_len: u64) -> Self {
        self.smoother_zero_delay_queue = Some(queue_len);
        self
    }

    pub fn default_tool_timeout(mut self, duration: Duration) -> Self {
        self.default_tool_timeout = Some(duration);
        self
    }

    pub fn build(self) -> PipelineConfig {
        PipelineConfig {
            sandbox_root: resolve_path("TOOL_PIPELINE_SANDBOX_ROOT", self.sandbox_root),
            chunker_idle_flush: resolve_seconds(
                "TOOL_PIPELINE_CHUNKER_IDLE_FLUSH_SECONDS",
                self.chunker_idle_flush,
                DEFAULT_CHUNKER_IDLE_FLUSH_SECONDS,
            ),
            smoother_initial_delay_ms: resolve_u64(
                "TOOL_PIPELINE_SMOOTHER_INITIAL_DELAY_MS",
                self.smoother_initial_delay_ms,
                DEFAULT_SMOOTHER_INITIAL_DELAY_MS,
            ),
            smoother_zero_delay_queue: resolve_u64(
                "TOOL_PIPELINE_SMOOTHER_ZERO_DELAY_QUEUE",
                self.smoother_zero_delay_queue,
                DEFAULT_SMOOTHER_ZERO_DELAY_QUEUE,
            ),
            default_tool_timeout: resolve_seconds(
                "TOOL_PIPELINE_DEFAULT_TOOL_TIMEOUT_SECONDS",
                self.default_tool_timeout,
                DEFAULT_TOOL_TIMEOUT_SECONDS as f64,
            ),
        }
    }
}

fn resolve_path(env_var: &str, override_value: Option<PathBuf>) -> Option<PathBuf> {
    if let Ok(value) = env::var(env_var) {
        return Some(PathBuf::from(value));
    }
    override_value
}

fn resolve_u64(env_var: &str, override_value: Option<u64>, default: u64) -> u64 {
    if let Ok(value) = env::var(env_var) {
        if let Ok(parsed) = value.parse() {
            return parsed;
        }
    }
    override_value.unwrap_or(default)
}

fn resolve_seconds(env_var: &str, override_value: Option<Duration>, default_secs: f64) -> Duration {
    if let Ok(value) = env::var(env_var) {
        if let Ok(parsed) = value.parse::<f64>() {
            return Duration::from_secs_f64(parsed);
        }
    }
    override_value.unwrap_or(Duration::from_secs_f64(default_secs))
}
