//! Error types for the tool pipeline.
//!
//! This is the crate's Rust-level error surface: programmer-facing failures the
//! embedding application cannot recover from in-band (bad configuration, a malformed
//! tool registry, serialization bugs). A model asking for an unknown tool, sending a
//! malformed structured call, or failing schema validation is *not* one of these errors
//! — those are recovered in-band as pipeline text and recorded via
//! [`crate::history::ErrorKind`] instead.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the pipeline crate
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration (bad env var, invalid sandbox root, etc.)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Tool registry construction error (duplicate name, incomplete builder)
    #[error("tool registry error: {0}")]
    Registry(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A tool invoker failed in a way that is not representable as an in-band
    /// `ErrorKind::ToolFailure` (e.g. the invoker violated its own contract).
    #[error("tool error: {0}")]
    Tool(String),

    /// Other errors
    #[error("error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new config error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a new registry error
    pub fn registry(msg: impl Into<String>) -> Self {
        Error::Registry(msg.into())
    }

    /// Create a new tool error
    pub fn tool(msg: impl Into<String>) -> Self {
        Error::Tool(msg.into())
    }

    /// Create a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = Error::config("sandbox_root must be absolute");
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(
            err.to_string(),
            "invalid configuration: sandbox_root must be absolute"
        );
    }

    #[test]
    fn test_error_registry() {
        let err = Error::registry("duplicate tool name 'shell'");
        assert!(matches!(err, Error::Registry(_)));
        assert_eq!(
            err.to_string(),
            "tool registry error: duplicate tool name 'shell'"
        );
    }

    #[test]
    fn test_error_tool() {
        let err = Error::tool("invoker violated its contract");
        assert!(matches!(err, Error::Tool(_)));
        assert_eq!(err.to_string(), "tool error: invoker violated its contract");
    }

    #[test]
    fn test_error_other() {
        let err = Error::other("unexpected state");
        assert!(matches!(err, Error::Other(_)));
        assert_eq!(err.to_string(), "error: unexpected state");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_result_type_alias() {
        fn _returns_result() -> Result<i32> {
            Ok(42)
        }

        fn _returns_error() -> Result<i32> {
            Err(Error::other("boom"))
        }
    }
}
