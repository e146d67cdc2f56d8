//! Tool registry and tool contract for the structured-call executor.
//!
//! A tool exposes a name, an input schema, and an async invoker. The invoker is wrapped
//! in `Arc<dyn Fn(...) -> Pin<Box<dyn Future<...>>>>` so tools of different concrete
//! closure types can live side by side in one registry, and so the registry can be
//! cheaply cloned and shared across an executor's lifetime without locking.

use crate::{Error, Result};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

/// The declared type of a single schema field.
///
/// This enumerates exactly the kinds a tool's input schema can name; it is not a
/// general JSON Schema, since the formatter and executor only ever need to check that
/// a field's runtime JSON value matches one of these shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    ArrayOfString,
    Object,
}

impl FieldKind {
    /// Whether a JSON value's runtime type matches this declared kind.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Number => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::ArrayOfString => {
                value.is_array() && value.as_array().unwrap().iter().all(|v| v.is_string())
            }
            FieldKind::Object => value.is_object(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Integer => "integer",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::ArrayOfString => "array-of-string",
            FieldKind::Object => "object",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A tool's input schema: field kinds plus which fields are required.
#[derive(Debug, Clone, Default)]
pub struct ToolSchema {
    fields: HashMap<String, FieldKind>,
    required: HashSet<String>,
}

impl ToolSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field. `required` controls whether its absence fails validation.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind, required: bool) -> Self {
        let name = name.into();
        if required {
            self.required.insert(name.clone());
        }
        self.fields.insert(name, kind);
        self
    }

    /// Mark a field required without constraining its kind (e.g. a field whose
    /// declared type in the source schema is a bare, untyped "list" or "any").
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.insert(name.into());
        self
    }

    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.fields.get(field).copied()
    }

    /// Check `input` against this schema, returning the name of the first field that
    /// is missing-but-required or present-with-the-wrong-kind.
    pub fn validate(&self, input: &Value) -> std::result::Result<(), SchemaViolation> {
        let obj = input
            .as_object()
            .ok_or_else(|| SchemaViolation::NotAnObject)?;

        for required_field in &self.required {
            if !obj.contains_key(required_field) {
                return Err(SchemaViolation::MissingField(required_field.clone()));
            }
        }

        for (field, value) in obj {
            if let Some(kind) = self.fields.get(field) {
                if !kind.matches(value) {
                    return Err(SchemaViolation::WrongKind {
                        field: field.clone(),
                        expected: *kind,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Why an input map failed schema validation.
#[derive(Debug, Clone)]
pub enum SchemaViolation {
    NotAnObject,
    MissingField(String),
    WrongKind { field: String, expected: FieldKind },
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaViolation::NotAnObject => write!(f, "input_schema is not an object"),
            SchemaViolation::MissingField(field) => write!(f, "missing required field '{field}'"),
            SchemaViolation::WrongKind { field, expected } => {
                write!(f, "field '{field}' expected {expected}")
            }
        }
    }
}

/// `status` half of a tool invocation's result, per the tool contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Ok,
    Error,
}

/// The result of invoking a tool: a status plus the content to splice into the stream.
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub status: ToolStatus,
    pub content: String,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Ok,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            content: content.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }
}

/// Type-erased async tool invoker.
///
/// `Arc` lets a `Tool` (and hence the registry holding it) be cloned cheaply; `Pin<Box<..>>`
/// erases the concrete future type so handlers of unrelated shapes share one field type.
pub type ToolHandler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = ToolResult> + Send>> + Send + Sync>;

/// A registered tool: name, schema, optional timeout override, and invoker.
#[derive(Clone)]
pub struct Tool {
    name: String,
    description: String,
    schema: ToolSchema,
    timeout: Option<Duration>,
    handler: ToolHandler,
}

impl Tool {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    /// The tool's declared timeout, if it overrides the pipeline default.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub async fn invoke(&self, input: Value) -> ToolResult {
        (self.handler)(input).await
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Fluent builder for a [`Tool`]. Start with [`tool()`].
pub struct ToolBuilder {
    name: String,
    description: String,
    schema: ToolSchema,
    timeout: Option<Duration>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: ToolSchema::new(),
            timeout: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind, required: bool) -> Self {
        self.schema = self.schema.field(name, kind, required);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build<F, Fut>(self, handler: F) -> Tool
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        Tool {
            name: self.name,
            description: self.description,
            schema: self.schema,
            timeout: self.timeout,
            handler: Arc::new(move |input| Box::pin(handler(input))),
        }
    }
}

/// Start building a tool. Convenience wrapper around [`ToolBuilder::new`].
pub fn tool(name: impl Into<String>, description: impl Into<String>) -> ToolBuilder {
    ToolBuilder::new(name, description)
}

/// Read-only mapping from tool name to [`Tool`]. Built once via [`ToolRegistryBuilder`]
/// and shared for the life of the process; a registry is never mutated after `build()`.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Accumulates tools and rejects duplicate names at `build()` time.
#[derive(Default, Debug)]
pub struct ToolRegistryBuilder {
    tools: HashMap<String, Tool>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    /// Fails if two tools were registered under the same name.
    pub fn try_tool(mut self, tool: Tool) -> Result<Self> {
        if self.tools.contains_key(&tool.name) {
            return Err(Error::registry(format!(
                "duplicate tool name '{}'",
                tool.name
            )));
        }
        self.tools.insert(tool.name.clone(), tool);
        Ok(self)
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry { tools: self.tools }
    }
}
