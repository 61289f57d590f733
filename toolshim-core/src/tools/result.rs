//! Caller-facing error model for tool invocation
//!
//! Every failure a caller can see from [`Tool::exec`](super::Tool::exec) is a
//! [`ToolError`] whose [`ToolErrorKind`] says whether fixing the input,
//! retrying, or giving up is the right reaction. Captured process output, when
//! there is any, travels in the error's `context`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured tool error with taxonomy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error kind (determines retryability)
    pub kind: ToolErrorKind,

    /// Human-readable error message
    pub message: String,

    /// Machine-readable error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ToolError {
    /// Create a new tool error
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            context: None,
        }
    }

    /// Add an error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Add context
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Create a validation error
    pub fn validation(errors: Vec<ValidationError>) -> Self {
        Self {
            kind: ToolErrorKind::Validation,
            message: format!(
                "command input invalid: {}",
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ")
            ),
            code: Some("VALIDATION_FAILED".to_string()),
            context: Some(serde_json::to_value(&errors).unwrap_or_default()),
        }
    }

    /// Create a not-found error for a tool name
    pub fn not_found(name: &str) -> Self {
        Self::new(ToolErrorKind::NotFound, format!("tool {name:?} not found"))
            .with_code("TOOL_NOT_FOUND")
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, message).with_code("INTERNAL_ERROR")
    }

    /// Captured stdout, if the error carries any
    pub fn stdout(&self) -> Option<&str> {
        self.context.as_ref()?.get("stdout")?.as_str()
    }

    /// Captured stderr, if the error carries any
    pub fn stderr(&self) -> Option<&str> {
        self.context.as_ref()?.get("stderr")?.as_str()
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

/// Error kind taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// Input failed schema validation (not retryable - fix args)
    Validation,

    /// Execution hit its deadline (retryable)
    Timeout,

    /// Cancelled by the caller (not retryable)
    Cancelled,

    /// Command ran and exited with a nonzero status (not retryable as-is)
    CommandFailed,

    /// Tool not found (not retryable)
    NotFound,

    /// Spawn or I/O failure inside the engine (not retryable - environment)
    Internal,
}

impl ToolErrorKind {
    /// Check if this error kind is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolErrorKind::Timeout)
    }

    /// Check if this error kind is fatal (never retry)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ToolErrorKind::Validation | ToolErrorKind::NotFound | ToolErrorKind::Internal
        )
    }
}

/// Validation error for a specific field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Field path (e.g., "header[1]"); empty for the whole input
    pub field: String,

    /// Error message
    pub message: String,

    /// Error code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Add an error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, self.field.is_empty()) {
            (Some(code), false) => write!(f, "[{}] {}: {}", code, self.field, self.message),
            (Some(code), true) => write!(f, "[{}] {}", code, self.message),
            (None, false) => write!(f, "{}: {}", self.field, self.message),
            (None, true) => write!(f, "{}", self.message),
        }
    }
}
