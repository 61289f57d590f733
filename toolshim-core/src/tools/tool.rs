//! Tool trait and descriptor definitions
//!
//! A tool is anything a caller can invoke by name with a JSON object of
//! arguments. Each tool publishes a strict JSON Schema for that object and a
//! function descriptor suitable for LLM function-calling APIs.

use super::result::ToolError;
use super::runtime::ToolContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

/// JSON Schema for tool parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// JSON Schema for input parameters
    pub parameters: Value,

    /// Whether strict validation is required
    pub strict: bool,
}

impl ToolSchema {
    /// Create a strict schema from a JSON Schema value
    pub fn new(parameters: Value) -> Self {
        Self {
            parameters,
            strict: true,
        }
    }

    /// Create an empty schema (tool takes no parameters)
    pub fn empty() -> Self {
        Self::new(json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false,
            "required": []
        }))
    }

    /// Set strict mode
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Function descriptor in the shape function-calling APIs expect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub strict: bool,
    pub parameters: Value,
}

impl FunctionDescriptor {
    /// Wrap as an OpenAI-style tool entry:
    /// `{"type": "function", "function": {...}}`
    pub fn to_openai_tool(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "strict": self.strict,
                "parameters": self.parameters,
            }
        })
    }
}

/// Core tool trait
///
/// `exec` receives the raw input JSON text. Implementations validate it
/// against their own schema and must not run anything when it is invalid.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (unique within a registry)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Get the JSON schema for this tool's parameters
    fn schema(&self) -> ToolSchema;

    /// Descriptor for function-calling APIs
    fn function_descriptor(&self) -> FunctionDescriptor {
        let schema = self.schema();
        FunctionDescriptor {
            name: self.name().to_string(),
            description: self.description().to_string(),
            strict: schema.strict,
            parameters: schema.parameters,
        }
    }

    /// Human-readable usage text
    fn help(&self) -> String {
        let parameters = serde_json::to_string_pretty(&self.schema().parameters)
            .unwrap_or_else(|_| "{}".to_string());
        format!(
            "{}\n\n{}\n\nInput schema:\n{}\n",
            self.name(),
            self.description(),
            parameters
        )
    }

    /// Execute the tool with the given input JSON
    async fn exec(&self, ctx: &ToolContext, input: &str) -> Result<Value, ToolError>;
}

/// Type alias for a shared tool
pub type BoxedTool = Arc<dyn Tool>;

#[cfg(test)]
mod tool_tests {
    use super::*;

    #[test]
    fn test_empty_schema_is_strict() {
        let schema = ToolSchema::empty();
        assert!(schema.strict);
        assert_eq!(schema.parameters["additionalProperties"], json!(false));
    }

    #[test]
    fn test_openai_wrapper_shape() {
        let descriptor = FunctionDescriptor {
            name: "echo".to_string(),
            description: "Echo input".to_string(),
            strict: true,
            parameters: ToolSchema::empty().parameters,
        };

        let tool = descriptor.to_openai_tool();
        assert_eq!(tool["type"], "function");
        assert_eq!(tool["function"]["name"], "echo");
        assert_eq!(tool["function"]["strict"], json!(true));
        assert_eq!(tool["function"]["parameters"]["type"], "object");
    }
}
