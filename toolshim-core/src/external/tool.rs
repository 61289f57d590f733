//! External executables as [`Tool`]s

use super::exec::{self, ExecOutcome, ExecutionError, Invocation};
use super::marshal::{self, InputError, ValidatedInput};
use super::schema;
use super::spec::{ArgBinding, ArgStyle, SpecError, ToolSpec};
use crate::tools::{FunctionDescriptor, Tool, ToolContext, ToolError, ToolErrorKind, ToolSchema};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::debug;

/// Failure of a single external tool invocation
#[derive(Debug, thiserror::Error)]
pub enum ExternalToolError {
    /// Input did not match the schema; nothing was spawned
    #[error(transparent)]
    InvalidInput(#[from] InputError),

    /// The process could not be started
    #[error("failed to spawn {}: {source}", .command.display())]
    Spawn {
        command: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the process or reading its output failed
    #[error("command I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Timed out, canceled, or exited unsuccessfully
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl ExternalToolError {
    /// The execution failure, if the run got that far
    pub fn execution(&self) -> Option<&ExecutionError> {
        match self {
            ExternalToolError::Execution(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.execution().is_some_and(|e| e.kind == ExecOutcome::TimedOut)
    }

    pub fn is_canceled(&self) -> bool {
        self.execution().is_some_and(|e| e.kind == ExecOutcome::Canceled)
    }
}

impl From<ExternalToolError> for ToolError {
    fn from(err: ExternalToolError) -> Self {
        match err {
            ExternalToolError::InvalidInput(e) => ToolError::validation(e.errors),
            ExternalToolError::Execution(e) => {
                let (kind, code) = match e.kind {
                    ExecOutcome::TimedOut => (ToolErrorKind::Timeout, "TIMED_OUT"),
                    ExecOutcome::Canceled => (ToolErrorKind::Cancelled, "CANCELED"),
                    ExecOutcome::NonzeroExit => (ToolErrorKind::CommandFailed, "NONZERO_EXIT"),
                };
                ToolError::new(kind, e.to_string())
                    .with_code(code)
                    .with_context(json!({
                        "stdout": e.stdout,
                        "stderr": e.stderr,
                        "exit_code": e.code(),
                    }))
            }
            other @ (ExternalToolError::Spawn { .. } | ExternalToolError::Io(_)) => {
                ToolError::internal(other.to_string())
            }
        }
    }
}

/// A validated [`ToolSpec`] ready to execute.
///
/// Construction validates the spec once; afterwards the tool is immutable and
/// may be shared and executed concurrently.
#[derive(Debug, Clone)]
pub struct ExternalTool {
    spec: ToolSpec,
    bindings: Vec<ArgBinding>,
    schema: Value,
}

impl ExternalTool {
    /// Validate `spec` and build a tool from it. The caller's spec is left
    /// untouched; defaults are filled in on a copy.
    pub fn new(spec: &ToolSpec) -> Result<Self, SpecError> {
        let mut spec = spec.clone();
        spec.validate()?;
        let bindings = spec.bindings()?;
        let schema = schema::input_schema(&bindings);
        debug!(
            tool = %spec.name,
            command = %spec.command.display(),
            args = bindings.len(),
            "built external tool"
        );
        Ok(Self {
            spec,
            bindings,
            schema,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn description(&self) -> &str {
        &self.spec.description
    }

    /// The validated spec, with argument defaults filled in
    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    /// Strict JSON Schema for the input object
    pub fn input_schema(&self) -> &Value {
        &self.schema
    }

    /// Check `input` against the schema without running anything
    pub fn validate_input(&self, input: &str) -> Result<ValidatedInput, InputError> {
        marshal::validate_input(&self.bindings, input)
    }

    /// Full argument list (excluding the command itself) for `input`
    pub fn build_args(&self, input: &str) -> Result<Vec<String>, InputError> {
        let validated = self.validate_input(input)?;
        Ok(marshal::build_args(&self.bindings, &self.spec.pre_args, &validated))
    }

    /// Validate, marshal, and run the command under `ctx`.
    ///
    /// Invalid input fails before any process is spawned.
    pub async fn execute(
        &self,
        ctx: &ToolContext,
        input: &str,
    ) -> Result<String, ExternalToolError> {
        let args = self.build_args(input)?;
        let stdin = self.spec.send_input.then_some(input.as_bytes());
        exec::run(
            Invocation {
                tool: &self.spec.name,
                command: &self.spec.command,
                args: &args,
                stdin,
                combine_output: self.spec.combine_output,
            },
            ctx,
        )
        .await
    }

    /// Usage text: description, arguments, and the input schema
    pub fn help(&self) -> String {
        let mut out = format!("{}\n\n{}\n", self.spec.name, self.spec.description);
        let _ = writeln!(out, "\nCommand: {}", self.spec.command.display());
        if !self.spec.pre_args.is_empty() {
            let _ = writeln!(out, "Fixed arguments: {}", self.spec.pre_args.join(" "));
        }

        if !self.bindings.is_empty() {
            out.push_str("\nArguments:\n");
            for binding in &self.bindings {
                let usage = match binding.style {
                    ArgStyle::BareFlag => binding.flag.clone(),
                    ArgStyle::FlagValue => format!("{} <{}>", binding.flag, binding.key),
                    ArgStyle::Positional => format!("<{}>", binding.key),
                };
                let mut notes = vec![binding.ty.as_str()];
                if binding.optional {
                    notes.push("optional");
                }
                if binding.repeat {
                    notes.push("repeatable");
                }
                let _ = write!(out, "  {usage}  ({})", notes.join(", "));
                if !binding.description.is_empty() {
                    let _ = write!(out, "  {}", binding.description);
                }
                out.push('\n');
            }
        }
        if self.spec.send_input {
            out.push_str("\nThe input JSON is also written to the command's stdin.\n");
        }

        let schema = serde_json::to_string_pretty(&self.schema).unwrap_or_default();
        let _ = write!(out, "\nInput schema:\n{schema}\n");
        out
    }
}

#[async_trait]
impl Tool for ExternalTool {
    fn name(&self) -> &str {
        ExternalTool::name(self)
    }

    fn description(&self) -> &str {
        ExternalTool::description(self)
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(self.schema.clone())
    }

    fn function_descriptor(&self) -> FunctionDescriptor {
        FunctionDescriptor {
            name: self.spec.name.clone(),
            description: self.spec.description.clone(),
            strict: true,
            parameters: self.schema.clone(),
        }
    }

    fn help(&self) -> String {
        ExternalTool::help(self)
    }

    async fn exec(&self, ctx: &ToolContext, input: &str) -> Result<Value, ToolError> {
        let output = self.execute(ctx, input).await?;
        Ok(Value::String(output))
    }
}
