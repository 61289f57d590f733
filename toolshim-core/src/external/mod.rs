//! Tools backed by external executables
//!
//! A [`ToolSpec`] declares the command, its fixed leading arguments and the
//! typed arguments a caller may pass. [`ExternalTool::new`] validates it once
//! and derives a strict input schema. Each call to
//! [`ExternalTool::execute`] then:
//!
//! 1. validates the input JSON against that schema,
//! 2. marshals it into command-line tokens in declaration order,
//! 3. runs the command under the caller's [`ToolContext`](crate::tools::ToolContext),
//!    draining both output streams concurrently.
//!
//! A run that times out, is canceled, or exits unsuccessfully yields an
//! [`ExecutionError`] carrying whatever the command wrote.

mod exec;
mod marshal;
mod schema;
mod spec;
mod tool;

pub use exec::{ExecOutcome, ExecutionError};
pub use marshal::{InputError, Scalar, ValidatedInput};
pub use schema::input_schema;
pub use spec::{ArgBinding, ArgError, ArgSpec, ArgStyle, ArgType, SpecError, ToolSpec};
pub use tool::{ExternalTool, ExternalToolError};
