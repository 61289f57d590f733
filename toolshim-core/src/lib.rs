//! # Toolshim - external executables as schema-validated tools
//!
//! Toolshim turns a declarative description of a command-line program into a
//! tool with a strict JSON Schema. Callers hand it a JSON object; it is
//! validated, marshaled into argv in a fixed order, and the program runs under
//! a deadline and a cancellation token with both output streams captured.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use toolshim_core::prelude::*;
//! use std::time::Duration;
//!
//! # async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let spec = ToolSpec::new("greet", "Print a greeting.", "/usr/bin/printf")
//!     .with_pre_args(["%s\\n"])
//!     .with_arg(ArgSpec::positional("name"));
//! let tool = ExternalTool::new(&spec)?;
//!
//! let ctx = ToolContext::new().with_timeout(Duration::from_secs(5));
//! let output = tool.execute(&ctx, r#"{"name": "world"}"#).await?;
//! assert_eq!(output, "world\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Layout
//!
//! - [`external`]: tool specs, schema generation, marshaling, execution
//! - [`tools`]: the `Tool` trait, context, error taxonomy and registry
//! - [`config`]: loading tool declarations with figment

pub mod config;
pub mod error;
pub mod external;
pub mod tools;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ToolshimConfig;
    pub use crate::error::{Result, ToolshimError};
    pub use crate::external::{
        ArgError, ArgSpec, ArgType, ExecOutcome, ExecutionError, ExternalTool, ExternalToolError,
        InputError, SpecError, ToolSpec,
    };
    pub use crate::tools::{
        BoxedTool, FunctionDescriptor, RegistryError, Tool, ToolContext, ToolError, ToolErrorKind,
        ToolRegistry, ToolSchema, ValidationError,
    };
}
