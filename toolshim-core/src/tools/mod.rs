//! Tool abstraction shared by every invocable tool
//!
//! This module defines what callers program against:
//! - [`Tool`], the trait every tool implements
//! - [`ToolContext`], the cancellable handle with an optional deadline
//! - [`ToolError`], a structured error whose kind tells callers how to react
//! - [`ToolRegistry`], name-based lookup with registration locks
//!
//! # Example
//!
//! ```rust,no_run
//! use toolshim_core::tools::{ToolContext, ToolRegistry};
//! use std::time::Duration;
//!
//! # async fn run(registry: ToolRegistry) {
//! let ctx = ToolContext::new().with_timeout(Duration::from_secs(5));
//! let output = registry.exec("echo_format", &ctx, r#"{"line": ["hi"]}"#).await;
//! # }
//! ```

mod registry;
mod result;
mod runtime;
mod tool;

pub use registry::{RegistryError, ToolRegistry};
pub use result::{ToolError, ToolErrorKind, ValidationError};
pub use runtime::ToolContext;
pub use tool::{BoxedTool, FunctionDescriptor, Tool, ToolSchema};
