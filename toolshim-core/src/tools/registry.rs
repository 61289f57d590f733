//! Tool Registry for registration, lookup, and descriptor listing
//!
//! The `ToolRegistry` provides:
//! - Registration by name, replacing a same-named tool
//! - Locks that stop new names, replacements, or both
//! - Lookup by name and descriptor listing in registration order
//!
//! # Example
//!
//! ```rust,ignore
//! use toolshim_core::tools::ToolRegistry;
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(Arc::new(ExternalTool::new(&spec)?))?;
//! registry.lock();
//!
//! let tool = registry.get("echo_format").unwrap();
//! ```

use super::result::ToolError;
use super::runtime::ToolContext;
use super::tool::{FunctionDescriptor, Tool};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Tool name is blank
    #[error("tool name must not be empty")]
    EmptyName,

    /// Tool not found
    #[error("tool {0:?} not found")]
    NotFound(String),

    /// A new name was registered while new tools are locked out
    #[error("registry is locked for new tools: {0:?}")]
    LockedForNew(String),

    /// A registered name was replaced while replacement is locked out
    #[error("registry is locked for replacement tools: {0:?}")]
    LockedForReplace(String),
}

/// Registry for managing tools by name
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
    locked_new: bool,
    locked_replace: bool,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.order)
            .field("locked_new", &self.locked_new)
            .field("locked_replace", &self.locked_replace)
            .finish()
    }
}

impl ToolRegistry {
    /// Create a new empty, unlocked registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    ///
    /// A tool with the same name replaces the existing one and keeps its
    /// position in [`names`](Self::names).
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }

        if self.tools.contains_key(&name) {
            if self.locked_replace {
                return Err(RegistryError::LockedForReplace(name));
            }
            debug!(tool = %name, "replacing registered tool");
        } else {
            if self.locked_new {
                return Err(RegistryError::LockedForNew(name));
            }
            self.order.push(name.clone());
            debug!(tool = %name, "registered tool");
        }

        self.tools.insert(name, tool);
        Ok(())
    }

    /// Refuse tools with names not yet registered
    pub fn lock_for_new(&mut self) {
        self.locked_new = true;
    }

    /// Refuse replacing already registered tools
    pub fn lock_for_replace(&mut self) {
        self.locked_replace = true;
    }

    /// Refuse all further registration
    pub fn lock(&mut self) {
        self.lock_for_new();
        self.lock_for_replace();
        info!(tools = self.order.len(), "registry locked");
    }

    /// Whether both locks are set
    pub fn is_locked(&self) -> bool {
        self.locked_new && self.locked_replace
    }

    /// Unregister a tool by name
    ///
    /// Removal is allowed even on a locked registry.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn Tool>> {
        let tool = self.tools.remove(name)?;
        self.order.retain(|n| n != name);
        debug!(tool = %name, "unregistered tool");
        Some(tool)
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Function descriptors in registration order
    pub fn function_descriptors(&self) -> Vec<FunctionDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.function_descriptor())
            .collect()
    }

    /// Get the number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look up `name` and execute it with `input`
    pub async fn exec(
        &self,
        name: &str,
        ctx: &ToolContext,
        input: &str,
    ) -> Result<Value, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::not_found(name))?;
        tool.exec(ctx, input).await
    }
}

#[cfg(test)]
mod registry_tests {
    use super::*;
    use crate::tools::ToolSchema;
    use async_trait::async_trait;

    struct NamedTool {
        name: String,
        description: String,
    }

    impl NamedTool {
        fn new(name: &str, description: &str) -> Arc<dyn Tool> {
            Arc::new(Self {
                name: name.to_string(),
                description: description.to_string(),
            })
        }
    }

    #[async_trait]
    impl Tool for NamedTool {
        fn name(&self) -> &str {
            &self.name
        }

        fn description(&self) -> &str {
            &self.description
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::empty()
        }

        async fn exec(&self, _ctx: &ToolContext, _input: &str) -> Result<Value, ToolError> {
            Ok(Value::String(self.description.clone()))
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool::new("search", "v1")).unwrap();

        assert!(registry.contains("search"));
        assert_eq!(registry.get("search").unwrap().description(), "v1");
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut registry = ToolRegistry::new();
        let err = registry.register(NamedTool::new("  ", "x")).unwrap_err();
        assert_eq!(err, RegistryError::EmptyName);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool::new("a", "v1")).unwrap();
        registry.register(NamedTool::new("b", "v1")).unwrap();
        registry.register(NamedTool::new("a", "v2")).unwrap();

        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().description(), "v2");
    }

    #[test]
    fn test_lock_for_new() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool::new("a", "v1")).unwrap();
        registry.lock_for_new();

        let err = registry.register(NamedTool::new("b", "v1")).unwrap_err();
        assert!(err.to_string().starts_with("registry is locked for new tools"));

        registry.register(NamedTool::new("a", "v2")).unwrap();
        assert_eq!(registry.get("a").unwrap().description(), "v2");
    }

    #[test]
    fn test_lock_for_replace() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool::new("a", "v1")).unwrap();
        registry.lock_for_replace();

        let err = registry.register(NamedTool::new("a", "v2")).unwrap_err();
        assert!(err.to_string().starts_with("registry is locked for replacement tools"));

        registry.register(NamedTool::new("b", "v1")).unwrap();
        assert_eq!(registry.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_full_lock() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool::new("a", "v1")).unwrap();
        registry.lock();

        assert!(registry.is_locked());
        assert!(matches!(
            registry.register(NamedTool::new("a", "v2")),
            Err(RegistryError::LockedForReplace(_))
        ));
        assert!(matches!(
            registry.register(NamedTool::new("b", "v1")),
            Err(RegistryError::LockedForNew(_))
        ));
    }

    #[test]
    fn test_unregister() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool::new("a", "v1")).unwrap();
        registry.register(NamedTool::new("b", "v1")).unwrap();

        assert!(registry.unregister("a").is_some());
        assert!(registry.unregister("a").is_none());
        assert_eq!(registry.names(), vec!["b"]);
    }

    #[test]
    fn test_function_descriptors_in_order() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool::new("zeta", "last letter")).unwrap();
        registry.register(NamedTool::new("alpha", "first letter")).unwrap();

        let names: Vec<_> = registry
            .function_descriptors()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
    }

    #[tokio::test]
    async fn test_exec_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(NamedTool::new("a", "hello")).unwrap();
        let ctx = ToolContext::new();

        let value = registry.exec("a", &ctx, "{}").await.unwrap();
        assert_eq!(value, Value::String("hello".to_string()));

        let err = registry.exec("nope", &ctx, "{}").await.unwrap_err();
        assert_eq!(err.kind, crate::tools::ToolErrorKind::NotFound);
    }
}
