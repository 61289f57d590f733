//! Configuration types for Toolshim
//!
//! External tools are declared in configuration, e.g. `toolshim.toml`:
//!
//! ```toml
//! default_timeout = "10s"
//!
//! [[external_tools]]
//! name = "echo_format"
//! description = "Echo args back with formatting."
//! command = "/usr/local/bin/echo_format"
//!
//! [[external_tools.args]]
//! flag = "--header"
//! type = "string"
//! repeat = true
//!
//! [[external_tools.args]]
//! key = "line"
//! repeat = true
//! ```

use crate::error::{Result, ToolshimError};
use crate::external::{ExternalTool, ToolSpec};
use crate::tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Main configuration for Toolshim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolshimConfig {
    /// Declared external tools
    #[serde(default)]
    pub external_tools: Vec<ToolSpec>,

    /// Deadline applied to an execution when the caller supplies none
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub default_timeout: Duration,

    /// Lock the registry once every configured tool is registered
    #[serde(default = "default_lock_registry")]
    pub lock_registry: bool,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_lock_registry() -> bool {
    true
}

impl Default for ToolshimConfig {
    fn default() -> Self {
        Self {
            external_tools: Vec::new(),
            default_timeout: default_timeout(),
            lock_registry: default_lock_registry(),
        }
    }
}

impl ToolshimConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order, later sources overriding earlier ones:
    /// 1. Defaults
    /// 2. `toolshim.toml` in the working directory, if present
    /// 3. The file named by `TOOLSHIM_CONFIG_PATH`
    /// 4. `TOOLSHIM_`-prefixed environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration source is invalid.
    pub fn load() -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(ToolshimConfig::default()))
            .merge(Toml::file("toolshim.toml"));

        if let Ok(path) = std::env::var("TOOLSHIM_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        let config: ToolshimConfig = figment
            .merge(Env::prefixed("TOOLSHIM_").ignore(&["CONFIG_PATH"]))
            .extract()
            .map_err(|e| {
                ToolshimError::Configuration(format!("Failed to load configuration: {e}"))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.json`, anything
    /// else is read as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Json, Toml, Yaml},
        };

        let path = path.as_ref();
        if !path.is_file() {
            return Err(ToolshimError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let figment = Figment::new();
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
            Some("json") => figment.merge(Json::file(path)),
            _ => figment.merge(Toml::file(path)),
        };

        let config: ToolshimConfig = figment.extract().map_err(|e| {
            ToolshimError::Configuration(format!("Failed to load configuration file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Individual tool specs are checked when the registry is built.
    ///
    /// # Errors
    ///
    /// Returns an error on a blank or duplicate tool name, or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.default_timeout.is_zero() {
            return Err(ToolshimError::Configuration(
                "default_timeout must be greater than zero".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.external_tools.len());
        for (index, spec) in self.external_tools.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(ToolshimError::Configuration(format!(
                    "external_tools[{index}] has an empty name"
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ToolshimError::Configuration(format!(
                    "duplicate external tool name {:?}",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Build every configured tool and register it.
    ///
    /// The first invalid spec aborts the build. The registry is locked
    /// afterwards when `lock_registry` is set.
    pub fn build_registry(&self) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for spec in &self.external_tools {
            let tool = ExternalTool::new(spec)?;
            registry.register(Arc::new(tool))?;
        }
        if self.lock_registry {
            registry.lock();
        }
        info!(tools = registry.len(), locked = self.lock_registry, "tool registry ready");
        Ok(registry)
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    fn write_config(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ToolshimConfig::default();
        assert!(config.external_tools.is_empty());
        assert_eq!(config.default_timeout, Duration::from_secs(30));
        assert!(config.lock_registry);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_file() {
        let file = write_config(
            ".toml",
            r#"
default_timeout = "5s"
lock_registry = false

[[external_tools]]
name = "echo_format"
description = "Echo args back with formatting."
command = "/bin/sh"
pre_args = ["/tmp/echo_format.sh"]

[[external_tools.args]]
flag = "--header"
type = "string"
repeat = true

[[external_tools.args]]
flag = "--reverse"

[[external_tools.args]]
key = "line"
repeat = true
"#,
        );

        let config = ToolshimConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_timeout, Duration::from_secs(5));
        assert!(!config.lock_registry);

        let spec = &config.external_tools[0];
        assert_eq!(spec.name, "echo_format");
        assert_eq!(spec.pre_args, vec!["/tmp/echo_format.sh"]);
        assert_eq!(spec.args.len(), 3);
        assert!(spec.args[0].repeat);
        assert_eq!(spec.args[2].key, "line");
    }

    #[test]
    fn test_from_json_file() {
        let file = write_config(
            ".json",
            r#"{"default_timeout": "250ms", "external_tools": [
                {"name": "a", "description": "b", "command": "/bin/true"}
            ]}"#,
        );

        let config = ToolshimConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_timeout, Duration::from_millis(250));
        assert!(config.lock_registry);
        assert_eq!(config.external_tools[0].command, Path::new("/bin/true"));
    }

    #[test]
    fn test_missing_file() {
        let err = ToolshimConfig::from_file("/no/such/toolshim.toml").unwrap_err();
        assert!(matches!(err, ToolshimError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = ToolshimConfig {
            external_tools: vec![
                ToolSpec::new("a", "first", "/bin/sh"),
                ToolSpec::new("a", "second", "/bin/sh"),
            ],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate external tool name \"a\""));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = ToolshimConfig {
            default_timeout: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_build_registry_locks() {
        let config = ToolshimConfig {
            external_tools: vec![ToolSpec::new("sh", "Run a shell", "/bin/sh")],
            ..Default::default()
        };

        let mut registry = config.build_registry().unwrap();
        assert_eq!(registry.names(), vec!["sh"]);
        assert!(registry.is_locked());

        let again = ExternalTool::new(&config.external_tools[0]).unwrap();
        assert!(registry.register(Arc::new(again)).is_err());
    }

    #[test]
    fn test_build_registry_surfaces_spec_error() {
        let config = ToolshimConfig {
            external_tools: vec![ToolSpec::new("bad", "Missing binary", "/no/such/binary")],
            ..Default::default()
        };
        let err = config.build_registry().unwrap_err();
        assert!(matches!(err, ToolshimError::Spec(_)));
        assert!(err.to_string().starts_with("invalid tool configuration"));
    }
}
