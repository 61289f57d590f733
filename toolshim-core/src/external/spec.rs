//! Declarative tool specifications and their validation
//!
//! A [`ToolSpec`] is what a user writes in configuration. It is validated once,
//! when an [`ExternalTool`](super::ExternalTool) is built; validation fills in
//! argument defaults and produces the [`ArgBinding`]s the schema generator and
//! the marshaler work from.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// JSON type accepted for an argument value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ArgType {
    /// All recognized argument types
    pub fn all() -> &'static [ArgType] {
        &[
            ArgType::String,
            ArgType::Number,
            ArgType::Integer,
            ArgType::Boolean,
        ]
    }

    /// Schema name of this type
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgType::String => "string",
            ArgType::Number => "number",
            ArgType::Integer => "integer",
            ArgType::Boolean => "boolean",
        }
    }

    /// Parse a schema type name
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a bound argument turns into command-line tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgStyle {
    /// `--flag` alone, present only when the value is `true`
    BareFlag,
    /// `--flag value` for each value
    FlagValue,
    /// `value` with no preceding token
    Positional,
}

/// One argument of an external tool, as written in configuration
///
/// An argument with a `flag` is an option; one without is positional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgSpec {
    /// Flag token, e.g. `--seed`; empty for a positional argument
    pub flag: String,

    /// Input property name; defaults to the flag without leading dashes
    pub key: String,

    /// One of `string`, `number`, `integer`, `boolean`
    #[serde(rename = "type")]
    pub kind: String,

    /// Carried into the generated schema
    pub description: String,

    /// Whether the key may be left out of the input
    pub optional: bool,

    /// Whether the input value is an array of values
    pub repeat: bool,
}

impl ArgSpec {
    /// Create a flagged argument
    pub fn flag(flag: impl Into<String>) -> Self {
        Self {
            flag: flag.into(),
            ..Default::default()
        }
    }

    /// Create a positional argument bound to `key`
    pub fn positional(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Set the input key explicitly
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Set the value type
    pub fn with_type(mut self, kind: ArgType) -> Self {
        self.kind = kind.as_str().to_string();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the argument optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Accept an array of values
    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Check the argument and fill in the `key` and `type` defaults in place.
    ///
    /// A flag with no explicit key is a bare on/off switch and defaults to
    /// `boolean`; everything else defaults to `string`.
    pub fn validate(&mut self) -> Result<(), ArgError> {
        let key_given = !self.key.is_empty();
        if !key_given {
            self.key = self.flag.trim_start_matches('-').to_string();
        }
        if self.key.is_empty() {
            return Err(ArgError::MissingKey);
        }

        if self.kind.is_empty() {
            let default = if !self.flag.is_empty() && !key_given {
                ArgType::Boolean
            } else {
                ArgType::String
            };
            self.kind = default.as_str().to_string();
        }
        if ArgType::parse(&self.kind).is_none() {
            return Err(ArgError::UnsupportedType {
                key: self.key.clone(),
                kind: self.kind.clone(),
            });
        }

        Ok(())
    }

    /// Resolve a validated argument into its binding
    fn bind(&self) -> Result<ArgBinding, ArgError> {
        let ty = ArgType::parse(&self.kind).ok_or_else(|| ArgError::UnsupportedType {
            key: self.key.clone(),
            kind: self.kind.clone(),
        })?;
        let style = match (self.flag.is_empty(), ty) {
            (true, _) => ArgStyle::Positional,
            (false, ArgType::Boolean) => ArgStyle::BareFlag,
            (false, _) => ArgStyle::FlagValue,
        };
        Ok(ArgBinding {
            key: self.key.clone(),
            flag: self.flag.clone(),
            ty,
            style,
            optional: self.optional,
            repeat: self.repeat,
            description: self.description.clone(),
        })
    }
}

/// A validated argument with its marshaling policy made explicit
#[derive(Debug, Clone, PartialEq)]
pub struct ArgBinding {
    pub key: String,
    pub flag: String,
    pub ty: ArgType,
    pub style: ArgStyle,
    pub optional: bool,
    pub repeat: bool,
    pub description: String,
}

/// Declarative description of a tool backed by an external executable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSpec {
    /// Tool identifier exposed to callers
    pub name: String,

    /// What the tool does
    pub description: String,

    /// Path to the executable
    pub command: PathBuf,

    /// Tokens passed verbatim before any marshaled argument
    pub pre_args: Vec<String>,

    /// Argument bindings, in command-line order
    pub args: Vec<ArgSpec>,

    /// Also write the raw input JSON to the child's stdin
    pub send_input: bool,

    /// Return stdout and stderr interleaved in arrival order
    pub combine_output: bool,
}

impl ToolSpec {
    /// Create a spec with the required fields
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        command: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            command: command.into(),
            ..Default::default()
        }
    }

    /// Append an argument
    pub fn with_arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    /// Set the fixed leading arguments
    pub fn with_pre_args<I, S>(mut self, pre_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pre_args = pre_args.into_iter().map(Into::into).collect();
        self
    }

    /// Pipe the raw input to stdin
    pub fn with_send_input(mut self, send_input: bool) -> Self {
        self.send_input = send_input;
        self
    }

    /// Combine stdout and stderr in the result
    pub fn with_combine_output(mut self, combine_output: bool) -> Self {
        self.combine_output = combine_output;
        self
    }

    /// Validate the spec, filling argument defaults in place.
    ///
    /// Checks run in order: name, description, command, then each argument
    /// (including duplicate keys). The first failure is returned.
    pub fn validate(&mut self) -> Result<(), SpecError> {
        if self.name.trim().is_empty() {
            return Err(SpecError::EmptyName);
        }
        if self.description.trim().is_empty() {
            return Err(SpecError::EmptyDescription {
                name: self.name.clone(),
            });
        }
        if self.command.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(SpecError::EmptyCommand {
                name: self.name.clone(),
            });
        }
        check_executable(&self.name, &self.command)?;

        let mut seen = HashSet::with_capacity(self.args.len());
        for (index, arg) in self.args.iter_mut().enumerate() {
            arg.validate().map_err(|source| SpecError::InvalidArg {
                name: self.name.clone(),
                index,
                source,
            })?;
            if !seen.insert(arg.key.clone()) {
                return Err(SpecError::DuplicateKey {
                    name: self.name.clone(),
                    index,
                    key: arg.key.clone(),
                });
            }
        }

        Ok(())
    }

    /// Bindings for a validated spec, in declaration order
    pub(crate) fn bindings(&self) -> Result<Vec<ArgBinding>, SpecError> {
        self.args
            .iter()
            .enumerate()
            .map(|(index, arg)| {
                arg.bind().map_err(|source| SpecError::InvalidArg {
                    name: self.name.clone(),
                    index,
                    source,
                })
            })
            .collect()
    }
}

fn check_executable(name: &str, path: &Path) -> Result<(), SpecError> {
    let metadata = std::fs::metadata(path).map_err(|source| SpecError::CommandNotFound {
        name: name.to_string(),
        path: path.to_path_buf(),
        source,
    })?;

    if !metadata.is_file() || !has_exec_bit(&metadata) {
        return Err(SpecError::CommandNotExecutable {
            name: name.to_string(),
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn has_exec_bit(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn has_exec_bit(_metadata: &std::fs::Metadata) -> bool {
    true
}

/// A tool specification failed validation.
///
/// Every variant is an invalid tool configuration; argument-level problems
/// additionally carry an [`ArgError`] as their source.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("invalid tool configuration: empty name")]
    EmptyName,

    #[error("invalid tool configuration: empty description for {name:?}")]
    EmptyDescription { name: String },

    #[error("invalid tool configuration: empty command for {name:?}")]
    EmptyCommand { name: String },

    #[error("invalid tool configuration: command not found for {name:?}: {}: {source}", .path.display())]
    CommandNotFound {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tool configuration: command not executable for {name:?}: {}", .path.display())]
    CommandNotExecutable { name: String, path: PathBuf },

    #[error("invalid tool configuration: {name:?} arg {index}: {source}")]
    InvalidArg {
        name: String,
        index: usize,
        #[source]
        source: ArgError,
    },

    #[error("invalid tool configuration: {name:?} arg {index}: duplicate key {key:?}")]
    DuplicateKey {
        name: String,
        index: usize,
        key: String,
    },
}

impl SpecError {
    /// The argument-level error, if this failure came from an argument
    pub fn arg_error(&self) -> Option<&ArgError> {
        match self {
            SpecError::InvalidArg { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Index of the offending argument, if any
    pub fn arg_index(&self) -> Option<usize> {
        match self {
            SpecError::InvalidArg { index, .. } | SpecError::DuplicateKey { index, .. } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

/// An argument descriptor is invalid
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    #[error("external tool arg invalid: neither key nor flag specified")]
    MissingKey,

    #[error("external tool arg invalid: unsupported type for {key:?}: {kind:?}")]
    UnsupportedType { key: String, kind: String },
}
