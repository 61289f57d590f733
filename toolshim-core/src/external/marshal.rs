//! Strict input validation and command-line marshaling
//!
//! Input JSON is checked against the bindings before anything else happens:
//! unknown properties, missing required properties and type mismatches are
//! all reported together. Tokens are then produced in declaration order, so
//! the key order of the caller's JSON never matters.

use super::spec::{ArgBinding, ArgStyle, ArgType};
use crate::tools::ValidationError;
use serde_json::{Number, Value};
use std::fmt;

/// A single validated argument value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Num(Number),
    Bool(bool),
}

impl fmt::Display for Scalar {
    /// Natural string form: strings unquoted, integers without a decimal
    /// point, floats in shortest round-trippable form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Num(n) => write!(f, "{n}"),
            Scalar::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Input that passed validation, aligned with the tool's bindings
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedInput {
    values: Vec<(String, Option<Vec<Scalar>>)>,
}

impl ValidatedInput {
    /// Values supplied for `key`; `None` if the key was absent
    pub fn get(&self, key: &str) -> Option<&[Scalar]> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }
}

/// Input JSON did not satisfy the tool's schema
#[derive(Debug, Clone, PartialEq)]
pub struct InputError {
    pub errors: Vec<ValidationError>,
}

impl InputError {
    fn single(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("command input invalid")?;
        for (i, error) in self.errors.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for InputError {}

/// Decode `input` and check it against `bindings`.
pub(crate) fn validate_input(
    bindings: &[ArgBinding],
    input: &str,
) -> Result<ValidatedInput, InputError> {
    let value: Value = serde_json::from_str(input).map_err(|e| {
        InputError::single(
            ValidationError::new("", format!("malformed JSON: {e}")).with_code("MALFORMED_JSON"),
        )
    })?;
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(InputError::single(
                ValidationError::new(
                    "",
                    format!("expected a JSON object, got {}", type_name(&other)),
                )
                .with_code("NOT_AN_OBJECT"),
            ));
        }
    };

    let mut errors = Vec::new();
    for key in map.keys() {
        if !bindings.iter().any(|b| &b.key == key) {
            errors.push(
                ValidationError::new(key, "unknown property").with_code("UNKNOWN_PROPERTY"),
            );
        }
    }

    let mut values = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let bound = match map.get(&binding.key) {
            None => {
                if !binding.optional {
                    errors.push(
                        ValidationError::new(&binding.key, "required property is missing")
                            .with_code("MISSING_PROPERTY"),
                    );
                }
                None
            }
            Some(value) => match bind_value(binding, value) {
                Ok(scalars) => Some(scalars),
                Err(mut errs) => {
                    errors.append(&mut errs);
                    None
                }
            },
        };
        values.push((binding.key.clone(), bound));
    }

    if errors.is_empty() {
        Ok(ValidatedInput { values })
    } else {
        Err(InputError { errors })
    }
}

/// Produce the full argument list: `pre_args`, then one group of tokens per
/// binding in declaration order.
pub(crate) fn build_args(
    bindings: &[ArgBinding],
    pre_args: &[String],
    input: &ValidatedInput,
) -> Vec<String> {
    let mut tokens = pre_args.to_vec();

    for (binding, (_, values)) in bindings.iter().zip(&input.values) {
        let Some(values) = values else { continue };
        for value in values {
            match binding.style {
                ArgStyle::BareFlag => {
                    if *value == Scalar::Bool(true) {
                        tokens.push(binding.flag.clone());
                    }
                }
                ArgStyle::FlagValue => {
                    tokens.push(binding.flag.clone());
                    tokens.push(value.to_string());
                }
                ArgStyle::Positional => tokens.push(value.to_string()),
            }
        }
    }

    tokens
}

fn bind_value(binding: &ArgBinding, value: &Value) -> Result<Vec<Scalar>, Vec<ValidationError>> {
    if !binding.repeat {
        return check_scalar(binding.ty, &binding.key, value)
            .map(|s| vec![s])
            .map_err(|e| vec![e]);
    }

    let Value::Array(items) = value else {
        return Err(vec![mismatch(&binding.key, "array", value)]);
    };
    let mut scalars = Vec::with_capacity(items.len());
    let mut errors = Vec::new();
    for (i, item) in items.iter().enumerate() {
        match check_scalar(binding.ty, &format!("{}[{}]", binding.key, i), item) {
            Ok(s) => scalars.push(s),
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() {
        Ok(scalars)
    } else {
        Err(errors)
    }
}

fn check_scalar(ty: ArgType, field: &str, value: &Value) -> Result<Scalar, ValidationError> {
    match (ty, value) {
        (ArgType::String, Value::String(s)) => Ok(Scalar::Str(s.clone())),
        (ArgType::Boolean, Value::Bool(b)) => Ok(Scalar::Bool(*b)),
        (ArgType::Number, Value::Number(n)) => Ok(Scalar::Num(n.clone())),
        (ArgType::Integer, Value::Number(n)) => integer(n)
            .map(Scalar::Num)
            .ok_or_else(|| mismatch(field, "integer", value)),
        _ => Err(mismatch(field, ty.as_str(), value)),
    }
}

/// Integral numbers pass through; a float with no fractional part that fits
/// in an `i64` is normalized so it renders without a decimal point.
fn integer(n: &Number) -> Option<Number> {
    if n.is_i64() || n.is_u64() {
        return Some(n.clone());
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(Number::from(f as i64))
    } else {
        None
    }
}

fn mismatch(field: &str, expected: &str, got: &Value) -> ValidationError {
    ValidationError::new(
        field,
        format!("expected {expected}, got {}", type_name(got)),
    )
    .with_code("TYPE_MISMATCH")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod marshal_tests {
    use super::*;

    fn bind(flag: &str, key: &str, ty: ArgType, optional: bool, repeat: bool) -> ArgBinding {
        let style = match (flag.is_empty(), ty) {
            (true, _) => ArgStyle::Positional,
            (false, ArgType::Boolean) => ArgStyle::BareFlag,
            (false, _) => ArgStyle::FlagValue,
        };
        ArgBinding {
            key: key.to_string(),
            flag: flag.to_string(),
            ty,
            style,
            optional,
            repeat,
            description: String::new(),
        }
    }

    fn echo_bindings() -> Vec<ArgBinding> {
        vec![
            bind("--header", "header", ArgType::String, false, true),
            bind("--reverse", "reverse", ArgType::Boolean, true, false),
            bind("", "line", ArgType::String, false, true),
        ]
    }

    fn marshal(bindings: &[ArgBinding], input: &str) -> Result<Vec<String>, InputError> {
        let validated = validate_input(bindings, input)?;
        Ok(build_args(bindings, &[], &validated))
    }

    #[test]
    fn test_declaration_order_scenario() {
        let tokens = marshal(
            &echo_bindings(),
            r#"{"reverse":true,"header":["h1","h2"],"line":["one","two"]}"#,
        )
        .unwrap();
        assert_eq!(
            tokens,
            vec!["--header", "h1", "--header", "h2", "--reverse", "one", "two"]
        );
    }

    #[test]
    fn test_input_key_order_does_not_matter() {
        let bindings = echo_bindings();
        let a = marshal(&bindings, r#"{"line":["x"],"reverse":true,"header":["h"]}"#).unwrap();
        let b = marshal(&bindings, r#"{"header":["h"],"line":["x"],"reverse":true}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bare_flag_false_or_absent_is_omitted() {
        let bindings = echo_bindings();
        let off = marshal(&bindings, r#"{"header":[],"reverse":false,"line":["a"]}"#).unwrap();
        let absent = marshal(&bindings, r#"{"header":[],"line":["a"]}"#).unwrap();

        assert_eq!(off, vec!["a"]);
        assert_eq!(absent, vec!["a"]);
    }

    #[test]
    fn test_bare_flag_true_has_no_value() {
        let bindings = echo_bindings();
        let tokens = marshal(&bindings, r#"{"header":[],"reverse":true,"line":[]}"#).unwrap();
        assert_eq!(tokens, vec!["--reverse"]);
    }

    #[test]
    fn test_empty_repeat_produces_nothing() {
        let bindings = vec![bind("--tag", "tag", ArgType::String, false, true)];
        assert!(marshal(&bindings, r#"{"tag":[]}"#).unwrap().is_empty());
    }

    #[test]
    fn test_pre_args_come_first() {
        let bindings = vec![bind("", "file", ArgType::String, false, false)];
        let validated = validate_input(&bindings, r#"{"file":"a.txt"}"#).unwrap();
        let tokens = build_args(&bindings, &["-n".to_string()], &validated);
        assert_eq!(tokens, vec!["-n", "a.txt"]);
    }

    #[test]
    fn test_number_rendering() {
        let bindings = vec![
            bind("--seed", "seed", ArgType::Number, false, false),
            bind("--indent", "indent", ArgType::Integer, false, false),
            bind("--scale", "scale", ArgType::Number, false, false),
        ];
        let tokens = marshal(&bindings, r#"{"seed":1.2,"indent":4.0,"scale":3}"#).unwrap();
        assert_eq!(tokens, vec!["--seed", "1.2", "--indent", "4", "--scale", "3"]);
    }

    #[test]
    fn test_positional_boolean_renders_literal() {
        let bindings = vec![bind("", "flag", ArgType::Boolean, false, false)];
        assert_eq!(marshal(&bindings, r#"{"flag":false}"#).unwrap(), vec!["false"]);
    }

    #[test]
    fn test_unknown_property_rejected() {
        let err = marshal(&echo_bindings(), r#"{"header":[],"line":[],"foo":1.2}"#).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].field, "foo");
        assert_eq!(err.errors[0].code.as_deref(), Some("UNKNOWN_PROPERTY"));
        assert!(err.to_string().starts_with("command input invalid"));
    }

    #[test]
    fn test_missing_required_rejected() {
        let err = marshal(&echo_bindings(), r#"{"line":["a"]}"#).unwrap_err();
        assert_eq!(err.errors[0].field, "header");
        assert_eq!(err.errors[0].code.as_deref(), Some("MISSING_PROPERTY"));
    }

    #[test]
    fn test_type_mismatches_collected() {
        let err = marshal(
            &echo_bindings(),
            r#"{"header":"h1","reverse":"yes","line":["ok",2]}"#,
        )
        .unwrap_err();
        let fields: Vec<_> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["header", "reverse", "line[1]"]);
        assert!(err.errors.iter().all(|e| e.code.as_deref() == Some("TYPE_MISMATCH")));
    }

    #[test]
    fn test_fractional_integer_rejected() {
        let bindings = vec![bind("--n", "n", ArgType::Integer, false, false)];
        let err = marshal(&bindings, r#"{"n":1.5}"#).unwrap_err();
        assert_eq!(err.errors[0].message, "expected integer, got number");
    }

    #[test]
    fn test_null_is_a_type_mismatch() {
        let bindings = vec![bind("--name", "name", ArgType::String, true, false)];
        let err = marshal(&bindings, r#"{"name":null}"#).unwrap_err();
        assert_eq!(err.errors[0].message, "expected string, got null");
    }

    #[test]
    fn test_malformed_and_non_object_input() {
        let bindings = echo_bindings();
        let bad = marshal(&bindings, "{not json").unwrap_err();
        assert_eq!(bad.errors[0].code.as_deref(), Some("MALFORMED_JSON"));

        let array = marshal(&bindings, "[1,2]").unwrap_err();
        assert_eq!(array.errors[0].code.as_deref(), Some("NOT_AN_OBJECT"));
    }

    #[test]
    fn test_validated_input_lookup() {
        let validated =
            validate_input(&echo_bindings(), r#"{"header":["h"],"line":["a","b"]}"#).unwrap();
        assert_eq!(
            validated.get("line"),
            Some(&[Scalar::Str("a".into()), Scalar::Str("b".into())][..])
        );
        assert_eq!(validated.get("reverse"), None);
    }
}
