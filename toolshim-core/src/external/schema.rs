//! JSON Schema generation for external tool input

use super::spec::ArgBinding;
use serde_json::{Map, Value, json};

/// Build the input schema for a set of bindings.
///
/// `required` lists every non-optional key in declaration order.
pub fn input_schema(bindings: &[ArgBinding]) -> Value {
    let mut properties = Map::with_capacity(bindings.len());
    let mut required = Vec::new();

    for binding in bindings {
        properties.insert(binding.key.clone(), property_schema(binding));
        if !binding.optional {
            required.push(Value::String(binding.key.clone()));
        }
    }

    json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false,
        "required": required,
    })
}

fn property_schema(binding: &ArgBinding) -> Value {
    let mut property = Map::new();
    if binding.repeat {
        property.insert("type".to_string(), json!("array"));
        property.insert("items".to_string(), json!({ "type": binding.ty.as_str() }));
    } else {
        property.insert("type".to_string(), json!(binding.ty.as_str()));
    }
    if !binding.description.is_empty() {
        property.insert(
            "description".to_string(),
            Value::String(binding.description.clone()),
        );
    }
    Value::Object(property)
}
