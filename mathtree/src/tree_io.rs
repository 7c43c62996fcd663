//! Loading serialized trees and `name=value` bindings.

use anyhow::{bail, Context, Result};
use mathtree_node::Node;
use mathtree_value::{Matrix, Nested, Scalar, Value};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

/// Reads a tree from a JSON or YAML file, chosen by extension; anything else
/// is tried as JSON first, then YAML.
pub fn load_tree(path: &Path) -> Result<Node> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read tree file: {}", path.display()))?;
    parse_tree(&content, path.extension().and_then(|ext| ext.to_str()))
        .with_context(|| format!("Failed to load tree from {}", path.display()))
}

pub fn parse_tree(content: &str, extension: Option<&str>) -> Result<Node> {
    match extension {
        Some("json") => serde_json::from_str(content).context("Invalid JSON tree"),
        Some("yaml") | Some("yml") => serde_yaml::from_str(content).context("Invalid YAML tree"),
        _ => match serde_json::from_str(content) {
            Ok(tree) => Ok(tree),
            Err(_) => serde_yaml::from_str(content).context("Input is neither a JSON nor a YAML tree"),
        },
    }
}

/// Parses `name=value`. The value is read as JSON: numbers, booleans, strings
/// and nested numeric arrays (matrices). Anything that is not valid JSON is
/// taken as a plain string.
pub fn parse_binding(text: &str) -> Result<(String, Value)> {
    let Some((name, raw)) = text.split_once('=') else {
        bail!("Expected name=value, got \"{text}\"");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Missing variable name in \"{text}\"");
    }
    let raw = raw.trim();
    let value = match serde_json::from_str::<JsonValue>(raw) {
        Ok(json) => json_to_value(&json).with_context(|| format!("Invalid value for {name}"))?,
        Err(_) => Value::String(raw.to_string()),
    };
    Ok((name.to_string(), value))
}

fn json_to_value(json: &JsonValue) -> Result<Value> {
    match json {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Bool(*b)),
        JsonValue::Number(_) => Ok(Value::Num(json_number(json)?)),
        JsonValue::String(s) => Ok(Value::String(s.clone())),
        JsonValue::Array(_) => Ok(Value::Matrix(Matrix::from_nested(&json_to_nested(json)?)?)),
        JsonValue::Object(_) => bail!("objects cannot be bound to variables"),
    }
}

fn json_to_nested(json: &JsonValue) -> Result<Nested> {
    match json {
        JsonValue::Array(items) => Ok(Nested::Seq(
            items.iter().map(json_to_nested).collect::<Result<_>>()?,
        )),
        other => Ok(Nested::Scalar(Scalar::Real(json_number(other)?))),
    }
}

fn json_number(json: &JsonValue) -> Result<f64> {
    json.as_f64()
        .with_context(|| format!("expected a number, got {json}"))
}
