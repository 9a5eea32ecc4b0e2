// src/selector/json.rs

//! JSON rules, evaluated by `jsonpath_rust`.
//!
//! Adapters usually write dotted key paths (`list`, `data.items`, `list.0`).
//! Those are translated to bracket JSONPath; a source that already starts
//! with `$` is used as written.

use std::str::FromStr;

use jsonpath_rust::JsonPath as Query;
use serde_json::Value;

/// A validated JSON path.
#[derive(Debug, Clone)]
pub struct JsonPath {
    source: String,
    expression: String,
}

impl JsonPath {
    /// Translate and validate a path. An empty path addresses the value itself.
    pub fn parse(source: &str) -> Result<Self, String> {
        let expression = to_jsonpath(source)?;
        query(&expression)?;
        Ok(Self {
            source: source.to_string(),
            expression,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// The JSONPath handed to the engine.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Matched values. Nulls are dropped and an array result is flattened
    /// into its elements.
    pub fn select(&self, root: &Value) -> Vec<Value> {
        let Ok(query) = query(&self.expression) else {
            return Vec::new();
        };

        query
            .find_slice(root)
            .into_iter()
            .map(|found| found.to_data())
            .flat_map(|value| match value {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => vec![other],
            })
            .collect()
    }

    /// Matched values coerced to strings; objects and arrays are skipped.
    pub fn strings(&self, root: &Value) -> Vec<String> {
        self.select(root).iter().filter_map(scalar_text).collect()
    }
}

fn query(expression: &str) -> Result<Query<Value>, String> {
    Query::<Value>::from_str(expression).map_err(|e| format!("invalid JSON path '{expression}': {e}"))
}

fn to_jsonpath(source: &str) -> Result<String, String> {
    let trimmed = source.trim();
    if trimmed.starts_with('$') {
        return Ok(trimmed.to_string());
    }

    let mut expression = String::from("$");
    if trimmed.is_empty() {
        return Ok(expression);
    }
    for part in trimmed.split('.') {
        let part = part.trim();
        if part.is_empty() {
            return Err(format!("empty segment in JSON path '{source}'"));
        }
        if part.contains('\'') {
            return Err(format!("quote in JSON path segment '{part}'"));
        }
        match part.parse::<usize>() {
            Ok(index) => expression.push_str(&format!("[{index}]")),
            Err(_) => expression.push_str(&format!("['{part}']")),
        }
    }
    Ok(expression)
}

/// String form of a scalar JSON value; `None` for null, objects and arrays.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
