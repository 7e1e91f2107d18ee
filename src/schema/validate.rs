use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

use super::core::{FieldKind, FieldMap, FieldSpec, SelectOption};

/// Why a candidate value was rejected by a field.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FieldError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{value} is not one of the allowed options")]
    InvalidOption { value: Value },
    #[error("{value} is outside the allowed range")]
    OutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
    #[error("item {index}, field `{field}`: {source}")]
    InvalidItem {
        index: usize,
        field: String,
        source: Box<FieldError>,
    },
    #[error("item {index} is missing field `{field}`")]
    MissingItemField { index: usize, field: String },
}

/// Validate `candidate` against `spec`, returning the accepted value.
///
/// The candidate is never modified. Accepted values may be coerced into the
/// canonical shape of the field (`"42"` for a number field becomes `42`, a
/// select value given as a string matches a numeric option).
pub fn validate(spec: &FieldSpec, candidate: &Value) -> Result<Value, FieldError> {
    match &spec.kind {
        FieldKind::Text | FieldKind::LongText => validate_text(candidate),
        FieldKind::Number { min, max } => validate_number(candidate, *min, *max),
        FieldKind::BooleanChoice => validate_boolean(candidate),
        FieldKind::SingleSelect { options } => match_option(options, candidate),
        FieldKind::MultiSelect { options } => match candidate {
            Value::Array(values) => values
                .iter()
                .map(|value| match_option(options, value))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => Err(mismatch("list", other)),
        },
        FieldKind::RepeatingGroup { item_schema } => validate_group(item_schema, candidate),
    }
}

fn validate_text(candidate: &Value) -> Result<Value, FieldError> {
    match candidate {
        Value::String(_) => Ok(candidate.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(mismatch("text", other)),
    }
}

fn validate_number(
    candidate: &Value,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<Value, FieldError> {
    let (accepted, numeric) = match candidate {
        Value::Number(n) => (candidate.clone(), n.as_f64().unwrap_or(f64::NAN)),
        Value::String(raw) => parse_number(raw.trim()).ok_or(FieldError::TypeMismatch {
            expected: "number",
            found: "non-numeric string",
        })?,
        other => return Err(mismatch("number", other)),
    };

    let below = min.is_some_and(|lower| numeric < lower);
    let above = max.is_some_and(|upper| numeric > upper);
    if below || above {
        return Err(FieldError::OutOfRange {
            value: numeric,
            min,
            max,
        });
    }
    Ok(accepted)
}

fn parse_number(raw: &str) -> Option<(Value, f64)> {
    if let Ok(int) = raw.parse::<i64>() {
        return Some((Value::from(int), int as f64));
    }
    let float = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(float).map(|n| (Value::Number(n), float))
}

fn validate_boolean(candidate: &Value) -> Result<Value, FieldError> {
    match candidate {
        Value::Bool(_) => Ok(candidate.clone()),
        Value::String(raw) if raw == "true" => Ok(Value::Bool(true)),
        Value::String(raw) if raw == "false" => Ok(Value::Bool(false)),
        other => Err(mismatch("boolean", other)),
    }
}

fn match_option(options: &[SelectOption], candidate: &Value) -> Result<Value, FieldError> {
    if let Some(option) = options.iter().find(|option| option.value == *candidate) {
        return Ok(option.value.clone());
    }

    // Form inputs hand back strings; accept them for numeric and boolean options.
    if let Value::String(raw) = candidate {
        let matched = options.iter().find(|option| match &option.value {
            Value::Number(n) => n.to_string() == *raw,
            Value::Bool(b) => b.to_string() == *raw,
            _ => false,
        });
        if let Some(option) = matched {
            return Ok(option.value.clone());
        }
    }

    Err(FieldError::InvalidOption {
        value: candidate.clone(),
    })
}

fn validate_group(item_schema: &FieldMap, candidate: &Value) -> Result<Value, FieldError> {
    let Value::Array(items) = candidate else {
        return Err(mismatch("list", candidate));
    };

    let mut accepted = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Value::Object(item) = item else {
            return Err(mismatch("object", item));
        };

        let mut out = Map::new();
        for (key, spec) in item_schema {
            let value = match item.get(key) {
                None | Some(Value::Null) => {
                    return Err(FieldError::MissingItemField {
                        index,
                        field: key.clone(),
                    });
                }
                Some(value) => value,
            };
            let value = validate(spec, value).map_err(|err| FieldError::InvalidItem {
                index,
                field: key.clone(),
                source: Box::new(err),
            })?;
            out.insert(key.clone(), value);
        }

        // Keys outside the item schema (editor bookkeeping) pass through.
        for (key, value) in item {
            if !item_schema.contains_key(key) {
                out.insert(key.clone(), value.clone());
            }
        }
        accepted.push(Value::Object(out));
    }
    Ok(Value::Array(accepted))
}

fn mismatch(expected: &'static str, found: &Value) -> FieldError {
    FieldError::TypeMismatch {
        expected,
        found: value_kind(found),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// Structural check of a field schema, run when a descriptor is built.
pub(crate) fn check_spec(key: &str, spec: &FieldSpec) -> Result<(), String> {
    if key.is_empty() {
        return Err("field keys must not be empty".to_string());
    }

    match &spec.kind {
        FieldKind::Number {
            min: Some(min),
            max: Some(max),
        } if min > max => Err(format!("field `{key}` has min {min} above max {max}")),
        FieldKind::SingleSelect { options } | FieldKind::MultiSelect { options } => {
            if options.is_empty() {
                return Err(format!("select field `{key}` has no options"));
            }
            let mut seen = HashSet::new();
            for option in options {
                if matches!(option.value, Value::Array(_) | Value::Object(_) | Value::Null) {
                    return Err(format!(
                        "select field `{key}` has a non-scalar option value {}",
                        option.value
                    ));
                }
                if !seen.insert(option.value.to_string()) {
                    return Err(format!(
                        "select field `{key}` repeats option value {}",
                        option.value
                    ));
                }
            }
            Ok(())
        }
        FieldKind::RepeatingGroup { item_schema } => {
            if item_schema.is_empty() {
                return Err(format!("repeating group `{key}` has an empty item schema"));
            }
            item_schema
                .iter()
                .try_for_each(|(item_key, item_spec)| check_spec(item_key, item_spec))
                .map_err(|reason| format!("in repeating group `{key}`: {reason}"))
        }
        _ => Ok(()),
    }
}
