use bson::oid::ObjectId;
use bson::{Bson, DateTime};

use super::field::FieldType;

/// Why a value could not be cast, rendered the way the model layer reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct CastFailure {
    pub target: String,
    pub value: Bson,
}

impl CastFailure {
    #[must_use]
    pub fn message(&self, path: &str) -> String {
        format!(
            "Cast to {} failed for value {} (type {}) at path \"{}\"",
            self.target,
            quoted(&self.value),
            type_name(&self.value),
            path
        )
    }
}

/// Cast `value` to `kind`. `Null` passes through untouched.
///
/// # Errors
/// Returns the offending value when no conversion applies.
pub fn cast(kind: &FieldType, value: Bson) -> Result<Bson, CastFailure> {
    if matches!(value, Bson::Null) {
        return Ok(value);
    }
    let fail = |value: Bson| CastFailure { target: kind.name(), value };
    match kind {
        FieldType::String => match value {
            Bson::String(_) => Ok(value),
            Bson::Int32(n) => Ok(Bson::String(n.to_string())),
            Bson::Int64(n) => Ok(Bson::String(n.to_string())),
            Bson::Double(n) => Ok(Bson::String(display_number(n))),
            Bson::Boolean(b) => Ok(Bson::String(b.to_string())),
            Bson::ObjectId(oid) => Ok(Bson::String(oid.to_hex())),
            other => Err(fail(other)),
        },
        FieldType::Number => match value {
            Bson::Int32(_) | Bson::Int64(_) => Ok(value),
            Bson::Double(n) if n.is_finite() => Ok(value),
            Bson::Boolean(b) => Ok(Bson::Int32(i32::from(b))),
            Bson::String(ref s) => {
                let t = s.trim();
                if t.is_empty() {
                    return Ok(Bson::Null);
                }
                t.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(Bson::Double)
                    .ok_or_else(|| fail(value.clone()))
            }
            other => Err(fail(other)),
        },
        FieldType::Boolean => match value {
            Bson::Boolean(_) => Ok(value),
            Bson::Int32(1) | Bson::Int64(1) => Ok(Bson::Boolean(true)),
            Bson::Int32(0) | Bson::Int64(0) => Ok(Bson::Boolean(false)),
            Bson::String(ref s) => match s.as_str() {
                "true" | "1" | "yes" => Ok(Bson::Boolean(true)),
                "false" | "0" | "no" => Ok(Bson::Boolean(false)),
                _ => Err(fail(value.clone())),
            },
            other => Err(fail(other)),
        },
        FieldType::Date => match value {
            Bson::DateTime(_) => Ok(value),
            Bson::Int64(ms) => Ok(Bson::DateTime(DateTime::from_millis(ms))),
            Bson::Int32(ms) => Ok(Bson::DateTime(DateTime::from_millis(i64::from(ms)))),
            Bson::String(ref s) => DateTime::parse_rfc3339_str(s)
                .map(Bson::DateTime)
                .map_err(|_| fail(value.clone())),
            other => Err(fail(other)),
        },
        FieldType::ObjectId => match value {
            Bson::ObjectId(_) => Ok(value),
            Bson::String(ref s) => {
                ObjectId::parse_str(s).map(Bson::ObjectId).map_err(|_| fail(value.clone()))
            }
            other => Err(fail(other)),
        },
        FieldType::Array(inner) => {
            let items = match value {
                Bson::Array(items) => items,
                scalar => vec![scalar],
            };
            items
                .into_iter()
                .map(|v| cast(inner, v))
                .collect::<Result<Vec<_>, _>>()
                .map(Bson::Array)
                .map_err(|e| CastFailure { target: kind.name(), value: e.value })
        }
    }
}

/// Numbers print without a trailing `.0` when integral, strings are quoted.
#[must_use]
pub fn display_value(v: &Bson) -> String {
    match v {
        Bson::String(s) => s.clone(),
        Bson::Double(n) => display_number(*n),
        Bson::Int32(n) => n.to_string(),
        Bson::Int64(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn display_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

fn quoted(v: &Bson) -> String {
    match v {
        Bson::String(s) => format!("\"{s}\""),
        other => display_value(other),
    }
}

fn type_name(v: &Bson) -> &'static str {
    match v {
        Bson::String(_) => "string",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => "number",
        Bson::Boolean(_) => "boolean",
        Bson::Array(_) => "Array",
        Bson::DateTime(_) => "Date",
        Bson::ObjectId(_) => "ObjectId",
        Bson::Null => "null",
        _ => "Object",
    }
}
