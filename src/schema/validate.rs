use crate::document::ID_FIELD;
use crate::errors::{FieldError, FieldErrorKind, ValidationError};
use bson::{Bson, DateTime, Document as BsonDocument};

use super::Schema;
use super::cast::{cast, display_value};
use super::field::{DefaultValue, FieldDef, FieldType};

impl Schema {
    /// Cast, default, normalize and validate `input` for model `model`.
    ///
    /// The returned document holds `_id` (when given) followed by the schema paths in
    /// declaration order; undeclared paths follow only when the schema is not strict.
    ///
    /// # Errors
    /// Returns every failing path, one error per path, in schema order.
    pub async fn validate(
        &self,
        model: &str,
        mut input: BsonDocument,
    ) -> Result<BsonDocument, ValidationError> {
        let mut out = BsonDocument::new();
        if let Some(id) = input.remove(ID_FIELD) {
            out.insert(ID_FIELD, id);
        }
        let mut errors = Vec::new();
        for def in self.fields() {
            match prepare(def, input.remove(&def.name)) {
                Ok(Some(v)) => {
                    out.insert(def.name.clone(), v);
                }
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }
        if self.is_strict() {
            if !input.is_empty() {
                log::debug!(
                    "{model}: dropped undeclared paths {:?}",
                    input.keys().collect::<Vec<_>>()
                );
            }
        } else {
            for (k, v) in input {
                out.insert(k, v);
            }
        }

        for def in self.fields() {
            if errors.iter().any(|e: &FieldError| e.path == def.name) {
                continue;
            }
            if let Some(e) = check(def, &out).await {
                errors.push(e);
            }
        }
        if errors.is_empty() {
            return Ok(out);
        }
        errors.sort_by_key(|e| self.fields().iter().position(|f| f.name == e.path));
        Err(ValidationError { model: model.to_string(), errors })
    }
}

/// Resolve the value a path will be stored with: default, cast, normalize, setter.
fn prepare(def: &FieldDef, raw: Option<Bson>) -> Result<Option<Bson>, FieldError> {
    let value = match raw {
        Some(v) => v,
        None => match (&def.default, &def.kind) {
            (Some(DefaultValue::Value(v)), _) => v.clone(),
            (Some(DefaultValue::Now), _) => Bson::DateTime(DateTime::now()),
            (None, FieldType::Array(_)) => Bson::Array(Vec::new()),
            (None, _) => return Ok(None),
        },
    };
    let value = cast(&def.kind, value).map_err(|f| FieldError {
        path: def.name.clone(),
        kind: FieldErrorKind::Cast,
        message: f.message(&def.name),
        value: Some(f.value),
    })?;
    if matches!(value, Bson::Null) {
        return Ok(Some(value));
    }
    let value = normalize(def, value);
    Ok(Some(match &def.setter {
        Some(set) => set(value),
        None => value,
    }))
}

fn normalize(def: &FieldDef, value: Bson) -> Bson {
    if !(def.trim || def.lowercase || def.uppercase) {
        return value;
    }
    match value {
        Bson::String(s) => Bson::String(normalize_str(def, &s)),
        Bson::Array(items) => Bson::Array(items.into_iter().map(|v| normalize(def, v)).collect()),
        other => other,
    }
}

fn normalize_str(def: &FieldDef, s: &str) -> String {
    let s = if def.trim { s.trim() } else { s };
    if def.lowercase {
        s.to_lowercase()
    } else if def.uppercase {
        s.to_uppercase()
    } else {
        s.to_string()
    }
}

fn number(v: &Bson) -> Option<f64> {
    match v {
        Bson::Double(n) => Some(*n),
        #[allow(clippy::cast_precision_loss)]
        Bson::Int64(n) => Some(*n as f64),
        Bson::Int32(n) => Some(f64::from(*n)),
        _ => None,
    }
}

fn field_error(def: &FieldDef, kind: FieldErrorKind, message: String, value: &Bson) -> FieldError {
    FieldError { path: def.name.clone(), kind, message, value: Some(value.clone()) }
}

/// First failing rule for one path of the prepared document.
async fn check(def: &FieldDef, doc: &BsonDocument) -> Option<FieldError> {
    let path = &def.name;
    let value = match doc.get(path) {
        None | Some(Bson::Null) => None,
        Some(Bson::String(s)) if s.is_empty() && def.is_required(doc) => None,
        Some(v) => Some(v),
    };
    let Some(value) = value else {
        return def.is_required(doc).then(|| FieldError {
            path: path.clone(),
            kind: FieldErrorKind::Required,
            message: format!("Path `{path}` is required."),
            value: None,
        });
    };

    if let Bson::String(s) = value {
        let len = s.chars().count();
        if let Some(min) = def.min_length
            && len < min
        {
            let msg = format!(
                "Path `{path}` (`{s}`) is shorter than the minimum allowed length ({min})."
            );
            return Some(field_error(def, FieldErrorKind::MinLength, msg, value));
        }
        if let Some(max) = def.max_length
            && len > max
        {
            let msg =
                format!("Path `{path}` (`{s}`) is longer than the maximum allowed length ({max}).");
            return Some(field_error(def, FieldErrorKind::MaxLength, msg, value));
        }
        if let Some(allowed) = &def.enum_values
            && !allowed.iter().any(|a| a == s)
        {
            let msg = format!("`{s}` is not a valid enum value for path `{path}`.");
            return Some(field_error(def, FieldErrorKind::Enum, msg, value));
        }
    }

    if let Some(n) = number(value) {
        if let Some(min) = def.min
            && n < min
        {
            let msg = format!(
                "Path `{path}` ({}) is less than minimum allowed value ({}).",
                display_value(value),
                display_value(&Bson::Double(min))
            );
            return Some(field_error(def, FieldErrorKind::Min, msg, value));
        }
        if let Some(max) = def.max
            && n > max
        {
            let msg = format!(
                "Path `{path}` ({}) is more than maximum allowed value ({}).",
                display_value(value),
                display_value(&Bson::Double(max))
            );
            return Some(field_error(def, FieldErrorKind::Max, msg, value));
        }
    }

    for v in &def.validators {
        if !v.check(value).await {
            return Some(field_error(def, FieldErrorKind::User, v.message().to_string(), value));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn schema() -> Schema {
        Schema::new()
            .field(FieldDef::string("name").required().min_length(3))
            .field(FieldDef::string("kind").enum_values(["a", "b"]).trim().lowercase())
            .field(FieldDef::number("n").min(1.0).max(9.0))
    }

    #[tokio::test]
    async fn output_follows_schema_order_and_drops_unknown_paths() {
        let out = schema()
            .validate("Thing", doc! { "n": 2, "extra": true, "name": "abcd", "kind": " A " })
            .await
            .unwrap();
        let keys: Vec<_> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, ["name", "kind", "n"]);
        assert_eq!(out.get_str("kind").unwrap(), "a");
    }

    #[tokio::test]
    async fn one_error_per_path_in_schema_order() {
        let err = schema()
            .validate("Thing", doc! { "n": 20, "kind": "c" })
            .await
            .unwrap_err();
        let paths: Vec<_> = err.errors.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["name", "kind", "n"]);
        assert_eq!(err.errors[0].message, "Path `name` is required.");
        assert_eq!(err.errors[2].message, "Path `n` (20) is more than maximum allowed value (9).");
    }

    #[tokio::test]
    async fn empty_required_string_is_missing() {
        let err = schema().validate("Thing", doc! { "name": "" }).await.unwrap_err();
        assert_eq!(err.field("name").unwrap().kind, FieldErrorKind::Required);
    }

    #[tokio::test]
    async fn cast_failure_skips_other_rules_for_that_path() {
        let err = schema().validate("Thing", doc! { "name": "abc", "n": "x" }).await.unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].kind, FieldErrorKind::Cast);
    }
}
