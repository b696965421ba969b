//! Mongo-style query documents to `Filter`, `UpdateDoc`, sort and projection.

use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};
use serde::{Deserialize, Serialize};

use super::types::{
    CmpOp, Filter, MAX_IN_SET, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, MAX_UPDATE_FIELDS, Order,
    Projection, SortSpec, UpdateDoc,
};
use crate::document::ID_FIELD;

fn qerr(msg: impl Into<String>) -> DbError {
    DbError::QueryError(msg.into())
}

/// Parse a filter document such as `{"author": "Mosh", "price": {"$gte": 10}}`.
///
/// # Errors
/// Returns `DbError::QueryError` for unknown operators or malformed operands.
pub fn parse_filter(doc: &BsonDocument) -> Result<Filter, DbError> {
    let mut clauses = Vec::with_capacity(doc.len());
    for (key, value) in doc {
        clauses.push(parse_clause(key, value)?);
    }
    Ok(match clauses.len() {
        0 => Filter::True,
        1 => clauses.remove(0),
        _ => Filter::And(clauses),
    })
}

fn parse_clause(key: &str, value: &Bson) -> Result<Filter, DbError> {
    match key {
        "$and" => Ok(Filter::And(parse_filter_list(key, value)?)),
        "$or" => Ok(Filter::Or(parse_filter_list(key, value)?)),
        "$nor" => Ok(Filter::Nor(parse_filter_list(key, value)?)),
        _ if key.starts_with('$') => Err(qerr(format!("unknown top-level operator {key}"))),
        _ => match value {
            Bson::Document(ops) if is_operator_doc(ops) => parse_field_ops(key, ops),
            other => Ok(Filter::Cmp { path: key.to_string(), op: CmpOp::Eq, value: other.clone() }),
        },
    }
}

fn parse_filter_list(op: &str, value: &Bson) -> Result<Vec<Filter>, DbError> {
    let Bson::Array(items) = value else {
        return Err(qerr(format!("{op} requires an array")));
    };
    if items.is_empty() {
        return Err(qerr(format!("{op} requires a non-empty array")));
    }
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => parse_filter(d),
            _ => Err(qerr(format!("{op} entries must be documents"))),
        })
        .collect()
}

fn is_operator_doc(d: &BsonDocument) -> bool {
    d.keys().next().is_some_and(|k| k.starts_with('$'))
}

fn parse_field_ops(path: &str, ops: &BsonDocument) -> Result<Filter, DbError> {
    let mut out = Vec::new();
    #[cfg(feature = "regex")]
    let case_insensitive = matches!(ops.get("$options"), Some(Bson::String(o)) if o.contains('i'));
    for (op, operand) in ops {
        let path = path.to_string();
        let f = match op.as_str() {
            "$eq" => Filter::Cmp { path, op: CmpOp::Eq, value: operand.clone() },
            "$ne" => Filter::Cmp { path, op: CmpOp::Ne, value: operand.clone() },
            "$gt" => Filter::Cmp { path, op: CmpOp::Gt, value: operand.clone() },
            "$gte" => Filter::Cmp { path, op: CmpOp::Gte, value: operand.clone() },
            "$lt" => Filter::Cmp { path, op: CmpOp::Lt, value: operand.clone() },
            "$lte" => Filter::Cmp { path, op: CmpOp::Lte, value: operand.clone() },
            "$in" | "$nin" => {
                let Bson::Array(values) = operand else {
                    return Err(qerr(format!("{op} requires an array")));
                };
                let values = values.iter().take(MAX_IN_SET).cloned().collect();
                if op == "$in" { Filter::In { path, values } } else { Filter::Nin { path, values } }
            }
            "$exists" => Filter::Exists { path, exists: truthy(operand) },
            "$not" => match operand {
                Bson::Document(inner) if is_operator_doc(inner) => {
                    Filter::Not(Box::new(parse_field_ops(&path, inner)?))
                }
                _ => return Err(qerr("$not requires an operator document")),
            },
            #[cfg(feature = "regex")]
            "$regex" => match operand {
                Bson::String(pattern) => {
                    if pattern.len() > 512 {
                        return Err(qerr("$regex pattern too long"));
                    }
                    Filter::Regex { path, pattern: pattern.clone(), case_insensitive }
                }
                _ => return Err(qerr("$regex requires a string")),
            },
            #[cfg(feature = "regex")]
            "$options" => continue,
            other => return Err(qerr(format!("unsupported operator {other}"))),
        };
        out.push(f);
    }
    Ok(if out.len() == 1 { out.remove(0) } else { Filter::And(out) })
}

fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        _ => true,
    }
}

/// # Errors
/// Returns an error if the JSON string is not an object or not a valid filter.
pub fn parse_filter_json(json: &str) -> Result<Filter, DbError> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Ok(Filter::True);
    }
    parse_filter(&json_to_document(trimmed)?)
}

/// Convert a JSON object into a BSON document.
///
/// # Errors
/// Returns an error if the text is not a JSON object.
pub fn json_to_document(json: &str) -> Result<BsonDocument, DbError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Object(map) = value else {
        return Err(qerr("expected a JSON object"));
    };
    Ok(BsonDocument::try_from(map)?)
}

// Serde-facing structure for update documents
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateDocSerde {
    #[serde(default, rename = "$set")]
    pub set: Option<BsonDocument>,
    #[serde(default, rename = "$inc")]
    pub inc: Option<BsonDocument>,
    #[serde(default, rename = "$unset")]
    pub unset: Option<BsonDocument>,
    #[serde(default, rename = "$push")]
    pub push: Option<BsonDocument>,
}

impl TryFrom<UpdateDocSerde> for UpdateDoc {
    type Error = DbError;

    fn try_from(us: UpdateDocSerde) -> Result<Self, Self::Error> {
        let mut out = Self::default();
        if let Some(setd) = us.set {
            out.set.extend(setd.into_iter().take(MAX_UPDATE_FIELDS));
        }
        if let Some(incd) = us.inc {
            for (k, v) in incd.into_iter().take(MAX_UPDATE_FIELDS) {
                let by = super::eval::as_f64(&v).ok_or_else(|| qerr("$inc requires numeric"))?;
                out.inc.push((k, by));
            }
        }
        if let Some(unset) = us.unset {
            out.unset.extend(unset.into_iter().take(MAX_UPDATE_FIELDS).map(|(k, _)| k));
        }
        if let Some(push) = us.push {
            out.push.extend(push.into_iter().take(MAX_UPDATE_FIELDS));
        }
        if out.paths().any(|p| p == ID_FIELD || p.starts_with("_id.")) {
            return Err(qerr("_id is immutable"));
        }
        Ok(out)
    }
}

/// Parse an update document. A document without operators is treated as `$set`.
///
/// # Errors
/// Returns an error for unknown operators, non-numeric `$inc` or `_id` changes.
pub fn parse_update(doc: &BsonDocument) -> Result<UpdateDoc, DbError> {
    if doc.is_empty() {
        return Err(qerr("empty update"));
    }
    if !is_operator_doc(doc) {
        return UpdateDoc::try_from(UpdateDocSerde { set: Some(doc.clone()), ..Default::default() });
    }
    if let Some(k) = doc.keys().find(|k| !matches!(k.as_str(), "$set" | "$inc" | "$unset" | "$push")) {
        return Err(qerr(format!("unsupported update operator {k}")));
    }
    let us: UpdateDocSerde = bson::deserialize_from_document(doc.clone())?;
    UpdateDoc::try_from(us)
}

/// # Errors
/// Returns an error if the JSON string cannot be parsed into an update structure.
pub fn parse_update_json(json: &str) -> Result<UpdateDoc, DbError> {
    parse_update(&json_to_document(json)?)
}

/// Parse `{"name": 1, "price": -1}`.
///
/// # Errors
/// Returns an error if a direction is not 1/-1 (or "asc"/"desc").
pub fn parse_sort(doc: &BsonDocument) -> Result<Vec<SortSpec>, DbError> {
    doc.iter()
        .take(MAX_SORT_FIELDS)
        .map(|(field, dir)| {
            let order = match dir {
                Bson::String(s) if s.eq_ignore_ascii_case("asc") => Order::Asc,
                Bson::String(s) if s.eq_ignore_ascii_case("desc") => Order::Desc,
                other => match super::eval::as_f64(other) {
                    Some(n) if n > 0.0 => Order::Asc,
                    Some(n) if n < 0.0 => Order::Desc,
                    _ => return Err(qerr(format!("invalid sort direction for {field}"))),
                },
            };
            Ok(SortSpec { field: field.clone(), order })
        })
        .collect()
}

/// Parse a space/comma separated sort string like `"name -price"`.
#[must_use]
pub fn parse_sort_str(s: &str) -> Vec<SortSpec> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .take(MAX_SORT_FIELDS)
        .map(|part| match part.strip_prefix('-') {
            Some(rest) => SortSpec::desc(rest),
            None => SortSpec::asc(part.strip_prefix('+').unwrap_or(part)),
        })
        .collect()
}

/// Parse `{"name": 1, "tags": 1}` (inclusion) or `{"author": 0}` (exclusion).
///
/// # Errors
/// Returns an error when inclusion and exclusion are mixed on fields other than `_id`.
pub fn parse_projection(doc: &BsonDocument) -> Result<Projection, DbError> {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    let mut id_flag = None;
    for (field, flag) in doc.iter().take(MAX_PROJECTION_FIELDS) {
        let on = truthy(flag);
        if field == ID_FIELD {
            id_flag = Some(on);
        } else if on {
            include.push(field.clone());
        } else {
            exclude.push(field.clone());
        }
    }
    projection_from_parts(include, exclude, id_flag)
}

/// Parse a mongoose-style select string like `"name tags -_id"`.
///
/// # Errors
/// Returns an error when inclusion and exclusion are mixed on fields other than `_id`.
pub fn parse_projection_str(s: &str) -> Result<Projection, DbError> {
    let mut include = Vec::new();
    let mut exclude = Vec::new();
    let mut id_flag = None;
    for part in s.split(|c: char| c == ',' || c.is_whitespace()).filter(|p| !p.is_empty()) {
        match part.strip_prefix('-') {
            Some(ID_FIELD) => id_flag = Some(false),
            Some(rest) => exclude.push(rest.to_string()),
            None => match part.strip_prefix('+').unwrap_or(part) {
                ID_FIELD => id_flag = Some(true),
                field => include.push(field.to_string()),
            },
        }
    }
    projection_from_parts(include, exclude, id_flag)
}

/// `id_flag` is the explicit `_id` setting, if any. `_id` alone selects only `_id`.
fn projection_from_parts(
    include: Vec<String>,
    mut exclude: Vec<String>,
    id_flag: Option<bool>,
) -> Result<Projection, DbError> {
    let exclude_id = id_flag == Some(false);
    match (include.is_empty(), exclude.is_empty()) {
        (false, false) => Err(qerr("projection cannot mix inclusion and exclusion")),
        (false, true) => Ok(Projection::Include { fields: include, exclude_id }),
        (true, true) if id_flag == Some(true) => {
            Ok(Projection::Include { fields: Vec::new(), exclude_id: false })
        }
        (true, _) => {
            if exclude_id {
                exclude.push(ID_FIELD.to_string());
            }
            Ok(Projection::Exclude(exclude))
        }
    }
}
