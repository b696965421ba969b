use bson::{Bson, Document as BsonDocument};
use std::cmp::Ordering;

use super::types::{
    CmpOp, Filter, MAX_IN_SET, MAX_PATH_DEPTH, MAX_PROJECTION_FIELDS, MAX_SORT_FIELDS, Order,
    Projection, SortSpec,
};
use crate::document::ID_FIELD;

#[must_use]
pub fn eval_filter(doc: &BsonDocument, filter: &Filter) -> bool {
    match filter {
        Filter::True => true,
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Nor(fs) => !fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Not(f) => !eval_filter(doc, f),
        Filter::Exists { path, exists } => get_path(doc, path).is_some() == *exists,
        Filter::In { path, values } => get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Nin { path, values } => !get_path(doc, path).is_some_and(|v| is_in_set(v, values)),
        Filter::Cmp { path, op: CmpOp::Eq, value } => {
            get_path(doc, path).is_some_and(|v| matches_value(v, value))
        }
        Filter::Cmp { path, op: CmpOp::Ne, value } => {
            !get_path(doc, path).is_some_and(|v| matches_value(v, value))
        }
        Filter::Cmp { path, op, value } => get_path(doc, path).is_some_and(|v| {
            candidates(v).any(|c| {
                comparable(c, value)
                    && match op {
                        CmpOp::Gt => compare_bson(c, value) == Ordering::Greater,
                        CmpOp::Gte => compare_bson(c, value) != Ordering::Less,
                        CmpOp::Lt => compare_bson(c, value) == Ordering::Less,
                        CmpOp::Lte => compare_bson(c, value) != Ordering::Greater,
                        CmpOp::Eq | CmpOp::Ne => false,
                    }
            })
        }),
        #[cfg(feature = "regex")]
        Filter::Regex { path, pattern, case_insensitive } => {
            let Ok(re) = regex::RegexBuilder::new(pattern)
                .case_insensitive(*case_insensitive)
                .size_limit(1 << 20)
                .build()
            else {
                return false;
            };
            get_path(doc, path).is_some_and(|v| {
                candidates(v).any(|c| matches!(c, Bson::String(s) if re.is_match(s)))
            })
        }
    }
}

/// The value itself, followed by its elements when it is an array.
fn candidates(v: &Bson) -> impl Iterator<Item = &Bson> {
    let elems: &[Bson] = match v {
        Bson::Array(a) => a,
        _ => &[],
    };
    std::iter::once(v).chain(elems.iter())
}

/// Equality where an array field matches if any element (or the array itself) matches.
fn matches_value(field: &Bson, value: &Bson) -> bool {
    candidates(field).any(|c| bson_equal(c, value))
}

fn is_in_set(v: &Bson, set: &[Bson]) -> bool {
    set.iter().take(MAX_IN_SET).any(|x| matches_value(v, x))
}

/// Range operators only compare values of the same kind.
fn comparable(a: &Bson, b: &Bson) -> bool {
    (as_f64(a).is_some() && as_f64(b).is_some())
        || matches!(
            (a, b),
            (Bson::String(_), Bson::String(_))
                | (Bson::Boolean(_), Bson::Boolean(_))
                | (Bson::DateTime(_), Bson::DateTime(_))
        )
}

pub(crate) fn get_path<'a>(doc: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > 1024 {
        return None;
    }
    let mut parts = path.split('.');
    let mut cur = doc.get(parts.next()?)?;
    for (depth, part) in parts.enumerate() {
        if depth + 2 > MAX_PATH_DEPTH {
            return None;
        }
        match cur {
            Bson::Document(d) => cur = d.get(part)?,
            _ => return None,
        }
    }
    Some(cur)
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn as_f64(b: &Bson) -> Option<f64> {
    match b {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(f) => Some(*f),
        _ => None,
    }
}

#[allow(clippy::float_cmp)]
pub(crate) fn bson_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

pub fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.total_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::Array(x), Bson::Array(y)) => {
            for (ex, ey) in x.iter().zip(y.iter()) {
                let ord = compare_bson(ex, ey);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

const fn type_rank(v: &Bson) -> u8 {
    match v {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::DbPointer(_) => 12,
        Bson::JavaScriptCode(_) | Bson::JavaScriptCodeWithScope(_) => 13,
        Bson::MaxKey => 255,
    }
}

pub fn compare_docs(a: &BsonDocument, b: &BsonDocument, sort: &[SortSpec]) -> Ordering {
    for s in sort.iter().take(MAX_SORT_FIELDS) {
        let ord = match (get_path(a, &s.field), get_path(b, &s.field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if s.order == Order::Asc { ord } else { ord.reverse() };
        }
    }
    Ordering::Equal
}

#[must_use]
pub fn project(doc: &BsonDocument, projection: &Projection) -> BsonDocument {
    match projection {
        Projection::Include { fields, exclude_id } => {
            let mut out = BsonDocument::new();
            if !exclude_id && let Some(id) = doc.get(ID_FIELD) {
                out.insert(ID_FIELD, id.clone());
            }
            // Keep document field order rather than projection order.
            for (k, v) in doc {
                if k == ID_FIELD {
                    continue;
                }
                let wanted = fields.iter().take(MAX_PROJECTION_FIELDS);
                let mut nested: Vec<&str> = Vec::new();
                let mut whole = false;
                for f in wanted {
                    if f == k {
                        whole = true;
                    } else if let Some(rest) = f.strip_prefix(k.as_str()).and_then(|r| r.strip_prefix('.')) {
                        nested.push(rest);
                    }
                }
                if whole {
                    out.insert(k.clone(), v.clone());
                } else if !nested.is_empty()
                    && let Bson::Document(inner) = v
                {
                    let sub = Projection::Include {
                        fields: nested.into_iter().map(str::to_string).collect(),
                        exclude_id: true,
                    };
                    out.insert(k.clone(), project(inner, &sub));
                }
            }
            out
        }
        Projection::Exclude(fields) => {
            let mut out = doc.clone();
            for f in fields.iter().take(MAX_PROJECTION_FIELDS) {
                remove_path(&mut out, f);
            }
            out
        }
    }
}

fn remove_path(doc: &mut BsonDocument, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                remove_path(inner, rest);
            }
        }
    }
}
