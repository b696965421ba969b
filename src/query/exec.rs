use crate::collection::Collection;
use crate::document::{Document, ID_FIELD};
use crate::errors::DbError;
use crate::types::DocumentId;
use bson::{Array, Bson, Document as BsonDocument};
use std::sync::Arc;
use std::time::Instant;

use super::cursor::Cursor;
use super::eval::{as_f64, compare_docs, eval_filter, get_path, project};
use super::types::{
    DeleteReport, Filter, FindOptions, MAX_LIMIT, MAX_PATH_DEPTH, MAX_UPDATE_FIELDS, UpdateDoc,
};

use crate::logger::QUERY_TARGET as QUERY_LOG;

fn matching_ids(col: &Collection, filter: &Filter) -> Vec<DocumentId> {
    let store = col.docs.read();
    store
        .order
        .iter()
        .filter(|id| store.by_id.get(*id).is_some_and(|d| eval_filter(d.body(), filter)))
        .cloned()
        .collect()
}

fn window(len: usize, opts: &FindOptions) -> (usize, usize) {
    let skip = opts.skip.unwrap_or(0).min(len);
    let limit = opts.limit.unwrap_or(MAX_LIMIT).min(MAX_LIMIT);
    (skip, skip.saturating_add(limit).min(len))
}

pub fn find_docs(col: &Arc<Collection>, filter: &Filter, opts: &FindOptions) -> Cursor {
    let start = Instant::now();

    // If no sort or projection is needed, keep only IDs to avoid cloning many docs.
    if opts.projection.is_none() && opts.sort.is_none() {
        let ids = matching_ids(col, filter);
        let (from, to) = window(ids.len(), opts);
        let sliced = ids[from..to].to_vec();
        log_find(col, filter, opts, sliced.len(), start);
        return Cursor { collection: col.clone(), ids: sliced, pos: 0, docs: None };
    }

    let mut docs: Vec<Document> = {
        let store = col.docs.read();
        store
            .order
            .iter()
            .filter_map(|id| store.by_id.get(id))
            .filter(|d| eval_filter(d.body(), filter))
            .cloned()
            .collect()
    };
    if let Some(specs) = &opts.sort {
        // Stable sort keeps insertion order among equal keys.
        docs.sort_by(|a, b| compare_docs(a.body(), b.body(), specs));
    }
    let (from, to) = window(docs.len(), opts);
    let mut page: Vec<Document> = docs.drain(from..to).collect();
    if let Some(projection) = &opts.projection {
        for d in &mut page {
            d.data.0 = project(d.body(), projection);
        }
    }
    log_find(col, filter, opts, page.len(), start);
    let ids = page.iter().map(|d| d.id.clone()).collect();
    Cursor { collection: col.clone(), ids, pos: 0, docs: Some(page) }
}

fn log_find(col: &Collection, filter: &Filter, opts: &FindOptions, returned: usize, start: Instant) {
    log::debug!(
        target: QUERY_LOG,
        "op=find collection={} filter={} skip={:?} limit={:?} returned={} duration_us={}",
        col.name(),
        filter.kind(),
        opts.skip,
        opts.limit,
        returned,
        start.elapsed().as_micros()
    );
}

pub fn count_docs(col: &Arc<Collection>, filter: &Filter) -> usize {
    matching_ids(col, filter).len()
}

/// # Errors
/// Returns an error if a deletion cannot be written to the log.
pub fn delete_many(col: &Arc<Collection>, filter: &Filter) -> Result<DeleteReport, DbError> {
    let mut deleted = 0u64;
    for id in matching_ids(col, filter) {
        if col.delete_document(&id)?.is_some() {
            deleted += 1;
        }
    }
    Ok(DeleteReport { deleted })
}

/// # Errors
/// Returns an error if the deletion cannot be written to the log.
pub fn delete_one(col: &Arc<Collection>, filter: &Filter) -> Result<DeleteReport, DbError> {
    let Some(id) = matching_ids(col, filter).into_iter().next() else {
        return Ok(DeleteReport::default());
    };
    let deleted = u64::from(col.delete_document(&id)?.is_some());
    Ok(DeleteReport { deleted })
}

/// Apply update operators in memory. Returns `true` if the document changed.
///
/// # Errors
/// Returns an error when an operator targets `_id`, `$inc` hits a non-number,
/// or `$push` hits a non-array.
pub fn apply_update(doc: &mut Document, upd: &UpdateDoc) -> Result<bool, DbError> {
    if upd.paths().any(|p| p == ID_FIELD || p.starts_with("_id.")) {
        return Err(DbError::QueryError("_id is immutable".into()));
    }
    let body = &mut doc.data.0;
    let mut modified = false;
    for (path, val) in upd.set.iter().take(MAX_UPDATE_FIELDS) {
        modified |= set_path(body, path, val.clone())?;
    }
    for (path, by) in upd.inc.iter().take(MAX_UPDATE_FIELDS) {
        modified |= inc_path(body, path, *by)?;
    }
    for path in upd.unset.iter().take(MAX_UPDATE_FIELDS) {
        modified |= unset_path(body, path);
    }
    for (path, val) in upd.push.iter().take(MAX_UPDATE_FIELDS) {
        modified |= push_path(body, path, val.clone())?;
    }
    if modified {
        doc.touch();
    }
    Ok(modified)
}

fn split_path(path: &str) -> Result<Vec<&str>, DbError> {
    let parts: Vec<&str> = path.split('.').collect();
    if path.is_empty() || parts.iter().any(|p| p.is_empty()) || parts.len() > MAX_PATH_DEPTH {
        return Err(DbError::QueryError(format!("invalid field path '{path}'")));
    }
    Ok(parts)
}

fn set_path(doc: &mut BsonDocument, path: &str, val: Bson) -> Result<bool, DbError> {
    let parts = split_path(path)?;
    let (last, parents) = parts.split_last().ok_or_else(|| DbError::QueryError("empty path".into()))?;
    let mut cur = doc;
    for key in parents {
        if !matches!(cur.get(*key), Some(Bson::Document(_))) {
            cur.insert(*key, Bson::Document(BsonDocument::new()));
        }
        match cur.get_mut(*key) {
            Some(Bson::Document(d)) => cur = d,
            _ => return Ok(false),
        }
    }
    let changed = cur.get(*last).is_none_or(|p| p != &val);
    cur.insert(*last, val);
    Ok(changed)
}

fn inc_path(doc: &mut BsonDocument, path: &str, delta: f64) -> Result<bool, DbError> {
    let new_val = match get_path(doc, path) {
        None => delta,
        Some(v) => {
            let cur = as_f64(v)
                .ok_or_else(|| DbError::QueryError(format!("cannot $inc non-numeric field '{path}'")))?;
            cur + delta
        }
    };
    set_path(doc, path, Bson::Double(new_val))
}

fn unset_path(doc: &mut BsonDocument, path: &str) -> bool {
    let Ok(parts) = split_path(path) else { return false };
    let Some((last, parents)) = parts.split_last() else { return false };
    let mut cur = doc;
    for key in parents {
        match cur.get_mut(*key) {
            Some(Bson::Document(d)) => cur = d,
            _ => return false,
        }
    }
    cur.remove(*last).is_some()
}

fn push_path(doc: &mut BsonDocument, path: &str, val: Bson) -> Result<bool, DbError> {
    let next = match get_path(doc, path) {
        None | Some(Bson::Null) => Array::new(),
        Some(Bson::Array(a)) => a.clone(),
        Some(_) => {
            return Err(DbError::QueryError(format!("cannot $push to non-array field '{path}'")));
        }
    };
    let mut next = next;
    next.push(val);
    set_path(doc, path, Bson::Array(next))
}
