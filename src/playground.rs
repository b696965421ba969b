//! The course tutorial flows: create, list, update and remove courses.

use crate::Database;
use crate::course::{Course, MODEL_NAME, TagValidation, course_schema};
use crate::document::{Document, ID_FIELD};
use crate::errors::DbError;
use crate::model::Model;
use bson::{Bson, Document as BsonDocument, doc};

/// Compile the `Course` model on `db`.
#[must_use]
pub fn course_model(db: &Database, tags: TagValidation) -> Model {
    db.model(MODEL_NAME, course_schema(tags))
}

/// Insert `course`. Validation failures are logged per field and recovered as `Ok(None)`.
///
/// # Errors
/// Any failure other than validation, e.g. `NotConnected`.
pub async fn create_course(model: &Model, course: &Course) -> Result<Option<Document>, DbError> {
    match model.create_from(course).await {
        Ok(doc) => {
            log::info!("created course {}", doc.id);
            Ok(Some(doc))
        }
        Err(DbError::Validation(e)) => {
            for field in &e.errors {
                log::error!("{}", field.message);
            }
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Parameters of [`get_courses`].
#[derive(Debug, Clone, PartialEq)]
pub struct CourseQuery {
    pub author: Option<String>,
    pub is_published: Option<bool>,
    /// Match `author` OR `is_published` instead of both.
    pub any_of: bool,
    /// Extra filter document ANDed with the above, e.g. `{"price": {"$gte": 10}}`.
    pub filter: Option<BsonDocument>,
    pub page_number: usize,
    pub page_size: usize,
    /// Sort string such as `"name"` or `"-price name"`.
    pub sort: String,
    /// Projection string such as `"name tags"`; empty keeps whole documents.
    pub select: String,
}

impl Default for CourseQuery {
    fn default() -> Self {
        Self {
            author: None,
            is_published: None,
            any_of: false,
            filter: None,
            page_number: 1,
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            sort: "name".to_string(),
            select: "name tags".to_string(),
        }
    }
}

impl CourseQuery {
    fn clauses(&self) -> Vec<BsonDocument> {
        let mut out = Vec::new();
        if let Some(author) = &self.author {
            out.push(doc! { "author": author.as_str() });
        }
        if let Some(published) = self.is_published {
            out.push(doc! { "isPublished": published });
        }
        out
    }
}

/// Find one page of courses.
///
/// # Errors
/// Query errors in the filter, sort or projection, or `NotConnected`.
pub fn get_courses(model: &Model, q: &CourseQuery) -> Result<Vec<Document>, DbError> {
    let clauses = q.clauses();
    let mut query = model.find(q.filter.clone().unwrap_or_default());
    query = if q.any_of && !clauses.is_empty() { query.or(clauses) } else { query.and(clauses) };
    let mut query = query.paginate(q.page_number, q.page_size).sort_str(&q.sort);
    if !q.select.trim().is_empty() {
        query = query.select_str(&q.select);
    }
    let courses = query.exec()?;
    log::debug!("get_courses: {} result(s) on page {}", courses.len(), q.page_number);
    Ok(courses)
}

/// Query-first update: fetch by id, apply `changes`, save. `Ok(None)` when `id` is unknown.
///
/// # Errors
/// `InvalidDocumentId`, `Validation` for an invalid result, or a store error.
pub async fn update_course(
    model: &Model,
    id: &str,
    changes: BsonDocument,
) -> Result<Option<Document>, DbError> {
    if changes.contains_key(ID_FIELD) {
        return Err(DbError::QueryError("_id is immutable".into()));
    }
    let Some(mut course) = model.find_by_id(id)? else {
        return Ok(None);
    };
    for (k, v) in changes {
        course.data.0.insert(k, v);
    }
    model.save(course).await.map(Some)
}

/// Update-first: `$set` `changes` by id and return the updated document.
///
/// # Errors
/// Same as [`update_course`].
pub async fn update_course_direct(
    model: &Model,
    id: &str,
    changes: BsonDocument,
) -> Result<Option<Document>, DbError> {
    model.find_by_id_and_update(id, doc! { "$set": Bson::Document(changes) }, true).await
}

/// Delete by id and return the removed course.
///
/// # Errors
/// `InvalidDocumentId` or a store error.
pub fn remove_course(model: &Model, id: &str) -> Result<Option<Document>, DbError> {
    model.find_by_id_and_delete(id)
}
