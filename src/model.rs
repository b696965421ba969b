//! Models: a schema compiled against a collection.
//!
//! Every write through a [`Model`] goes through [`Schema::validate`]; every read
//! applies the schema getters.

use crate::collection::Collection;
use crate::document::{Document, ID_FIELD};
use crate::errors::DbError;
use crate::query::{
    DeleteReport, Filter, FindOptions, Query, ReadHook, UpdateDoc, UpdateReport, apply_update,
    find_docs, parse_filter, parse_update,
};
use crate::schema::Schema;
use crate::types::DocumentId;
use bson::{Bson, Document as BsonDocument};
use serde::Serialize;
use std::sync::Arc;

/// Collection name for a model: lower-cased and pluralized with a trailing `s`.
#[must_use]
pub fn collection_name(model: &str) -> String {
    let lower = model.to_lowercase();
    if lower.ends_with('s') { lower } else { format!("{lower}s") }
}

#[derive(Clone)]
pub struct Model {
    name: String,
    collection: Option<Arc<Collection>>,
    schema: Arc<Schema>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.name)
            .field("collection", &self.collection_name())
            .field("connected", &self.collection.is_some())
            .finish()
    }
}

impl Model {
    /// `collection` is `None` when compiled on a disconnected database; every
    /// operation then fails with [`DbError::NotConnected`].
    #[must_use]
    pub fn new(name: impl Into<String>, collection: Option<Arc<Collection>>, schema: Schema) -> Self {
        Self { name: name.into(), collection, schema: Arc::new(schema) }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn collection_name(&self) -> String {
        collection_name(&self.name)
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    fn col(&self) -> Result<&Arc<Collection>, DbError> {
        self.collection.as_ref().ok_or(DbError::NotConnected)
    }

    fn read_hook(&self) -> Option<ReadHook> {
        if !self.schema.has_getters() {
            return None;
        }
        let schema = self.schema.clone();
        Some(Arc::new(move |doc| schema.apply_getters(doc)))
    }

    fn present(&self, mut doc: Document) -> Document {
        if self.schema.has_getters() {
            doc.data.0 = self.schema.apply_getters(std::mem::take(&mut doc.data.0));
        }
        doc
    }

    /// Validate and insert one document.
    ///
    /// # Errors
    /// `Validation` when the schema rejects the document, `InvalidDocumentId` for a
    /// malformed `_id`, `NotConnected`, or a store error.
    pub async fn create(&self, doc: BsonDocument) -> Result<Document, DbError> {
        let col = self.col()?;
        let body = self.schema.validate(&self.name, doc).await?;
        let document = Document::from_body(body)?;
        col.insert_document(document.clone())?;
        Ok(self.present(document))
    }

    /// Serialize `value` and insert it.
    ///
    /// # Errors
    /// Same as [`Model::create`], plus BSON errors when `value` is not a document.
    pub async fn create_from<T: Serialize>(&self, value: &T) -> Result<Document, DbError> {
        self.create(bson::serialize_to_document(value)?).await
    }

    /// Validate every document first, then insert them all.
    ///
    /// # Errors
    /// The first validation or identifier error (nothing is inserted), or a store error.
    pub async fn insert_many(&self, docs: Vec<BsonDocument>) -> Result<Vec<Document>, DbError> {
        let col = self.col()?;
        let mut documents = Vec::with_capacity(docs.len());
        for doc in docs {
            let body = self.schema.validate(&self.name, doc).await?;
            documents.push(Document::from_body(body)?);
        }
        let mut out = Vec::with_capacity(documents.len());
        for document in documents {
            col.insert_document(document.clone())?;
            out.push(self.present(document));
        }
        Ok(out)
    }

    /// Insert `doc`, or replace the stored document with the same id.
    ///
    /// # Errors
    /// Same as [`Model::create`].
    pub async fn save(&self, doc: Document) -> Result<Document, DbError> {
        let col = self.col()?;
        let body = self.schema.validate(&self.name, doc.into_body()).await?;
        let document = Document::from_body(body)?;
        if col.find_document(&document.id).is_some() {
            col.update_document(&document.id, document.clone())?;
        } else {
            col.insert_document(document.clone())?;
        }
        let stored = col.find_document(&document.id).unwrap_or(document);
        Ok(self.present(stored))
    }

    /// Start a chainable query.
    #[must_use]
    pub fn find(&self, filter: BsonDocument) -> Query {
        let query = Query::new(self.collection.clone(), Filter::True).filter(filter);
        match self.read_hook() {
            Some(hook) => query.with_read_hook(hook),
            None => query,
        }
    }

    /// # Errors
    /// `InvalidDocumentId` when `id` is not a valid identifier, or `NotConnected`.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Document>, DbError> {
        let id: DocumentId = id.parse()?;
        Ok(self.col()?.find_document(&id).map(|d| self.present(d)))
    }

    /// # Errors
    /// Query errors in `filter`, or `NotConnected`.
    pub fn find_one(&self, filter: BsonDocument) -> Result<Option<Document>, DbError> {
        self.find(filter).first()
    }

    /// # Errors
    /// Query errors in `filter`, or `NotConnected`.
    pub fn count_documents(&self, filter: BsonDocument) -> Result<usize, DbError> {
        self.find(filter).count()
    }

    /// Apply `update` to the first match, validating the result.
    ///
    /// # Errors
    /// Query errors, `Validation` for an invalid result, or a store error.
    pub async fn update_one(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<UpdateReport, DbError> {
        let filter = parse_filter(&filter)?;
        let update = parse_update(&update)?;
        Ok(self.update_matching(&filter, &update, Some(1)).await?.0)
    }

    /// Apply `update` to every match. Validation stops at the first invalid result;
    /// documents updated before it stay updated.
    ///
    /// # Errors
    /// Same as [`Model::update_one`].
    pub async fn update_many(
        &self,
        filter: BsonDocument,
        update: BsonDocument,
    ) -> Result<UpdateReport, DbError> {
        let filter = parse_filter(&filter)?;
        let update = parse_update(&update)?;
        Ok(self.update_matching(&filter, &update, None).await?.0)
    }

    /// # Errors
    /// Same as [`Model::update_one`], plus `InvalidDocumentId`.
    pub async fn update_by_id(&self, id: &str, update: BsonDocument) -> Result<UpdateReport, DbError> {
        let filter = id_filter(id)?;
        let update = parse_update(&update)?;
        Ok(self.update_matching(&filter, &update, Some(1)).await?.0)
    }

    /// Update by id and return the document before (default) or after the update.
    ///
    /// # Errors
    /// Same as [`Model::update_by_id`].
    pub async fn find_by_id_and_update(
        &self,
        id: &str,
        update: BsonDocument,
        return_new: bool,
    ) -> Result<Option<Document>, DbError> {
        let filter = id_filter(id)?;
        let update = parse_update(&update)?;
        let (_, before, after) = self.update_matching(&filter, &update, Some(1)).await?;
        let picked = if return_new { after } else { before };
        Ok(picked.map(|d| self.present(d)))
    }

    /// Returns the report plus the first matched document before and after the update.
    async fn update_matching(
        &self,
        filter: &Filter,
        update: &UpdateDoc,
        limit: Option<usize>,
    ) -> Result<(UpdateReport, Option<Document>, Option<Document>), DbError> {
        let col = self.col()?;
        let opts = FindOptions { limit, ..FindOptions::default() };
        let mut report = UpdateReport::default();
        let (mut first_before, mut first_after) = (None, None);
        for stored in find_docs(col, filter, &opts) {
            report.matched += 1;
            let mut next = stored.clone();
            let mut result = stored.clone();
            if apply_update(&mut next, update)? {
                let body = self.schema.validate(&self.name, next.into_body()).await?;
                // Paths dropped by a strict schema can leave the body as it was.
                if &body != stored.body() {
                    result.update(body);
                    col.update_document(&stored.id, result.clone())?;
                    report.modified += 1;
                }
            }
            if first_before.is_none() {
                first_after = col.find_document(&stored.id).or(Some(result));
                first_before = Some(stored);
            }
        }
        Ok((report, first_before, first_after))
    }

    /// # Errors
    /// Query errors in `filter`, `NotConnected`, or a store error.
    pub fn delete_one(&self, filter: BsonDocument) -> Result<DeleteReport, DbError> {
        let filter = parse_filter(&filter)?;
        crate::query::delete_one(self.col()?, &filter)
    }

    /// # Errors
    /// Same as [`Model::delete_one`].
    pub fn delete_many(&self, filter: BsonDocument) -> Result<DeleteReport, DbError> {
        let filter = parse_filter(&filter)?;
        crate::query::delete_many(self.col()?, &filter)
    }

    /// # Errors
    /// `InvalidDocumentId`, `NotConnected`, or a store error.
    pub fn delete_by_id(&self, id: &str) -> Result<DeleteReport, DbError> {
        let deleted = self.find_by_id_and_delete(id)?.is_some();
        Ok(DeleteReport { deleted: u64::from(deleted) })
    }

    /// Delete by id and return the removed document.
    ///
    /// # Errors
    /// Same as [`Model::delete_by_id`].
    pub fn find_by_id_and_delete(&self, id: &str) -> Result<Option<Document>, DbError> {
        let id: DocumentId = id.parse()?;
        Ok(self.col()?.delete_document(&id)?.map(|d| self.present(d)))
    }
}

fn id_filter(id: &str) -> Result<Filter, DbError> {
    let id: DocumentId = id.parse()?;
    Ok(Filter::eq(ID_FIELD, Bson::String(id.to_string())))
}

#[cfg(test)]
mod tests {
    use super::collection_name;

    #[test]
    fn collection_names_are_lowercase_plurals() {
        assert_eq!(collection_name("Course"), "courses");
        assert_eq!(collection_name("News"), "news");
    }
}
