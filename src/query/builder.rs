use crate::collection::Collection;
use crate::document::Document;
use crate::errors::DbError;
use bson::{Bson, Document as BsonDocument};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::exec::{count_docs, find_docs};
use super::parse::{parse_filter, parse_projection, parse_projection_str, parse_sort, parse_sort_str};
use super::types::{Filter, FindOptions, Projection, SortSpec};

/// Transform applied to every returned document (schema getters).
pub type ReadHook = Arc<dyn Fn(BsonDocument) -> BsonDocument + Send + Sync>;

/// Chainable find: `find(..).or(..).skip(..).limit(..).sort(..).select(..).exec()`.
///
/// Parse errors from the chaining calls are kept and reported by `exec`/`count`.
#[derive(Clone)]
pub struct Query {
    collection: Option<Arc<Collection>>,
    filter: Filter,
    opts: FindOptions,
    read_hook: Option<ReadHook>,
    error: Option<String>,
}

impl Query {
    /// `collection` is `None` for a model compiled on a disconnected database.
    #[must_use]
    pub fn new(collection: Option<Arc<Collection>>, filter: Filter) -> Self {
        Self { collection, filter, opts: FindOptions::default(), read_hook: None, error: None }
    }

    #[must_use]
    pub fn with_read_hook(mut self, hook: ReadHook) -> Self {
        self.read_hook = Some(hook);
        self
    }

    fn fail(mut self, e: DbError) -> Self {
        if self.error.is_none() {
            self.error = Some(e.to_string());
        }
        self
    }

    /// AND a Mongo-style filter document into the query.
    #[must_use]
    pub fn filter(self, doc: BsonDocument) -> Self {
        match parse_filter(&doc) {
            Ok(f) => self.and_filter(f),
            Err(e) => self.fail(e),
        }
    }

    #[must_use]
    pub fn and_filter(mut self, f: Filter) -> Self {
        self.filter = std::mem::replace(&mut self.filter, Filter::True).and(f);
        self
    }

    #[must_use]
    pub fn where_eq(self, path: &str, value: impl Into<Bson>) -> Self {
        self.and_filter(Filter::eq(path, value))
    }

    /// AND a logical OR of the given sub-filters into the query.
    #[must_use]
    pub fn or(self, docs: Vec<BsonDocument>) -> Self {
        match docs.iter().map(parse_filter).collect::<Result<Vec<_>, _>>() {
            Ok(fs) if fs.is_empty() => self.fail(DbError::QueryError("or() needs at least one filter".into())),
            Ok(fs) => self.and_filter(Filter::Or(fs)),
            Err(e) => self.fail(e),
        }
    }

    #[must_use]
    pub fn nor(self, docs: Vec<BsonDocument>) -> Self {
        match docs.iter().map(parse_filter).collect::<Result<Vec<_>, _>>() {
            Ok(fs) if fs.is_empty() => self.fail(DbError::QueryError("nor() needs at least one filter".into())),
            Ok(fs) => self.and_filter(Filter::Nor(fs)),
            Err(e) => self.fail(e),
        }
    }

    #[must_use]
    pub fn and(self, docs: Vec<BsonDocument>) -> Self {
        docs.into_iter().fold(self, Self::filter)
    }

    #[must_use]
    pub fn skip(mut self, n: usize) -> Self {
        self.opts.skip = Some(n);
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.opts.limit = Some(n);
        self
    }

    /// Page `page_number` (1-based) of `page_size` documents. Zero for either counts as 1.
    #[must_use]
    pub fn paginate(self, page_number: usize, page_size: usize) -> Self {
        let page = page_number.max(1);
        let size = page_size.max(1);
        self.skip((page - 1).saturating_mul(size)).limit(size)
    }

    /// Sort by a document like `{"name": 1}`.
    #[must_use]
    pub fn sort(self, doc: BsonDocument) -> Self {
        match parse_sort(&doc) {
            Ok(specs) => self.sort_by(specs),
            Err(e) => self.fail(e),
        }
    }

    /// Sort by a string like `"name -price"`.
    #[must_use]
    pub fn sort_str(self, s: &str) -> Self {
        self.sort_by(parse_sort_str(s))
    }

    #[must_use]
    pub fn sort_by(mut self, specs: Vec<SortSpec>) -> Self {
        self.opts.sort = if specs.is_empty() { None } else { Some(specs) };
        self
    }

    /// Project with a document like `{"name": 1, "tags": 1}`.
    #[must_use]
    pub fn select(self, doc: BsonDocument) -> Self {
        match parse_projection(&doc) {
            Ok(p) => self.project(p),
            Err(e) => self.fail(e),
        }
    }

    /// Project with a string like `"name tags -_id"`.
    #[must_use]
    pub fn select_str(self, s: &str) -> Self {
        match parse_projection_str(s) {
            Ok(p) => self.project(p),
            Err(e) => self.fail(e),
        }
    }

    #[must_use]
    pub fn project(mut self, projection: Projection) -> Self {
        self.opts.projection = Some(projection);
        self
    }

    #[must_use]
    pub const fn filter_ref(&self) -> &Filter {
        &self.filter
    }

    #[must_use]
    pub const fn options(&self) -> &FindOptions {
        &self.opts
    }

    fn ready(&self) -> Result<&Arc<Collection>, DbError> {
        if let Some(e) = &self.error {
            return Err(DbError::QueryError(e.clone()));
        }
        self.collection.as_ref().ok_or(DbError::NotConnected)
    }

    /// Run the query and return the matching documents.
    ///
    /// # Errors
    /// Returns the first error recorded while chaining, or `NotConnected`.
    pub fn exec(&self) -> Result<Vec<Document>, DbError> {
        let col = self.ready()?;
        let mut docs = find_docs(col, &self.filter, &self.opts).to_vec();
        if let Some(hook) = &self.read_hook {
            for d in &mut docs {
                d.data.0 = hook(std::mem::take(&mut d.data.0));
            }
        }
        Ok(docs)
    }

    /// # Errors
    /// Same as [`Query::exec`].
    pub fn first(&self) -> Result<Option<Document>, DbError> {
        let mut one = self.clone();
        one.opts.limit = Some(1);
        Ok(one.exec()?.into_iter().next())
    }

    /// Run the query and deserialize each document.
    ///
    /// # Errors
    /// Same as [`Query::exec`], plus BSON errors when a document does not fit `T`.
    pub fn exec_as<T: DeserializeOwned>(&self) -> Result<Vec<T>, DbError> {
        self.exec()?.iter().map(Document::to_typed).collect()
    }

    /// Count matches of the filter, ignoring skip/limit/sort/projection.
    ///
    /// # Errors
    /// Same as [`Query::exec`].
    pub fn count(&self) -> Result<usize, DbError> {
        Ok(count_docs(self.ready()?, &self.filter))
    }
}
