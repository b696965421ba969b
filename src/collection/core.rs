use crate::document::Document;
use crate::errors::DbError;
use crate::types::DocumentId;
use crate::wal::StorageEngine;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub type SharedStorage = Arc<Mutex<Box<dyn StorageEngine>>>;

/// Documents of one collection, kept in insertion order.
#[derive(Default)]
pub(crate) struct DocumentStore {
    pub(crate) by_id: HashMap<DocumentId, Document>,
    pub(crate) order: Vec<DocumentId>,
}

impl DocumentStore {
    pub(crate) fn put(&mut self, document: Document) {
        if !self.by_id.contains_key(&document.id) {
            self.order.push(document.id.clone());
        }
        self.by_id.insert(document.id.clone(), document);
    }

    pub(crate) fn remove(&mut self, id: &DocumentId) -> Option<Document> {
        let removed = self.by_id.remove(id)?;
        self.order.retain(|x| x != id);
        Some(removed)
    }
}

pub struct Collection {
    name: String,
    pub(crate) docs: RwLock<DocumentStore>,
    pub(crate) storage: SharedStorage,
    dropped: AtomicBool,
}

impl Collection {
    pub fn new(name: String, storage: SharedStorage) -> Self {
        Self {
            name,
            docs: RwLock::new(DocumentStore::default()),
            storage,
            dropped: AtomicBool::new(false),
        }
    }

    /// Detach from the engine: documents are released and later writes fail.
    pub(crate) fn mark_dropped(&self) {
        self.dropped.store(true, Ordering::Release);
        *self.docs.write() = DocumentStore::default();
    }

    /// `true` once the collection was dropped; handles kept by models go stale.
    pub fn is_dropped(&self) -> bool {
        self.dropped.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_live(&self) -> Result<(), DbError> {
        if self.is_dropped() {
            return Err(DbError::NoSuchCollection(self.name.clone()));
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.docs.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
