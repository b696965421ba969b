use super::core::Collection;
use crate::document::Document;
use crate::errors::DbError;
use crate::types::{DocumentId, Operation};

use crate::logger::AUDIT_TARGET as AUDIT;

impl Collection {
    /// Persist then store a new document.
    ///
    /// # Errors
    /// Returns an error if the collection was dropped, the id is already taken or the
    /// log append fails.
    pub fn insert_document(&self, document: Document) -> Result<DocumentId, DbError> {
        self.ensure_live()?;
        let doc_id = document.id.clone();
        if self.docs.read().by_id.contains_key(&doc_id) {
            return Err(DbError::QueryError(format!("duplicate key: _id {doc_id}")));
        }
        let operation = Operation::Insert { collection: self.name().to_string(), document };
        self.storage.lock().append(&operation)?;
        if let Operation::Insert { document, .. } = operation {
            self.docs.write().put(document);
        }
        log::info!(target: AUDIT, "op=insert collection={} id={doc_id}", self.name());
        Ok(doc_id)
    }

    pub fn find_document(&self, id: &DocumentId) -> Option<Document> {
        self.docs.read().by_id.get(id).cloned()
    }

    /// Replace an existing document. Returns `false` when `id` is unknown.
    ///
    /// # Errors
    /// `NoSuchCollection` after a drop, or an error if the log append fails.
    pub fn update_document(&self, id: &DocumentId, new_document: Document) -> Result<bool, DbError> {
        self.ensure_live()?;
        let Some(old) = self.find_document(id) else {
            return Ok(false);
        };
        let mut replacement = new_document;
        replacement.id = id.clone();
        replacement.metadata.created_at = old.metadata.created_at;
        let data = replacement.data.0.clone();
        replacement.update(data);
        let operation = Operation::Update {
            collection: self.name().to_string(),
            document_id: id.clone(),
            new_document: replacement,
        };
        self.storage.lock().append(&operation)?;
        if let Operation::Update { new_document, .. } = operation {
            self.docs.write().put(new_document);
        }
        log::info!(target: AUDIT, "op=update collection={} id={id}", self.name());
        Ok(true)
    }

    /// Remove a document, returning it when it existed.
    ///
    /// # Errors
    /// `NoSuchCollection` after a drop, or an error if the log append fails.
    pub fn delete_document(&self, id: &DocumentId) -> Result<Option<Document>, DbError> {
        self.ensure_live()?;
        if self.find_document(id).is_none() {
            return Ok(None);
        }
        let operation = Operation::Delete { collection: self.name().to_string(), document_id: id.clone() };
        self.storage.lock().append(&operation)?;
        let removed = self.docs.write().remove(id);
        log::info!(target: AUDIT, "op=delete collection={} id={id}", self.name());
        Ok(removed)
    }

    /// All documents in insertion order.
    pub fn get_all_documents(&self) -> Vec<Document> {
        let store = self.docs.read();
        store.order.iter().filter_map(|id| store.by_id.get(id).cloned()).collect()
    }

    /// Apply a replayed log operation to memory without re-logging it.
    pub(crate) fn apply_replayed(&self, operation: Operation) {
        let mut store = self.docs.write();
        match operation {
            Operation::Insert { document, .. } | Operation::Update { new_document: document, .. } => {
                store.put(document);
            }
            Operation::Delete { document_id, .. } => {
                store.remove(&document_id);
            }
            Operation::CreateCollection { .. } | Operation::DropCollection { .. } => {}
        }
    }
}
