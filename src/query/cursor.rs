use crate::collection::Collection;
use crate::document::Document;
use crate::types::DocumentId;
use std::sync::Arc;

/// A forward-only cursor over query results.
///
/// Without sort or projection only ids are collected and documents are fetched while iterating;
/// otherwise the materialized documents are held in `docs`.
#[derive(Clone)]
pub struct Cursor {
    pub collection: Arc<Collection>,
    pub ids: Vec<DocumentId>,
    pub pos: usize,
    pub docs: Option<Vec<Document>>, // when present, iterate these
}

impl Cursor {
    pub fn advance(&mut self) -> Option<Document> {
        if let Some(ref docs) = self.docs {
            let d = docs.get(self.pos)?.clone();
            self.pos += 1;
            return Some(d);
        }
        // Skip ids deleted since the query ran.
        while let Some(id) = self.ids.get(self.pos) {
            self.pos += 1;
            if let Some(d) = self.collection.find_document(id) {
                return Some(d);
            }
        }
        None
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.as_ref().map_or(self.ids.len(), Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn to_vec(mut self) -> Vec<Document> {
        if let Some(docs) = self.docs.take() {
            return docs.into_iter().skip(self.pos).collect();
        }
        let mut out = Vec::with_capacity(self.ids.len());
        while let Some(d) = self.advance() {
            out.push(d);
        }
        out
    }
}

impl Iterator for Cursor {
    type Item = Document;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
