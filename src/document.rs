use crate::errors::DbError;
use crate::types::{DocumentId, SerializableBsonDocument, SerializableDateTime};
use bson::{Bson, Document as BsonDocument};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Field name holding the document identifier inside `data`.
pub const ID_FIELD: &str = "_id";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Metadata {
    pub created_at: SerializableDateTime,
    pub updated_at: SerializableDateTime,
}

impl Metadata {
    #[must_use]
    pub fn new() -> Self {
        let now = SerializableDateTime(Utc::now());
        Self { created_at: now.clone(), updated_at: now }
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

/// A stored document. `data` always starts with `_id` mirroring `id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub data: SerializableBsonDocument,
    pub metadata: Metadata,
}

impl Document {
    /// Wraps `data` with a fresh identifier; any `_id` in `data` is replaced.
    #[must_use]
    pub fn new(data: BsonDocument) -> Self {
        Self::with_id(DocumentId::new(), data)
    }

    /// Wraps `data`, keeping its `_id` when present.
    ///
    /// # Errors
    /// `InvalidDocumentId` when `_id` is not a string holding a valid identifier.
    pub fn from_body(data: BsonDocument) -> Result<Self, DbError> {
        let id = match data.get(ID_FIELD) {
            None => DocumentId::new(),
            Some(Bson::String(s)) => s.parse()?,
            Some(other) => return Err(DbError::InvalidDocumentId(other.to_string())),
        };
        Ok(Self::with_id(id, data))
    }

    #[must_use]
    pub fn with_id(id: DocumentId, data: BsonDocument) -> Self {
        Self {
            data: SerializableBsonDocument(stamp_id(&id, data)),
            id,
            metadata: Metadata::new(),
        }
    }

    /// Replace the body, keeping `_id` and bumping `updated_at`.
    pub fn update(&mut self, new_data: BsonDocument) {
        self.data = SerializableBsonDocument(stamp_id(&self.id, new_data));
        self.touch();
    }

    pub fn touch(&mut self) {
        self.metadata.updated_at = SerializableDateTime(Utc::now());
    }

    #[must_use]
    pub const fn body(&self) -> &BsonDocument {
        &self.data.0
    }

    #[must_use]
    pub fn into_body(self) -> BsonDocument {
        self.data.0
    }

    /// Deserialize the body into a typed record.
    ///
    /// # Errors
    /// Returns a BSON error when the body does not match `T`.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T, DbError> {
        Ok(bson::deserialize_from_document(self.data.0.clone())?)
    }

    /// Relaxed extended JSON, the form printed by the command line.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        Bson::Document(self.data.0.clone()).into_relaxed_extjson()
    }
}

fn stamp_id(id: &DocumentId, data: BsonDocument) -> BsonDocument {
    let mut out = BsonDocument::new();
    out.insert(ID_FIELD, id.to_string());
    for (k, v) in data {
        if k != ID_FIELD {
            out.insert(k, v);
        }
    }
    out
}
