use crate::document::Document;
use crate::errors::DbError;
use bson::Document as BsonDocument;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type CollectionName = String;

/// Server-assigned document identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self).map_err(|_| DbError::InvalidDocumentId(s.to_string()))
    }
}

/// A `bson::Document` carried as raw BSON bytes so bincode can encode it.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializableBsonDocument(pub BsonDocument);

impl Serialize for SerializableBsonDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let bytes = bson::serialize_to_vec(&self.0).map_err(serde::ser::Error::custom)?;
        serializer.serialize_bytes(&bytes)
    }
}

impl<'de> Deserialize<'de> for SerializableBsonDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = <Vec<u8>>::deserialize(deserializer)?;
        let doc = bson::deserialize_from_slice(&bytes).map_err(serde::de::Error::custom)?;
        Ok(Self(doc))
    }
}

/// A `chrono::DateTime<Utc>` carried as an RFC 3339 string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializableDateTime(pub DateTime<Utc>);

impl Serialize for SerializableDateTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for SerializableDateTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let dt =
            DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom)?.with_timezone(&Utc);
        Ok(Self(dt))
    }
}

/// Mutations recorded in the write-ahead log.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Operation {
    CreateCollection { collection: CollectionName },
    DropCollection { collection: CollectionName },
    Insert { collection: CollectionName, document: Document },
    Update { collection: CollectionName, document_id: DocumentId, new_document: Document },
    Delete { collection: CollectionName, document_id: DocumentId },
}

impl Operation {
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::CreateCollection { collection }
            | Self::DropCollection { collection }
            | Self::Insert { collection, .. }
            | Self::Update { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CreateCollection { .. } => "create_collection",
            Self::DropCollection { .. } => "drop_collection",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
        }
    }
}
