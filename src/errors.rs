use bson::Bson;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(#[from] bson::error::Error),

    #[error("Collection not found: {0}")]
    NoSuchCollection(String),

    #[error("Invalid document ID: {0}")]
    InvalidDocumentId(String),

    #[error("WAL error: {0}")]
    WalError(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("Not connected to a database")]
    NotConnected,

    #[error("Config error: {0}")]
    Config(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// What kind of rule a field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    Cast,
    Enum,
    MinLength,
    MaxLength,
    Min,
    Max,
    User,
}

impl FieldErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Cast => "cast",
            Self::Enum => "enum",
            Self::MinLength => "minlength",
            Self::MaxLength => "maxlength",
            Self::Min => "min",
            Self::Max => "max",
            Self::User => "user defined",
        }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub path: String,
    pub kind: FieldErrorKind,
    pub message: String,
    pub value: Option<Bson>,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// All field failures collected while validating one document, in schema order.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ValidationError {
    pub model: String,
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    #[must_use]
    pub fn field(&self, path: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.path == path)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation failed: ", self.model)?;
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}
