pub mod cli;
pub mod collection;
pub mod config;
pub mod connection;
pub mod course;
pub mod document;
pub mod engine;
pub mod errors;
pub mod logger;
pub mod model;
pub mod playground;
pub mod query;
pub mod schema;
pub mod types;
pub mod wal;

use crate::collection::Collection;
use crate::connection::{ConnectionString, StorageMode};
use crate::engine::Engine;
use crate::errors::DbError;
use crate::model::{Model, collection_name};
use crate::schema::Schema;
use std::path::PathBuf;
use std::sync::Arc;

/// Options for [`Database::connect`].
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Parent directory of on-disk stores; the platform data directory when `None`.
    pub data_dir: Option<PathBuf>,
}

impl ConnectOptions {
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: Some(dir.into()) }
    }
}

/// A handle on one database. A disconnected handle fails every operation with
/// [`DbError::NotConnected`].
#[derive(Debug, Clone)]
pub struct Database {
    uri: String,
    engine: Option<Arc<Engine>>,
}

impl Database {
    /// Connect, logging the outcome. Never fails: on error the handle is disconnected.
    #[must_use]
    pub fn connect(uri: &str, options: &ConnectOptions) -> Self {
        match Self::try_connect(uri, options) {
            Ok(db) => {
                log::info!("Connected to database...");
                db
            }
            Err(e) => {
                log::error!("Could not connect to database... {e}");
                Self { uri: uri.to_string(), engine: None }
            }
        }
    }

    /// # Errors
    /// Returns an error for a malformed connection string or a store that cannot be opened.
    pub fn try_connect(uri: &str, options: &ConnectOptions) -> Result<Self, DbError> {
        let cs = ConnectionString::parse(uri)?;
        let engine = match cs.storage_mode()? {
            StorageMode::Memory => Engine::in_memory(),
            StorageMode::Disk => {
                let base = options.data_dir.clone().unwrap_or_else(config::default_data_dir);
                Engine::open(base.join(&cs.database))?
            }
        };
        log::debug!("opened {cs} ({engine:?})");
        Ok(Self { uri: uri.to_string(), engine: Some(Arc::new(engine)) })
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.engine.is_some()
    }

    fn engine(&self) -> Result<&Arc<Engine>, DbError> {
        self.engine.as_ref().ok_or(DbError::NotConnected)
    }

    /// Compile `schema` into a model on collection `lowercase(name) + "s"`.
    ///
    /// The model is unbound (every call fails with `NotConnected`) when the handle is
    /// disconnected or the collection cannot be created.
    #[must_use]
    pub fn model(&self, name: &str, schema: Schema) -> Model {
        let collection = match self.collection(&collection_name(name)) {
            Ok(col) => Some(col),
            Err(DbError::NotConnected) => None,
            Err(e) => {
                log::error!("model {name}: {e}");
                None
            }
        };
        Model::new(name, collection, schema)
    }

    /// Return the named collection, creating it when missing.
    ///
    /// # Errors
    /// `NotConnected`, or a store error while logging the creation.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        self.engine()?.create_collection(name)
    }

    /// # Errors
    /// `NotConnected`.
    pub fn list_collection_names(&self) -> Result<Vec<String>, DbError> {
        Ok(self.engine()?.list_collection_names())
    }

    /// # Errors
    /// `NotConnected`, or a store error while logging the drop.
    pub fn drop_collection(&self, name: &str) -> Result<bool, DbError> {
        self.engine()?.drop_collection(name)
    }

    /// Rewrite the log to the live state; returns the number of records written.
    ///
    /// # Errors
    /// `NotConnected`, or an I/O error.
    pub fn compact(&self) -> Result<usize, DbError> {
        self.engine()?.compact()
    }

    /// # Errors
    /// `NotConnected`, or an I/O error.
    pub fn flush(&self) -> Result<(), DbError> {
        self.engine()?.flush()
    }

    /// Directory of the store; `None` for in-memory or disconnected handles.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.engine.as_ref().and_then(|e| e.path().map(PathBuf::from))
    }
}
