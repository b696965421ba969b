use crate::collection::{Collection, SharedStorage};
use crate::errors::DbError;
use crate::types::{CollectionName, Operation};
use crate::wal::{MemoryStorage, StorageEngine, WalStorage};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File name of the log inside a database directory.
pub const WAL_FILE: &str = "wal.bin";

/// The embedded store: named collections over one storage backend.
pub struct Engine {
    path: Option<PathBuf>,
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
    storage: SharedStorage,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("path", &self.path)
            .field("collections", &self.list_collection_names())
            .finish()
    }
}

impl Engine {
    /// Open (or create) a store in directory `dir`, replaying its log.
    ///
    /// # Errors
    /// Returns an error if the directory or log cannot be created or read.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, DbError> {
        let dir = dir.as_ref().to_path_buf();
        let wal = WalStorage::open(dir.join(WAL_FILE))?;
        let engine = Self::with_storage(Some(dir), Box::new(wal));
        engine.replay()?;
        Ok(engine)
    }

    /// A volatile store; nothing survives the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_storage(None, Box::new(MemoryStorage::new()))
    }

    fn with_storage(path: Option<PathBuf>, storage: Box<dyn StorageEngine>) -> Self {
        Self {
            path,
            collections: RwLock::new(HashMap::new()),
            storage: Arc::new(Mutex::new(storage)),
        }
    }

    fn replay(&self) -> Result<(), DbError> {
        let ops = self.storage.lock().read_all()?;
        let count = ops.len();
        for op in ops {
            match &op {
                Operation::CreateCollection { collection } => {
                    self.attach(collection);
                }
                Operation::DropCollection { collection } => {
                    self.collections.write().remove(collection);
                }
                _ => self.attach(op.collection()).apply_replayed(op),
            }
        }
        log::info!("engine: replayed {count} operations from {:?}", self.path);
        Ok(())
    }

    fn attach(&self, name: &str) -> Arc<Collection> {
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Collection::new(name.to_string(), self.storage.clone())))
            .clone()
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Return the named collection, creating (and logging) it when missing.
    ///
    /// # Errors
    /// Returns an error if the creation cannot be logged.
    pub fn create_collection(&self, name: &str) -> Result<Arc<Collection>, DbError> {
        if let Some(col) = self.get_collection(name) {
            return Ok(col);
        }
        self.storage
            .lock()
            .append(&Operation::CreateCollection { collection: name.to_string() })?;
        Ok(self.attach(name))
    }

    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// Drop a collection and its documents. Returns `false` if it did not exist.
    ///
    /// # Errors
    /// Returns an error if the drop cannot be logged.
    pub fn drop_collection(&self, name: &str) -> Result<bool, DbError> {
        if self.get_collection(name).is_none() {
            return Ok(false);
        }
        self.storage
            .lock()
            .append(&Operation::DropCollection { collection: name.to_string() })?;
        let removed = self.collections.write().remove(name);
        if let Some(col) = &removed {
            col.mark_dropped();
        }
        Ok(removed.is_some())
    }

    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Flush the log to disk.
    ///
    /// # Errors
    /// Returns an error if the storage backend fails to flush.
    pub fn flush(&self) -> Result<(), DbError> {
        self.storage.lock().flush()
    }

    /// Rewrite the log so it holds only the live collections and documents.
    ///
    /// # Errors
    /// Returns an error if the compacted log cannot be written.
    pub fn compact(&self) -> Result<usize, DbError> {
        let mut ops = Vec::new();
        for name in self.list_collection_names() {
            let Some(col) = self.get_collection(&name) else { continue };
            ops.push(Operation::CreateCollection { collection: name.clone() });
            for document in col.get_all_documents() {
                ops.push(Operation::Insert { collection: name.clone(), document });
            }
        }
        self.storage.lock().rewrite(&ops)?;
        log::info!("engine: compacted log to {} operations", ops.len());
        Ok(ops.len())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::error!("engine: flush on close failed: {e}");
        }
    }
}
