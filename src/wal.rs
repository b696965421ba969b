//! Write-ahead log and the storage backends behind a collection.
//!
//! Record framing: `[len: u32 LE][crc32: u32 LE][bincode(Operation)]`.
//! Replay stops at the first truncated or corrupt record.

use crate::errors::DbError;
use crate::types::Operation;
use bincode::config::standard;
use bincode::serde::{decode_from_slice, encode_to_vec};
use crc32fast::Hasher as Crc32Hasher;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

const HEADER_LEN: usize = 8;

/// Where operations are persisted.
pub trait StorageEngine: Send + Sync {
    /// Append one operation.
    ///
    /// # Errors
    /// Returns an error if the operation cannot be encoded or written.
    fn append(&mut self, operation: &Operation) -> Result<(), DbError>;

    /// Read back every intact operation, oldest first.
    ///
    /// # Errors
    /// Returns an error if the backing file cannot be read.
    fn read_all(&self) -> Result<Vec<Operation>, DbError>;

    /// Flush buffered records to durable storage.
    ///
    /// # Errors
    /// Returns an error if flushing or syncing fails.
    fn flush(&mut self) -> Result<(), DbError>;

    /// Atomically replace the whole log with `operations`.
    ///
    /// # Errors
    /// Returns an error if the replacement log cannot be written.
    fn rewrite(&mut self, operations: &[Operation]) -> Result<(), DbError>;
}

#[must_use]
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = Crc32Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Encode one framed record.
///
/// # Errors
/// Returns an error if bincode encoding fails.
pub fn encode_record(operation: &Operation) -> Result<Vec<u8>, DbError> {
    let payload = encode_to_vec(operation, standard())?;
    let len = u32::try_from(payload.len())
        .map_err(|_| DbError::WalError(format!("record too large: {} bytes", payload.len())))?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&crc32(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode framed records until the end of `buf` or the first damaged record.
/// Returns the decoded operations and the number of bytes consumed.
#[must_use]
pub fn decode_records(buf: &[u8]) -> (Vec<Operation>, usize) {
    let mut ops = Vec::new();
    let mut offset = 0usize;
    while offset + HEADER_LEN <= buf.len() {
        let mut len_bytes = [0u8; 4];
        let mut crc_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&buf[offset..offset + 4]);
        crc_bytes.copy_from_slice(&buf[offset + 4..offset + HEADER_LEN]);
        let len = u32::from_le_bytes(len_bytes) as usize;
        let start = offset + HEADER_LEN;
        let Some(end) = start.checked_add(len).filter(|e| *e <= buf.len()) else {
            log::warn!("wal: truncated record at offset {offset}");
            break;
        };
        let payload = &buf[start..end];
        if crc32(payload) != u32::from_le_bytes(crc_bytes) {
            log::warn!("wal: checksum mismatch at offset {offset}");
            break;
        }
        match decode_from_slice::<Operation, _>(payload, standard()) {
            Ok((op, _)) => ops.push(op),
            Err(e) => {
                log::warn!("wal: undecodable record at offset {offset}: {e}");
                break;
            }
        }
        offset = end;
    }
    (ops, offset)
}

/// File-backed log.
pub struct WalStorage {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl WalStorage {
    /// Open (or create) the log at `path`.
    ///
    /// # Errors
    /// Returns an error if the parent directory or the file cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, writer: BufWriter::new(file) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageEngine for WalStorage {
    fn append(&mut self, operation: &Operation) -> Result<(), DbError> {
        let record = encode_record(operation)?;
        self.writer.write_all(&record)?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Operation>, DbError> {
        let mut buf = Vec::new();
        File::open(&self.path)?.read_to_end(&mut buf)?;
        let (ops, consumed) = decode_records(&buf);
        if consumed < buf.len() {
            log::warn!(
                "wal: ignored {} trailing bytes in {}",
                buf.len() - consumed,
                self.path.display()
            );
        }
        Ok(ops)
    }

    fn flush(&mut self) -> Result<(), DbError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        Ok(())
    }

    fn rewrite(&mut self, operations: &[Operation]) -> Result<(), DbError> {
        self.flush()?;
        let tmp_path = self.path.with_extension("compacting");
        {
            let tmp = OpenOptions::new().create(true).write(true).truncate(true).open(&tmp_path)?;
            let mut writer = BufWriter::new(tmp);
            for op in operations {
                writer.write_all(&encode_record(op)?)?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }
}

impl Drop for WalStorage {
    fn drop(&mut self) {
        if let Err(e) = StorageEngine::flush(self) {
            log::error!("wal: flush on close failed: {e}");
        }
    }
}

/// Volatile backend used by `storage=memory` connections.
#[derive(Default)]
pub struct MemoryStorage {
    operations: Vec<Operation>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageEngine for MemoryStorage {
    fn append(&mut self, operation: &Operation) -> Result<(), DbError> {
        self.operations.push(operation.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Operation>, DbError> {
        Ok(self.operations.clone())
    }

    fn flush(&mut self) -> Result<(), DbError> {
        Ok(())
    }

    fn rewrite(&mut self, operations: &[Operation]) -> Result<(), DbError> {
        self.operations = operations.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use bson::doc;

    fn insert_op(name: &str) -> Operation {
        Operation::Insert {
            collection: "courses".into(),
            document: Document::new(doc! {"name": name}),
        }
    }

    #[test]
    fn records_decode_in_order() {
        let mut buf = encode_record(&insert_op("first")).unwrap();
        buf.extend(encode_record(&insert_op("second")).unwrap());
        let (ops, consumed) = decode_records(&buf);
        assert_eq!(consumed, buf.len());
        assert_eq!(ops.len(), 2);
        match &ops[1] {
            Operation::Insert { document, .. } => {
                assert_eq!(document.body().get_str("name").unwrap(), "second");
            }
            other => panic!("unexpected op {other:?}"),
        }
    }

    #[test]
    fn truncated_tail_is_ignored() {
        let mut buf = encode_record(&insert_op("kept")).unwrap();
        let second = encode_record(&insert_op("lost")).unwrap();
        buf.extend_from_slice(&second[..second.len() - 3]);
        let (ops, _) = decode_records(&buf);
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn corrupt_checksum_stops_replay() {
        let mut buf = encode_record(&insert_op("bad")).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        let (ops, consumed) = decode_records(&buf);
        assert!(ops.is_empty());
        assert_eq!(consumed, 0);
    }
}
