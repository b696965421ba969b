use bson::doc;
use coursebook::document::Document;
use coursebook::types::Operation;
use coursebook::wal::{StorageEngine, WalStorage, decode_records, encode_record};
use std::io::Write;

fn insert(name: &str) -> Operation {
    Operation::Insert { collection: "courses".into(), document: Document::new(doc! { "name": name }) }
}

#[test]
fn test_append_flush_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("wal.bin");
    let mut wal = WalStorage::open(&path).unwrap();
    wal.append(&Operation::CreateCollection { collection: "courses".into() }).unwrap();
    wal.append(&insert("a")).unwrap();
    wal.flush().unwrap();
    let ops = wal.read_all().unwrap();
    assert_eq!(ops.iter().map(Operation::kind).collect::<Vec<_>>(), ["create_collection", "insert"]);
    assert_eq!(wal.path(), path);
}

#[test]
fn test_torn_write_is_skipped_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wal.bin");
    {
        let mut wal = WalStorage::open(&path).unwrap();
        wal.append(&insert("a")).unwrap();
        wal.append(&insert("b")).unwrap();
    }
    let partial = encode_record(&insert("c")).unwrap();
    let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    f.write_all(&partial[..partial.len() / 2]).unwrap();
    drop(f);

    let wal = WalStorage::open(&path).unwrap();
    assert_eq!(wal.read_all().unwrap().len(), 2);
}

#[test]
fn test_rewrite_replaces_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wal.bin");
    let mut wal = WalStorage::open(&path).unwrap();
    for n in ["a", "b", "c"] {
        wal.append(&insert(n)).unwrap();
    }
    wal.rewrite(&[insert("only")]).unwrap();
    wal.append(&insert("after")).unwrap();
    wal.flush().unwrap();
    let ops = wal.read_all().unwrap();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].collection(), "courses");
}

#[test]
fn test_length_prefix_past_end_stops_decoding() {
    let mut buf = encode_record(&insert("a")).unwrap();
    let good = buf.len();
    buf.extend_from_slice(&u32::MAX.to_le_bytes());
    buf.extend_from_slice(&[0u8; 4]);
    let (ops, consumed) = decode_records(&buf);
    assert_eq!(ops.len(), 1);
    assert_eq!(consumed, good);
}
