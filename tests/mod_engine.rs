use bson::doc;
use coursebook::document::Document;
use coursebook::engine::{Engine, WAL_FILE};

#[test]
fn test_create_collection_is_idempotent() {
    let engine = Engine::in_memory();
    let a = engine.create_collection("courses").unwrap();
    a.insert_document(Document::new(doc! { "name": "x" })).unwrap();
    let b = engine.create_collection("courses").unwrap();
    assert_eq!(b.len(), 1);
    assert_eq!(engine.list_collection_names(), ["courses"]);
}

#[test]
fn test_get_and_drop_collection() {
    let engine = Engine::in_memory();
    engine.create_collection("users").unwrap();
    assert!(engine.get_collection("users").is_some());
    assert!(engine.get_collection("non_existent").is_none());
    assert!(engine.drop_collection("users").unwrap());
    assert!(!engine.drop_collection("users").unwrap());
    assert!(engine.list_collection_names().is_empty());
}

#[test]
fn test_duplicate_id_is_rejected() {
    let engine = Engine::in_memory();
    let col = engine.create_collection("c").unwrap();
    let d = Document::new(doc! { "n": 1 });
    col.insert_document(d.clone()).unwrap();
    assert!(col.insert_document(d).is_err());
    assert_eq!(col.len(), 1);
}

#[test]
fn test_update_keeps_created_at_and_id() {
    let engine = Engine::in_memory();
    let col = engine.create_collection("c").unwrap();
    let d = Document::new(doc! { "n": 1 });
    let id = col.insert_document(d.clone()).unwrap();
    assert!(col.update_document(&id, Document::new(doc! { "n": 2 })).unwrap());
    let stored = col.find_document(&id).unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.body().get_str("_id").unwrap(), id.to_string());
    assert_eq!(stored.body().get_i32("n").unwrap(), 2);
    assert_eq!(stored.metadata.created_at, d.metadata.created_at);
}

#[test]
fn test_reopen_replays_log() {
    let dir = tempfile::tempdir().unwrap();
    let (kept, removed) = {
        let engine = Engine::open(dir.path()).unwrap();
        let col = engine.create_collection("courses").unwrap();
        let kept = col.insert_document(Document::new(doc! { "name": "kept" })).unwrap();
        let removed = col.insert_document(Document::new(doc! { "name": "removed" })).unwrap();
        col.update_document(&kept, Document::new(doc! { "name": "kept v2" })).unwrap();
        col.delete_document(&removed).unwrap();
        engine.create_collection("gone").unwrap();
        engine.drop_collection("gone").unwrap();
        (kept, removed)
    };
    let engine = Engine::open(dir.path()).unwrap();
    assert_eq!(engine.list_collection_names(), ["courses"]);
    let col = engine.get_collection("courses").unwrap();
    assert_eq!(col.len(), 1);
    assert_eq!(col.find_document(&kept).unwrap().body().get_str("name").unwrap(), "kept v2");
    assert!(col.find_document(&removed).is_none());
}

#[test]
fn test_compact_shrinks_log_and_keeps_state() {
    let dir = tempfile::tempdir().unwrap();
    let wal = dir.path().join(WAL_FILE);
    {
        let engine = Engine::open(dir.path()).unwrap();
        let col = engine.create_collection("courses").unwrap();
        for i in 0..20 {
            let id = col.insert_document(Document::new(doc! { "n": i })).unwrap();
            if i % 2 == 0 {
                col.delete_document(&id).unwrap();
            }
        }
        engine.flush().unwrap();
        let before = std::fs::metadata(&wal).unwrap().len();
        assert_eq!(engine.compact().unwrap(), 11);
        let after = std::fs::metadata(&wal).unwrap().len();
        assert!(after < before);
        col.insert_document(Document::new(doc! { "n": 100 })).unwrap();
    }
    let engine = Engine::open(dir.path()).unwrap();
    assert_eq!(engine.get_collection("courses").unwrap().len(), 11);
}

#[test]
fn test_in_memory_has_no_path() {
    let engine = Engine::in_memory();
    assert!(engine.path().is_none());
    assert_eq!(engine.compact().unwrap(), 0);
}

#[test]
fn test_dropped_collection_handle_rejects_writes() {
    let engine = Engine::in_memory();
    let col = engine.create_collection("courses").unwrap();
    let id = col.insert_document(Document::new(doc! { "n": 1 })).unwrap();
    engine.drop_collection("courses").unwrap();
    assert!(col.is_dropped());
    assert!(col.is_empty());
    assert!(matches!(
        col.insert_document(Document::new(doc! { "n": 2 })),
        Err(coursebook::errors::DbError::NoSuchCollection(name)) if name == "courses"
    ));
    assert!(col.update_document(&id, Document::new(doc! { "n": 3 })).is_err());
    assert!(col.delete_document(&id).is_err());

    let fresh = engine.create_collection("courses").unwrap();
    assert!(!fresh.is_dropped());
    fresh.insert_document(Document::new(doc! { "n": 4 })).unwrap();
    assert_eq!(fresh.len(), 1);
}

#[test]
fn test_document_new_ignores_incoming_id_but_from_body_keeps_it() {
    let given = uuid::Uuid::new_v4().to_string();
    let d = Document::new(doc! { "_id": given.as_str() });
    assert_ne!(d.id.to_string(), given);
    let d = Document::from_body(doc! { "_id": given.as_str(), "n": 1 }).unwrap();
    assert_eq!(d.id.to_string(), given);
    assert!(Document::from_body(doc! { "_id": "nope" }).is_err());
}
