use bson::{Bson, doc};
use coursebook::document::Document;
use coursebook::engine::Engine;
use coursebook::query::{
    CmpOp, Filter, FindOptions, Order, Projection, Query, SortSpec, UpdateDoc, apply_update,
    count_docs, delete_many, eval_filter, find_docs, parse_filter, parse_filter_json,
    parse_projection, parse_sort_str, parse_update,
};

fn seeded() -> (Engine, std::sync::Arc<coursebook::collection::Collection>) {
    let engine = Engine::in_memory();
    let col = engine.create_collection("courses").unwrap();
    for (name, author, price, published, tags) in [
        ("Node.js course", "Mosh", 20, true, vec!["node", "backend"]),
        ("Angular course", "MaGaby", 15, true, vec!["angular", "frontend"]),
        ("React course", "Mosh", 10, false, vec!["react", "frontend"]),
        ("Express course", "Ana", 25, true, vec!["node"]),
    ] {
        col.insert_document(Document::new(doc! {
            "name": name, "author": author, "price": price, "isPublished": published, "tags": tags,
        }))
        .unwrap();
    }
    (engine, col)
}

fn names(docs: &[Document]) -> Vec<String> {
    docs.iter().map(|d| d.body().get_str("name").unwrap().to_string()).collect()
}

#[test]
fn equality_conjunction_and_array_contains() {
    let (_e, col) = seeded();
    let f = parse_filter(&doc! { "author": "Mosh", "isPublished": true }).unwrap();
    assert_eq!(count_docs(&col, &f), 1);
    let f = parse_filter(&doc! { "tags": "frontend" }).unwrap();
    assert_eq!(count_docs(&col, &f), 2);
}

#[test]
fn comparison_and_set_operators() {
    let (_e, col) = seeded();
    let f = parse_filter_json(r#"{"price": {"$gt": 10, "$lte": 20}}"#).unwrap();
    assert_eq!(count_docs(&col, &f), 2);
    let f = parse_filter_json(r#"{"price": {"$in": [10, 15, 20]}}"#).unwrap();
    assert_eq!(count_docs(&col, &f), 3);
    let f = parse_filter_json(r#"{"price": {"$nin": [10, 15]}}"#).unwrap();
    assert_eq!(count_docs(&col, &f), 2);
    let f = parse_filter_json(r#"{"discount": {"$exists": false}}"#).unwrap();
    assert_eq!(count_docs(&col, &f), 4);
}

#[test]
fn numeric_comparison_ignores_integer_width() {
    let d = doc! { "price": Bson::Int64(15) };
    assert!(eval_filter(&d, &Filter::cmp("price", CmpOp::Eq, 15.0)));
    assert!(eval_filter(&d, &Filter::cmp("price", CmpOp::Lt, 15.5)));
}

#[test]
fn range_operators_do_not_match_other_types() {
    let d = doc! { "price": "15" };
    assert!(!eval_filter(&d, &Filter::cmp("price", CmpOp::Gt, 1)));
}

#[test]
fn logical_or_and_nor() {
    let (_e, col) = seeded();
    let f = parse_filter_json(r#"{"$or": [{"author": "MaGaby"}, {"isPublished": false}]}"#).unwrap();
    let docs = find_docs(&col, &f, &FindOptions::default()).to_vec();
    assert_eq!(names(&docs), ["Angular course", "React course"]);
    let f = parse_filter_json(r#"{"$nor": [{"author": "Mosh"}]}"#).unwrap();
    assert_eq!(count_docs(&col, &f), 2);
    let f = parse_filter_json(r#"{"price": {"$not": {"$gte": 20}}}"#).unwrap();
    assert_eq!(count_docs(&col, &f), 2);
}

#[test]
fn unknown_operator_is_an_error() {
    assert!(parse_filter_json(r#"{"price": {"$near": 3}}"#).is_err());
    assert!(parse_filter_json(r#"{"$where": "1"}"#).is_err());
    assert!(parse_filter_json(r#"{"$or": []}"#).is_err());
}

#[test]
fn sort_happens_before_skip_and_limit() {
    let (_e, col) = seeded();
    let opts = FindOptions {
        sort: Some(vec![SortSpec::asc("name")]),
        skip: Some(1),
        limit: Some(2),
        ..FindOptions::default()
    };
    let docs = find_docs(&col, &Filter::True, &opts).to_vec();
    assert_eq!(names(&docs), ["Express course", "Node.js course"]);
}

#[test]
fn multi_key_sort() {
    let (_e, col) = seeded();
    let opts = FindOptions { sort: Some(parse_sort_str("author -price")), ..FindOptions::default() };
    let docs = find_docs(&col, &Filter::True, &opts).to_vec();
    assert_eq!(names(&docs), ["Express course", "Angular course", "Node.js course", "React course"]);
    assert_eq!(parse_sort_str("-price")[0].order, Order::Desc);
}

#[test]
fn missing_sort_keys_come_first_ascending() {
    let engine = Engine::in_memory();
    let col = engine.create_collection("c").unwrap();
    col.insert_document(Document::new(doc! { "name": "b" })).unwrap();
    col.insert_document(Document::new(doc! { "other": 1 })).unwrap();
    let opts = FindOptions { sort: Some(vec![SortSpec::asc("name")]), ..FindOptions::default() };
    let docs = find_docs(&col, &Filter::True, &opts).to_vec();
    assert!(docs[0].body().get("name").is_none());
}

#[test]
fn projection_includes_id_unless_excluded() {
    let (_e, col) = seeded();
    let opts = FindOptions {
        projection: Some(parse_projection(&doc! { "name": 1, "tags": 1 }).unwrap()),
        limit: Some(1),
        ..FindOptions::default()
    };
    let docs = find_docs(&col, &Filter::True, &opts).to_vec();
    let keys: Vec<_> = docs[0].body().keys().cloned().collect();
    assert_eq!(keys, ["_id", "name", "tags"]);

    let opts = FindOptions {
        projection: Some(Projection::Include { fields: vec!["name".into()], exclude_id: true }),
        ..FindOptions::default()
    };
    let docs = find_docs(&col, &Filter::True, &opts).to_vec();
    assert!(docs.iter().all(|d| d.body().len() == 1));
}

#[test]
fn exclusion_projection_and_mixing_error() {
    let (_e, col) = seeded();
    let opts = FindOptions {
        projection: Some(parse_projection(&doc! { "tags": 0, "author": 0 }).unwrap()),
        ..FindOptions::default()
    };
    let docs = find_docs(&col, &Filter::True, &opts).to_vec();
    assert!(docs.iter().all(|d| !d.body().contains_key("tags") && d.body().contains_key("_id")));
    assert!(parse_projection(&doc! { "name": 1, "tags": 0 }).is_err());
    assert!(parse_projection(&doc! { "name": 1, "_id": 0 }).is_ok());
}

#[test]
fn query_builder_chains_like_the_tutorial() {
    let (_e, col) = seeded();
    let docs = Query::new(Some(col.clone()), Filter::True)
        .or(vec![doc! { "author": "MaGaby" }, doc! { "isPublished": true }])
        .limit(10)
        .sort(doc! { "name": 1 })
        .select(doc! { "name": 1, "tags": 1 })
        .exec()
        .unwrap();
    assert_eq!(names(&docs), ["Angular course", "Express course", "Node.js course"]);
    assert!(docs.iter().all(|d| !d.body().contains_key("price")));
}

#[test]
fn paginate_computes_skip_from_page_number() {
    let (_e, col) = seeded();
    let q = Query::new(Some(col), Filter::True).sort_str("name").paginate(2, 3);
    assert_eq!(q.options().skip, Some(3));
    assert_eq!(q.options().limit, Some(3));
    assert_eq!(names(&q.exec().unwrap()), ["React course"]);
    let q0 = q.clone().paginate(0, 3);
    assert_eq!(q0.options().skip, Some(0));
}

#[test]
fn chaining_errors_surface_on_exec() {
    let (_e, col) = seeded();
    let q = Query::new(Some(col), Filter::True).select_str("name -tags");
    assert!(q.exec().is_err());
    let disconnected = Query::new(None, Filter::True);
    assert!(matches!(disconnected.count(), Err(coursebook::errors::DbError::NotConnected)));
}

#[test]
fn update_operators() {
    let mut d = Document::new(doc! { "price": 10, "tags": ["a"], "meta": { "visits": 1 } });
    let upd = UpdateDoc::default()
        .set("author", "Mosh")
        .inc("meta.visits", 2.0)
        .unset("price")
        .push("tags", "b");
    assert!(apply_update(&mut d, &upd).unwrap());
    let body = d.body();
    assert_eq!(body.get_str("author").unwrap(), "Mosh");
    assert_eq!(body.get_document("meta").unwrap().get_f64("visits").unwrap(), 3.0);
    assert!(!body.contains_key("price"));
    assert_eq!(body.get_array("tags").unwrap().len(), 2);
}

#[test]
fn setting_the_same_value_is_not_a_modification() {
    let mut d = Document::new(doc! { "author": "Mosh" });
    let upd = UpdateDoc::default().set("author", "Mosh");
    assert!(!apply_update(&mut d, &upd).unwrap());
}

#[test]
fn id_is_immutable() {
    assert!(parse_update(&doc! { "$set": { "_id": "x" } }).is_err());
    let mut d = Document::new(doc! {});
    let upd = UpdateDoc::default().set("_id", "x");
    assert!(apply_update(&mut d, &upd).is_err());
}

#[test]
fn delete_many_reports_count() {
    let (_e, col) = seeded();
    let f = parse_filter(&doc! { "author": "Mosh" }).unwrap();
    let report = delete_many(&col, &f).unwrap();
    assert_eq!(report.deleted, 2);
    assert_eq!(col.len(), 2);
    assert_eq!(delete_many(&col, &f).unwrap().deleted, 0);
}

#[test]
fn where_eq_ands_into_the_filter() {
    let (_e, col) = seeded();
    let docs = Query::new(Some(col), Filter::True)
        .where_eq("author", "Mosh")
        .where_eq("isPublished", false)
        .exec()
        .unwrap();
    assert_eq!(names(&docs), ["React course"]);
}

#[test]
fn exec_as_deserializes_each_result() {
    #[derive(serde::Deserialize)]
    struct Row {
        name: String,
        price: i32,
    }
    let (_e, col) = seeded();
    let rows: Vec<Row> = Query::new(Some(col), Filter::True)
        .sort_str("-price")
        .select_str("name price")
        .limit(2)
        .exec_as()
        .unwrap();
    let got: Vec<_> = rows.iter().map(|r| (r.name.as_str(), r.price)).collect();
    assert_eq!(got, [("Express course", 25), ("Node.js course", 20)]);
}

#[test]
fn id_only_projection_returns_just_the_id() {
    let (_e, col) = seeded();
    let opts = FindOptions {
        projection: Some(parse_projection(&doc! { "_id": 1 }).unwrap()),
        ..FindOptions::default()
    };
    let docs = find_docs(&col, &Filter::True, &opts).to_vec();
    assert_eq!(docs.len(), 4);
    for d in &docs {
        let keys: Vec<_> = d.body().keys().map(String::as_str).collect();
        assert_eq!(keys, ["_id"]);
    }
}

#[test]
fn zero_page_size_still_returns_a_page() {
    let (_e, col) = seeded();
    let q = Query::new(Some(col), Filter::True).sort_str("name").paginate(1, 0);
    assert_eq!(q.options().limit, Some(1));
    assert_eq!(names(&q.exec().unwrap()), ["Angular course"]);
}
