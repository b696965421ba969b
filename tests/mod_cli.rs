use coursebook::cli::{Command, OutputMode, Session, run_with_format};
use coursebook::course::{Course, TagValidation};
use coursebook::playground::CourseQuery;
use coursebook::{ConnectOptions, Database};

fn session() -> Session {
    let db = Database::connect("coursebook://localhost/cli?storage=memory", &ConnectOptions::default());
    Session::new(db, TagValidation::Sync)
}

async fn run(s: &Session, cmd: Command, mode: OutputMode) -> String {
    let mut out = Vec::new();
    run_with_format(s, cmd, mode, &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

fn lines_json(out: &str) -> Vec<serde_json::Value> {
    out.lines().map(|l| serde_json::from_str(l).unwrap()).collect()
}

async fn create(s: &Session, name: &str, author: &str) -> String {
    let course = Course::new(name, "web").author(author).tags(["t"]).published(Some(20.0));
    let out = run(s, Command::Create { course }, OutputMode::Json).await;
    lines_json(&out)[0]["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn create_then_list_and_count() {
    let s = session();
    create(&s, "Node.js Course", "Mosh").await;
    create(&s, "Angular Course", "MaGaby").await;

    let out = run(&s, Command::List { query: CourseQuery::default() }, OutputMode::Json).await;
    let docs = lines_json(&out);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["name"], "Angular Course");
    assert!(docs[0].get("author").is_none());

    let out = run(&s, Command::Count { filter_json: r#"{"author": "Mosh"}"#.into() }, OutputMode::Json).await;
    assert_eq!(lines_json(&out)[0]["count"], 1);
    let out = run(&s, Command::Count { filter_json: String::new() }, OutputMode::Plain).await;
    assert_eq!(out.trim(), "2");
}

#[tokio::test]
async fn invalid_create_prints_nothing() {
    let s = session();
    let course = Course::new("Bad", "desktop");
    let out = run(&s, Command::Create { course }, OutputMode::Json).await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn find_with_sort_select_and_limit() {
    let s = session();
    for (n, a) in [("Course B", "x"), ("Course A", "y"), ("Course C", "z")] {
        create(&s, n, a).await;
    }
    let cmd = Command::Find {
        filter_json: String::new(),
        sort: Some("-name".into()),
        select: Some("name -_id".into()),
        limit: Some(2),
        skip: None,
    };
    let out = run(&s, cmd, OutputMode::Json).await;
    assert_eq!(lines_json(&out), [serde_json::json!({"name": "Course C"}), serde_json::json!({"name": "Course B"})]);

    let bad = Command::Find { filter_json: "{\"$bogus\": 1}".into(), sort: None, select: None, limit: None, skip: None };
    let mut sink = Vec::new();
    assert!(run_with_format(&s, bad, OutputMode::Json, &mut sink).await.is_err());
}

#[tokio::test]
async fn update_and_remove_by_id() {
    let s = session();
    let id = create(&s, "Node.js Course", "Mosh").await;
    let out = run(
        &s,
        Command::Update { id: id.clone(), set_json: r#"{"author": "Jason"}"#.into(), direct: false },
        OutputMode::Json,
    )
    .await;
    assert_eq!(lines_json(&out)[0]["author"], "Jason");

    let out = run(
        &s,
        Command::Update { id: id.clone(), set_json: r#"{"author": "Jack"}"#.into(), direct: true },
        OutputMode::Plain,
    )
    .await;
    assert_eq!(out.trim(), format!("{id}\tNode.js Course"));

    let out = run(&s, Command::Remove { id: id.clone() }, OutputMode::Json).await;
    assert_eq!(lines_json(&out)[0]["author"], "Jack");
    let out = run(&s, Command::Remove { id }, OutputMode::Json).await;
    assert_eq!(out.trim(), "null");
}

#[tokio::test]
async fn seed_inserts_generated_courses() {
    let s = session();
    let out = run(&s, Command::Seed { count: 5 }, OutputMode::Json).await;
    assert_eq!(lines_json(&out)[0]["seeded"], 5);
    assert_eq!(s.model.count_documents(bson::doc! {}).unwrap(), 5);
}

#[tokio::test]
async fn info_and_compact_report_store_state() {
    let s = session();
    create(&s, "Node.js Course", "Mosh").await;
    let out = run(&s, Command::Info, OutputMode::Json).await;
    let info = &lines_json(&out)[0];
    assert_eq!(info["collections"][0]["name"], "courses");
    assert_eq!(info["collections"][0]["documents"], 1);
    assert!(info["path"].is_null());

    let out = run(&s, Command::Compact, OutputMode::Json).await;
    assert_eq!(lines_json(&out)[0]["records"], 2);
}
