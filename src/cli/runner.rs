use crate::Database;
use crate::course::TagValidation;
use crate::document::Document;
use crate::errors::DbError;
use crate::model::Model;
use crate::playground::{
    course_model, create_course, get_courses, remove_course, update_course, update_course_direct,
};
use std::io::Write;

use super::command::Command;
use super::util::{compiled_features, fake_course, json_arg};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    /// Pretty-printed JSON.
    Human,
    /// `id<TAB>name` per document.
    Plain,
    /// One relaxed extended-JSON document per line.
    Json,
}

/// A connected database plus the compiled course model.
#[derive(Debug, Clone)]
pub struct Session {
    pub db: Database,
    pub model: Model,
}

impl Session {
    #[must_use]
    pub fn new(db: Database, tags: TagValidation) -> Self {
        let model = course_model(&db, tags);
        Self { db, model }
    }
}

fn write_doc<W: Write>(out: &mut W, mode: OutputMode, doc: &Document) -> Result<(), DbError> {
    match mode {
        OutputMode::Json => writeln!(out, "{}", serde_json::to_string(&doc.to_json())?)?,
        OutputMode::Human => writeln!(out, "{}", serde_json::to_string_pretty(&doc.to_json())?)?,
        OutputMode::Plain => {
            writeln!(out, "{}\t{}", doc.id, doc.body().get_str("name").unwrap_or_default())?;
        }
    }
    Ok(())
}

fn write_optional<W: Write>(
    out: &mut W,
    mode: OutputMode,
    doc: Option<&Document>,
) -> Result<(), DbError> {
    match doc {
        Some(d) => write_doc(out, mode, d),
        None => {
            writeln!(out, "{}", if mode == OutputMode::Json { "null" } else { "not found" })?;
            Ok(())
        }
    }
}

/// Execute `cmd`, writing results to `out`.
///
/// # Errors
/// Store, query and I/O errors. Validation failures of `Create` and `Seed` are
/// logged and recovered.
pub async fn run_with_format<W: Write>(
    session: &Session,
    cmd: Command,
    mode: OutputMode,
    out: &mut W,
) -> Result<(), DbError> {
    let model = &session.model;
    match cmd {
        Command::Create { course } => {
            if let Some(doc) = create_course(model, &course).await? {
                write_doc(out, mode, &doc)?;
            }
        }
        Command::List { query } => {
            for doc in get_courses(model, &query)? {
                write_doc(out, mode, &doc)?;
            }
        }
        Command::Find { filter_json, sort, select, limit, skip } => {
            let mut query = model.find(json_arg(&filter_json)?);
            if let Some(s) = sort {
                query = query.sort_str(&s);
            }
            if let Some(s) = select {
                query = query.select_str(&s);
            }
            if let Some(n) = skip {
                query = query.skip(n);
            }
            if let Some(n) = limit {
                query = query.limit(n);
            }
            for doc in query.exec()? {
                write_doc(out, mode, &doc)?;
            }
        }
        Command::Count { filter_json } => {
            let n = model.count_documents(json_arg(&filter_json)?)?;
            match mode {
                OutputMode::Json => writeln!(out, "{}", serde_json::json!({ "count": n }))?,
                OutputMode::Plain | OutputMode::Human => writeln!(out, "{n}")?,
            }
        }
        Command::Update { id, set_json, direct } => {
            let changes = json_arg(&set_json)?;
            let updated = if direct {
                update_course_direct(model, &id, changes).await?
            } else {
                update_course(model, &id, changes).await?
            };
            write_optional(out, mode, updated.as_ref())?;
        }
        Command::Remove { id } => {
            write_optional(out, mode, remove_course(model, &id)?.as_ref())?;
        }
        Command::Seed { count } => {
            let mut inserted = 0usize;
            for _ in 0..count {
                if create_course(model, &fake_course()).await?.is_some() {
                    inserted += 1;
                }
            }
            log::info!("seeded {inserted} of {count} courses");
            match mode {
                OutputMode::Json => writeln!(out, "{}", serde_json::json!({ "seeded": inserted }))?,
                OutputMode::Plain | OutputMode::Human => writeln!(out, "seeded {inserted}")?,
            }
        }
        Command::Compact => {
            let records = session.db.compact()?;
            match mode {
                OutputMode::Json => writeln!(out, "{}", serde_json::json!({ "records": records }))?,
                OutputMode::Plain | OutputMode::Human => writeln!(out, "compacted {records}")?,
            }
        }
        Command::Info => {
            let db = &session.db;
            let mut collections = Vec::new();
            for name in db.list_collection_names()? {
                let documents = db.collection(&name)?.len();
                collections.push(serde_json::json!({ "name": name, "documents": documents }));
            }
            let report = serde_json::json!({
                "uri": db.uri(),
                "path": db.path().map(|p| p.display().to_string()),
                "collections": collections,
                "features": compiled_features(),
            });
            match mode {
                OutputMode::Json => writeln!(out, "{report}")?,
                OutputMode::Human | OutputMode::Plain => {
                    writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
                }
            }
        }
    }
    Ok(())
}
