//! The `Course` document: its schema and a typed view of stored records.

use crate::schema::{FieldDef, FieldType, Schema};
use bson::{Bson, DateTime};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MODEL_NAME: &str = "Course";
pub const CATEGORIES: [&str; 3] = ["web", "mobile", "network"];
pub const TAGS_MESSAGE: &str = "A course should have at least one tag.";

/// How the `tags` rule runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TagValidation {
    #[default]
    Sync,
    /// Resolve the check after sleeping for `delay`.
    Async { delay: Duration },
}

fn has_tags(v: &Bson) -> bool {
    matches!(v, Bson::Array(items) if !items.is_empty())
}

fn round(v: Bson) -> Bson {
    match v {
        Bson::Double(n) => Bson::Double(n.round()),
        other => other,
    }
}

#[must_use]
pub fn course_schema(tags: TagValidation) -> Schema {
    let tags_field = FieldDef::array("tags", FieldType::String);
    let tags_field = match tags {
        TagValidation::Sync => tags_field.validate(has_tags, TAGS_MESSAGE),
        TagValidation::Async { delay } => tags_field.validate_async(
            move |v| async move {
                tokio::time::sleep(delay).await;
                has_tags(&v)
            },
            TAGS_MESSAGE,
        ),
    };
    Schema::new()
        .field(FieldDef::string("name").required().min_length(5).max_length(255))
        .field(FieldDef::string("category").required().enum_values(CATEGORIES).lowercase().trim())
        .field(FieldDef::string("author"))
        .field(tags_field)
        .field(FieldDef::date("date").default_now())
        .field(FieldDef::boolean("isPublished"))
        .field(
            FieldDef::number("price")
                .required_when(|doc| doc.get_bool("isPublished").unwrap_or(false))
                .min(10.0)
                .max(200.0)
                .set(round)
                .get(round),
        )
}

/// A course as stored. Validation lives in [`course_schema`], not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime>,
    #[serde(rename = "isPublished")]
    pub is_published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl Course {
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self { name: name.into(), category: category.into(), ..Self::default() }
    }

    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    #[must_use]
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn published(mut self, price: Option<f64>) -> Self {
        self.is_published = true;
        self.price = price;
        self
    }

    #[must_use]
    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}
