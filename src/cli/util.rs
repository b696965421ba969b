use crate::course::{CATEGORIES, Course};
use crate::errors::DbError;
use crate::query::json_to_document;
use bson::Document as BsonDocument;
use fake::Fake;
use fake::faker::lorem::en::{Word, Words};
use fake::faker::name::en::Name;

mod built {
    include!(concat!(env!("OUT_DIR"), "/compiled_features.rs"));
}

/// Cargo features this crate was compiled with.
#[must_use]
pub fn compiled_features() -> Vec<String> {
    built::COMPILED_FEATURES.iter().map(ToString::to_string).collect()
}

/// Parse an optional JSON object argument; blank input is an empty document.
///
/// # Errors
/// Returns an error if the text is not a JSON object.
pub fn json_arg(s: &str) -> Result<BsonDocument, DbError> {
    if s.trim().is_empty() {
        return Ok(BsonDocument::new());
    }
    json_to_document(s)
}

/// A random course that passes the course schema.
#[must_use]
pub fn fake_course() -> Course {
    let topic: String = Word().fake();
    let category = CATEGORIES[(0..CATEGORIES.len()).fake::<usize>()];
    let tags: Vec<String> = Words(1..4).fake();
    let course = Course::new(format!("{topic} course"), category)
        .author(Name().fake::<String>())
        .tags(tags);
    if (0..2).fake::<u8>() == 1 {
        course.published(Some(f64::from((10..=200).fake::<u32>())))
    } else {
        course
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_json_is_empty_document() {
        assert!(json_arg("  ").unwrap().is_empty());
        assert!(json_arg("[1]").is_err());
    }

    #[test]
    fn fake_courses_have_tags_and_known_category() {
        for _ in 0..20 {
            let c = fake_course();
            assert!(!c.tags.is_empty());
            assert!(CATEGORIES.contains(&c.category.as_str()));
            assert!(c.name.len() >= 5);
            if c.is_published {
                assert!(c.price.is_some_and(|p| (10.0..=200.0).contains(&p)));
            }
        }
    }
}
