//! Document schemas: field declarations, casting, defaults and validation.
//!
//! A [`Schema`] is plain data. [`Schema::validate`] turns an input document into
//! the document that will be stored, or a [`ValidationError`](crate::errors::ValidationError)
//! listing the first failure of each path.

mod cast;
mod field;
mod validate;

pub use cast::{CastFailure, cast, display_value};
pub use field::{BoxFuture, DefaultValue, FieldDef, FieldType, Predicate, Required, Transform, Validator};

use bson::{Bson, Document as BsonDocument};

#[derive(Clone, Debug)]
pub struct Schema {
    fields: Vec<FieldDef>,
    strict: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

impl Schema {
    /// An empty strict schema.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new(), strict: true }
    }

    /// Add a path. A later definition with the same name replaces the earlier one.
    #[must_use]
    pub fn field(mut self, def: FieldDef) -> Self {
        if let Some(slot) = self.fields.iter_mut().find(|f| f.name == def.name) {
            *slot = def;
        } else {
            self.fields.push(def);
        }
        self
    }

    /// When strict (the default), paths not declared in the schema are dropped on write.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[must_use]
    pub fn path(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn has_getters(&self) -> bool {
        self.fields.iter().any(|f| f.getter.is_some())
    }

    /// Apply every getter to the paths present in `doc`.
    #[must_use]
    pub fn apply_getters(&self, mut doc: BsonDocument) -> BsonDocument {
        for def in &self.fields {
            let Some(get) = &def.getter else { continue };
            if let Some(v) = doc.get_mut(&def.name) {
                *v = get(std::mem::replace(v, Bson::Null));
            }
        }
        doc
    }
}
