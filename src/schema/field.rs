use bson::{Bson, Document as BsonDocument};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Declared type of a schema path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    ObjectId,
    Array(Box<FieldType>),
}

impl FieldType {
    #[must_use]
    pub fn array_of(inner: Self) -> Self {
        Self::Array(Box::new(inner))
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::String => "String".into(),
            Self::Number => "Number".into(),
            Self::Boolean => "Boolean".into(),
            Self::Date => "Date".into(),
            Self::ObjectId => "ObjectId".into(),
            Self::Array(inner) => format!("[{}]", inner.name()),
        }
    }
}

pub type Predicate = Arc<dyn Fn(&BsonDocument) -> bool + Send + Sync>;
pub type Transform = Arc<dyn Fn(Bson) -> Bson + Send + Sync>;
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

#[derive(Clone, Default)]
pub enum Required {
    #[default]
    Never,
    Always,
    /// Required only when the predicate holds for the (cast) document.
    When(Predicate),
}

#[derive(Clone, Debug, PartialEq)]
pub enum DefaultValue {
    Value(Bson),
    /// Current time, taken when the document is validated.
    Now,
}

/// User-defined check. The closure returns `true` when the value is valid.
#[derive(Clone)]
pub enum Validator {
    Sync { check: Arc<dyn Fn(&Bson) -> bool + Send + Sync>, message: String },
    Async { check: Arc<dyn Fn(Bson) -> BoxFuture<bool> + Send + Sync>, message: String },
}

impl Validator {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Sync { message, .. } | Self::Async { message, .. } => message,
        }
    }

    pub async fn check(&self, value: &Bson) -> bool {
        match self {
            Self::Sync { check, .. } => check(value),
            Self::Async { check, .. } => check(value.clone()).await,
        }
    }
}

/// One path of a schema with its casting, normalization and validation rules.
#[derive(Clone)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldType,
    pub required: Required,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub enum_values: Option<Vec<String>>,
    pub lowercase: bool,
    pub uppercase: bool,
    pub trim: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub default: Option<DefaultValue>,
    pub setter: Option<Transform>,
    pub getter: Option<Transform>,
    pub validators: Vec<Validator>,
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &!matches!(self.required, Required::Never))
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl FieldDef {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
            required: Required::Never,
            min_length: None,
            max_length: None,
            enum_values: None,
            lowercase: false,
            uppercase: false,
            trim: false,
            min: None,
            max: None,
            default: None,
            setter: None,
            getter: None,
            validators: Vec::new(),
        }
    }

    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    #[must_use]
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    #[must_use]
    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    #[must_use]
    pub fn array(name: impl Into<String>, inner: FieldType) -> Self {
        Self::new(name, FieldType::array_of(inner))
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = Required::Always;
        self
    }

    #[must_use]
    pub fn required_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&BsonDocument) -> bool + Send + Sync + 'static,
    {
        self.required = Required::When(Arc::new(predicate));
        self
    }

    #[must_use]
    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    #[must_use]
    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    #[must_use]
    pub fn uppercase(mut self) -> Self {
        self.uppercase = true;
        self
    }

    #[must_use]
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    #[must_use]
    pub fn min(mut self, v: f64) -> Self {
        self.min = Some(v);
        self
    }

    #[must_use]
    pub fn max(mut self, v: f64) -> Self {
        self.max = Some(v);
        self
    }

    #[must_use]
    pub fn default_value(mut self, v: impl Into<Bson>) -> Self {
        self.default = Some(DefaultValue::Value(v.into()));
        self
    }

    #[must_use]
    pub fn default_now(mut self) -> Self {
        self.default = Some(DefaultValue::Now);
        self
    }

    /// Transform applied on every write, after casting and normalization.
    #[must_use]
    pub fn set<F>(mut self, f: F) -> Self
    where
        F: Fn(Bson) -> Bson + Send + Sync + 'static,
    {
        self.setter = Some(Arc::new(f));
        self
    }

    /// Transform applied to documents read back through a model.
    #[must_use]
    pub fn get<F>(mut self, f: F) -> Self
    where
        F: Fn(Bson) -> Bson + Send + Sync + 'static,
    {
        self.getter = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn validate<F>(mut self, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Bson) -> bool + Send + Sync + 'static,
    {
        self.validators.push(Validator::Sync { check: Arc::new(check), message: message.into() });
        self
    }

    #[must_use]
    pub fn validate_async<F, Fut>(mut self, check: F, message: impl Into<String>) -> Self
    where
        F: Fn(Bson) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let check: Arc<dyn Fn(Bson) -> BoxFuture<bool> + Send + Sync> =
            Arc::new(move |v| Box::pin(check(v)));
        self.validators.push(Validator::Async { check, message: message.into() });
        self
    }

    /// Whether the path must hold a value for `doc`.
    #[must_use]
    pub fn is_required(&self, doc: &BsonDocument) -> bool {
        match &self.required {
            Required::Never => false,
            Required::Always => true,
            Required::When(p) => p(doc),
        }
    }
}
