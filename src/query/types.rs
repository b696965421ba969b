use bson::Bson;
use serde::{Deserialize, Serialize};

// Safety limits to prevent resource abuse
pub(crate) const MAX_PATH_DEPTH: usize = 32;
pub(crate) const MAX_IN_SET: usize = 1000;
pub(crate) const MAX_SORT_FIELDS: usize = 8;
pub(crate) const MAX_PROJECTION_FIELDS: usize = 64;
pub(crate) const MAX_UPDATE_FIELDS: usize = 128;
pub const MAX_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub order: Order,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Asc }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), order: Order::Desc }
    }
}

/// Which fields a find returns.
///
/// `Include` keeps `_id` unless `exclude_id` is set; `Exclude` drops the listed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Include { fields: Vec<String>, exclude_id: bool },
    Exclude(Vec<String>),
}

impl Projection {
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Include { fields: fields.into_iter().map(Into::into).collect(), exclude_id: false }
    }
}

/// Options for `find_docs`.
///
/// Sorting is applied first, then `skip`/`limit` (capped at `MAX_LIMIT`), then projection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindOptions {
    pub projection: Option<Projection>,
    pub sort: Option<Vec<SortSpec>>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    #[must_use]
    pub const fn operator(self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    True,
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Not(Box<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    #[cfg(feature = "regex")]
    Regex { path: String, pattern: String, case_insensitive: bool },
}

impl Filter {
    pub fn eq(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.into(), op: CmpOp::Eq, value: value.into() }
    }

    pub fn cmp(path: impl Into<String>, op: CmpOp, value: impl Into<Bson>) -> Self {
        Self::Cmp { path: path.into(), op, value: value.into() }
    }

    /// Conjoin `other` with `self`, flattening nested conjunctions.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, f) | (f, Self::True) => f,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), f) => {
                a.push(f);
                Self::And(a)
            }
            (f, g) => Self::And(vec![f, g]),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::True => "true",
            Self::And(_) => "$and",
            Self::Or(_) => "$or",
            Self::Nor(_) => "$nor",
            Self::Not(_) => "$not",
            Self::Exists { .. } => "$exists",
            Self::In { .. } => "$in",
            Self::Nin { .. } => "$nin",
            Self::Cmp { op, .. } => op.operator(),
            #[cfg(feature = "regex")]
            Self::Regex { .. } => "$regex",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UpdateDoc {
    pub set: Vec<(String, Bson)>,
    pub inc: Vec<(String, f64)>,
    pub unset: Vec<String>,
    pub push: Vec<(String, Bson)>,
}

impl UpdateDoc {
    #[must_use]
    pub fn set(mut self, path: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.set.push((path.into(), value.into()));
        self
    }

    #[must_use]
    pub fn inc(mut self, path: impl Into<String>, by: f64) -> Self {
        self.inc.push((path.into(), by));
        self
    }

    #[must_use]
    pub fn unset(mut self, path: impl Into<String>) -> Self {
        self.unset.push(path.into());
        self
    }

    #[must_use]
    pub fn push(mut self, path: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.push.push((path.into(), value.into()));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.inc.is_empty() && self.unset.is_empty() && self.push.is_empty()
    }

    pub(crate) fn paths(&self) -> impl Iterator<Item = &str> {
        self.set
            .iter()
            .map(|(p, _)| p.as_str())
            .chain(self.inc.iter().map(|(p, _)| p.as_str()))
            .chain(self.unset.iter().map(String::as_str))
            .chain(self.push.iter().map(|(p, _)| p.as_str()))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub matched: u64,
    pub modified: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    pub deleted: u64,
}
