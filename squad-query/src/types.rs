//! Result ordering.
//!
//! ```rust
//! use squad_query::types::{OrderBy, OrderByField};
//!
//! let order = OrderBy::from_fields([
//!     OrderByField::desc("member.age"),
//!     OrderByField::asc("member.username").nulls_last(),
//! ]);
//! assert_eq!(order.to_sql(), "member.age DESC, member.username ASC NULLS LAST");
//! ```

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filter::Value;
use crate::sql::quote_path;

/// Direction of one ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Smallest first.
    #[default]
    Asc,
    /// Largest first.
    Desc,
}

impl SortOrder {
    /// `ASC` or `DESC`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    fn apply(self, ord: Ordering) -> Ordering {
        match self {
            Self::Asc => ord,
            Self::Desc => ord.reverse(),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Where nulls go regardless of direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullsOrder {
    /// Before every non-null value.
    First,
    /// After every non-null value.
    Last,
}

impl NullsOrder {
    /// `NULLS FIRST` or `NULLS LAST`.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::First => "NULLS FIRST",
            Self::Last => "NULLS LAST",
        }
    }
}

/// One ordering key: a qualified column, a direction and optional null
/// placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// `alias.column` being ordered on.
    pub column: String,
    /// Direction.
    pub order: SortOrder,
    /// Null placement. When unset nulls sort as the smallest value.
    pub nulls: Option<NullsOrder>,
}

impl OrderByField {
    /// Order on `column` in direction `order`.
    pub fn new(column: impl Into<String>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
            nulls: None,
        }
    }

    /// Ascending on `column`.
    pub fn asc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Descending on `column`.
    pub fn desc(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Place nulls explicitly.
    pub fn nulls(self, nulls: NullsOrder) -> Self {
        Self {
            nulls: Some(nulls),
            ..self
        }
    }

    /// Nulls after every value.
    pub fn nulls_last(self) -> Self {
        self.nulls(NullsOrder::Last)
    }

    /// Nulls before every value.
    pub fn nulls_first(self) -> Self {
        self.nulls(NullsOrder::First)
    }

    /// `column DIR [NULLS ...]`.
    pub fn to_sql(&self) -> String {
        self.to_string()
    }

    /// Order two values of this key.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        match (self.nulls, a.is_null(), b.is_null()) {
            (Some(_), true, true) => Ordering::Equal,
            (Some(NullsOrder::First), true, false) | (Some(NullsOrder::Last), false, true) => {
                Ordering::Less
            }
            (Some(NullsOrder::First), false, true) | (Some(NullsOrder::Last), true, false) => {
                Ordering::Greater
            }
            _ => self.order.apply(a.sort_cmp(b)),
        }
    }
}

impl fmt::Display for OrderByField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_path(&self.column), self.order)?;
        match self.nulls {
            Some(nulls) => write!(f, " {}", nulls.as_sql()),
            None => Ok(()),
        }
    }
}

/// Ordering keys in priority order. Empty means unordered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBy {
    fields: Vec<OrderByField>,
}

impl OrderBy {
    /// No ordering.
    pub fn none() -> Self {
        Self::default()
    }

    /// Keys taken in order.
    pub fn from_fields(fields: impl IntoIterator<Item = OrderByField>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
        }
    }

    /// Add a lower-priority key.
    pub fn then(mut self, field: OrderByField) -> Self {
        self.fields.push(field);
        self
    }

    /// The keys, highest priority first.
    pub fn fields(&self) -> &[OrderByField] {
        &self.fields
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether there are no keys.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The key list as written after `ORDER BY`.
    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys = self.fields.iter();
        if let Some(first) = keys.next() {
            write!(f, "{first}")?;
        }
        keys.try_for_each(|key| write!(f, ", {key}"))
    }
}

impl Extend<OrderByField> for OrderBy {
    fn extend<I: IntoIterator<Item = OrderByField>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}

impl IntoIterator for OrderBy {
    type Item = OrderByField;
    type IntoIter = std::vec::IntoIter<OrderByField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl From<OrderByField> for OrderBy {
    fn from(field: OrderByField) -> Self {
        Self {
            fields: vec![field],
        }
    }
}

impl From<Vec<OrderByField>> for OrderBy {
    fn from(fields: Vec<OrderByField>) -> Self {
        Self { fields }
    }
}

impl<const N: usize> From<[OrderByField; N]> for OrderBy {
    fn from(fields: [OrderByField; N]) -> Self {
        Self::from_fields(fields)
    }
}
