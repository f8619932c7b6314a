//! Result records and projection into typed values.
//!
//! Every select produces [`Record`]s: ordered label → value maps. Entities,
//! DTOs and ad-hoc tuples are all read out of records, either field by
//! field with [`Record::get`] or wholesale through [`FromRecord`].
//!
//! ```rust
//! use squad_query::{Record, Value};
//!
//! let mut record = Record::new();
//! record.insert("member1.username", "member1");
//! record.insert("member1.age", 10);
//!
//! // Exact label, or a unique `.suffix` match.
//! assert_eq!(record.get::<i32>("member1.age").unwrap(), 10);
//! assert_eq!(record.get::<String>("username").unwrap(), "member1");
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{QueryError, QueryResult};
use crate::expr::Expr;
use crate::filter::Value;
use crate::traits::Row;

/// One result row: projection labels mapped to values, in projection order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    values: IndexMap<String, Value>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a labelled value.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(label.into(), value.into());
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the record holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Labels in projection order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterate over `(label, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether a label can be resolved (exactly or by unique suffix).
    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_ok()
    }

    /// Resolve a label: exact match first, then a unique `.key` suffix.
    pub fn find(&self, key: &str) -> QueryResult<&Value> {
        if let Some(value) = self.values.get(key) {
            return Ok(value);
        }

        let suffix = format!(".{}", key);
        let mut matches = self
            .values
            .iter()
            .filter(|(label, _)| label.ends_with(&suffix));

        match (matches.next(), matches.next()) {
            (Some((_, value)), None) => Ok(value),
            (Some((first, _)), Some((second, _))) => Err(QueryError::invalid_select(format!(
                "label '{}' is ambiguous between '{}' and '{}'",
                key, first, second
            ))
            .with_field(key)),
            (None, _) => Err(QueryError::unknown_column(key)),
        }
    }

    /// Read a typed value by label.
    pub fn get<T: FromValue>(&self, key: &str) -> QueryResult<T> {
        let value = self.find(key)?;
        T::from_value(value).ok_or_else(|| QueryError::type_mismatch(key, T::EXPECTED, value))
    }

    /// Read the value projected for an expression (by its label).
    pub fn value_of(&self, expr: &Expr) -> QueryResult<&Value> {
        self.find(&expr.label())
    }

    /// Read a typed value projected for an expression.
    pub fn get_expr<T: FromValue>(&self, expr: &Expr) -> QueryResult<T> {
        self.get(&expr.label())
    }

    /// The sub-record stored under `prefix.` (a fetch-joined relation).
    ///
    /// Returns `None` when no such labels exist or when every one of them is
    /// null, which is how an unmatched left join shows up.
    pub fn nested(&self, prefix: &str) -> Option<Record> {
        let head = format!("{}.", prefix);
        let mut nested = Record::new();
        for (label, value) in &self.values {
            if let Some(rest) = label.strip_prefix(&head) {
                nested.insert(rest, value.clone());
            }
        }
        if nested.values.values().all(Value::is_null) {
            None
        } else {
            Some(nested)
        }
    }

    /// Convert into a typed value.
    pub fn into_typed<T: FromRecord>(self) -> QueryResult<T> {
        T::from_record(&self)
    }

    /// JSON view of the record, mainly for logging and debugging.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Row for Record {
    fn value(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (label, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", label, value)?;
        }
        write!(f, "]")
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

/// Conversion from a single record value.
pub trait FromValue: Sized {
    /// Human-readable expected type, for error messages.
    const EXPECTED: &'static str;

    /// Convert, returning `None` on a type mismatch.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    const EXPECTED: &'static str = "any value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "an integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    const EXPECTED: &'static str = "a 32-bit integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromValue for u64 {
    const EXPECTED: &'static str = "a non-negative integer";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    const EXPECTED: &'static str = "a number";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "a boolean";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "a string";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Conversion from a whole record.
///
/// Implemented by entities (reading the root projection and fetch-joined
/// relations) and by DTOs (reading projection labels or aliases).
pub trait FromRecord: Sized {
    /// Build the value from a record.
    fn from_record(record: &Record) -> QueryResult<Self>;
}

impl FromRecord for Record {
    fn from_record(record: &Record) -> QueryResult<Self> {
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::AggregateFn;

    fn sample() -> Record {
        let mut record = Record::new();
        record.insert("member1.username", "member1");
        record.insert("member1.age", 10);
        record.insert("team.name", Value::Null);
        record
    }

    #[test]
    fn test_get_exact_and_suffix() {
        let record = sample();
        assert_eq!(record.get::<String>("member1.username").unwrap(), "member1");
        assert_eq!(record.get::<i32>("age").unwrap(), 10);
        assert_eq!(record.get::<Option<String>>("name").unwrap(), None);
    }

    #[test]
    fn test_get_missing_and_mismatch() {
        let record = sample();
        assert!(record.get::<i32>("height").unwrap_err().is_schema_error());
        let err = record.get::<i32>("username").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidDataType);
    }

    #[test]
    fn test_ambiguous_suffix() {
        let mut record = sample();
        record.insert("team.age", 3);
        let err = record.get::<i32>("age").unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidSelect);
    }

    #[test]
    fn test_value_of_expr() {
        let mut record = Record::new();
        let avg = Expr::aggregate(AggregateFn::Avg, "member1.age");
        record.insert(avg.label(), 25.0);
        assert_eq!(record.get_expr::<f64>(&avg).unwrap(), 25.0);
    }

    #[test]
    fn test_nested() {
        let mut record = Record::new();
        record.insert("id", 1);
        record.insert("team.id", 7);
        record.insert("team.name", "teamA");
        let team = record.nested("team").unwrap();
        assert_eq!(team.get::<i64>("id").unwrap(), 7);
        assert!(sample().nested("team").is_none());
        assert!(record.nested("coach").is_none());
    }

    #[test]
    fn test_to_json() {
        assert_eq!(
            sample().to_json(),
            serde_json::json!({
                "member1.username": "member1",
                "member1.age": 10,
                "team.name": null,
            })
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(
            sample().to_string(),
            "[member1.username='member1', member1.age=10, team.name=null]"
        );
    }
}
