//! Filter types for building WHERE clauses.
//!
//! A [`Filter`] is an opaque boolean condition over qualified columns
//! (`alias.column`). Filters are built by the typed paths in
//! [`crate::path`], combined with [`Filter::and`] / [`Filter::or`], rendered
//! to SQL through a [`SqlBuilder`], and evaluated against rows by engines
//! that execute statements themselves.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::sql::{DatabaseType, SqlBuilder};
use crate::statement::SelectStatement;
use crate::traits::Row;

/// A scalar value used in comparisons, assignments and result records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// List of values.
    List(Vec<Value>),
}

impl Value {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Name of the variant, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }

    /// Numeric view of the value, if it is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// SQL-style ordering. `None` when either side is null or the types
    /// cannot be compared.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// SQL-style equality. `None` when either side is null.
    pub fn sql_eq(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => None,
            (Self::List(a), Self::List(b)) => Some(a == b),
            _ => self.compare(other).map(Ordering::is_eq),
        }
    }

    /// Ordering used for sorting: nulls sort lowest, mismatched types fall
    /// back to their variant order so sorting stays total.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .compare(other)
                .unwrap_or_else(|| self.rank().cmp(&other.rank())),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) | Self::Float(_) => 2,
            Self::String(_) => 3,
            Self::List(_) => 4,
        }
    }

    /// Numeric addition. Null propagates; integers stay integers.
    pub fn add(&self, other: &Value) -> QueryResult<Value> {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => Ok(Self::Null),
            (Self::Int(a), Self::Int(b)) => a
                .checked_add(*b)
                .map(Self::Int)
                .ok_or_else(|| QueryError::invalid_filter("integer overflow in addition")),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => Ok(Self::Float(x + y)),
                _ => Err(QueryError::type_mismatch("+", "numeric operands", (a, b))),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Self::List(values) => {
                write!(f, "(")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Self::String(v.clone())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// Comparison operator shared by scalar and subquery comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    /// SQL operator token.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
        }
    }

    /// Apply the operator with SQL three-valued logic: `None` (unknown)
    /// when either side is null.
    pub fn eval(&self, left: &Value, right: &Value) -> Option<bool> {
        if left.is_null() || right.is_null() {
            return None;
        }
        Some(match self {
            Self::Eq => left.sql_eq(right).unwrap_or(false),
            Self::Ne => !left.sql_eq(right).unwrap_or(false),
            Self::Lt => left.compare(right).is_some_and(Ordering::is_lt),
            Self::Lte => left.compare(right).is_some_and(Ordering::is_le),
            Self::Gt => left.compare(right).is_some_and(Ordering::is_gt),
            Self::Gte => left.compare(right).is_some_and(Ordering::is_ge),
        })
    }

    /// Whether the comparison holds. Unknown counts as not holding.
    pub fn test(&self, left: &Value, right: &Value) -> bool {
        self.eval(left, right).unwrap_or(false)
    }

    /// Build the scalar filter for this operator.
    pub fn into_filter(self, column: String, value: Value) -> Filter {
        match self {
            Self::Eq => Filter::Equals(column, value),
            Self::Ne => Filter::NotEquals(column, value),
            Self::Lt => Filter::Lt(column, value),
            Self::Lte => Filter::Lte(column, value),
            Self::Gt => Filter::Gt(column, value),
            Self::Gte => Filter::Gte(column, value),
        }
    }
}

/// Scalar filter operations, detached from a column.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarFilter<T> {
    /// Equals the value.
    Equals(T),
    /// Not equals the value.
    Not(Box<T>),
    /// In a list of values.
    In(Vec<T>),
    /// Not in a list of values.
    NotIn(Vec<T>),
    /// Less than.
    Lt(T),
    /// Less than or equal.
    Lte(T),
    /// Greater than.
    Gt(T),
    /// Greater than or equal.
    Gte(T),
    /// Contains (for strings).
    Contains(T),
    /// Starts with (for strings).
    StartsWith(T),
    /// Ends with (for strings).
    EndsWith(T),
    /// Is null.
    IsNull,
    /// Is not null.
    IsNotNull,
}

impl<T: Into<Value>> ScalarFilter<T> {
    /// Convert to a Filter with the given column name.
    pub fn into_filter(self, column: impl Into<String>) -> Filter {
        let column = column.into();
        match self {
            Self::Equals(v) => Filter::Equals(column, v.into()),
            Self::Not(v) => Filter::NotEquals(column, (*v).into()),
            Self::In(values) => Filter::In(column, values.into_iter().map(Into::into).collect()),
            Self::NotIn(values) => {
                Filter::NotIn(column, values.into_iter().map(Into::into).collect())
            }
            Self::Lt(v) => Filter::Lt(column, v.into()),
            Self::Lte(v) => Filter::Lte(column, v.into()),
            Self::Gt(v) => Filter::Gt(column, v.into()),
            Self::Gte(v) => Filter::Gte(column, v.into()),
            Self::Contains(v) => Filter::Contains(column, v.into()),
            Self::StartsWith(v) => Filter::StartsWith(column, v.into()),
            Self::EndsWith(v) => Filter::EndsWith(column, v.into()),
            Self::IsNull => Filter::IsNull(column),
            Self::IsNotNull => Filter::IsNotNull(column),
        }
    }
}

/// A complete filter that can be rendered to SQL or evaluated against a row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// No filter (matches everything).
    #[default]
    None,

    /// Equals comparison.
    Equals(String, Value),
    /// Not equals comparison.
    NotEquals(String, Value),

    /// Less than comparison.
    Lt(String, Value),
    /// Less than or equal comparison.
    Lte(String, Value),
    /// Greater than comparison.
    Gt(String, Value),
    /// Greater than or equal comparison.
    Gte(String, Value),

    /// In a list of values.
    In(String, Vec<Value>),
    /// Not in a list of values.
    NotIn(String, Vec<Value>),

    /// Contains (LIKE %value%).
    Contains(String, Value),
    /// Starts with (LIKE value%).
    StartsWith(String, Value),
    /// Ends with (LIKE %value).
    EndsWith(String, Value),

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Comparison against an uncorrelated scalar subquery.
    Subquery {
        /// Left-hand column.
        column: String,
        /// Comparison operator.
        op: CompareOp,
        /// Query producing a single value.
        query: Box<SelectStatement>,
    },

    /// Comparison between two columns, as in a theta join.
    Columns {
        /// Left-hand column.
        left: String,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand column.
        right: String,
    },

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    ///
    /// An existing conjunction on the left is extended in place, so a chain
    /// of `and_then` calls produces one flat `And` in call order.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Combine with another filter using OR.
    pub fn or_else(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::Or(mut filters) => {
                filters.push(other);
                Self::Or(filters)
            }
            _ => Self::Or(vec![self, other]),
        }
    }

    /// Generate SQL for this filter with dialect placeholders.
    /// Returns (sql, params) where params are the values to bind.
    pub fn to_sql(&self, db_type: DatabaseType) -> (String, Vec<Value>) {
        let mut builder = SqlBuilder::new(db_type);
        self.write_sql(&mut builder);
        builder.build()
    }

    /// Write this filter into a builder, appending its parameters.
    pub fn write_sql(&self, b: &mut SqlBuilder) {
        match self {
            Self::None => {
                b.push("TRUE");
            }

            Self::Equals(col, val) => {
                b.push_path(col);
                if val.is_null() {
                    b.push(" IS NULL");
                } else {
                    b.push(" = ").push_param(val.clone());
                }
            }
            Self::NotEquals(col, val) => {
                b.push_path(col);
                if val.is_null() {
                    b.push(" IS NOT NULL");
                } else {
                    b.push(" <> ").push_param(val.clone());
                }
            }

            Self::Lt(col, val) => write_compare(b, col, CompareOp::Lt, val),
            Self::Lte(col, val) => write_compare(b, col, CompareOp::Lte, val),
            Self::Gt(col, val) => write_compare(b, col, CompareOp::Gt, val),
            Self::Gte(col, val) => write_compare(b, col, CompareOp::Gte, val),

            Self::In(col, values) => write_in(b, col, values, false),
            Self::NotIn(col, values) => write_in(b, col, values, true),

            Self::Contains(col, val) => write_like(b, col, val, "%", "%"),
            Self::StartsWith(col, val) => write_like(b, col, val, "", "%"),
            Self::EndsWith(col, val) => write_like(b, col, val, "%", ""),

            Self::IsNull(col) => {
                b.push_path(col).push(" IS NULL");
            }
            Self::IsNotNull(col) => {
                b.push_path(col).push(" IS NOT NULL");
            }

            Self::Subquery { column, op, query } => {
                b.push_path(column).push(" ").push(op.as_sql()).push(" (");
                query.write_sql(b);
                b.push(")");
            }

            Self::Columns { left, op, right } => {
                b.push_path(left).push(" ").push(op.as_sql()).push(" ").push_path(right);
            }

            Self::And(filters) => write_junction(b, filters, " AND ", "TRUE"),
            Self::Or(filters) => write_junction(b, filters, " OR ", "FALSE"),
            Self::Not(filter) => {
                b.push("NOT (");
                filter.write_sql(b);
                b.push(")");
            }
        }
    }

    /// Whether a row satisfies the filter, as a WHERE clause would decide.
    ///
    /// Rows for which the filter is unknown (see [`Filter::eval`]) do not
    /// match. Subqueries must be resolved with [`Filter::resolve_subqueries`]
    /// first.
    pub fn matches<R: Row + ?Sized>(&self, row: &R) -> QueryResult<bool> {
        Ok(self.eval(row)?.unwrap_or(false))
    }

    /// Evaluate the filter with SQL three-valued logic.
    ///
    /// `None` is UNKNOWN: a comparison with null, or an `IN` list that only
    /// misses because of a null element. `NOT` keeps UNKNOWN, `AND` is false
    /// if any part is false and `OR` is true if any part is true.
    pub fn eval<R: Row + ?Sized>(&self, row: &R) -> QueryResult<Option<bool>> {
        Ok(match self {
            Self::None => Some(true),

            Self::Equals(col, val) if val.is_null() => Some(column(row, col)?.is_null()),
            Self::NotEquals(col, val) if val.is_null() => Some(!column(row, col)?.is_null()),
            Self::Equals(col, val) => CompareOp::Eq.eval(column(row, col)?, val),
            Self::NotEquals(col, val) => CompareOp::Ne.eval(column(row, col)?, val),
            Self::Lt(col, val) => CompareOp::Lt.eval(column(row, col)?, val),
            Self::Lte(col, val) => CompareOp::Lte.eval(column(row, col)?, val),
            Self::Gt(col, val) => CompareOp::Gt.eval(column(row, col)?, val),
            Self::Gte(col, val) => CompareOp::Gte.eval(column(row, col)?, val),

            Self::In(col, values) => in_list(column(row, col)?, values),
            Self::NotIn(col, values) => in_list(column(row, col)?, values).map(|found| !found),

            Self::Contains(col, val) => text_test(column(row, col)?, val, |a, b| a.contains(b)),
            Self::StartsWith(col, val) => {
                text_test(column(row, col)?, val, |a, b| a.starts_with(b))
            }
            Self::EndsWith(col, val) => text_test(column(row, col)?, val, |a, b| a.ends_with(b)),

            Self::IsNull(col) => Some(column(row, col)?.is_null()),
            Self::IsNotNull(col) => Some(!column(row, col)?.is_null()),

            Self::Subquery { column, .. } => {
                return Err(QueryError::invalid_filter(
                    "subquery comparison must be resolved before evaluation",
                )
                .with_field(column));
            }

            Self::Columns { left, op, right } => op.eval(column(row, left)?, column(row, right)?),

            Self::And(filters) => {
                let mut result = Some(true);
                for filter in filters {
                    match filter.eval(row)? {
                        Some(false) => return Ok(Some(false)),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                result
            }
            Self::Or(filters) => {
                let mut result = Some(false);
                for filter in filters {
                    match filter.eval(row)? {
                        Some(true) => return Ok(Some(true)),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                result
            }
            Self::Not(filter) => filter.eval(row)?.map(|b| !b),
        })
    }

    /// Replace every subquery comparison with a plain comparison against the
    /// value produced by `resolve`.
    pub fn resolve_subqueries<F>(self, resolve: &mut F) -> QueryResult<Filter>
    where
        F: FnMut(&SelectStatement) -> QueryResult<Value>,
    {
        Ok(match self {
            Self::Subquery { column, op, query } => op.into_filter(column, resolve(query.as_ref())?),
            Self::And(filters) => Self::And(
                filters
                    .into_iter()
                    .map(|f| f.resolve_subqueries(resolve))
                    .collect::<QueryResult<_>>()?,
            ),
            Self::Or(filters) => Self::Or(
                filters
                    .into_iter()
                    .map(|f| f.resolve_subqueries(resolve))
                    .collect::<QueryResult<_>>()?,
            ),
            Self::Not(filter) => Self::Not(Box::new(filter.resolve_subqueries(resolve)?)),
            other => other,
        })
    }

    /// Every column this filter reads, in visit order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::None => {}
            Self::Equals(c, _)
            | Self::NotEquals(c, _)
            | Self::Lt(c, _)
            | Self::Lte(c, _)
            | Self::Gt(c, _)
            | Self::Gte(c, _)
            | Self::In(c, _)
            | Self::NotIn(c, _)
            | Self::Contains(c, _)
            | Self::StartsWith(c, _)
            | Self::EndsWith(c, _)
            | Self::IsNull(c)
            | Self::IsNotNull(c) => out.push(c),
            Self::Subquery { column, .. } => out.push(column),
            Self::Columns { left, right, .. } => {
                out.push(left);
                out.push(right);
            }
            Self::And(filters) | Self::Or(filters) => {
                filters.iter().for_each(|f| f.collect_columns(out))
            }
            Self::Not(filter) => filter.collect_columns(out),
        }
    }
}

fn column<'r, R: Row + ?Sized>(row: &'r R, name: &str) -> QueryResult<&'r Value> {
    row.value(name)
        .ok_or_else(|| QueryError::unknown_column(name))
}

/// `actual IN (values)`: true on a match, unknown when the value is null or
/// the only candidates left are null, false otherwise. An empty list is false.
fn in_list(actual: &Value, values: &[Value]) -> Option<bool> {
    if values.is_empty() {
        return Some(false);
    }
    let mut result = Some(false);
    for value in values {
        match CompareOp::Eq.eval(actual, value) {
            Some(true) => return Some(true),
            None => result = None,
            Some(false) => {}
        }
    }
    result
}

fn text_test(actual: &Value, needle: &Value, f: impl Fn(&str, &str) -> bool) -> Option<bool> {
    match (actual, needle) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => Some(f(a, b)),
        _ => Some(false),
    }
}

fn write_compare(b: &mut SqlBuilder, col: &str, op: CompareOp, val: &Value) {
    b.push_path(col)
        .push(" ")
        .push(op.as_sql())
        .push(" ")
        .push_param(val.clone());
}

fn write_in(b: &mut SqlBuilder, col: &str, values: &[Value], negated: bool) {
    if values.is_empty() {
        b.push(if negated { "TRUE" } else { "FALSE" });
        return;
    }
    b.push_path(col)
        .push(if negated { " NOT IN (" } else { " IN (" });
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_param(v.clone());
    }
    b.push(")");
}

/// `col LIKE pattern`. `%`, `_` and `\` in the text are escaped so they
/// match literally, the way the in-memory engine compares text.
fn write_like(b: &mut SqlBuilder, col: &str, val: &Value, prefix: &str, suffix: &str) {
    let (pattern, escaped) = match val {
        Value::String(text) => {
            let escaped = escape_like(text);
            let changed = escaped.len() != text.len();
            (Value::String(format!("{prefix}{escaped}{suffix}")), changed)
        }
        other => (other.clone(), false),
    };
    b.push_path(col).push(" LIKE ").push_param(pattern);
    if escaped {
        let clause = match b.db_type() {
            DatabaseType::MySQL => " ESCAPE '\\\\'",
            DatabaseType::PostgreSQL | DatabaseType::SQLite => " ESCAPE '\\'",
        };
        b.push(clause);
    }
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn write_junction(b: &mut SqlBuilder, filters: &[Filter], sep: &str, empty: &str) {
    if filters.is_empty() {
        b.push(empty);
        return;
    }
    b.push("(");
    for (i, f) in filters.iter().enumerate() {
        if i > 0 {
            b.push(sep);
        }
        f.write_sql(b);
    }
    b.push(")");
}
