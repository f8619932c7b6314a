//! Projection and assignment expressions.
//!
//! An [`Expr`] is anything that can appear in a select list, a group by, or
//! on the right-hand side of a bulk update assignment: a column, a literal,
//! an aggregate over another expression, an addition, a scalar sub-select,
//! a whole entity, or an aliased expression.

use std::fmt;

use crate::error::{QueryError, QueryResult};
use crate::filter::Value;
use crate::sql::{DatabaseType, SqlBuilder};
use crate::statement::SelectStatement;
use crate::traits::Row;

/// Aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFn {
    /// `COUNT(x)`, counting non-null values.
    Count,
    /// `COUNT(DISTINCT x)`.
    CountDistinct,
    /// `SUM(x)`.
    Sum,
    /// `AVG(x)`.
    Avg,
    /// `MIN(x)`.
    Min,
    /// `MAX(x)`.
    Max,
}

impl AggregateFn {
    /// SQL function name.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Count | Self::CountDistinct => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }

    /// Fold the collected values of one group.
    ///
    /// Nulls are ignored. `COUNT` yields an integer, `SUM` stays an integer
    /// over integers, `AVG` is always a float, and an empty input yields
    /// null for everything but the counts.
    pub fn apply(&self, values: &[Value]) -> QueryResult<Value> {
        let present: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
        match self {
            Self::Count => Ok(Value::Int(present.len() as i64)),
            Self::CountDistinct => {
                let mut seen: Vec<&Value> = Vec::new();
                for v in present {
                    if !seen.iter().any(|s| s.sql_eq(v).unwrap_or(false)) {
                        seen.push(v);
                    }
                }
                Ok(Value::Int(seen.len() as i64))
            }
            Self::Sum => present
                .into_iter()
                .try_fold(None::<Value>, |acc, v| match acc {
                    None => Ok(Some(numeric(v)?.clone())),
                    Some(total) => total.add(v).map(Some),
                })
                .map(|total| total.unwrap_or(Value::Null)),
            Self::Avg => {
                if present.is_empty() {
                    return Ok(Value::Null);
                }
                let mut total = 0.0;
                for v in &present {
                    total += numeric(v)?.as_f64().unwrap_or_default();
                }
                Ok(Value::Float(total / present.len() as f64))
            }
            Self::Min => Ok(present
                .into_iter()
                .min_by(|a, b| a.sort_cmp(b))
                .cloned()
                .unwrap_or(Value::Null)),
            Self::Max => Ok(present
                .into_iter()
                .max_by(|a, b| a.sort_cmp(b))
                .cloned()
                .unwrap_or(Value::Null)),
        }
    }
}

fn numeric(value: &Value) -> QueryResult<&Value> {
    match value.as_f64() {
        Some(_) => Ok(value),
        None => Err(QueryError::type_mismatch("aggregate", "a number", value)),
    }
}

/// An expression usable in projections, group by and assignments.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A qualified column (`alias.column`).
    Column(String),
    /// A literal value.
    Value(Value),
    /// An aggregate over an expression.
    Aggregate(AggregateFn, Box<Expr>),
    /// Numeric addition.
    Add(Box<Expr>, Box<Expr>),
    /// An uncorrelated scalar sub-select.
    Subquery(Box<SelectStatement>),
    /// Every column of an entity alias.
    Entity {
        /// The entity alias.
        alias: String,
        /// Its columns, unqualified.
        columns: Vec<String>,
    },
    /// An expression projected under an explicit label.
    Alias(Box<Expr>, String),
}

impl Expr {
    /// A qualified column.
    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// A literal value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// An aggregate over an expression.
    pub fn aggregate(func: AggregateFn, expr: impl Into<Expr>) -> Self {
        Self::Aggregate(func, Box::new(expr.into()))
    }

    /// `COUNT(expr)`.
    pub fn count(expr: impl Into<Expr>) -> Self {
        Self::aggregate(AggregateFn::Count, expr)
    }

    /// `COUNT(DISTINCT expr)`.
    pub fn count_distinct(expr: impl Into<Expr>) -> Self {
        Self::aggregate(AggregateFn::CountDistinct, expr)
    }

    /// `SUM(expr)`.
    pub fn sum(expr: impl Into<Expr>) -> Self {
        Self::aggregate(AggregateFn::Sum, expr)
    }

    /// `AVG(expr)`.
    pub fn avg(expr: impl Into<Expr>) -> Self {
        Self::aggregate(AggregateFn::Avg, expr)
    }

    /// `MIN(expr)`.
    pub fn min(expr: impl Into<Expr>) -> Self {
        Self::aggregate(AggregateFn::Min, expr)
    }

    /// `MAX(expr)`.
    pub fn max(expr: impl Into<Expr>) -> Self {
        Self::aggregate(AggregateFn::Max, expr)
    }

    /// A scalar sub-select.
    pub fn subquery(statement: SelectStatement) -> Self {
        Self::Subquery(Box::new(statement))
    }

    /// `self + other`.
    pub fn plus(self, other: impl Into<Expr>) -> Self {
        Self::Add(Box::new(self), Box::new(other.into()))
    }

    /// Project this expression under `label`.
    pub fn alias(self, label: impl Into<String>) -> Self {
        Self::Alias(Box::new(self), label.into())
    }

    /// Whether the expression contains an aggregate outside a sub-select.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Self::Aggregate(..) => true,
            Self::Add(a, b) => a.is_aggregate() || b.is_aggregate(),
            Self::Alias(inner, _) => inner.is_aggregate(),
            Self::Column(_) | Self::Value(_) | Self::Subquery(_) | Self::Entity { .. } => false,
        }
    }

    /// The record label this expression is projected under.
    ///
    /// ```rust
    /// use squad_query::Expr;
    ///
    /// assert_eq!(Expr::column("member1.age").label(), "member1.age");
    /// assert_eq!(Expr::avg("member1.age").label(), "AVG(member1.age)");
    /// assert_eq!(Expr::count_distinct("team.id").label(), "COUNT(DISTINCT team.id)");
    /// assert_eq!(Expr::sum("member1.age").alias("total").label(), "total");
    /// ```
    pub fn label(&self) -> String {
        match self {
            Self::Column(name) => name.clone(),
            Self::Value(value) => value.to_string(),
            Self::Aggregate(AggregateFn::CountDistinct, inner) => {
                format!("COUNT(DISTINCT {})", inner.label())
            }
            Self::Aggregate(func, inner) => format!("{}({})", func.as_sql(), inner.label()),
            Self::Add(a, b) => format!("{} + {}", a.label(), b.label()),
            Self::Subquery(statement) => {
                let mut builder = SqlBuilder::new(DatabaseType::default());
                statement.write_sql(&mut builder);
                format!("({})", builder.sql())
            }
            Self::Entity { alias, .. } => alias.clone(),
            Self::Alias(_, label) => label.clone(),
        }
    }

    /// Write the expression into a builder.
    pub fn write_sql(&self, b: &mut SqlBuilder) {
        match self {
            Self::Column(name) => {
                b.push_path(name);
            }
            Self::Value(value) => {
                b.push_param(value.clone());
            }
            Self::Aggregate(func, inner) => {
                b.push(func.as_sql()).push("(");
                if *func == AggregateFn::CountDistinct {
                    b.push("DISTINCT ");
                }
                inner.write_sql(b);
                b.push(")");
            }
            Self::Add(lhs, rhs) => {
                lhs.write_sql(b);
                b.push(" + ");
                rhs.write_sql(b);
            }
            Self::Subquery(statement) => {
                b.push("(");
                statement.write_sql(b);
                b.push(")");
            }
            Self::Entity { alias, .. } => {
                b.push_identifier(alias).push(".*");
            }
            Self::Alias(inner, label) => {
                inner.write_sql(b);
                b.push(" AS ").push_identifier(label);
            }
        }
    }

    /// Evaluate a scalar expression against one row.
    ///
    /// Aggregates, entities and unresolved sub-selects are rejected; the
    /// engine evaluates those at the group level.
    pub fn eval<R: Row + ?Sized>(&self, row: &R) -> QueryResult<Value> {
        match self {
            Self::Column(name) => row
                .value(name)
                .cloned()
                .ok_or_else(|| QueryError::unknown_column(name.as_str())),
            Self::Value(value) => Ok(value.clone()),
            Self::Add(a, b) => a.eval(row)?.add(&b.eval(row)?),
            Self::Alias(inner, _) => inner.eval(row),
            Self::Aggregate(..) => Err(QueryError::invalid_select(format!(
                "aggregate {} cannot be evaluated per row",
                self.label()
            ))),
            Self::Subquery(_) => Err(QueryError::invalid_select(
                "sub-select must be resolved before evaluation",
            )),
            Self::Entity { alias, .. } => Err(QueryError::invalid_select(format!(
                "entity '{}' is not a scalar expression",
                alias
            ))),
        }
    }

    /// Replace every scalar sub-select with the value produced by `resolve`.
    pub fn resolve_subqueries<F>(self, resolve: &mut F) -> QueryResult<Expr>
    where
        F: FnMut(&SelectStatement) -> QueryResult<Value>,
    {
        Ok(match self {
            Self::Subquery(statement) => {
                let value = resolve(statement.as_ref())?;
                let label = Self::Subquery(statement).label();
                Self::Alias(Box::new(Self::Value(value)), label)
            }
            Self::Aggregate(func, inner) => {
                Self::Aggregate(func, Box::new(inner.resolve_subqueries(resolve)?))
            }
            Self::Add(a, b) => Self::Add(
                Box::new(a.resolve_subqueries(resolve)?),
                Box::new(b.resolve_subqueries(resolve)?),
            ),
            Self::Alias(inner, label) => {
                Self::Alias(Box::new(inner.resolve_subqueries(resolve)?), label)
            }
            other => other,
        })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Self::Column(name.to_string())
    }
}

impl From<String> for Expr {
    fn from(name: String) -> Self {
        Self::Column(name)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<SelectStatement> for Expr {
    fn from(statement: SelectStatement) -> Self {
        Self::subquery(statement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn ages() -> Vec<Value> {
        vec![Value::Int(10), Value::Int(20), Value::Null, Value::Int(30), Value::Int(40)]
    }

    #[test]
    fn test_aggregates() {
        let ages = ages();
        assert_eq!(AggregateFn::Count.apply(&ages).unwrap(), Value::Int(4));
        assert_eq!(AggregateFn::Sum.apply(&ages).unwrap(), Value::Int(100));
        assert_eq!(AggregateFn::Avg.apply(&ages).unwrap(), Value::Float(25.0));
        assert_eq!(AggregateFn::Min.apply(&ages).unwrap(), Value::Int(10));
        assert_eq!(AggregateFn::Max.apply(&ages).unwrap(), Value::Int(40));
    }

    #[test]
    fn test_aggregates_empty() {
        assert_eq!(AggregateFn::Count.apply(&[]).unwrap(), Value::Int(0));
        assert_eq!(AggregateFn::Sum.apply(&[]).unwrap(), Value::Null);
        assert_eq!(AggregateFn::Avg.apply(&[Value::Null]).unwrap(), Value::Null);
    }

    #[test]
    fn test_count_distinct() {
        let names = vec![Value::from("a"), Value::from("b"), Value::from("a")];
        assert_eq!(AggregateFn::CountDistinct.apply(&names).unwrap(), Value::Int(2));
    }

    #[test]
    fn test_sum_rejects_text() {
        assert!(AggregateFn::Sum.apply(&[Value::from("x")]).is_err());
    }

    #[test]
    fn test_write_sql() {
        let expr = Expr::column("member1.age").plus(Expr::value(1));
        let mut b = SqlBuilder::postgres();
        expr.write_sql(&mut b);
        assert_eq!(b.build(), ("member1.age + $1".to_string(), vec![Value::Int(1)]));

        let mut b = SqlBuilder::postgres();
        Expr::count_distinct("member1.id").alias("members").write_sql(&mut b);
        assert_eq!(b.sql(), "COUNT(DISTINCT member1.id) AS members");
    }

    #[test]
    fn test_eval() {
        let row: HashMap<String, Value> = [("m.age".to_string(), Value::Int(10))].into();
        let expr = Expr::column("m.age").plus(Expr::value(1));
        assert_eq!(expr.eval(&row).unwrap(), Value::Int(11));
        assert!(Expr::max("m.age").eval(&row).is_err());
        assert!(Expr::column("m.height").eval(&row).unwrap_err().is_schema_error());
    }

    #[test]
    fn test_is_aggregate() {
        assert!(Expr::avg("m.age").alias("avg").is_aggregate());
        assert!(!Expr::column("m.age").is_aggregate());
    }
}
