//! Bulk update operation.

use crate::compose;
use crate::config::QuerySettings;
use crate::error::{QueryError, QueryResult};
use crate::expr::Expr;
use crate::filter::{Filter, Value};
use crate::path::ColumnPath;
use crate::statement::{TableRef, UpdateStatement};
use crate::traits::QueryEngine;

/// A bulk update of every row matching the filter.
///
/// The update is written straight to the engine; entities already loaded
/// by the caller are not refreshed.
///
/// # Example
///
/// ```rust,ignore
/// let updated = query
///     .update(&member)
///     .set(&member.username(), "non-member")
///     .r#where(member.age().lt(28))
///     .exec()
///     .await?;
/// ```
pub struct UpdateOperation<E: QueryEngine> {
    engine: E,
    settings: QuerySettings,
    statement: UpdateStatement,
}

impl<E: QueryEngine> UpdateOperation<E> {
    /// Create a new Update operation.
    pub(crate) fn new(engine: E, settings: QuerySettings, table: TableRef) -> Self {
        Self {
            engine,
            settings,
            statement: UpdateStatement::new(table),
        }
    }

    /// Set a column to a new value.
    pub fn set(self, column: &ColumnPath, value: impl Into<Value>) -> Self {
        self.set_expr(column, Expr::Value(value.into()))
    }

    /// Set a column to the result of an expression over the old row.
    pub fn set_expr(mut self, column: &ColumnPath, expr: impl Into<Expr>) -> Self {
        self.statement
            .assignments
            .push((column.column().to_string(), expr.into()));
        self
    }

    /// Set a column to null.
    pub fn set_null(self, column: &ColumnPath) -> Self {
        self.set(column, Value::Null)
    }

    /// Add a filter condition. `None` adds nothing.
    pub fn r#where(mut self, filter: impl Into<Option<Filter>>) -> Self {
        if let Some(filter) = filter.into() {
            self.statement.filter = std::mem::take(&mut self.statement.filter).and_then(filter);
        }
        self
    }

    /// Add several optional conditions, skipping absent ones.
    pub fn where_all(self, filters: impl IntoIterator<Item = Option<Filter>>) -> Self {
        self.r#where(compose::all_of(filters))
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<Value>) {
        self.statement.to_sql(self.settings.dialect)
    }

    /// Execute the update and return the number of affected rows.
    pub async fn exec(self) -> QueryResult<u64> {
        if self.statement.assignments.is_empty() {
            return Err(QueryError::invalid_select("update has no assignments")
                .with_model(self.statement.table.table.as_str())
                .with_suggestion("Call set() or set_expr() before exec()"));
        }
        let rendered = self.build_sql();
        super::run(
            &self.settings,
            "update",
            rendered,
            self.engine.update(self.statement),
        )
        .await
    }
}
