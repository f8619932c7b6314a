//! Single-row insert operation.

use crate::config::QuerySettings;
use crate::error::QueryResult;
use crate::filter::Value;
use crate::path::ColumnPath;
use crate::statement::InsertStatement;
use crate::traits::QueryEngine;

/// Insert one row and return its generated primary key.
///
/// # Example
///
/// ```rust,ignore
/// let id = query
///     .insert(&team)
///     .set(&team.name(), "teamA")
///     .exec()
///     .await?;
/// ```
pub struct InsertOperation<E: QueryEngine> {
    engine: E,
    settings: QuerySettings,
    statement: InsertStatement,
}

impl<E: QueryEngine> InsertOperation<E> {
    /// Create a new Insert operation.
    pub(crate) fn new(engine: E, settings: QuerySettings, statement: InsertStatement) -> Self {
        Self {
            engine,
            settings,
            statement,
        }
    }

    /// Set a column value.
    pub fn set(self, column: &ColumnPath, value: impl Into<Value>) -> Self {
        self.value(column.column(), value)
    }

    /// Set a column value by bare column name.
    pub fn value(mut self, column: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.statement.values.iter_mut().find(|(c, _)| c == column) {
            Some((_, existing)) => *existing = value,
            None => self.statement.values.push((column.to_string(), value)),
        }
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<Value>) {
        self.statement.to_sql(self.settings.dialect)
    }

    /// Execute the insert and return the generated primary key.
    pub async fn exec(self) -> QueryResult<i64> {
        let rendered = self.build_sql();
        super::run(
            &self.settings,
            "insert",
            rendered,
            self.engine.insert(self.statement),
        )
        .await
    }
}
