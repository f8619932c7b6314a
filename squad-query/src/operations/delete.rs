//! Bulk delete operation.

use crate::compose;
use crate::config::QuerySettings;
use crate::error::QueryResult;
use crate::filter::{Filter, Value};
use crate::statement::{DeleteStatement, TableRef};
use crate::traits::QueryEngine;

/// A bulk delete of every row matching the filter.
///
/// # Example
///
/// ```rust,ignore
/// let deleted = query
///     .delete(&member)
///     .r#where(member.age().gt(18))
///     .exec()
///     .await?;
/// ```
pub struct DeleteOperation<E: QueryEngine> {
    engine: E,
    settings: QuerySettings,
    statement: DeleteStatement,
}

impl<E: QueryEngine> DeleteOperation<E> {
    /// Create a new Delete operation.
    pub(crate) fn new(engine: E, settings: QuerySettings, table: TableRef) -> Self {
        Self {
            engine,
            settings,
            statement: DeleteStatement::new(table),
        }
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

    /// Execute the delete and return the number of removed rows.
    pub async fn exec(self) -> QueryResult<u64> {
        let rendered = self.build_sql();
        super::run(
            &self.settings,
            "delete",
            rendered,
            self.engine.delete(self.statement),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::{Executed, RecordingEngine};
    use crate::path::NumberPath;
    use crate::record::Record;

    fn delete(engine: RecordingEngine) -> DeleteOperation<RecordingEngine> {
        DeleteOperation::new(engine, QuerySettings::default(), TableRef::new("member", "m"))
    }

    #[test]
    fn test_build_sql() {
        let age = NumberPath::new("m", "age");
        let (sql, params) = delete(RecordingEngine::default()).r#where(age.gt(18)).build_sql();
        assert_eq!(sql, "DELETE FROM member m WHERE m.age > $1");
        assert_eq!(params, vec![Value::Int(18)]);
    }

    #[test]
    fn test_build_sql_without_filter() {
        let op = delete(RecordingEngine::default()).where_all([None]);
        assert_eq!(op.build_sql().0, "DELETE FROM member m");
    }

    #[tokio::test]
    async fn test_exec() {
        let engine = RecordingEngine::returning(vec![Record::new(); 3]);
        let count = delete(engine.clone())
            .r#where(NumberPath::new("m", "age").gt(18))
            .exec()
            .await
            .unwrap();
        assert_eq!(count, 3);
        assert!(matches!(engine.last(), Some(Executed::Delete(_))));
    }
}
