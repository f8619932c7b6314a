//! Query operations for the fluent API.
//!
//! - `SelectOperation` - select entities, tuples or aggregates
//! - `UpdateOperation` - bulk update matching rows
//! - `DeleteOperation` - bulk delete matching rows
//! - `InsertOperation` - insert one row

mod delete;
mod insert;
mod select;
mod update;

use std::future::Future;
use std::time::Instant;

pub use delete::DeleteOperation;
pub use insert::InsertOperation;
pub use select::{SelectFrom, SelectOperation, SubSelect, sub_select};
pub use update::UpdateOperation;

use crate::config::QuerySettings;
use crate::error::QueryResult;
use crate::filter::Value;
use crate::logging;

/// Await an engine call, logging the rendered statement and attaching its
/// SQL to any error.
pub(crate) async fn run<T>(
    settings: &QuerySettings,
    kind: &'static str,
    rendered: (String, Vec<Value>),
    call: impl Future<Output = QueryResult<T>>,
) -> QueryResult<T> {
    let started = Instant::now();
    let result = call.await;
    let (sql, params) = rendered;
    logging::statement_executed(settings, kind, &sql, params.len(), started.elapsed());

    result.map_err(|e| {
        if e.context.sql.is_some() {
            e
        } else {
            e.with_sql(sql)
        }
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! A recording engine for operation tests.

    use std::sync::Arc;

    use futures::future::BoxFuture;
    use parking_lot::Mutex;

    use crate::error::QueryResult;
    use crate::record::Record;
    use crate::statement::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement};
    use crate::traits::QueryEngine;

    #[derive(Debug, Clone)]
    pub(crate) enum Executed {
        Select(SelectStatement),
        Insert(InsertStatement),
        Update(UpdateStatement),
        Delete(DeleteStatement),
    }

    /// Returns canned records and remembers every statement it receives.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingEngine {
        pub(crate) records: Arc<Vec<Record>>,
        pub(crate) executed: Arc<Mutex<Vec<Executed>>>,
    }

    impl RecordingEngine {
        pub(crate) fn returning(records: Vec<Record>) -> Self {
            Self {
                records: Arc::new(records),
                executed: Arc::default(),
            }
        }

        pub(crate) fn last(&self) -> Option<Executed> {
            self.executed.lock().last().cloned()
        }
    }

    impl QueryEngine for RecordingEngine {
        fn select(&self, statement: SelectStatement) -> BoxFuture<'_, QueryResult<Vec<Record>>> {
            self.executed.lock().push(Executed::Select(statement));
            let records = self.records.as_ref().clone();
            Box::pin(async move { Ok(records) })
        }

        fn insert(&self, statement: InsertStatement) -> BoxFuture<'_, QueryResult<i64>> {
            self.executed.lock().push(Executed::Insert(statement));
            Box::pin(async { Ok(1) })
        }

        fn update(&self, statement: UpdateStatement) -> BoxFuture<'_, QueryResult<u64>> {
            self.executed.lock().push(Executed::Update(statement));
            let count = self.records.len() as u64;
            Box::pin(async move { Ok(count) })
        }

        fn delete(&self, statement: DeleteStatement) -> BoxFuture<'_, QueryResult<u64>> {
            self.executed.lock().push(Executed::Delete(statement));
            let count = self.records.len() as u64;
            Box::pin(async move { Ok(count) })
        }
    }
}
