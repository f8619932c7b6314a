//! Seams between the query builder, the model types and the engine.

use std::collections::HashMap;

use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::error::QueryResult;
use crate::filter::Value;
use crate::record::{FromRecord, Record};
use crate::statement::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement};

/// A row whose columns can be read by qualified name.
pub trait Row {
    /// Look up a column value. `None` means the column does not exist,
    /// which is different from a present `Value::Null`.
    fn value(&self, column: &str) -> Option<&Value>;
}

impl Row for HashMap<String, Value> {
    fn value(&self, column: &str) -> Option<&Value> {
        self.get(column)
    }
}

impl Row for IndexMap<String, Value> {
    fn value(&self, column: &str) -> Option<&Value> {
        self.get(column)
    }
}

/// Static table metadata for a model type.
pub trait Model {
    /// The name of the model (e.g., "Member").
    const MODEL_NAME: &'static str;
    /// The table name in the database.
    const TABLE_NAME: &'static str;
    /// The primary key column.
    const PRIMARY_KEY: &'static str;
    /// All column names, primary key first.
    const COLUMNS: &'static [&'static str];
}

/// A model that can be written to and read back from an engine.
pub trait Entity: Model + FromRecord {
    /// The generated primary key, once persisted.
    fn id(&self) -> Option<i64>;

    /// Store the primary key assigned by the engine.
    fn set_id(&mut self, id: i64);

    /// Column values for an insert, excluding the primary key.
    fn to_values(&self) -> Vec<(&'static str, Value)>;
}

/// The execution boundary.
///
/// Operations hand fully built statements to an engine; the engine decides
/// how to run them (render SQL for a driver, or evaluate them directly as
/// [`crate::memory::MemoryEngine`] does).
pub trait QueryEngine: Clone + Send + Sync + 'static {
    /// Run a select statement and return its projected records.
    fn select(&self, statement: SelectStatement) -> BoxFuture<'_, QueryResult<Vec<Record>>>;

    /// Insert a row and return its generated primary key.
    fn insert(&self, statement: InsertStatement) -> BoxFuture<'_, QueryResult<i64>>;

    /// Run a bulk update and return the number of affected rows.
    fn update(&self, statement: UpdateStatement) -> BoxFuture<'_, QueryResult<u64>>;

    /// Run a bulk delete and return the number of removed rows.
    fn delete(&self, statement: DeleteStatement) -> BoxFuture<'_, QueryResult<u64>>;
}
