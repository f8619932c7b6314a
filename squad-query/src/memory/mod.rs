//! An in-process engine that evaluates statements over tables kept in
//! memory.
//!
//! Tables are registered up front with their column lists; the first column
//! is the auto-incremented primary key. The engine is cheap to clone, and
//! every clone shares the same tables.
//!
//! ```rust
//! use squad_query::memory::MemoryEngine;
//!
//! let engine = MemoryEngine::new();
//! engine.register_table("team", &["id", "name"]).unwrap();
//! assert_eq!(engine.row_count("team").unwrap(), 0);
//! ```

mod exec;

use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::info;

use crate::error::{QueryError, QueryResult};
use crate::filter::Value;
use crate::record::Record;
use crate::squad_debug;
use crate::statement::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement};
use crate::traits::QueryEngine;

/// Stored row: unqualified column name to value.
pub(crate) type StoredRow = IndexMap<String, Value>;

#[derive(Debug, Default)]
pub(crate) struct Table {
    pub(crate) columns: Vec<String>,
    pub(crate) rows: Vec<StoredRow>,
    next_id: i64,
}

impl Table {
    fn primary_key(&self) -> &str {
        &self.columns[0]
    }

    pub(crate) fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Store {
    tables: IndexMap<String, Table>,
}

impl Store {
    pub(crate) fn table(&self, name: &str) -> QueryResult<&Table> {
        self.tables
            .get(name)
            .ok_or_else(|| QueryError::unknown_table(name))
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> QueryResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| QueryError::unknown_table(name))
    }
}

/// Shared in-memory tables implementing [`QueryEngine`].
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    store: Arc<RwLock<Store>>,
}

impl MemoryEngine {
    /// Create an engine with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. The first column is the generated primary key.
    ///
    /// Registering an existing table again replaces it, dropping its rows.
    pub fn register_table(&self, table: &str, columns: &[&str]) -> QueryResult<()> {
        if columns.is_empty() {
            return Err(QueryError::invalid_configuration(format!(
                "table '{}' needs at least a primary key column",
                table
            ))
            .with_model(table));
        }

        let entry = Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            next_id: 1,
        };
        self.store.write().tables.insert(table.to_string(), entry);
        info!(table, columns = columns.len(), "MemoryEngine table registered");
        Ok(())
    }

    /// Names of the registered tables, in registration order.
    pub fn tables(&self) -> Vec<String> {
        self.store.read().tables.keys().cloned().collect()
    }

    /// Number of rows currently stored in `table`.
    pub fn row_count(&self, table: &str) -> QueryResult<usize> {
        Ok(self.store.read().table(table)?.rows.len())
    }

    /// Snapshot of every row in `table`, keyed by bare column names.
    pub fn rows(&self, table: &str) -> QueryResult<Vec<Record>> {
        let store = self.store.read();
        let table = store.table(table)?;
        Ok(table
            .rows
            .iter()
            .map(|row| row.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .collect())
    }

    /// Remove every row from every table and restart the id sequences.
    pub fn clear(&self) {
        let mut store = self.store.write();
        for table in store.tables.values_mut() {
            table.rows.clear();
            table.next_id = 1;
        }
        squad_debug!(tables = store.tables.len(), "MemoryEngine cleared");
    }

    fn run_select(&self, statement: &SelectStatement) -> QueryResult<Vec<Record>> {
        exec::select(&self.store.read(), statement)
    }

    fn run_insert(&self, statement: &InsertStatement) -> QueryResult<i64> {
        let mut store = self.store.write();
        let table = store.table_mut(&statement.table)?;

        if table.primary_key() != statement.primary_key {
            return Err(QueryError::invalid_select(format!(
                "'{}' is not the primary key of '{}'",
                statement.primary_key, statement.table
            ))
            .with_model(statement.table.as_str()));
        }
        if let Some((column, _)) = statement.values.iter().find(|(c, _)| !table.has_column(c)) {
            return Err(QueryError::unknown_column(column.as_str()).with_model(statement.table.as_str()));
        }

        let id = table.next_id;
        table.next_id += 1;

        let mut row = StoredRow::with_capacity(table.columns.len());
        for column in &table.columns {
            let value = if column == &statement.primary_key {
                Value::Int(id)
            } else {
                statement
                    .values
                    .iter()
                    .find(|(c, _)| c == column)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(Value::Null)
            };
            row.insert(column.clone(), value);
        }
        table.rows.push(row);
        Ok(id)
    }

    fn run_update(&self, statement: &UpdateStatement) -> QueryResult<u64> {
        exec::update(&mut self.store.write(), statement)
    }

    fn run_delete(&self, statement: &DeleteStatement) -> QueryResult<u64> {
        exec::delete(&mut self.store.write(), statement)
    }
}

impl QueryEngine for MemoryEngine {
    fn select(&self, statement: SelectStatement) -> BoxFuture<'_, QueryResult<Vec<Record>>> {
        Box::pin(async move { self.run_select(&statement) })
    }

    fn insert(&self, statement: InsertStatement) -> BoxFuture<'_, QueryResult<i64>> {
        Box::pin(async move { self.run_insert(&statement) })
    }

    fn update(&self, statement: UpdateStatement) -> BoxFuture<'_, QueryResult<u64>> {
        Box::pin(async move { self.run_update(&statement) })
    }

    fn delete(&self, statement: DeleteStatement) -> BoxFuture<'_, QueryResult<u64>> {
        Box::pin(async move { self.run_delete(&statement) })
    }
}
