//! Query factory entry point.

use crate::config::{QuerySettings, SquadConfig};
use crate::error::QueryResult;
use crate::expr::Expr;
use crate::operations::*;
use crate::path::EntityPath;
use crate::statement::InsertStatement;
use crate::traits::{Entity, QueryEngine};

/// The entry point for building statements against one engine.
///
/// Cheap to clone; every operation it starts carries a clone of the
/// engine and the resolved [`QuerySettings`].
///
/// ```rust
/// use squad_query::{MemoryEngine, QueryFactory};
///
/// let query = QueryFactory::new(MemoryEngine::new());
/// assert!(query.settings().max_rows.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct QueryFactory<E: QueryEngine> {
    engine: E,
    settings: QuerySettings,
}

impl<E: QueryEngine> QueryFactory<E> {
    /// Create a factory with default settings.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            settings: QuerySettings::default(),
        }
    }

    /// Apply dialect, row cap and logging settings from a configuration.
    pub fn with_config(mut self, config: &SquadConfig) -> Self {
        self.settings = config.settings();
        self
    }

    /// Replace the runtime settings.
    pub fn with_settings(mut self, settings: QuerySettings) -> Self {
        self.settings = settings;
        self
    }

    /// The settings every operation receives.
    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Select the root entity of `path`.
    pub fn select_from(&self, path: &impl EntityPath) -> SelectOperation<E> {
        SelectOperation::new(
            self.engine.clone(),
            self.settings,
            path.table_ref(),
            path.primary_key(),
        )
    }

    /// Select a list of expressions; call `.from(&path)` next.
    pub fn select(&self, exprs: impl IntoIterator<Item = impl Into<Expr>>) -> SelectFrom<E> {
        SelectFrom::new(self.engine.clone(), self.settings, exprs)
    }

    /// Start a bulk update.
    pub fn update(&self, path: &impl EntityPath) -> UpdateOperation<E> {
        UpdateOperation::new(self.engine.clone(), self.settings, path.table_ref())
    }

    /// Start a bulk delete.
    pub fn delete(&self, path: &impl EntityPath) -> DeleteOperation<E> {
        DeleteOperation::new(self.engine.clone(), self.settings, path.table_ref())
    }

    /// Start an insert into the table of `path`.
    pub fn insert(&self, path: &impl EntityPath) -> InsertOperation<E> {
        let statement = InsertStatement::new(
            path.table(),
            path.primary_key(),
            Vec::<(String, crate::filter::Value)>::new(),
        );
        InsertOperation::new(self.engine.clone(), self.settings, statement)
    }

    /// Insert an entity and store its generated id on it.
    pub async fn persist<T: Entity>(&self, entity: &mut T) -> QueryResult<i64> {
        let statement = InsertStatement::new(T::TABLE_NAME, T::PRIMARY_KEY, entity.to_values());
        let id = InsertOperation::new(self.engine.clone(), self.settings, statement)
            .exec()
            .await?;
        entity.set_id(id);
        Ok(id)
    }
}
