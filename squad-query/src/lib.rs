//! # squad-query
//!
//! Typed, dynamic query building for the squad member/team model.
//!
//! This crate provides:
//! - Column paths that produce single-field predicates (`equals`, `gte`, `lte`, ...)
//! - Composition of optional predicates into one `WHERE` clause
//! - Select, update, delete and insert operations over a [`QueryEngine`]
//! - Joins, fetch joins, grouping, aggregates, ordering and pagination
//! - Scalar sub-selects in filters and projections
//! - An in-memory engine that evaluates statements directly
//!
//! ## Composing optional conditions
//!
//! Absent conditions contribute nothing; when every condition is absent
//! there is no `WHERE` clause at all.
//!
//! ```rust
//! use squad_query::compose::{all_of, when};
//! use squad_query::path::{NumberPath, StringPath};
//!
//! let username = StringPath::new("member", "username");
//! let age = NumberPath::new("member", "age");
//!
//! let name: Option<&str> = None;
//! let min_age = Some(35);
//! let filter = all_of([
//!     when(name, |v| username.equals(v)),
//!     when(min_age, |v| age.gte(v)),
//! ]);
//! assert_eq!(filter, Some(age.gte(35)));
//!
//! assert_eq!(all_of([when(name, |v| username.equals(v))]), None);
//! ```
//!
//! ## Filters
//!
//! ```rust
//! use squad_query::{Filter, Value};
//!
//! let filter = Filter::and([
//!     Filter::Equals("member.username".into(), Value::from("member1")),
//!     Filter::Gt("member.age".into(), Value::Int(18)),
//! ]);
//! assert_eq!(filter.columns(), vec!["member.username", "member.age"]);
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use squad_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::not_unique("member", 2);
//! assert_eq!(err.code, ErrorCode::NotUnique);
//! assert!(err.is_not_unique());
//! ```

pub mod compose;
pub mod config;
pub mod error;
pub mod expr;
pub mod filter;
pub mod logging;
pub mod memory;
pub mod operations;
pub mod pagination;
pub mod path;
pub mod query;
pub mod record;
pub mod sql;
pub mod statement;
pub mod traits;
pub mod types;

pub use compose::{SearchCondition, all_of, any_of, when};
pub use config::{QuerySettings, SquadConfig};
pub use error::{ErrorCategory, ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use expr::{AggregateFn, Expr};
pub use filter::{CompareOp, Filter, ScalarFilter, Value};
pub use memory::MemoryEngine;
pub use operations::{
    DeleteOperation, InsertOperation, SelectFrom, SelectOperation, SubSelect, UpdateOperation,
    sub_select,
};
pub use pagination::{Page, Pagination};
pub use path::{ColumnPath, EntityPath, NumberPath, RelationPath, StringPath};
pub use query::QueryFactory;
pub use record::{FromRecord, FromValue, Record};
pub use sql::{DatabaseType, SqlBuilder};
pub use statement::{
    DeleteStatement, InsertStatement, JoinKind, Projection, SelectStatement, TableRef,
    UpdateStatement,
};
pub use traits::{Entity, Model, QueryEngine, Row};
pub use types::{NullsOrder, OrderBy, OrderByField, SortOrder};

// Re-export logging utilities
pub use logging::{LogFormat, LogSettings, init as init_logging, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::compose::{SearchCondition, all_of, any_of, when};
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::expr::Expr;
    pub use crate::filter::{Filter, Value};
    pub use crate::memory::MemoryEngine;
    pub use crate::operations::*;
    pub use crate::pagination::{Page, Pagination};
    pub use crate::path::{ColumnPath, EntityPath, NumberPath, StringPath};
    pub use crate::query::QueryFactory;
    pub use crate::record::{FromRecord, Record};
    pub use crate::traits::{Entity, Model, QueryEngine};
    pub use crate::types::{OrderBy, OrderByField};
}
