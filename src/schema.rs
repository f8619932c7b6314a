//! Table registration for the member/team schema.

use squad_query::{MemoryEngine, Model, QueryResult};

use crate::entity::{Member, Team};

/// Register the `team` and `member` tables on `engine`.
///
/// Existing tables of the same name are replaced.
///
/// ```rust
/// use squad_query::MemoryEngine;
///
/// let engine = MemoryEngine::new();
/// squad::schema::register(&engine).unwrap();
/// assert_eq!(engine.tables(), vec!["team", "member"]);
/// ```
pub fn register(engine: &MemoryEngine) -> QueryResult<()> {
    engine.register_table(Team::TABLE_NAME, Team::COLUMNS)?;
    engine.register_table(Member::TABLE_NAME, Member::COLUMNS)?;
    Ok(())
}
