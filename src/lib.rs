//! # Squad
//!
//! Typed queries over a `Member`/`Team` schema, with search conditions
//! whose absent fields simply drop out of the `WHERE` clause.
//!
//! Squad provides:
//! - The `Member` and `Team` entities with their query metamodels
//! - DTO projections and the member search condition
//! - A repository that composes the condition into a joined select
//!
//! ## Quick Start
//!
//! ```rust
//! use squad::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> QueryResult<()> {
//!     let engine = MemoryEngine::new();
//!     squad::schema::register(&engine)?;
//!     let query = QueryFactory::new(engine);
//!
//!     let mut team_b = Team::new("teamB");
//!     query.persist(&mut team_b).await?;
//!
//!     let members = MemberRepository::new(query.clone());
//!     members.save(&mut Member::new("member3", 30, Some(&team_b))).await?;
//!     members.save(&mut Member::new("member4", 40, Some(&team_b))).await?;
//!
//!     let condition = MemberSearchCondition::default()
//!         .with_age_goe(35)
//!         .with_age_loe(40)
//!         .with_team_name("teamB");
//!     let found = members.search(&condition).await?;
//!     assert_eq!(found.len(), 1);
//!     assert_eq!(found[0].username.as_deref(), Some("member4"));
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod dto;
pub mod entity;
pub mod repository;
pub mod schema;

/// The generic query builder.
pub mod query {
    pub use squad_query::*;
}

pub use dto::{MemberDto, MemberSearchCondition, MemberTeamDto, UserDto};
pub use entity::{Member, MemberPath, Team, TeamPath};
pub use repository::MemberRepository;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::dto::{MemberDto, MemberSearchCondition, MemberTeamDto, UserDto};
    pub use crate::entity::{Member, MemberPath, Team, TeamPath};
    pub use crate::repository::MemberRepository;
    pub use squad_query::prelude::*;
}
