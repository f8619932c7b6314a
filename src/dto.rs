//! Projection targets and the member search condition.

use serde::{Deserialize, Serialize};
use squad_query::{Filter, FromRecord, QueryResult, Record, SearchCondition, all_of, when};

use crate::entity::{MemberPath, TeamPath};

/// Username and age of a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberDto {
    /// Login name.
    pub username: Option<String>,
    /// Age in years.
    pub age: i32,
}

impl MemberDto {
    /// Create a DTO.
    pub fn new(username: impl Into<String>, age: i32) -> Self {
        Self {
            username: Some(username.into()),
            age,
        }
    }
}

impl FromRecord for MemberDto {
    fn from_record(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            username: record.get("username")?,
            age: record.get("age")?,
        })
    }
}

/// A member projected under different labels: `name` and `age`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    /// The member's username.
    pub name: Option<String>,
    /// An age, possibly computed by a sub-select.
    pub age: i32,
}

impl FromRecord for UserDto {
    fn from_record(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            name: record.get("name")?,
            age: record.get("age")?,
        })
    }
}

/// A member row joined with its team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberTeamDto {
    /// Member id.
    pub member_id: i64,
    /// Member username.
    pub username: Option<String>,
    /// Member age.
    pub age: i32,
    /// Team id, `None` when the member has no team.
    pub team_id: Option<i64>,
    /// Team name, `None` when the member has no team.
    pub team_name: Option<String>,
}

impl MemberTeamDto {
    /// Labels of the projection this DTO is read from.
    pub const LABELS: [&'static str; 5] = ["member_id", "username", "age", "team_id", "team_name"];
}

impl FromRecord for MemberTeamDto {
    fn from_record(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            member_id: record.get("member_id")?,
            username: record.get("username")?,
            age: record.get("age")?,
            team_id: record.get("team_id")?,
            team_name: record.get("team_name")?,
        })
    }
}

/// Optional criteria for searching members.
///
/// Every present field narrows the result; absent fields are ignored.
///
/// ```rust
/// use squad::MemberSearchCondition;
/// use squad_query::SearchCondition;
///
/// assert!(MemberSearchCondition::default().to_filter().is_none());
///
/// let condition = MemberSearchCondition::default().with_age_goe(35);
/// assert!(condition.to_filter().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemberSearchCondition {
    /// Exact username.
    pub username: Option<String>,
    /// Minimum age, inclusive.
    pub age_goe: Option<i32>,
    /// Maximum age, inclusive.
    pub age_loe: Option<i32>,
    /// Exact team name.
    pub team_name: Option<String>,
}

impl MemberSearchCondition {
    /// Set the username criterion.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the minimum age criterion.
    pub fn with_age_goe(mut self, age: i32) -> Self {
        self.age_goe = Some(age);
        self
    }

    /// Set the maximum age criterion.
    pub fn with_age_loe(mut self, age: i32) -> Self {
        self.age_loe = Some(age);
        self
    }

    /// Set the team name criterion.
    pub fn with_team_name(mut self, team_name: impl Into<String>) -> Self {
        self.team_name = Some(team_name.into());
        self
    }

    /// `member.username = ?` when a username is given.
    pub fn username_eq(&self, member: &MemberPath) -> Option<Filter> {
        when(self.username.as_deref(), |v| member.username().equals(v))
    }

    /// `member.age >= ?` when a minimum age is given.
    pub fn age_goe(&self, member: &MemberPath) -> Option<Filter> {
        when(self.age_goe, |v| member.age().gte(v))
    }

    /// `member.age <= ?` when a maximum age is given.
    pub fn age_loe(&self, member: &MemberPath) -> Option<Filter> {
        when(self.age_loe, |v| member.age().lte(v))
    }

    /// `team.name = ?` when a team name is given.
    pub fn team_name_eq(&self, team: &TeamPath) -> Option<Filter> {
        when(self.team_name.as_deref(), |v| team.name().equals(v))
    }

    /// Compose the criteria against the given aliases.
    pub fn filter_for(&self, member: &MemberPath, team: &TeamPath) -> Option<Filter> {
        all_of([
            self.username_eq(member),
            self.age_goe(member),
            self.age_loe(member),
            self.team_name_eq(team),
        ])
    }
}

impl SearchCondition for MemberSearchCondition {
    fn to_filter(&self) -> Option<Filter> {
        self.filter_for(&MemberPath::default(), &TeamPath::default())
    }
}
