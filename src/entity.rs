//! The `Member` and `Team` entities and their query metamodels.

use serde::{Deserialize, Serialize};
use squad_query::{
    Entity, EntityPath, FromRecord, Model, NumberPath, QueryResult, Record, RelationPath,
    StringPath, Value,
};

/// A team that members belong to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Team {
    /// Generated primary key, `None` until persisted.
    pub id: Option<i64>,
    /// Team name.
    pub name: String,
}

impl Team {
    /// Create an unsaved team.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl Model for Team {
    const MODEL_NAME: &'static str = "Team";
    const TABLE_NAME: &'static str = "team";
    const PRIMARY_KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
}

impl FromRecord for Team {
    fn from_record(record: &Record) -> QueryResult<Self> {
        Ok(Self {
            id: record.get("id")?,
            name: record.get("name")?,
        })
    }
}

impl Entity for Team {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![("name", Value::from(&self.name))]
    }
}

/// A member, optionally assigned to a team.
///
/// `team` is only populated when the member was loaded through a fetch
/// join; `team_id` is always loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Member {
    /// Generated primary key, `None` until persisted.
    pub id: Option<i64>,
    /// Login name; may be null.
    pub username: Option<String>,
    /// Age in years.
    pub age: i32,
    /// Foreign key to `team.id`.
    pub team_id: Option<i64>,
    /// The fetch-joined team, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub team: Option<Team>,
}

impl Member {
    /// Create an unsaved member, optionally in `team`.
    pub fn new(username: impl Into<String>, age: i32, team: Option<&Team>) -> Self {
        let mut member = Self {
            username: Some(username.into()),
            age,
            ..Self::default()
        };
        if let Some(team) = team {
            member.change_team(team);
        }
        member
    }

    /// Create an unsaved member with no username.
    pub fn anonymous(age: i32) -> Self {
        Self {
            age,
            ..Self::default()
        }
    }

    /// Move the member to another team.
    pub fn change_team(&mut self, team: &Team) {
        self.team_id = team.id;
        self.team = Some(team.clone());
    }
}

impl Model for Member {
    const MODEL_NAME: &'static str = "Member";
    const TABLE_NAME: &'static str = "member";
    const PRIMARY_KEY: &'static str = "id";
    const COLUMNS: &'static [&'static str] = &["id", "username", "age", "team_id"];
}

impl FromRecord for Member {
    fn from_record(record: &Record) -> QueryResult<Self> {
        let team = record
            .nested("team")
            .map(|team| Team::from_record(&team))
            .transpose()?;
        Ok(Self {
            id: record.get("id")?,
            username: record.get("username")?,
            age: record.get("age")?,
            team_id: record.get("team_id")?,
            team,
        })
    }
}

impl Entity for Member {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn to_values(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("username", Value::from(self.username.clone())),
            ("age", Value::from(self.age)),
            ("team_id", Value::from(self.team_id)),
        ]
    }
}

/// Query metamodel for [`Member`] under an alias.
///
/// ```rust
/// use squad::MemberPath;
///
/// let member = MemberPath::default();
/// assert_eq!(member.age().qualified(), "member.age");
///
/// let sub = MemberPath::new("memberSub");
/// assert_eq!(sub.username().qualified(), "memberSub.username");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPath {
    alias: String,
}

impl MemberPath {
    /// Bind the member metamodel to `alias`.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }

    /// `member.id`
    pub fn id(&self) -> NumberPath {
        self.number("id")
    }

    /// `member.username`
    pub fn username(&self) -> StringPath {
        self.string("username")
    }

    /// `member.age`
    pub fn age(&self) -> NumberPath {
        self.number("age")
    }

    /// `member.team_id`
    pub fn team_id(&self) -> NumberPath {
        self.number("team_id")
    }

    /// The many-to-one relation to the member's team.
    pub fn team(&self) -> RelationPath {
        self.relation("team", "team_id", "id")
    }
}

impl Default for MemberPath {
    fn default() -> Self {
        Self::new("member")
    }
}

impl EntityPath for MemberPath {
    fn table(&self) -> &str {
        Member::TABLE_NAME
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn columns(&self) -> &[&'static str] {
        Member::COLUMNS
    }
}

/// Query metamodel for [`Team`] under an alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamPath {
    alias: String,
}

impl TeamPath {
    /// Bind the team metamodel to `alias`.
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
        }
    }

    /// `team.id`
    pub fn id(&self) -> NumberPath {
        self.number("id")
    }

    /// `team.name`
    pub fn name(&self) -> StringPath {
        self.string("name")
    }

    /// The one-to-many relation to the team's members.
    pub fn members(&self) -> RelationPath {
        self.relation("members", "id", "team_id")
    }
}

impl Default for TeamPath {
    fn default() -> Self {
        Self::new("team")
    }
}

impl EntityPath for TeamPath {
    fn table(&self) -> &str {
        Team::TABLE_NAME
    }

    fn alias(&self) -> &str {
        &self.alias
    }

    fn columns(&self) -> &[&'static str] {
        Team::COLUMNS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_member_from_fetch_joined_record() {
        let record: Record = [
            ("id", Value::Int(1)),
            ("username", Value::from("member1")),
            ("age", Value::Int(10)),
            ("team_id", Value::Int(7)),
            ("team.id", Value::Int(7)),
            ("team.name", Value::from("teamA")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let member = Member::from_record(&record).unwrap();
        assert_eq!(member.username.as_deref(), Some("member1"));
        assert_eq!(
            member.team,
            Some(Team {
                id: Some(7),
                name: "teamA".into()
            })
        );
    }

    #[test]
    fn test_member_without_team() {
        let record: Record = [
            ("id", Value::Int(2)),
            ("username", Value::Null),
            ("age", Value::Int(100)),
            ("team_id", Value::Null),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let member = Member::from_record(&record).unwrap();
        assert_eq!(member, Member {
            id: Some(2),
            ..Member::anonymous(100)
        });
    }

    #[test]
    fn test_new_member_takes_team_id() {
        let mut team = Team::new("teamA");
        team.set_id(3);
        let member = Member::new("member1", 10, Some(&team));
        assert_eq!(member.team_id, Some(3));
        assert_eq!(
            member.to_values(),
            vec![
                ("username", Value::from("member1")),
                ("age", Value::Int(10)),
                ("team_id", Value::Int(3)),
            ]
        );
    }

    #[test]
    fn test_paths() {
        let member = MemberPath::new("m");
        assert_eq!(member.team().local, "m.team_id");
        assert_eq!(TeamPath::default().members().target_key, "team_id");
        assert_eq!(member.primary_key(), "id");
    }
}
