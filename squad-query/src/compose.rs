//! Dynamic predicate composition.
//!
//! Search screens hand the data layer a record of independently optional
//! fields. Each field gets a single-field helper returning
//! `Option<Filter>`: `None` when the field is absent. [`all_of`] folds the
//! helpers' results with AND in the order given. When nothing is present
//! the result is `None`, so the select renders without a WHERE clause at
//! all instead of with an always-true one.
//!
//! ```rust
//! use squad_query::compose::{all_of, when};
//! use squad_query::path::{NumberPath, StringPath};
//!
//! let age = NumberPath::new("member", "age");
//! let team_name = StringPath::new("team", "name");
//!
//! let age_goe: Option<i32> = Some(35);
//! let age_loe: Option<i32> = Some(40);
//! let name: Option<&str> = None;
//!
//! let filter = all_of([
//!     when(name, |n| team_name.equals(n)),
//!     when(age_goe, |a| age.gte(a)),
//!     when(age_loe, |a| age.lte(a)),
//! ]);
//! assert_eq!(filter, Some(age.gte(35).and_then(age.lte(40))));
//!
//! assert_eq!(all_of([when(None::<i32>, |a| age.gte(a))]), None);
//! ```

use crate::filter::Filter;

/// A set of optional search fields that composes into one predicate.
pub trait SearchCondition {
    /// The conjunction of the present fields, `None` when all are absent.
    fn to_filter(&self) -> Option<Filter>;
}

impl<T: SearchCondition + ?Sized> SearchCondition for &T {
    fn to_filter(&self) -> Option<Filter> {
        (**self).to_filter()
    }
}

/// Build a predicate from an optional value: `None` stays `None`.
pub fn when<T>(value: Option<T>, predicate: impl FnOnce(T) -> Filter) -> Option<Filter> {
    value.map(predicate)
}

/// Fold optional predicates with AND.
///
/// Absent parts, and parts that are already [`Filter::None`], are skipped.
/// One present part is returned as-is; two or more become a single
/// [`Filter::And`] in iteration order. Nested conjunctions among the parts
/// are kept as they are.
pub fn all_of(parts: impl IntoIterator<Item = Option<Filter>>) -> Option<Filter> {
    let mut present: Vec<Filter> = parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_none())
        .collect();

    match present.len() {
        0 => None,
        1 => present.pop(),
        _ => Some(Filter::And(present)),
    }
}

/// Fold optional predicates with OR, with the same absence rules as
/// [`all_of`].
pub fn any_of(parts: impl IntoIterator<Item = Option<Filter>>) -> Option<Filter> {
    let mut present: Vec<Filter> = parts
        .into_iter()
        .flatten()
        .filter(|part| !part.is_none())
        .collect();

    match present.len() {
        0 => None,
        1 => present.pop(),
        _ => Some(Filter::Or(present)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Value;
    use crate::path::{NumberPath, StringPath};
    use crate::record::Record;
    use crate::sql::DatabaseType;
    use pretty_assertions::assert_eq;

    #[derive(Default, Clone, PartialEq)]
    struct Condition {
        username: Option<String>,
        age_goe: Option<i32>,
        age_loe: Option<i32>,
        team_name: Option<String>,
    }

    impl SearchCondition for Condition {
        fn to_filter(&self) -> Option<Filter> {
            let username = StringPath::new("m", "username");
            let age = NumberPath::new("m", "age");
            let team_name = StringPath::new("t", "name");
            all_of([
                when(self.username.as_deref(), |v| username.equals(v)),
                when(self.age_goe, |v| age.gte(v)),
                when(self.age_loe, |v| age.lte(v)),
                when(self.team_name.as_deref(), |v| team_name.equals(v)),
            ])
        }
    }

    fn row(age: i32, team: &str) -> Record {
        let mut record = Record::new();
        record.insert("m.username", format!("member{}", age / 10));
        record.insert("m.age", age);
        record.insert("t.name", team);
        record
    }

    #[test]
    fn test_all_absent_is_no_filter() {
        assert_eq!(Condition::default().to_filter(), None);
        assert_eq!(all_of(Vec::new()), None);
        assert_eq!(all_of([Some(Filter::None), None]), None);
    }

    #[test]
    fn test_single_field_is_the_predicate_itself() {
        let condition = Condition {
            age_goe: Some(35),
            ..Default::default()
        };
        assert_eq!(condition.to_filter(), Some(NumberPath::new("m", "age").gte(35)));
    }

    #[test]
    fn test_declaration_order() {
        let condition = Condition {
            username: Some("member1".into()),
            team_name: Some("teamA".into()),
            ..Default::default()
        };
        assert_eq!(
            condition.to_filter(),
            Some(Filter::And(vec![
                Filter::Equals("m.username".into(), "member1".into()),
                Filter::Equals("t.name".into(), "teamA".into()),
            ]))
        );
    }

    #[test]
    fn test_deterministic() {
        let condition = Condition {
            age_goe: Some(35),
            age_loe: Some(40),
            team_name: Some("teamB".into()),
            ..Default::default()
        };
        assert_eq!(condition.to_filter(), condition.clone().to_filter());
    }

    #[test]
    fn test_nested_conjunction_kept() {
        let age = NumberPath::new("m", "age");
        let filter = all_of([Some(age.between(1, 2)), Some(age.is_not_null())]);
        assert_eq!(
            filter,
            Some(Filter::And(vec![age.between(1, 2), age.is_not_null()]))
        );
    }

    #[test]
    fn test_range_and_team_selects_member4() {
        let condition = Condition {
            age_goe: Some(35),
            age_loe: Some(40),
            team_name: Some("teamB".into()),
            ..Default::default()
        };
        let filter = condition.to_filter().unwrap();

        let (sql, params) = filter.to_sql(DatabaseType::PostgreSQL);
        assert_eq!(sql, "(m.age >= $1 AND m.age <= $2 AND t.name = $3)");
        assert_eq!(params, vec![Value::Int(35), Value::Int(40), Value::from("teamB")]);

        let rows = [row(30, "teamB"), row(40, "teamB")];
        let matched: Vec<_> = rows
            .iter()
            .filter(|r| filter.matches(*r).unwrap())
            .map(|r| r.get::<i32>("m.age").unwrap())
            .collect();
        assert_eq!(matched, vec![40]);
    }

    #[test]
    fn test_any_of() {
        let age = NumberPath::new("m", "age");
        assert_eq!(any_of([None, None]), None);
        assert_eq!(any_of([Some(age.lt(1)), None]), Some(age.lt(1)));
        assert_eq!(
            any_of([Some(age.lt(1)), Some(age.gt(9))]),
            Some(Filter::Or(vec![age.lt(1), age.gt(9)]))
        );
    }
}
