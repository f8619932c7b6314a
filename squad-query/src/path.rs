//! Typed column paths.
//!
//! A path is a column reference bound to an entity alias. Paths are the
//! single-field predicate constructors of the query builder: each method
//! returns one [`Filter`], [`Expr`] or [`OrderByField`], and the caller
//! composes them.
//!
//! ```rust
//! use squad_query::path::{NumberPath, StringPath};
//!
//! let username = StringPath::new("member1", "username");
//! let age = NumberPath::new("member1", "age");
//!
//! let filter = username.equals("member1").and_then(age.between(10, 30));
//! assert_eq!(filter.columns(), vec!["member1.username", "member1.age", "member1.age"]);
//! assert_eq!(age.desc().to_sql(), "member1.age DESC");
//! ```

use std::ops::Deref;

use crate::expr::Expr;
use crate::filter::{CompareOp, Filter, Value};
use crate::statement::{SelectStatement, TableRef};
use crate::types::OrderByField;

/// An entity bound to an alias: the root of its column paths.
pub trait EntityPath {
    /// Table name.
    fn table(&self) -> &str;

    /// Alias the entity is queried under.
    fn alias(&self) -> &str;

    /// Column names, primary key first.
    fn columns(&self) -> &[&'static str];

    /// Primary key column.
    fn primary_key(&self) -> &str {
        self.columns().first().copied().unwrap_or("id")
    }

    /// The aliased table reference.
    fn table_ref(&self) -> TableRef {
        TableRef::new(self.table(), self.alias())
    }

    /// Every column of the entity, as one projection.
    fn all(&self) -> Expr {
        Expr::Entity {
            alias: self.alias().to_string(),
            columns: self.columns().iter().map(|c| c.to_string()).collect(),
        }
    }

    /// An untyped column path.
    fn column(&self, name: &str) -> ColumnPath {
        ColumnPath::new(self.alias(), name)
    }

    /// A string column path.
    fn string(&self, name: &str) -> StringPath {
        StringPath::new(self.alias(), name)
    }

    /// A numeric column path.
    fn number(&self, name: &str) -> NumberPath {
        NumberPath::new(self.alias(), name)
    }

    /// A to-one relation from this entity through the foreign key `local`
    /// to the `target_key` of the joined entity.
    fn relation(&self, name: &str, local: &str, target_key: &str) -> RelationPath {
        RelationPath {
            name: name.to_string(),
            local: format!("{}.{}", self.alias(), local),
            target_key: target_key.to_string(),
        }
    }
}

/// A to-one relation that can be joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationPath {
    /// Relation name; fetched columns are labelled `name.column`.
    pub name: String,
    /// Qualified foreign key on the owning side.
    pub local: String,
    /// Key column on the target side, unqualified.
    pub target_key: String,
}

/// A column bound to an alias.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnPath {
    alias: String,
    column: String,
}

impl ColumnPath {
    /// Create a column path.
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }

    /// The owning alias.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// The bare column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// `alias.column`.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.alias, self.column)
    }

    /// The column as an expression.
    pub fn expr(&self) -> Expr {
        Expr::Column(self.qualified())
    }

    /// `column = value`. A null value means `IS NULL`.
    pub fn equals(&self, value: impl Into<Value>) -> Filter {
        Filter::Equals(self.qualified(), value.into())
    }

    /// `column <> value`.
    pub fn not(&self, value: impl Into<Value>) -> Filter {
        Filter::NotEquals(self.qualified(), value.into())
    }

    /// `column IN (...)`.
    pub fn in_list<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Filter {
        Filter::In(self.qualified(), values.into_iter().map(Into::into).collect())
    }

    /// `column NOT IN (...)`.
    pub fn not_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Filter {
        Filter::NotIn(self.qualified(), values.into_iter().map(Into::into).collect())
    }

    /// `column IS NULL`.
    pub fn is_null(&self) -> Filter {
        Filter::IsNull(self.qualified())
    }

    /// `column IS NOT NULL`.
    pub fn is_not_null(&self) -> Filter {
        Filter::IsNotNull(self.qualified())
    }

    /// Compare against a scalar sub-select.
    pub fn compare_subquery(&self, op: CompareOp, query: SelectStatement) -> Filter {
        Filter::Subquery {
            column: self.qualified(),
            op,
            query: Box::new(query),
        }
    }

    /// `column = (sub-select)`.
    pub fn eq_subquery(&self, query: SelectStatement) -> Filter {
        self.compare_subquery(CompareOp::Eq, query)
    }

    /// Compare against another column.
    pub fn compare_column(&self, op: CompareOp, other: &ColumnPath) -> Filter {
        Filter::Columns {
            left: self.qualified(),
            op,
            right: other.qualified(),
        }
    }

    /// `column = other`.
    pub fn eq_column(&self, other: &ColumnPath) -> Filter {
        self.compare_column(CompareOp::Eq, other)
    }

    /// Ascending order on this column.
    pub fn asc(&self) -> OrderByField {
        OrderByField::asc(self.qualified())
    }

    /// Descending order on this column.
    pub fn desc(&self) -> OrderByField {
        OrderByField::desc(self.qualified())
    }

    /// `COUNT(column)`.
    pub fn count(&self) -> Expr {
        Expr::count(self.expr())
    }

    /// `COUNT(DISTINCT column)`.
    pub fn count_distinct(&self) -> Expr {
        Expr::count_distinct(self.expr())
    }

    /// `MIN(column)`.
    pub fn min(&self) -> Expr {
        Expr::min(self.expr())
    }

    /// `MAX(column)`.
    pub fn max(&self) -> Expr {
        Expr::max(self.expr())
    }
}

/// A string column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringPath(ColumnPath);

impl StringPath {
    /// Create a string column path.
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self(ColumnPath::new(alias, column))
    }

    /// `column LIKE %value%`.
    pub fn contains(&self, value: impl Into<String>) -> Filter {
        Filter::Contains(self.qualified(), Value::String(value.into()))
    }

    /// `column LIKE value%`.
    pub fn starts_with(&self, value: impl Into<String>) -> Filter {
        Filter::StartsWith(self.qualified(), Value::String(value.into()))
    }

    /// `column LIKE %value`.
    pub fn ends_with(&self, value: impl Into<String>) -> Filter {
        Filter::EndsWith(self.qualified(), Value::String(value.into()))
    }
}

impl Deref for StringPath {
    type Target = ColumnPath;

    fn deref(&self) -> &ColumnPath {
        &self.0
    }
}

/// A numeric column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NumberPath(ColumnPath);

impl NumberPath {
    /// Create a numeric column path.
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self(ColumnPath::new(alias, column))
    }

    /// `column > value`.
    pub fn gt(&self, value: impl Into<Value>) -> Filter {
        Filter::Gt(self.qualified(), value.into())
    }

    /// `column >= value`.
    pub fn gte(&self, value: impl Into<Value>) -> Filter {
        Filter::Gte(self.qualified(), value.into())
    }

    /// `column < value`.
    pub fn lt(&self, value: impl Into<Value>) -> Filter {
        Filter::Lt(self.qualified(), value.into())
    }

    /// `column <= value`.
    pub fn lte(&self, value: impl Into<Value>) -> Filter {
        Filter::Lte(self.qualified(), value.into())
    }

    /// `low <= column AND column <= high`.
    pub fn between(&self, low: impl Into<Value>, high: impl Into<Value>) -> Filter {
        Filter::and([self.gte(low), self.lte(high)])
    }

    /// `column > (sub-select)`.
    pub fn gt_subquery(&self, query: SelectStatement) -> Filter {
        self.compare_subquery(CompareOp::Gt, query)
    }

    /// `column >= (sub-select)`.
    pub fn gte_subquery(&self, query: SelectStatement) -> Filter {
        self.compare_subquery(CompareOp::Gte, query)
    }

    /// `column < (sub-select)`.
    pub fn lt_subquery(&self, query: SelectStatement) -> Filter {
        self.compare_subquery(CompareOp::Lt, query)
    }

    /// `column <= (sub-select)`.
    pub fn lte_subquery(&self, query: SelectStatement) -> Filter {
        self.compare_subquery(CompareOp::Lte, query)
    }

    /// `SUM(column)`.
    pub fn sum(&self) -> Expr {
        Expr::sum(self.expr())
    }

    /// `AVG(column)`.
    pub fn avg(&self) -> Expr {
        Expr::avg(self.expr())
    }

    /// `column + value`, for bulk updates.
    pub fn plus(&self, value: impl Into<Value>) -> Expr {
        self.expr().plus(Expr::Value(value.into()))
    }
}

impl Deref for NumberPath {
    type Target = ColumnPath;

    fn deref(&self) -> &ColumnPath {
        &self.0
    }
}

impl From<ColumnPath> for Expr {
    fn from(path: ColumnPath) -> Self {
        path.expr()
    }
}

impl From<&ColumnPath> for Expr {
    fn from(path: &ColumnPath) -> Self {
        path.expr()
    }
}

impl From<StringPath> for Expr {
    fn from(path: StringPath) -> Self {
        path.expr()
    }
}

impl From<&StringPath> for Expr {
    fn from(path: &StringPath) -> Self {
        path.expr()
    }
}

impl From<NumberPath> for Expr {
    fn from(path: NumberPath) -> Self {
        path.expr()
    }
}

impl From<&NumberPath> for Expr {
    fn from(path: &NumberPath) -> Self {
        path.expr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::DatabaseType;

    struct Player {
        alias: String,
    }

    impl EntityPath for Player {
        fn table(&self) -> &str {
            "player"
        }

        fn alias(&self) -> &str {
            &self.alias
        }

        fn columns(&self) -> &[&'static str] {
            &["id", "name", "club_id"]
        }
    }

    #[test]
    fn test_entity_path_defaults() {
        let player = Player { alias: "p".into() };
        assert_eq!(player.primary_key(), "id");
        assert_eq!(player.table_ref(), TableRef::new("player", "p"));
        assert_eq!(player.column("name").qualified(), "p.name");
        assert_eq!(
            player.relation("club", "club_id", "id"),
            RelationPath {
                name: "club".into(),
                local: "p.club_id".into(),
                target_key: "id".into(),
            }
        );
        assert_eq!(player.all().label(), "p");
    }

    #[test]
    fn test_string_predicates() {
        let name = StringPath::new("p", "name");
        assert_eq!(name.equals("a"), Filter::Equals("p.name".into(), "a".into()));
        assert_eq!(name.starts_with("a"), Filter::StartsWith("p.name".into(), "a".into()));
        assert_eq!(name.is_null(), Filter::IsNull("p.name".into()));
        assert_eq!(
            name.in_list(["a", "b"]),
            Filter::In("p.name".into(), vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_number_predicates() {
        let age = NumberPath::new("p", "age");
        let (sql, params) = age.between(10, 20).to_sql(DatabaseType::PostgreSQL);
        assert_eq!(sql, "(p.age >= $1 AND p.age <= $2)");
        assert_eq!(params, vec![Value::Int(10), Value::Int(20)]);
        assert_eq!(age.plus(1).label(), "p.age + 1");
        assert_eq!(age.avg().label(), "AVG(p.age)");
    }

    #[test]
    fn test_subquery_predicate() {
        let age = NumberPath::new("p", "age");
        let sub = SelectStatement::new(TableRef::new("player", "sub"));
        match age.gte_subquery(sub) {
            Filter::Subquery { column, op, .. } => {
                assert_eq!(column, "p.age");
                assert_eq!(op, CompareOp::Gte);
            }
            other => panic!("unexpected filter {:?}", other),
        }
    }
}
