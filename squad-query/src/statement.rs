//! Fully built statements.
//!
//! Operations accumulate their clauses into these plain structs, which are
//! then rendered to SQL with a [`SqlBuilder`] or handed to a
//! [`QueryEngine`](crate::traits::QueryEngine) for execution.

use crate::expr::Expr;
use crate::filter::{Filter, Value};
use crate::pagination::Pagination;
use crate::sql::{DatabaseType, SqlBuilder};
use crate::types::OrderBy;

/// A table together with the alias it is queried under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Table name.
    pub table: String,
    /// Alias used to qualify its columns.
    pub alias: String,
}

impl TableRef {
    /// Create a table reference.
    pub fn new(table: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
        }
    }

    /// Qualify a column with this alias.
    pub fn qualify(&self, column: &str) -> String {
        format!("{}.{}", self.alias, column)
    }

    fn write_sql(&self, b: &mut SqlBuilder) {
        b.push_table(&self.table, &self.alias);
    }
}

/// What a select produces per result row.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Projection {
    /// The root entity's columns (unqualified labels), plus every
    /// fetch-joined relation under `relation.column` labels.
    #[default]
    Root,
    /// An explicit list of expressions, labelled by [`Expr::label`].
    Exprs(Vec<Expr>),
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// Rows without a partner are dropped.
    Inner,
    /// Rows without a partner are kept, padded with nulls.
    Left,
}

impl JoinKind {
    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

/// The key pair linking a join to its owner through a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinLink {
    /// Relation name, used as the label prefix when fetched.
    pub relation: String,
    /// Qualified foreign key on the owning side.
    pub local: String,
    /// Qualified key on the joined side.
    pub foreign: String,
}

/// One joined table.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    /// Inner or left.
    pub kind: JoinKind,
    /// The joined table.
    pub table: TableRef,
    /// Relation keys, absent for a join on an arbitrary condition.
    pub link: Option<JoinLink>,
    /// Extra ON condition.
    pub on: Filter,
    /// Whether the joined entity is loaded into root projections.
    pub fetch: bool,
}

impl Join {
    fn write_sql(&self, b: &mut SqlBuilder) {
        b.push(" ").push(self.kind.as_sql()).push(" ");
        self.table.write_sql(b);
        b.push(" ON ");
        match &self.link {
            Some(link) => {
                b.push_path(&link.local).push(" = ").push_path(&link.foreign);
                if !self.on.is_none() {
                    b.push(" AND ");
                    self.on.write_sql(b);
                }
            }
            None => self.on.write_sql(b),
        }
    }
}

/// A select statement.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Result shape.
    pub projection: Projection,
    /// Root table.
    pub from: TableRef,
    /// Joined tables, in join order.
    pub joins: Vec<Join>,
    /// WHERE condition; `Filter::None` renders no WHERE clause.
    pub filter: Filter,
    /// GROUP BY expressions.
    pub group_by: Vec<Expr>,
    /// ORDER BY fields.
    pub order_by: OrderBy,
    /// LIMIT/OFFSET.
    pub pagination: Pagination,
}

impl SelectStatement {
    /// A select of the root entity from `from`.
    pub fn new(from: TableRef) -> Self {
        Self {
            projection: Projection::Root,
            from,
            joins: Vec::new(),
            filter: Filter::None,
            group_by: Vec::new(),
            order_by: OrderBy::none(),
            pagination: Pagination::new(),
        }
    }

    /// Whether the select aggregates (explicit group by, or aggregate
    /// expressions in the projection).
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
            || matches!(&self.projection, Projection::Exprs(exprs) if exprs.iter().any(Expr::is_aggregate))
    }

    /// Render to SQL with dialect placeholders.
    pub fn to_sql(&self, db_type: DatabaseType) -> (String, Vec<Value>) {
        let mut builder = SqlBuilder::new(db_type);
        self.write_sql(&mut builder);
        builder.build()
    }

    /// Write the statement into a builder.
    pub fn write_sql(&self, b: &mut SqlBuilder) {
        b.push("SELECT ");
        match &self.projection {
            Projection::Root => {
                b.push_identifier(&self.from.alias).push(".*");
                for join in self.joins.iter().filter(|j| j.fetch) {
                    b.push(", ").push_identifier(&join.table.alias).push(".*");
                }
            }
            Projection::Exprs(exprs) => {
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        b.push(", ");
                    }
                    expr.write_sql(b);
                }
            }
        }

        b.push(" FROM ");
        self.from.write_sql(b);
        for join in &self.joins {
            join.write_sql(b);
        }

        if !self.filter.is_none() {
            b.push(" WHERE ");
            self.filter.write_sql(b);
        }

        if !self.group_by.is_empty() {
            b.push(" GROUP BY ");
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    b.push(", ");
                }
                expr.write_sql(b);
            }
        }

        if !self.order_by.is_empty() {
            b.push(" ORDER BY ").push(self.order_by.to_sql());
        }

        if !self.pagination.is_empty() {
            b.push(" ").push(self.pagination.to_sql());
        }
    }
}

/// A bulk update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Target table.
    pub table: TableRef,
    /// `column = expr` pairs; columns are unqualified.
    pub assignments: Vec<(String, Expr)>,
    /// Rows to update; `Filter::None` updates every row.
    pub filter: Filter,
}

impl UpdateStatement {
    /// An update of `table` with no assignments yet.
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            filter: Filter::None,
        }
    }

    /// Render to SQL with dialect placeholders.
    pub fn to_sql(&self, db_type: DatabaseType) -> (String, Vec<Value>) {
        let mut b = SqlBuilder::new(db_type);
        b.push("UPDATE ");
        self.table.write_sql(&mut b);
        b.push(" SET ");
        for (i, (column, expr)) in self.assignments.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.push_identifier(column).push(" = ");
            expr.write_sql(&mut b);
        }
        if !self.filter.is_none() {
            b.push(" WHERE ");
            self.filter.write_sql(&mut b);
        }
        b.build()
    }
}

/// A bulk delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table.
    pub table: TableRef,
    /// Rows to delete; `Filter::None` deletes every row.
    pub filter: Filter,
}

impl DeleteStatement {
    /// A delete of every row in `table`.
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            filter: Filter::None,
        }
    }

    /// Render to SQL with dialect placeholders.
    pub fn to_sql(&self, db_type: DatabaseType) -> (String, Vec<Value>) {
        let mut b = SqlBuilder::new(db_type);
        b.push("DELETE FROM ");
        self.table.write_sql(&mut b);
        if !self.filter.is_none() {
            b.push(" WHERE ");
            self.filter.write_sql(&mut b);
        }
        b.build()
    }
}

/// A single-row insert.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table.
    pub table: String,
    /// Primary key column, generated by the engine.
    pub primary_key: String,
    /// Column values, excluding the primary key.
    pub values: Vec<(String, Value)>,
}

impl InsertStatement {
    /// An insert into `table`.
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        values: impl IntoIterator<Item = (impl Into<String>, Value)>,
    ) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            values: values.into_iter().map(|(c, v)| (c.into(), v)).collect(),
        }
    }

    /// Render to SQL with dialect placeholders.
    pub fn to_sql(&self, db_type: DatabaseType) -> (String, Vec<Value>) {
        let mut b = SqlBuilder::new(db_type);
        b.push("INSERT INTO ").push_identifier(&self.table).push(" (");
        for (i, (column, _)) in self.values.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.push_identifier(column);
        }
        b.push(") VALUES (");
        for (i, (_, value)) in self.values.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.push_param(value.clone());
        }
        b.push(") RETURNING ").push_identifier(&self.primary_key);
        b.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderByField;
    use pretty_assertions::assert_eq;

    fn member() -> TableRef {
        TableRef::new("member", "member1")
    }

    fn team_join(kind: JoinKind) -> Join {
        Join {
            kind,
            table: TableRef::new("team", "team"),
            link: Some(JoinLink {
                relation: "team".into(),
                local: "member1.team_id".into(),
                foreign: "team.id".into(),
            }),
            on: Filter::None,
            fetch: false,
        }
    }

    #[test]
    fn test_select_root_without_where() {
        let (sql, params) = SelectStatement::new(member()).to_sql(DatabaseType::PostgreSQL);
        assert_eq!(sql, "SELECT member1.* FROM member member1");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_full() {
        let mut join = team_join(JoinKind::Left);
        join.on = Filter::Equals("team.name".into(), "teamA".into());
        join.fetch = true;

        let mut statement = SelectStatement::new(member());
        statement.joins.push(join);
        statement.filter = Filter::Gte("member1.age".into(), Value::Int(20));
        statement.order_by = OrderByField::desc("member1.age").into();
        statement.pagination = Pagination::new().skip(1).take(2);

        let (sql, params) = statement.to_sql(DatabaseType::PostgreSQL);
        assert_eq!(
            sql,
            "SELECT member1.*, team.* FROM member member1 \
             LEFT JOIN team ON member1.team_id = team.id AND team.name = $1 \
             WHERE member1.age >= $2 ORDER BY member1.age DESC LIMIT 2 OFFSET 1"
        );
        assert_eq!(params, vec![Value::from("teamA"), Value::Int(20)]);
    }

    #[test]
    fn test_select_grouped() {
        let mut statement = SelectStatement::new(member());
        statement.joins.push(team_join(JoinKind::Inner));
        statement.projection = Projection::Exprs(vec![
            Expr::column("team.name"),
            Expr::avg("member1.age"),
        ]);
        statement.group_by = vec![Expr::column("team.name")];
        assert!(statement.is_grouped());

        let (sql, _) = statement.to_sql(DatabaseType::MySQL);
        assert_eq!(
            sql,
            "SELECT team.name, AVG(member1.age) FROM member member1 \
             INNER JOIN team ON member1.team_id = team.id GROUP BY team.name"
        );
    }

    #[test]
    fn test_select_with_subquery_shares_params() {
        let mut sub = SelectStatement::new(TableRef::new("member", "memberSub"));
        sub.projection = Projection::Exprs(vec![Expr::avg("memberSub.age")]);
        sub.filter = Filter::Gt("memberSub.age".into(), Value::Int(10));

        let mut statement = SelectStatement::new(member());
        statement.filter = Filter::and([
            Filter::NotEquals("member1.username".into(), "x".into()),
            Filter::Subquery {
                column: "member1.age".into(),
                op: crate::filter::CompareOp::Gte,
                query: Box::new(sub),
            },
        ]);

        let (sql, params) = statement.to_sql(DatabaseType::PostgreSQL);
        assert_eq!(
            sql,
            "SELECT member1.* FROM member member1 WHERE (member1.username <> $1 AND \
             member1.age >= (SELECT AVG(memberSub.age) FROM member memberSub WHERE memberSub.age > $2))"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_update_sql() {
        let mut statement = UpdateStatement::new(member());
        statement
            .assignments
            .push(("age".into(), Expr::column("member1.age").plus(Expr::value(1))));
        let (sql, params) = statement.to_sql(DatabaseType::PostgreSQL);
        assert_eq!(sql, "UPDATE member member1 SET age = member1.age + $1");
        assert_eq!(params, vec![Value::Int(1)]);
    }

    #[test]
    fn test_delete_sql() {
        let mut statement = DeleteStatement::new(member());
        statement.filter = Filter::Gt("member1.age".into(), Value::Int(18));
        let (sql, _) = statement.to_sql(DatabaseType::SQLite);
        assert_eq!(sql, "DELETE FROM member member1 WHERE member1.age > ?");
    }

    #[test]
    fn test_insert_sql() {
        let statement = InsertStatement::new("team", "id", [("name", Value::from("teamA"))]);
        let (sql, params) = statement.to_sql(DatabaseType::PostgreSQL);
        assert_eq!(sql, "INSERT INTO team (name) VALUES ($1) RETURNING id");
        assert_eq!(params, vec![Value::from("teamA")]);
    }
}
