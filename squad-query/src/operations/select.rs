//! Select operation for entities, tuples and aggregates.

use crate::compose;
use crate::config::QuerySettings;
use crate::error::{QueryError, QueryResult};
use crate::expr::Expr;
use crate::filter::{Filter, Value};
use crate::pagination::{Page, Pagination};
use crate::path::{EntityPath, RelationPath};
use crate::record::{FromRecord, Record};
use crate::statement::{Join, JoinKind, JoinLink, Projection, SelectStatement, TableRef};
use crate::traits::QueryEngine;
use crate::types::{OrderBy, OrderByField};

/// A select operation.
///
/// Builder methods are available without an engine so sub-selects can be
/// assembled with [`sub_select`]; the terminal `fetch*` methods need one.
///
/// # Example
///
/// ```rust,ignore
/// let members = query
///     .select_from(&member)
///     .join(member.team(), &team)
///     .r#where(team.name().equals("teamA"))
///     .order_by(member.age().desc())
///     .fetch()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct SelectOperation<E> {
    engine: E,
    settings: QuerySettings,
    statement: SelectStatement,
    primary_key: String,
    misuse: Option<String>,
}

/// A select without an engine, used as a scalar sub-select.
pub type SubSelect = SelectOperation<()>;

/// Start a sub-select projecting `exprs`.
///
/// ```rust
/// use squad_query::operations::sub_select;
/// use squad_query::path::NumberPath;
/// use squad_query::statement::TableRef;
///
/// let age = NumberPath::new("memberSub", "age");
/// let statement = sub_select([age.max()])
///     .from_table(TableRef::new("member", "memberSub"), "id")
///     .into_statement();
/// assert_eq!(
///     statement.to_sql(Default::default()).0,
///     "SELECT MAX(memberSub.age) FROM member memberSub"
/// );
/// ```
pub fn sub_select(exprs: impl IntoIterator<Item = impl Into<Expr>>) -> SelectFrom<()> {
    SelectFrom::new((), QuerySettings::default(), exprs)
}

/// A projection waiting for its root entity.
#[derive(Debug, Clone)]
pub struct SelectFrom<E> {
    engine: E,
    settings: QuerySettings,
    exprs: Vec<Expr>,
}

impl<E> SelectFrom<E> {
    pub(crate) fn new(
        engine: E,
        settings: QuerySettings,
        exprs: impl IntoIterator<Item = impl Into<Expr>>,
    ) -> Self {
        Self {
            engine,
            settings,
            exprs: exprs.into_iter().map(Into::into).collect(),
        }
    }

    /// Select from the given entity.
    #[allow(clippy::should_implement_trait)]
    pub fn from(self, path: &impl EntityPath) -> SelectOperation<E> {
        self.from_table(path.table_ref(), path.primary_key())
    }

    /// Select from a table reference with its primary key column.
    pub fn from_table(self, table: TableRef, primary_key: &str) -> SelectOperation<E> {
        let mut operation = SelectOperation::new(self.engine, self.settings, table, primary_key);
        operation.statement.projection = Projection::Exprs(self.exprs);
        operation
    }
}

impl<E> SelectOperation<E> {
    pub(crate) fn new(
        engine: E,
        settings: QuerySettings,
        from: TableRef,
        primary_key: &str,
    ) -> Self {
        Self {
            engine,
            settings,
            statement: SelectStatement::new(from),
            primary_key: primary_key.to_string(),
            misuse: None,
        }
    }

    fn push_join(
        mut self,
        kind: JoinKind,
        relation: Option<RelationPath>,
        target: &impl EntityPath,
    ) -> Self {
        let table = target.table_ref();
        let link = relation.map(|relation| JoinLink {
            foreign: table.qualify(&relation.target_key),
            relation: relation.name,
            local: relation.local,
        });
        self.statement.joins.push(Join {
            kind,
            table,
            link,
            on: Filter::None,
            fetch: false,
        });
        self
    }

    fn last_join(&mut self, method: &str) -> Option<&mut Join> {
        if self.statement.joins.is_empty() && self.misuse.is_none() {
            self.misuse = Some(format!("{}() must follow a join", method));
        }
        self.statement.joins.last_mut()
    }

    /// Inner join a to-one relation onto `target`.
    pub fn join(self, relation: RelationPath, target: &impl EntityPath) -> Self {
        self.push_join(JoinKind::Inner, Some(relation), target)
    }

    /// Left join a to-one relation onto `target`.
    pub fn left_join(self, relation: RelationPath, target: &impl EntityPath) -> Self {
        self.push_join(JoinKind::Left, Some(relation), target)
    }

    /// Inner join `target` on the condition given by a following [`on`](Self::on).
    pub fn join_on(self, target: &impl EntityPath) -> Self {
        self.push_join(JoinKind::Inner, None, target)
    }

    /// Left join `target` on the condition given by a following [`on`](Self::on).
    pub fn left_join_on(self, target: &impl EntityPath) -> Self {
        self.push_join(JoinKind::Left, None, target)
    }

    /// Add a condition to the most recent join.
    pub fn on(mut self, filter: impl Into<Filter>) -> Self {
        let filter = filter.into();
        if let Some(join) = self.last_join("on") {
            join.on = std::mem::take(&mut join.on).and_then(filter);
        }
        self
    }

    /// Load the most recently joined entity into root projections.
    pub fn fetch_join(mut self) -> Self {
        if let Some(join) = self.last_join("fetch_join") {
            join.fetch = true;
        }
        self
    }

    /// Add a filter condition. `None` adds nothing.
    pub fn r#where(mut self, filter: impl Into<Option<Filter>>) -> Self {
        if let Some(filter) = filter.into() {
            self.statement.filter = std::mem::take(&mut self.statement.filter).and_then(filter);
        }
        self
    }

    /// Add several optional conditions, skipping absent ones.
    pub fn where_all(self, filters: impl IntoIterator<Item = Option<Filter>>) -> Self {
        self.r#where(compose::all_of(filters))
    }

    /// Group by the given expressions.
    pub fn group_by(mut self, exprs: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.statement
            .group_by
            .extend(exprs.into_iter().map(Into::into));
        self
    }

    /// Append ordering fields after any already given.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        let order: OrderBy = order.into();
        self.statement.order_by.extend(order);
        self
    }

    /// Append a single ordering field.
    pub fn then_by(self, field: OrderByField) -> Self {
        self.order_by(field)
    }

    /// Skip a number of records.
    pub fn offset(mut self, n: u64) -> Self {
        self.statement.pagination = self.statement.pagination.skip(n);
        self
    }

    /// Take a limited number of records.
    pub fn limit(mut self, n: u64) -> Self {
        self.statement.pagination = self.statement.pagination.take(n);
        self
    }

    /// Replace skip/take wholesale.
    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.statement.pagination = pagination;
        self
    }

    /// The statement as it will be executed, with the configured row cap
    /// applied when no limit was set.
    pub fn statement(&self) -> SelectStatement {
        let mut statement = self.statement.clone();
        if statement.pagination.take.is_none() {
            if let Some(max_rows) = self.settings.max_rows {
                statement.pagination = statement.pagination.take(max_rows);
            }
        }
        statement
    }

    /// Finish as a statement, for use as a sub-select.
    pub fn into_statement(self) -> SelectStatement {
        self.statement
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<Value>) {
        self.statement().to_sql(self.settings.dialect)
    }

    fn check(&mut self) -> QueryResult<()> {
        match self.misuse.take() {
            Some(message) => Err(QueryError::invalid_select(message)
                .with_model(self.statement.from.table.as_str())),
            None => Ok(()),
        }
    }
}

impl<E: QueryEngine> SelectOperation<E> {
    async fn execute(mut self) -> QueryResult<Vec<Record>> {
        self.check()?;
        let statement = self.statement();
        let rendered = statement.to_sql(self.settings.dialect);
        super::run(&self.settings, "select", rendered, self.engine.select(statement)).await
    }

    /// Execute and return every record.
    pub async fn fetch(self) -> QueryResult<Vec<Record>> {
        self.execute().await
    }

    /// Execute expecting at most one record.
    ///
    /// Returns `Ok(None)` when nothing matches and a `NotUnique` error when
    /// more than one record does.
    pub async fn fetch_one(self) -> QueryResult<Option<Record>> {
        let table = self.statement.from.table.clone();
        let mut records = self.execute().await?;
        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            n => Err(QueryError::not_unique(table, n)),
        }
    }

    /// Execute with a limit of one and return the record, if any.
    pub async fn fetch_first(self) -> QueryResult<Option<Record>> {
        let mut records = self.limit(1).execute().await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    /// Count the matching rows, ignoring ordering and pagination.
    ///
    /// A grouped select counts its groups.
    pub async fn fetch_count(mut self) -> QueryResult<u64> {
        self.statement.order_by = OrderBy::none();
        self.statement.pagination = Pagination::new();
        self.settings.max_rows = None;

        if self.statement.is_grouped() {
            return Ok(self.execute().await?.len() as u64);
        }

        let count = Expr::count(self.statement.from.qualify(&self.primary_key));
        self.statement.projection = Projection::Exprs(vec![count.clone()]);
        let records = self.execute().await?;
        match records.first() {
            Some(record) => record.get_expr::<u64>(&count),
            None => Ok(0),
        }
    }

    /// Execute one page together with the total count of matching rows.
    pub async fn fetch_page(self) -> QueryResult<Page<Record>> {
        let pagination = self.statement().pagination;
        let total = self.clone().fetch_count().await?;
        let items = self.execute().await?;
        Ok(Page::new(items, total, pagination))
    }

    /// Execute and map every record.
    pub async fn fetch_as<T: FromRecord>(self) -> QueryResult<Vec<T>> {
        self.execute()
            .await?
            .iter()
            .map(T::from_record)
            .collect()
    }

    /// Execute expecting at most one record, mapped.
    pub async fn fetch_one_as<T: FromRecord>(self) -> QueryResult<Option<T>> {
        self.fetch_one()
            .await?
            .as_ref()
            .map(T::from_record)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::testing::{Executed, RecordingEngine};
    use crate::path::{NumberPath, StringPath};

    struct Member(&'static str);

    impl EntityPath for Member {
        fn table(&self) -> &str {
            "member"
        }

        fn alias(&self) -> &str {
            self.0
        }

        fn columns(&self) -> &[&'static str] {
            &["id", "username", "age", "team_id"]
        }
    }

    struct Team;

    impl EntityPath for Team {
        fn table(&self) -> &str {
            "team"
        }

        fn alias(&self) -> &str {
            "team"
        }

        fn columns(&self) -> &[&'static str] {
            &["id", "name"]
        }
    }

    fn select(engine: RecordingEngine, settings: QuerySettings) -> SelectOperation<RecordingEngine> {
        SelectOperation::new(engine, settings, Member("m").table_ref(), "id")
    }

    fn record(age: i64) -> Record {
        let mut record = Record::new();
        record.insert("age", age);
        record
    }

    #[test]
    fn test_no_where_clause_when_filter_absent() {
        let op = select(RecordingEngine::default(), QuerySettings::default())
            .r#where(None)
            .where_all([None, None]);
        assert_eq!(op.build_sql().0, "SELECT m.* FROM member m");
    }

    #[test]
    fn test_where_all_and_chained_where() {
        let age = NumberPath::new("m", "age");
        let name = StringPath::new("m", "username");
        let op = select(RecordingEngine::default(), QuerySettings::default())
            .where_all([Some(name.equals("member1")), None, Some(age.equals(10))])
            .r#where(age.lt(99));
        let (sql, params) = op.build_sql();
        assert_eq!(
            sql,
            "SELECT m.* FROM member m WHERE (m.username = $1 AND m.age = $2 AND m.age < $3)"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_join_on_and_fetch_join() {
        let member = Member("m");
        let relation = member.relation("team", "team_id", "id");
        let op = select(RecordingEngine::default(), QuerySettings::default())
            .left_join(relation, &Team)
            .on(Team.string("name").equals("teamA"))
            .fetch_join();
        assert_eq!(
            op.build_sql().0,
            "SELECT m.*, team.* FROM member m LEFT JOIN team ON m.team_id = team.id AND team.name = $1"
        );
    }

    #[tokio::test]
    async fn test_on_without_join_is_an_error() {
        let err = select(RecordingEngine::default(), QuerySettings::default())
            .on(Filter::IsNull("team.name".into()))
            .fetch()
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InvalidSelect);
    }

    #[test]
    fn test_order_by_appends() {
        let age = NumberPath::new("m", "age");
        let name = StringPath::new("m", "username");
        let op = select(RecordingEngine::default(), QuerySettings::default())
            .order_by(age.desc())
            .then_by(name.asc().nulls_last())
            .offset(1)
            .limit(2);
        assert_eq!(
            op.build_sql().0,
            "SELECT m.* FROM member m ORDER BY m.age DESC, m.username ASC NULLS LAST LIMIT 2 OFFSET 1"
        );
    }

    #[test]
    fn test_max_rows_applies_only_without_limit() {
        let settings = QuerySettings {
            max_rows: Some(100),
            ..QuerySettings::default()
        };
        let op = select(RecordingEngine::default(), settings);
        assert_eq!(op.build_sql().0, "SELECT m.* FROM member m LIMIT 100");
        assert_eq!(op.limit(5).build_sql().0, "SELECT m.* FROM member m LIMIT 5");
    }

    #[tokio::test]
    async fn test_fetch_one_not_unique() {
        let engine = RecordingEngine::returning(vec![record(1), record(2)]);
        let err = select(engine, QuerySettings::default())
            .fetch_one()
            .await
            .unwrap_err();
        assert!(err.is_not_unique());
    }

    #[tokio::test]
    async fn test_fetch_first_sets_limit() {
        let engine = RecordingEngine::returning(vec![record(1)]);
        let first = select(engine.clone(), QuerySettings::default())
            .fetch_first()
            .await
            .unwrap();
        assert_eq!(first.unwrap().get::<i64>("age").unwrap(), 1);
        match engine.last() {
            Some(Executed::Select(statement)) => assert_eq!(statement.pagination.take, Some(1)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_count_projects_count() {
        let mut counted = Record::new();
        counted.insert("COUNT(m.id)", 4);
        let engine = RecordingEngine::returning(vec![counted]);
        let total = select(engine.clone(), QuerySettings::default())
            .order_by(NumberPath::new("m", "age").desc())
            .limit(2)
            .fetch_count()
            .await
            .unwrap();
        assert_eq!(total, 4);
        match engine.last() {
            Some(Executed::Select(statement)) => {
                assert!(statement.order_by.is_empty());
                assert!(statement.pagination.is_empty());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sub_select_statement() {
        let age = NumberPath::new("sub", "age");
        let statement = sub_select([age.avg()]).from(&Member("sub")).into_statement();
        assert_eq!(statement.projection, Projection::Exprs(vec![Expr::avg("sub.age")]));
        assert!(statement.filter.is_none());
    }
}
