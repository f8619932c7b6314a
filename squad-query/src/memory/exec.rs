//! Statement evaluation over the in-memory store.

use std::cmp::Ordering;

use indexmap::IndexMap;

use super::{Store, StoredRow, Table};
use crate::error::{QueryError, QueryResult};
use crate::expr::Expr;
use crate::filter::{Filter, Value};
use crate::record::Record;
use crate::squad_trace;
use crate::statement::{
    DeleteStatement, Join, JoinKind, Projection, SelectStatement, TableRef, UpdateStatement,
};
use crate::traits::Row;
use crate::types::OrderBy;

/// A working row: qualified `alias.column` to value.
type Joined = IndexMap<String, Value>;

pub(super) fn select(store: &Store, statement: &SelectStatement) -> QueryResult<Vec<Record>> {
    check_columns(store, statement)?;
    let mut scalar = |sub: &SelectStatement| scalar_subquery(store, sub);

    let filter = statement.filter.clone().resolve_subqueries(&mut scalar)?;
    let projection = match &statement.projection {
        Projection::Root => Projection::Root,
        Projection::Exprs(exprs) => Projection::Exprs(
            exprs
                .iter()
                .cloned()
                .map(|e| e.resolve_subqueries(&mut scalar))
                .collect::<QueryResult<_>>()?,
        ),
    };
    let joins = statement
        .joins
        .iter()
        .map(|join| -> QueryResult<Join> {
            let mut join = join.clone();
            join.on = join.on.resolve_subqueries(&mut scalar)?;
            Ok(join)
        })
        .collect::<QueryResult<Vec<_>>>()?;

    let mut rows = scan(store.table(&statement.from.table)?, &statement.from);
    for join in &joins {
        rows = join_rows(store, rows, join)?;
    }

    let mut matched = Vec::with_capacity(rows.len());
    for row in rows {
        if filter.matches(&row)? {
            matched.push(row);
        }
    }
    squad_trace!(table = %statement.from.table, matched = matched.len(), "MemoryEngine filtered rows");

    let records = if statement.is_grouped() {
        let exprs = match &projection {
            Projection::Exprs(exprs) => exprs,
            Projection::Root => {
                return Err(QueryError::invalid_select(
                    "a grouped select needs an explicit projection",
                )
                .with_model(statement.from.table.as_str()));
            }
        };
        let mut records = group(matched, &statement.group_by, exprs)?;
        sort_records(&mut records, &statement.order_by)?;
        statement.pagination.apply(records)
    } else {
        sort_rows(&mut matched, &statement.order_by)?;
        let page = statement.pagination.apply(matched);
        page.iter()
            .map(|row| project(store, row, &statement.from, &joins, &projection))
            .collect::<QueryResult<Vec<_>>>()?
    };

    Ok(records)
}

/// Fail on filter columns that no table in the statement has, whether or
/// not there are rows to evaluate.
fn check_columns(store: &Store, statement: &SelectStatement) -> QueryResult<()> {
    let mut known = Vec::new();
    let tables = std::iter::once(&statement.from).chain(statement.joins.iter().map(|j| &j.table));
    for table_ref in tables {
        let table = store.table(&table_ref.table)?;
        known.extend(table.columns.iter().map(|c| table_ref.qualify(c)));
    }

    let filters = std::iter::once(&statement.filter).chain(statement.joins.iter().map(|j| &j.on));
    for filter in filters {
        if let Some(column) = filter
            .columns()
            .into_iter()
            .find(|c| !known.iter().any(|k| k == *c))
        {
            return Err(QueryError::unknown_column(column).with_model(statement.from.table.as_str()));
        }
    }
    Ok(())
}

/// Run a sub-select that must produce at most one row with one value.
fn scalar_subquery(store: &Store, statement: &SelectStatement) -> QueryResult<Value> {
    let records = select(store, statement)?;
    match records.len() {
        0 => Ok(Value::Null),
        1 => records[0]
            .iter()
            .next()
            .map(|(_, v)| v.clone())
            .ok_or_else(|| QueryError::invalid_select("sub-select projects no value")),
        n => Err(QueryError::not_unique(statement.from.table.as_str(), n)
            .with_help("A sub-select used as a value must return a single row")),
    }
}

fn qualify(table: &Table, alias: &str, row: &StoredRow) -> Joined {
    table
        .columns
        .iter()
        .map(|c| {
            let value = row.get(c).cloned().unwrap_or(Value::Null);
            (format!("{}.{}", alias, c), value)
        })
        .collect()
}

fn scan(table: &Table, from: &TableRef) -> Vec<Joined> {
    table
        .rows
        .iter()
        .map(|row| qualify(table, &from.alias, row))
        .collect()
}

fn join_rows(store: &Store, rows: Vec<Joined>, join: &Join) -> QueryResult<Vec<Joined>> {
    let table = store.table(&join.table.table)?;
    let candidates = scan(table, &join.table);

    if let Some(link) = &join.link {
        let key = link
            .foreign
            .rsplit('.')
            .next()
            .unwrap_or(link.foreign.as_str());
        if !table.has_column(key) {
            return Err(QueryError::unknown_column(link.foreign.as_str())
                .with_model(join.table.table.as_str()));
        }
    }

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut found = false;
        for candidate in &candidates {
            let mut combined = row.clone();
            combined.extend(candidate.iter().map(|(k, v)| (k.clone(), v.clone())));

            let linked = match &join.link {
                Some(link) => {
                    let local = combined
                        .value(&link.local)
                        .ok_or_else(|| QueryError::unknown_column(link.local.as_str()))?;
                    let foreign = combined
                        .value(&link.foreign)
                        .ok_or_else(|| QueryError::unknown_column(link.foreign.as_str()))?;
                    local.sql_eq(foreign).unwrap_or(false)
                }
                None => true,
            };

            if linked && join.on.matches(&combined)? {
                found = true;
                out.push(combined);
            }
        }

        if !found && join.kind == JoinKind::Left {
            let mut padded = row;
            for column in &table.columns {
                padded.insert(join.table.qualify(column), Value::Null);
            }
            out.push(padded);
        }
    }
    Ok(out)
}

fn group(rows: Vec<Joined>, group_by: &[Expr], exprs: &[Expr]) -> QueryResult<Vec<Record>> {
    let mut groups: Vec<(Vec<Value>, Vec<Joined>)> = Vec::new();

    if group_by.is_empty() {
        groups.push((Vec::new(), rows));
    } else {
        for row in rows {
            let key = group_by
                .iter()
                .map(|e| e.eval(&row))
                .collect::<QueryResult<Vec<_>>>()?;
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(row),
                None => groups.push((key, vec![row])),
            }
        }
    }

    groups
        .iter()
        .map(|(_, members)| -> QueryResult<Record> {
            let mut record = Record::new();
            for expr in exprs {
                record.insert(expr.label(), eval_group(expr, members)?);
            }
            Ok(record)
        })
        .collect()
}

fn eval_group(expr: &Expr, rows: &[Joined]) -> QueryResult<Value> {
    match expr {
        Expr::Aggregate(func, inner) => {
            let values = rows
                .iter()
                .map(|row| inner.eval(row))
                .collect::<QueryResult<Vec<_>>>()?;
            func.apply(&values)
        }
        Expr::Add(a, b) => eval_group(a, rows)?.add(&eval_group(b, rows)?),
        Expr::Alias(inner, _) => eval_group(inner, rows),
        Expr::Value(value) => Ok(value.clone()),
        other => match rows.first() {
            Some(row) => other.eval(row),
            None => Ok(Value::Null),
        },
    }
}

fn compare_keys(order_by: &OrderBy, a: &[Value], b: &[Value]) -> Ordering {
    order_by
        .fields()
        .iter()
        .zip(a.iter().zip(b))
        .map(|(field, (x, y))| field.compare(x, y))
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn sort_rows(rows: &mut Vec<Joined>, order_by: &OrderBy) -> QueryResult<()> {
    if order_by.is_empty() {
        return Ok(());
    }

    let mut keyed = std::mem::take(rows)
        .into_iter()
        .map(|row| -> QueryResult<(Vec<Value>, Joined)> {
            let key = order_by
                .fields()
                .iter()
                .map(|f| {
                    row.value(&f.column)
                        .cloned()
                        .ok_or_else(|| QueryError::unknown_column(f.column.as_str()))
                })
                .collect::<QueryResult<Vec<_>>>()?;
            Ok((key, row))
        })
        .collect::<QueryResult<Vec<_>>>()?;

    keyed.sort_by(|(a, _), (b, _)| compare_keys(order_by, a, b));
    rows.extend(keyed.into_iter().map(|(_, row)| row));
    Ok(())
}

fn sort_records(records: &mut [Record], order_by: &OrderBy) -> QueryResult<()> {
    if order_by.is_empty() {
        return Ok(());
    }

    let mut keys = Vec::with_capacity(records.len());
    for record in records.iter() {
        let key = order_by
            .fields()
            .iter()
            .map(|f| record.find(&f.column).cloned())
            .collect::<QueryResult<Vec<_>>>()?;
        keys.push(key);
    }

    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by(|&i, &j| compare_keys(order_by, &keys[i], &keys[j]));
    let sorted: Vec<Record> = order.iter().map(|&i| records[i].clone()).collect();
    records.clone_from_slice(&sorted);
    Ok(())
}

fn project(
    store: &Store,
    row: &Joined,
    from: &TableRef,
    joins: &[Join],
    projection: &Projection,
) -> QueryResult<Record> {
    let mut record = Record::new();
    match projection {
        Projection::Root => {
            let root = store.table(&from.table)?;
            for column in &root.columns {
                record.insert(column.as_str(), lookup(row, &from.qualify(column))?);
            }
            for join in joins.iter().filter(|j| j.fetch) {
                let prefix = join
                    .link
                    .as_ref()
                    .map_or(join.table.alias.as_str(), |l| l.relation.as_str());
                let table = store.table(&join.table.table)?;
                for column in &table.columns {
                    record.insert(
                        format!("{}.{}", prefix, column),
                        lookup(row, &join.table.qualify(column))?,
                    );
                }
            }
        }
        Projection::Exprs(exprs) => {
            for expr in exprs {
                match expr {
                    Expr::Entity { alias, columns } => {
                        for column in columns {
                            let label = format!("{}.{}", alias, column);
                            let value = lookup(row, &label)?;
                            record.insert(label, value);
                        }
                    }
                    other => record.insert(other.label(), other.eval(row)?),
                }
            }
        }
    }
    Ok(record)
}

fn lookup(row: &Joined, column: &str) -> QueryResult<Value> {
    row.value(column)
        .cloned()
        .ok_or_else(|| QueryError::unknown_column(column))
}

/// Evaluate `filter` against each stored row of `table` under `alias`,
/// returning the indexes of matching rows.
fn matching(table: &Table, alias: &str, filter: &Filter) -> QueryResult<Vec<usize>> {
    let mut out = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        if filter.matches(&qualify(table, alias, row))? {
            out.push(i);
        }
    }
    Ok(out)
}

pub(super) fn update(store: &mut Store, statement: &UpdateStatement) -> QueryResult<u64> {
    let (filter, assignments) = {
        let mut scalar = |sub: &SelectStatement| scalar_subquery(store, sub);
        let filter = statement.filter.clone().resolve_subqueries(&mut scalar)?;
        let assignments = statement
            .assignments
            .iter()
            .map(|(c, e)| -> QueryResult<(String, Expr)> {
                Ok((c.clone(), e.clone().resolve_subqueries(&mut scalar)?))
            })
            .collect::<QueryResult<Vec<_>>>()?;
        (filter, assignments)
    };

    let alias = statement.table.alias.as_str();
    let table = store.table_mut(&statement.table.table)?;
    if let Some((column, _)) = assignments.iter().find(|(c, _)| !table.has_column(c)) {
        return Err(QueryError::unknown_column(column.as_str())
            .with_model(statement.table.table.as_str()));
    }

    let targets = matching(table, alias, &filter)?;
    let mut changes = Vec::with_capacity(targets.len());
    for &i in &targets {
        let current = qualify(table, alias, &table.rows[i]);
        let values = assignments
            .iter()
            .map(|(c, e)| -> QueryResult<(String, Value)> { Ok((c.clone(), e.eval(&current)?)) })
            .collect::<QueryResult<Vec<_>>>()?;
        changes.push((i, values));
    }

    for (i, values) in changes {
        for (column, value) in values {
            table.rows[i].insert(column, value);
        }
    }

    squad_trace!(table = %statement.table.table, updated = targets.len(), "MemoryEngine bulk update");
    Ok(targets.len() as u64)
}

pub(super) fn delete(store: &mut Store, statement: &DeleteStatement) -> QueryResult<u64> {
    let filter = {
        let mut scalar = |sub: &SelectStatement| scalar_subquery(store, sub);
        statement.filter.clone().resolve_subqueries(&mut scalar)?
    };

    let alias = statement.table.alias.as_str();
    let table = store.table_mut(&statement.table.table)?;
    let targets = matching(table, alias, &filter)?;

    let mut index = 0;
    table.rows.retain(|_| {
        let keep = !targets.contains(&index);
        index += 1;
        keep
    });

    squad_trace!(table = %statement.table.table, deleted = targets.len(), "MemoryEngine bulk delete");
    Ok(targets.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::AggregateFn;
    use crate::filter::CompareOp;
    use crate::memory::MemoryEngine;
    use crate::statement::{InsertStatement, JoinLink};
    use crate::types::OrderByField;

    fn seeded() -> MemoryEngine {
        let engine = MemoryEngine::new();
        engine.register_table("team", &["id", "name"]).unwrap();
        engine
            .register_table("member", &["id", "username", "age", "team_id"])
            .unwrap();
        for name in ["teamA", "teamB"] {
            engine
                .run_insert(&InsertStatement::new("team", "id", [("name", Value::from(name))]))
                .unwrap();
        }
        for (name, age, team) in [("member1", 10, 1), ("member2", 20, 1), ("member3", 30, 2), ("member4", 40, 2)] {
            engine
                .run_insert(&InsertStatement::new(
                    "member",
                    "id",
                    [
                        ("username", Value::from(name)),
                        ("age", Value::from(age)),
                        ("team_id", Value::from(team)),
                    ],
                ))
                .unwrap();
        }
        engine
    }

    fn member() -> TableRef {
        TableRef::new("member", "m")
    }

    fn team_join(kind: JoinKind) -> Join {
        Join {
            kind,
            table: TableRef::new("team", "t"),
            link: Some(JoinLink {
                relation: "team".into(),
                local: "m.team_id".into(),
                foreign: "t.id".into(),
            }),
            on: Filter::None,
            fetch: false,
        }
    }

    fn usernames(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.get::<String>("username").unwrap())
            .collect()
    }

    #[test]
    fn test_root_projection_and_order() {
        let engine = seeded();
        let mut statement = SelectStatement::new(member());
        statement.order_by = OrderByField::desc("m.age").into();
        let records = engine.run_select(&statement).unwrap();
        assert_eq!(usernames(&records), ["member4", "member3", "member2", "member1"]);
        assert_eq!(records[0].labels().collect::<Vec<_>>(), ["id", "username", "age", "team_id"]);
    }

    #[test]
    fn test_left_join_on_pads_nulls() {
        let engine = seeded();
        let mut join = team_join(JoinKind::Left);
        join.on = Filter::Equals("t.name".into(), "teamA".into());
        let mut statement = SelectStatement::new(member());
        statement.joins.push(join);
        statement.projection = Projection::Exprs(vec![Expr::column("m.username"), Expr::column("t.name")]);

        let records = engine.run_select(&statement).unwrap();
        let teams: Vec<Option<String>> = records
            .iter()
            .map(|r| r.get("t.name").unwrap())
            .collect();
        assert_eq!(
            teams,
            vec![Some("teamA".into()), Some("teamA".into()), None, None]
        );
    }

    #[test]
    fn test_fetch_join_labels() {
        let engine = seeded();
        let mut join = team_join(JoinKind::Inner);
        join.fetch = true;
        let mut statement = SelectStatement::new(member());
        statement.joins.push(join);
        statement.filter = Filter::Equals("m.username".into(), "member3".into());

        let records = engine.run_select(&statement).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get::<String>("team.name").unwrap(), "teamB");
    }

    #[test]
    fn test_group_by_first_appearance() {
        let engine = seeded();
        let mut statement = SelectStatement::new(member());
        statement.joins.push(team_join(JoinKind::Inner));
        statement.projection = Projection::Exprs(vec![Expr::column("t.name"), Expr::avg("m.age")]);
        statement.group_by = vec![Expr::column("t.name")];

        let records = engine.run_select(&statement).unwrap();
        let rows: Vec<(String, f64)> = records
            .iter()
            .map(|r| (r.get("t.name").unwrap(), r.get("AVG(m.age)").unwrap()))
            .collect();
        assert_eq!(rows, vec![("teamA".into(), 15.0), ("teamB".into(), 35.0)]);
    }

    #[test]
    fn test_aggregates_without_group_by() {
        let engine = seeded();
        let mut statement = SelectStatement::new(member());
        statement.projection = Projection::Exprs(vec![
            Expr::count("m.id"),
            Expr::aggregate(AggregateFn::Sum, "m.age"),
            Expr::max("m.age"),
        ]);
        let records = engine.run_select(&statement).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get::<i64>("COUNT(m.id)").unwrap(), 4);
        assert_eq!(records[0].get::<i64>("SUM(m.age)").unwrap(), 100);
        assert_eq!(records[0].get::<i64>("MAX(m.age)").unwrap(), 40);
    }

    #[test]
    fn test_subquery_filter() {
        let engine = seeded();
        let mut sub = SelectStatement::new(TableRef::new("member", "sub"));
        sub.projection = Projection::Exprs(vec![Expr::avg("sub.age")]);

        let mut statement = SelectStatement::new(member());
        statement.filter = Filter::Subquery {
            column: "m.age".into(),
            op: CompareOp::Gte,
            query: Box::new(sub),
        };
        let records = engine.run_select(&statement).unwrap();
        assert_eq!(usernames(&records), ["member3", "member4"]);
    }

    #[test]
    fn test_subquery_with_many_rows_is_not_unique() {
        let engine = seeded();
        let mut sub = SelectStatement::new(TableRef::new("member", "sub"));
        sub.projection = Projection::Exprs(vec![Expr::column("sub.age")]);
        let mut statement = SelectStatement::new(member());
        statement.filter = Filter::Subquery {
            column: "m.age".into(),
            op: CompareOp::Eq,
            query: Box::new(sub),
        };
        assert!(engine.run_select(&statement).unwrap_err().is_not_unique());
    }

    #[test]
    fn test_update_and_delete() {
        let engine = seeded();
        let mut update = UpdateStatement::new(member());
        update
            .assignments
            .push(("age".into(), Expr::column("m.age").plus(Expr::value(1))));
        assert_eq!(engine.run_update(&update).unwrap(), 4);

        let mut delete = DeleteStatement::new(member());
        delete.filter = Filter::Gt("m.age".into(), Value::Int(18));
        assert_eq!(engine.run_delete(&delete).unwrap(), 3);

        let rest = engine.rows("member").unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].get::<i64>("age").unwrap(), 11);
    }

    #[test]
    fn test_unknown_table_and_column() {
        let engine = seeded();
        let err = engine
            .run_select(&SelectStatement::new(TableRef::new("coach", "c")))
            .unwrap_err();
        assert!(err.is_schema_error());

        let mut statement = SelectStatement::new(member());
        statement.filter = Filter::Equals("m.height".into(), Value::Int(1));
        assert!(engine.run_select(&statement).unwrap_err().is_schema_error());

        let mut update = UpdateStatement::new(member());
        update.assignments.push(("height".into(), Expr::value(1)));
        assert!(engine.run_update(&update).unwrap_err().is_schema_error());
    }

    #[test]
    fn test_insert_assigns_ids() {
        let engine = seeded();
        let id = engine
            .run_insert(&InsertStatement::new("team", "id", [("name", Value::from("teamC"))]))
            .unwrap();
        assert_eq!(id, 3);
        assert_eq!(engine.row_count("team").unwrap(), 3);
        engine.clear();
        assert_eq!(engine.row_count("member").unwrap(), 0);
    }
}
