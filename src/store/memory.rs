//! In-memory statistics store.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Duration, NaiveDateTime, Utc};

use crate::error::ExecutionError;
use crate::query::{Delete, Expr, Insert, Literal, Order, Predicate, Select, Statement, StatsTable, UPDATE_TIME_COLUMN};
use crate::store::{ResultRow, StatsStore};

/// The format of values of the update time column.
pub const UPDATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// A [StatsStore] that keeps rows in memory.
///
/// Rows are never updated in place: every insert appends a new version of a row stamped with
/// the time of the insert. Queries only see the latest version of every row (the version
/// with the greatest update time, later inserts win ties). Deletes remove all versions of matching rows.
///
/// Update times are strictly increasing within a store.
#[derive(Debug, Default)]
pub struct MemoryStatsStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: Vec<StoredRow>,
    next_seq: u64,
    last_update_time: Option<NaiveDateTime>,
    statements: Vec<Statement>,
}

#[derive(Debug)]
struct StoredRow {
    table: StatsTable,
    seq: u64,
    row: ResultRow,
}

impl MemoryStatsStore {
    pub fn new() -> Self {
        MemoryStatsStore::default()
    }

    /// Returns statements executed by this store in the order they have been executed.
    pub fn statements(&self) -> Vec<Statement> {
        let inner = self.inner.read().unwrap();
        inner.statements.clone()
    }

    /// Returns the number of row versions stored in the given table.
    pub fn num_versions(&self, table: StatsTable) -> usize {
        let inner = self.inner.read().unwrap();
        inner.rows.iter().filter(|r| r.table == table).count()
    }

    /// Returns the latest versions of all rows of the given table ordered by their update time.
    pub fn rows(&self, table: StatsTable) -> Vec<ResultRow> {
        let inner = self.inner.read().unwrap();
        inner.current_rows(table).into_iter().map(|r| r.row.clone()).collect()
    }
}

impl StatsStore for MemoryStatsStore {
    fn execute_query(&self, statement: &Statement) -> Result<Vec<ResultRow>, ExecutionError> {
        let mut inner = self.inner.write().unwrap();
        inner.statements.push(statement.clone());
        match statement {
            Statement::Select(select) => Ok(inner.select(select)),
            _ => Err(ExecutionError::new(format!("Not a query: {}", statement))),
        }
    }

    fn execute_update(&self, statement: &Statement) -> Result<(), ExecutionError> {
        let mut inner = self.inner.write().unwrap();
        inner.statements.push(statement.clone());
        match statement {
            Statement::Insert(insert) => {
                inner.insert(insert);
                Ok(())
            }
            Statement::Delete(delete) => {
                inner.delete(delete);
                Ok(())
            }
            Statement::Select(_) => Err(ExecutionError::new(format!("Not an update: {}", statement))),
        }
    }
}

impl Inner {
    fn next_update_time(&mut self) -> NaiveDateTime {
        let now = Utc::now().naive_utc();
        let time = match self.last_update_time {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_update_time = Some(time);
        time
    }

    fn insert(&mut self, insert: &Insert) {
        let table = insert.table().table();
        let now = self.next_update_time().format(UPDATE_TIME_FORMAT).to_string();
        let values = table
            .columns()
            .iter()
            .map(|column| {
                let value = match insert.value(column) {
                    Some(Literal::Now) => Some(now.clone()),
                    Some(literal) => literal.to_text(),
                    None if *column == UPDATE_TIME_COLUMN => Some(now.clone()),
                    None => None,
                };
                (column.to_string(), value)
            })
            .collect();

        let seq = self.next_seq;
        self.next_seq += 1;
        self.rows.push(StoredRow {
            table,
            seq,
            row: ResultRow { values },
        });
    }

    fn delete(&mut self, delete: &Delete) {
        let table = delete.table.table();
        self.rows.retain(|r| r.table != table || !eval_predicate(&delete.filter, &r.row));
    }

    fn select(&self, select: &Select) -> Vec<ResultRow> {
        let mut rows: Vec<&StoredRow> = self
            .current_rows(select.table.table())
            .into_iter()
            .filter(|r| select.filter.as_ref().map(|f| eval_predicate(f, &r.row)).unwrap_or(true))
            .collect();

        if let Some((column, order)) = select.order_by.as_ref() {
            rows.sort_by(|a, b| {
                let ord = compare_values(a.row.get(column), b.row.get(column)).then(a.seq.cmp(&b.seq));
                match order {
                    Order::Asc => ord,
                    Order::Desc => ord.reverse(),
                }
            });
        }

        let offset = select.offset.unwrap_or(0) as usize;
        let limit = select.limit.map(|l| l as usize).unwrap_or(usize::MAX);

        rows.into_iter()
            .skip(offset)
            .take(limit)
            .map(|r| {
                if select.projection.is_empty() {
                    r.row.clone()
                } else {
                    r.row.project(&select.projection)
                }
            })
            .collect()
    }

    // The latest version of every row of the given table ordered by insertion.
    fn current_rows(&self, table: StatsTable) -> Vec<&StoredRow> {
        let mut latest: HashMap<&str, &StoredRow> = HashMap::new();
        for row in self.rows.iter().filter(|r| r.table == table) {
            let id = row.row.get("id").unwrap_or_default();
            match latest.get(id) {
                Some(current) if is_newer(current, row) => {}
                _ => {
                    latest.insert(id, row);
                }
            }
        }
        let mut rows: Vec<&StoredRow> = latest.into_iter().map(|(_, r)| r).collect();
        rows.sort_by_key(|r| r.seq);
        rows
    }
}

fn is_newer(a: &StoredRow, b: &StoredRow) -> bool {
    compare_values(a.row.get(UPDATE_TIME_COLUMN), b.row.get(UPDATE_TIME_COLUMN)).then(a.seq.cmp(&b.seq))
        == Ordering::Greater
}

// NULLs first. Numbers are compared as numbers, everything else as text
// (update times have a fixed width format).
fn compare_values(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match (a.parse::<f64>(), b.parse::<f64>()) {
            (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.cmp(b),
        },
    }
}

fn eval_expr(expr: &Expr, row: &ResultRow) -> Option<String> {
    match expr {
        Expr::Column(name) => row.get(name).map(|v| v.to_string()),
        Expr::Concat(args) => {
            let mut out = String::new();
            for arg in args {
                out.push_str(&eval_expr(arg, row)?);
            }
            Some(out)
        }
        Expr::Literal(literal) => literal.to_text(),
    }
}

fn eval_predicate(predicate: &Predicate, row: &ResultRow) -> bool {
    match predicate {
        Predicate::Eq(expr, value) => matches_literal(eval_expr(expr, row).as_deref(), value),
        Predicate::In(expr, values) => {
            let actual = eval_expr(expr, row);
            values.iter().any(|v| matches_literal(actual.as_deref(), v))
        }
        Predicate::IsNull(expr) => eval_expr(expr, row).is_none(),
        Predicate::IsNotNull(expr) => eval_expr(expr, row).is_some(),
        Predicate::And(preds) => preds.iter().all(|p| eval_predicate(p, row)),
    }
}

fn matches_literal(actual: Option<&str>, expected: &Literal) -> bool {
    match (actual, expected) {
        (Some(actual), Literal::Int(v)) => actual.trim().parse::<i64>().map(|a| a == *v).unwrap_or(false),
        (Some(actual), Literal::Double(v)) => actual.trim().parse::<f64>().map(|a| a == *v).unwrap_or(false),
        (Some(actual), Literal::Str(v)) => actual == v.as_str(),
        // comparisons with NULL are never true.
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::query::template::Params;
    use crate::query::QualifiedTable;

    fn table() -> QualifiedTable {
        QualifiedTable::new("__internal_schema", StatsTable::ColumnStatistics)
    }

    fn insert(store: &MemoryStatsStore, id: &str, tbl_id: i64, part_id: Option<i64>, count: f64) {
        let mut params = Params::new();
        for column in StatsTable::ColumnStatistics.columns() {
            params.insert(column.to_string(), Literal::Null);
        }
        params.insert("id".into(), Literal::string(id));
        params.insert("tbl_id".into(), Literal::Int(tbl_id));
        params.insert("col_id".into(), Literal::string("a"));
        params.insert("part_id".into(), part_id.map(Literal::Int).unwrap_or(Literal::Null));
        params.insert("count".into(), Literal::Double(count));

        let insert = Insert::new(table(), params).unwrap();
        store.execute_update(&insert.into()).unwrap();
    }

    #[test]
    fn test_latest_version_wins() {
        let store = MemoryStatsStore::new();
        insert(&store, "1--1-a", 1, None, 10.0);
        insert(&store, "1--1-a", 1, None, 20.0);
        insert(&store, "1--1-b", 1, None, 5.0);

        assert_eq!(store.num_versions(StatsTable::ColumnStatistics), 3, "all versions are kept");

        let rows = store
            .execute_query(&Select::from(table()).filter(Predicate::eq("id", "1--1-a")).into())
            .unwrap();
        assert_eq!(rows.len(), 1, "only the latest version is visible");
        assert_eq!(rows[0].get("count"), Some("20"));
    }

    #[test]
    fn test_update_times_are_increasing() {
        let store = MemoryStatsStore::new();
        for i in 0..20 {
            insert(&store, &format!("1--1-{}", i), 1, None, 1.0);
        }
        let rows = store.rows(StatsTable::ColumnStatistics);
        let times: Vec<&str> = rows.iter().map(|r| r.get(UPDATE_TIME_COLUMN).unwrap()).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]), "times must increase: {:?}", times);
    }

    #[test]
    fn test_delete_removes_all_versions() {
        let store = MemoryStatsStore::new();
        insert(&store, "1--1-a", 1, None, 10.0);
        insert(&store, "1--1-a", 1, None, 20.0);
        insert(&store, "2--1-a", 2, None, 20.0);

        let delete = Delete {
            table: table(),
            filter: Predicate::eq("tbl_id", 1i64),
        };
        store.execute_update(&delete.into()).unwrap();

        assert_eq!(store.num_versions(StatsTable::ColumnStatistics), 1);
        assert_eq!(store.rows(StatsTable::ColumnStatistics)[0].get("id"), Some("2--1-a"));
    }

    #[test]
    fn test_select_filter_order_limit() {
        let store = MemoryStatsStore::new();
        insert(&store, "1--1-a", 1, None, 1.0);
        insert(&store, "1--1-a-10", 1, Some(10), 2.0);
        insert(&store, "1--1-a-11", 1, Some(11), 3.0);
        insert(&store, "1--1-a-12", 1, Some(12), 4.0);

        let select = Select::from(table())
            .columns(&["id", "part_id"])
            .filter(Predicate::eq("tbl_id", 1i64).and(Predicate::is_not_null("part_id")))
            .order_by(UPDATE_TIME_COLUMN, Order::Desc)
            .limit(2)
            .offset(0);
        let rows = store.execute_query(&select.into()).unwrap();

        let ids: Vec<&str> = rows.iter().map(|r| r.get("id").unwrap()).collect();
        assert_eq!(ids, vec!["1--1-a-12", "1--1-a-11"]);
        assert_eq!(rows[0].len(), 2, "projection");
    }

    #[test]
    fn test_concat_in_list() {
        let store = MemoryStatsStore::new();
        insert(&store, "1--1-a-10", 1, Some(10), 1.0);
        insert(&store, "2--1-a-10", 2, Some(10), 1.0);

        let select = Select::from(table()).filter(Predicate::in_list(
            Expr::concat_ws("-", &["tbl_id", "col_id"]),
            vec![Literal::string("2-a")],
        ));
        let rows = store.execute_query(&select.into()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("tbl_id"), Some("2"));
    }

    #[test]
    fn test_reject_wrong_statement_kind() {
        let store = MemoryStatsStore::new();
        let select: Statement = Select::from(table()).into();
        assert!(store.execute_update(&select).is_err());
    }
}
