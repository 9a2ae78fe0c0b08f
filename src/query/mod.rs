//! Typed statements over statistics tables.
//!
//! Every statement sent to a [statistics store](crate::store::StatsStore) is built from the types of
//! this module. String literals are rendered through [escape_sql] only.

use std::fmt::{Display, Formatter};

use itertools::Itertools;

use crate::error::StatisticsError;

pub mod batch;
pub mod template;

use template::{Params, Template};

/// The name of the table that stores column statistics.
pub const COLUMN_STATISTICS_TABLE: &str = "column_statistics";
/// The name of the table that stores histograms.
pub const HISTOGRAM_TABLE: &str = "histogram_statistics";

/// Columns of the column statistics table.
pub const COLUMN_STATISTICS_COLUMNS: [&str; 14] = [
    "id",
    "catalog_id",
    "db_id",
    "tbl_id",
    "idx_id",
    "col_id",
    "part_id",
    "count",
    "ndv",
    "null_count",
    "min",
    "max",
    "data_size",
    "update_time",
];

/// Columns of the histogram table.
pub const HISTOGRAM_COLUMNS: [&str; 9] = [
    "id",
    "catalog_id",
    "db_id",
    "tbl_id",
    "idx_id",
    "col_id",
    "sample_rate",
    "buckets",
    "update_time",
];

/// Identity columns of a statistics row.
pub const STATS_ID_COLUMNS: [&str; 7] = ["id", "catalog_id", "db_id", "tbl_id", "idx_id", "col_id", "part_id"];

/// The column that holds the time a row has been written at.
pub const UPDATE_TIME_COLUMN: &str = "update_time";

const INSERT_COLUMN_STATISTICS_TEMPLATE: &str = "VALUES(${id}, ${catalog_id}, ${db_id}, ${tbl_id}, ${idx_id}, \
     ${col_id}, ${part_id}, ${count}, ${ndv}, ${null_count}, ${min}, ${max}, ${data_size}, NOW())";

const INSERT_HISTOGRAM_TEMPLATE: &str =
    "VALUES(${id}, ${catalog_id}, ${db_id}, ${tbl_id}, ${idx_id}, ${col_id}, ${sample_rate}, ${buckets}, NOW())";

/// Escapes the given string so it can be placed between single quotes.
/// Backslashes are escaped with a backslash and single quotes are doubled.
pub fn escape_sql(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("''"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn quote_identifier(value: &str) -> String {
    format!("`{}`", value.replace('`', "``"))
}

/// Statistics tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsTable {
    /// See [COLUMN_STATISTICS_TABLE].
    ColumnStatistics,
    /// See [HISTOGRAM_TABLE].
    Histogram,
}

impl StatsTable {
    /// The name of this table.
    pub fn name(&self) -> &'static str {
        match self {
            StatsTable::ColumnStatistics => COLUMN_STATISTICS_TABLE,
            StatsTable::Histogram => HISTOGRAM_TABLE,
        }
    }

    /// The columns of this table in their declaration order.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            StatsTable::ColumnStatistics => &COLUMN_STATISTICS_COLUMNS,
            StatsTable::Histogram => &HISTOGRAM_COLUMNS,
        }
    }

    fn insert_template(&self) -> Template<'static> {
        match self {
            StatsTable::ColumnStatistics => Template::new(INSERT_COLUMN_STATISTICS_TEMPLATE),
            StatsTable::Histogram => Template::new(INSERT_HISTOGRAM_TEMPLATE),
        }
    }
}

/// A statistics table qualified with the name of the database it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedTable {
    db: String,
    table: StatsTable,
}

impl QualifiedTable {
    pub fn new(db: &str, table: StatsTable) -> Self {
        QualifiedTable {
            db: db.to_string(),
            table,
        }
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn table(&self) -> StatsTable {
        self.table
    }
}

impl Display for QualifiedTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", quote_identifier(&self.db), quote_identifier(self.table.name()))
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Int(i64),
    Double(f64),
    Str(String),
    /// The time a statement is executed at.
    Now,
}

impl Literal {
    /// Creates a string literal.
    pub fn string<T>(value: T) -> Self
    where
        T: Into<String>,
    {
        Literal::Str(value.into())
    }

    /// Creates a double literal from an optional value. `None` and non-finite values become `NULL`.
    pub fn optional_double(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Literal::Double(v),
            _ => Literal::Null,
        }
    }

    /// Returns a textual representation of this literal as it is stored in a column.
    /// Returns `None` for [Literal::Null] and [Literal::Now].
    pub fn to_text(&self) -> Option<String> {
        match self {
            Literal::Null | Literal::Now => None,
            Literal::Int(v) => Some(v.to_string()),
            Literal::Double(v) if v.is_finite() => Some(v.to_string()),
            Literal::Double(_) => None,
            Literal::Str(v) => Some(v.clone()),
        }
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Null => write!(f, "NULL"),
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Double(v) if v.is_finite() => write!(f, "{}", v),
            Literal::Double(_) => write!(f, "NULL"),
            Literal::Str(v) => write!(f, "'{}'", escape_sql(v)),
            Literal::Now => write!(f, "NOW()"),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Str(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::Str(value)
    }
}

/// A scalar expression allowed in predicates.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    /// String concatenation. The result is `NULL` if any argument is `NULL`.
    Concat(Vec<Expr>),
    Literal(Literal),
}

impl Expr {
    /// Creates a reference to the given column.
    pub fn column(name: &str) -> Self {
        Expr::Column(name.to_string())
    }

    /// Creates a concatenation of the given columns separated by the given delimiter.
    pub fn concat_ws(delimiter: &str, columns: &[&str]) -> Self {
        let columns = columns.iter().map(|c| Expr::column(c));
        let args = Itertools::intersperse(columns, Expr::Literal(Literal::string(delimiter))).collect();
        Expr::Concat(args)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", quote_identifier(name)),
            Expr::Concat(args) => write!(f, "CONCAT({})", args.iter().join(", ")),
            Expr::Literal(literal) => write!(f, "{}", literal),
        }
    }
}

/// A filter of a select or delete statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Expr, Literal),
    In(Expr, Vec<Literal>),
    IsNull(Expr),
    IsNotNull(Expr),
    And(Vec<Predicate>),
}

impl Predicate {
    /// `column = value`.
    pub fn eq<T>(column: &str, value: T) -> Self
    where
        T: Into<Literal>,
    {
        Predicate::Eq(Expr::column(column), value.into())
    }

    /// `expr IN (values)`.
    pub fn in_list<T>(expr: Expr, values: T) -> Self
    where
        T: IntoIterator<Item = Literal>,
    {
        Predicate::In(expr, values.into_iter().collect())
    }

    /// `column IS NULL`.
    pub fn is_null(column: &str) -> Self {
        Predicate::IsNull(Expr::column(column))
    }

    /// `column IS NOT NULL`.
    pub fn is_not_null(column: &str) -> Self {
        Predicate::IsNotNull(Expr::column(column))
    }

    /// Combines this predicate with the given predicate using `AND`.
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Predicate::And(mut preds) => {
                preds.push(other);
                Predicate::And(preds)
            }
            _ => Predicate::And(vec![self, other]),
        }
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Eq(expr, value) => write!(f, "{} = {}", expr, value),
            Predicate::In(expr, values) => write!(f, "{} IN ({})", expr, values.iter().join(", ")),
            Predicate::IsNull(expr) => write!(f, "{} IS NULL", expr),
            Predicate::IsNotNull(expr) => write!(f, "{} IS NOT NULL", expr),
            Predicate::And(preds) => write!(f, "{}", preds.iter().join(" AND ")),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

/// `SELECT` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: QualifiedTable,
    /// Selected columns. An empty projection selects all columns.
    pub projection: Vec<String>,
    pub filter: Option<Predicate>,
    pub order_by: Option<(String, Order)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Select {
    /// Creates a statement that selects all rows and all columns of the given table.
    pub fn from(table: QualifiedTable) -> Self {
        Select {
            table,
            projection: Vec::new(),
            filter: None,
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.projection = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: Predicate) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.order_by = Some((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl Display for Select {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.projection.is_empty() {
            write!(f, "SELECT * FROM {}", self.table)?;
        } else {
            let columns = self.projection.iter().map(|c| quote_identifier(c)).join(", ");
            write!(f, "SELECT {} FROM {}", columns, self.table)?;
        }
        if let Some(filter) = self.filter.as_ref() {
            write!(f, " WHERE {}", filter)?;
        }
        if let Some((column, order)) = self.order_by.as_ref() {
            let order = match order {
                Order::Asc => "ASC",
                Order::Desc => "DESC",
            };
            write!(f, " ORDER BY {} {}", quote_identifier(column), order)?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {}", limit)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

/// `DELETE` statement. A delete statement always has a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: QualifiedTable,
    pub filter: Predicate,
}

impl Display for Delete {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DELETE FROM {} WHERE {}", self.table, self.filter)
    }
}

/// `INSERT` statement that writes a single row. The row is described by named parameters
/// one per column of the table. The update time column is set to the time the statement is executed at.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: QualifiedTable,
    params: Params,
    values: String,
}

impl Insert {
    /// Creates an insert statement. Returns an error if a value of some column is missing.
    pub fn new(table: QualifiedTable, params: Params) -> Result<Self, StatisticsError> {
        let values = table.table().insert_template().render(&params)?;
        Ok(Insert { table, params, values })
    }

    pub fn table(&self) -> &QualifiedTable {
        &self.table
    }

    /// Returns the value of the given column.
    pub fn value(&self, column: &str) -> Option<&Literal> {
        self.params.get(column)
    }
}

impl Display for Insert {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "INSERT INTO {} {}", self.table, self.values)
    }
}

/// A statement executed by a statistics store.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Delete(Delete),
    Insert(Insert),
}

impl Statement {
    /// Returns SQL text of this statement.
    pub fn to_sql(&self) -> String {
        self.to_string()
    }

    /// The table this statement operates on.
    pub fn table(&self) -> &QualifiedTable {
        match self {
            Statement::Select(s) => &s.table,
            Statement::Delete(d) => &d.table,
            Statement::Insert(i) => &i.table,
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Statement::Select(s) => write!(f, "{}", s),
            Statement::Delete(d) => write!(f, "{}", d),
            Statement::Insert(i) => write!(f, "{}", i),
        }
    }
}

impl From<Select> for Statement {
    fn from(select: Select) -> Self {
        Statement::Select(select)
    }
}

impl From<Delete> for Statement {
    fn from(delete: Delete) -> Self {
        Statement::Delete(delete)
    }
}

impl From<Insert> for Statement {
    fn from(insert: Insert) -> Self {
        Statement::Insert(insert)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sqlparser::dialect::MySqlDialect;
    use sqlparser::parser::Parser;

    fn stats_table() -> QualifiedTable {
        QualifiedTable::new("__internal_schema", StatsTable::ColumnStatistics)
    }

    fn expect_single_statement(sql: &str) {
        let ast = Parser::parse_sql(&MySqlDialect {}, sql).unwrap_or_else(|e| panic!("Invalid SQL: {}\n{}", sql, e));
        assert_eq!(ast.len(), 1, "Expected exactly one statement: {}", sql);
    }

    #[test]
    fn test_escape_sql() {
        assert_eq!(escape_sql("abc"), "abc");
        assert_eq!(escape_sql("it's"), "it''s");
        assert_eq!(escape_sql(r"a\b"), r"a\\b");
        assert_eq!(escape_sql(r"\'"), r"\\''");
    }

    #[test]
    fn test_select() {
        let select = Select::from(stats_table())
            .columns(&["id", "tbl_id"])
            .filter(Predicate::eq("tbl_id", 1i64).and(Predicate::is_not_null("part_id")))
            .order_by(UPDATE_TIME_COLUMN, Order::Asc)
            .limit(10)
            .offset(20);

        let sql = Statement::from(select).to_sql();
        assert_eq!(
            sql,
            "SELECT `id`, `tbl_id` FROM `__internal_schema`.`column_statistics` \
             WHERE `tbl_id` = 1 AND `part_id` IS NOT NULL ORDER BY `update_time` ASC LIMIT 10 OFFSET 20"
        );
        expect_single_statement(&sql);
    }

    #[test]
    fn test_delete_with_concat() {
        let delete = Delete {
            table: stats_table(),
            filter: Predicate::in_list(
                Expr::concat_ws("-", &["tbl_id", "idx_id", "col_id"]),
                vec![Literal::string("1--1-a"), Literal::string("1--1-b")],
            ),
        };

        let sql = Statement::from(delete).to_sql();
        assert_eq!(
            sql,
            "DELETE FROM `__internal_schema`.`column_statistics` \
             WHERE CONCAT(`tbl_id`, '-', `idx_id`, '-', `col_id`) IN ('1--1-a', '1--1-b')"
        );
        expect_single_statement(&sql);
    }

    #[test]
    fn test_hostile_literals_stay_literals() {
        let values = vec![
            Literal::string("a'); DROP TABLE t; --"),
            Literal::string(r"b\'; DELETE FROM t; --"),
            Literal::string("c\\"),
        ];
        let delete = Delete {
            table: stats_table(),
            filter: Predicate::eq("tbl_id", 1i64).and(Predicate::in_list(Expr::column("col_id"), values)),
        };

        expect_single_statement(&Statement::from(delete).to_sql());
    }

    #[test]
    fn test_insert() -> Result<(), StatisticsError> {
        let mut params = Params::new();
        params.insert("id".into(), Literal::string("1--1-a"));
        params.insert("catalog_id".into(), Literal::Int(0));
        params.insert("db_id".into(), Literal::Int(2));
        params.insert("tbl_id".into(), Literal::Int(1));
        params.insert("idx_id".into(), Literal::string("-1"));
        params.insert("col_id".into(), Literal::string("a"));
        params.insert("part_id".into(), Literal::Null);
        params.insert("count".into(), Literal::Double(10.0));
        params.insert("ndv".into(), Literal::Double(2.5));
        params.insert("null_count".into(), Literal::Null);
        params.insert("min".into(), Literal::string("it's"));
        params.insert("max".into(), Literal::Null);
        params.insert("data_size".into(), Literal::optional_double(Some(f64::NAN)));

        let insert = Insert::new(stats_table(), params)?;
        assert_eq!(insert.value("col_id"), Some(&Literal::string("a")));

        let sql = Statement::from(insert).to_sql();
        assert_eq!(
            sql,
            "INSERT INTO `__internal_schema`.`column_statistics` \
             VALUES('1--1-a', 0, 2, 1, '-1', 'a', NULL, 10, 2.5, NULL, 'it''s', NULL, NULL, NOW())"
        );
        expect_single_statement(&sql);
        Ok(())
    }

    #[test]
    fn test_insert_requires_all_columns() {
        let mut params = Params::new();
        params.insert("id".into(), Literal::string("1--1-a"));

        let result = Insert::new(stats_table(), params);
        assert!(matches!(result, Err(StatisticsError::Argument(_))), "missing parameters");
    }
}
