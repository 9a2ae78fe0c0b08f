//! Statistics stores.
//!
//! A store executes [statements](crate::query::Statement) against statistics tables.
//! The repository never keeps statistics itself: every read and write is delegated to a store.

use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{ExecutionError, StatisticsError};
use crate::query::Statement;

pub mod memory;

pub type StoreRef = Arc<dyn StatsStore>;

/// Executes statements against statistics tables.
pub trait StatsStore: Debug + Send + Sync {
    /// Executes the given query and returns the rows it produced.
    fn execute_query(&self, statement: &Statement) -> Result<Vec<ResultRow>, ExecutionError>;

    /// Executes the given statement that modifies a statistics table.
    fn execute_update(&self, statement: &Statement) -> Result<(), ExecutionError>;
}

/// A row returned by a [statistics store](StatsStore).
/// Values are kept as text. `NULL` values are represented by `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    values: Vec<(String, Option<String>)>,
}

impl ResultRow {
    /// Creates a row from the given pairs of column names and values.
    pub fn new<N, V>(values: Vec<(N, Option<V>)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        ResultRow {
            values: values.into_iter().map(|(n, v)| (n.into(), v.map(Into::into))).collect(),
        }
    }

    /// The number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns an iterator over column names of this row.
    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    /// Returns `true` if this row has a column with the given name.
    pub fn has_column(&self, name: &str) -> bool {
        self.values.iter().any(|(n, _)| n == name)
    }

    /// Returns the value of the given column. Returns `None` if the column is missing or its value is `NULL`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(n, _)| n == name).and_then(|(_, v)| v.as_deref())
    }

    /// Returns the value of the i-th column.
    pub fn get_at(&self, i: usize) -> Option<&str> {
        self.values.get(i).and_then(|(_, v)| v.as_deref())
    }

    /// Returns the value of the given column or an error if it is missing or `NULL`.
    pub fn get_required(&self, name: &str) -> Result<&str, StatisticsError> {
        self.get(name)
            .ok_or_else(|| StatisticsError::analysis(format!("Statistics row has no value for column {}", name)))
    }

    /// Parses the value of the given column. `NULL` values are returned as `None`.
    pub fn parse<T>(&self, name: &str) -> Result<Option<T>, StatisticsError>
    where
        T: FromStr,
    {
        match self.get(name) {
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
                StatisticsError::analysis(format!("Invalid value of column {}: {:?}", name, value))
            }),
            None => Ok(None),
        }
    }

    /// Returns a row that contains only the given columns in the given order.
    /// Columns missing from this row are `NULL` in the result.
    pub fn project(&self, columns: &[String]) -> ResultRow {
        let values = columns
            .iter()
            .map(|c| {
                let value = self.values.iter().find(|(n, _)| n == c).and_then(|(_, v)| v.clone());
                (c.clone(), value)
            })
            .collect();
        ResultRow { values }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn row() -> ResultRow {
        ResultRow::new(vec![("id", Some("1--1-a")), ("tbl_id", Some("1")), ("part_id", None), ("count", Some("x"))])
    }

    #[test]
    fn test_get() {
        let row = row();
        assert_eq!(row.len(), 4);
        assert_eq!(row.get("id"), Some("1--1-a"));
        assert_eq!(row.get_at(1), Some("1"));
        assert_eq!(row.get("part_id"), None, "null value");
        assert!(row.has_column("part_id"));
        assert_eq!(row.get("missing"), None, "missing column");
        assert!(row.get_required("part_id").is_err());
    }

    #[test]
    fn test_parse() {
        let row = row();
        assert_eq!(row.parse::<i64>("tbl_id").unwrap(), Some(1));
        assert_eq!(row.parse::<i64>("part_id").unwrap(), None);

        let err = row.parse::<f64>("count").unwrap_err();
        assert!(matches!(err, StatisticsError::Analysis(_)), "unexpected error: {}", err);
    }

    #[test]
    fn test_project() {
        let row = row().project(&["tbl_id".to_string(), "id".to_string(), "ndv".to_string()]);
        assert_eq!(row.columns().collect::<Vec<_>>(), vec!["tbl_id", "id", "ndv"]);
        assert_eq!(row.get("id"), Some("1--1-a"));
        assert_eq!(row.get("ndv"), None);
    }
}
