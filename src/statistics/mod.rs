//! Column statistics and their identifiers.

use std::fmt::{Display, Formatter};

use crate::error::StatisticsError;
use crate::store::ResultRow;

pub mod alter;
pub mod column;
pub mod histogram;

pub use column::{ColumnStatistic, ColumnStatisticBuilder};
pub use histogram::{Bucket, Histogram};

/// The index identifier of statistics collected for a base table.
pub const NO_INDEX: i64 = -1;

/// Identifies statistics of a column of a table, an index or a partition.
///
/// The canonical form of an identifier is `table-index-column` for table and index granularity
/// and `table-index-column-partition` for partition granularity, e.g. `10--1-a` or `10--1-a-100`.
/// Canonical forms are used as primary keys of rows in statistics tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatisticsId {
    table_id: i64,
    index_id: i64,
    column: String,
    partition_id: Option<i64>,
}

impl StatisticsId {
    /// Creates an identifier of statistics of the given column.
    pub fn new(table_id: i64, index_id: i64, column: &str) -> Self {
        StatisticsId {
            table_id,
            index_id,
            column: column.to_string(),
            partition_id: None,
        }
    }

    /// Returns an identifier of statistics of the given partition.
    pub fn with_partition(mut self, partition_id: i64) -> Self {
        self.partition_id = Some(partition_id);
        self
    }

    pub fn table_id(&self) -> i64 {
        self.table_id
    }

    pub fn index_id(&self) -> i64 {
        self.index_id
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn partition_id(&self) -> Option<i64> {
        self.partition_id
    }

    /// Returns a cache key of statistics identified by this identifier.
    pub fn cache_key(&self) -> StatisticsCacheKey {
        StatisticsCacheKey::new(self.table_id, self.index_id, &self.column)
    }
}

impl Display for StatisticsId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.table_id, self.index_id, self.column)?;
        if let Some(partition_id) = self.partition_id {
            write!(f, "-{}", partition_id)?;
        }
        Ok(())
    }
}

/// A key of the statistics cache.
/// Displayed in the same form as a [StatisticsId] without partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StatisticsCacheKey {
    pub table_id: i64,
    pub index_id: i64,
    pub column: String,
}

impl StatisticsCacheKey {
    pub fn new(table_id: i64, index_id: i64, column: &str) -> Self {
        StatisticsCacheKey {
            table_id,
            index_id,
            column: column.to_string(),
        }
    }
}

impl Display for StatisticsCacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.table_id, self.index_id, self.column)
    }
}

/// Identity columns of a row of a statistics table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsId {
    pub id: String,
    pub catalog_id: i64,
    pub db_id: i64,
    pub tbl_id: i64,
    pub idx_id: i64,
    pub col_id: String,
    pub part_id: Option<i64>,
}

impl StatsId {
    /// Reads identity columns of the given row.
    /// Returns an [analysis error](StatisticsError::Analysis) if a column is missing or is not a number.
    pub fn from_row(row: &ResultRow) -> Result<Self, StatisticsError> {
        let required = |name: &str| -> Result<i64, StatisticsError> {
            row.parse::<i64>(name)?
                .ok_or_else(|| StatisticsError::analysis(format!("Statistics row has no value for column {}", name)))
        };
        Ok(StatsId {
            id: row.get_required("id")?.to_string(),
            catalog_id: required("catalog_id")?,
            db_id: required("db_id")?,
            tbl_id: required("tbl_id")?,
            idx_id: required("idx_id")?,
            col_id: row.get_required("col_id")?.to_string(),
            part_id: row.parse::<i64>("part_id")?,
        })
    }

    /// Returns the statistics identifier of this row.
    pub fn statistics_id(&self) -> StatisticsId {
        let id = StatisticsId::new(self.tbl_id, self.idx_id, &self.col_id);
        match self.part_id {
            Some(part_id) => id.with_partition(part_id),
            None => id,
        }
    }
}
