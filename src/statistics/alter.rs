//! Manual changes of column statistics.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::catalog::{Column, TableName};
use crate::error::StatisticsError;
use crate::scalar::readable_value;
use crate::statistics::{ColumnStatistic, ColumnStatisticBuilder};

/// Kinds of column statistics a user can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatsType {
    RowCount,
    Ndv,
    NumNulls,
    MinValue,
    MaxValue,
    DataSize,
}

impl StatsType {
    /// The name of this kind of statistics.
    pub fn name(&self) -> &'static str {
        match self {
            StatsType::RowCount => "row_count",
            StatsType::Ndv => "ndv",
            StatsType::NumNulls => "num_nulls",
            StatsType::MinValue => "min_value",
            StatsType::MaxValue => "max_value",
            StatsType::DataSize => "data_size",
        }
    }
}

impl FromStr for StatsType {
    type Err = StatisticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "row_count" => Ok(StatsType::RowCount),
            "ndv" => Ok(StatsType::Ndv),
            "num_nulls" => Ok(StatsType::NumNulls),
            "min_value" => Ok(StatsType::MinValue),
            "max_value" => Ok(StatsType::MaxValue),
            "data_size" => Ok(StatsType::DataSize),
            _ => Err(StatisticsError::analysis(format!("Unknown statistics type: {}", s))),
        }
    }
}

impl Display for StatsType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A request to replace statistics of a column with values supplied by a user.
///
/// Statistics are replaced as a whole: kinds of statistics missing from the request
/// are not carried over from previously stored statistics.
#[derive(Debug, Clone)]
pub struct AlterColumnStats {
    table: TableName,
    column: String,
    partitions: Vec<String>,
    values: HashMap<StatsType, String>,
}

impl AlterColumnStats {
    /// Creates a request that alters table level statistics of the given column.
    pub fn new(table: TableName, column: &str) -> Self {
        AlterColumnStats {
            table,
            column: column.to_string(),
            partitions: Vec::new(),
            values: HashMap::new(),
        }
    }

    /// Alters statistics of the given partitions instead of the table.
    pub fn with_partitions<T>(mut self, partitions: T) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
    {
        self.partitions = partitions.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the value of the given kind of statistics.
    pub fn with_value(mut self, stats_type: StatsType, value: &str) -> Self {
        self.values.insert(stats_type, value.to_string());
        self
    }

    /// Sets the value of the kind of statistics with the given name.
    /// Returns an [analysis error](StatisticsError::Analysis) if there is no such kind of statistics.
    pub fn with_property(self, name: &str, value: &str) -> Result<Self, StatisticsError> {
        let stats_type = StatsType::from_str(name)?;
        Ok(self.with_value(stats_type, value))
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn partitions(&self) -> &[String] {
        &self.partitions
    }

    pub fn value(&self, stats_type: StatsType) -> Option<&str> {
        self.values.get(&stats_type).map(|v| v.as_str())
    }

    /// Builds statistics of the given column from the values of this request.
    ///
    /// Setting `ndv` marks the statistics as not [original](ColumnStatistic::is_original).
    /// Bounds are parsed according to the type of the column.
    /// The average size of a value is only derived when both `data_size` and `row_count` are positive.
    pub fn merge(&self, column: &Column) -> Result<ColumnStatistic, StatisticsError> {
        let mut builder = ColumnStatisticBuilder::new();

        let row_count = self.parse_number(StatsType::RowCount)?;
        if let Some(row_count) = row_count {
            builder = builder.set_count(row_count);
        }
        if let Some(ndv) = self.parse_number(StatsType::Ndv)? {
            builder = builder.set_ndv(ndv).set_original(false);
        }
        if let Some(num_nulls) = self.parse_number(StatsType::NumNulls)? {
            builder = builder.set_num_nulls(num_nulls);
        }
        if let Some(min) = self.value(StatsType::MinValue) {
            builder = builder.set_min(readable_value(column.data_type(), min)?);
        }
        if let Some(max) = self.value(StatsType::MaxValue) {
            builder = builder.set_max(readable_value(column.data_type(), max)?);
        }
        match self.parse_number(StatsType::DataSize)? {
            Some(data_size) if data_size > 0.0 => {
                builder = builder.set_data_size(data_size);
                match row_count {
                    Some(row_count) if row_count > 0.0 => builder = builder.set_avg_size_byte(data_size / row_count),
                    _ => {}
                }
            }
            _ => {}
        }

        Ok(builder.build())
    }

    fn parse_number(&self, stats_type: StatsType) -> Result<Option<f64>, StatisticsError> {
        match self.value(stats_type) {
            Some(value) => match value.trim().parse::<f64>() {
                Ok(number) if number.is_finite() => Ok(Some(number)),
                _ => Err(StatisticsError::analysis(format!("Invalid value of {}: {:?}", stats_type, value))),
            },
            None => Ok(None),
        }
    }
}

/// How an analysis job has been started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    /// Started by a user.
    Manual,
    /// Started by the system.
    System,
}

/// Describes an analysis of a table that has produced new statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisJob {
    pub job_type: JobType,
    pub col_name: String,
    pub col_to_partitions: HashMap<String, HashSet<String>>,
    /// Whether statistics have been supplied by a user instead of being collected.
    pub user_inject: bool,
    pub tbl_update_time: DateTime<Utc>,
}

impl AnalysisJob {
    /// Describes statistics of a table that have been set by a user.
    pub fn manual_alter() -> Self {
        AnalysisJob {
            job_type: JobType::Manual,
            col_name: String::new(),
            col_to_partitions: HashMap::new(),
            user_inject: true,
            tbl_update_time: Utc::now(),
        }
    }
}
