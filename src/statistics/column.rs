//! Column statistics.

use crate::catalog::Catalog;
use crate::error::StatisticsError;
use crate::scalar::{readable_value, ScalarValue};
use crate::store::ResultRow;

/// Statistics of a column.
///
/// Every numeric estimate is optional: `None` means the value is unknown.
/// Instances are immutable and are created by a [ColumnStatisticBuilder].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStatistic {
    count: Option<f64>,
    ndv: Option<f64>,
    num_nulls: Option<f64>,
    data_size: Option<f64>,
    avg_size_byte: Option<f64>,
    min_value: Option<f64>,
    max_value: Option<f64>,
    min_expr: Option<ScalarValue>,
    max_expr: Option<ScalarValue>,
    is_original: bool,
    is_unknown: bool,
    update_time: Option<String>,
}

impl ColumnStatistic {
    /// Returns statistics of a column no statistics is available for.
    pub fn unknown() -> Self {
        ColumnStatisticBuilder::new().set_original(false).set_unknown(true).build()
    }

    /// The number of rows.
    pub fn count(&self) -> Option<f64> {
        self.count
    }

    /// The number of distinct values.
    pub fn ndv(&self) -> Option<f64> {
        self.ndv
    }

    /// The number of `NULL` values.
    pub fn num_nulls(&self) -> Option<f64> {
        self.num_nulls
    }

    /// The total size of values in bytes.
    pub fn data_size(&self) -> Option<f64> {
        self.data_size
    }

    /// The average size of a value in bytes.
    pub fn avg_size_byte(&self) -> Option<f64> {
        self.avg_size_byte
    }

    /// The numeric projection of the minimum value.
    pub fn min_value(&self) -> Option<f64> {
        self.min_value
    }

    /// The numeric projection of the maximum value.
    pub fn max_value(&self) -> Option<f64> {
        self.max_value
    }

    /// The minimum value.
    pub fn min_expr(&self) -> Option<&ScalarValue> {
        self.min_expr.as_ref()
    }

    /// The maximum value.
    pub fn max_expr(&self) -> Option<&ScalarValue> {
        self.max_expr.as_ref()
    }

    /// Whether the ndv estimate has been computed by statistics collection (`true`)
    /// or supplied by a user (`false`).
    pub fn is_original(&self) -> bool {
        self.is_original
    }

    /// Whether these statistics are the [unknown](ColumnStatistic::unknown) statistics.
    pub fn is_unknown(&self) -> bool {
        self.is_unknown
    }

    /// The time these statistics have been written at.
    pub fn update_time(&self) -> Option<&str> {
        self.update_time.as_deref()
    }

    /// Reads statistics from a row of the column statistics table.
    ///
    /// The column bounds are parsed according to the type of the column. The column is looked up in the
    /// given catalog. If the table or the column no longer exist this method returns
    /// [unknown](ColumnStatistic::unknown) statistics.
    pub fn from_result_row(row: &ResultRow, catalog: &dyn Catalog) -> Result<Self, StatisticsError> {
        let tbl_id = row
            .parse::<i64>("tbl_id")?
            .ok_or_else(|| StatisticsError::analysis("Statistics row has no value for column tbl_id"))?;
        let col_id = row.get_required("col_id")?;

        let column = match catalog.get_table_by_id(tbl_id).and_then(|t| t.get_column(col_id)) {
            Some(column) => column,
            None => {
                log::warn!("Column statistics refer to an unknown column. Table id: {} column: {}", tbl_id, col_id);
                return Ok(ColumnStatistic::unknown());
            }
        };

        let count = row.parse::<f64>("count")?;
        let data_size = row.parse::<f64>("data_size")?;

        let mut builder = ColumnStatisticBuilder::new();
        builder = builder.set_optional_count(count);
        builder = builder.set_optional_ndv(row.parse::<f64>("ndv")?);
        builder = builder.set_optional_num_nulls(row.parse::<f64>("null_count")?);
        builder = builder.set_optional_data_size(data_size);
        if let (Some(count), Some(data_size)) = (count, data_size) {
            if count > 0.0 {
                builder = builder.set_avg_size_byte(data_size / count);
            }
        }

        if let Some(min) = row.get("min") {
            match readable_value(column.data_type(), min) {
                Ok(value) => builder = builder.set_min(value),
                Err(err) => log::warn!("Failed to read min value of column {}: {}", col_id, err),
            }
        }
        if let Some(max) = row.get("max") {
            match readable_value(column.data_type(), max) {
                Ok(value) => builder = builder.set_max(value),
                Err(err) => log::warn!("Failed to read max value of column {}: {}", col_id, err),
            }
        }
        if let Some(update_time) = row.get("update_time") {
            builder = builder.set_update_time(update_time);
        }

        Ok(builder.build())
    }
}

/// A builder to create instances of [ColumnStatistic].
#[derive(Debug, Clone)]
pub struct ColumnStatisticBuilder {
    statistic: ColumnStatistic,
}

impl ColumnStatisticBuilder {
    /// Creates a builder with all values unset.
    /// Statistics created by a new builder are marked as [original](ColumnStatistic::is_original).
    pub fn new() -> Self {
        ColumnStatisticBuilder {
            statistic: ColumnStatistic {
                count: None,
                ndv: None,
                num_nulls: None,
                data_size: None,
                avg_size_byte: None,
                min_value: None,
                max_value: None,
                min_expr: None,
                max_expr: None,
                is_original: true,
                is_unknown: false,
                update_time: None,
            },
        }
    }

    pub fn set_count(self, count: f64) -> Self {
        self.set_optional_count(Some(count))
    }

    pub fn set_ndv(self, ndv: f64) -> Self {
        self.set_optional_ndv(Some(ndv))
    }

    pub fn set_num_nulls(self, num_nulls: f64) -> Self {
        self.set_optional_num_nulls(Some(num_nulls))
    }

    pub fn set_data_size(self, data_size: f64) -> Self {
        self.set_optional_data_size(Some(data_size))
    }

    pub fn set_avg_size_byte(mut self, avg_size_byte: f64) -> Self {
        self.statistic.avg_size_byte = Some(avg_size_byte);
        self
    }

    /// Sets the minimum value and its numeric projection.
    pub fn set_min(mut self, value: ScalarValue) -> Self {
        self.statistic.min_value = Some(value.to_double());
        self.statistic.min_expr = Some(value);
        self
    }

    /// Sets the maximum value and its numeric projection.
    pub fn set_max(mut self, value: ScalarValue) -> Self {
        self.statistic.max_value = Some(value.to_double());
        self.statistic.max_expr = Some(value);
        self
    }

    pub fn set_original(mut self, is_original: bool) -> Self {
        self.statistic.is_original = is_original;
        self
    }

    pub fn set_unknown(mut self, is_unknown: bool) -> Self {
        self.statistic.is_unknown = is_unknown;
        self
    }

    pub fn set_update_time(mut self, update_time: &str) -> Self {
        self.statistic.update_time = Some(update_time.to_string());
        self
    }

    fn set_optional_count(mut self, count: Option<f64>) -> Self {
        self.statistic.count = count;
        self
    }

    fn set_optional_ndv(mut self, ndv: Option<f64>) -> Self {
        self.statistic.ndv = ndv;
        self
    }

    fn set_optional_num_nulls(mut self, num_nulls: Option<f64>) -> Self {
        self.statistic.num_nulls = num_nulls;
        self
    }

    fn set_optional_data_size(mut self, data_size: Option<f64>) -> Self {
        self.statistic.data_size = data_size;
        self
    }

    /// Creates an instance of [ColumnStatistic].
    pub fn build(self) -> ColumnStatistic {
        self.statistic
    }
}

impl Default for ColumnStatisticBuilder {
    fn default() -> Self {
        ColumnStatisticBuilder::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::test_catalog;

    fn row(values: Vec<(&str, Option<&str>)>) -> ResultRow {
        let mut all = vec![
            ("id", Some("10--1-a")),
            ("catalog_id", Some("0")),
            ("db_id", Some("1")),
            ("tbl_id", Some("10")),
            ("idx_id", Some("-1")),
            ("col_id", Some("a")),
            ("part_id", None),
        ];
        all.extend(values);
        ResultRow::new(all)
    }

    #[test]
    fn test_unknown() {
        let unknown = ColumnStatistic::unknown();
        assert!(unknown.is_unknown());
        assert_eq!(unknown.count(), None);
        assert_eq!(unknown.ndv(), None);
        assert_eq!(unknown.min_expr(), None);
        assert!(!unknown.is_original());
    }

    #[test]
    fn test_from_result_row() -> Result<(), StatisticsError> {
        let catalog = test_catalog();
        let row = row(vec![
            ("count", Some("100")),
            ("ndv", Some("10")),
            ("null_count", Some("1")),
            ("min", Some("5")),
            ("max", Some("50")),
            ("data_size", Some("400")),
            ("update_time", Some("2023-01-01 00:00:00.000000")),
        ]);
        let statistic = ColumnStatistic::from_result_row(&row, catalog.as_ref())?;

        assert!(!statistic.is_unknown());
        assert_eq!(statistic.count(), Some(100.0));
        assert_eq!(statistic.ndv(), Some(10.0));
        assert_eq!(statistic.num_nulls(), Some(1.0));
        assert_eq!(statistic.avg_size_byte(), Some(4.0), "data_size / count");
        assert_eq!(statistic.min_expr(), Some(&ScalarValue::Int32(5)));
        assert_eq!(statistic.max_value(), Some(50.0));
        assert_eq!(statistic.update_time(), Some("2023-01-01 00:00:00.000000"));
        Ok(())
    }

    #[test]
    fn test_from_result_row_with_nulls() -> Result<(), StatisticsError> {
        let catalog = test_catalog();
        let row = row(vec![("count", Some("0")), ("ndv", None), ("data_size", Some("10"))]);
        let statistic = ColumnStatistic::from_result_row(&row, catalog.as_ref())?;

        assert_eq!(statistic.ndv(), None);
        assert_eq!(statistic.avg_size_byte(), None, "no division by zero");
        assert_eq!(statistic.min_value(), None);
        Ok(())
    }

    #[test]
    fn test_from_result_row_unknown_column() -> Result<(), StatisticsError> {
        let catalog = test_catalog();
        let row = ResultRow::new(vec![("tbl_id", Some("10")), ("col_id", Some("dropped")), ("count", Some("1"))]);
        let statistic = ColumnStatistic::from_result_row(&row, catalog.as_ref())?;

        assert!(statistic.is_unknown());
        Ok(())
    }

    #[test]
    fn test_from_result_row_bounds_of_another_type() -> Result<(), StatisticsError> {
        let catalog = test_catalog();
        let row = row(vec![("count", Some("10")), ("min", Some("x")), ("max", Some("50"))]);
        let statistic = ColumnStatistic::from_result_row(&row, catalog.as_ref())?;

        assert_eq!(statistic.count(), Some(10.0));
        assert_eq!(statistic.min_expr(), None);
        assert_eq!(statistic.max_expr(), Some(&ScalarValue::Int32(50)));
        Ok(())
    }

    #[test]
    fn test_from_result_row_invalid_number() {
        let catalog = test_catalog();
        let row = row(vec![("count", Some("many"))]);
        let result = ColumnStatistic::from_result_row(&row, catalog.as_ref());

        assert!(matches!(result, Err(StatisticsError::Analysis(_))));
    }
}
