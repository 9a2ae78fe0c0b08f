//! Histograms.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::datatypes::DataType;
use crate::error::StatisticsError;
use crate::scalar::{readable_value, ScalarValue};
use crate::store::ResultRow;

/// A bucket of a [Histogram].
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub lower: ScalarValue,
    pub upper: ScalarValue,
    /// The number of values in this bucket.
    pub count: f64,
    /// The number of values in the preceding buckets.
    pub pre_sum: f64,
    pub ndv: f64,
}

// The persisted form of a bucket.
#[derive(Debug, Serialize, Deserialize)]
struct BucketJson {
    lower: String,
    upper: String,
    count: f64,
    pre_sum: f64,
    ndv: f64,
}

/// A histogram of values of a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    data_type: Option<DataType>,
    sample_rate: f64,
    buckets: Vec<Bucket>,
}

impl Histogram {
    /// Creates a histogram of values of the given type.
    pub fn new(data_type: DataType, sample_rate: f64, buckets: Vec<Bucket>) -> Self {
        Histogram {
            data_type: Some(data_type),
            sample_rate,
            buckets,
        }
    }

    /// Returns the histogram of a column no histogram is available for.
    pub fn unknown() -> Self {
        Histogram {
            data_type: None,
            sample_rate: 0.0,
            buckets: Vec::new(),
        }
    }

    /// Whether this histogram is the [unknown](Histogram::unknown) histogram.
    pub fn is_unknown(&self) -> bool {
        self.data_type.is_none()
    }

    pub fn data_type(&self) -> Option<&DataType> {
        self.data_type.as_ref()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Returns the persisted form of the buckets of this histogram: a JSON array of
    /// `{"lower", "upper", "count", "pre_sum", "ndv"}` objects.
    pub fn buckets_to_json(&self) -> Result<String, StatisticsError> {
        let buckets: Vec<BucketJson> = self
            .buckets
            .iter()
            .map(|b| BucketJson {
                lower: b.lower.to_string(),
                upper: b.upper.to_string(),
                count: b.count,
                pre_sum: b.pre_sum,
                ndv: b.ndv,
            })
            .collect();
        serde_json::to_string(&buckets).map_err(|e| StatisticsError::internal(format!("Failed to write buckets: {}", e)))
    }

    /// Reads a histogram from a row of the histogram table.
    /// If the table or the column no longer exist or the buckets can not be read as values of the column type
    /// this method returns the [unknown](Histogram::unknown) histogram.
    pub fn from_result_row(row: &ResultRow, catalog: &dyn Catalog) -> Result<Self, StatisticsError> {
        let tbl_id = row
            .parse::<i64>("tbl_id")?
            .ok_or_else(|| StatisticsError::analysis("Histogram row has no value for column tbl_id"))?;
        let col_id = row.get_required("col_id")?;

        let column = match catalog.get_table_by_id(tbl_id).and_then(|t| t.get_column(col_id)) {
            Some(column) => column,
            None => {
                log::warn!("Histogram refers to an unknown column. Table id: {} column: {}", tbl_id, col_id);
                return Ok(Histogram::unknown());
            }
        };
        let data_type = *column.data_type();
        let sample_rate = row.parse::<f64>("sample_rate")?.unwrap_or(1.0);

        let buckets = match row.get("buckets") {
            Some(json) => match read_buckets(&data_type, json) {
                Ok(buckets) => buckets,
                Err(err) => {
                    log::warn!("Failed to read histogram of column {}: {}", col_id, err);
                    return Ok(Histogram::unknown());
                }
            },
            None => Vec::new(),
        };

        Ok(Histogram::new(data_type, sample_rate, buckets))
    }
}

fn read_buckets(data_type: &DataType, json: &str) -> Result<Vec<Bucket>, StatisticsError> {
    let buckets: Vec<BucketJson> = serde_json::from_str(json)
        .map_err(|e| StatisticsError::analysis(format!("Invalid histogram buckets: {}", e)))?;
    buckets
        .into_iter()
        .map(|b| {
            Ok(Bucket {
                lower: readable_value(data_type, &b.lower)?,
                upper: readable_value(data_type, &b.upper)?,
                count: b.count,
                pre_sum: b.pre_sum,
                ndv: b.ndv,
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::test_catalog;

    fn histogram() -> Histogram {
        Histogram::new(
            DataType::Int32,
            0.5,
            vec![
                Bucket {
                    lower: ScalarValue::Int32(1),
                    upper: ScalarValue::Int32(10),
                    count: 5.0,
                    pre_sum: 0.0,
                    ndv: 5.0,
                },
                Bucket {
                    lower: ScalarValue::Int32(11),
                    upper: ScalarValue::Int32(20),
                    count: 3.0,
                    pre_sum: 5.0,
                    ndv: 2.0,
                },
            ],
        )
    }

    #[test]
    fn test_from_result_row() -> Result<(), StatisticsError> {
        let catalog = test_catalog();
        let expected = histogram();
        let buckets = expected.buckets_to_json()?;
        let row = ResultRow::new(vec![
            ("tbl_id", Some("10")),
            ("col_id", Some("a")),
            ("sample_rate", Some("0.5")),
            ("buckets", Some(buckets.as_str())),
        ]);

        let actual = Histogram::from_result_row(&row, catalog.as_ref())?;
        assert_eq!(actual, expected);
        Ok(())
    }

    #[test]
    fn test_invalid_buckets() -> Result<(), StatisticsError> {
        let catalog = test_catalog();
        let row = ResultRow::new(vec![("tbl_id", Some("10")), ("col_id", Some("a")), ("buckets", Some("[{"))]);

        assert!(Histogram::from_result_row(&row, catalog.as_ref())?.is_unknown());
        Ok(())
    }

    #[test]
    fn test_bucket_bounds_of_another_type() -> Result<(), StatisticsError> {
        let catalog = test_catalog();
        let buckets = r#"[{"lower":"x","upper":"y","count":1.0,"pre_sum":0.0,"ndv":1.0}]"#;
        let row = ResultRow::new(vec![("tbl_id", Some("10")), ("col_id", Some("a")), ("buckets", Some(buckets))]);

        assert!(Histogram::from_result_row(&row, catalog.as_ref())?.is_unknown());
        Ok(())
    }

    #[test]
    fn test_invalid_sample_rate() {
        let catalog = test_catalog();
        let row = ResultRow::new(vec![("tbl_id", Some("10")), ("col_id", Some("a")), ("sample_rate", Some("half"))]);

        let result = Histogram::from_result_row(&row, catalog.as_ref());
        assert!(matches!(result, Err(StatisticsError::Analysis(_))));
    }

    #[test]
    fn test_unknown_column() -> Result<(), StatisticsError> {
        let catalog = test_catalog();
        let row = ResultRow::new(vec![("tbl_id", Some("999")), ("col_id", Some("a"))]);

        assert!(Histogram::from_result_row(&row, catalog.as_ref())?.is_unknown());
        Ok(())
    }
}
