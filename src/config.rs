//! Configuration of the statistics repository.

use serde::Deserialize;

use crate::error::StatisticsError;

/// The default maximum number of elements in the `IN` predicate of a delete statement.
pub const DEFAULT_MAX_IN_ELEMENTS_OF_DELETE: usize = 1024;
/// The default number of entries of the statistics cache.
pub const DEFAULT_STATS_CACHE_SIZE: usize = 500_000;
/// The default name of the database that holds statistics tables.
pub const DEFAULT_INTERNAL_DB_NAME: &str = "__internal_schema";

/// Options of a [StatisticsRepository](crate::repository::StatisticsRepository).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StatisticsConfig {
    /// The maximum number of literals in a single `IN (...)` predicate of a delete statement.
    pub max_allowed_in_element_num_of_delete: usize,
    /// The number of recently updated statistics loaded to warm up the statistics cache.
    pub stats_cache_size: usize,
    /// The database statistics tables belong to.
    pub internal_db_name: String,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        StatisticsConfig {
            max_allowed_in_element_num_of_delete: DEFAULT_MAX_IN_ELEMENTS_OF_DELETE,
            stats_cache_size: DEFAULT_STATS_CACHE_SIZE,
            internal_db_name: DEFAULT_INTERNAL_DB_NAME.to_string(),
        }
    }
}

impl StatisticsConfig {
    /// Reads a configuration from the given YAML document.
    /// Options missing from the document are set to their default values.
    pub fn from_yaml(text: &str) -> Result<Self, StatisticsError> {
        let config: StatisticsConfig = serde_yaml::from_str(text)
            .map_err(|e| StatisticsError::argument(format!("Invalid statistics config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values of this configuration are valid.
    pub fn validate(&self) -> Result<(), StatisticsError> {
        if self.max_allowed_in_element_num_of_delete == 0 {
            return Err(StatisticsError::argument("max_allowed_in_element_num_of_delete must be positive"));
        }
        if self.stats_cache_size == 0 {
            return Err(StatisticsError::argument("stats_cache_size must be positive"));
        }
        if self.internal_db_name.is_empty() {
            return Err(StatisticsError::argument("internal_db_name must not be empty"));
        }
        Ok(())
    }
}
