//! Persistence of column statistics.
//!
//! [StatisticsRepository] reads and writes statistics tables through a [statistics store](crate::store::StatsStore).
//! Rows are never updated in place: every change of statistics inserts a new row and readers
//! use the latest row of every identifier.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use crate::catalog::{CatalogRef, Table, TableName};
use crate::config::StatisticsConfig;
use crate::error::StatisticsError;
use crate::query::batch::for_each_batch;
use crate::query::template::Params;
use crate::query::{
    Delete, Expr, Insert, Literal, Order, Predicate, QualifiedTable, Select, Statement, StatsTable, STATS_ID_COLUMNS,
    UPDATE_TIME_COLUMN,
};
use crate::scalar::ScalarValue;
use crate::statistics::alter::{AlterColumnStats, AnalysisJob};
use crate::statistics::{ColumnStatistic, Histogram, StatisticsCacheKey, StatisticsId, StatsId, NO_INDEX};
use crate::store::{ResultRow, StoreRef};


/// A cache of column statistics.
pub trait StatisticsCache: Debug {
    /// Replaces cached statistics of the given column.
    fn update_column_statistics(&self, key: &StatisticsCacheKey, statistic: &ColumnStatistic);
}

/// Receives notifications about changes of statistics of tables.
pub trait TableStatsListener: Debug {
    /// Called when statistics of the given table have been changed by the given job.
    fn on_table_stats_updated(&self, job: &AnalysisJob, table: &Table);
}

/// [StatisticsCache] and [TableStatsListener] that ignore all updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl StatisticsCache for NoopListener {
    fn update_column_statistics(&self, _key: &StatisticsCacheKey, _statistic: &ColumnStatistic) {}
}

impl TableStatsListener for NoopListener {
    fn on_table_stats_updated(&self, _job: &AnalysisJob, _table: &Table) {}
}

/// Components notified when statistics are altered.
#[derive(Debug, Clone, Copy)]
pub struct StatisticsListeners<'a> {
    pub cache: &'a dyn StatisticsCache,
    pub table_stats: &'a dyn TableStatsListener,
}

impl<'a> StatisticsListeners<'a> {
    pub fn new(cache: &'a dyn StatisticsCache, table_stats: &'a dyn TableStatsListener) -> Self {
        StatisticsListeners { cache, table_stats }
    }
}

impl StatisticsListeners<'static> {
    /// Listeners that ignore all notifications.
    pub fn noop() -> Self {
        StatisticsListeners {
            cache: &NoopListener,
            table_stats: &NoopListener,
        }
    }
}

/// The result of [StatisticsRepository::alter_column_statistics].
#[derive(Debug, Clone)]
pub struct AlteredStatistics {
    /// Statistics that have been written.
    pub statistic: ColumnStatistic,
    /// Identifiers of the rows that have been written.
    pub ids: Vec<StatisticsId>,
    /// Whether the statistics cache has been updated.
    /// Statistics of partitions are written to the statistics tables only.
    pub cache_updated: bool,
}

/// Reads and writes column statistics and histograms.
#[derive(Debug)]
pub struct StatisticsRepository {
    store: StoreRef,
    catalog: CatalogRef,
    config: StatisticsConfig,
}

impl StatisticsRepository {
    /// Creates a repository that uses the given store and catalog.
    /// Returns an error if the given configuration is not valid.
    pub fn new(store: StoreRef, catalog: CatalogRef, config: StatisticsConfig) -> Result<Self, StatisticsError> {
        config.validate()?;
        Ok(StatisticsRepository { store, catalog, config })
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// Returns statistics of the given column of a table or an index.
    /// Returns [unknown](ColumnStatistic::unknown) statistics if there are no statistics for that column.
    pub fn query_column_statistics_by_name(
        &self,
        table_id: i64,
        index_id: i64,
        column: &str,
    ) -> Result<ColumnStatistic, StatisticsError> {
        let id = StatisticsId::new(table_id, index_id, column);
        match self.query_unique(StatsTable::ColumnStatistics, &id)? {
            Some(row) => ColumnStatistic::from_result_row(&row, self.catalog.as_ref()),
            None => Ok(ColumnStatistic::unknown()),
        }
    }

    /// Returns the histogram of the given column of a table or an index.
    /// Returns the [unknown](Histogram::unknown) histogram if there is no histogram for that column.
    pub fn query_column_histogram_by_name(
        &self,
        table_id: i64,
        index_id: i64,
        column: &str,
    ) -> Result<Histogram, StatisticsError> {
        let id = StatisticsId::new(table_id, index_id, column);
        match self.query_unique(StatsTable::Histogram, &id)? {
            Some(row) => Histogram::from_result_row(&row, self.catalog.as_ref()),
            None => Ok(Histogram::unknown()),
        }
    }

    /// Returns the row with table level statistics of the given column.
    pub fn query_column_statistic_by_id(&self, table_id: i64, column: &str) -> Result<Option<ResultRow>, StatisticsError> {
        let id = StatisticsId::new(table_id, NO_INDEX, column);
        self.query_unique(StatsTable::ColumnStatistics, &id)
    }

    /// Returns the row with the histogram of the given column.
    pub fn query_column_histogram_by_id(&self, table_id: i64, column: &str) -> Result<Option<ResultRow>, StatisticsError> {
        let id = StatisticsId::new(table_id, NO_INDEX, column);
        self.query_unique(StatsTable::Histogram, &id)
    }

    /// Returns rows with statistics of the given column in the given partitions.
    pub fn query_partition_statistics(
        &self,
        table_id: i64,
        column: &str,
        partition_ids: &HashSet<i64>,
    ) -> Result<Vec<ResultRow>, StatisticsError> {
        if partition_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut partition_ids: Vec<i64> = partition_ids.iter().copied().collect();
        partition_ids.sort_unstable();

        let ids = partition_ids.into_iter().map(|part_id| {
            let id = StatisticsId::new(table_id, NO_INDEX, column).with_partition(part_id);
            Literal::string(id.to_string())
        });
        let select = Select::from(self.table(StatsTable::ColumnStatistics)).filter(Predicate::in_list(Expr::column("id"), ids));
        self.query(select)
    }

    /// Returns statistics of the given column in the partitions with the given names.
    /// Returns an [analysis error](StatisticsError::Analysis) if the table or one of the partitions does not exist.
    pub fn query_column_statistics_by_partitions(
        &self,
        table_name: &TableName,
        column: &str,
        partition_names: &[String],
    ) -> Result<Vec<ColumnStatistic>, StatisticsError> {
        let objects = self.catalog.resolve(table_name)?;
        let partition_ids = resolve_partitions(&objects.table, partition_names)?;
        let partition_ids: HashSet<i64> = partition_ids.into_iter().collect();
        let column = match objects.table.get_column(column) {
            Some(c) => c.name().to_string(),
            None => column.to_string(),
        };

        let rows = self.query_partition_statistics(objects.table.id(), &column, &partition_ids)?;
        rows.iter().map(|row| ColumnStatistic::from_result_row(row, self.catalog.as_ref())).collect()
    }

    /// Deletes statistics of the given partitions.
    pub fn drop_statistics_by_partitions(&self, partition_ids: &HashSet<i64>) -> Result<(), StatisticsError> {
        if partition_ids.is_empty() {
            return Ok(());
        }
        let mut partition_ids: Vec<i64> = partition_ids.iter().copied().collect();
        partition_ids.sort_unstable();
        let num_partitions = partition_ids.len();

        let delete = Delete {
            table: self.table(StatsTable::ColumnStatistics),
            filter: Predicate::in_list(Expr::column("part_id"), partition_ids.into_iter().map(Literal::Int)),
        };
        self.update(delete.into())?;

        log::info!("Deleted statistics of {} partitions", num_partitions);
        Ok(())
    }

    /// Deletes column statistics and histograms of the given columns of a table.
    /// Does nothing if `columns` is `None`.
    pub fn drop_statistics(&self, table_id: i64, columns: Option<&HashSet<String>>) -> Result<(), StatisticsError> {
        let columns = match columns {
            Some(columns) => columns,
            None => return Ok(()),
        };
        self.drop_statistics_by_col_name(table_id, columns, StatsTable::ColumnStatistics)?;
        self.drop_statistics_by_col_name(table_id, columns, StatsTable::Histogram)?;
        Ok(())
    }

    /// Deletes rows of the given columns of a table from the given statistics table.
    ///
    /// Columns are deleted in batches: a delete statement has at most
    /// [max_allowed_in_element_num_of_delete](StatisticsConfig::max_allowed_in_element_num_of_delete)
    /// columns in its `IN` predicate. Batches deleted before a failure stay deleted.
    ///
    /// Returns the number of executed delete statements.
    pub fn drop_statistics_by_col_name(
        &self,
        table_id: i64,
        columns: &HashSet<String>,
        table: StatsTable,
    ) -> Result<usize, StatisticsError> {
        let mut columns: Vec<&String> = columns.iter().collect();
        columns.sort();

        let num_columns = columns.len();
        let values = columns.into_iter().map(|c| Literal::string(c.as_str()));
        let num_batches = for_each_batch(values, self.config.max_allowed_in_element_num_of_delete, |batch| {
            let delete = Delete {
                table: self.table(table),
                filter: Predicate::eq("tbl_id", table_id).and(Predicate::in_list(Expr::column("col_id"), batch)),
            };
            self.update(delete.into())
        })?;

        if num_batches > 0 {
            log::info!(
                "Deleted statistics of {} columns of table {} from {} in {} batches",
                num_columns,
                table_id,
                table.name(),
                num_batches
            );
        }
        Ok(num_batches)
    }

    /// Replaces statistics of a column with values supplied by a user.
    ///
    /// Table level statistics are written as a single row. Then the statistics cache is updated and
    /// the table statistics listener is notified. Partition level statistics are written as one row
    /// per partition, listeners are not notified in this case.
    ///
    /// Names of the table, the column and the partitions are resolved before anything is written.
    pub fn alter_column_statistics(
        &self,
        alter: &AlterColumnStats,
        listeners: &StatisticsListeners,
    ) -> Result<AlteredStatistics, StatisticsError> {
        let objects = self.catalog.resolve(alter.table())?;
        let table = &objects.table;
        let column = table.get_column(alter.column()).ok_or_else(|| {
            StatisticsError::analysis(format!("Column does not exist. Column: {} table: {}", alter.column(), alter.table()))
        })?;
        let partition_ids = resolve_partitions(table, alter.partitions())?;
        let statistic = alter.merge(&column)?;

        let table_stats_id = StatisticsId::new(table.id(), NO_INDEX, column.name());
        let ids: Vec<StatisticsId> = if partition_ids.is_empty() {
            vec![table_stats_id]
        } else {
            partition_ids.iter().map(|p| table_stats_id.clone().with_partition(*p)).collect()
        };

        for id in ids.iter() {
            let params = statistics_row(objects.catalog_id, objects.db.id(), id, &statistic);
            let insert = Insert::new(self.table(StatsTable::ColumnStatistics), params)?;
            self.update(insert.into())?;
        }

        let cache_updated = if partition_ids.is_empty() {
            let key = StatisticsCacheKey::new(table.id(), NO_INDEX, column.name());
            listeners.cache.update_column_statistics(&key, &statistic);
            listeners.table_stats.on_table_stats_updated(&AnalysisJob::manual_alter(), table);
            true
        } else {
            log::debug!("Statistics cache is not updated for statistics of {} partitions", partition_ids.len());
            false
        };

        log::info!("Altered statistics of column {} of table {}. Rows written: {}", column.name(), alter.table(), ids.len());

        Ok(AlteredStatistics {
            statistic,
            ids,
            cache_updated,
        })
    }

    /// Returns table level statistics that have been updated most recently.
    /// Returns at most [stats_cache_size](StatisticsConfig::stats_cache_size) rows.
    pub fn fetch_recent_stats_updated_col(&self) -> Result<Vec<ResultRow>, StatisticsError> {
        let select = Select::from(self.table(StatsTable::ColumnStatistics))
            .filter(Predicate::is_null("part_id"))
            .order_by(UPDATE_TIME_COLUMN, Order::Desc)
            .limit(self.config.stats_cache_size as u64);
        self.query(select)
    }

    /// Returns a page of identity columns of all statistics ordered by their update time.
    pub fn fetch_stats_full_name(&self, limit: u64, offset: u64) -> Result<Vec<ResultRow>, StatisticsError> {
        let select = Select::from(self.table(StatsTable::ColumnStatistics))
            .columns(&STATS_ID_COLUMNS)
            .order_by(UPDATE_TIME_COLUMN, Order::Asc)
            .limit(limit)
            .offset(offset);
        self.query(select)
    }

    /// Returns identifiers of partitions statistics are stored for grouped by column.
    /// Rows with malformed identity columns are skipped.
    pub fn fetch_col_and_parts_for_stats(&self, table_id: i64) -> Result<HashMap<String, HashSet<i64>>, StatisticsError> {
        let select = Select::from(self.table(StatsTable::ColumnStatistics))
            .columns(&STATS_ID_COLUMNS)
            .filter(Predicate::eq("tbl_id", table_id).and(Predicate::is_not_null("part_id")));
        let rows = self.query(select)?;

        let mut result: HashMap<String, HashSet<i64>> = HashMap::new();
        for row in rows.iter() {
            match StatsId::from_row(row) {
                Ok(StatsId {
                    col_id,
                    part_id: Some(part_id),
                    ..
                }) => {
                    result.entry(col_id).or_default().insert(part_id);
                }
                Ok(stats_id) => log::warn!("Statistics row {} has no partition", stats_id.id),
                Err(err) => log::warn!("Skipping malformed statistics row {:?}: {}", row.get("id"), err),
            }
        }
        Ok(result)
    }

    /// Returns all rows with statistics of the given column of a table or an index.
    pub fn load_col_stats(&self, table_id: i64, index_id: i64, column: &str) -> Result<Vec<ResultRow>, StatisticsError> {
        let id = StatisticsId::new(table_id, index_id, column);
        let select = Select::from(self.table(StatsTable::ColumnStatistics)).filter(Predicate::eq("id", id.to_string()));
        self.query(select)
    }

    /// Returns partition level statistics of the given columns.
    pub fn load_part_stats(&self, keys: &[StatisticsCacheKey]) -> Result<Vec<ResultRow>, StatisticsError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let key = Expr::concat_ws("-", &["tbl_id", "idx_id", "col_id"]);
        let values = keys.iter().map(|k| Literal::string(k.to_string()));
        let select = Select::from(self.table(StatsTable::ColumnStatistics))
            .filter(Predicate::in_list(key, values).and(Predicate::is_not_null("part_id")));
        self.query(select)
    }

    fn table(&self, table: StatsTable) -> QualifiedTable {
        QualifiedTable::new(&self.config.internal_db_name, table)
    }

    // Returns the only row with the given identifier.
    fn query_unique(&self, table: StatsTable, id: &StatisticsId) -> Result<Option<ResultRow>, StatisticsError> {
        let select = Select::from(self.table(table)).filter(Predicate::eq("id", id.to_string()));
        let mut rows = self.query(select)?;
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(StatisticsError::internal(format!(
                "Statistics identifier {} matches {} rows in {}",
                id,
                n,
                table.name()
            ))),
        }
    }

    fn query(&self, select: Select) -> Result<Vec<ResultRow>, StatisticsError> {
        let statement = Statement::from(select);
        log::debug!("Executing query: {}", statement);
        let rows = self.store.execute_query(&statement)?;
        Ok(rows)
    }

    fn update(&self, statement: Statement) -> Result<(), StatisticsError> {
        log::debug!("Executing update: {}", statement);
        self.store.execute_update(&statement).map_err(StatisticsError::ddl)
    }
}

fn resolve_partitions(table: &Table, names: &[String]) -> Result<Vec<i64>, StatisticsError> {
    names
        .iter()
        .map(|name| {
            table.get_partition(name).map(|p| p.id()).ok_or_else(|| {
                StatisticsError::analysis(format!("Partition does not exist. Partition: {} table: {}", name, table.name()))
            })
        })
        .collect()
}

fn statistics_row(catalog_id: i64, db_id: i64, id: &StatisticsId, statistic: &ColumnStatistic) -> Params {
    let bound = |value: Option<&ScalarValue>| match value {
        Some(value) => Literal::string(value.to_string()),
        None => Literal::Null,
    };
    let mut params = Params::new();
    params.insert("id".to_string(), Literal::string(id.to_string()));
    params.insert("catalog_id".to_string(), Literal::string(catalog_id.to_string()));
    params.insert("db_id".to_string(), Literal::string(db_id.to_string()));
    params.insert("tbl_id".to_string(), Literal::string(id.table_id().to_string()));
    params.insert("idx_id".to_string(), Literal::string(id.index_id().to_string()));
    params.insert("col_id".to_string(), Literal::string(id.column()));
    params.insert(
        "part_id".to_string(),
        id.partition_id().map(|p| Literal::string(p.to_string())).unwrap_or(Literal::Null),
    );
    params.insert("count".to_string(), Literal::optional_double(statistic.count()));
    params.insert("ndv".to_string(), Literal::optional_double(statistic.ndv()));
    params.insert("null_count".to_string(), Literal::optional_double(statistic.num_nulls()));
    params.insert("min".to_string(), bound(statistic.min_expr()));
    params.insert("max".to_string(), bound(statistic.max_expr()));
    params.insert("data_size".to_string(), Literal::optional_double(statistic.data_size()));
    params
}
