use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use crate::catalog::mutable::MutableCatalog;
use crate::catalog::{CatalogRef, Table, TableBuilder};
use crate::config::StatisticsConfig;
use crate::datatypes::DataType;
use crate::error::ExecutionError;
use crate::query::Statement;
use crate::repository::{StatisticsCache, StatisticsRepository, TableStatsListener};
use crate::statistics::alter::AnalysisJob;
use crate::statistics::{ColumnStatistic, StatisticsCacheKey};
use crate::store::memory::MemoryStatsStore;
use crate::store::{ResultRow, StatsStore, StoreRef};

static INIT_LOG: Once = Once::new();

pub const TEST_DB_ID: i64 = 1;
pub const TEST_DB: &str = "db";
/// Table `db.t` with columns `a`, `s`, `d`, `ts` and partitions `p1`, `p2`.
pub const TEST_TABLE_ID: i64 = 10;
pub const TEST_TABLE: &str = "t";
/// Table `db.u` with a single column `x` and no partitions.
pub const OTHER_TABLE_ID: i64 = 20;

pub fn init_log() {
    INIT_LOG.call_once(pretty_env_logger::init);
}

/// Returns a catalog with tables used by tests.
pub fn test_catalog() -> CatalogRef {
    init_log();

    let catalog = MutableCatalog::new();
    catalog.add_database(TEST_DB_ID, TEST_DB).unwrap();

    let table = TableBuilder::new(TEST_TABLE_ID, TEST_TABLE)
        .add_column("a", DataType::Int32)
        .add_column("s", DataType::String)
        .add_column("d", DataType::Date)
        .add_column("ts", DataType::DateTime)
        .add_partition(100, "p1")
        .add_partition(101, "p2")
        .build()
        .unwrap();
    catalog.add_table(TEST_DB, table).unwrap();

    let table = TableBuilder::new(OTHER_TABLE_ID, "u").add_column("x", DataType::Float64).build().unwrap();
    catalog.add_table(TEST_DB, table).unwrap();

    Arc::new(catalog)
}

/// Creates a repository backed by the given store.
pub fn new_repository(store: StoreRef, config: StatisticsConfig) -> StatisticsRepository {
    StatisticsRepository::new(store, test_catalog(), config).unwrap()
}

/// Creates a repository backed by a new [MemoryStatsStore].
pub fn memory_repository(config: StatisticsConfig) -> (Arc<MemoryStatsStore>, StatisticsRepository) {
    let store = Arc::new(MemoryStatsStore::new());
    let repository = new_repository(store.clone(), config);
    (store, repository)
}

/// A [StatisticsCache] that records all updates.
#[derive(Debug, Default)]
pub struct RecordingCache {
    updates: Mutex<Vec<(StatisticsCacheKey, ColumnStatistic)>>,
}

impl RecordingCache {
    pub fn updates(&self) -> Vec<(StatisticsCacheKey, ColumnStatistic)> {
        self.updates.lock().unwrap().clone()
    }
}

impl StatisticsCache for RecordingCache {
    fn update_column_statistics(&self, key: &StatisticsCacheKey, statistic: &ColumnStatistic) {
        self.updates.lock().unwrap().push((key.clone(), statistic.clone()));
    }
}

/// A [TableStatsListener] that records all notifications.
#[derive(Debug, Default)]
pub struct RecordingListener {
    notifications: Mutex<Vec<(AnalysisJob, i64)>>,
}

impl RecordingListener {
    /// Returns jobs and identifiers of tables this listener has been notified about.
    pub fn notifications(&self) -> Vec<(AnalysisJob, i64)> {
        self.notifications.lock().unwrap().clone()
    }
}

impl TableStatsListener for RecordingListener {
    fn on_table_stats_updated(&self, job: &AnalysisJob, table: &Table) {
        self.notifications.lock().unwrap().push((job.clone(), table.id()));
    }
}

/// A store that returns prepared results of queries and accepts all updates.
#[derive(Debug, Default)]
pub struct FixedRowsStore {
    results: Mutex<VecDeque<Vec<ResultRow>>>,
    statements: Mutex<Vec<Statement>>,
}

impl FixedRowsStore {
    /// Creates a store that returns the given results of queries in the given order.
    /// Queries return no rows once the results are exhausted.
    pub fn new(results: Vec<Vec<ResultRow>>) -> Self {
        FixedRowsStore {
            results: Mutex::new(results.into_iter().collect()),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }
}

impl StatsStore for FixedRowsStore {
    fn execute_query(&self, statement: &Statement) -> Result<Vec<ResultRow>, ExecutionError> {
        self.statements.lock().unwrap().push(statement.clone());
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn execute_update(&self, statement: &Statement) -> Result<(), ExecutionError> {
        self.statements.lock().unwrap().push(statement.clone());
        Ok(())
    }
}

/// A store that executes the first `n` updates and fails all subsequent ones.
#[derive(Debug)]
pub struct FailingStore {
    inner: MemoryStatsStore,
    remaining: Mutex<usize>,
}

impl FailingStore {
    pub fn new(inner: MemoryStatsStore, n: usize) -> Self {
        FailingStore {
            inner,
            remaining: Mutex::new(n),
        }
    }

    pub fn inner(&self) -> &MemoryStatsStore {
        &self.inner
    }
}

impl StatsStore for FailingStore {
    fn execute_query(&self, statement: &Statement) -> Result<Vec<ResultRow>, ExecutionError> {
        self.inner.execute_query(statement)
    }

    fn execute_update(&self, statement: &Statement) -> Result<(), ExecutionError> {
        let mut remaining = self.remaining.lock().unwrap();
        if *remaining == 0 {
            let cause = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
            return Err(ExecutionError::with_cause("Failed to execute update", cause));
        }
        *remaining -= 1;
        self.inner.execute_update(statement)
    }
}
