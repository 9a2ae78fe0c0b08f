//! Database catalog.
//!
//! The statistics repository uses the catalog to resolve table names to identifiers,
//! columns to their types and partition names to partition identifiers.

use std::any::Any;
use std::collections::HashSet;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use crate::datatypes::DataType;
use crate::error::StatisticsError;

pub mod mutable;

pub type CatalogRef = Arc<dyn Catalog>;
pub type DatabaseRef = Arc<dyn Database>;
pub type TableRef = Arc<Table>;
pub type ColumnRef = Arc<Column>;

/// The name of the default catalog.
pub const INTERNAL_CATALOG: &str = "internal";

/// Provides access to database objects statistics are stored for.
pub trait Catalog: Debug + Sync + Send {
    /// Returns this catalog as [`Any`](std::any::Any) in order it can be downcast to its implementation.
    fn as_any(&self) -> &dyn Any;

    /// The identifier of this catalog.
    fn id(&self) -> i64;

    /// The name of this catalog.
    fn name(&self) -> &str;

    /// Returns databases available in the catalog.
    fn get_databases(&self) -> Vec<DatabaseRef>;

    /// Returns a database with the given name.
    fn get_database_by_name(&self, name: &str) -> Option<DatabaseRef>;

    /// Returns a table with the given identifier.
    fn get_table_by_id(&self, table_id: i64) -> Option<TableRef> {
        self.get_databases().iter().find_map(|db| db.get_table_by_id(table_id))
    }

    /// Resolves the given name to the catalog, the database and the table it refers to.
    /// Returns an [analysis error](StatisticsError::Analysis) if any of them does not exist.
    fn resolve(&self, name: &TableName) -> Result<DbObjects, StatisticsError> {
        if let Some(catalog) = name.catalog() {
            if !catalog.eq_ignore_ascii_case(self.name()) {
                return Err(StatisticsError::analysis(format!("Catalog does not exist. Catalog: {}", catalog)));
            }
        }
        let db = self
            .get_database_by_name(name.db())
            .ok_or_else(|| StatisticsError::analysis(format!("Database does not exist. Database: {}", name.db())))?;
        let table = db
            .get_table_by_name(name.table())
            .ok_or_else(|| StatisticsError::analysis(format!("Table does not exist. Table: {}", name)))?;

        Ok(DbObjects {
            catalog_id: self.id(),
            db,
            table,
        })
    }
}

/// Represents a database.
pub trait Database: Debug + Sync + Send {
    /// Returns this database as [`Any`](std::any::Any) in order it can be downcast to its implementation.
    fn as_any(&self) -> &dyn Any;

    /// The identifier of this database.
    fn id(&self) -> i64;

    /// The name of this database.
    fn name(&self) -> &str;

    /// Returns tables registered in this database.
    fn get_tables(&self) -> Vec<TableRef>;

    /// Returns a table with the given name.
    fn get_table_by_name(&self, name: &str) -> Option<TableRef>;

    /// Returns a table with the given identifier.
    fn get_table_by_id(&self, table_id: i64) -> Option<TableRef> {
        self.get_tables().into_iter().find(|t| t.id() == table_id)
    }
}

/// A possibly qualified name of a table: `[catalog.]db.table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    catalog: Option<String>,
    db: String,
    table: String,
}

impl TableName {
    /// Creates a name of a table from the given database.
    pub fn new(db: &str, table: &str) -> Self {
        TableName {
            catalog: None,
            db: db.to_string(),
            table: table.to_string(),
        }
    }

    /// Creates a fully qualified name of a table.
    pub fn qualified(catalog: &str, db: &str, table: &str) -> Self {
        TableName {
            catalog: Some(catalog.to_string()),
            db: db.to_string(),
            table: table.to_string(),
        }
    }

    pub fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    pub fn db(&self) -> &str {
        &self.db
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(catalog) = self.catalog.as_ref() {
            write!(f, "{}.", catalog)?;
        }
        write!(f, "{}.{}", self.db, self.table)
    }
}

/// Database objects a [table name](TableName) has been resolved to.
#[derive(Debug, Clone)]
pub struct DbObjects {
    pub catalog_id: i64,
    pub db: DatabaseRef,
    pub table: TableRef,
}

/// Represents a database table.
#[derive(Debug, Clone)]
pub struct Table {
    id: i64,
    name: String,
    columns: Vec<ColumnRef>,
    partitions: Vec<Partition>,
}

impl Table {
    /// The identifier of this table.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// The name of this table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The columns of this table.
    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    /// Returns a column with the given name. Names are compared case-insensitively.
    pub fn get_column(&self, name: &str) -> Option<ColumnRef> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name)).cloned()
    }

    /// The partitions of this table.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Returns a partition with the given name. Names are compared case-insensitively.
    pub fn get_partition(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name.eq_ignore_ascii_case(name))
    }
}

/// A partition of a database table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    id: i64,
    name: String,
}

impl Partition {
    /// Creates a partition with the given identifier and name.
    pub fn new(id: i64, name: &str) -> Self {
        Partition {
            id,
            name: name.to_string(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A builder to create instances of a [table].
///
/// [table]: crate::catalog::Table
#[derive(Debug, Clone)]
pub struct TableBuilder {
    id: i64,
    name: String,
    columns: Vec<ColumnRef>,
    partitions: Vec<Partition>,
}

impl TableBuilder {
    /// Creates a builder for a table with the given identifier and name.
    pub fn new(id: i64, name: &str) -> Self {
        TableBuilder {
            id,
            name: name.to_string(),
            columns: Vec::new(),
            partitions: Vec::new(),
        }
    }

    /// Adds a column with the given name and data type to this table.
    pub fn add_column(mut self, name: &str, data_type: DataType) -> TableBuilder {
        let column = Column::new(name.to_string(), Some(self.name.clone()), data_type);
        self.columns.push(Arc::new(column));
        self
    }

    /// Adds a partition with the given identifier and name to this table.
    pub fn add_partition(mut self, id: i64, name: &str) -> TableBuilder {
        self.partitions.push(Partition::new(id, name));
        self
    }

    /// Creates an instance of a [table] with previously specified properties.
    ///
    /// [table]: crate::catalog::Table
    pub fn build(self) -> Result<Table, StatisticsError> {
        if self.columns.is_empty() {
            return Err(StatisticsError::argument("No columns has been specified"));
        }

        let mut names = HashSet::new();
        for col in self.columns.iter() {
            let col_name = col.name();
            if !names.insert(col_name.to_ascii_lowercase()) {
                let message = format!("Column already exists. Column: {} table: {}", col_name, self.name);
                return Err(StatisticsError::argument(message));
            }
        }

        let mut partition_ids = HashSet::new();
        let mut partition_names = HashSet::new();
        for p in self.partitions.iter() {
            if !partition_ids.insert(p.id) || !partition_names.insert(p.name.to_ascii_lowercase()) {
                let message = format!("Partition already exists. Partition: {} table: {}", p.name, self.name);
                return Err(StatisticsError::argument(message));
            }
        }

        Ok(Table {
            id: self.id,
            name: self.name,
            columns: self.columns,
            partitions: self.partitions,
        })
    }
}

/// A column of a database table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    table: Option<String>,
    data_type: DataType,
}

impl Column {
    pub(crate) fn new(column_name: String, table_name: Option<String>, data_type: DataType) -> Self {
        Column {
            name: column_name,
            table: table_name,
            data_type,
        }
    }

    /// The name of this column.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name of the table this column belongs to.
    pub fn table(&self) -> Option<&String> {
        self.table.as_ref()
    }

    /// The data type of this column.
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }
}

pub(crate) fn __ensure_type_is_sync_send<T>()
where
    T: Sync + Send,
{
}
