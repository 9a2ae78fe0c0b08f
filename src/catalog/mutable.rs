//! Mutable implementation of a database catalog.

use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, RwLock};

use crate::catalog::{__ensure_type_is_sync_send, Catalog, Database, DatabaseRef, Table, TableRef, INTERNAL_CATALOG};
use crate::error::StatisticsError;

/// A [database catalog] that stores database objects in memory and provides operation to add/remove database objects.
///
/// # Error handling
///
/// Errors returned by methods of the `MutableCatalog` are recoverable.
///
/// [database catalog]: crate::catalog::Catalog
#[derive(Debug)]
pub struct MutableCatalog {
    id: i64,
    name: String,
    databases: RwLock<HashMap<ObjectId, DatabaseRef>>,
}

impl MutableCatalog {
    /// Creates an instance of the [internal catalog](INTERNAL_CATALOG) with identifier `0`.
    pub fn new() -> Self {
        MutableCatalog::with_id(0, INTERNAL_CATALOG)
    }

    /// Creates an empty catalog with the given identifier and name.
    pub fn with_id(id: i64, name: &str) -> Self {
        MutableCatalog {
            id,
            name: name.to_string(),
            databases: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a database with the given identifier and name.
    /// If the database already exists this method returns an error.
    pub fn add_database(&self, id: i64, name: &str) -> Result<(), StatisticsError> {
        let mut databases = self.databases.write().unwrap();
        if databases.values().any(|db| db.id() == id) {
            return Err(StatisticsError::argument(format!("Database id is already in use. Id: {}", id)));
        }
        match databases.entry(ObjectId::from(name)) {
            Entry::Occupied(_) => Err(StatisticsError::argument(format!("Database already exists. Database: {}", name))),
            Entry::Vacant(v) => {
                v.insert(Arc::new(MutableDatabase::new(id, name)));
                Ok(())
            }
        }
    }

    /// Adds the given table to the specified database.
    /// If the database does not exist or the table already exists this method returns an error.
    pub fn add_table(&self, db: &str, table: Table) -> Result<(), StatisticsError> {
        let databases = self.databases.read().unwrap();
        if let Some(database) = databases.get(&ObjectId::from(db)) {
            let database = MutableDatabase::from_ref(database);
            database.add_table(table)
        } else {
            Err(StatisticsError::argument(format!("Database does not exist. Database: {}", db)))
        }
    }

    /// Remove a database table with name `table` from the specified database.
    /// If the database or the table do not exist this method returns an error.
    pub fn remove_table(&self, db: &str, table: &str) -> Result<(), StatisticsError> {
        let databases = self.databases.read().unwrap();
        if let Some(database) = databases.get(&ObjectId::from(db)) {
            let database = MutableDatabase::from_ref(database);
            database.remove_table(table)
        } else {
            Err(StatisticsError::argument(format!("Database does not exist. Database: {}", db)))
        }
    }
}

impl Default for MutableCatalog {
    fn default() -> Self {
        MutableCatalog::new()
    }
}

// see https://github.com/rust-lang/rust-clippy/issues/6066
#[allow(clippy::needless_collect)]
impl Catalog for MutableCatalog {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_databases(&self) -> Vec<DatabaseRef> {
        let databases = self.databases.read().unwrap();
        databases.values().cloned().collect::<Vec<DatabaseRef>>()
    }

    fn get_database_by_name(&self, name: &str) -> Option<DatabaseRef> {
        let databases = self.databases.read().unwrap();
        databases.get(&ObjectId::from(name)).cloned()
    }
}

/// A [database](Database) that stores tables in memory and provides operation to add/remove them.
///
/// # Error handling
///
/// Errors returned by methods of the `MutableDatabase` are recoverable.
#[derive(Debug)]
pub struct MutableDatabase {
    id: i64,
    name: String,
    tables: RwLock<HashMap<ObjectId, TableRef>>,
}

impl MutableDatabase {
    fn new(id: i64, name: &str) -> Self {
        MutableDatabase {
            id,
            name: name.to_string(),
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn from_ref(database: &DatabaseRef) -> &MutableDatabase {
        database
            .as_any()
            .downcast_ref::<MutableDatabase>()
            .unwrap_or_else(|| panic!("Unable to downcast to MutableDatabase: {:?}", database))
    }

    /// Adds the given table to this database. If a table with the same name or the same identifier
    /// already exists this method return an error.
    pub fn add_table(&self, table: Table) -> Result<(), StatisticsError> {
        let mut tables = self.tables.write().unwrap();
        if tables.values().any(|t| t.id() == table.id()) {
            let message = format!("Add table: Table id is already in use. Table: {} id: {}", table.name(), table.id());
            return Err(StatisticsError::argument(message));
        }
        match tables.entry(ObjectId::from(table.name())) {
            Entry::Occupied(_) => {
                Err(StatisticsError::argument(format!("Add table: Table already exists. Table: {}", table.name())))
            }
            Entry::Vacant(v) => {
                v.insert(Arc::new(table));
                Ok(())
            }
        }
    }

    /// Remove a table with the give name. If the table does not exist this method returns an error.
    pub fn remove_table(&self, name: &str) -> Result<(), StatisticsError> {
        let mut tables = self.tables.write().unwrap();
        if tables.remove(&ObjectId::from(name)).is_some() {
            Ok(())
        } else {
            Err(StatisticsError::argument(format!("Remove table: Table does not exist. Table: {}", name)))
        }
    }
}

#[allow(clippy::needless_collect)]
impl Database for MutableDatabase {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn get_tables(&self) -> Vec<TableRef> {
        let tables = self.tables.read().unwrap();
        tables.values().cloned().collect::<Vec<TableRef>>()
    }

    fn get_table_by_name(&self, name: &str) -> Option<TableRef> {
        let tables = self.tables.read().unwrap();
        tables.get(&ObjectId::from(name)).cloned()
    }
}

#[derive(Debug, Eq, PartialEq, Hash)]
struct ObjectId {
    id: CaseInsensitiveString,
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        ObjectId {
            id: CaseInsensitiveString(String::from(id)),
        }
    }
}

#[derive(Debug)]
struct CaseInsensitiveString(String);

impl PartialEq for CaseInsensitiveString {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for CaseInsensitiveString {}

impl Hash for CaseInsensitiveString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.0.as_bytes() {
            c.to_ascii_lowercase().hash(state)
        }
    }
}

#[allow(dead_code)]
fn __type_system_guarantees() {
    __ensure_type_is_sync_send::<MutableCatalog>();
    __ensure_type_is_sync_send::<MutableDatabase>();
}
