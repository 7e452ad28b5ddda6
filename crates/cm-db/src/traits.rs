//! Database trait definitions
//!
//! The runner needs four capabilities from a backend, each its own trait so a
//! backend's surface reads by concern. [`Database`] bundles them.

use crate::error::DbResult;
use chrono::{DateTime, Utc};
use cm_core::{
    ChangesetId, ColumnDef, ForeignKeyDef, IndexDef, ObjectName, SchemaObject, SeedRow, SqlValue,
    TableDef,
};

/// One row of the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRecord {
    pub changeset_id: ChangesetId,
    pub name: String,
    pub applied_at: DateTime<Utc>,
}

/// Current holder of the run lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
}

/// Outcome of a lock attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    Acquired,
    Held(LockInfo),
}

/// Live schema metadata queries.
///
/// Names are compared case-insensitively (normalized to uppercase). Answers
/// are never cached.
pub trait SchemaInspector {
    /// Check whether a table, column, index or foreign key exists
    fn object_exists(&self, object: &SchemaObject) -> DbResult<bool>;

    /// Check whether `table` has a row whose `key_column` equals `key`
    fn row_exists(&self, table: &ObjectName, key_column: &ObjectName, key: &SqlValue)
        -> DbResult<bool>;
}

/// Schema mutations. Implementations do not check existence first; a
/// mutation against an object already in the target state is an error.
pub trait SchemaMutator {
    /// Create a table with its inline foreign keys
    fn create_table(&self, table: &TableDef) -> DbResult<()>;

    /// Drop a table
    fn drop_table(&self, table: &ObjectName) -> DbResult<()>;

    /// Add a column to an existing table
    fn add_column(&self, table: &ObjectName, column: &ColumnDef) -> DbResult<()>;

    /// Drop a column
    fn drop_column(&self, table: &ObjectName, column: &ObjectName) -> DbResult<()>;

    /// Create an index
    fn create_index(&self, index: &IndexDef) -> DbResult<()>;

    /// Drop an index
    fn drop_index(&self, table: &ObjectName, index: &ObjectName) -> DbResult<()>;

    /// Add a foreign key to an existing table
    fn add_foreign_key(&self, foreign_key: &ForeignKeyDef) -> DbResult<()>;

    /// Drop a foreign key
    fn drop_foreign_key(&self, table: &ObjectName, constraint: &ObjectName) -> DbResult<()>;

    /// Insert a seed row
    fn insert_row(&self, row: &SeedRow) -> DbResult<()>;

    /// Delete rows whose `key_column` equals `key`
    fn delete_row(&self, table: &ObjectName, key_column: &ObjectName, key: &SqlValue)
        -> DbResult<()>;

    /// Execute raw SQL (one or more statements)
    fn execute_sql(&self, sql: &str) -> DbResult<()>;
}

/// Persisted log of applied changesets.
pub trait HistoryStore {
    /// Create the history table if absent
    fn ensure_history_table(&self) -> DbResult<()>;

    /// Whether the history table exists, without creating it
    fn history_table_exists(&self) -> DbResult<bool>;

    /// All records, ordered by changeset id
    fn applied_records(&self) -> DbResult<Vec<AppliedRecord>>;

    /// Append one record
    fn record_applied(&self, record: &AppliedRecord) -> DbResult<()>;

    /// Remove the record for `id`
    fn remove_record(&self, id: &ChangesetId) -> DbResult<()>;
}

/// Single-row advisory lock around migration runs.
pub trait RunLock {
    /// Take the lock for `holder` unless someone already holds it
    fn try_acquire_lock(&self, holder: &str, at: DateTime<Utc>) -> DbResult<LockStatus>;

    /// Release the lock if `holder` owns it. Returns whether a row was removed.
    fn release_lock(&self, holder: &str) -> DbResult<bool>;

    /// Remove the lock regardless of holder. Returns whether a row was removed.
    fn force_release_lock(&self) -> DbResult<bool>;

    /// Current holder, if any
    fn lock_holder(&self) -> DbResult<Option<LockInfo>>;
}

/// Database abstraction used by the migration runner
///
/// Execution is sequential; `Send + Sync` lets a backend be shared behind an
/// `Arc` by the hosting application.
pub trait Database: SchemaInspector + SchemaMutator + HistoryStore + RunLock + Send + Sync {
    /// Database type identifier for logging
    fn db_type(&self) -> &'static str;
}
