//! In-memory backend for tests.
//!
//! Models tables, columns, indexes, foreign keys, seed rows, history and the
//! run lock without a SQL engine. Mutations behave like a strict SQL engine:
//! creating something that exists, or dropping something that does not, is an
//! error. Every schema mutation is appended to a log so tests can assert that
//! a run changed nothing.
//!
//! Failures can be injected per mutation (matched against the log entry) and
//! for metadata queries and history writes.

use crate::error::{DbError, DbResult};
use crate::traits::{
    AppliedRecord, Database, HistoryStore, LockInfo, LockStatus, RunLock, SchemaInspector,
    SchemaMutator,
};
use chrono::{DateTime, Utc};
use cm_core::{
    ChangesetId, ColumnDef, ForeignKeyDef, IndexDef, ObjectName, SchemaObject, SeedRow, SqlValue,
    TableDef,
};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

type Row = Vec<(ObjectName, SqlValue)>;

#[derive(Debug, Default)]
struct TableState {
    columns: Vec<ColumnDef>,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Keyed by normalized table name.
    tables: BTreeMap<String, TableState>,
    /// Keyed by (normalized table, normalized index).
    indexes: BTreeMap<(String, String), IndexDef>,
    /// Keyed by (normalized table, normalized constraint).
    foreign_keys: BTreeMap<(String, String), ForeignKeyDef>,
    history: BTreeMap<ChangesetId, AppliedRecord>,
    history_created: bool,
    lock: Option<LockInfo>,
    mutations: Vec<String>,
    failing_mutations: Vec<String>,
    fail_queries: bool,
    fail_history_writes: bool,
}

impl MemoryState {
    fn begin_mutation(&mut self, description: String) -> DbResult<()> {
        let upper = description.to_ascii_uppercase();
        if let Some(needle) = self
            .failing_mutations
            .iter()
            .find(|needle| upper.contains(needle.as_str()))
        {
            return Err(DbError::ExecutionError(format!(
                "injected failure on '{needle}': {description}"
            )));
        }
        self.mutations.push(description);
        Ok(())
    }

    fn table_mut(&mut self, table: &ObjectName) -> DbResult<&mut TableState> {
        self.tables
            .get_mut(&table.normalized())
            .ok_or_else(|| DbError::ExecutionError(format!("Table {table} does not exist")))
    }

    fn has_column(&self, table: &ObjectName, column: &ObjectName) -> bool {
        self.tables
            .get(&table.normalized())
            .is_some_and(|t| t.columns.iter().any(|c| c.name.matches(column)))
    }

    fn check_query(&self) -> DbResult<()> {
        if self.fail_queries {
            return Err(DbError::QueryError(
                "injected failure: metadata unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn add_foreign_key(&mut self, fk: &ForeignKeyDef) -> DbResult<()> {
        if !self.tables.contains_key(&fk.references_table.normalized()) {
            return Err(DbError::ExecutionError(format!(
                "Referenced table {} does not exist",
                fk.references_table
            )));
        }
        for column in &fk.references_columns {
            if !self.has_column(&fk.references_table, column) {
                return Err(DbError::ExecutionError(format!(
                    "Referenced column {}.{column} does not exist",
                    fk.references_table
                )));
            }
        }
        let key = (fk.table.normalized(), fk.name.normalized());
        if self.foreign_keys.contains_key(&key) {
            return Err(DbError::ExecutionError(format!(
                "Duplicate foreign key name {}",
                fk.name
            )));
        }
        self.foreign_keys.insert(key, fk.clone());
        Ok(())
    }
}

/// In-memory [`Database`] implementation
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> DbResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> T {
        let mut guard = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut *guard)
    }

    /// Every schema mutation performed so far, in order.
    pub fn mutation_log(&self) -> Vec<String> {
        self.with_state(|s| s.mutations.clone())
    }

    /// Number of schema mutations performed so far.
    pub fn mutation_count(&self) -> usize {
        self.with_state(|s| s.mutations.len())
    }

    /// Make every mutation whose log entry contains `needle` (case-insensitive) fail.
    pub fn fail_mutations_matching(&self, needle: &str) {
        let needle = needle.to_ascii_uppercase();
        self.with_state(|s| s.failing_mutations.push(needle));
    }

    /// Make metadata queries fail (or succeed again).
    pub fn fail_queries(&self, fail: bool) {
        self.with_state(|s| s.fail_queries = fail);
    }

    /// Make history appends and removals fail (or succeed again).
    pub fn fail_history_writes(&self, fail: bool) {
        self.with_state(|s| s.fail_history_writes = fail);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.with_state(|s| {
            s.failing_mutations.clear();
            s.fail_queries = false;
            s.fail_history_writes = false;
        });
    }

    /// How many columns of `table` match `column` case-insensitively.
    pub fn column_count(&self, table: &str, column: &str) -> usize {
        self.with_state(|s| {
            s.tables
                .get(&table.to_ascii_uppercase())
                .map(|t| {
                    t.columns
                        .iter()
                        .filter(|c| c.name.matches(column))
                        .count()
                })
                .unwrap_or(0)
        })
    }

    /// Names of all tables, normalized, in sorted order.
    pub fn table_names(&self) -> Vec<String> {
        self.with_state(|s| s.tables.keys().cloned().collect())
    }

    /// Number of rows in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.with_state(|s| {
            s.tables
                .get(&table.to_ascii_uppercase())
                .map(|t| t.rows.len())
                .unwrap_or(0)
        })
    }
}

impl SchemaInspector for MemoryBackend {
    fn object_exists(&self, object: &SchemaObject) -> DbResult<bool> {
        let state = self.state()?;
        state.check_query()?;
        let exists = match object {
            SchemaObject::Table { table } => state.tables.contains_key(&table.normalized()),
            SchemaObject::Column { table, column } => state.has_column(table, column),
            SchemaObject::Index { table, index } => state
                .indexes
                .contains_key(&(table.normalized(), index.normalized())),
            SchemaObject::ForeignKey { table, constraint } => state
                .foreign_keys
                .contains_key(&(table.normalized(), constraint.normalized())),
        };
        Ok(exists)
    }

    fn row_exists(
        &self,
        table: &ObjectName,
        key_column: &ObjectName,
        key: &SqlValue,
    ) -> DbResult<bool> {
        let state = self.state()?;
        state.check_query()?;
        let table_state = state
            .tables
            .get(&table.normalized())
            .ok_or_else(|| DbError::QueryError(format!("Table {table} does not exist")))?;
        Ok(table_state.rows.iter().any(|row| {
            row.iter()
                .any(|(col, value)| col.matches(key_column) && value == key)
        }))
    }
}

impl SchemaMutator for MemoryBackend {
    fn create_table(&self, table: &TableDef) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!("CREATE TABLE {}", table.name.normalized()))?;
        let key = table.name.normalized();
        if state.tables.contains_key(&key) {
            return Err(DbError::ExecutionError(format!(
                "Table {} already exists",
                table.name
            )));
        }
        state.tables.insert(
            key,
            TableState {
                columns: table.columns.clone(),
                rows: Vec::new(),
            },
        );
        for fk in &table.foreign_keys {
            if let Err(e) = state.add_foreign_key(fk) {
                state.tables.remove(&table.name.normalized());
                return Err(e);
            }
        }
        Ok(())
    }

    fn drop_table(&self, table: &ObjectName) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!("DROP TABLE {}", table.normalized()))?;
        let key = table.normalized();
        if !state.tables.contains_key(&key) {
            return Err(DbError::ExecutionError(format!(
                "Table {table} does not exist"
            )));
        }
        if let Some(fk) = state
            .foreign_keys
            .values()
            .find(|fk| fk.references_table.matches(table) && !fk.table.matches(table))
        {
            return Err(DbError::ExecutionError(format!(
                "Cannot drop table {table}: referenced by foreign key {} on {}",
                fk.name, fk.table
            )));
        }
        state.tables.remove(&key);
        state.indexes.retain(|(t, _), _| *t != key);
        state.foreign_keys.retain(|(t, _), _| *t != key);
        Ok(())
    }

    fn add_column(&self, table: &ObjectName, column: &ColumnDef) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!(
            "ADD COLUMN {}.{}",
            table.normalized(),
            column.name.normalized()
        ))?;
        let table_state = state.table_mut(table)?;
        if table_state.columns.iter().any(|c| c.name.matches(&column.name)) {
            return Err(DbError::ExecutionError(format!(
                "Duplicate column name '{}'",
                column.name
            )));
        }
        table_state.columns.push(column.clone());
        Ok(())
    }

    fn drop_column(&self, table: &ObjectName, column: &ObjectName) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!(
            "DROP COLUMN {}.{}",
            table.normalized(),
            column.normalized()
        ))?;
        let table_state = state.table_mut(table)?;
        let before = table_state.columns.len();
        table_state.columns.retain(|c| !c.name.matches(column));
        if table_state.columns.len() == before {
            return Err(DbError::ExecutionError(format!(
                "Column {table}.{column} does not exist"
            )));
        }
        for row in &mut table_state.rows {
            row.retain(|(c, _)| !c.matches(column));
        }
        Ok(())
    }

    fn create_index(&self, index: &IndexDef) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!(
            "CREATE INDEX {} ON {}",
            index.name.normalized(),
            index.table.normalized()
        ))?;
        for column in &index.columns {
            if !state.has_column(&index.table, column) {
                return Err(DbError::ExecutionError(format!(
                    "Column {}.{column} does not exist",
                    index.table
                )));
            }
        }
        let key = (index.table.normalized(), index.name.normalized());
        if state.indexes.contains_key(&key) {
            return Err(DbError::ExecutionError(format!(
                "Index {} already exists",
                index.name
            )));
        }
        state.indexes.insert(key, index.clone());
        Ok(())
    }

    fn drop_index(&self, table: &ObjectName, index: &ObjectName) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!(
            "DROP INDEX {} ON {}",
            index.normalized(),
            table.normalized()
        ))?;
        if state
            .indexes
            .remove(&(table.normalized(), index.normalized()))
            .is_none()
        {
            return Err(DbError::ExecutionError(format!(
                "Index {index} does not exist"
            )));
        }
        Ok(())
    }

    fn add_foreign_key(&self, foreign_key: &ForeignKeyDef) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!(
            "ADD FOREIGN KEY {} ON {}",
            foreign_key.name.normalized(),
            foreign_key.table.normalized()
        ))?;
        for column in &foreign_key.columns {
            if !state.has_column(&foreign_key.table, column) {
                return Err(DbError::ExecutionError(format!(
                    "Column {}.{column} does not exist",
                    foreign_key.table
                )));
            }
        }
        state.add_foreign_key(foreign_key)
    }

    fn drop_foreign_key(&self, table: &ObjectName, constraint: &ObjectName) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!(
            "DROP FOREIGN KEY {} ON {}",
            constraint.normalized(),
            table.normalized()
        ))?;
        if state
            .foreign_keys
            .remove(&(table.normalized(), constraint.normalized()))
            .is_none()
        {
            return Err(DbError::ExecutionError(format!(
                "Foreign key {constraint} does not exist on {table}"
            )));
        }
        Ok(())
    }

    fn insert_row(&self, row: &SeedRow) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!("INSERT INTO {}", row.table.normalized()))?;
        for (column, _) in &row.values {
            if !state.has_column(&row.table, column) {
                return Err(DbError::ExecutionError(format!(
                    "Column {}.{column} does not exist",
                    row.table
                )));
            }
        }
        let table_state = state.table_mut(&row.table)?;
        table_state.rows.push(row.values.clone());
        Ok(())
    }

    fn delete_row(
        &self,
        table: &ObjectName,
        key_column: &ObjectName,
        key: &SqlValue,
    ) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!("DELETE FROM {}", table.normalized()))?;
        let table_state = state.table_mut(table)?;
        table_state.rows.retain(|row| {
            !row.iter()
                .any(|(col, value)| col.matches(key_column) && value == key)
        });
        Ok(())
    }

    fn execute_sql(&self, sql: &str) -> DbResult<()> {
        let mut state = self.state()?;
        state.begin_mutation(format!("SQL {}", sql.trim()))
    }
}

impl HistoryStore for MemoryBackend {
    fn ensure_history_table(&self) -> DbResult<()> {
        let mut state = self.state()?;
        state.history_created = true;
        Ok(())
    }

    fn history_table_exists(&self) -> DbResult<bool> {
        let state = self.state()?;
        state.check_query()?;
        Ok(state.history_created)
    }

    fn applied_records(&self) -> DbResult<Vec<AppliedRecord>> {
        let state = self.state()?;
        state.check_query()?;
        if !state.history_created {
            return Err(DbError::QueryError(
                "history table does not exist".to_string(),
            ));
        }
        Ok(state.history.values().cloned().collect())
    }

    fn record_applied(&self, record: &AppliedRecord) -> DbResult<()> {
        let mut state = self.state()?;
        if state.fail_history_writes {
            return Err(DbError::ExecutionError(
                "injected failure: history write".to_string(),
            ));
        }
        if state.history.contains_key(&record.changeset_id) {
            return Err(DbError::ExecutionError(format!(
                "Duplicate key: {} already recorded",
                record.changeset_id
            )));
        }
        state
            .history
            .insert(record.changeset_id.clone(), record.clone());
        Ok(())
    }

    fn remove_record(&self, id: &ChangesetId) -> DbResult<()> {
        let mut state = self.state()?;
        if state.fail_history_writes {
            return Err(DbError::ExecutionError(
                "injected failure: history write".to_string(),
            ));
        }
        state.history.remove(id);
        Ok(())
    }
}

impl RunLock for MemoryBackend {
    fn try_acquire_lock(&self, holder: &str, at: DateTime<Utc>) -> DbResult<LockStatus> {
        let mut state = self.state()?;
        if let Some(info) = &state.lock {
            return Ok(LockStatus::Held(info.clone()));
        }
        state.lock = Some(LockInfo {
            holder: holder.to_string(),
            acquired_at: at,
        });
        Ok(LockStatus::Acquired)
    }

    fn release_lock(&self, holder: &str) -> DbResult<bool> {
        let mut state = self.state()?;
        if state.lock.as_ref().is_some_and(|info| info.holder == holder) {
            state.lock = None;
            return Ok(true);
        }
        Ok(false)
    }

    fn force_release_lock(&self) -> DbResult<bool> {
        let mut state = self.state()?;
        Ok(state.lock.take().is_some())
    }

    fn lock_holder(&self) -> DbResult<Option<LockInfo>> {
        Ok(self.state()?.lock.clone())
    }
}

impl Database for MemoryBackend {
    fn db_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
