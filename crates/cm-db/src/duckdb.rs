//! DuckDB database backend implementation

use crate::error::{DbError, DbResult};
use crate::render;
use crate::traits::{
    AppliedRecord, Database, HistoryStore, LockInfo, LockStatus, RunLock, SchemaInspector,
    SchemaMutator,
};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use cm_core::{
    ChangesetId, ColumnDef, ForeignKeyDef, IndexDef, ObjectName, SchemaObject, SeedRow, SqlValue,
    TableDef,
};
use duckdb::types::Value;
use duckdb::{params, params_from_iter, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const TIMESTAMP_PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// The single row of the lock table always uses this id.
const LOCK_ROW_ID: i32 = 1;

/// DuckDB database backend
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
    history_table: String,
    lock_table: String,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self::with_connection(conn))
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{e}: {}", path.display())))?;
        Ok(Self::with_connection(conn))
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            history_table: "__schema_history".to_string(),
            lock_table: "__schema_lock".to_string(),
        }
    }

    /// Override the history table name
    pub fn with_history_table(mut self, name: impl Into<String>) -> Self {
        self.history_table = name.into();
        self
    }

    /// Override the lock table name
    pub fn with_lock_table(mut self, name: impl Into<String>) -> Self {
        self.lock_table = name.into();
        self
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute one statement without parameters
    fn execute_sync(&self, sql: &str) -> DbResult<()> {
        log::debug!("duckdb: {sql}");
        let conn = self.conn()?;
        conn.execute(sql, [])
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;
        Ok(())
    }

    /// Run a `SELECT COUNT(*)` with string parameters
    fn count_sync(&self, sql: &str, args: &[String]) -> DbResult<i64> {
        let conn = self.conn()?;
        conn.query_row(sql, params_from_iter(args.iter()), |row| row.get(0))
            .map_err(|e| DbError::QueryError(format!("{e}: {sql}")))
    }

    fn ensure_lock_table(conn: &Connection, lock_table: &str) -> DbResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                 lock_id     INTEGER PRIMARY KEY,
                 holder      VARCHAR NOT NULL,
                 acquired_at TIMESTAMP NOT NULL
             )",
            render::quote_ident(lock_table)
        );
        conn.execute_batch(&sql)
            .map_err(|e| DbError::ExecutionError(format!("failed to create lock table: {e}")))
    }

    fn read_lock(conn: &Connection, lock_table: &str) -> DbResult<Option<LockInfo>> {
        let sql = format!(
            "SELECT holder, CAST(acquired_at AS VARCHAR) FROM {} WHERE lock_id = ?",
            render::quote_ident(lock_table)
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DbError::QueryError(format!("{e}: {sql}")))?;
        let mut rows = stmt
            .query_map(params![LOCK_ROW_ID], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| DbError::QueryError(format!("{e}: {sql}")))?;
        match rows.next() {
            Some(row) => {
                let (holder, acquired_at) =
                    row.map_err(|e| DbError::QueryError(format!("failed to read lock: {e}")))?;
                Ok(Some(LockInfo {
                    holder,
                    acquired_at: parse_timestamp(&acquired_at)?,
                }))
            }
            None => Ok(None),
        }
    }
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> DbResult<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw, TIMESTAMP_PARSE_FORMAT)
        .map_err(|e| DbError::Internal(format!("unreadable timestamp '{raw}': {e}")))?;
    Ok(Utc.from_utc_datetime(&naive))
}

fn to_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Bool(b) => Value::Boolean(*b),
        SqlValue::Int(i) => Value::BigInt(*i),
        SqlValue::Text(s) => Value::Text(s.clone()),
    }
}

impl SchemaInspector for DuckDbBackend {
    fn object_exists(&self, object: &SchemaObject) -> DbResult<bool> {
        let (sql, args) = match object {
            SchemaObject::Table { table } => (
                "SELECT COUNT(*) FROM information_schema.tables
                 WHERE table_schema = 'main' AND upper(table_name) = ?",
                vec![table.normalized()],
            ),
            SchemaObject::Column { table, column } => (
                "SELECT COUNT(*) FROM information_schema.columns
                 WHERE table_schema = 'main' AND upper(table_name) = ? AND upper(column_name) = ?",
                vec![table.normalized(), column.normalized()],
            ),
            SchemaObject::Index { table, index } => (
                "SELECT COUNT(*) FROM duckdb_indexes()
                 WHERE schema_name = 'main' AND upper(table_name) = ? AND upper(index_name) = ?",
                vec![table.normalized(), index.normalized()],
            ),
            // DuckDB drops the names of inline foreign keys, so a lookup by
            // name would always report absent.
            SchemaObject::ForeignKey { table, constraint } => {
                return Err(DbError::NotImplemented {
                    backend: "duckdb".to_string(),
                    feature: format!("foreign key lookup by name ({table}.{constraint})"),
                })
            }
        };
        Ok(self.count_sync(sql, &args)? > 0)
    }

    fn row_exists(
        &self,
        table: &ObjectName,
        key_column: &ObjectName,
        key: &SqlValue,
    ) -> DbResult<bool> {
        let sql = render::count_rows_sql(table, key_column);
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(&sql, params![to_value(key)], |row| row.get(0))
            .map_err(|e| DbError::QueryError(format!("{e}: {sql}")))?;
        Ok(count > 0)
    }
}

impl SchemaMutator for DuckDbBackend {
    fn create_table(&self, table: &TableDef) -> DbResult<()> {
        self.execute_sync(&render::create_table_sql(table)?)
    }

    fn drop_table(&self, table: &ObjectName) -> DbResult<()> {
        self.execute_sync(&render::drop_table_sql(table))
    }

    fn add_column(&self, table: &ObjectName, column: &ColumnDef) -> DbResult<()> {
        self.execute_sync(&render::add_column_sql(table, column))
    }

    fn drop_column(&self, table: &ObjectName, column: &ObjectName) -> DbResult<()> {
        self.execute_sync(&render::drop_column_sql(table, column))
    }

    fn create_index(&self, index: &IndexDef) -> DbResult<()> {
        self.execute_sync(&render::create_index_sql(index))
    }

    fn drop_index(&self, _table: &ObjectName, index: &ObjectName) -> DbResult<()> {
        self.execute_sync(&render::drop_index_sql(index))
    }

    fn add_foreign_key(&self, foreign_key: &ForeignKeyDef) -> DbResult<()> {
        // DuckDB only accepts foreign keys inside CREATE TABLE.
        Err(DbError::NotImplemented {
            backend: "duckdb".to_string(),
            feature: format!("ALTER TABLE ADD FOREIGN KEY ({})", foreign_key.name),
        })
    }

    fn drop_foreign_key(&self, _table: &ObjectName, constraint: &ObjectName) -> DbResult<()> {
        Err(DbError::NotImplemented {
            backend: "duckdb".to_string(),
            feature: format!("ALTER TABLE DROP CONSTRAINT ({constraint})"),
        })
    }

    fn insert_row(&self, row: &SeedRow) -> DbResult<()> {
        let sql = render::insert_row_sql(row);
        log::debug!("duckdb: {sql}");
        let values: Vec<Value> = row.values.iter().map(|(_, v)| to_value(v)).collect();
        let conn = self.conn()?;
        conn.execute(&sql, params_from_iter(values.iter()))
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;
        Ok(())
    }

    fn delete_row(
        &self,
        table: &ObjectName,
        key_column: &ObjectName,
        key: &SqlValue,
    ) -> DbResult<()> {
        let sql = render::delete_row_sql(table, key_column);
        log::debug!("duckdb: {sql}");
        let conn = self.conn()?;
        conn.execute(&sql, params![to_value(key)])
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))?;
        Ok(())
    }

    fn execute_sql(&self, sql: &str) -> DbResult<()> {
        log::debug!("duckdb: {sql}");
        let conn = self.conn()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(format!("{e}: {sql}")))
    }
}

impl HistoryStore for DuckDbBackend {
    fn ensure_history_table(&self) -> DbResult<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                 changeset_id VARCHAR PRIMARY KEY,
                 name         VARCHAR NOT NULL,
                 applied_at   TIMESTAMP NOT NULL
             )",
            render::quote_ident(&self.history_table)
        );
        let conn = self.conn()?;
        conn.execute_batch(&sql)
            .map_err(|e| DbError::ExecutionError(format!("failed to create history table: {e}")))
    }

    fn history_table_exists(&self) -> DbResult<bool> {
        let count = self.count_sync(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = 'main' AND table_name = ?",
            &[self.history_table.clone()],
        )?;
        Ok(count > 0)
    }

    fn applied_records(&self) -> DbResult<Vec<AppliedRecord>> {
        let sql = format!(
            "SELECT changeset_id, name, CAST(applied_at AS VARCHAR) FROM {} ORDER BY changeset_id",
            render::quote_ident(&self.history_table)
        );
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| DbError::QueryError(format!("{e}: {sql}")))?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| DbError::QueryError(format!("{e}: {sql}")))?;

        let mut records = Vec::new();
        for row in rows {
            let (id, name, applied_at) =
                row.map_err(|e| DbError::QueryError(format!("failed to read history: {e}")))?;
            let changeset_id = ChangesetId::parse(id)
                .map_err(|e| DbError::Internal(format!("corrupt history row: {e}")))?;
            records.push(AppliedRecord {
                changeset_id,
                name,
                applied_at: parse_timestamp(&applied_at)?,
            });
        }
        Ok(records)
    }

    fn record_applied(&self, record: &AppliedRecord) -> DbResult<()> {
        let sql = format!(
            "INSERT INTO {} (changeset_id, name, applied_at) VALUES (?, ?, CAST(? AS TIMESTAMP))",
            render::quote_ident(&self.history_table)
        );
        let conn = self.conn()?;
        conn.execute(
            &sql,
            params![
                record.changeset_id.as_str(),
                record.name,
                format_timestamp(&record.applied_at)
            ],
        )
        .map_err(|e| {
            DbError::ExecutionError(format!("failed to record {}: {e}", record.changeset_id))
        })?;
        Ok(())
    }

    fn remove_record(&self, id: &ChangesetId) -> DbResult<()> {
        let sql = format!(
            "DELETE FROM {} WHERE changeset_id = ?",
            render::quote_ident(&self.history_table)
        );
        let conn = self.conn()?;
        conn.execute(&sql, params![id.as_str()])
            .map_err(|e| DbError::ExecutionError(format!("failed to remove {id}: {e}")))?;
        Ok(())
    }
}

impl RunLock for DuckDbBackend {
    fn try_acquire_lock(&self, holder: &str, at: DateTime<Utc>) -> DbResult<LockStatus> {
        let conn = self.conn()?;
        Self::ensure_lock_table(&conn, &self.lock_table)?;

        let sql = format!(
            "INSERT INTO {} (lock_id, holder, acquired_at) VALUES (?, ?, CAST(? AS TIMESTAMP))",
            render::quote_ident(&self.lock_table)
        );
        match conn.execute(&sql, params![LOCK_ROW_ID, holder, format_timestamp(&at)]) {
            Ok(_) => Ok(LockStatus::Acquired),
            // A primary key violation means the row is already there.
            Err(insert_err) => match Self::read_lock(&conn, &self.lock_table)? {
                Some(info) => Ok(LockStatus::Held(info)),
                None => Err(DbError::ExecutionError(format!(
                    "failed to acquire lock: {insert_err}"
                ))),
            },
        }
    }

    fn release_lock(&self, holder: &str) -> DbResult<bool> {
        let conn = self.conn()?;
        Self::ensure_lock_table(&conn, &self.lock_table)?;
        let sql = format!(
            "DELETE FROM {} WHERE lock_id = ? AND holder = ?",
            render::quote_ident(&self.lock_table)
        );
        let removed = conn
            .execute(&sql, params![LOCK_ROW_ID, holder])
            .map_err(|e| DbError::ExecutionError(format!("failed to release lock: {e}")))?;
        Ok(removed > 0)
    }

    fn force_release_lock(&self) -> DbResult<bool> {
        let conn = self.conn()?;
        Self::ensure_lock_table(&conn, &self.lock_table)?;
        let sql = format!(
            "DELETE FROM {} WHERE lock_id = ?",
            render::quote_ident(&self.lock_table)
        );
        let removed = conn
            .execute(&sql, params![LOCK_ROW_ID])
            .map_err(|e| DbError::ExecutionError(format!("failed to release lock: {e}")))?;
        Ok(removed > 0)
    }

    fn lock_holder(&self) -> DbResult<Option<LockInfo>> {
        let conn = self.conn()?;
        Self::ensure_lock_table(&conn, &self.lock_table)?;
        Self::read_lock(&conn, &self.lock_table)
    }
}

impl Database for DuckDbBackend {
    fn db_type(&self) -> &'static str {
        "duckdb"
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
