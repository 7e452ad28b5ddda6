//! cm-db - Database abstraction layer for clinic-migrate
//!
//! This crate provides the `Database` trait the migration runner talks to,
//! split by concern (inspection, mutation, history, run lock), and a DuckDB
//! implementation. An in-memory backend that models schema state without a
//! SQL engine is available behind the `test-support` feature.

pub mod duckdb;
pub mod error;
#[cfg(feature = "test-support")]
pub mod memory;
pub(crate) mod render;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
#[cfg(feature = "test-support")]
pub use memory::MemoryBackend;
pub use traits::{
    AppliedRecord, Database, HistoryStore, LockInfo, LockStatus, RunLock, SchemaInspector,
    SchemaMutator,
};
