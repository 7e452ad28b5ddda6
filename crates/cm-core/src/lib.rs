//! cm-core - Core library for clinic-migrate
//!
//! This crate provides the shared types used across all clinic-migrate
//! components: changeset identifiers, schema object definitions with
//! case-insensitive name normalization, and `migrate.yml` configuration.

pub mod changeset_id;
pub mod config;
pub mod error;
mod identifier;
pub mod schema;

pub use changeset_id::ChangesetId;
pub use config::{Config, DatabaseConfig, LockConfig};
pub use error::{CoreError, CoreResult};
pub use schema::{
    ColumnDef, ColumnType, ForeignKeyDef, IndexDef, ObjectName, ReferentialAction, SchemaObject,
    SeedRow, SqlValue, TableDef,
};
