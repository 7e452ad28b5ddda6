//! Changesets: ordered forward/backward schema transformations.

use crate::error::MigrateResult;
use crate::schema_manager::SchemaManager;
use cm_core::ChangesetId;
use serde::Serialize;
use std::fmt;

/// Which half of a changeset is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "up"),
            Direction::Down => write!(f, "down"),
        }
    }
}

/// One forward/backward schema-mutation pair.
///
/// Both halves should go through the `ensure_*` steps of [`SchemaManager`] so
/// that re-running a half-applied changeset converges on the same schema.
pub trait Changeset: Send + Sync {
    /// Ordered identifier, e.g. `20240115093000_initial_schema`.
    fn id(&self) -> ChangesetId;

    /// Human-readable name recorded in history.
    fn name(&self) -> String {
        self.id().name().to_string()
    }

    /// Forward transformation.
    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()>;

    /// Reverse transformation.
    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()>;
}

/// A changeset made of raw SQL scripts.
///
/// The scripts are opaque to the runner: they run unguarded, so authors of
/// SQL changesets must write their own `IF [NOT] EXISTS` clauses.
#[derive(Debug, Clone)]
pub struct SqlChangeset {
    id: ChangesetId,
    up_sql: String,
    down_sql: String,
}

impl SqlChangeset {
    pub fn new(id: ChangesetId, up_sql: impl Into<String>, down_sql: impl Into<String>) -> Self {
        Self {
            id,
            up_sql: up_sql.into(),
            down_sql: down_sql.into(),
        }
    }

    pub fn up_sql(&self) -> &str {
        &self.up_sql
    }

    pub fn down_sql(&self) -> &str {
        &self.down_sql
    }

    fn run(&self, schema: &SchemaManager<'_>, sql: &str, direction: Direction) -> MigrateResult<()> {
        if sql.trim().is_empty() {
            log::warn!("Changeset {} has an empty {direction} script", self.id);
            return Ok(());
        }
        schema.execute(sql)?;
        Ok(())
    }
}

impl Changeset for SqlChangeset {
    fn id(&self) -> ChangesetId {
        self.id.clone()
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        self.run(schema, &self.up_sql, Direction::Up)
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        self.run(schema, &self.down_sql, Direction::Down)
    }
}

#[cfg(test)]
#[path = "changeset_test.rs"]
mod tests;
