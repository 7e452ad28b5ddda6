//! Idempotent schema steps.
//!
//! Every `ensure_*` method queries the live schema for its object immediately
//! before acting. When the object is already in the target state (present for
//! an add, absent for a drop) the step reports [`StepOutcome::AlreadyInState`]
//! and mutates nothing. Existence is never cached between steps: a changeset
//! re-run after a crash sees whatever its earlier steps already did.

use crate::error::{MigrateError, MigrateResult};
use cm_core::{
    ColumnDef, ForeignKeyDef, IndexDef, ObjectName, SchemaObject, SeedRow, SqlValue, TableDef,
};
use cm_db::{Database, DbResult};
use serde::Serialize;
use std::cell::RefCell;

/// Result of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// The step mutated the schema.
    Applied,
    /// The target state already held; nothing was done.
    AlreadyInState,
}

/// One recorded step of a changeset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub description: String,
    pub outcome: StepOutcome,
}

/// Schema access handed to a changeset's `up` / `down`.
pub struct SchemaManager<'a> {
    db: &'a dyn Database,
    steps: RefCell<Vec<StepReport>>,
}

impl<'a> SchemaManager<'a> {
    pub fn new(db: &'a dyn Database) -> Self {
        Self {
            db,
            steps: RefCell::new(Vec::new()),
        }
    }

    /// Steps recorded so far.
    pub fn steps(&self) -> Vec<StepReport> {
        self.steps.borrow().clone()
    }

    pub fn into_steps(self) -> Vec<StepReport> {
        self.steps.into_inner()
    }

    fn record(&self, description: String, outcome: StepOutcome) {
        self.steps.borrow_mut().push(StepReport {
            description,
            outcome,
        });
    }

    fn exists(&self, object: &SchemaObject) -> MigrateResult<bool> {
        self.db
            .object_exists(object)
            .map_err(|source| MigrateError::SchemaQueryFailure {
                object: object.to_string(),
                source,
            })
    }

    /// Shared check-then-act for schema objects.
    fn ensure(
        &self,
        object: SchemaObject,
        want_present: bool,
        mutate: impl FnOnce() -> DbResult<()>,
    ) -> MigrateResult<StepOutcome> {
        let action = if want_present { "create" } else { "drop" };
        if self.exists(&object)? == want_present {
            log::info!(
                "{object} already {}, skipping {action}",
                if want_present { "present" } else { "absent" }
            );
            self.record(format!("{action} {object}"), StepOutcome::AlreadyInState);
            return Ok(StepOutcome::AlreadyInState);
        }

        mutate().map_err(|source| MigrateError::SchemaMutationFailure {
            object: object.to_string(),
            source,
        })?;
        log::info!("{action} {object}");
        self.record(format!("{action} {object}"), StepOutcome::Applied);
        Ok(StepOutcome::Applied)
    }

    pub fn has_table(&self, table: &str) -> MigrateResult<bool> {
        self.exists(&SchemaObject::Table {
            table: ObjectName::parse(table)?,
        })
    }

    pub fn has_column(&self, table: &str, column: &str) -> MigrateResult<bool> {
        self.exists(&SchemaObject::Column {
            table: ObjectName::parse(table)?,
            column: ObjectName::parse(column)?,
        })
    }

    pub fn has_index(&self, table: &str, index: &str) -> MigrateResult<bool> {
        self.exists(&SchemaObject::Index {
            table: ObjectName::parse(table)?,
            index: ObjectName::parse(index)?,
        })
    }

    /// Create `table` unless a table with that name exists.
    ///
    /// An existing table is left as is, even if its columns differ; later
    /// changesets add missing columns with [`ensure_column`](Self::ensure_column).
    pub fn ensure_table(&self, table: &TableDef) -> MigrateResult<StepOutcome> {
        table.validate()?;
        let object = SchemaObject::Table {
            table: table.name.clone(),
        };
        self.ensure(object, true, || self.db.create_table(table))
    }

    pub fn ensure_table_dropped(&self, table: &str) -> MigrateResult<StepOutcome> {
        let table = ObjectName::parse(table)?;
        let object = SchemaObject::Table {
            table: table.clone(),
        };
        self.ensure(object, false, || self.db.drop_table(&table))
    }

    pub fn ensure_column(&self, table: &str, column: &ColumnDef) -> MigrateResult<StepOutcome> {
        let table = ObjectName::parse(table)?;
        let object = SchemaObject::Column {
            table: table.clone(),
            column: column.name.clone(),
        };
        self.ensure(object, true, || self.db.add_column(&table, column))
    }

    /// Drop `column`. A missing table counts as the column being absent.
    pub fn ensure_column_dropped(&self, table: &str, column: &str) -> MigrateResult<StepOutcome> {
        let table = ObjectName::parse(table)?;
        let column = ObjectName::parse(column)?;
        let object = SchemaObject::Column {
            table: table.clone(),
            column: column.clone(),
        };
        self.ensure(object, false, || self.db.drop_column(&table, &column))
    }

    pub fn ensure_index(&self, index: &IndexDef) -> MigrateResult<StepOutcome> {
        let object = SchemaObject::Index {
            table: index.table.clone(),
            index: index.name.clone(),
        };
        self.ensure(object, true, || self.db.create_index(index))
    }

    pub fn ensure_index_dropped(&self, table: &str, index: &str) -> MigrateResult<StepOutcome> {
        let table = ObjectName::parse(table)?;
        let index = ObjectName::parse(index)?;
        let object = SchemaObject::Index {
            table: table.clone(),
            index: index.clone(),
        };
        self.ensure(object, false, || self.db.drop_index(&table, &index))
    }

    pub fn ensure_foreign_key(&self, foreign_key: &ForeignKeyDef) -> MigrateResult<StepOutcome> {
        let object = SchemaObject::ForeignKey {
            table: foreign_key.table.clone(),
            constraint: foreign_key.name.clone(),
        };
        self.ensure(object, true, || self.db.add_foreign_key(foreign_key))
    }

    pub fn ensure_foreign_key_dropped(
        &self,
        table: &str,
        constraint: &str,
    ) -> MigrateResult<StepOutcome> {
        let table = ObjectName::parse(table)?;
        let constraint = ObjectName::parse(constraint)?;
        let object = SchemaObject::ForeignKey {
            table: table.clone(),
            constraint: constraint.clone(),
        };
        self.ensure(object, false, || {
            self.db.drop_foreign_key(&table, &constraint)
        })
    }

    /// Insert `row` unless a row with the same key exists.
    pub fn ensure_row(&self, row: &SeedRow) -> MigrateResult<StepOutcome> {
        let description = format!(
            "seed {}.{} = {}",
            row.table.normalized(),
            row.key_column.normalized(),
            row.key
        );
        let exists = self
            .db
            .row_exists(&row.table, &row.key_column, &row.key)
            .map_err(|source| MigrateError::SchemaQueryFailure {
                object: description.clone(),
                source,
            })?;
        if exists {
            log::info!("{description} already present, skipping insert");
            self.record(description, StepOutcome::AlreadyInState);
            return Ok(StepOutcome::AlreadyInState);
        }

        self.db
            .insert_row(row)
            .map_err(|source| MigrateError::SchemaMutationFailure {
                object: description.clone(),
                source,
            })?;
        log::info!("{description} inserted");
        self.record(description, StepOutcome::Applied);
        Ok(StepOutcome::Applied)
    }

    /// Delete the row keyed by `key`. A missing table counts as the row being absent.
    pub fn ensure_row_deleted(
        &self,
        table: &str,
        key_column: &str,
        key: impl Into<SqlValue>,
    ) -> MigrateResult<StepOutcome> {
        let table = ObjectName::parse(table)?;
        let key_column = ObjectName::parse(key_column)?;
        let key = key.into();
        let description = format!(
            "unseed {}.{} = {key}",
            table.normalized(),
            key_column.normalized()
        );

        let present = self.exists(&SchemaObject::Table {
            table: table.clone(),
        })? && self
            .db
            .row_exists(&table, &key_column, &key)
            .map_err(|source| MigrateError::SchemaQueryFailure {
                object: description.clone(),
                source,
            })?;
        if !present {
            log::info!("{description} already absent, skipping delete");
            self.record(description, StepOutcome::AlreadyInState);
            return Ok(StepOutcome::AlreadyInState);
        }

        self.db
            .delete_row(&table, &key_column, &key)
            .map_err(|source| MigrateError::SchemaMutationFailure {
                object: description.clone(),
                source,
            })?;
        log::info!("{description} deleted");
        self.record(description, StepOutcome::Applied);
        Ok(StepOutcome::Applied)
    }

    /// Run raw SQL without an existence check.
    pub fn execute(&self, sql: &str) -> MigrateResult<StepOutcome> {
        let description = format!("sql {}", first_line(sql));
        self.db
            .execute_sql(sql)
            .map_err(|source| MigrateError::SchemaMutationFailure {
                object: description.clone(),
                source,
            })?;
        self.record(description, StepOutcome::Applied);
        Ok(StepOutcome::Applied)
    }
}

fn first_line(sql: &str) -> &str {
    sql.trim().lines().next().unwrap_or_default()
}

#[cfg(test)]
#[path = "schema_manager_test.rs"]
mod tests;
