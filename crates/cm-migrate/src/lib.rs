//! cm-migrate - Migration runner for clinic-migrate
//!
//! A [`Registry`] holds ordered [`Changeset`]s. The [`Migrator`] compares the
//! registry with the history table, applies pending changesets in ascending
//! identifier order, reverts the most recent one on request, and records each
//! outcome. Changesets mutate the schema through [`SchemaManager`], whose
//! `ensure_*` steps check live schema state first so a changeset can be
//! re-applied against a partially migrated database.

pub mod changeset;
pub mod error;
pub mod registry;
pub mod runner;
pub mod schema_manager;

pub use changeset::{Changeset, Direction, SqlChangeset};
pub use error::{MigrateError, MigrateResult};
pub use registry::Registry;
pub use runner::{
    ApplyReport, ChangesetReport, ChangesetState, ChangesetStatus, Migrator, RunnerOptions,
};
pub use schema_manager::{SchemaManager, StepOutcome, StepReport};
