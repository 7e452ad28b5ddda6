//! Error types for the migration runner.

use crate::changeset::Direction;
use chrono::{DateTime, Utc};
use cm_core::{ChangesetId, CoreError};
use cm_db::DbError;
use thiserror::Error;

/// Migration runner errors.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// The existence check itself failed (M001).
    #[error("[M001] Schema query failed for {object}: {source}")]
    SchemaQueryFailure {
        object: String,
        #[source]
        source: DbError,
    },

    /// A DDL or seed statement failed after its existence check (M002).
    #[error("[M002] Schema mutation failed for {object}: {source}")]
    SchemaMutationFailure {
        object: String,
        #[source]
        source: DbError,
    },

    /// `revert_last` found an empty history (M003).
    #[error("[M003] No applied migrations to revert")]
    NoAppliedMigrations,

    /// History and registry have diverged, or a target id is not registered (M004).
    #[error("[M004] Changeset {id} is not present in the registry")]
    UnknownChangeset { id: ChangesetId },

    /// A failure inside one changeset, tagged with its id (M005).
    #[error("[M005] Changeset {id} failed during {direction}: {source}")]
    Changeset {
        id: ChangesetId,
        direction: Direction,
        #[source]
        source: Box<MigrateError>,
    },

    /// Reading or writing the history table failed (M006).
    #[error("[M006] History table operation failed: {0}")]
    HistoryFailure(#[source] DbError),

    /// Reading or writing the run lock failed (M007).
    #[error("[M007] Run lock operation failed: {0}")]
    LockFailure(#[source] DbError),

    /// Another run holds the lock (M008).
    #[error("[M008] Migrations are locked by {holder} since {since}; run `cm unlock` if that run is gone")]
    LockHeld {
        holder: String,
        since: DateTime<Utc>,
    },

    /// Two changesets share an id (M009).
    #[error("[M009] Duplicate changeset id: {id}")]
    DuplicateChangeset { id: ChangesetId },

    /// A `.up.sql` file has no `.down.sql` counterpart (M010).
    #[error("[M010] Changeset {id} has no down script (expected {path})")]
    MissingDownScript { id: ChangesetId, path: String },

    /// A `.down.sql` file has no `.up.sql` counterpart (M011).
    #[error("[M011] Changeset {id} has no up script (expected {path})")]
    MissingUpScript { id: ChangesetId, path: String },

    /// IO error while loading changesets (M012).
    #[error("[M012] IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A failure raised by changeset code itself (M013).
    #[error("[M013] {0}")]
    Operation(String),

    /// Invalid identifier or definition.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for [`MigrateError`].
pub type MigrateResult<T> = Result<T, MigrateError>;

impl MigrateError {
    /// The changeset this error is attributed to, if any.
    pub fn changeset_id(&self) -> Option<&ChangesetId> {
        match self {
            MigrateError::Changeset { id, .. }
            | MigrateError::UnknownChangeset { id }
            | MigrateError::DuplicateChangeset { id }
            | MigrateError::MissingDownScript { id, .. }
            | MigrateError::MissingUpScript { id, .. } => Some(id),
            _ => None,
        }
    }

    /// The innermost error, unwrapping changeset attribution.
    pub fn root(&self) -> &MigrateError {
        match self {
            MigrateError::Changeset { source, .. } => source.root(),
            other => other,
        }
    }
}
