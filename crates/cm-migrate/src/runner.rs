//! Migration runner.
//!
//! The runner owns the ordering and bookkeeping: it decides which changesets
//! are pending, runs them one at a time in ascending id order, and appends a
//! history record after each successful `up`. Each changeset commits on its
//! own, so a failure leaves earlier changesets of the same run applied.

use crate::changeset::{Changeset, Direction};
use crate::error::{MigrateError, MigrateResult};
use crate::registry::Registry;
use crate::schema_manager::{SchemaManager, StepOutcome, StepReport};
use chrono::{DateTime, Utc};
use cm_core::ChangesetId;
use cm_db::{AppliedRecord, Database, LockStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Runner settings.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Take the run lock around `apply_*` and `revert_last`.
    pub use_lock: bool,
    /// Token written to the lock row while this runner holds it.
    pub holder: String,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            use_lock: true,
            holder: format!("cm-{}", uuid::Uuid::new_v4()),
        }
    }
}

/// Steps executed for one changeset.
#[derive(Debug, Clone, Serialize)]
pub struct ChangesetReport {
    pub id: ChangesetId,
    pub name: String,
    pub direction: Direction,
    pub steps: Vec<StepReport>,
}

impl ChangesetReport {
    /// Number of steps that changed the schema.
    pub fn mutations(&self) -> usize {
        self.count(StepOutcome::Applied)
    }

    /// Number of steps that found their target state already in place.
    pub fn no_ops(&self) -> usize {
        self.count(StepOutcome::AlreadyInState)
    }

    fn count(&self, outcome: StepOutcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }
}

/// Result of an apply run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyReport {
    pub applied: Vec<ChangesetReport>,
}

impl ApplyReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }

    pub fn ids(&self) -> Vec<ChangesetId> {
        self.applied.iter().map(|r| r.id.clone()).collect()
    }

    /// Total schema mutations across all changesets.
    pub fn mutations(&self) -> usize {
        self.applied.iter().map(ChangesetReport::mutations).sum()
    }
}

/// Where a changeset stands relative to history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChangesetState {
    Applied { at: DateTime<Utc> },
    Pending,
    /// Recorded in history but no longer registered.
    Orphaned { at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangesetStatus {
    pub id: ChangesetId,
    pub name: String,
    #[serde(flatten)]
    pub state: ChangesetState,
}

/// Applies and reverts the changesets of a [`Registry`] against a database.
pub struct Migrator<'a> {
    db: &'a dyn Database,
    registry: &'a Registry,
    options: RunnerOptions,
}

impl<'a> Migrator<'a> {
    pub fn new(db: &'a dyn Database, registry: &'a Registry) -> Self {
        Self::with_options(db, registry, RunnerOptions::default())
    }

    pub fn with_options(
        db: &'a dyn Database,
        registry: &'a Registry,
        options: RunnerOptions,
    ) -> Self {
        Self {
            db,
            registry,
            options,
        }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    fn applied(&self) -> MigrateResult<BTreeMap<ChangesetId, AppliedRecord>> {
        let records = self
            .db
            .applied_records()
            .map_err(MigrateError::HistoryFailure)?;
        Ok(records
            .into_iter()
            .map(|r| (r.changeset_id.clone(), r))
            .collect())
    }

    /// History as it stands, treating a missing history table as empty.
    fn applied_if_tracked(&self) -> MigrateResult<BTreeMap<ChangesetId, AppliedRecord>> {
        let tracked = self
            .db
            .history_table_exists()
            .map_err(MigrateError::HistoryFailure)?;
        if tracked {
            self.applied()
        } else {
            Ok(BTreeMap::new())
        }
    }

    /// Registered changesets not yet recorded in history, ascending.
    ///
    /// Read-only: a database without a history table has everything pending.
    pub fn pending(&self) -> MigrateResult<Vec<ChangesetId>> {
        let applied = self.applied_if_tracked()?;
        Ok(self
            .registry
            .ids()
            .into_iter()
            .filter(|id| !applied.contains_key(id))
            .collect())
    }

    /// Every registered changeset with its state, followed by orphaned history entries.
    pub fn status(&self) -> MigrateResult<Vec<ChangesetStatus>> {
        let mut applied = self.applied_if_tracked()?;

        let mut statuses: Vec<ChangesetStatus> = self
            .registry
            .iter()
            .map(|changeset| {
                let id = changeset.id();
                let state = match applied.remove(&id) {
                    Some(record) => ChangesetState::Applied {
                        at: record.applied_at,
                    },
                    None => ChangesetState::Pending,
                };
                ChangesetStatus {
                    name: changeset.name(),
                    id,
                    state,
                }
            })
            .collect();

        statuses.extend(applied.into_values().map(|record| ChangesetStatus {
            id: record.changeset_id,
            name: record.name,
            state: ChangesetState::Orphaned {
                at: record.applied_at,
            },
        }));
        Ok(statuses)
    }

    /// Apply every pending changeset in ascending id order.
    pub fn apply_pending(&self) -> MigrateResult<ApplyReport> {
        self.with_lock(|| self.apply_until(None))
    }

    /// Apply pending changesets up to and including `target`.
    pub fn apply_to(&self, target: &ChangesetId) -> MigrateResult<ApplyReport> {
        if !self.registry.contains(target) {
            return Err(MigrateError::UnknownChangeset { id: target.clone() });
        }
        self.with_lock(|| self.apply_until(Some(target)))
    }

    fn apply_until(&self, target: Option<&ChangesetId>) -> MigrateResult<ApplyReport> {
        let applied = self.applied()?;
        for id in applied.keys().filter(|id| !self.registry.contains(id)) {
            log::warn!("History contains {id}, which is not registered");
        }
        let latest = applied.keys().next_back().cloned();

        let mut report = ApplyReport::default();
        for changeset in self.registry.iter() {
            let id = changeset.id();
            if target.is_some_and(|t| id > *t) {
                break;
            }
            if applied.contains_key(&id) {
                continue;
            }
            if let Some(latest) = latest.as_ref().filter(|latest| id < **latest) {
                log::warn!("Applying {id} out of order: {latest} is already applied");
            }
            report.applied.push(self.apply_one(changeset)?);
        }

        if report.is_empty() {
            log::info!("Schema is up to date");
        }
        Ok(report)
    }

    fn apply_one(&self, changeset: &dyn Changeset) -> MigrateResult<ChangesetReport> {
        let id = changeset.id();
        let wrap = |source| MigrateError::Changeset {
            id: id.clone(),
            direction: Direction::Up,
            source: Box::new(source),
        };

        log::info!("Applying {id}");
        let schema = SchemaManager::new(self.db);
        changeset.up(&schema).map_err(wrap)?;

        let record = AppliedRecord {
            changeset_id: id.clone(),
            name: changeset.name(),
            applied_at: Utc::now(),
        };
        self.db
            .record_applied(&record)
            .map_err(|e| wrap(MigrateError::HistoryFailure(e)))?;

        let report = ChangesetReport {
            id: id.clone(),
            name: record.name,
            direction: Direction::Up,
            steps: schema.into_steps(),
        };
        log::info!(
            "Applied {id} ({} changes, {} already in place)",
            report.mutations(),
            report.no_ops()
        );
        Ok(report)
    }

    /// Revert the most recently applied changeset.
    pub fn revert_last(&self) -> MigrateResult<ChangesetReport> {
        self.with_lock(|| {
            let applied = self.applied()?;
            let Some(id) = applied.keys().next_back().cloned() else {
                return Err(MigrateError::NoAppliedMigrations);
            };
            let Some(changeset) = self.registry.get(&id) else {
                return Err(MigrateError::UnknownChangeset { id });
            };
            self.revert_one(changeset)
        })
    }

    fn revert_one(&self, changeset: &dyn Changeset) -> MigrateResult<ChangesetReport> {
        let id = changeset.id();
        let wrap = |source| MigrateError::Changeset {
            id: id.clone(),
            direction: Direction::Down,
            source: Box::new(source),
        };

        log::info!("Reverting {id}");
        let schema = SchemaManager::new(self.db);
        changeset.down(&schema).map_err(wrap)?;
        self.db
            .remove_record(&id)
            .map_err(|e| wrap(MigrateError::HistoryFailure(e)))?;

        let report = ChangesetReport {
            id: id.clone(),
            name: changeset.name(),
            direction: Direction::Down,
            steps: schema.into_steps(),
        };
        log::info!(
            "Reverted {id} ({} changes, {} already in place)",
            report.mutations(),
            report.no_ops()
        );
        Ok(report)
    }

    /// Remove the run lock regardless of holder. Returns whether a lock was held.
    pub fn force_unlock(&self) -> MigrateResult<bool> {
        if let Some(info) = self.db.lock_holder().map_err(MigrateError::LockFailure)? {
            log::warn!(
                "Removing run lock held by {} since {}",
                info.holder,
                info.acquired_at
            );
        }
        self.db
            .force_release_lock()
            .map_err(MigrateError::LockFailure)
    }

    fn with_lock<T>(&self, body: impl FnOnce() -> MigrateResult<T>) -> MigrateResult<T> {
        self.db
            .ensure_history_table()
            .map_err(MigrateError::HistoryFailure)?;
        if !self.options.use_lock {
            return body();
        }

        let holder = &self.options.holder;
        match self
            .db
            .try_acquire_lock(holder, Utc::now())
            .map_err(MigrateError::LockFailure)?
        {
            LockStatus::Acquired => log::debug!("Acquired run lock as {holder}"),
            LockStatus::Held(info) => {
                return Err(MigrateError::LockHeld {
                    holder: info.holder,
                    since: info.acquired_at,
                })
            }
        }

        let result = body();
        match self.db.release_lock(holder) {
            Ok(true) => log::debug!("Released run lock"),
            Ok(false) => log::warn!("Run lock for {holder} was already gone on release"),
            Err(e) if result.is_ok() => return Err(MigrateError::LockFailure(e)),
            Err(e) => log::warn!("Failed to release run lock: {e}"),
        }
        result
    }
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
