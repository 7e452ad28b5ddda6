//! Ordered set of known changesets.

use crate::changeset::{Changeset, SqlChangeset};
use crate::error::{MigrateError, MigrateResult};
use cm_core::ChangesetId;
use std::collections::BTreeMap;
use std::path::Path;

const UP_SUFFIX: &str = ".up.sql";
const DOWN_SUFFIX: &str = ".down.sql";

/// Changesets keyed by id; iteration is always in ascending id order.
#[derive(Default)]
pub struct Registry {
    changesets: BTreeMap<ChangesetId, Box<dyn Changeset>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a changeset. Ids must be unique.
    pub fn register(&mut self, changeset: impl Changeset + 'static) -> MigrateResult<()> {
        self.register_boxed(Box::new(changeset))
    }

    pub fn register_boxed(&mut self, changeset: Box<dyn Changeset>) -> MigrateResult<()> {
        let id = changeset.id();
        if self.changesets.contains_key(&id) {
            return Err(MigrateError::DuplicateChangeset { id });
        }
        self.changesets.insert(id, changeset);
        Ok(())
    }

    /// Move every changeset of `other` into this registry.
    pub fn extend(&mut self, other: Registry) -> MigrateResult<()> {
        for (_, changeset) in other.changesets {
            self.register_boxed(changeset)?;
        }
        Ok(())
    }

    pub fn get(&self, id: &ChangesetId) -> Option<&dyn Changeset> {
        self.changesets.get(id).map(|c| c.as_ref())
    }

    pub fn contains(&self, id: &ChangesetId) -> bool {
        self.changesets.contains_key(id)
    }

    /// Changesets in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Changeset> {
        self.changesets.values().map(|c| c.as_ref())
    }

    pub fn ids(&self) -> Vec<ChangesetId> {
        self.changesets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.changesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changesets.is_empty()
    }

    /// Load SQL changesets from `dir`.
    ///
    /// Each changeset is a pair of files `<id>.up.sql` and `<id>.down.sql`.
    /// Files with other names are ignored. A missing directory yields an
    /// empty registry.
    pub fn load_sql_dir(dir: &Path) -> MigrateResult<Self> {
        let mut registry = Self::new();
        if !dir.is_dir() {
            log::debug!("No SQL changeset directory at {}", dir.display());
            return Ok(registry);
        }

        let io_err = |path: &Path, source| MigrateError::Io {
            path: path.display().to_string(),
            source,
        };

        let mut ups: BTreeMap<ChangesetId, String> = BTreeMap::new();
        let mut downs: BTreeMap<ChangesetId, String> = BTreeMap::new();
        for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let path = entry.map_err(|e| io_err(dir, e))?.path();
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let (stem, target) = if let Some(stem) = file_name.strip_suffix(UP_SUFFIX) {
                (stem, &mut ups)
            } else if let Some(stem) = file_name.strip_suffix(DOWN_SUFFIX) {
                (stem, &mut downs)
            } else {
                continue;
            };
            let id = ChangesetId::parse(stem)?;
            let sql = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            target.insert(id, sql);
        }

        for id in downs.keys() {
            if !ups.contains_key(id) {
                return Err(MigrateError::MissingUpScript {
                    id: id.clone(),
                    path: dir.join(format!("{id}{UP_SUFFIX}")).display().to_string(),
                });
            }
        }
        for (id, up_sql) in ups {
            let Some(down_sql) = downs.remove(&id) else {
                return Err(MigrateError::MissingDownScript {
                    path: dir.join(format!("{id}{DOWN_SUFFIX}")).display().to_string(),
                    id,
                });
            };
            registry.register(SqlChangeset::new(id, up_sql, down_sql))?;
        }

        log::debug!(
            "Loaded {} SQL changesets from {}",
            registry.len(),
            dir.display()
        );
        Ok(registry)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.changesets.keys()).finish()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
