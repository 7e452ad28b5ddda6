//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use cm_core::{Config, CoreError};
use cm_db::DuckDbBackend;
use cm_migrate::{Migrator, Registry, RunnerOptions};
use std::path::{Path, PathBuf};

use crate::cli::GlobalArgs;

/// Everything a command needs to run the migrator.
pub(crate) struct MigrationContext {
    pub config: Config,
    pub db: DuckDbBackend,
    pub registry: Registry,
}

impl MigrationContext {
    /// Load config, open the database and build the registry.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let root = PathBuf::from(&global.project_dir);
        let config = load_config(global, &root)?;
        let db = open_database(&config, global, &root)?;
        let registry = build_registry(&config, &root)?;
        Ok(Self {
            config,
            db,
            registry,
        })
    }

    pub fn migrator(&self) -> Migrator<'_> {
        let options = RunnerOptions {
            use_lock: self.config.lock.enabled,
            ..RunnerOptions::default()
        };
        Migrator::with_options(&self.db, &self.registry, options)
    }
}

/// Load `migrate.yml` from `--config` or the project directory.
///
/// A project without a config file runs with defaults; an explicit
/// `--config` that does not exist is an error.
pub(crate) fn load_config(global: &GlobalArgs, root: &Path) -> Result<Config> {
    if let Some(path) = &global.config {
        return Config::load(Path::new(path)).context("Failed to load configuration file");
    }
    match Config::load_from_dir(root) {
        Ok(config) => Ok(config),
        Err(CoreError::ConfigNotFound { path }) => {
            log::debug!("No config at {path}, using defaults");
            Ok(Config::default())
        }
        Err(e) => Err(e).context("Failed to load project configuration"),
    }
}

/// Resolve a configured database path against the project directory.
pub(crate) fn resolve_database_path(root: &Path, path: &str) -> String {
    if path == ":memory:" || Path::new(path).is_absolute() {
        return path.to_string();
    }
    root.join(path).display().to_string()
}

pub(crate) fn open_database(
    config: &Config,
    global: &GlobalArgs,
    root: &Path,
) -> Result<DuckDbBackend> {
    let path = resolve_database_path(root, config.database_path(global.database.as_deref()));
    log::debug!("Opening database {path}");
    let db = DuckDbBackend::new(&path)
        .with_context(|| format!("Failed to connect to database {path}"))?
        .with_history_table(config.history_table.as_str())
        .with_lock_table(config.lock.table.as_str());
    Ok(db)
}

/// Clinic changesets plus any SQL changesets from `migrations_dir`.
pub(crate) fn build_registry(config: &Config, root: &Path) -> Result<Registry> {
    let mut registry = cm_clinic::registry().context("Failed to build clinic changesets")?;
    if let Some(dir) = config.migrations_dir_absolute(root) {
        let sql = Registry::load_sql_dir(&dir)
            .with_context(|| format!("Failed to load SQL changesets from {}", dir.display()))?;
        registry
            .extend(sql)
            .context("SQL changeset collides with a clinic changeset")?;
    }
    Ok(registry)
}

/// Print a left-aligned table with a dashed separator under the header.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{cell:<w$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", line(headers.iter().map(|h| h.to_string()).collect()));
    println!("{}", line(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in rows {
        println!("{}", line(row.clone()));
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
