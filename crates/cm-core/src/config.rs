//! Configuration types and parsing for migrate.yml

use crate::error::{CoreError, CoreResult};
use crate::schema::ObjectName;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration from migrate.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Table recording applied changesets
    #[serde(default = "default_history_table")]
    pub history_table: String,

    /// Run lock settings
    #[serde(default)]
    pub lock: LockConfig,

    /// Directory of `<id>.up.sql` / `<id>.down.sql` changesets, relative to
    /// the project directory
    #[serde(default)]
    pub migrations_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            history_table: default_history_table(),
            lock: LockConfig::default(),
            migrations_dir: None,
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (DuckDB file, or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Advisory lock held for the duration of `migrate up` / `migrate down`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockConfig {
    /// Take the lock before mutating the schema
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Single-row lock table
    #[serde(default = "default_lock_table")]
    pub table: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            table: default_lock_table(),
        }
    }
}

fn default_history_table() -> String {
    "__schema_history".to_string()
}

fn default_lock_table() -> String {
    "__schema_lock".to_string()
}

fn default_db_path() -> String {
    "clinic.duckdb".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    ///
    /// Looks for `migrate.yml` first, then `migrate.yaml`.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("migrate.yml");
        let yaml_path = dir.join("migrate.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Check table names and paths.
    pub fn validate(&self) -> CoreResult<()> {
        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path must not be empty".to_string(),
            });
        }

        let history = ObjectName::parse(self.history_table.as_str()).map_err(|e| {
            CoreError::ConfigInvalid {
                message: format!("history_table: {e}"),
            }
        })?;
        let lock =
            ObjectName::parse(self.lock.table.as_str()).map_err(|e| CoreError::ConfigInvalid {
                message: format!("lock.table: {e}"),
            })?;
        if history.matches(&lock) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "history_table and lock.table must differ (both are '{}')",
                    history
                ),
            });
        }
        Ok(())
    }

    /// Resolve the database path, preferring a command-line override.
    pub fn database_path<'a>(&'a self, cli_override: Option<&'a str>) -> &'a str {
        cli_override.unwrap_or(&self.database.path)
    }

    /// Absolute path of the SQL changeset directory, if configured.
    pub fn migrations_dir_absolute(&self, root: &Path) -> Option<PathBuf> {
        self.migrations_dir.as_ref().map(|dir| root.join(dir))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
