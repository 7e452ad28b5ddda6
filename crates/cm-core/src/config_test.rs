use super::*;

#[test]
fn test_parse_minimal_config() {
    let config: Config = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.database.path, "clinic.duckdb");
    assert_eq!(config.history_table, "__schema_history");
    assert!(config.lock.enabled);
    assert_eq!(config.lock.table, "__schema_lock");
    assert!(config.migrations_dir.is_none());
    config.validate().unwrap();
}

#[test]
fn test_parse_full_config() {
    let yaml = r#"
database:
  path: ./data/clinic.duckdb
history_table: schema_changesets
lock:
  enabled: false
  table: schema_run_lock
migrations_dir: sql
"#;
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.database.path, "./data/clinic.duckdb");
    assert_eq!(config.history_table, "schema_changesets");
    assert!(!config.lock.enabled);
    assert_eq!(config.lock.table, "schema_run_lock");

    let root = std::path::PathBuf::from("/srv/clinic");
    assert_eq!(
        config.migrations_dir_absolute(&root),
        Some(root.join("sql"))
    );
}

#[test]
fn test_unknown_fields_rejected() {
    let result: Result<Config, _> = serde_yaml::from_str("histroy_table: typo\n");
    assert!(result.is_err());
}

#[test]
fn test_validate_rejects_invalid_history_table() {
    let config: Config = serde_yaml::from_str("history_table: \"schema history\"\n").unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, CoreError::ConfigInvalid { .. }));
    assert!(err.to_string().contains("history_table"));
}

#[test]
fn test_validate_rejects_same_tables_ignoring_case() {
    let yaml = "history_table: migrations\nlock:\n  table: MIGRATIONS\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_empty_database_path() {
    let config: Config = serde_yaml::from_str("database:\n  path: \"\"\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_database_path_override() {
    let config = Config::default();
    assert_eq!(config.database_path(None), "clinic.duckdb");
    assert_eq!(config.database_path(Some(":memory:")), ":memory:");
}

#[test]
fn test_load_from_dir_prefers_yml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("migrate.yml"), "history_table: from_yml\n").unwrap();
    std::fs::write(dir.path().join("migrate.yaml"), "history_table: from_yaml\n").unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.history_table, "from_yml");
}

#[test]
fn test_load_from_dir_falls_back_to_yaml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("migrate.yaml"), "history_table: from_yaml\n").unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    assert_eq!(config.history_table, "from_yaml");
}

#[test]
fn test_load_from_dir_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from_dir(dir.path()).unwrap_err();
    assert!(matches!(err, CoreError::ConfigNotFound { .. }));
}

#[test]
fn test_load_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("migrate.yml");
    std::fs::write(&path, "lock: [not, a, map]\n").unwrap();
    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, CoreError::ConfigParseError { .. }));
}
