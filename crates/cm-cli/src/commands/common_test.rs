use super::*;
use tempfile::TempDir;

fn global(project_dir: &Path) -> GlobalArgs {
    GlobalArgs {
        verbose: false,
        project_dir: project_dir.display().to_string(),
        config: None,
        database: None,
    }
}

#[test]
fn test_resolve_database_path() {
    let root = Path::new("/srv/clinic");
    assert_eq!(resolve_database_path(root, ":memory:"), ":memory:");
    assert_eq!(
        resolve_database_path(root, "/var/db/clinic.duckdb"),
        "/var/db/clinic.duckdb"
    );
    assert_eq!(
        resolve_database_path(root, "clinic.duckdb"),
        "/srv/clinic/clinic.duckdb"
    );
}

#[test]
fn test_missing_project_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config(&global(dir.path()), dir.path()).unwrap();
    assert_eq!(config.history_table, Config::default().history_table);
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let mut args = global(dir.path());
    args.config = Some(dir.path().join("other.yml").display().to_string());
    assert!(load_config(&args, dir.path()).is_err());
}

#[test]
fn test_invalid_project_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("migrate.yml"), "history_table: \"bad name\"\n").unwrap();
    assert!(load_config(&global(dir.path()), dir.path()).is_err());
}

#[test]
fn test_registry_includes_sql_changesets() {
    let dir = TempDir::new().unwrap();
    let sql_dir = dir.path().join("sql");
    std::fs::create_dir(&sql_dir).unwrap();
    std::fs::write(
        sql_dir.join("20240501080000_upcoming_view.up.sql"),
        "CREATE VIEW upcoming AS SELECT 1;",
    )
    .unwrap();
    std::fs::write(
        sql_dir.join("20240501080000_upcoming_view.down.sql"),
        "DROP VIEW upcoming;",
    )
    .unwrap();

    let config = Config {
        migrations_dir: Some("sql".to_string()),
        ..Config::default()
    };
    let registry = build_registry(&config, dir.path()).unwrap();
    assert_eq!(registry.len(), 8);
    assert!(registry.contains(&cm_core::ChangesetId::new("20240501080000_upcoming_view")));
}

#[test]
fn test_context_opens_memory_database() {
    let dir = TempDir::new().unwrap();
    let mut args = global(dir.path());
    args.database = Some(":memory:".to_string());
    let ctx = MigrationContext::load(&args).unwrap();
    assert_eq!(ctx.migrator().pending().unwrap().len(), 7);
}
