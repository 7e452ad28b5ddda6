use super::*;
use tempfile::TempDir;

fn sql(id: &str) -> SqlChangeset {
    SqlChangeset::new(ChangesetId::new(id), "SELECT 1", "SELECT 2")
}

#[test]
fn test_iteration_is_ascending_regardless_of_registration_order() {
    let mut registry = Registry::new();
    registry.register(sql("20240305160000_c")).unwrap();
    registry.register(sql("20240115093000_a")).unwrap();
    registry.register(sql("20240203141500_b")).unwrap();

    let ids: Vec<String> = registry.iter().map(|c| c.id().to_string()).collect();
    assert_eq!(
        ids,
        vec!["20240115093000_a", "20240203141500_b", "20240305160000_c"]
    );
    assert_eq!(registry.len(), 3);
}

#[test]
fn test_duplicate_id_is_rejected() {
    let mut registry = Registry::new();
    registry.register(sql("20240115093000_a")).unwrap();
    let err = registry.register(sql("20240115093000_a")).unwrap_err();
    assert!(matches!(err, MigrateError::DuplicateChangeset { .. }));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_extend_rejects_overlap() {
    let mut left = Registry::new();
    left.register(sql("20240115093000_a")).unwrap();
    let mut right = Registry::new();
    right.register(sql("20240115093000_a")).unwrap();
    assert!(left.extend(right).is_err());
}

#[test]
fn test_load_sql_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("20240501080000_audit_view.up.sql"),
        "CREATE VIEW audit AS SELECT 1;",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("20240501080000_audit_view.down.sql"),
        "DROP VIEW audit;",
    )
    .unwrap();
    std::fs::write(dir.path().join("README.md"), "notes").unwrap();

    let registry = Registry::load_sql_dir(dir.path()).unwrap();
    assert_eq!(registry.len(), 1);
    let id = ChangesetId::new("20240501080000_audit_view");
    assert!(registry.contains(&id));
    assert_eq!(registry.get(&id).unwrap().name(), "audit_view");
}

#[test]
fn test_load_sql_dir_requires_down_script() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("20240501080000_audit_view.up.sql"),
        "CREATE VIEW audit AS SELECT 1;",
    )
    .unwrap();

    let err = Registry::load_sql_dir(dir.path()).unwrap_err();
    assert!(matches!(err, MigrateError::MissingDownScript { .. }));
}

#[test]
fn test_load_sql_dir_requires_up_script() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("20240501080000_audit_view.down.sql"),
        "DROP VIEW audit;",
    )
    .unwrap();

    let err = Registry::load_sql_dir(dir.path()).unwrap_err();
    assert!(matches!(err, MigrateError::MissingUpScript { .. }));
}

#[test]
fn test_load_sql_dir_rejects_bad_id() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("add_view.up.sql"), "SELECT 1").unwrap();
    let err = Registry::load_sql_dir(dir.path()).unwrap_err();
    assert!(matches!(err, MigrateError::Core(_)));
}

#[test]
fn test_load_missing_dir_is_empty() {
    let dir = TempDir::new().unwrap();
    let registry = Registry::load_sql_dir(&dir.path().join("nope")).unwrap();
    assert!(registry.is_empty());
}
