use super::*;
use cm_db::MemoryBackend;

fn sql_changeset(up: &str, down: &str) -> SqlChangeset {
    SqlChangeset::new(
        ChangesetId::new("20240501080000_add_audit_view"),
        up,
        down,
    )
}

#[test]
fn test_default_name_comes_from_id() {
    let changeset = sql_changeset("SELECT 1", "SELECT 2");
    assert_eq!(changeset.name(), "add_audit_view");
}

#[test]
fn test_sql_changeset_executes_scripts() {
    let db = MemoryBackend::new();
    let changeset = sql_changeset(
        "CREATE VIEW audit AS SELECT 1",
        "DROP VIEW audit",
    );

    let schema = SchemaManager::new(&db);
    changeset.up(&schema).unwrap();
    changeset.down(&schema).unwrap();

    assert_eq!(
        db.mutation_log(),
        vec![
            "SQL CREATE VIEW audit AS SELECT 1".to_string(),
            "SQL DROP VIEW audit".to_string()
        ]
    );
    assert_eq!(schema.steps().len(), 2);
}

#[test]
fn test_empty_script_is_skipped() {
    let db = MemoryBackend::new();
    let changeset = sql_changeset("CREATE VIEW audit AS SELECT 1", "  \n");
    let schema = SchemaManager::new(&db);
    changeset.down(&schema).unwrap();
    assert_eq!(db.mutation_count(), 0);
}

#[test]
fn test_direction_display() {
    assert_eq!(Direction::Up.to_string(), "up");
    assert_eq!(Direction::Down.to_string(), "down");
}
