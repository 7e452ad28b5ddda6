//! Runner properties checked against both backends.
//!
//! Each property is written once against `&dyn Database` and run on the
//! in-memory backend (which also counts mutations) and on DuckDB.

use cm_core::{ChangesetId, ColumnDef, ColumnType, ObjectName, SchemaObject, TableDef};
use cm_db::{
    Database, DuckDbBackend, HistoryStore, MemoryBackend, RunLock, SchemaInspector, SchemaMutator,
};
use cm_migrate::{Changeset, MigrateError, MigrateResult, Migrator, Registry, SchemaManager};

// ── Helpers ────────────────────────────────────────────────────────────

const C1: &str = "20240115093000_create_patients";
const C2: &str = "20240203141500_add_patient_notes";
const C3: &str = "20240402090000_add_patient_phone";

struct CreatePatients;

impl Changeset for CreatePatients {
    fn id(&self) -> ChangesetId {
        ChangesetId::new(C1)
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_table(
            &TableDef::new("patients")
                .column(ColumnDef::new("id", ColumnType::BigInt).not_null())
                .column(ColumnDef::new("full_name", ColumnType::Varchar(200))),
        )?;
        Ok(())
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_table_dropped("patients")?;
        Ok(())
    }
}

struct AddColumn {
    id: &'static str,
    column: &'static str,
}

impl Changeset for AddColumn {
    fn id(&self) -> ChangesetId {
        ChangesetId::new(self.id)
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_column("patients", &ColumnDef::new(self.column, ColumnType::Varchar(64)))?;
        Ok(())
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_column_dropped("patients", self.column)?;
        Ok(())
    }
}

struct Broken {
    id: &'static str,
}

impl Changeset for Broken {
    fn id(&self) -> ChangesetId {
        ChangesetId::new(self.id)
    }

    fn up(&self, _schema: &SchemaManager<'_>) -> MigrateResult<()> {
        Err(MigrateError::Operation("simulated crash".to_string()))
    }

    fn down(&self, _schema: &SchemaManager<'_>) -> MigrateResult<()> {
        Ok(())
    }
}

fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(CreatePatients).unwrap();
    registry
        .register(AddColumn {
            id: C2,
            column: "notes",
        })
        .unwrap();
    registry
        .register(AddColumn {
            id: C3,
            column: "phone_number",
        })
        .unwrap();
    registry
}

fn history(db: &dyn Database) -> Vec<String> {
    db.applied_records()
        .unwrap()
        .into_iter()
        .map(|r| r.changeset_id.to_string())
        .collect()
}

fn has_column(db: &dyn Database, column: &str) -> bool {
    db.object_exists(&SchemaObject::Column {
        table: ObjectName::new("patients"),
        column: ObjectName::new(column),
    })
    .unwrap()
}

fn duckdb() -> DuckDbBackend {
    DuckDbBackend::in_memory().unwrap()
}

// ── Properties ─────────────────────────────────────────────────────────

fn idempotent_apply(db: &dyn Database) {
    let registry = registry();
    let migrator = Migrator::new(db, &registry);
    assert_eq!(migrator.apply_pending().unwrap().applied.len(), 3);
    let before = history(db);

    let report = migrator.apply_pending().unwrap();
    assert!(report.is_empty());
    assert_eq!(report.mutations(), 0);
    assert_eq!(history(db), before);
}

fn order_invariant(db: &dyn Database) {
    let registry = registry();
    let report = Migrator::new(db, &registry).apply_pending().unwrap();
    let ids: Vec<String> = report.ids().iter().map(|id| id.to_string()).collect();
    assert_eq!(ids, vec![C1, C2, C3]);
    assert_eq!(history(db), vec![C1, C2, C3]);
}

fn revert_then_reapply(db: &dyn Database) {
    let registry = registry();
    let migrator = Migrator::new(db, &registry);
    migrator.apply_pending().unwrap();

    let reverted = migrator.revert_last().unwrap();
    assert_eq!(reverted.id.as_str(), C3);
    assert!(!has_column(db, "phone_number"));
    assert_eq!(history(db), vec![C1, C2]);

    migrator.apply_pending().unwrap();
    assert!(has_column(db, "phone_number"));
    assert_eq!(history(db), vec![C1, C2, C3]);
}

fn pre_existing_column(db: &dyn Database) {
    db.create_table(
        &TableDef::new("PATIENTS")
            .column(ColumnDef::new("id", ColumnType::BigInt).not_null())
            .column(ColumnDef::new("Phone_Number", ColumnType::Varchar(64))),
    )
    .unwrap();

    let registry = registry();
    let report = Migrator::new(db, &registry).apply_pending().unwrap();

    assert_eq!(report.applied.len(), 3);
    // Table and phone column already existed; only notes was added.
    assert_eq!(report.mutations(), 1);
    assert_eq!(report.applied[2].no_ops(), 1);
    assert!(has_column(db, "phone_number"));
}

fn revert_empty_history(db: &dyn Database) {
    let registry = registry();
    let err = Migrator::new(db, &registry).revert_last().unwrap_err();
    assert!(matches!(err, MigrateError::NoAppliedMigrations));
    assert!(history(db).is_empty());
}

fn partial_run_durability(db: &dyn Database) {
    let mut broken = Registry::new();
    broken.register(CreatePatients).unwrap();
    broken.register(Broken { id: C2 }).unwrap();
    broken
        .register(AddColumn {
            id: C3,
            column: "phone_number",
        })
        .unwrap();

    let err = Migrator::new(db, &broken).apply_pending().unwrap_err();
    assert_eq!(err.changeset_id().map(ChangesetId::as_str), Some(C2));
    assert_eq!(history(db), vec![C1]);
    assert!(!has_column(db, "phone_number"));

    let fixed = registry();
    let report = Migrator::new(db, &fixed).apply_pending().unwrap();
    let ids: Vec<String> = report.ids().iter().map(|id| id.to_string()).collect();
    assert_eq!(ids, vec![C2, C3]);
    assert_eq!(history(db), vec![C1, C2, C3]);
}

fn lock_excludes_second_runner(db: &dyn Database) {
    let registry = registry();
    assert_eq!(
        db.try_acquire_lock("runner-a", chrono::Utc::now()).unwrap(),
        cm_db::LockStatus::Acquired
    );

    let err = Migrator::new(db, &registry).apply_pending().unwrap_err();
    assert!(matches!(err, MigrateError::LockHeld { ref holder, .. } if holder == "runner-a"));
    assert!(history(db).is_empty());

    assert!(Migrator::new(db, &registry).force_unlock().unwrap());
    Migrator::new(db, &registry).apply_pending().unwrap();
    assert_eq!(history(db).len(), 3);
}

// ── In-memory backend ──────────────────────────────────────────────────

#[test]
fn memory_idempotent_apply() {
    let db = MemoryBackend::new();
    idempotent_apply(&db);
    let mutations = db.mutation_count();
    Migrator::new(&db, &registry()).apply_pending().unwrap();
    assert_eq!(db.mutation_count(), mutations);
}

#[test]
fn memory_order_invariant() {
    order_invariant(&MemoryBackend::new());
}

#[test]
fn memory_revert_then_reapply() {
    revert_then_reapply(&MemoryBackend::new());
}

#[test]
fn memory_pre_existing_column() {
    let db = MemoryBackend::new();
    pre_existing_column(&db);
    assert_eq!(db.column_count("patients", "phone_number"), 1);
}

#[test]
fn memory_revert_empty_history() {
    let db = MemoryBackend::new();
    revert_empty_history(&db);
    assert_eq!(db.mutation_count(), 0);
}

#[test]
fn memory_partial_run_durability() {
    let db = MemoryBackend::new();
    partial_run_durability(&db);
    let creates = db
        .mutation_log()
        .iter()
        .filter(|m| m.starts_with("CREATE TABLE"))
        .count();
    assert_eq!(creates, 1);
}

#[test]
fn memory_lock_excludes_second_runner() {
    lock_excludes_second_runner(&MemoryBackend::new());
}

// ── DuckDB backend ─────────────────────────────────────────────────────

#[test]
fn duckdb_idempotent_apply() {
    idempotent_apply(&duckdb());
}

#[test]
fn duckdb_order_invariant() {
    order_invariant(&duckdb());
}

#[test]
fn duckdb_revert_then_reapply() {
    revert_then_reapply(&duckdb());
}

#[test]
fn duckdb_pre_existing_column() {
    pre_existing_column(&duckdb());
}

#[test]
fn duckdb_revert_empty_history() {
    revert_empty_history(&duckdb());
}

#[test]
fn duckdb_partial_run_durability() {
    partial_run_durability(&duckdb());
}

#[test]
fn duckdb_lock_excludes_second_runner() {
    lock_excludes_second_runner(&duckdb());
}

#[test]
fn duckdb_history_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("clinic.duckdb");
    let registry = registry();

    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        Migrator::new(&db, &registry)
            .apply_to(&ChangesetId::new(C2))
            .unwrap();
    }

    let db = DuckDbBackend::from_path(&path).unwrap();
    let migrator = Migrator::new(&db, &registry);
    assert_eq!(migrator.pending().unwrap(), vec![ChangesetId::new(C3)]);
    let report = migrator.apply_pending().unwrap();
    assert_eq!(report.ids(), vec![ChangesetId::new(C3)]);
}
