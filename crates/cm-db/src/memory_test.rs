use super::*;
use cm_core::ColumnType;

fn patients() -> TableDef {
    TableDef::new("patients")
        .column(ColumnDef::new("id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("full_name", ColumnType::Text))
        .primary_key(&["id"])
}

fn appointments() -> TableDef {
    TableDef::new("appointments")
        .column(ColumnDef::new("id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("patient_id", ColumnType::BigInt).not_null())
        .primary_key(&["id"])
        .foreign_key("fk_appointments_patient", &["patient_id"], "patients", &["id"])
}

fn fk_object() -> SchemaObject {
    SchemaObject::ForeignKey {
        table: ObjectName::new("appointments"),
        constraint: ObjectName::new("FK_APPOINTMENTS_PATIENT"),
    }
}

#[test]
fn test_create_table_logs_mutation() {
    let db = MemoryBackend::new();
    db.create_table(&patients()).unwrap();
    assert_eq!(db.mutation_log(), vec!["CREATE TABLE PATIENTS".to_string()]);
    assert_eq!(db.table_names(), vec!["PATIENTS".to_string()]);
}

#[test]
fn test_duplicate_table_fails() {
    let db = MemoryBackend::new();
    db.create_table(&patients()).unwrap();
    let mut again = patients();
    again.name = ObjectName::new("Patients");
    assert!(db.create_table(&again).is_err());
}

#[test]
fn test_inline_foreign_key_is_registered() {
    let db = MemoryBackend::new();
    db.create_table(&patients()).unwrap();
    db.create_table(&appointments()).unwrap();
    assert!(db.object_exists(&fk_object()).unwrap());
}

#[test]
fn test_inline_foreign_key_requires_parent() {
    let db = MemoryBackend::new();
    assert!(db.create_table(&appointments()).is_err());
    assert!(!db
        .object_exists(&SchemaObject::Table {
            table: ObjectName::new("appointments")
        })
        .unwrap());
}

#[test]
fn test_drop_referenced_table_fails() {
    let db = MemoryBackend::new();
    db.create_table(&patients()).unwrap();
    db.create_table(&appointments()).unwrap();

    let err = db.drop_table(&ObjectName::new("patients")).unwrap_err();
    assert!(err.to_string().contains("referenced by foreign key"));

    db.drop_table(&ObjectName::new("appointments")).unwrap();
    db.drop_table(&ObjectName::new("patients")).unwrap();
    assert!(db.table_names().is_empty());
}

#[test]
fn test_duplicate_column_fails_case_insensitively() {
    let db = MemoryBackend::new();
    db.create_table(&patients()).unwrap();
    let err = db
        .add_column(
            &ObjectName::new("patients"),
            &ColumnDef::new("FULL_NAME", ColumnType::Text),
        )
        .unwrap_err();
    assert!(err.to_string().contains("Duplicate column"));
    assert_eq!(db.column_count("patients", "full_name"), 1);
}

#[test]
fn test_drop_missing_column_fails() {
    let db = MemoryBackend::new();
    db.create_table(&patients()).unwrap();
    assert!(db
        .drop_column(&ObjectName::new("patients"), &ObjectName::new("phone"))
        .is_err());
}

#[test]
fn test_index_requires_columns() {
    let db = MemoryBackend::new();
    db.create_table(&patients()).unwrap();
    let bad = IndexDef::new("ix_patients_phone", "patients", &["phone"]);
    assert!(db.create_index(&bad).is_err());

    let good = IndexDef::new("ix_patients_name", "patients", &["full_name"]);
    db.create_index(&good).unwrap();
    assert!(db.create_index(&good).is_err());
    db.drop_index(&good.table, &good.name).unwrap();
    assert!(db.drop_index(&good.table, &good.name).is_err());
}

#[test]
fn test_add_and_drop_foreign_key() {
    let db = MemoryBackend::new();
    db.create_table(&patients()).unwrap();
    let table = TableDef::new("appointments")
        .column(ColumnDef::new("id", ColumnType::BigInt))
        .column(ColumnDef::new("patient_id", ColumnType::BigInt));
    db.create_table(&table).unwrap();

    let fk = ForeignKeyDef::new(
        "fk_appointments_patient",
        "appointments",
        &["patient_id"],
        "patients",
        &["id"],
    );
    db.add_foreign_key(&fk).unwrap();
    assert!(db.object_exists(&fk_object()).unwrap());
    assert!(db.add_foreign_key(&fk).is_err());

    db.drop_foreign_key(&fk.table, &fk.name).unwrap();
    assert!(!db.object_exists(&fk_object()).unwrap());
}

#[test]
fn test_seed_rows() {
    let db = MemoryBackend::new();
    db.create_table(&patients()).unwrap();
    let row = SeedRow::new("patients", "id", 1).value("full_name", "Grace Hopper");
    let key = SqlValue::Int(1);

    db.insert_row(&row).unwrap();
    assert!(db.row_exists(&row.table, &row.key_column, &key).unwrap());
    assert_eq!(db.row_count("patients"), 1);

    db.delete_row(&row.table, &row.key_column, &key).unwrap();
    assert_eq!(db.row_count("patients"), 0);
}

#[test]
fn test_injected_mutation_failure() {
    let db = MemoryBackend::new();
    db.fail_mutations_matching("patients");
    assert!(db.create_table(&patients()).is_err());
    assert_eq!(db.mutation_count(), 0);

    db.clear_failures();
    db.create_table(&patients()).unwrap();
    assert_eq!(db.mutation_count(), 1);
}

#[test]
fn test_injected_query_failure() {
    let db = MemoryBackend::new();
    db.fail_queries(true);
    let err = db
        .object_exists(&SchemaObject::Table {
            table: ObjectName::new("patients"),
        })
        .unwrap_err();
    assert!(matches!(err, DbError::QueryError(_)));
}

#[test]
fn test_history_requires_table() {
    let db = MemoryBackend::new();
    assert!(db.applied_records().is_err());
    db.ensure_history_table().unwrap();
    assert!(db.applied_records().unwrap().is_empty());
}

#[test]
fn test_history_rejects_duplicates() {
    let db = MemoryBackend::new();
    db.ensure_history_table().unwrap();
    let record = AppliedRecord {
        changeset_id: ChangesetId::new("20240115093000_initial_schema"),
        name: "initial_schema".to_string(),
        applied_at: Utc::now(),
    };
    db.record_applied(&record).unwrap();
    assert!(db.record_applied(&record).is_err());
    assert_eq!(db.applied_records().unwrap().len(), 1);
}

#[test]
fn test_history_writes_do_not_count_as_mutations() {
    let db = MemoryBackend::new();
    db.ensure_history_table().unwrap();
    db.record_applied(&AppliedRecord {
        changeset_id: ChangesetId::new("20240115093000_initial_schema"),
        name: "initial_schema".to_string(),
        applied_at: Utc::now(),
    })
    .unwrap();
    assert_eq!(db.mutation_count(), 0);
}

#[test]
fn test_lock_cycle() {
    let db = MemoryBackend::new();
    let now = Utc::now();
    assert_eq!(db.try_acquire_lock("a", now).unwrap(), LockStatus::Acquired);
    assert!(matches!(
        db.try_acquire_lock("b", now).unwrap(),
        LockStatus::Held(ref info) if info.holder == "a"
    ));
    assert!(!db.release_lock("b").unwrap());
    assert!(db.release_lock("a").unwrap());
    assert_eq!(db.lock_holder().unwrap(), None);
}
