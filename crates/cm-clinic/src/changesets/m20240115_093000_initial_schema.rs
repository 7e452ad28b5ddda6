use crate::names::{APPOINTMENTS, DOCTORS, PATIENTS, USERS};
use cm_core::{ChangesetId, ColumnDef, ColumnType, IndexDef, TableDef};
use cm_migrate::{Changeset, MigrateResult, SchemaManager};

const IX_APPOINTMENTS_DOCTOR_SCHEDULE: &str = "ix_appointments_doctor_schedule";
const IX_APPOINTMENTS_PATIENT: &str = "ix_appointments_patient";

/// Users, doctors, patients and appointments.
pub struct InitialSchema;

fn id() -> ColumnDef {
    ColumnDef::new("id", ColumnType::BigInt).not_null()
}

fn created_at() -> ColumnDef {
    ColumnDef::new("created_at", ColumnType::Timestamp)
        .not_null()
        .default_sql("CURRENT_TIMESTAMP")
}

fn users() -> TableDef {
    TableDef::new(USERS)
        .column(id())
        .column(
            ColumnDef::new("email", ColumnType::Varchar(255))
                .not_null()
                .unique(),
        )
        .column(ColumnDef::new("password_hash", ColumnType::Varchar(255)).not_null())
        .column(
            ColumnDef::new("role", ColumnType::Varchar(32))
                .not_null()
                .default_sql("'patient'"),
        )
        .column(created_at())
        .primary_key(&["id"])
}

fn doctors() -> TableDef {
    TableDef::new(DOCTORS)
        .column(id())
        .column(ColumnDef::new("user_id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("full_name", ColumnType::Varchar(200)).not_null())
        .column(ColumnDef::new("license_number", ColumnType::Varchar(64)).unique())
        .column(created_at())
        .primary_key(&["id"])
        .foreign_key("fk_doctors_user", &["user_id"], USERS, &["id"])
}

fn patients() -> TableDef {
    TableDef::new(PATIENTS)
        .column(id())
        .column(ColumnDef::new("user_id", ColumnType::BigInt))
        .column(ColumnDef::new("full_name", ColumnType::Varchar(200)).not_null())
        .column(ColumnDef::new("date_of_birth", ColumnType::Date))
        .column(created_at())
        .primary_key(&["id"])
        .foreign_key("fk_patients_user", &["user_id"], USERS, &["id"])
}

fn appointments() -> TableDef {
    TableDef::new(APPOINTMENTS)
        .column(id())
        .column(ColumnDef::new("patient_id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("doctor_id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("scheduled_at", ColumnType::Timestamp).not_null())
        .column(
            ColumnDef::new("duration_minutes", ColumnType::Integer)
                .not_null()
                .default_sql("30"),
        )
        .column(
            ColumnDef::new("status", ColumnType::Varchar(32))
                .not_null()
                .default_sql("'scheduled'"),
        )
        .column(created_at())
        .primary_key(&["id"])
        .foreign_key("fk_appointments_patient", &["patient_id"], PATIENTS, &["id"])
        .foreign_key("fk_appointments_doctor", &["doctor_id"], DOCTORS, &["id"])
}

impl Changeset for InitialSchema {
    fn id(&self) -> ChangesetId {
        ChangesetId::new("20240115093000_initial_schema")
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_table(&users())?;
        schema.ensure_table(&doctors())?;
        schema.ensure_table(&patients())?;
        schema.ensure_table(&appointments())?;
        schema.ensure_index(&IndexDef::new(
            IX_APPOINTMENTS_DOCTOR_SCHEDULE,
            APPOINTMENTS,
            &["doctor_id", "scheduled_at"],
        ))?;
        schema.ensure_index(&IndexDef::new(
            IX_APPOINTMENTS_PATIENT,
            APPOINTMENTS,
            &["patient_id"],
        ))?;
        Ok(())
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_index_dropped(APPOINTMENTS, IX_APPOINTMENTS_PATIENT)?;
        schema.ensure_index_dropped(APPOINTMENTS, IX_APPOINTMENTS_DOCTOR_SCHEDULE)?;
        schema.ensure_table_dropped(APPOINTMENTS)?;
        schema.ensure_table_dropped(PATIENTS)?;
        schema.ensure_table_dropped(DOCTORS)?;
        schema.ensure_table_dropped(USERS)?;
        Ok(())
    }
}
