use crate::names::{DOCTORS, MEDICAL_RECORDS, PATIENTS};
use cm_core::{ChangesetId, ColumnDef, ColumnType, IndexDef, TableDef};
use cm_migrate::{Changeset, MigrateResult, SchemaManager};

const IX_MEDICAL_RECORDS_PATIENT: &str = "ix_medical_records_patient";

pub struct CreateMedicalRecords;

fn medical_records() -> TableDef {
    TableDef::new(MEDICAL_RECORDS)
        .column(ColumnDef::new("id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("patient_id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("doctor_id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("appointment_id", ColumnType::BigInt))
        .column(ColumnDef::new("diagnosis", ColumnType::Text))
        .column(ColumnDef::new("treatment", ColumnType::Text))
        .column(
            ColumnDef::new("recorded_at", ColumnType::Timestamp)
                .not_null()
                .default_sql("CURRENT_TIMESTAMP"),
        )
        .primary_key(&["id"])
        .foreign_key(
            "fk_medical_records_patient",
            &["patient_id"],
            PATIENTS,
            &["id"],
        )
        .foreign_key("fk_medical_records_doctor", &["doctor_id"], DOCTORS, &["id"])
}

impl Changeset for CreateMedicalRecords {
    fn id(&self) -> ChangesetId {
        ChangesetId::new("20240220101000_create_medical_records")
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_table(&medical_records())?;
        schema.ensure_index(&IndexDef::new(
            IX_MEDICAL_RECORDS_PATIENT,
            MEDICAL_RECORDS,
            &["patient_id"],
        ))?;
        Ok(())
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_index_dropped(MEDICAL_RECORDS, IX_MEDICAL_RECORDS_PATIENT)?;
        schema.ensure_table_dropped(MEDICAL_RECORDS)?;
        Ok(())
    }
}
