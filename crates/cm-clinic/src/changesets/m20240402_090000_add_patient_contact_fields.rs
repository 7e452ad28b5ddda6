use crate::names::PATIENTS;
use cm_core::{ChangesetId, ColumnDef, ColumnType, IndexDef};
use cm_migrate::{Changeset, MigrateResult, SchemaManager};

const IX_PATIENTS_PHONE_NUMBER: &str = "ix_patients_phone_number";

/// Phone number and emergency contact for patients.
///
/// Some deployments added `phone_number` by hand before this changeset
/// existed; the column step tolerates that.
pub struct AddPatientContactFields;

const COLUMNS: [(&str, ColumnType); 3] = [
    ("phone_number", ColumnType::Varchar(32)),
    ("emergency_contact_name", ColumnType::Varchar(200)),
    ("emergency_contact_phone", ColumnType::Varchar(32)),
];

impl Changeset for AddPatientContactFields {
    fn id(&self) -> ChangesetId {
        ChangesetId::new("20240402090000_add_patient_contact_fields")
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        for (name, column_type) in COLUMNS {
            schema.ensure_column(PATIENTS, &ColumnDef::new(name, column_type))?;
        }
        schema.ensure_index(&IndexDef::new(
            IX_PATIENTS_PHONE_NUMBER,
            PATIENTS,
            &["phone_number"],
        ))?;
        Ok(())
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_index_dropped(PATIENTS, IX_PATIENTS_PHONE_NUMBER)?;
        for (name, _) in COLUMNS.iter().rev() {
            schema.ensure_column_dropped(PATIENTS, name)?;
        }
        Ok(())
    }
}
