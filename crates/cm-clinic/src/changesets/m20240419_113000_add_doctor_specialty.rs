use crate::names::DOCTORS;
use cm_core::{ChangesetId, ColumnDef, ColumnType, IndexDef};
use cm_migrate::{Changeset, MigrateResult, SchemaManager};

const IX_DOCTORS_SPECIALTY: &str = "ix_doctors_specialty";

pub struct AddDoctorSpecialty;

impl Changeset for AddDoctorSpecialty {
    fn id(&self) -> ChangesetId {
        ChangesetId::new("20240419113000_add_doctor_specialty")
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_column(
            DOCTORS,
            &ColumnDef::new("specialty", ColumnType::Varchar(100)),
        )?;
        schema.ensure_index(&IndexDef::new(
            IX_DOCTORS_SPECIALTY,
            DOCTORS,
            &["specialty"],
        ))?;
        Ok(())
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_index_dropped(DOCTORS, IX_DOCTORS_SPECIALTY)?;
        schema.ensure_column_dropped(DOCTORS, "specialty")?;
        Ok(())
    }
}
