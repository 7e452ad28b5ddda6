use crate::names::APPOINTMENTS;
use cm_core::{ChangesetId, ColumnDef, ColumnType, IndexDef};
use cm_migrate::{Changeset, MigrateResult, SchemaManager};

const IX_APPOINTMENTS_STATUS: &str = "ix_appointments_status";

/// Free-text notes and a cancellation timestamp on appointments.
pub struct AddAppointmentNotes;

impl Changeset for AddAppointmentNotes {
    fn id(&self) -> ChangesetId {
        ChangesetId::new("20240203141500_add_appointment_notes")
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_column(APPOINTMENTS, &ColumnDef::new("notes", ColumnType::Text))?;
        schema.ensure_column(
            APPOINTMENTS,
            &ColumnDef::new("cancelled_at", ColumnType::Timestamp),
        )?;
        schema.ensure_index(&IndexDef::new(
            IX_APPOINTMENTS_STATUS,
            APPOINTMENTS,
            &["status"],
        ))?;
        Ok(())
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_index_dropped(APPOINTMENTS, IX_APPOINTMENTS_STATUS)?;
        schema.ensure_column_dropped(APPOINTMENTS, "cancelled_at")?;
        schema.ensure_column_dropped(APPOINTMENTS, "notes")?;
        Ok(())
    }
}
