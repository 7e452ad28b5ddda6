use crate::names::{MEDICAL_RECORDS, MEDICAL_RECORD_ATTACHMENTS};
use cm_core::{ChangesetId, ColumnDef, ColumnType, IndexDef, TableDef};
use cm_migrate::{Changeset, MigrateResult, SchemaManager};

const IX_ATTACHMENTS_RECORD: &str = "ix_medical_record_attachments_record";

/// Metadata for files attached to a medical record. File contents live in
/// external storage under `storage_path`.
pub struct AddRecordAttachments;

fn attachments() -> TableDef {
    TableDef::new(MEDICAL_RECORD_ATTACHMENTS)
        .column(ColumnDef::new("id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("medical_record_id", ColumnType::BigInt).not_null())
        .column(ColumnDef::new("file_name", ColumnType::Varchar(255)).not_null())
        .column(ColumnDef::new("content_type", ColumnType::Varchar(127)).not_null())
        .column(ColumnDef::new("storage_path", ColumnType::Varchar(1024)).not_null())
        .column(ColumnDef::new("size_bytes", ColumnType::BigInt).not_null())
        .column(
            ColumnDef::new("uploaded_at", ColumnType::Timestamp)
                .not_null()
                .default_sql("CURRENT_TIMESTAMP"),
        )
        .primary_key(&["id"])
        .foreign_key(
            "fk_medical_record_attachments_record",
            &["medical_record_id"],
            MEDICAL_RECORDS,
            &["id"],
        )
}

impl Changeset for AddRecordAttachments {
    fn id(&self) -> ChangesetId {
        ChangesetId::new("20240305160000_add_record_attachments")
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_table(&attachments())?;
        schema.ensure_index(&IndexDef::new(
            IX_ATTACHMENTS_RECORD,
            MEDICAL_RECORD_ATTACHMENTS,
            &["medical_record_id"],
        ))?;
        Ok(())
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_index_dropped(MEDICAL_RECORD_ATTACHMENTS, IX_ATTACHMENTS_RECORD)?;
        schema.ensure_table_dropped(MEDICAL_RECORD_ATTACHMENTS)?;
        Ok(())
    }
}
