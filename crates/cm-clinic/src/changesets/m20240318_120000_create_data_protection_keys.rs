use crate::names::DATA_PROTECTION_KEYS;
use cm_core::{ChangesetId, ColumnDef, ColumnType, SeedRow, TableDef};
use cm_migrate::{Changeset, MigrateResult, SchemaManager};

/// Friendly name of the seeded key-ring marker row.
pub const KEY_RING_MARKER: &str = "clinic-key-ring";

/// Key storage for the application's data-protection key ring.
pub struct CreateDataProtectionKeys;

fn data_protection_keys() -> TableDef {
    TableDef::new(DATA_PROTECTION_KEYS)
        .column(ColumnDef::new("id", ColumnType::Integer).not_null())
        .column(ColumnDef::new("friendly_name", ColumnType::Varchar(255)).unique())
        .column(ColumnDef::new("xml", ColumnType::Text))
        .primary_key(&["id"])
}

fn marker_row() -> SeedRow {
    SeedRow::new(DATA_PROTECTION_KEYS, "friendly_name", KEY_RING_MARKER)
        .value("id", 1)
        .value("xml", "<keyring version=\"1\" />")
}

impl Changeset for CreateDataProtectionKeys {
    fn id(&self) -> ChangesetId {
        ChangesetId::new("20240318120000_create_data_protection_keys")
    }

    fn up(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_table(&data_protection_keys())?;
        schema.ensure_row(&marker_row())?;
        Ok(())
    }

    fn down(&self, schema: &SchemaManager<'_>) -> MigrateResult<()> {
        schema.ensure_row_deleted(DATA_PROTECTION_KEYS, "friendly_name", KEY_RING_MARKER)?;
        schema.ensure_table_dropped(DATA_PROTECTION_KEYS)?;
        Ok(())
    }
}
