//! DDL rendering for the DuckDB backend.
//!
//! Identifiers are double-quoted. Names are validated by `cm-core` before they
//! reach this point, but embedded quotes are still escaped. Values are never
//! inlined: seed statements use `?` placeholders.

use crate::error::{DbError, DbResult};
use cm_core::{ColumnDef, ForeignKeyDef, IndexDef, ObjectName, ReferentialAction, SeedRow, TableDef};

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_list(names: &[ObjectName]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn column_sql(column: &ColumnDef) -> String {
    let mut sql = format!("{} {}", quote_ident(&column.name), column.column_type);
    if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if column.unique {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    sql
}

/// DuckDB only supports the default referential action.
fn foreign_key_clause(fk: &ForeignKeyDef) -> DbResult<String> {
    if fk.on_delete != ReferentialAction::NoAction {
        return Err(DbError::NotImplemented {
            backend: "duckdb".to_string(),
            feature: format!("ON DELETE {} on {}", fk.on_delete.as_sql(), fk.name),
        });
    }
    Ok(format!(
        "FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_list(&fk.columns),
        quote_ident(&fk.references_table),
        quote_list(&fk.references_columns)
    ))
}

pub(crate) fn create_table_sql(table: &TableDef) -> DbResult<String> {
    let mut parts: Vec<String> = table.columns.iter().map(column_sql).collect();
    if !table.primary_key.is_empty() {
        parts.push(format!("PRIMARY KEY ({})", quote_list(&table.primary_key)));
    }
    for fk in &table.foreign_keys {
        parts.push(foreign_key_clause(fk)?);
    }
    Ok(format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_ident(&table.name),
        parts.join(",\n    ")
    ))
}

pub(crate) fn drop_table_sql(table: &ObjectName) -> String {
    format!("DROP TABLE {}", quote_ident(table))
}

pub(crate) fn add_column_sql(table: &ObjectName, column: &ColumnDef) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(table),
        column_sql(column)
    )
}

pub(crate) fn drop_column_sql(table: &ObjectName, column: &ObjectName) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote_ident(table),
        quote_ident(column)
    )
}

pub(crate) fn create_index_sql(index: &IndexDef) -> String {
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        quote_ident(&index.name),
        quote_ident(&index.table),
        quote_list(&index.columns)
    )
}

pub(crate) fn drop_index_sql(index: &ObjectName) -> String {
    format!("DROP INDEX {}", quote_ident(index))
}

pub(crate) fn insert_row_sql(row: &SeedRow) -> String {
    let columns: Vec<ObjectName> = row.values.iter().map(|(c, _)| c.clone()).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&row.table),
        quote_list(&columns),
        placeholders
    )
}

pub(crate) fn delete_row_sql(table: &ObjectName, key_column: &ObjectName) -> String {
    format!(
        "DELETE FROM {} WHERE {} = ?",
        quote_ident(table),
        quote_ident(key_column)
    )
}

pub(crate) fn count_rows_sql(table: &ObjectName, key_column: &ObjectName) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE {} = ?",
        quote_ident(table),
        quote_ident(key_column)
    )
}

#[cfg(test)]
#[path = "render_test.rs"]
mod tests;
