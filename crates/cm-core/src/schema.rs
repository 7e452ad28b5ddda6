//! Schema object definitions used by changesets.
//!
//! Definitions describe the desired state of a table, column, index, foreign
//! key or seed row. Backends render them to DDL; the runner only uses their
//! names to ask whether the object already exists.
//!
//! Name comparison is case-insensitive everywhere: [`ObjectName::normalized`]
//! is the uppercase form used for every existence check.

use crate::error::{CoreError, CoreResult};
use crate::identifier::define_identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest identifier accepted (MySQL's limit).
const MAX_IDENTIFIER_LEN: usize = 64;

define_identifier! {
    /// A table, column, index or constraint name as authored.
    pub struct ObjectName;
    validate = validate_object_name;
}

impl ObjectName {
    /// Uppercase form used for existence checks.
    pub fn normalized(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }

    /// Case-insensitive comparison with another name.
    pub fn matches(&self, other: &str) -> bool {
        self.as_str().eq_ignore_ascii_case(other)
    }
}

fn validate_object_name(name: &str) -> CoreResult<()> {
    let invalid = |reason: &str| CoreError::InvalidObjectName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    let Some(first) = name.chars().next() else {
        return Err(invalid("must not be empty"));
    };
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid("longer than 64 characters"));
    }
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(invalid("must start with a letter or '_'"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("may only contain letters, digits and '_'"));
    }
    Ok(())
}

fn names(items: &[&str]) -> Vec<ObjectName> {
    items.iter().map(|s| ObjectName::new(*s)).collect()
}

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Integer,
    BigInt,
    Boolean,
    Text,
    Varchar(u32),
    Timestamp,
    Date,
    Decimal(u8, u8),
    Blob,
    Uuid,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => write!(f, "INTEGER"),
            ColumnType::BigInt => write!(f, "BIGINT"),
            ColumnType::Boolean => write!(f, "BOOLEAN"),
            ColumnType::Text => write!(f, "TEXT"),
            ColumnType::Varchar(len) => write!(f, "VARCHAR({len})"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Decimal(p, s) => write!(f, "DECIMAL({p}, {s})"),
            ColumnType::Blob => write!(f, "BLOB"),
            ColumnType::Uuid => write!(f, "UUID"),
        }
    }
}

/// Column definition. Columns are nullable unless [`not_null`](Self::not_null) is called.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: ObjectName,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    /// Raw SQL default expression, e.g. `'scheduled'` or `CURRENT_TIMESTAMP`.
    pub default: Option<String>,
}

impl ColumnDef {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: ObjectName::new(name),
            column_type,
            nullable: true,
            unique: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_sql(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// What happens to referencing rows when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReferentialAction {
    #[default]
    NoAction,
    Restrict,
    Cascade,
    SetNull,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
        }
    }
}

/// Foreign key constraint definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    pub name: ObjectName,
    pub table: ObjectName,
    pub columns: Vec<ObjectName>,
    pub references_table: ObjectName,
    pub references_columns: Vec<ObjectName>,
    pub on_delete: ReferentialAction,
}

impl ForeignKeyDef {
    pub fn new(
        name: &str,
        table: &str,
        columns: &[&str],
        references_table: &str,
        references_columns: &[&str],
    ) -> Self {
        Self {
            name: ObjectName::new(name),
            table: ObjectName::new(table),
            columns: names(columns),
            references_table: ObjectName::new(references_table),
            references_columns: names(references_columns),
            on_delete: ReferentialAction::default(),
        }
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// Table definition, including inline foreign keys.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: ObjectName,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<ObjectName>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: ObjectName::new(name),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = names(columns);
        self
    }

    /// Add an inline foreign key from `columns` of this table.
    pub fn foreign_key(
        mut self,
        name: &str,
        columns: &[&str],
        references_table: &str,
        references_columns: &[&str],
    ) -> Self {
        let fk = ForeignKeyDef::new(
            name,
            self.name.as_str(),
            columns,
            references_table,
            references_columns,
        );
        self.foreign_keys.push(fk);
        self
    }

    /// Look up a column by case-insensitive name.
    pub fn find_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name.matches(name))
    }

    /// Check that the primary key and foreign keys reference declared columns.
    pub fn validate(&self) -> CoreResult<()> {
        let missing = |col: &ObjectName, what: &str| CoreError::InvalidObjectName {
            name: col.to_string(),
            reason: format!("{what} column is not declared on table {}", self.name),
        };
        if self.columns.is_empty() {
            return Err(CoreError::InvalidObjectName {
                name: self.name.to_string(),
                reason: "table has no columns".to_string(),
            });
        }
        for col in &self.primary_key {
            if self.find_column(col).is_none() {
                return Err(missing(col, "primary key"));
            }
        }
        for fk in &self.foreign_keys {
            for col in &fk.columns {
                if self.find_column(col).is_none() {
                    return Err(missing(col, "foreign key"));
                }
            }
        }
        Ok(())
    }
}

/// Index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    pub name: ObjectName,
    pub table: ObjectName,
    pub columns: Vec<ObjectName>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: &str, table: &str, columns: &[&str]) -> Self {
        Self {
            name: ObjectName::new(name),
            table: ObjectName::new(table),
            columns: names(columns),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A schema object whose existence can be queried.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SchemaObject {
    Table {
        table: ObjectName,
    },
    Column {
        table: ObjectName,
        column: ObjectName,
    },
    Index {
        table: ObjectName,
        index: ObjectName,
    },
    ForeignKey {
        table: ObjectName,
        constraint: ObjectName,
    },
}

impl SchemaObject {
    /// The table the object belongs to (or is).
    pub fn table(&self) -> &ObjectName {
        match self {
            SchemaObject::Table { table }
            | SchemaObject::Column { table, .. }
            | SchemaObject::Index { table, .. }
            | SchemaObject::ForeignKey { table, .. } => table,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SchemaObject::Table { .. } => "table",
            SchemaObject::Column { .. } => "column",
            SchemaObject::Index { .. } => "index",
            SchemaObject::ForeignKey { .. } => "foreign key",
        }
    }
}

impl fmt::Display for SchemaObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaObject::Table { table } => write!(f, "table {}", table.normalized()),
            SchemaObject::Column { table, column } => write!(
                f,
                "column {}.{}",
                table.normalized(),
                column.normalized()
            ),
            SchemaObject::Index { table, index } => {
                write!(f, "index {} ON {}", index.normalized(), table.normalized())
            }
            SchemaObject::ForeignKey { table, constraint } => write!(
                f,
                "foreign key {} ON {}",
                constraint.normalized(),
                table.normalized()
            ),
        }
    }
}

/// A literal value bound into seed statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{b}"),
            SqlValue::Int(i) => write!(f, "{i}"),
            SqlValue::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(i64::from(v))
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

/// A row identified by a single key column, seeded at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedRow {
    pub table: ObjectName,
    pub key_column: ObjectName,
    pub key: SqlValue,
    /// All columns to insert, including the key column.
    pub values: Vec<(ObjectName, SqlValue)>,
}

impl SeedRow {
    pub fn new(table: &str, key_column: &str, key: impl Into<SqlValue>) -> Self {
        let key = key.into();
        let key_column = ObjectName::new(key_column);
        Self {
            table: ObjectName::new(table),
            values: vec![(key_column.clone(), key.clone())],
            key_column,
            key,
        }
    }

    pub fn value(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.values.push((ObjectName::new(column), value.into()));
        self
    }
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
