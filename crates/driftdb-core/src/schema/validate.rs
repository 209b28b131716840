//! Model invariant checks.
//!
//! Schemas handed to the diff engine are expected to satisfy these
//! invariants; violations are reported as errors, never repaired.

use super::{IndexPartKind, Schema, Table};
use std::collections::HashSet;
use thiserror::Error;

/// Violation of a schema model invariant.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Two columns of one table share a name.
    #[error("duplicate column {column:?} in table {table:?}")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Duplicated column name.
        column: String,
    },

    /// Two indexes of one table share a name.
    #[error("duplicate index {index:?} in table {table:?}")]
    DuplicateIndex {
        /// Table name.
        table: String,
        /// Duplicated index name.
        index: String,
    },

    /// Two foreign keys of one table share a name.
    #[error("duplicate foreign key {constraint:?} in table {table:?}")]
    DuplicateForeignKey {
        /// Table name.
        table: String,
        /// Duplicated constraint name.
        constraint: String,
    },

    /// A primary-key or index column does not exist on the table.
    #[error("unknown column {column:?} referenced by {referrer:?} in table {table:?}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Primary key, index or constraint referencing the column.
        referrer: String,
        /// Missing column name.
        column: String,
    },

    /// A foreign key's local and referenced column lists have different
    /// lengths.
    #[error(
        "foreign key {constraint:?} in table {table:?} has {columns} columns but {ref_columns} referenced columns"
    )]
    ForeignKeyArity {
        /// Table name.
        table: String,
        /// Constraint name.
        constraint: String,
        /// Local column count.
        columns: usize,
        /// Referenced column count.
        ref_columns: usize,
    },

    /// A referenced column does not exist on the referenced table.
    #[error("unknown column {column:?} referenced by {constraint:?} on table {ref_table:?}")]
    UnknownRefColumn {
        /// Constraint name.
        constraint: String,
        /// Referenced table name.
        ref_table: String,
        /// Missing column name.
        column: String,
    },
}

/// Validate one table, resolving foreign-key targets against `schema` when
/// the referenced table lives there.
pub fn validate_table(table: &Table, schema: Option<&Schema>) -> Result<(), SchemaError> {
    let mut names = HashSet::new();
    for c in &table.columns {
        if !names.insert(c.name.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                table: table.name.clone(),
                column: c.name.clone(),
            });
        }
    }

    for pk in &table.primary_key {
        if table.column(pk).is_none() {
            return Err(SchemaError::UnknownColumn {
                table: table.name.clone(),
                referrer: "primary key".into(),
                column: pk.clone(),
            });
        }
    }

    let mut names = HashSet::new();
    for i in &table.indexes {
        if !names.insert(i.name.as_str()) {
            return Err(SchemaError::DuplicateIndex {
                table: table.name.clone(),
                index: i.name.clone(),
            });
        }
        for part in &i.parts {
            if let IndexPartKind::Column(c) = &part.part {
                if table.column(c).is_none() {
                    return Err(SchemaError::UnknownColumn {
                        table: table.name.clone(),
                        referrer: i.name.clone(),
                        column: c.clone(),
                    });
                }
            }
        }
    }

    let mut names = HashSet::new();
    for fk in &table.foreign_keys {
        if !names.insert(fk.name.as_str()) {
            return Err(SchemaError::DuplicateForeignKey {
                table: table.name.clone(),
                constraint: fk.name.clone(),
            });
        }
        if fk.columns.len() != fk.ref_columns.len() {
            return Err(SchemaError::ForeignKeyArity {
                table: table.name.clone(),
                constraint: fk.name.clone(),
                columns: fk.columns.len(),
                ref_columns: fk.ref_columns.len(),
            });
        }
        for c in &fk.columns {
            if table.column(c).is_none() {
                return Err(SchemaError::UnknownColumn {
                    table: table.name.clone(),
                    referrer: fk.name.clone(),
                    column: c.clone(),
                });
            }
        }
        // Referenced columns are resolvable only when the target table is
        // part of the same schema.
        if let Some(ref_table) = schema.and_then(|s| s.table(&fk.ref_table)) {
            for c in &fk.ref_columns {
                if ref_table.column(c).is_none() {
                    return Err(SchemaError::UnknownRefColumn {
                        constraint: fk.name.clone(),
                        ref_table: fk.ref_table.clone(),
                        column: c.clone(),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Validate every table of a schema.
pub fn validate_schema(schema: &Schema) -> Result<(), SchemaError> {
    for table in &schema.tables {
        validate_table(table, Some(schema))?;
    }
    Ok(())
}
