//! Generic diff algorithm over realms, schemas and tables.
//!
//! The engine pairs elements by name and emits [`Change`]s in a fixed
//! order: attribute changes, then modified elements in `from` order, then
//! dropped elements in `from` order, then added elements in `to` order.
//! Type equivalence and dialect-specific attributes are delegated to the
//! [`DialectDiffer`].

use crate::schema::{attr, Attr, Change, ChangeKind, ColumnType, Realm, Schema, Table};
use thiserror::Error;

/// Diff failures.
#[derive(Debug, Error)]
pub enum DiffError {
    /// The two elements do not describe the same object.
    #[error("mismatched {element} names: {from:?} <> {to:?}")]
    NameMismatch {
        /// Element kind ("schema" or "table").
        element: &'static str,
        /// Name on the current side.
        from: String,
        /// Name on the desired side.
        to: String,
    },

    /// One side declares a primary key and the other does not. The engine
    /// refuses to infer the intended restructuring.
    #[error("changing primary key of table {table:?} is not supported")]
    PrimaryKeyChanged {
        /// Table name.
        table: String,
    },
}

/// Dialect-specific hooks consumed by the generic engine.
pub trait DialectDiffer {
    /// Whether two column types are equivalent. Nullability is tracked
    /// separately and must be ignored here.
    fn types_equal(&self, from: &ColumnType, to: &ColumnType) -> bool {
        from.kind == to.kind && from.raw.eq_ignore_ascii_case(&to.raw)
    }

    /// Diff attributes the generic engine does not recognize. The default
    /// pairs [`Attr::Custom`] attributes by key.
    fn custom_attrs_diff(&self, from: &[Attr], to: &[Attr]) -> Vec<Change> {
        let key = |a: &Attr| match a {
            Attr::Custom { key, .. } => Some(key.clone()),
            _ => None,
        };
        let mut changes = Vec::new();
        for f in attr::customs(from) {
            match attr::customs(to).find(|t| key(t) == key(f)) {
                Some(t) if t != f => changes.push(Change::ModifyAttr {
                    from: f.clone(),
                    to: t.clone(),
                }),
                Some(_) => {}
                None => changes.push(Change::DropAttr(f.clone())),
            }
        }
        for t in attr::customs(to) {
            if !attr::customs(from).any(|f| key(f) == key(t)) {
                changes.push(Change::AddAttr(t.clone()));
            }
        }
        changes
    }
}

/// Dialect with no custom behavior: strict raw-type comparison, custom
/// attributes paired by key.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDialect;

impl DialectDiffer for DefaultDialect {}

/// The diff engine, parameterized over a dialect.
#[derive(Debug, Default)]
pub struct Differ<D = DefaultDialect> {
    dialect: D,
}

impl Differ<DefaultDialect> {
    /// Create an engine with the default dialect.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: DialectDiffer> Differ<D> {
    /// Create an engine over the given dialect.
    pub fn with_dialect(dialect: D) -> Self {
        Self { dialect }
    }

    /// Compute the changes needed to turn realm `from` into realm `to`.
    pub fn realm_diff(&self, from: &Realm, to: &Realm) -> Result<Vec<Change>, DiffError> {
        let mut changes = self.attrs_diff(&from.attrs, &to.attrs);

        let mut dropped = Vec::new();
        for fs in &from.schemas {
            match to.schema(&fs.name) {
                Some(ts) => {
                    let nested = self.schema_diff(fs, ts)?;
                    if !nested.is_empty() {
                        changes.push(Change::ModifySchema {
                            schema: fs.name.clone(),
                            changes: nested,
                        });
                    }
                }
                None => dropped.push(Change::DropSchema(fs.clone())),
            }
        }
        changes.extend(dropped);

        for ts in &to.schemas {
            if from.schema(&ts.name).is_none() {
                changes.push(Change::AddSchema(ts.clone()));
            }
        }
        Ok(changes)
    }

    /// Compute the changes needed to turn schema `from` into schema `to`.
    pub fn schema_diff(&self, from: &Schema, to: &Schema) -> Result<Vec<Change>, DiffError> {
        if from.name != to.name {
            return Err(DiffError::NameMismatch {
                element: "schema",
                from: from.name.clone(),
                to: to.name.clone(),
            });
        }

        let mut changes = self.attrs_diff(&from.attrs, &to.attrs);

        let mut dropped = Vec::new();
        for ft in &from.tables {
            match to.table(&ft.name) {
                Some(tt) => {
                    let nested = self.table_diff(ft, tt)?;
                    if !nested.is_empty() {
                        changes.push(Change::ModifyTable {
                            table: ft.name.clone(),
                            changes: nested,
                        });
                    }
                }
                None => dropped.push(Change::DropTable(ft.clone())),
            }
        }
        changes.extend(dropped);

        for tt in &to.tables {
            if from.table(&tt.name).is_none() {
                changes.push(Change::AddTable(tt.clone()));
            }
        }
        Ok(changes)
    }

    /// Compute the changes needed to turn table `from` into table `to`.
    pub fn table_diff(&self, from: &Table, to: &Table) -> Result<Vec<Change>, DiffError> {
        if from.name != to.name {
            return Err(DiffError::NameMismatch {
                element: "table",
                from: from.name.clone(),
                to: to.name.clone(),
            });
        }
        // Only asymmetric presence is an error; when both sides declare a
        // key, composition changes are left to the dialect.
        if from.has_primary_key() != to.has_primary_key() {
            return Err(DiffError::PrimaryKeyChanged {
                table: from.name.clone(),
            });
        }

        let mut changes = self.attrs_diff(&from.attrs, &to.attrs);
        self.columns_diff(from, to, &mut changes);
        self.indexes_diff(from, to, &mut changes);
        self.foreign_keys_diff(from, to, &mut changes);
        Ok(changes)
    }

    fn columns_diff(&self, from: &Table, to: &Table, changes: &mut Vec<Change>) {
        let mut dropped = Vec::new();
        for fc in &from.columns {
            match to.column(&fc.name) {
                Some(tc) => {
                    let mut kind = ChangeKind::NONE;
                    if !self.dialect.types_equal(&fc.column_type, &tc.column_type) {
                        kind |= ChangeKind::TYPE;
                    }
                    if fc.column_type.null != tc.column_type.null {
                        kind |= ChangeKind::NULL;
                    }
                    if fc.default != tc.default {
                        kind |= ChangeKind::DEFAULT;
                    }
                    if attr::comment(&fc.attrs) != attr::comment(&tc.attrs) {
                        kind |= ChangeKind::COMMENT;
                    }
                    if attr::charset(&fc.attrs) != attr::charset(&tc.attrs) {
                        kind |= ChangeKind::CHARSET;
                    }
                    if attr::collation(&fc.attrs) != attr::collation(&tc.attrs) {
                        kind |= ChangeKind::COLLATION;
                    }
                    if !kind.is_empty() {
                        changes.push(Change::ModifyColumn {
                            from: fc.clone(),
                            to: tc.clone(),
                            change: kind,
                        });
                    }
                }
                None => dropped.push(Change::DropColumn(fc.clone())),
            }
        }
        changes.extend(dropped);
        for tc in &to.columns {
            if from.column(&tc.name).is_none() {
                changes.push(Change::AddColumn(tc.clone()));
            }
        }
    }

    fn indexes_diff(&self, from: &Table, to: &Table, changes: &mut Vec<Change>) {
        let mut dropped = Vec::new();
        for fi in &from.indexes {
            match to.index(&fi.name) {
                Some(ti) => {
                    let mut kind = ChangeKind::NONE;
                    if fi.unique != ti.unique {
                        kind |= ChangeKind::UNIQUE;
                    }
                    // Parts are positional; the declared order is the
                    // sequence, so sequence numbers are not re-compared.
                    let parts = |i: &crate::schema::Index| {
                        i.parts.iter().map(|p| p.part.clone()).collect::<Vec<_>>()
                    };
                    if parts(fi) != parts(ti) {
                        kind |= ChangeKind::PARTS;
                    }
                    if fi.attrs != ti.attrs {
                        kind |= ChangeKind::ATTRS;
                    }
                    if !kind.is_empty() {
                        changes.push(Change::ModifyIndex {
                            from: fi.clone(),
                            to: ti.clone(),
                            change: kind,
                        });
                    }
                }
                None => dropped.push(Change::DropIndex(fi.clone())),
            }
        }
        changes.extend(dropped);
        for ti in &to.indexes {
            if from.index(&ti.name).is_none() {
                changes.push(Change::AddIndex(ti.clone()));
            }
        }
    }

    fn foreign_keys_diff(&self, from: &Table, to: &Table, changes: &mut Vec<Change>) {
        let mut dropped = Vec::new();
        for ff in &from.foreign_keys {
            match to.foreign_key(&ff.name) {
                Some(tf) => {
                    let mut kind = ChangeKind::NONE;
                    if ff.columns != tf.columns {
                        kind |= ChangeKind::COLUMN;
                    }
                    if ff.ref_columns != tf.ref_columns {
                        kind |= ChangeKind::REF_COLUMN;
                    }
                    if ff.ref_table != tf.ref_table {
                        kind |= ChangeKind::REF_TABLE;
                    }
                    if ff.on_update != tf.on_update {
                        kind |= ChangeKind::ON_UPDATE;
                    }
                    if ff.on_delete != tf.on_delete {
                        kind |= ChangeKind::ON_DELETE;
                    }
                    if !kind.is_empty() {
                        changes.push(Change::ModifyForeignKey {
                            from: ff.clone(),
                            to: tf.clone(),
                            change: kind,
                        });
                    }
                }
                None => dropped.push(Change::DropForeignKey(ff.clone())),
            }
        }
        changes.extend(dropped);
        for tf in &to.foreign_keys {
            if from.foreign_key(&tf.name).is_none() {
                changes.push(Change::AddForeignKey(tf.clone()));
            }
        }
    }

    /// Attribute diff protocol: recognized kinds are compared here in a
    /// fixed order (charset, collation, comment, checks); everything else
    /// goes to the dialect.
    fn attrs_diff(&self, from: &[Attr], to: &[Attr]) -> Vec<Change> {
        let mut changes = Vec::new();

        singleton_diff(&mut changes, attr::charset(from), attr::charset(to), Attr::Charset);
        singleton_diff(
            &mut changes,
            attr::collation(from),
            attr::collation(to),
            Attr::Collation,
        );
        singleton_diff(&mut changes, attr::comment(from), attr::comment(to), Attr::Comment);

        for fc in attr::checks(from) {
            match attr::checks(to).find(|tc| tc.name == fc.name) {
                Some(tc) if tc != fc => changes.push(Change::ModifyAttr {
                    from: Attr::Check(fc.clone()),
                    to: Attr::Check(tc.clone()),
                }),
                Some(_) => {}
                None => changes.push(Change::DropAttr(Attr::Check(fc.clone()))),
            }
        }
        for tc in attr::checks(to) {
            if !attr::checks(from).any(|fc| fc.name == tc.name) {
                changes.push(Change::AddAttr(Attr::Check(tc.clone())));
            }
        }

        changes.extend(self.dialect.custom_attrs_diff(from, to));
        changes
    }
}

// Diff protocol for an attribute kind appearing at most once per element.
fn singleton_diff(
    changes: &mut Vec<Change>,
    from: Option<&str>,
    to: Option<&str>,
    make: fn(String) -> Attr,
) {
    match (from, to) {
        (Some(f), Some(t)) if f != t => changes.push(Change::ModifyAttr {
            from: make(f.into()),
            to: make(t.into()),
        }),
        (Some(_), Some(_)) | (None, None) => {}
        (Some(f), None) => changes.push(Change::DropAttr(make(f.into()))),
        (None, Some(t)) => changes.push(Change::AddAttr(make(t.into()))),
    }
}
