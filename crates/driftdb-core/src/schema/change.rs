//! Schema changes produced by the diff engine.

use super::{Attr, Column, ForeignKey, Index, Schema, Table};
use std::ops::{BitOr, BitOrAssign};

/// Bitset recording which fields of a modified element differ.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeKind(u16);

impl ChangeKind {
    /// No differing fields.
    pub const NONE: ChangeKind = ChangeKind(0);
    /// Column type changed.
    pub const TYPE: ChangeKind = ChangeKind(1);
    /// Nullability changed.
    pub const NULL: ChangeKind = ChangeKind(1 << 1);
    /// Default value changed.
    pub const DEFAULT: ChangeKind = ChangeKind(1 << 2);
    /// Comment changed.
    pub const COMMENT: ChangeKind = ChangeKind(1 << 3);
    /// Character set changed.
    pub const CHARSET: ChangeKind = ChangeKind(1 << 4);
    /// Collation changed.
    pub const COLLATION: ChangeKind = ChangeKind(1 << 5);
    /// Index uniqueness changed.
    pub const UNIQUE: ChangeKind = ChangeKind(1 << 6);
    /// Index parts changed.
    pub const PARTS: ChangeKind = ChangeKind(1 << 7);
    /// Foreign-key local columns changed.
    pub const COLUMN: ChangeKind = ChangeKind(1 << 8);
    /// Foreign-key referenced columns changed.
    pub const REF_COLUMN: ChangeKind = ChangeKind(1 << 9);
    /// Foreign-key referenced table changed.
    pub const REF_TABLE: ChangeKind = ChangeKind(1 << 10);
    /// ON UPDATE action changed.
    pub const ON_UPDATE: ChangeKind = ChangeKind(1 << 11);
    /// ON DELETE action changed.
    pub const ON_DELETE: ChangeKind = ChangeKind(1 << 12);
    /// Attributes changed.
    pub const ATTRS: ChangeKind = ChangeKind(1 << 13);

    /// Whether all bits of `other` are set.
    pub fn is(self, other: ChangeKind) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ChangeKind {
    type Output = ChangeKind;
    fn bitor(self, rhs: ChangeKind) -> ChangeKind {
        ChangeKind(self.0 | rhs.0)
    }
}

impl BitOrAssign for ChangeKind {
    fn bitor_assign(&mut self, rhs: ChangeKind) {
        self.0 |= rhs.0;
    }
}

impl std::fmt::Debug for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [(ChangeKind, &str); 14] = [
            (ChangeKind::TYPE, "TYPE"),
            (ChangeKind::NULL, "NULL"),
            (ChangeKind::DEFAULT, "DEFAULT"),
            (ChangeKind::COMMENT, "COMMENT"),
            (ChangeKind::CHARSET, "CHARSET"),
            (ChangeKind::COLLATION, "COLLATION"),
            (ChangeKind::UNIQUE, "UNIQUE"),
            (ChangeKind::PARTS, "PARTS"),
            (ChangeKind::COLUMN, "COLUMN"),
            (ChangeKind::REF_COLUMN, "REF_COLUMN"),
            (ChangeKind::REF_TABLE, "REF_TABLE"),
            (ChangeKind::ON_UPDATE, "ON_UPDATE"),
            (ChangeKind::ON_DELETE, "ON_DELETE"),
            (ChangeKind::ATTRS, "ATTRS"),
        ];
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let mut first = true;
        for (flag, name) in NAMES {
            if self.is(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// A single change between two schema graphs.
///
/// Added and dropped elements carry an owned snapshot of the element;
/// modified elements carry both sides plus the bitset of differing fields.
/// Modified containers carry the element name and the nested changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A schema was added.
    AddSchema(Schema),
    /// A schema was dropped.
    DropSchema(Schema),
    /// A schema was modified.
    ModifySchema {
        /// Name of the modified schema.
        schema: String,
        /// Nested changes, in diff order.
        changes: Vec<Change>,
    },
    /// A table was added.
    AddTable(Table),
    /// A table was dropped.
    DropTable(Table),
    /// A table was modified.
    ModifyTable {
        /// Name of the modified table.
        table: String,
        /// Nested changes, in diff order.
        changes: Vec<Change>,
    },
    /// A column was added.
    AddColumn(Column),
    /// A column was dropped.
    DropColumn(Column),
    /// A column was modified.
    ModifyColumn {
        /// The column as it exists.
        from: Column,
        /// The column as desired.
        to: Column,
        /// The differing fields.
        change: ChangeKind,
    },
    /// An index was added.
    AddIndex(Index),
    /// An index was dropped.
    DropIndex(Index),
    /// An index was modified.
    ModifyIndex {
        /// The index as it exists.
        from: Index,
        /// The index as desired.
        to: Index,
        /// The differing fields.
        change: ChangeKind,
    },
    /// A foreign key was added.
    AddForeignKey(ForeignKey),
    /// A foreign key was dropped.
    DropForeignKey(ForeignKey),
    /// A foreign key was modified.
    ModifyForeignKey {
        /// The foreign key as it exists.
        from: ForeignKey,
        /// The foreign key as desired.
        to: ForeignKey,
        /// The differing fields.
        change: ChangeKind,
    },
    /// An attribute was added.
    AddAttr(Attr),
    /// An attribute was dropped.
    DropAttr(Attr),
    /// An attribute was modified.
    ModifyAttr {
        /// The attribute as it exists.
        from: Attr,
        /// The attribute as desired.
        to: Attr,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_bits() {
        let mut k = ChangeKind::NONE;
        assert!(k.is_empty());

        k |= ChangeKind::NULL;
        k |= ChangeKind::DEFAULT;
        assert!(k.is(ChangeKind::NULL));
        assert!(k.is(ChangeKind::DEFAULT));
        assert!(!k.is(ChangeKind::TYPE));
        assert!(k.is(ChangeKind::NULL | ChangeKind::DEFAULT));
        assert!(!k.is(ChangeKind::NULL | ChangeKind::TYPE));
    }

    #[test]
    fn test_change_kind_debug() {
        assert_eq!(format!("{:?}", ChangeKind::NONE), "NONE");
        let k = ChangeKind::NULL | ChangeKind::COMMENT;
        assert_eq!(format!("{k:?}"), "NULL|COMMENT");
    }
}
