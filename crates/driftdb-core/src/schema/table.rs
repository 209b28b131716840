//! Table definitions: columns, primary key, indexes and foreign keys.

use super::{Attr, Column};

/// Referential action of a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceAction {
    /// Take no action.
    #[default]
    NoAction,
    /// Reject the change.
    Restrict,
    /// Propagate the change.
    Cascade,
    /// Set referencing columns to NULL.
    SetNull,
    /// Set referencing columns to their default.
    SetDefault,
}

impl std::fmt::Display for ReferenceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceAction::NoAction => write!(f, "NO ACTION"),
            ReferenceAction::Restrict => write!(f, "RESTRICT"),
            ReferenceAction::Cascade => write!(f, "CASCADE"),
            ReferenceAction::SetNull => write!(f, "SET NULL"),
            ReferenceAction::SetDefault => write!(f, "SET DEFAULT"),
        }
    }
}

/// One part of an index: a column reference or an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexPartKind {
    /// Reference to a column of the owning table, by name.
    Column(String),
    /// An indexed expression.
    Expr(String),
}

/// An ordered part of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPart {
    /// Position within the index, starting at 1.
    pub seq_no: usize,
    /// The indexed column or expression.
    pub part: IndexPartKind,
}

impl IndexPart {
    /// Create an index part over a column.
    pub fn column(seq_no: usize, name: impl Into<String>) -> Self {
        Self {
            seq_no,
            part: IndexPartKind::Column(name.into()),
        }
    }

    /// Create an index part over an expression.
    pub fn expr(seq_no: usize, expr: impl Into<String>) -> Self {
        Self {
            seq_no,
            part: IndexPartKind::Expr(expr.into()),
        }
    }
}

/// An index on a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Index name, unique within the table.
    pub name: String,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Ordered index parts.
    pub parts: Vec<IndexPart>,
    /// Index attributes.
    pub attrs: Vec<Attr>,
}

impl Index {
    /// Create a non-unique index.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: false,
            parts: Vec::new(),
            attrs: Vec::new(),
        }
    }

    /// Create a unique index.
    pub fn unique(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unique: true,
            parts: Vec::new(),
            attrs: Vec::new(),
        }
    }

    /// Append a part over the named column.
    pub fn on_column(mut self, name: impl Into<String>) -> Self {
        let seq = self.parts.len() + 1;
        self.parts.push(IndexPart::column(seq, name));
        self
    }

    /// Append a part over an expression.
    pub fn on_expr(mut self, expr: impl Into<String>) -> Self {
        let seq = self.parts.len() + 1;
        self.parts.push(IndexPart::expr(seq, expr));
        self
    }

    /// Append an attribute.
    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }
}

/// A foreign key constraint.
///
/// Columns are referenced by name; the referenced table belongs to the same
/// schema unless the dialect says otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Constraint name, unique within the table.
    pub name: String,
    /// Local columns, ordered.
    pub columns: Vec<String>,
    /// Referenced table name.
    pub ref_table: String,
    /// Referenced columns, ordered; same arity as `columns`.
    pub ref_columns: Vec<String>,
    /// Action on update of the referenced row.
    pub on_update: ReferenceAction,
    /// Action on delete of the referenced row.
    pub on_delete: ReferenceAction,
}

impl ForeignKey {
    /// Create a foreign key referencing `ref_table`.
    pub fn new(name: impl Into<String>, ref_table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            ref_table: ref_table.into(),
            ref_columns: Vec::new(),
            on_update: ReferenceAction::NoAction,
            on_delete: ReferenceAction::NoAction,
        }
    }

    /// Append a (local column, referenced column) pair.
    pub fn on(mut self, column: impl Into<String>, ref_column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self.ref_columns.push(ref_column.into());
        self
    }

    /// Set the ON UPDATE action.
    pub fn on_update(mut self, action: ReferenceAction) -> Self {
        self.on_update = action;
        self
    }

    /// Set the ON DELETE action.
    pub fn on_delete(mut self, action: ReferenceAction) -> Self {
        self.on_delete = action;
        self
    }
}

/// A table within a schema.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    /// Table name, unique within the schema.
    pub name: String,
    /// Ordered columns.
    pub columns: Vec<Column>,
    /// Primary key column names; a subset of `columns`. Empty when the
    /// table has no primary key.
    pub primary_key: Vec<String>,
    /// Indexes, in declaration order.
    pub indexes: Vec<Index>,
    /// Foreign keys, in declaration order.
    pub foreign_keys: Vec<ForeignKey>,
    /// Table attributes (charset, collation, checks, comment).
    pub attrs: Vec<Attr>,
}

impl Table {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the primary key to the named columns.
    pub fn with_primary_key(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append an index.
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Append a foreign key.
    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Append an attribute.
    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up an index by name.
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// Look up a foreign key by name.
    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|f| f.name == name)
    }

    /// Whether the table declares a primary key.
    pub fn has_primary_key(&self) -> bool {
        !self.primary_key.is_empty()
    }
}
