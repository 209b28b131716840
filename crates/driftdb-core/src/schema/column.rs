//! Column definitions and column types.

/// Structured column type kinds.
///
/// The `raw` form on [`ColumnType`] always carries the dialect's exact
/// spelling; the kind is the portable classification the diff engine and
/// planners reason about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Boolean value.
    Bool,
    /// Integer of any width.
    Integer {
        /// Whether the integer is unsigned.
        unsigned: bool,
    },
    /// Floating point number.
    Float,
    /// Fixed-precision decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Character data.
    String {
        /// Maximum length, if bounded.
        size: Option<u32>,
    },
    /// Binary data.
    Bytes,
    /// Enumeration over a fixed set of values.
    Enum {
        /// Allowed values, in declaration order.
        values: Vec<String>,
    },
    /// JSON document.
    Json,
    /// Date or time value.
    Time,
    /// A type the inspector could not classify; only `raw` is meaningful.
    Unknown,
}

/// A column's type: the raw dialect spelling, the structured kind, and
/// nullability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnType {
    /// Raw type as written in the dialect, e.g. `tinyint(1)`.
    pub raw: String,
    /// Structured classification of the type.
    pub kind: TypeKind,
    /// Whether the column accepts NULL.
    pub null: bool,
}

impl ColumnType {
    /// Create a non-nullable column type.
    pub fn new(raw: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            raw: raw.into(),
            kind,
            null: false,
        }
    }

    /// Mark the type as nullable.
    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }
}

/// Default value of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// A literal value, quoted by the dialect as needed.
    Literal(String),
    /// A raw expression evaluated by the database.
    Expr(String),
}

/// A column within a table.
///
/// Columns are referenced from primary keys, indexes and foreign keys by
/// name; names are unique within a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column type and nullability.
    pub column_type: ColumnType,
    /// Default value, if any.
    pub default: Option<DefaultValue>,
    /// Column attributes (comment, charset, collation).
    pub attrs: Vec<super::Attr>,
}

impl Column {
    /// Create a column with the given type.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            default: None,
            attrs: Vec::new(),
        }
    }

    /// Convenience constructor for an integer column.
    pub fn int(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::new(name, ColumnType::new(raw, TypeKind::Integer { unsigned: false }))
    }

    /// Convenience constructor for a JSON column.
    pub fn json(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::new("json", TypeKind::Json))
    }

    /// Set the default value.
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Append an attribute.
    pub fn with_attr(mut self, attr: super::Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Mark the column as nullable.
    pub fn nullable(mut self) -> Self {
        self.column_type.null = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attr;

    #[test]
    fn test_column_builder() {
        let c = Column::json("c1")
            .nullable()
            .with_default(DefaultValue::Expr("{}".into()))
            .with_attr(Attr::Comment("json comment".into()));

        assert_eq!(c.name, "c1");
        assert!(c.column_type.null);
        assert_eq!(c.default, Some(DefaultValue::Expr("{}".into())));
        assert_eq!(c.attrs.len(), 1);
    }

    #[test]
    fn test_column_type_nullable() {
        let t = ColumnType::new("int", TypeKind::Integer { unsigned: false });
        assert!(!t.null);
        assert!(t.nullable().null);
    }
}
