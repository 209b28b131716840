//! Realm and schema containers.

use super::{Attr, Table};

/// A named namespace within a realm.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Schema name.
    pub name: String,
    /// Tables, in declaration order.
    pub tables: Vec<Table>,
    /// Schema attributes (charset, collation).
    pub attrs: Vec<Attr>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append a table.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Append an attribute.
    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// The top-level database container: an ordered set of schemas plus
/// dialect-specific attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Realm {
    /// Schemas, in declaration order.
    pub schemas: Vec<Schema>,
    /// Realm attributes.
    pub attrs: Vec<Attr>,
}

impl Realm {
    /// Create an empty realm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a schema.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Append an attribute.
    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Look up a schema by name.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Whether the realm holds no schemas.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
