//! In-memory schema model.
//!
//! A [`Realm`] holds schemas, a [`Schema`] holds tables, and a [`Table`]
//! holds columns, a primary key, indexes and foreign keys. Element order is
//! declaration order everywhere; the diff engine iterates it unchanged.
//! Columns are referenced from keys and indexes by name, and names are
//! unique within their scope (see [`validate_table`]).

pub mod attr;
mod change;
mod column;
mod realm;
mod table;
mod validate;

pub use attr::{Attr, AttrKind, Check};
pub use change::{Change, ChangeKind};
pub use column::{Column, ColumnType, DefaultValue, TypeKind};
pub use realm::{Realm, Schema};
pub use table::{ForeignKey, Index, IndexPart, IndexPartKind, ReferenceAction, Table};
pub use validate::{validate_schema, validate_table, SchemaError};
