//! driftdb core - schema diffing, migration directories and resumable
//! migration execution.
//!
//! Three subsystems compose the crate: the [`schema`] model with its
//! [`diff`] engine, the checksummed migration directory, and the
//! [`migrate::Executor`] that applies pending migrations through a
//! dialect [`driver::Driver`].

pub mod diff;
pub mod driver;
pub mod migrate;
pub mod schema;

pub use diff::{DefaultDialect, DialectDiffer, DiffError, Differ};
pub use driver::{CancelToken, Driver, LockGuard, Locker, RestoreFunc};
pub use migrate::{
    Dir, ExecutionState, Executor, LocalDir, LogEntry, MigrateError, NotCleanError, Plan,
    PlanChange, Planner, Revision, RevisionReadWriter, RevisionStore,
};
pub use schema::{
    Attr, Change, ChangeKind, Check, Column, ColumnType, DefaultValue, ForeignKey, Index, Realm,
    ReferenceAction, Schema, SchemaError, Table, TypeKind,
};
