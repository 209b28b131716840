//! Migration directories, plans, revisions and execution.
//!
//! A migration [`dir::Dir`] holds versioned `.sql` files plus an integrity
//! sum file. The [`plan::Planner`] turns a diff into files; the
//! [`executor::Executor`] applies pending files with locking and
//! statement-level resumability.

pub mod dir;
pub mod error;
pub mod executor;
pub mod hash;
pub mod plan;
pub mod revision;
pub mod stmt;
pub mod version;

pub use dir::{Dir, LocalDir, MigrationFile, IGNORE_DIRECTIVE, SUM_FILENAME};
pub use error::{MigrateError, NotCleanError};
pub use executor::{Executor, ExecutorBuilder, LogEntry, Logger, NopLogger, LOCK_NAME};
pub use hash::{validate, write_sum_file, HashFile};
pub use plan::{DefaultFormatter, Plan, PlanChange, PlanFile, PlanFormatter, Planner, TemplateFormatter};
pub use revision::{
    ExecutionState, NopRevisionReadWriter, Revision, RevisionReadWriter, RevisionStore,
};
pub use version::natural_cmp;
