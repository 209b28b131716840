//! Migration execution: locking, pending computation, statement-level
//! resumability and revision bookkeeping.

use super::dir::{Dir, MigrationFile};
use super::error::MigrateError;
use super::hash;
use super::revision::{now_micros, ExecutionState, Revision, RevisionReadWriter};
use crate::driver::{CancelToken, Driver, LockGuard};
use crate::schema::Realm;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Name of the advisory lock guarding a migration directory's state.
pub const LOCK_NAME: &str = "atlas_migration_directory_state";

/// One event of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEntry {
    /// A run is starting.
    Execution {
        /// Version the run migrates up to.
        to: String,
        /// Names of the files about to be applied.
        files: Vec<String>,
    },
    /// A file is being applied.
    File {
        /// File version.
        version: String,
        /// File description.
        desc: String,
    },
    /// A statement is being executed.
    Stmt {
        /// The SQL text.
        sql: String,
    },
    /// The run completed successfully.
    Done,
}

/// Receives [`LogEntry`] events during execution.
pub trait Logger {
    /// Record one event.
    fn log(&self, entry: LogEntry);
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopLogger;

impl Logger for NopLogger {
    fn log(&self, _entry: LogEntry) {}
}

impl<T: Logger + ?Sized> Logger for &T {
    fn log(&self, entry: LogEntry) {
        (**self).log(entry)
    }
}

impl<T: Logger + ?Sized> Logger for Arc<T> {
    fn log(&self, entry: LogEntry) {
        (**self).log(entry)
    }
}

/// Applies pending migration files against a database.
///
/// All work happens under the driver's [`LOCK_NAME`] lock; the lock is
/// released on every exit path. Revisions are persisted after every
/// successfully executed statement, so an interrupted run resumes at the
/// exact statement it stopped at. Every entry point takes a
/// [`CancelToken`]; it is checked immediately before each driver call and
/// forwarded into it, so a canceled run stops between statements with no
/// revision mutation past the last persisted one.
pub struct Executor {
    drv: Box<dyn Driver>,
    dir: Box<dyn Dir>,
    rrw: Box<dyn RevisionReadWriter>,
    log: Box<dyn Logger>,
    operator_version: String,
    lock_timeout: Duration,
}

/// Configures and constructs an [`Executor`].
#[derive(Default)]
pub struct ExecutorBuilder {
    drv: Option<Box<dyn Driver>>,
    dir: Option<Box<dyn Dir>>,
    rrw: Option<Box<dyn RevisionReadWriter>>,
    log: Option<Box<dyn Logger>>,
    operator_version: Option<String>,
    lock_timeout: Option<Duration>,
}

impl ExecutorBuilder {
    /// Set the driver.
    pub fn driver(mut self, drv: impl Driver + 'static) -> Self {
        self.drv = Some(Box::new(drv));
        self
    }

    /// Set the migration directory.
    pub fn dir(mut self, dir: impl Dir + 'static) -> Self {
        self.dir = Some(Box::new(dir));
        self
    }

    /// Set the revision storage.
    pub fn revisions(mut self, rrw: impl RevisionReadWriter + 'static) -> Self {
        self.rrw = Some(Box::new(rrw));
        self
    }

    /// Set the logger. Defaults to [`NopLogger`].
    pub fn logger(mut self, log: impl Logger + 'static) -> Self {
        self.log = Some(Box::new(log));
        self
    }

    /// Set the operator version recorded on revisions.
    pub fn operator_version(mut self, v: impl Into<String>) -> Self {
        self.operator_version = Some(v.into());
        self
    }

    /// Set how long lock acquisition may block.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Build the executor. Fails when driver, directory or revision
    /// storage is missing, or when the driver has no locking capability.
    pub fn build(self) -> Result<Executor, MigrateError> {
        let drv = self.drv.ok_or(MigrateError::NoDriver)?;
        let dir = self.dir.ok_or(MigrateError::NoDir)?;
        let rrw = self.rrw.ok_or(MigrateError::NoRevisionStore)?;
        if drv.locker().is_none() {
            return Err(MigrateError::LockUnsupported);
        }
        Ok(Executor {
            drv,
            dir,
            rrw,
            log: self.log.unwrap_or_else(|| Box::new(NopLogger)),
            operator_version: self
                .operator_version
                .unwrap_or_else(|| concat!("driftdb-core v", env!("CARGO_PKG_VERSION")).into()),
            lock_timeout: self.lock_timeout.unwrap_or(Duration::from_secs(10)),
        })
    }
}

impl Executor {
    /// Start building an executor.
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    fn lock(&self, cancel: &CancelToken) -> Result<LockGuard<'_>, MigrateError> {
        // Guaranteed present by construction.
        let locker = self.drv.locker().ok_or(MigrateError::LockUnsupported)?;
        cancel.check()?;
        locker
            .lock(cancel, LOCK_NAME, self.lock_timeout)
            .map_err(|e| match e {
                MigrateError::Canceled => e,
                e => MigrateError::Lock(e.to_string()),
            })
    }

    /// The migration files not yet (fully) applied, in execution order.
    /// Takes the directory lock for a consistent snapshot.
    pub fn pending(&self, cancel: &CancelToken) -> Result<Vec<MigrationFile>, MigrateError> {
        let _guard = self.lock(cancel)?;
        self.pending_locked()
    }

    fn pending_locked(&self) -> Result<Vec<MigrationFile>, MigrateError> {
        let revs = self.rrw.read_revisions()?;
        let files = self.dir.files()?;
        if revs.len() > files.len() {
            return Err(MigrateError::MoreRevisionsThanFiles);
        }
        // Revisions pair positionally with files; Version is authoritative,
        // Description is informational.
        for (rev, file) in revs.iter().zip(&files) {
            if rev.version != file.version() {
                return Err(MigrateError::RevisionFileMismatch {
                    rev: rev.version.clone(),
                    file: file.version().to_string(),
                });
            }
        }
        let mut start = revs.len();
        if let Some(last) = revs.last() {
            if !last.is_complete() {
                start -= 1;
            }
        }
        Ok(files[start..].to_vec())
    }

    /// Apply the first `n` pending files, or every pending file when `n`
    /// is zero.
    pub fn execute_n(&self, cancel: &CancelToken, n: usize) -> Result<(), MigrateError> {
        let _guard = self.lock(cancel)?;
        hash::validate(self.dir.as_ref())?;
        let mut pending = self.pending_locked()?;
        if pending.is_empty() {
            return Err(MigrateError::NoPendingFiles);
        }
        if n > 0 && n < pending.len() {
            pending.truncate(n);
        }
        debug!(files = pending.len(), "applying pending migrations");
        self.log.log(LogEntry::Execution {
            to: pending
                .last()
                .map(|f| f.version().to_string())
                .unwrap_or_default(),
            files: pending.iter().map(|f| f.name().to_string()).collect(),
        });
        for file in &pending {
            self.execute_file(cancel, file)?;
        }
        self.log.log(LogEntry::Done);
        Ok(())
    }

    fn execute_file(&self, cancel: &CancelToken, file: &MigrationFile) -> Result<(), MigrateError> {
        info!(version = file.version(), "applying migration file");
        self.log.log(LogEntry::File {
            version: file.version().to_string(),
            desc: file.desc().to_string(),
        });
        let stmts = file.stmts()?;
        let mut rev = match self.rrw.read_revision(file.version()) {
            Ok(rev) => rev,
            Err(MigrateError::NotExist) => Revision::new(file.version(), file.desc(), stmts.len()),
            Err(e) => return Err(e),
        };
        rev.total = stmts.len();
        rev.hash = hash::file_hash(file.data());
        rev.operator_version = self.operator_version.clone();
        rev.state = ExecutionState::Partial;
        rev.error.clear();
        rev.executed_at = now_micros();

        let started = now_micros();
        for stmt in stmts.iter().skip(rev.applied) {
            self.log.log(LogEntry::Stmt { sql: stmt.clone() });
            cancel.check()?;
            if let Err(e) = self.drv.exec(cancel, stmt) {
                rev.state = ExecutionState::Failed;
                rev.error = format!("Statement:\n{stmt}\n\nError:\n{e}");
                rev.execution_time += now_micros().saturating_sub(started);
                self.rrw.write_revision(&rev)?;
                return Err(e);
            }
            rev.applied += 1;
            self.rrw.write_revision(&rev)?;
        }
        rev.state = ExecutionState::Applied;
        rev.applied = rev.total;
        rev.execution_time += now_micros().saturating_sub(started);
        self.rrw.write_revision(&rev)?;
        Ok(())
    }

    /// Replay the whole directory against a clean scratch database and
    /// return the resulting realm. The scratch work is always undone,
    /// whether inspection succeeded or not.
    pub fn read_state(&self, cancel: &CancelToken) -> Result<Realm, MigrateError> {
        let _guard = self.lock(cancel)?;
        cancel.check()?;
        let restore = self.drv.snapshot(cancel)?;
        let replayed = (|| {
            for file in self.dir.files()? {
                for stmt in file.stmts()? {
                    cancel.check()?;
                    self.drv.exec(cancel, &stmt)?;
                }
            }
            cancel.check()?;
            self.drv.inspect_realm(cancel)
        })();
        let restored = restore(cancel);
        let realm = replayed?;
        restored?;
        Ok(realm)
    }
}
