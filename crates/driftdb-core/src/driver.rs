//! The dialect driver interface.
//!
//! A driver inspects, diffs, plans and executes against a concrete
//! database. The core never talks to a database directly; everything goes
//! through this trait. Every potentially blocking method receives a
//! [`CancelToken`] so callers can abort in-flight work. Locking is a
//! capability: drivers that support it answer [`Driver::locker`], and the
//! executor refuses construction without it.

use crate::migrate::{MigrateError, Plan};
use crate::schema::{Change, Realm};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cooperative cancellation token forwarded into every driver call.
///
/// Clones share one flag; canceling any clone cancels them all. Drivers
/// poll it inside blocking work, and the executor checks it immediately
/// before each driver call.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    canceled: Arc<AtomicBool>,
}

impl CancelToken {
    /// A token with cancellation not requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }

    /// Surface a requested cancellation as [`MigrateError::Canceled`].
    pub fn check(&self) -> Result<(), MigrateError> {
        if self.is_canceled() {
            Err(MigrateError::Canceled)
        } else {
            Ok(())
        }
    }
}

/// Undoes the scratch work performed after a [`Driver::snapshot`] call.
pub type RestoreFunc = Box<dyn FnOnce(&CancelToken) -> Result<(), MigrateError> + Send>;

/// Releases a held lock when dropped.
///
/// Holding the release in a drop guard makes every exit path of the
/// guarded scope release the lock, including panics.
pub struct LockGuard<'a> {
    release: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> LockGuard<'a> {
    /// Wrap a release action.
    pub fn new(release: impl FnOnce() + 'a) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

/// Advisory locking capability.
pub trait Locker {
    /// Acquire the named lock, blocking up to `timeout` per the driver's
    /// policy. Cancellation interrupts the wait.
    fn lock(
        &self,
        cancel: &CancelToken,
        name: &str,
        timeout: Duration,
    ) -> Result<LockGuard<'_>, MigrateError>;
}

/// A dialect-specific database driver.
pub trait Driver {
    /// Inspect the connected database.
    fn inspect_realm(&self, cancel: &CancelToken) -> Result<Realm, MigrateError>;

    /// Compute the changes turning `from` into `to` under this dialect's
    /// equivalence rules. Pure with respect to its inputs.
    fn realm_diff(&self, from: &Realm, to: &Realm) -> Result<Vec<Change>, MigrateError>;

    /// Turn a change list into an ordered SQL plan.
    fn plan_changes(
        &self,
        cancel: &CancelToken,
        name: &str,
        changes: &[Change],
    ) -> Result<Plan, MigrateError>;

    /// Apply changes directly, without going through a plan.
    fn apply_changes(&self, cancel: &CancelToken, changes: &[Change]) -> Result<(), MigrateError>;

    /// Execute one SQL statement.
    fn exec(&self, cancel: &CancelToken, stmt: &str) -> Result<(), MigrateError>;

    /// Capture the state of a clean database and return the action that
    /// restores it. Fails with [`crate::migrate::NotCleanError`] when the
    /// database already holds objects.
    fn snapshot(&self, cancel: &CancelToken) -> Result<RestoreFunc, MigrateError>;

    /// The locking capability, if this driver has one.
    fn locker(&self) -> Option<&dyn Locker> {
        None
    }
}

impl<T: Driver + ?Sized> Driver for &T {
    fn inspect_realm(&self, cancel: &CancelToken) -> Result<Realm, MigrateError> {
        (**self).inspect_realm(cancel)
    }
    fn realm_diff(&self, from: &Realm, to: &Realm) -> Result<Vec<Change>, MigrateError> {
        (**self).realm_diff(from, to)
    }
    fn plan_changes(
        &self,
        cancel: &CancelToken,
        name: &str,
        changes: &[Change],
    ) -> Result<Plan, MigrateError> {
        (**self).plan_changes(cancel, name, changes)
    }
    fn apply_changes(&self, cancel: &CancelToken, changes: &[Change]) -> Result<(), MigrateError> {
        (**self).apply_changes(cancel, changes)
    }
    fn exec(&self, cancel: &CancelToken, stmt: &str) -> Result<(), MigrateError> {
        (**self).exec(cancel, stmt)
    }
    fn snapshot(&self, cancel: &CancelToken) -> Result<RestoreFunc, MigrateError> {
        (**self).snapshot(cancel)
    }
    fn locker(&self) -> Option<&dyn Locker> {
        (**self).locker()
    }
}

impl<T: Driver + ?Sized> Driver for Arc<T> {
    fn inspect_realm(&self, cancel: &CancelToken) -> Result<Realm, MigrateError> {
        (**self).inspect_realm(cancel)
    }
    fn realm_diff(&self, from: &Realm, to: &Realm) -> Result<Vec<Change>, MigrateError> {
        (**self).realm_diff(from, to)
    }
    fn plan_changes(
        &self,
        cancel: &CancelToken,
        name: &str,
        changes: &[Change],
    ) -> Result<Plan, MigrateError> {
        (**self).plan_changes(cancel, name, changes)
    }
    fn apply_changes(&self, cancel: &CancelToken, changes: &[Change]) -> Result<(), MigrateError> {
        (**self).apply_changes(cancel, changes)
    }
    fn exec(&self, cancel: &CancelToken, stmt: &str) -> Result<(), MigrateError> {
        (**self).exec(cancel, stmt)
    }
    fn snapshot(&self, cancel: &CancelToken) -> Result<RestoreFunc, MigrateError> {
        (**self).snapshot(cancel)
    }
    fn locker(&self) -> Option<&dyn Locker> {
        (**self).locker()
    }
}
