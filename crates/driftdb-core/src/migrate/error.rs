//! Migration-specific error types.

use thiserror::Error;

/// The target database holds objects the migration machinery did not
/// create; replaying migrations on it would be destructive.
#[derive(Debug, Error)]
#[error("connected database is not clean: {reason}")]
pub struct NotCleanError {
    /// What was found on the target.
    pub reason: String,
}

/// Migration errors.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The desired and current state are identical; there is nothing to
    /// plan.
    #[error("no changes to be made")]
    NoPlan,

    /// The directory contents do not match the sum file.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// The sum file is syntactically malformed.
    #[error("checksum file format invalid")]
    ChecksumFormat,

    /// The driver exposes no locking capability.
    #[error("driver does not support locking")]
    LockUnsupported,

    /// Every migration file has been applied.
    #[error("no pending migration files")]
    NoPendingFiles,

    /// The requested revision is not stored.
    #[error("revision does not exist")]
    NotExist,

    /// The target database is not clean.
    #[error(transparent)]
    NotClean(#[from] NotCleanError),

    /// Executor construction without a driver.
    #[error("execute: no driver given")]
    NoDriver,

    /// Executor construction without a migration directory.
    #[error("execute: no dir given")]
    NoDir,

    /// Executor construction without revision storage.
    #[error("execute: no revision storage given")]
    NoRevisionStore,

    /// A stored revision does not line up with the directory contents.
    #[error("revisions and migrations mismatch: rev {rev:?} <> file {file:?}")]
    RevisionFileMismatch {
        /// Version recorded in the revision store.
        rev: String,
        /// Version of the migration file at the same position.
        file: String,
    },

    /// The revision store holds more entries than the directory has files.
    #[error("revisions and migrations mismatch: more revisions than migrations")]
    MoreRevisionsThanFiles,

    /// The operation was canceled by the caller.
    #[error("operation canceled")]
    Canceled,

    /// Acquiring the directory lock failed.
    #[error("acquiring database lock: {0}")]
    Lock(String),

    /// A directory entry does not exist.
    #[error("file {name:?} does not exist")]
    FileNotFound {
        /// The missing file name.
        name: String,
    },

    /// A migration file is not valid UTF-8.
    #[error("file {name:?} is not valid UTF-8")]
    InvalidUtf8 {
        /// The offending file name.
        name: String,
    },

    /// The given path is not a directory.
    #[error("{path:?} is not a directory")]
    NotDirectory {
        /// The offending path.
        path: String,
    },

    /// Error reported by the driver.
    #[error("{0}")]
    Driver(String),

    /// Filesystem error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Revision storage error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Revision serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Revision deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(MigrateError::NoDriver.to_string(), "execute: no driver given");
        assert_eq!(
            MigrateError::RevisionFileMismatch {
                rev: "unknown".into(),
                file: "1.a".into(),
            }
            .to_string(),
            "revisions and migrations mismatch: rev \"unknown\" <> file \"1.a\"",
        );
        let not_clean: MigrateError = NotCleanError {
            reason: "found schema \"app\"".into(),
        }
        .into();
        assert!(not_clean.to_string().contains("not clean"));
    }
}
