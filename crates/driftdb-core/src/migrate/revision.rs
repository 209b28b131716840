//! Revision bookkeeping: one record per applied migration file.

use super::error::MigrateError;
use super::version::natural_cmp;
use rkyv::{Archive, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Current time in microseconds since the Unix epoch.
pub(crate) fn now_micros() -> u64 {
    chrono::Utc::now().timestamp_micros() as u64
}

/// Outcome of applying one migration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum ExecutionState {
    /// Every statement of the file was applied.
    Applied,
    /// A statement failed; `error` holds the details.
    Failed,
    /// Execution stopped between statements (e.g. a crash); `applied`
    /// records how far it got.
    Partial,
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionState::Applied => write!(f, "applied"),
            ExecutionState::Failed => write!(f, "failed"),
            ExecutionState::Partial => write!(f, "partial"),
        }
    }
}

/// A persisted record of one migration file's application.
///
/// Field order is wire-stable; the revision store serializes records in
/// exactly this layout.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Revision {
    /// Version of the migration file.
    pub version: String,
    /// Description of the migration file.
    pub description: String,
    /// Execution outcome.
    pub state: ExecutionState,
    /// When execution of the file started (microseconds since epoch).
    pub executed_at: u64,
    /// Total execution time in microseconds.
    pub execution_time: u64,
    /// Content hash of the file at execution time (base64 SHA-256).
    pub hash: String,
    /// Version of the operator that applied the file.
    pub operator_version: String,
    /// Arbitrary metadata attached by the operator.
    pub meta: HashMap<String, String>,
    /// Number of statements applied so far.
    pub applied: usize,
    /// Total number of statements in the file.
    pub total: usize,
    /// Error of the failing statement, empty on success.
    pub error: String,
}

impl Revision {
    /// Start a fresh revision for a file with `total` statements.
    pub fn new(version: impl Into<String>, description: impl Into<String>, total: usize) -> Self {
        Self {
            version: version.into(),
            description: description.into(),
            state: ExecutionState::Partial,
            executed_at: now_micros(),
            execution_time: 0,
            hash: String::new(),
            operator_version: String::new(),
            meta: HashMap::new(),
            applied: 0,
            total,
            error: String::new(),
        }
    }

    /// Whether every statement of the file has been applied.
    pub fn is_complete(&self) -> bool {
        self.state == ExecutionState::Applied && self.applied >= self.total
    }

    /// Serialize the revision to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MigrateError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| MigrateError::Serialization(e.to_string()))
    }

    /// Deserialize a revision from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MigrateError> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| MigrateError::Deserialization(e.to_string()))
    }
}

/// Storage for revisions, keyed by version.
pub trait RevisionReadWriter {
    /// All revisions, in natural version order.
    fn read_revisions(&self) -> Result<Vec<Revision>, MigrateError>;

    /// One revision by version; [`MigrateError::NotExist`] when absent.
    fn read_revision(&self, version: &str) -> Result<Revision, MigrateError>;

    /// Insert or update a revision, keyed by its version.
    fn write_revision(&self, rev: &Revision) -> Result<(), MigrateError>;
}

impl<T: RevisionReadWriter + ?Sized> RevisionReadWriter for &T {
    fn read_revisions(&self) -> Result<Vec<Revision>, MigrateError> {
        (**self).read_revisions()
    }
    fn read_revision(&self, version: &str) -> Result<Revision, MigrateError> {
        (**self).read_revision(version)
    }
    fn write_revision(&self, rev: &Revision) -> Result<(), MigrateError> {
        (**self).write_revision(rev)
    }
}

impl<T: RevisionReadWriter + ?Sized> RevisionReadWriter for Arc<T> {
    fn read_revisions(&self) -> Result<Vec<Revision>, MigrateError> {
        (**self).read_revisions()
    }
    fn read_revision(&self, version: &str) -> Result<Revision, MigrateError> {
        (**self).read_revision(version)
    }
    fn write_revision(&self, rev: &Revision) -> Result<(), MigrateError> {
        (**self).write_revision(rev)
    }
}

/// Revision storage that remembers nothing. Useful for replaying a
/// directory against a scratch database.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopRevisionReadWriter;

impl RevisionReadWriter for NopRevisionReadWriter {
    fn read_revisions(&self) -> Result<Vec<Revision>, MigrateError> {
        Ok(Vec::new())
    }
    fn read_revision(&self, _version: &str) -> Result<Revision, MigrateError> {
        Err(MigrateError::NotExist)
    }
    fn write_revision(&self, _rev: &Revision) -> Result<(), MigrateError> {
        Ok(())
    }
}

/// Durable revision storage on a sled tree.
pub struct RevisionStore {
    tree: sled::Tree,
}

impl RevisionStore {
    /// Tree name for revision records.
    pub const TREE_NAME: &'static str = "migrate:revisions";

    /// Open or create the revision store.
    pub fn open(db: &sled::Db) -> Result<Self, MigrateError> {
        let tree = db.open_tree(Self::TREE_NAME)?;
        Ok(Self { tree })
    }

    /// Flush changes to disk.
    pub fn flush(&self) -> Result<(), MigrateError> {
        self.tree.flush()?;
        Ok(())
    }
}

impl RevisionReadWriter for RevisionStore {
    fn read_revisions(&self) -> Result<Vec<Revision>, MigrateError> {
        let mut revisions = Vec::new();
        for result in self.tree.iter() {
            let (_, value) = result?;
            revisions.push(Revision::from_bytes(&value)?);
        }
        revisions.sort_by(|a, b| natural_cmp(&a.version, &b.version));
        Ok(revisions)
    }

    fn read_revision(&self, version: &str) -> Result<Revision, MigrateError> {
        match self.tree.get(version.as_bytes())? {
            Some(bytes) => Revision::from_bytes(&bytes),
            None => Err(MigrateError::NotExist),
        }
    }

    fn write_revision(&self, rev: &Revision) -> Result<(), MigrateError> {
        self.tree.insert(rev.version.as_bytes(), rev.to_bytes()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_lifecycle() {
        let mut rev = Revision::new("1.a", "sub.up", 2);
        assert_eq!(rev.state, ExecutionState::Partial);
        assert!(!rev.is_complete());

        rev.applied = 2;
        rev.state = ExecutionState::Applied;
        assert!(rev.is_complete());
    }

    #[test]
    fn test_revision_serialization_round_trip() {
        let mut rev = Revision::new("2.10.x-20", "description", 1);
        rev.hash = "abc=".into();
        rev.operator_version = "driftdb v0.1.0".into();
        rev.meta.insert("env".into(), "test".into());

        let restored = Revision::from_bytes(&rev.to_bytes().unwrap()).unwrap();
        assert_eq!(restored, rev);
    }

    #[test]
    fn test_nop_store() {
        let store = NopRevisionReadWriter;
        store.write_revision(&Revision::new("1", "x", 1)).unwrap();
        assert!(store.read_revisions().unwrap().is_empty());
        assert!(matches!(
            store.read_revision("1"),
            Err(MigrateError::NotExist)
        ));
    }

    #[test]
    fn test_sled_store_upsert_and_order() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let store = RevisionStore::open(&db).unwrap();

        // write out of order; reads come back naturally sorted
        store.write_revision(&Revision::new("10", "ten", 1)).unwrap();
        store.write_revision(&Revision::new("2", "two", 1)).unwrap();

        let revs = store.read_revisions().unwrap();
        assert_eq!(revs.len(), 2);
        assert_eq!(revs[0].version, "2");
        assert_eq!(revs[1].version, "10");

        // upsert by version
        let mut rev = store.read_revision("2").unwrap();
        rev.applied = 1;
        rev.state = ExecutionState::Applied;
        store.write_revision(&rev).unwrap();
        assert_eq!(store.read_revisions().unwrap().len(), 2);
        assert!(store.read_revision("2").unwrap().is_complete());

        assert!(matches!(
            store.read_revision("missing"),
            Err(MigrateError::NotExist)
        ));
    }
}
