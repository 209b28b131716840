//! Migration directories and their files.

use super::error::MigrateError;
use super::version::natural_cmp;
use super::stmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the checksum file maintained alongside the migration files.
pub const SUM_FILENAME: &str = "atlas.sum";

/// First-line directive excluding a file from the checksum and from
/// [`Dir::files`]. A bare `//atlas:sum` line does not exclude anything.
pub const IGNORE_DIRECTIVE: &str = "//atlas:sum ignore";

/// A migration file: its name and raw contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    name: String,
    data: Vec<u8>,
}

impl MigrationFile {
    /// Create a file from its name and contents.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// The file name, e.g. `20240101120000_add_users.sql`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw file contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The version prefix: everything up to the first `_`, or the whole
    /// stem when no `_` is present.
    pub fn version(&self) -> &str {
        let stem = self.name.strip_suffix(".sql").unwrap_or(&self.name);
        match stem.split_once('_') {
            Some((v, _)) => v,
            None => stem,
        }
    }

    /// The description: everything after the first `_`, extension
    /// stripped. Empty when the name has no `_`.
    pub fn desc(&self) -> &str {
        let stem = self.name.strip_suffix(".sql").unwrap_or(&self.name);
        match stem.split_once('_') {
            Some((_, d)) => d,
            None => "",
        }
    }

    /// The SQL statements of this file, in textual order.
    pub fn stmts(&self) -> Result<Vec<String>, MigrateError> {
        let text = std::str::from_utf8(&self.data).map_err(|_| MigrateError::InvalidUtf8 {
            name: self.name.clone(),
        })?;
        Ok(stmt::split(text))
    }

    /// Whether the first line carries the sum-ignore directive.
    pub fn is_ignored(&self) -> bool {
        let first = self
            .data
            .split(|&b| b == b'\n')
            .next()
            .unwrap_or_default();
        std::str::from_utf8(first)
            .map(|l| l.trim_start().starts_with(IGNORE_DIRECTIVE))
            .unwrap_or(false)
    }
}

/// A collection of migration files plus the checksum file.
pub trait Dir {
    /// Read one entry by name.
    fn open(&self, name: &str) -> Result<MigrationFile, MigrateError>;

    /// Create or replace one entry.
    fn write_file(&self, name: &str, data: &[u8]) -> Result<(), MigrateError>;

    /// Every regular entry of the directory, in name order. Includes the
    /// sum file and ignored files; most callers want [`Dir::files`].
    fn entries(&self) -> Result<Vec<MigrationFile>, MigrateError>;

    /// The migration files: `.sql` entries that are not the sum file and
    /// not ignored, in natural-sort version order.
    fn files(&self) -> Result<Vec<MigrationFile>, MigrateError> {
        let mut files: Vec<_> = self
            .entries()?
            .into_iter()
            .filter(|f| f.name().ends_with(".sql") && f.name() != SUM_FILENAME && !f.is_ignored())
            .collect();
        files.sort_by(|a, b| natural_cmp(a.name(), b.name()));
        Ok(files)
    }
}

impl<T: Dir + ?Sized> Dir for &T {
    fn open(&self, name: &str) -> Result<MigrationFile, MigrateError> {
        (**self).open(name)
    }
    fn write_file(&self, name: &str, data: &[u8]) -> Result<(), MigrateError> {
        (**self).write_file(name, data)
    }
    fn entries(&self) -> Result<Vec<MigrationFile>, MigrateError> {
        (**self).entries()
    }
}

impl<T: Dir + ?Sized> Dir for Arc<T> {
    fn open(&self, name: &str) -> Result<MigrationFile, MigrateError> {
        (**self).open(name)
    }
    fn write_file(&self, name: &str, data: &[u8]) -> Result<(), MigrateError> {
        (**self).write_file(name, data)
    }
    fn entries(&self) -> Result<Vec<MigrationFile>, MigrateError> {
        (**self).entries()
    }
}

/// A migration directory on the local filesystem.
///
/// The directory must already exist; it is never created implicitly.
#[derive(Debug, Clone)]
pub struct LocalDir {
    path: PathBuf,
}

impl LocalDir {
    /// Open an existing directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, MigrateError> {
        let path = path.as_ref();
        let meta = fs::metadata(path)?;
        if !meta.is_dir() {
            return Err(MigrateError::NotDirectory {
                path: path.display().to_string(),
            });
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Dir for LocalDir {
    fn open(&self, name: &str) -> Result<MigrationFile, MigrateError> {
        let path = self.path.join(name);
        match fs::read(&path) {
            Ok(data) => Ok(MigrationFile::new(name, data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MigrateError::FileNotFound { name: name.into() })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write_file(&self, name: &str, data: &[u8]) -> Result<(), MigrateError> {
        fs::write(self.path.join(name), data)?;
        Ok(())
    }

    fn entries(&self) -> Result<Vec<MigrationFile>, MigrateError> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let data = fs::read(entry.path())?;
            out.push(MigrationFile::new(name, data));
        }
        out.sort_by(|a, b| natural_cmp(a.name(), b.name()));
        Ok(out)
    }
}
