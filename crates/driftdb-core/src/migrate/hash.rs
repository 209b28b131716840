//! Directory integrity: the `atlas.sum` file.
//!
//! The sum file pins every file of the directory to its SHA-256 content
//! hash, plus one aggregate hash over names and contents in natural-sort
//! order. Hashes are written in the `h1:{base64}` form.

use super::dir::{Dir, SUM_FILENAME};
use super::error::MigrateError;
use super::version::natural_cmp;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Base64-encode the SHA-256 of `data` in the sum file's `h1:` notation
/// (without the prefix).
pub fn file_hash(data: &[u8]) -> String {
    BASE64.encode(Sha256::digest(data))
}

/// Parsed or computed contents of a sum file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFile {
    /// Base64 of the aggregate directory hash.
    pub sum: String,
    /// Per-file `(name, base64 content hash)` pairs, in natural-sort order.
    pub files: Vec<(String, String)>,
}

impl HashFile {
    /// Hash a directory: every entry except the sum file and ignored
    /// files, in natural-sort name order. The aggregate hash covers
    /// `H(name) || contents` per file.
    pub fn sum_dir<T: Dir + ?Sized>(dir: &T) -> Result<HashFile, MigrateError> {
        let mut entries: Vec<_> = dir
            .entries()?
            .into_iter()
            .filter(|f| f.name() != SUM_FILENAME && !f.is_ignored())
            .collect();
        entries.sort_by(|a, b| natural_cmp(a.name(), b.name()));

        let mut total = Sha256::new();
        let mut files = Vec::with_capacity(entries.len());
        for f in &entries {
            total.update(Sha256::digest(f.name().as_bytes()));
            total.update(f.data());
            files.push((f.name().to_string(), file_hash(f.data())));
        }
        Ok(HashFile {
            sum: BASE64.encode(total.finalize()),
            files,
        })
    }

    /// Render the sum file text, with exactly one trailing newline.
    pub fn encode(&self) -> String {
        let mut out = format!("h1:{}\n", self.sum);
        for (name, hash) in &self.files {
            out.push_str(name);
            out.push_str(" h1:");
            out.push_str(hash);
            out.push('\n');
        }
        out
    }

    /// Parse sum file text. Zero or one trailing newline is accepted;
    /// anything else malformed is [`MigrateError::ChecksumFormat`].
    pub fn parse(text: &str) -> Result<HashFile, MigrateError> {
        let mut lines = text.lines();
        let sum = lines
            .next()
            .and_then(|l| l.strip_prefix("h1:"))
            .ok_or(MigrateError::ChecksumFormat)?
            .to_string();

        let mut files = Vec::new();
        for line in lines {
            let (name, hash) = line.split_once(' ').ok_or(MigrateError::ChecksumFormat)?;
            let hash = hash.strip_prefix("h1:").ok_or(MigrateError::ChecksumFormat)?;
            if name.is_empty() || hash.is_empty() {
                return Err(MigrateError::ChecksumFormat);
            }
            files.push((name.to_string(), hash.to_string()));
        }
        Ok(HashFile { sum, files })
    }
}

/// Recompute the directory hash and write the sum file.
pub fn write_sum_file<T: Dir + ?Sized>(dir: &T) -> Result<(), MigrateError> {
    let hash = HashFile::sum_dir(dir)?;
    dir.write_file(SUM_FILENAME, hash.encode().as_bytes())
}

/// Verify the directory against its sum file.
///
/// Fails with [`MigrateError::ChecksumMismatch`] when the sum file is
/// missing while files exist, the aggregate hash differs, a listed file is
/// absent, or a present file is unlisted; with
/// [`MigrateError::ChecksumFormat`] when the sum file cannot be parsed.
pub fn validate<T: Dir + ?Sized>(dir: &T) -> Result<(), MigrateError> {
    let computed = HashFile::sum_dir(dir)?;
    let sum_file = match dir.open(SUM_FILENAME) {
        Ok(f) => f,
        Err(MigrateError::FileNotFound { .. }) => {
            return if computed.files.is_empty() {
                Ok(())
            } else {
                Err(MigrateError::ChecksumMismatch)
            };
        }
        Err(e) => return Err(e),
    };
    let text = std::str::from_utf8(sum_file.data()).map_err(|_| MigrateError::ChecksumFormat)?;
    if HashFile::parse(text)? == computed {
        Ok(())
    } else {
        Err(MigrateError::ChecksumMismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::dir::LocalDir;

    fn seeded_dir() -> (tempfile::TempDir, LocalDir) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = LocalDir::new(tmp.path()).unwrap();
        dir.write_file("1_initial.up.sql", b"CREATE TABLE t(c int);\n")
            .unwrap();
        dir.write_file("2_second.sql", b"ALTER TABLE t ADD c1 int;\n")
            .unwrap();
        write_sum_file(&dir).unwrap();
        (tmp, dir)
    }

    #[test]
    fn test_encode_parse_round_trip() {
        let (_tmp, dir) = seeded_dir();
        let hash = HashFile::sum_dir(&dir).unwrap();
        assert_eq!(HashFile::parse(&hash.encode()).unwrap(), hash);
        // without the trailing newline
        assert_eq!(
            HashFile::parse(hash.encode().trim_end()).unwrap(),
            hash
        );
    }

    #[test]
    fn test_sum_is_pure_in_contents() {
        let (_tmp, dir) = seeded_dir();
        let h1 = HashFile::sum_dir(&dir).unwrap();
        let h2 = HashFile::sum_dir(&dir).unwrap();
        assert_eq!(h1, h2);

        dir.write_file("1_initial.up.sql", b"CREATE TABLE t(c bigint);\n")
            .unwrap();
        let h3 = HashFile::sum_dir(&dir).unwrap();
        assert_ne!(h1.sum, h3.sum);
        assert_ne!(h1.files[0].1, h3.files[0].1);
        assert_eq!(h1.files[1], h3.files[1]);
    }

    #[test]
    fn test_validate_ok() {
        let (_tmp, dir) = seeded_dir();
        assert!(validate(&dir).is_ok());
    }

    #[test]
    fn test_validate_missing_sum_with_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = LocalDir::new(tmp.path()).unwrap();
        assert!(validate(&dir).is_ok());

        dir.write_file("1_init.sql", b"CREATE TABLE t(c int);").unwrap();
        assert!(matches!(validate(&dir), Err(MigrateError::ChecksumMismatch)));
    }

    #[test]
    fn test_validate_sum_without_files() {
        let (_tmp, seeded) = seeded_dir();
        let sum = seeded.open(SUM_FILENAME).unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let dir = LocalDir::new(tmp.path()).unwrap();
        dir.write_file(SUM_FILENAME, sum.data()).unwrap();
        assert!(matches!(validate(&dir), Err(MigrateError::ChecksumMismatch)));
    }

    #[test]
    fn test_validate_mutated_file() {
        let (_tmp, dir) = seeded_dir();
        dir.write_file("2_second.sql", b"ALTER TABLE t ADD c2 int;\n")
            .unwrap();
        assert!(matches!(validate(&dir), Err(MigrateError::ChecksumMismatch)));
    }

    #[test]
    fn test_validate_renamed_file() {
        let (tmp, dir) = seeded_dir();
        std::fs::rename(
            tmp.path().join("1_initial.up.sql"),
            tmp.path().join("1_first.up.sql"),
        )
        .unwrap();
        assert!(matches!(validate(&dir), Err(MigrateError::ChecksumMismatch)));
    }

    #[test]
    fn test_validate_removed_file() {
        let (tmp, dir) = seeded_dir();
        std::fs::remove_file(tmp.path().join("1_initial.up.sql")).unwrap();
        assert!(matches!(validate(&dir), Err(MigrateError::ChecksumMismatch)));
    }

    #[test]
    fn test_validate_trailing_garbage_is_format_error() {
        let (_tmp, dir) = seeded_dir();
        let mut data = dir.open(SUM_FILENAME).unwrap().data().to_vec();
        data.extend_from_slice(b"foo");
        dir.write_file(SUM_FILENAME, &data).unwrap();
        assert!(matches!(validate(&dir), Err(MigrateError::ChecksumFormat)));
    }

    #[test]
    fn test_ignored_files_are_excluded() {
        let (_tmp, dir) = seeded_dir();
        dir.write_file("include", b"//atlas:sum\nfoo").unwrap();
        dir.write_file("exclude_1", b"//atlas:sum ignore bar").unwrap();
        dir.write_file("exclude_2", b"//atlas:sum ignore\nbar").unwrap();
        write_sum_file(&dir).unwrap();

        let text = String::from_utf8(dir.open(SUM_FILENAME).unwrap().data().to_vec()).unwrap();
        assert!(text.contains("include"));
        assert!(!text.contains("exclude_1"));
        assert!(!text.contains("exclude_2"));
        assert!(validate(&dir).is_ok());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            HashFile::parse(""),
            Err(MigrateError::ChecksumFormat)
        ));
        assert!(matches!(
            HashFile::parse("not-a-sum\n"),
            Err(MigrateError::ChecksumFormat)
        ));
        assert!(matches!(
            HashFile::parse("h1:abc\nfile-without-hash\n"),
            Err(MigrateError::ChecksumFormat)
        ));
        assert!(matches!(
            HashFile::parse("h1:abc\nname notahash\n"),
            Err(MigrateError::ChecksumFormat)
        ));
    }
}
