//! Mounted-path (NFS) strategy.
//!
//! The NFS export must already be mounted into the local filesystem;
//! mounting is handled outside this crate. Listing is a single directory
//! walk and reads are plain synchronous file reads.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::NasError;
use crate::pattern::FilePattern;
use crate::protocol::Protocol;
use crate::strategy::ProtocolStrategy;

/// Strategy over a locally mounted NAS path.
#[derive(Debug, Clone)]
pub struct NfsStrategy {
    mount_path: PathBuf,
}

impl NfsStrategy {
    /// Bind to a mount path. No I/O happens until the first call.
    pub fn new(mount_path: impl Into<PathBuf>) -> Self {
        Self {
            mount_path: mount_path.into(),
        }
    }

    pub fn mount_path(&self) -> &Path {
        &self.mount_path
    }

    fn check_root(directory: &str) -> Result<(), NasError> {
        let metadata = std::fs::metadata(directory).map_err(|e| NasError::io(directory, e))?;
        if !metadata.is_dir() {
            return Err(NasError::NotADirectory {
                path: directory.to_string(),
            });
        }
        Ok(())
    }
}

impl ProtocolStrategy for NfsStrategy {
    fn protocol(&self) -> Protocol {
        Protocol::Nfs
    }

    fn list_files(
        &self,
        directory: &str,
        pattern: &FilePattern,
        recursive: bool,
    ) -> Result<Vec<String>, NasError> {
        Self::check_root(directory)?;

        let mut walker = WalkDir::new(directory).min_depth(1).sort_by_file_name();
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() == 0 => {
                    let message = err.to_string();
                    let source = err
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::other(message));
                    return Err(NasError::io(directory, source));
                }
                Err(err) => {
                    // Unreadable subdirectories are skipped, not fatal
                    warn!(
                        path = ?err.path(),
                        error = %err,
                        "Skipping unreadable entry"
                    );
                    continue;
                }
            };

            let file_type = entry.file_type();
            let is_file =
                file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let Some(name) = entry.file_name().to_str() else {
                warn!(path = ?entry.path(), "Skipping non UTF-8 file name");
                continue;
            };
            if pattern.matches(name) {
                files.push(entry.path().to_string_lossy().into_owned());
            }
        }

        debug!(
            directory,
            pattern = pattern.as_str(),
            recursive,
            count = files.len(),
            "Listed mounted directory"
        );
        Ok(files)
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, NasError> {
        debug!(path, "Reading mounted file");
        std::fs::read(path).map_err(|e| NasError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a");
        std::fs::create_dir_all(a.join("b")).unwrap();
        std::fs::write(a.join("file1.txt"), "one").unwrap();
        std::fs::write(a.join("b").join("file2.txt"), "two").unwrap();
        std::fs::write(a.join("b").join("file3.log"), "three").unwrap();
        temp
    }

    fn as_set(files: Vec<String>) -> BTreeSet<String> {
        files.into_iter().collect()
    }

    #[test]
    fn test_recursive_listing_filters_by_pattern() {
        let temp = tree();
        let a = temp.path().join("a");
        let strategy = NfsStrategy::new(&a);
        let pattern = FilePattern::new("*.txt").unwrap();

        let files = strategy
            .list_files(a.to_str().unwrap(), &pattern, true)
            .unwrap();

        let expected: BTreeSet<String> = [a.join("file1.txt"), a.join("b").join("file2.txt")]
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(as_set(files), expected);
    }

    #[test]
    fn test_non_recursive_stops_at_first_level() {
        let temp = tree();
        let a = temp.path().join("a");
        let strategy = NfsStrategy::new(&a);
        let pattern = FilePattern::new("*.txt").unwrap();

        let files = strategy
            .list_files(a.to_str().unwrap(), &pattern, false)
            .unwrap();

        assert_eq!(files, vec![a.join("file1.txt").to_string_lossy().into_owned()]);
    }

    #[test]
    fn test_directories_never_listed() {
        let temp = tree();
        let a = temp.path().join("a");
        let strategy = NfsStrategy::new(&a);

        let files = strategy
            .list_files(a.to_str().unwrap(), &FilePattern::match_all(), true)
            .unwrap();

        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| !f.ends_with("b")));
    }

    #[test]
    fn test_missing_directory_is_lookup_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let strategy = NfsStrategy::new(&missing);

        let err = strategy
            .list_files(missing.to_str().unwrap(), &FilePattern::match_all(), true)
            .unwrap_err();
        assert!(matches!(err, NasError::NotFound { .. }));
    }

    #[cfg(unix)]
    fn set_mode(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_root_is_io_error() {
        let temp = tree();
        let a = temp.path().join("a");
        set_mode(&a, 0o000);
        if std::fs::read_dir(&a).is_ok() {
            // Permission bits are not enforced for this user (root).
            set_mode(&a, 0o755);
            return;
        }

        let strategy = NfsStrategy::new(&a);
        let result = strategy.list_files(a.to_str().unwrap(), &FilePattern::match_all(), true);
        set_mode(&a, 0o755);

        let err = result.unwrap_err();
        assert!(matches!(err, NasError::Io { .. }));
        assert!(err.to_string().contains(a.to_str().unwrap()));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        let temp = tree();
        let a = temp.path().join("a");
        let b = a.join("b");
        set_mode(&b, 0o000);
        if std::fs::read_dir(&b).is_ok() {
            set_mode(&b, 0o755);
            return;
        }

        let strategy = NfsStrategy::new(&a);
        let result = strategy.list_files(a.to_str().unwrap(), &FilePattern::match_all(), true);
        set_mode(&b, 0o755);

        assert_eq!(
            result.unwrap(),
            vec![a.join("file1.txt").to_string_lossy().into_owned()]
        );
    }

    #[test]
    fn test_file_as_directory_rejected() {
        let temp = tree();
        let file = temp.path().join("a").join("file1.txt");
        let strategy = NfsStrategy::new(temp.path());

        let err = strategy
            .list_files(file.to_str().unwrap(), &FilePattern::match_all(), true)
            .unwrap_err();
        assert!(matches!(err, NasError::NotADirectory { .. }));
    }

    #[test]
    fn test_read_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("unicode.txt");
        let text = "Grüße, 世界 ✓\nsecond line";
        std::fs::write(&path, text).unwrap();

        let strategy = NfsStrategy::new(temp.path());
        assert_eq!(strategy.read_file(path.to_str().unwrap()).unwrap(), text);
    }

    #[test]
    fn test_read_invalid_utf8() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("latin1.txt");
        std::fs::write(&path, [0x63, 0x61, 0x66, 0xe9]).unwrap();

        let strategy = NfsStrategy::new(temp.path());
        let err = strategy.read_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, NasError::Decode { .. }));
    }

    #[test]
    fn test_read_missing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("absent.txt");

        let strategy = NfsStrategy::new(temp.path());
        let err = strategy.read_file(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, NasError::NotFound { .. }));
    }
}
