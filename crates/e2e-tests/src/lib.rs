//! End-to-end test infrastructure for nas-reader.
//!
//! Provides a mounted-directory fixture for NFS tests and an in-memory SMB
//! share for everything that needs a remote session.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use nas_reader::{NasError, NasReader, ReaderConfig, SmbConnector, SmbEntry, SmbParams, SmbSession};

/// Files written by [`TestTree::sample`], relative to the root.
pub const SAMPLE_FILES: &[(&str, &str)] = &[
    ("a/file1.txt", "Alpha"),
    ("a/b/file2.txt", "Beta"),
    ("a/b/file3.log", "Gamma"),
];

/// Directory tree standing in for a mounted NFS export.
pub struct TestTree {
    /// Keeps temp dir alive for the lifetime of the tree
    pub _temp_dir: tempfile::TempDir,
    pub root: PathBuf,
}

impl TestTree {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            root,
        }
    }

    /// Tree containing [`SAMPLE_FILES`].
    pub fn sample() -> Self {
        let tree = Self::new();
        for (path, text) in SAMPLE_FILES {
            tree.write(path, text.as_bytes());
        }
        tree
    }

    /// Write a file, creating parent directories.
    pub fn write(&self, relative: &str, contents: &[u8]) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, contents).expect("Failed to write test file");
        path
    }

    /// Absolute path string for a file in the tree.
    pub fn path_of(&self, relative: &str) -> String {
        self.root.join(relative).to_string_lossy().into_owned()
    }

    pub fn root_str(&self) -> String {
        self.root.to_string_lossy().into_owned()
    }

    pub fn nfs_config(&self) -> ReaderConfig {
        ReaderConfig::nfs("127.0.0.1", self.root_str())
    }

    pub fn nfs_reader(&self) -> NasReader {
        NasReader::new(self.nfs_config()).expect("Failed to open NFS reader")
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}

fn share_key(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Counters shared between a [`MemoryShare`] and the test that built it.
#[derive(Debug, Default, Clone)]
pub struct ShareProbe {
    pub list_calls: Rc<RefCell<Vec<String>>>,
    pub reads: Rc<RefCell<Vec<String>>>,
    pub disconnects: Rc<Cell<usize>>,
}

/// In-memory SMB share.
///
/// Every directory listing includes `.` and `..`, as real servers do.
#[derive(Debug, Default, Clone)]
pub struct MemoryShare {
    directories: BTreeMap<String, Vec<SmbEntry>>,
    files: BTreeMap<String, Vec<u8>>,
    failing: HashSet<String>,
    probe: ShareProbe,
}

impl MemoryShare {
    pub fn new() -> Self {
        let mut share = Self::default();
        share.ensure_dir("");
        share
    }

    /// Share containing [`SAMPLE_FILES`].
    pub fn sample() -> Self {
        SAMPLE_FILES
            .iter()
            .fold(Self::new(), |share, (path, text)| share.file(path, text))
    }

    pub fn probe(&self) -> ShareProbe {
        self.probe.clone()
    }

    /// Add a file, creating parent directory entries.
    pub fn file(mut self, path: &str, contents: impl AsRef<[u8]>) -> Self {
        let key = share_key(path);
        let (parent, name) = match key.rsplit_once('/') {
            Some((parent, name)) => (parent.to_string(), name.to_string()),
            None => (String::new(), key.clone()),
        };
        self.ensure_dir(&parent);
        self.push_entry(&parent, SmbEntry::file(name));
        self.files.insert(key, contents.as_ref().to_vec());
        self
    }

    /// Add a raw listing entry under `directory`.
    pub fn entry(mut self, directory: &str, entry: SmbEntry) -> Self {
        let key = share_key(directory);
        self.ensure_dir(&key);
        self.push_entry(&key, entry);
        self
    }

    /// Make retrieving `path` fail with a remote error.
    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(share_key(path));
        self
    }

    fn ensure_dir(&mut self, key: &str) {
        if self.directories.contains_key(key) {
            return;
        }
        self.directories.insert(
            key.to_string(),
            vec![SmbEntry::directory("."), SmbEntry::directory("..")],
        );
        if let Some((parent, name)) = key.rsplit_once('/') {
            let parent = parent.to_string();
            self.ensure_dir(&parent);
            self.push_entry(&parent, SmbEntry::directory(name));
        } else if !key.is_empty() {
            self.push_entry("", SmbEntry::directory(key));
        }
    }

    fn push_entry(&mut self, directory: &str, entry: SmbEntry) {
        if let Some(entries) = self.directories.get_mut(directory) {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }
    }
}

impl SmbSession for MemoryShare {
    fn list_path(&self, path: &str) -> Result<Vec<SmbEntry>, NasError> {
        self.probe.list_calls.borrow_mut().push(path.to_string());
        self.directories
            .get(&share_key(path))
            .cloned()
            .ok_or_else(|| NasError::not_found(path))
    }

    fn retrieve_file(&self, path: &str) -> Result<Vec<u8>, NasError> {
        let key = share_key(path);
        self.probe.reads.borrow_mut().push(key.clone());
        if self.failing.contains(&key) {
            return Err(NasError::remote(path, "STATUS_ACCESS_DENIED"));
        }
        self.files
            .get(&key)
            .cloned()
            .ok_or_else(|| NasError::not_found(path))
    }

    fn disconnect(&mut self) -> Result<(), NasError> {
        self.probe.disconnects.set(self.probe.disconnects.get() + 1);
        Ok(())
    }
}

/// Connector handing out copies of one [`MemoryShare`].
pub struct MemoryConnector {
    pub share: MemoryShare,
    pub connects: Cell<usize>,
}

impl MemoryConnector {
    pub fn new(share: MemoryShare) -> Self {
        Self {
            share,
            connects: Cell::new(0),
        }
    }
}

impl SmbConnector for MemoryConnector {
    fn connect(&self, _params: &SmbParams) -> Result<Box<dyn SmbSession>, NasError> {
        self.connects.set(self.connects.get() + 1);
        Ok(Box::new(self.share.clone()))
    }
}

/// SMB config with every credential present.
pub fn smb_config() -> ReaderConfig {
    ReaderConfig::smb("192.168.1.10", "docs", "reader", "s3cret")
}

/// SMB reader over `share`.
pub fn smb_reader(share: MemoryShare) -> NasReader {
    NasReader::with_connector(smb_config(), &MemoryConnector::new(share))
        .expect("Failed to open SMB reader")
}

/// Sort a listing for order-independent comparison.
pub fn sorted(mut paths: Vec<String>) -> Vec<String> {
    paths.sort();
    paths
}

/// Number of entries directly inside `dir`.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}
