//! SMB strategy.
//!
//! The strategy owns one session to a remote share for its whole lifetime.
//! The session is opened eagerly by an [`SmbConnector`] so an unreachable
//! host or rejected credentials fail construction. Protocol work (session
//! negotiation, authentication, framing) lives behind the [`SmbSession`]
//! trait; this module only walks directory listings and fetches files.

use std::collections::HashSet;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, warn};

use crate::error::NasError;
use crate::pattern::FilePattern;
use crate::protocol::Protocol;
use crate::strategy::ProtocolStrategy;

/// One entry of a remote directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbEntry {
    /// Entry name, without any directory component.
    pub name: String,

    /// Whether the entry is a directory.
    pub is_directory: bool,
}

impl SmbEntry {
    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: false,
        }
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_directory: true,
        }
    }

    /// `.` and `..` entries returned by most servers.
    pub fn is_pseudo(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// Parameters needed to open an SMB session.
#[derive(Debug, Clone)]
pub struct SmbParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub share_name: String,
}

impl SmbParams {
    /// `smb://host:port` URL for clients that take one.
    pub fn server_url(&self) -> String {
        format!("smb://{}:{}", self.host, self.port)
    }

    /// Password in clear text, for handing to the client library only.
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// An open session bound to a single share.
///
/// Paths are share-relative and `/`-separated; the empty string names the
/// share root.
pub trait SmbSession {
    /// List the entries of a remote directory.
    fn list_path(&self, path: &str) -> Result<Vec<SmbEntry>, NasError>;

    /// Fetch a whole remote file.
    fn retrieve_file(&self, path: &str) -> Result<Vec<u8>, NasError>;

    /// Tear the session down. Called at most once by [`SmbStrategy`].
    fn disconnect(&mut self) -> Result<(), NasError>;
}

/// Opens SMB sessions.
pub trait SmbConnector {
    /// Open a session, failing if the host is unreachable or the
    /// credentials are rejected.
    fn connect(&self, params: &SmbParams) -> Result<Box<dyn SmbSession>, NasError>;
}

/// Join a share-relative directory and an entry name.
pub(crate) fn join_remote(directory: &str, name: &str) -> String {
    if directory.is_empty() {
        name.to_string()
    } else if directory.ends_with('/') {
        format!("{}{}", directory, name)
    } else {
        format!("{}/{}", directory, name)
    }
}

/// Collapse empty, `.` and `..` segments so equivalent paths compare equal.
pub(crate) fn normalize_remote(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split(|c: char| c == '/' || c == '\\') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Strategy over a remote SMB share.
pub struct SmbStrategy {
    session: Option<Box<dyn SmbSession>>,
    host: String,
    share_name: String,
}

impl SmbStrategy {
    /// Open a session through `connector`.
    pub fn connect(connector: &dyn SmbConnector, params: &SmbParams) -> Result<Self, NasError> {
        info!(
            host = %params.host,
            port = params.port,
            share = %params.share_name,
            "Opening SMB session"
        );
        let session = connector.connect(params)?;
        Ok(Self::from_session(
            session,
            params.host.clone(),
            params.share_name.clone(),
        ))
    }

    /// Wrap an already open session.
    pub fn from_session(
        session: Box<dyn SmbSession>,
        host: impl Into<String>,
        share_name: impl Into<String>,
    ) -> Self {
        Self {
            session: Some(session),
            host: host.into(),
            share_name: share_name.into(),
        }
    }

    pub fn share_name(&self) -> &str {
        &self.share_name
    }

    /// Whether the session is still open.
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn session(&self) -> Result<&dyn SmbSession, NasError> {
        self.session
            .as_deref()
            .ok_or_else(|| NasError::connection(&self.host, "session already closed"))
    }

    fn walk(
        &self,
        session: &dyn SmbSession,
        directory: &str,
        pattern: &FilePattern,
        recursive: bool,
        visited: &mut HashSet<String>,
        files: &mut Vec<String>,
    ) -> Result<(), NasError> {
        debug!(share = %self.share_name, directory, "Listing remote directory");

        for entry in session.list_path(directory)? {
            if entry.is_pseudo() {
                continue;
            }

            if entry.is_directory {
                if !recursive {
                    continue;
                }
                let child = join_remote(directory, &entry.name);
                if !visited.insert(normalize_remote(&child)) {
                    warn!(
                        share = %self.share_name,
                        path = %child,
                        "Skipping directory entry that resolves to a visited directory"
                    );
                    continue;
                }
                self.walk(session, &child, pattern, recursive, visited, files)?;
            } else if pattern.matches(&entry.name) {
                files.push(join_remote(directory, &entry.name));
            }
        }

        Ok(())
    }
}

impl ProtocolStrategy for SmbStrategy {
    fn protocol(&self) -> Protocol {
        Protocol::Smb
    }

    fn list_files(
        &self,
        directory: &str,
        pattern: &FilePattern,
        recursive: bool,
    ) -> Result<Vec<String>, NasError> {
        let session = self.session()?;
        let mut visited = HashSet::new();
        visited.insert(normalize_remote(directory));

        let mut files = Vec::new();
        self.walk(
            session,
            directory,
            pattern,
            recursive,
            &mut visited,
            &mut files,
        )?;

        debug!(
            share = %self.share_name,
            directory,
            pattern = pattern.as_str(),
            recursive,
            directories = visited.len(),
            count = files.len(),
            "Listed remote directory tree"
        );
        Ok(files)
    }

    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, NasError> {
        debug!(share = %self.share_name, path, "Retrieving remote file");
        self.session()?.retrieve_file(path)
    }

    fn close(&mut self) -> Result<(), NasError> {
        match self.session.take() {
            Some(mut session) => {
                info!(host = %self.host, share = %self.share_name, "Closing SMB session");
                session.disconnect()
            }
            None => Ok(()),
        }
    }
}

impl Drop for SmbStrategy {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close SMB session");
        }
    }
}

impl std::fmt::Debug for SmbStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmbStrategy")
            .field("host", &self.host)
            .field("share_name", &self.share_name)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::{BTreeSet, HashMap};
    use std::rc::Rc;

    /// Share contents keyed by normalized directory path.
    #[derive(Default)]
    struct FakeShare {
        listings: HashMap<String, Vec<SmbEntry>>,
        files: HashMap<String, Vec<u8>>,
        list_calls: Rc<RefCell<Vec<String>>>,
        disconnects: Rc<Cell<usize>>,
    }

    impl FakeShare {
        fn dir(mut self, path: &str, entries: Vec<SmbEntry>) -> Self {
            let mut with_pseudo = vec![SmbEntry::directory("."), SmbEntry::directory("..")];
            with_pseudo.extend(entries);
            self.listings.insert(path.to_string(), with_pseudo);
            self
        }

        fn file(mut self, path: &str, content: &[u8]) -> Self {
            self.files.insert(path.to_string(), content.to_vec());
            self
        }
    }

    impl SmbSession for FakeShare {
        fn list_path(&self, path: &str) -> Result<Vec<SmbEntry>, NasError> {
            self.list_calls.borrow_mut().push(path.to_string());
            self.listings
                .get(&normalize_remote(path))
                .cloned()
                .ok_or_else(|| NasError::not_found(path))
        }

        fn retrieve_file(&self, path: &str) -> Result<Vec<u8>, NasError> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| NasError::not_found(path))
        }

        fn disconnect(&mut self) -> Result<(), NasError> {
            self.disconnects.set(self.disconnects.get() + 1);
            Ok(())
        }
    }

    fn sample_share() -> FakeShare {
        FakeShare::default()
            .dir(
                "a",
                vec![SmbEntry::file("file1.txt"), SmbEntry::directory("b")],
            )
            .dir(
                "a/b",
                vec![SmbEntry::file("file2.txt"), SmbEntry::file("file3.log")],
            )
            .file("a/file1.txt", b"one")
            .file("a/b/file2.txt", b"two")
    }

    fn strategy(share: FakeShare) -> SmbStrategy {
        SmbStrategy::from_session(Box::new(share), "nas.local", "docs")
    }

    fn as_set(files: Vec<String>) -> BTreeSet<String> {
        files.into_iter().collect()
    }

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("", "x.txt"), "x.txt");
        assert_eq!(join_remote("a", "x.txt"), "a/x.txt");
        assert_eq!(join_remote("a/", "x.txt"), "a/x.txt");
    }

    #[test]
    fn test_normalize_remote() {
        assert_eq!(normalize_remote("a/./b/"), "a/b");
        assert_eq!(normalize_remote("a/b/.."), "a");
        assert_eq!(normalize_remote("/a//b"), "a/b");
    }

    #[test]
    fn test_recursive_listing() {
        let strategy = strategy(sample_share());
        let pattern = FilePattern::new("*.txt").unwrap();

        let files = strategy.list_files("a", &pattern, true).unwrap();

        let expected: BTreeSet<String> = ["a/file1.txt", "a/b/file2.txt"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(as_set(files), expected);
    }

    #[test]
    fn test_non_recursive_listing() {
        let strategy = strategy(sample_share());
        let pattern = FilePattern::new("*.txt").unwrap();

        let files = strategy.list_files("a", &pattern, false).unwrap();
        assert_eq!(files, vec!["a/file1.txt".to_string()]);
    }

    #[test]
    fn test_one_listing_per_directory() {
        let share = sample_share();
        let calls = Rc::clone(&share.list_calls);
        let strategy = strategy(share);

        strategy
            .list_files("a", &FilePattern::match_all(), true)
            .unwrap();

        assert_eq!(*calls.borrow(), vec!["a".to_string(), "a/b".to_string()]);
    }

    #[test]
    fn test_pseudo_entries_never_listed() {
        let share = FakeShare::default().dir(
            "",
            vec![SmbEntry::file("."), SmbEntry::file(".."), SmbEntry::file("x")],
        );
        let strategy = strategy(share);

        let files = strategy
            .list_files("", &FilePattern::match_all(), true)
            .unwrap();
        assert_eq!(files, vec!["x".to_string()]);
    }

    #[test]
    fn test_self_referential_entry_terminates() {
        // "loop" lists an empty-named directory, which joins back onto itself
        let share = FakeShare::default()
            .dir("root", vec![SmbEntry::directory("loop")])
            .dir(
                "root/loop",
                vec![
                    SmbEntry::directory(""),
                    SmbEntry::directory("./"),
                    SmbEntry::file("leaf.txt"),
                ],
            );
        let strategy = strategy(share);

        let files = strategy
            .list_files("root", &FilePattern::match_all(), true)
            .unwrap();
        assert_eq!(files, vec!["root/loop/leaf.txt".to_string()]);
    }

    #[test]
    fn test_missing_directory() {
        let strategy = strategy(sample_share());
        let err = strategy
            .list_files("nope", &FilePattern::match_all(), true)
            .unwrap_err();
        assert!(matches!(err, NasError::NotFound { .. }));
    }

    #[test]
    fn test_read_file() {
        let strategy = strategy(sample_share().file("a/bad.bin", &[0xff, 0x00]));

        assert_eq!(strategy.read_file("a/b/file2.txt").unwrap(), "two");
        assert!(matches!(
            strategy.read_file("a/bad.bin").unwrap_err(),
            NasError::Decode { .. }
        ));
        assert!(matches!(
            strategy.read_file("a/zzz.txt").unwrap_err(),
            NasError::NotFound { .. }
        ));
    }

    #[test]
    fn test_close_is_idempotent_and_disconnects_once() {
        let share = sample_share();
        let disconnects = Rc::clone(&share.disconnects);
        let mut strategy = strategy(share);

        strategy.close().unwrap();
        strategy.close().unwrap();
        assert!(!strategy.is_connected());
        drop(strategy);

        assert_eq!(disconnects.get(), 1);
    }

    #[test]
    fn test_drop_disconnects() {
        let share = sample_share();
        let disconnects = Rc::clone(&share.disconnects);
        drop(strategy(share));
        assert_eq!(disconnects.get(), 1);
    }

    #[test]
    fn test_closed_session_rejects_calls() {
        let mut strategy = strategy(sample_share());
        strategy.close().unwrap();

        let err = strategy.read_file("a/file1.txt").unwrap_err();
        assert!(matches!(err, NasError::Connection { .. }));
    }

    #[test]
    fn test_params_debug_redacts_password() {
        let params = SmbParams {
            host: "10.0.0.2".to_string(),
            port: 139,
            username: "svc".to_string(),
            password: SecretString::from("s3cret".to_string()),
            share_name: "docs".to_string(),
        };
        assert!(!format!("{:?}", params).contains("s3cret"));
        assert_eq!(params.password(), "s3cret");
        assert_eq!(params.server_url(), "smb://10.0.0.2:139");
    }
}
