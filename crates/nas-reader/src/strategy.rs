//! Protocol strategy trait definition.
//!
//! A `ProtocolStrategy` is the capability set every NAS backend offers:
//! list files under a directory and read a file's contents. The reader
//! facade selects one implementation at construction and keeps it for its
//! whole lifetime.

use crate::error::NasError;
use crate::pattern::FilePattern;
use crate::protocol::Protocol;

/// Trait for protocol-specific NAS backends.
///
/// # Example
///
/// ```rust,ignore
/// use nas_reader::{FilePattern, NasError, Protocol, ProtocolStrategy};
///
/// struct InMemoryStrategy(Vec<(String, Vec<u8>)>);
///
/// impl ProtocolStrategy for InMemoryStrategy {
///     fn protocol(&self) -> Protocol {
///         Protocol::Nfs
///     }
///
///     fn list_files(
///         &self,
///         _directory: &str,
///         pattern: &FilePattern,
///         _recursive: bool,
///     ) -> Result<Vec<String>, NasError> {
///         Ok(self.0.iter().map(|(p, _)| p.clone()).filter(|p| pattern.matches(p)).collect())
///     }
///
///     fn read_bytes(&self, path: &str) -> Result<Vec<u8>, NasError> {
///         self.0
///             .iter()
///             .find(|(p, _)| p == path)
///             .map(|(_, bytes)| bytes.clone())
///             .ok_or_else(|| NasError::not_found(path))
///     }
/// }
/// ```
pub trait ProtocolStrategy {
    /// Protocol this backend speaks.
    fn protocol(&self) -> Protocol;

    /// List files under `directory` whose file name matches `pattern`.
    ///
    /// Descends into subdirectories when `recursive` is true. Directories
    /// are never returned. Order is backend-defined.
    ///
    /// # Errors
    ///
    /// Returns `NasError::NotFound` if `directory` does not exist.
    fn list_files(
        &self,
        directory: &str,
        pattern: &FilePattern,
        recursive: bool,
    ) -> Result<Vec<String>, NasError>;

    /// Fetch the entire file into memory.
    fn read_bytes(&self, path: &str) -> Result<Vec<u8>, NasError>;

    /// Read the file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `NasError::Decode` for invalid UTF-8 and
    /// `NasError::NotFound` if the path does not resolve.
    fn read_file(&self, path: &str) -> Result<String, NasError> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes).map_err(|source| NasError::Decode {
            path: path.to_string(),
            source,
        })
    }

    /// Release backend resources. Must be safe to call more than once.
    ///
    /// Default implementation does nothing.
    fn close(&mut self) -> Result<(), NasError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStrategy;

    impl ProtocolStrategy for FixedStrategy {
        fn protocol(&self) -> Protocol {
            Protocol::Nfs
        }

        fn list_files(
            &self,
            _directory: &str,
            pattern: &FilePattern,
            _recursive: bool,
        ) -> Result<Vec<String>, NasError> {
            Ok(["ok.txt", "bad.txt", "other.log"]
                .iter()
                .filter(|name| pattern.matches(name))
                .map(|name| name.to_string())
                .collect())
        }

        fn read_bytes(&self, path: &str) -> Result<Vec<u8>, NasError> {
            match path {
                "ok.txt" => Ok("héllo".as_bytes().to_vec()),
                "bad.txt" => Ok(vec![0xc3, 0x28]),
                _ => Err(NasError::not_found(path)),
            }
        }
    }

    #[test]
    fn test_default_read_file_decodes_utf8() {
        assert_eq!(FixedStrategy.read_file("ok.txt").unwrap(), "héllo");
    }

    #[test]
    fn test_default_read_file_rejects_invalid_utf8() {
        let err = FixedStrategy.read_file("bad.txt").unwrap_err();
        assert!(matches!(err, NasError::Decode { .. }));
    }

    #[test]
    fn test_read_missing_propagates_not_found() {
        let err = FixedStrategy.read_file("missing.txt").unwrap_err();
        assert!(matches!(err, NasError::NotFound { .. }));
    }

    #[test]
    fn test_default_close_is_noop() {
        let mut strategy = FixedStrategy;
        assert!(strategy.close().is_ok());
        assert!(strategy.close().is_ok());
    }

    #[test]
    fn test_pattern_passed_through() {
        let pattern = FilePattern::new("*.txt").unwrap();
        let files = FixedStrategy.list_files("", &pattern, true).unwrap();
        assert_eq!(files, vec!["ok.txt", "bad.txt"]);
    }
}
