//! Per-extension text extraction.
//!
//! Bulk loads decode files as UTF-8 by default. Registering an extractor
//! for an extension replaces that: the file is staged to a local scratch
//! path and the extractor turns the staged file into text.

use std::collections::HashMap;
use std::path::Path;

use crate::error::NasError;

/// Converts a staged local file into document text.
pub trait FileExtractor {
    /// Extract text from the file at `local_path`.
    ///
    /// # Errors
    ///
    /// Implementations should return `NasError::Extraction` when the file
    /// cannot be converted.
    fn extract(&self, local_path: &Path) -> Result<String, NasError>;
}

impl<F> FileExtractor for F
where
    F: Fn(&Path) -> Result<String, NasError>,
{
    fn extract(&self, local_path: &Path) -> Result<String, NasError> {
        self(local_path)
    }
}

/// Decodes bytes as UTF-8, replacing invalid sequences with U+FFFD.
///
/// Useful for legacy-encoded text that would otherwise fail the whole load.
#[derive(Debug, Clone, Copy, Default)]
pub struct LossyTextExtractor;

impl FileExtractor for LossyTextExtractor {
    fn extract(&self, local_path: &Path) -> Result<String, NasError> {
        let bytes = std::fs::read(local_path)
            .map_err(|e| NasError::io(local_path.to_string_lossy(), e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Extractors keyed by lowercase extension without the leading dot.
#[derive(Default)]
pub struct ExtractorMap {
    extractors: HashMap<String, Box<dyn FileExtractor>>,
}

impl ExtractorMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `extractor` for `extension` (".md", "md" and "MD" are equivalent).
    pub fn with(mut self, extension: &str, extractor: impl FileExtractor + 'static) -> Self {
        self.insert(extension, extractor);
        self
    }

    /// Register `extractor` for `extension`, replacing any previous one.
    pub fn insert(&mut self, extension: &str, extractor: impl FileExtractor + 'static) {
        self.extractors
            .insert(normalize_extension(extension), Box::new(extractor));
    }

    /// Extractor registered for the extension of `file_path`, if any.
    pub fn for_path(&self, file_path: &str) -> Option<&dyn FileExtractor> {
        let extension = extension_of(file_path)?;
        self.extractors.get(&extension).map(|e| &**e)
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.extractors.keys().map(String::as_str).collect();
        extensions.sort_unstable();
        extensions
    }
}

impl std::fmt::Debug for ExtractorMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorMap")
            .field("extensions", &self.extensions())
            .finish()
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Lowercase extension of the last path segment.
fn extension_of(file_path: &str) -> Option<String> {
    let name = file_path
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_path);
    let (stem, extension) = name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_lowercase())
}
