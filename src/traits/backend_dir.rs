//! Directory-style operations every backend provides.

use crate::{FileEntry, SmartError};

/// Directory operations for a storage backend.
///
/// Object stores have no real directories; they report key prefixes as
/// directories and treat `makedirs` as an existence check.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn BackendDir`.
pub trait BackendDir: Send + Sync {
    /// List the immediate children of a directory.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotFound`] if the path does not exist
    /// - [`SmartError::NotADirectory`] if the path is a file
    fn list(&self, path: &str) -> Result<EntryIter, SmartError>;

    /// Recursively enumerate every file under `path`.
    ///
    /// A file path yields itself. Entries come in the backend's natural order.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotFound`] if nothing exists at `path`
    fn scan(&self, path: &str) -> Result<EntryIter, SmartError>;

    /// Match a glob pattern (`*`, `?`, `[...]`, `**`) against this backend.
    ///
    /// # Errors
    ///
    /// - [`SmartError::InvalidPattern`] if the pattern does not compile
    fn glob(&self, pattern: &str) -> Result<EntryIter, SmartError>;

    /// Create a directory and all missing parents.
    ///
    /// # Errors
    ///
    /// - [`SmartError::AlreadyExists`] if the path exists and `exist_ok` is false
    fn makedirs(&self, path: &str, exist_ok: bool) -> Result<(), SmartError>;
}

/// Iterator over listed, scanned or globbed entries.
///
/// - Outer `Result` (from the backend call) = "can this be listed at all?"
/// - Inner `Result` (per item) = "could this entry be read?"
pub struct EntryIter(Box<dyn Iterator<Item = Result<FileEntry, SmartError>> + Send + 'static>);

impl EntryIter {
    /// Create from any compatible iterator.
    pub fn new<I>(iter: I) -> Self
    where
        I: Iterator<Item = Result<FileEntry, SmartError>> + Send + 'static,
    {
        Self(Box::new(iter))
    }

    /// Create from already collected entries.
    pub fn from_vec(entries: Vec<FileEntry>) -> Self {
        Self(Box::new(entries.into_iter().map(Ok)))
    }

    /// Collect all entries, short-circuiting on the first error.
    pub fn collect_all(self) -> Result<Vec<FileEntry>, SmartError> {
        self.collect()
    }

    /// Keep only the paths.
    pub fn paths(self) -> impl Iterator<Item = Result<String, SmartError>> + Send {
        self.map(|entry| entry.map(|e| e.path))
    }
}

impl Iterator for EntryIter {
    type Item = Result<FileEntry, SmartError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}
