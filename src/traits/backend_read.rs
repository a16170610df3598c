//! Read operations every backend provides.

use std::io::Read;

use crate::{Access, SmartError, StatResult};

/// Read operations for a storage backend.
///
/// Paths are the backend's normalized form as produced by the
/// [`Resolver`](crate::Resolver): plain filesystem paths for the local
/// backend, full `s3://bucket/key` URLs for the object store, `-` for stdio.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods take `&self`; backends
/// that keep state use interior mutability.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn BackendRead`.
pub trait BackendRead: Send + Sync {
    /// Metadata for a path, following symlinks for size and type but reporting
    /// whether the path itself is a link.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotFound`] if the path does not exist
    fn stat(&self, path: &str) -> Result<StatResult, SmartError>;

    /// Check if a path exists.
    ///
    /// Returns `Ok(false)` for missing paths; errors only for unexpected
    /// failures.
    fn exists(&self, path: &str) -> Result<bool, SmartError>;

    /// Open a file for streaming reads.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotFound`] if the path does not exist
    /// - [`SmartError::IsADirectory`] if the path is a directory
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, SmartError>;

    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Reading past the end returns the bytes that exist.
    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, SmartError>;

    /// Whether the path can be accessed for the given purpose.
    fn access(&self, path: &str, mode: Access) -> Result<bool, SmartError>;
}
