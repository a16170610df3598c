//! Write operations every backend provides.

use std::io::{Read, Seek, Write};

use crate::{OpenMode, SmartError};

/// A stream that can be read, written and repositioned (`+` modes).
pub trait DuplexStream: Read + Write + Seek + Send {}
impl<T: Read + Write + Seek + Send> DuplexStream for T {}

/// Write operations for a storage backend.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods take `&self`.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn BackendWrite`.
pub trait BackendWrite: Send + Sync {
    /// Open a file for writing according to `mode` (`w`, `a` or `x`).
    ///
    /// Data may be buffered until the writer is flushed; callers must flush
    /// before relying on the content being visible.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotFound`] if the parent (or bucket) does not exist
    /// - [`SmartError::IsADirectory`] if the path is a directory
    /// - [`SmartError::AlreadyExists`] for `x` against an existing path
    fn open_write(&self, path: &str, mode: &OpenMode) -> Result<Box<dyn Write + Send>, SmartError>;

    /// Open a file for simultaneous reading and writing (`r+`, `w+`, `a+`, `x+`).
    ///
    /// The default rejects the mode; only backends with real random access
    /// override it.
    fn open_update(&self, path: &str, mode: &OpenMode) -> Result<Box<dyn DuplexStream>, SmartError> {
        Err(SmartError::InvalidMode {
            mode: mode.as_str().to_string(),
            reason: format!("read+write streams are not supported for {path}"),
        })
    }

    /// Copy a file within this backend, calling `callback` with the cumulative
    /// number of bytes copied.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotFound`] if the source, or the destination's parent, is missing
    /// - [`SmartError::IsADirectory`] if the source is a directory
    fn copy(&self, src: &str, dst: &str, callback: Option<&dyn Fn(u64)>) -> Result<(), SmartError>;

    /// Remove a file or a whole directory tree.
    ///
    /// With `missing_ok`, a missing path is not an error.
    fn remove(&self, path: &str, missing_ok: bool) -> Result<(), SmartError>;

    /// Remove a single file.
    ///
    /// # Errors
    ///
    /// - [`SmartError::IsADirectory`] if the path is a directory
    fn unlink(&self, path: &str, missing_ok: bool) -> Result<(), SmartError>;

    /// Rename a file or directory within this backend.
    fn rename(&self, src: &str, dst: &str) -> Result<(), SmartError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_write_is_object_safe() {
        fn _check(_: &dyn BackendWrite) {}
    }

    #[test]
    fn duplex_stream_is_implemented_for_cursor() {
        fn _check<T: DuplexStream>() {}
        _check::<std::io::Cursor<Vec<u8>>>();
    }
}
