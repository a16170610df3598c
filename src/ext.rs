//! # Extension Traits
//!
//! Convenience methods for storage backends.
//!
//! [`BackendExt`] provides predicates and helpers that aren't part of the core
//! capability interface. They are default methods with a blanket
//! implementation, so every [`Backend`] gets them for free.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](BackendExt::is_file) | Path is a regular file |
//! | [`is_dir`](BackendExt::is_dir) | Path is a directory (or object-store prefix) |
//! | [`is_symlink`](BackendExt::is_symlink) | Path itself is a symbolic link |
//! | [`getsize`](BackendExt::getsize) | Size in bytes |
//! | [`getmtime`](BackendExt::getmtime) | Modification time |
//! | [`read_all`](BackendExt::read_all) | Whole content as bytes |
//! | [`walk`](BackendExt::walk) | Top-down `(root, dirs, files)` levels |

use std::io::Read;
use std::time::SystemTime;

use crate::{Backend, SmartError, WalkEntry};

/// Extension methods for any storage backend.
///
/// # Example
///
/// ```rust
/// use smartfs::{BackendExt, LocalBackend, SmartError};
///
/// fn has_config(backend: &LocalBackend) -> Result<bool, SmartError> {
///     backend.is_file("/etc/hostname")
/// }
/// ```
pub trait BackendExt: Backend {
    /// Check if the path points to a regular file.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_file(&self, path: &str) -> Result<bool, SmartError> {
        match self.stat(path) {
            Ok(s) => Ok(s.is_file()),
            Err(SmartError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if the path points to a directory.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_dir(&self, path: &str) -> Result<bool, SmartError> {
        match self.stat(path) {
            Ok(s) => Ok(s.is_dir),
            Err(SmartError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check if the path is a symbolic link.
    ///
    /// Returns `Ok(false)` if the path doesn't exist. Object stores never
    /// report links.
    fn is_symlink(&self, path: &str) -> Result<bool, SmartError> {
        match self.stat(path) {
            Ok(s) => Ok(s.is_symlink),
            Err(SmartError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Size of a file in bytes.
    ///
    /// # Errors
    ///
    /// Returns `SmartError::NotFound` if the path doesn't exist.
    fn getsize(&self, path: &str) -> Result<u64, SmartError> {
        Ok(self.stat(path)?.size)
    }

    /// Last modification time.
    fn getmtime(&self, path: &str) -> Result<SystemTime, SmartError> {
        Ok(self.stat(path)?.mtime)
    }

    /// Read the whole file.
    fn read_all(&self, path: &str) -> Result<Vec<u8>, SmartError> {
        let mut reader = self.open_read(path)?;
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| SmartError::from_io("read", path, e))?;
        Ok(data)
    }

    /// Walk a directory tree top-down.
    ///
    /// Each level lists sorted subdirectory and file names; subdirectories are
    /// then visited in that order. A missing or non-directory root yields no
    /// levels.
    fn walk(&self, path: &str) -> Result<Vec<WalkEntry>, SmartError> {
        let mut levels = Vec::new();
        if !self.is_dir(path)? {
            return Ok(levels);
        }
        let mut pending = vec![path.to_string()];
        while let Some(root) = pending.pop() {
            let mut dirs = Vec::new();
            let mut files = Vec::new();
            let mut children = Vec::new();
            for entry in self.list(&root)? {
                let entry = entry?;
                if entry.stat.is_dir {
                    dirs.push(entry.name);
                    children.push(entry.path);
                } else {
                    files.push(entry.name);
                }
            }
            dirs.sort();
            files.sort();
            children.sort();
            // Stack: push in reverse so the first child is visited next.
            pending.extend(children.into_iter().rev());
            levels.push(WalkEntry { root, dirs, files });
        }
        Ok(levels)
    }
}

// Blanket implementation - any backend gets BackendExt for free
impl<B: Backend + ?Sized> BackendExt for B {}
