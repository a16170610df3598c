//! # Backend Traits
//!
//! The capability interface every storage backend implements.
//!
//! ## Trait Layout
//!
//! ```text
//! BackendRead + BackendWrite + BackendDir = Backend
//! ```
//!
//! | Trait | Operations |
//! |-------|------------|
//! | [`BackendRead`] | `stat`, `exists`, `open_read`, `read_range`, `access` |
//! | [`BackendWrite`] | `open_write`, `open_update`, `copy`, `remove`, `unlink`, `rename` |
//! | [`BackendDir`] | `list`, `scan`, `glob`, `makedirs` |
//!
//! ## Blanket Implementation
//!
//! Implement the three component traits and the type is a [`Backend`]
//! automatically. The smart layer only ever holds `&dyn Backend`.
//!
//! ```rust
//! use smartfs::{Backend, LocalBackend};
//!
//! fn takes_backend(_: &dyn Backend) {}
//! takes_backend(&LocalBackend::default());
//! ```
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self`.

mod backend_dir;
mod backend_read;
mod backend_write;

pub use backend_dir::{BackendDir, EntryIter};
pub use backend_read::BackendRead;
pub use backend_write::{BackendWrite, DuplexStream};

/// A complete storage backend.
///
/// Automatically implemented for any type implementing [`BackendRead`],
/// [`BackendWrite`] and [`BackendDir`]. Never implement it directly.
///
/// # Example
///
/// ```rust
/// use smartfs::{Backend, OpenMode, SmartError};
/// use std::io::Write;
///
/// fn touch(backend: &dyn Backend, path: &str) -> Result<(), SmartError> {
///     let mut writer = backend.open_write(path, &OpenMode::WRITE_BINARY)?;
///     writer.flush().map_err(|e| SmartError::from_io("flush", path, e))
/// }
/// ```
pub trait Backend: BackendRead + BackendWrite + BackendDir {}

impl<T: BackendRead + BackendWrite + BackendDir> Backend for T {}
