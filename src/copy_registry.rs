//! Copy strategies keyed by `(source scheme, destination scheme)`.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use crate::scheme::{LOCAL_SCHEME, S3_SCHEME};
use crate::transfer::transfer;
use crate::{BackendHandle, OpenMode, SmartError};

/// Key of a registered copy strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CopyFuncKey {
    /// Scheme of the source path.
    pub src: String,
    /// Scheme of the destination path.
    pub dst: String,
}

impl CopyFuncKey {
    /// Key for a scheme pair.
    pub fn new(src: impl Into<String>, dst: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dst: dst.into(),
        }
    }
}

/// Everything a copy strategy gets to work with.
#[derive(Clone, Copy)]
pub struct CopyRequest<'a> {
    /// Resolved source.
    pub src: BackendHandle<'a>,
    /// Resolved destination.
    pub dst: BackendHandle<'a>,
    /// Progress callback, called with cumulative bytes.
    pub callback: Option<&'a dyn Fn(u64)>,
    /// Chunk size for streamed transfers.
    pub block_size: usize,
}

impl fmt::Debug for CopyRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CopyRequest")
            .field("src", &self.src)
            .field("dst", &self.dst)
            .field("block_size", &self.block_size)
            .finish_non_exhaustive()
    }
}

/// A copy strategy for one scheme pair.
pub type CopyFn = Arc<dyn Fn(&CopyRequest<'_>) -> Result<(), SmartError> + Send + Sync>;

/// Table of copy strategies.
///
/// Registration is rigid: a second registration for the same key fails with
/// [`SmartError::DuplicateRegistration`] and leaves the first in place. A
/// lookup miss means the caller falls back to [`stream_copy`].
///
/// ```rust
/// use std::sync::Arc;
/// use smartfs::{CopyRegistry, CopyRequest, SmartError};
///
/// fn skip(_: &CopyRequest<'_>) -> Result<(), SmartError> {
///     Ok(())
/// }
///
/// let mut registry = CopyRegistry::new();
/// registry.register("a", "b", Arc::new(skip)).unwrap();
/// let err = registry.register("a", "b", Arc::new(skip)).unwrap_err();
/// assert_eq!(err.to_string(), "copy function has already existed: a->b");
/// ```
#[derive(Clone, Default)]
pub struct CopyRegistry {
    funcs: HashMap<CopyFuncKey, CopyFn>,
}

impl CopyRegistry {
    /// Empty registry; every lookup misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in strategies.
    ///
    /// | Pair | Strategy |
    /// |------|----------|
    /// | `file -> file` | backend copy (symlink-aware) |
    /// | `s3 -> s3` | server-side copy |
    /// | `s3 -> file` | streamed download |
    /// | `file -> s3` | streamed upload |
    pub fn with_defaults() -> Self {
        let same: CopyFn = Arc::new(same_backend_copy);
        let stream: CopyFn = Arc::new(stream_copy);
        let funcs = HashMap::from([
            (CopyFuncKey::new(LOCAL_SCHEME, LOCAL_SCHEME), Arc::clone(&same)),
            (CopyFuncKey::new(S3_SCHEME, S3_SCHEME), same),
            (CopyFuncKey::new(S3_SCHEME, LOCAL_SCHEME), Arc::clone(&stream)),
            (CopyFuncKey::new(LOCAL_SCHEME, S3_SCHEME), stream),
        ]);
        Self { funcs }
    }

    /// Register a strategy for a scheme pair.
    ///
    /// # Errors
    ///
    /// - [`SmartError::DuplicateRegistration`] if the pair already has one
    pub fn register(&mut self, src: &str, dst: &str, func: CopyFn) -> Result<(), SmartError> {
        match self.funcs.entry(CopyFuncKey::new(src, dst)) {
            Entry::Occupied(_) => Err(SmartError::DuplicateRegistration {
                src_scheme: src.to_string(),
                dst_scheme: dst.to_string(),
            }),
            Entry::Vacant(slot) => {
                debug!(src, dst, "copy function registered");
                slot.insert(func);
                Ok(())
            }
        }
    }

    /// The strategy for a scheme pair, if any.
    pub fn lookup(&self, src: &str, dst: &str) -> Option<&CopyFn> {
        self.funcs.get(&CopyFuncKey::new(src, dst))
    }

    /// Number of registered pairs.
    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

impl fmt::Debug for CopyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self
            .funcs
            .keys()
            .map(|k| format!("{}->{}", k.src, k.dst))
            .collect();
        keys.sort();
        f.debug_struct("CopyRegistry").field("funcs", &keys).finish()
    }
}

/// Copy within one backend using its own copy operation.
pub fn same_backend_copy(req: &CopyRequest<'_>) -> Result<(), SmartError> {
    req.src
        .backend()
        .copy(req.src.path(), req.dst.path(), req.callback)
}

/// Generic copy: stream the source into the destination chunk by chunk.
pub fn stream_copy(req: &CopyRequest<'_>) -> Result<(), SmartError> {
    let (src, dst) = (req.src.path(), req.dst.path());
    let mut reader = req.src.backend().open_read(src)?;
    let mut writer = req.dst.backend().open_write(dst, &OpenMode::WRITE_BINARY)?;
    let copied = transfer(
        &mut reader,
        &mut writer,
        req.block_size,
        req.callback,
        req.src.original(),
        req.dst.original(),
    )?;
    writer
        .flush()
        .map_err(|e| SmartError::from_io("flush", req.dst.original(), e))?;
    debug!(bytes = copied, "stream copy finished");
    Ok(())
}
