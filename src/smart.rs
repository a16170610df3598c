//! The smart layer: one path API over every backend.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::time::SystemTime;

use md5::{Digest, Md5};
use tracing::{debug, instrument};

use crate::file::{SmartFile, Stream};
use crate::transfer::transfer;
use crate::{
    expand, Access, BackendExt, BackendHandle, BackendKind, CopyFn, CopyRegistry, EntryIter, FileEntry,
    LocalBackend, ObjectClient, ObjectStoreBackend, OpenMode, Resolver, SmartConfig, SmartError,
    StatResult, WalkEntry,
};

/// Entry point for every path operation.
///
/// Routes each path to its backend by scheme, expands brace groups for
/// glob-style calls, picks a copy strategy per scheme pair and owns the
/// configuration. Construct once and pass it around; registering copy
/// functions needs `&mut self`, so it happens before the value is shared.
///
/// ```rust
/// use smartfs::SmartFs;
///
/// let dir = tempfile::tempdir().unwrap();
/// let path = dir.path().join("hello.txt");
/// let path = path.to_str().unwrap();
///
/// let fs = SmartFs::new();
/// fs.save_text(path, "hello").unwrap();
/// assert_eq!(fs.load_text(path).unwrap(), "hello");
/// assert_eq!(fs.load_content(path, Some(1), Some(3)).unwrap(), b"el");
/// ```
#[derive(Debug, Clone)]
pub struct SmartFs {
    pub(crate) resolver: Resolver,
    pub(crate) copy_funcs: CopyRegistry,
    pub(crate) config: SmartConfig,
}

/// Builder for [`SmartFs`].
#[derive(Debug, Default)]
pub struct SmartFsBuilder {
    config: SmartConfig,
    client: Option<Arc<dyn ObjectClient>>,
    copy_funcs: Option<CopyRegistry>,
}

impl SmartFsBuilder {
    /// Use this configuration instead of the defaults.
    pub fn config(mut self, config: SmartConfig) -> Self {
        self.config = config;
        self
    }

    /// Route `s3://` paths through this client.
    pub fn object_client(mut self, client: Arc<dyn ObjectClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Replace the built-in copy strategies.
    pub fn copy_funcs(mut self, registry: CopyRegistry) -> Self {
        self.copy_funcs = Some(registry);
        self
    }

    /// Finish building.
    pub fn build(self) -> SmartFs {
        let block_size = self.config.block_size;
        let object_store = self
            .client
            .map(|client| ObjectStoreBackend::with_block_size(client, block_size));
        SmartFs {
            resolver: Resolver::new(LocalBackend::new(block_size), object_store),
            copy_funcs: self.copy_funcs.unwrap_or_else(CopyRegistry::with_defaults),
            config: self.config,
        }
    }
}

impl Default for SmartFs {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a possibly negative index onto `0..=size`.
fn slice_index(index: Option<i64>, size: u64, default: u64) -> u64 {
    match index {
        None => default,
        Some(i) if i < 0 => size.saturating_sub(i.unsigned_abs()),
        Some(i) => (i as u64).min(size),
    }
}

impl SmartFs {
    /// Local and stdio backends with default configuration and copy strategies.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a [`SmartFs`].
    pub fn builder() -> SmartFsBuilder {
        SmartFsBuilder::default()
    }

    /// Active configuration.
    pub fn config(&self) -> &SmartConfig {
        &self.config
    }

    /// The path router.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Route a path to its backend.
    pub fn resolve<'a>(&'a self, path: &'a str) -> Result<BackendHandle<'a>, SmartError> {
        self.resolver.resolve(path)
    }

    /// Registered copy strategies.
    pub fn copy_funcs(&self) -> &CopyRegistry {
        &self.copy_funcs
    }

    /// Register a copy strategy for a scheme pair.
    ///
    /// # Errors
    ///
    /// - [`SmartError::DuplicateRegistration`] if the pair already has one
    pub fn register_copy_func(
        &mut self,
        src_scheme: &str,
        dst_scheme: &str,
        func: CopyFn,
    ) -> Result<(), SmartError> {
        self.copy_funcs.register(src_scheme, dst_scheme, func)
    }

    // Metadata

    /// Metadata snapshot of a path.
    pub fn stat(&self, path: &str) -> Result<StatResult, SmartError> {
        let h = self.resolve(path)?;
        h.backend().stat(h.path())
    }

    /// Whether anything exists at `path`.
    pub fn exists(&self, path: &str) -> Result<bool, SmartError> {
        let h = self.resolve(path)?;
        h.backend().exists(h.path())
    }

    /// Whether `path` is a file; `false` when missing.
    pub fn is_file(&self, path: &str) -> Result<bool, SmartError> {
        let h = self.resolve(path)?;
        h.backend().is_file(h.path())
    }

    /// Whether `path` is a directory; `false` when missing.
    pub fn is_dir(&self, path: &str) -> Result<bool, SmartError> {
        let h = self.resolve(path)?;
        h.backend().is_dir(h.path())
    }

    /// Whether `path` is a symbolic link; `false` when missing.
    pub fn is_symlink(&self, path: &str) -> Result<bool, SmartError> {
        let h = self.resolve(path)?;
        h.backend().is_symlink(h.path())
    }

    /// Size in bytes.
    pub fn getsize(&self, path: &str) -> Result<u64, SmartError> {
        let h = self.resolve(path)?;
        h.backend().getsize(h.path())
    }

    /// Last modification time.
    pub fn getmtime(&self, path: &str) -> Result<SystemTime, SmartError> {
        let h = self.resolve(path)?;
        h.backend().getmtime(h.path())
    }

    /// Whether `path` is accessible for `mode`.
    pub fn access(&self, path: &str, mode: Access) -> Result<bool, SmartError> {
        let h = self.resolve(path)?;
        h.backend().access(h.path(), mode)
    }

    /// Hex MD5 digest of a file's content, streamed in blocks.
    ///
    /// # Errors
    ///
    /// - [`SmartError::IsADirectory`] if `path` is a directory or prefix
    #[instrument(skip(self))]
    pub fn getmd5(&self, path: &str) -> Result<String, SmartError> {
        let h = self.resolve(path)?;
        if h.backend().stat(h.path())?.is_dir {
            return Err(SmartError::IsADirectory { path: path.into() });
        }
        let mut reader = h.backend().open_read(h.path())?;
        let mut hasher = Md5::new();
        let mut buf = vec![0u8; self.config.block_size.max(1)];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buf[..n]),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SmartError::from_io("read", path, e)),
            }
        }
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Whether `path` is a mount point. Remote paths never are.
    pub fn ismount(&self, path: &str) -> Result<bool, SmartError> {
        let h = self.resolve(path)?;
        match h.kind() {
            BackendKind::Local => self.resolver.local().is_mount(h.path()),
            BackendKind::ObjectStore | BackendKind::Stdio => Ok(false),
        }
    }

    // Listing

    /// Sorted names of the immediate children of a directory.
    pub fn listdir(&self, path: &str) -> Result<Vec<String>, SmartError> {
        let mut names = self
            .scandir(path)?
            .map(|entry| entry.map(|e| e.name))
            .collect::<Result<Vec<_>, _>>()?;
        names.sort();
        Ok(names)
    }

    /// Immediate children of a directory with their metadata.
    pub fn scandir(&self, path: &str) -> Result<EntryIter, SmartError> {
        let h = self.resolve(path)?;
        h.backend().list(h.path())
    }

    /// Paths of every file under `path`, recursively.
    pub fn scan(
        &self,
        path: &str,
    ) -> Result<impl Iterator<Item = Result<String, SmartError>> + Send + use<>, SmartError> {
        Ok(self.scan_stat(path)?.paths())
    }

    /// Every file under `path` with its metadata.
    #[instrument(skip(self))]
    pub fn scan_stat(&self, path: &str) -> Result<EntryIter, SmartError> {
        let h = self.resolve(path)?;
        h.backend().scan(h.path())
    }

    /// Top-down `(root, dirs, files)` levels under `path`.
    pub fn walk(&self, path: &str) -> Result<Vec<WalkEntry>, SmartError> {
        let h = self.resolve(path)?;
        h.backend().walk(h.path())
    }

    /// Every path matching `pattern`, collected.
    pub fn glob(&self, pattern: &str) -> Result<Vec<String>, SmartError> {
        self.iglob(pattern)?.collect()
    }

    /// Paths matching `pattern`.
    pub fn iglob(
        &self,
        pattern: &str,
    ) -> Result<impl Iterator<Item = Result<String, SmartError>> + Send + use<>, SmartError> {
        Ok(self.glob_stat(pattern)?.paths())
    }

    /// Entries matching `pattern`.
    ///
    /// A brace group expands into one glob per alternative. Each alternative
    /// may live on a different backend; results come in alternative order,
    /// the first alternative's matches before any of the next.
    #[instrument(skip(self))]
    pub fn glob_stat(&self, pattern: &str) -> Result<EntryIter, SmartError> {
        let alternatives = expand(pattern)?;
        let handles = alternatives
            .iter()
            .map(|alt| self.resolve(alt))
            .collect::<Result<Vec<_>, _>>()?;
        let mut results = Vec::with_capacity(handles.len());
        for h in handles {
            results.push(h.backend().glob(h.path())?);
        }
        debug!(alternatives = results.len(), "glob expanded");
        Ok(EntryIter::new(results.into_iter().flatten()))
    }

    // File I/O

    /// Open a file.
    ///
    /// `mode` is one of `r`, `w`, `a`, `x`, optionally with `b` or `t` and
    /// `+`. Modes with `+` need a backend with random access; the object
    /// store rejects them (use [`cache`](SmartFs::cache) instead).
    #[instrument(skip(self))]
    pub fn open(&self, path: &str, mode: &str) -> Result<SmartFile, SmartError> {
        let parsed = OpenMode::parse(mode)?;
        let h = self.resolve(path)?;
        let stream = if parsed.plus {
            Stream::Duplex(h.backend().open_update(h.path(), &parsed)?)
        } else if parsed.read {
            Stream::Reader(h.backend().open_read(h.path())?)
        } else {
            Stream::Writer(h.backend().open_write(h.path(), &parsed)?)
        };
        Ok(SmartFile::new(path, parsed, stream))
    }

    /// Read `[start, stop)` of a file with slice semantics.
    ///
    /// Negative indices count from the end; out-of-range indices clamp to
    /// the file size.
    ///
    /// # Errors
    ///
    /// - [`SmartError::IsADirectory`] if `path` is a directory or prefix
    /// - [`SmartError::RangeError`] if the normalized start is after stop
    pub fn load_content(
        &self,
        path: &str,
        start: Option<i64>,
        stop: Option<i64>,
    ) -> Result<Vec<u8>, SmartError> {
        let h = self.resolve(path)?;
        let stat = h.backend().stat(h.path())?;
        if stat.is_dir {
            return Err(SmartError::IsADirectory { path: path.into() });
        }
        let size = stat.size;
        let start = slice_index(start, size, 0);
        let stop = slice_index(stop, size, size);
        if start > stop {
            return Err(SmartError::RangeError {
                path: path.into(),
                start,
                stop,
            });
        }
        h.backend()
            .read_range(h.path(), start, (stop - start) as usize)
    }

    /// Replace the file's content.
    pub fn save_content(&self, path: &str, data: &[u8]) -> Result<(), SmartError> {
        let mut file = self.open(path, "wb")?;
        file.write_all(data)
            .map_err(|e| SmartError::from_io("write", path, e))?;
        file.close()
    }

    /// Whole file as text.
    pub fn load_text(&self, path: &str) -> Result<String, SmartError> {
        self.open(path, "r")?.read_text()
    }

    /// Replace the file's content with text.
    pub fn save_text(&self, path: &str, text: &str) -> Result<(), SmartError> {
        let mut file = self.open(path, "w")?;
        file.write_text(text)?;
        file.close()
    }

    /// Stream `reader` into a file, returning the bytes written.
    pub fn save_as(&self, reader: &mut dyn Read, path: &str) -> Result<u64, SmartError> {
        let mut file = self.open(path, "wb")?;
        let written = transfer(reader, &mut file, self.config.block_size, None, "<reader>", path)?;
        file.close()?;
        Ok(written)
    }

    /// Whole file buffered in memory.
    pub fn load_from(&self, path: &str) -> Result<Cursor<Vec<u8>>, SmartError> {
        let h = self.resolve(path)?;
        Ok(Cursor::new(h.backend().read_all(h.path())?))
    }

    // Mutation

    /// Remove a file or a whole directory tree.
    pub fn remove(&self, path: &str, missing_ok: bool) -> Result<(), SmartError> {
        let h = self.resolve(path)?;
        h.backend().remove(h.path(), missing_ok)
    }

    /// Remove a single file.
    pub fn unlink(&self, path: &str, missing_ok: bool) -> Result<(), SmartError> {
        let h = self.resolve(path)?;
        h.backend().unlink(h.path(), missing_ok)
    }

    /// Rename within one backend.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotSupported`] across backends; use
    ///   [`move_path`](SmartFs::move_path)
    #[instrument(skip(self))]
    pub fn rename(&self, src: &str, dst: &str) -> Result<(), SmartError> {
        let src_h = self.resolve(src)?;
        let dst_h = self.resolve(dst)?;
        if !src_h.same_backend(&dst_h) {
            return Err(SmartError::NotSupported {
                operation: "rename across backends",
                path: src.into(),
            });
        }
        src_h.backend().rename(src_h.path(), dst_h.path())
    }

    /// Create a directory and its parents.
    pub fn makedirs(&self, path: &str, exist_ok: bool) -> Result<(), SmartError> {
        let h = self.resolve(path)?;
        h.backend().makedirs(h.path(), exist_ok)
    }

    /// Every entry a glob matched, first alternative first.
    pub fn glob_entries(&self, pattern: &str) -> Result<Vec<FileEntry>, SmartError> {
        self.glob_stat(pattern)?.collect_all()
    }
}

// =============================================================================
// JSON Support (Feature-Gated)
// =============================================================================

#[cfg(feature = "serde")]
impl SmartFs {
    /// Read a file and deserialize it as JSON.
    ///
    /// # Errors
    ///
    /// - `SmartError::NotFound` if the file doesn't exist
    /// - `SmartError::Deserialization` if the JSON is malformed
    pub fn load_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, SmartError> {
        let data = self.load_text(path)?;
        serde_json::from_str(&data).map_err(|e| SmartError::Deserialization(e.to_string()))
    }

    /// Serialize a value as pretty-printed JSON and write it.
    pub fn save_json<T: serde::Serialize>(&self, path: &str, value: &T) -> Result<(), SmartError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| SmartError::Serialization(e.to_string()))?;
        self.save_text(path, &json)
    }
}
