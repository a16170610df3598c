//! Local materialization of remote files.
//!
//! Some consumers only accept a real filesystem path. [`SmartFs::cache`]
//! hands out one: local paths pass through untouched, remote paths are
//! downloaded into a temporary file and, for writing modes, uploaded back on
//! [`close`](CacheHandle::close).

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile, TempPath};
use tracing::{debug, instrument};

use crate::path::basename;
use crate::transfer::transfer;
use crate::{BackendKind, OpenMode, SmartError, SmartFs};

/// A local path standing in for a possibly remote file.
///
/// Dropping a materialized handle deletes the temporary copy without
/// uploading it; only [`close`](CacheHandle::close) writes back.
pub enum CacheHandle<'a> {
    /// The path already lives on the local filesystem.
    Passthrough {
        /// The local path.
        path: PathBuf,
    },
    /// A temporary local copy of a remote file.
    Materialized(Materialized<'a>),
}

/// Temporary copy of a remote file.
pub struct Materialized<'a> {
    fs: &'a SmartFs,
    remote: String,
    temp: TempPath,
    mode: OpenMode,
}

impl CacheHandle<'_> {
    /// Local path to hand to consumers.
    pub fn path(&self) -> &Path {
        match self {
            CacheHandle::Passthrough { path } => path,
            CacheHandle::Materialized(m) => &m.temp,
        }
    }

    /// Returns `true` if no temporary copy was made.
    pub fn is_passthrough(&self) -> bool {
        matches!(self, CacheHandle::Passthrough { .. })
    }

    /// The remote path behind a temporary copy.
    pub fn remote(&self) -> Option<&str> {
        match self {
            CacheHandle::Passthrough { .. } => None,
            CacheHandle::Materialized(m) => Some(&m.remote),
        }
    }

    /// Release the handle, uploading the local copy if the mode writes.
    pub fn close(self) -> Result<(), SmartError> {
        match self {
            CacheHandle::Passthrough { .. } => Ok(()),
            CacheHandle::Materialized(m) => m.write_back(),
        }
    }
}

impl Materialized<'_> {
    fn write_back(self) -> Result<(), SmartError> {
        if !self.mode.writes() {
            return Ok(());
        }
        let upload_mode = if self.mode.exclusive {
            OpenMode::CREATE_BINARY
        } else {
            OpenMode::WRITE_BINARY
        };
        let local = self.temp.to_string_lossy().into_owned();
        let h = self.fs.resolve(&self.remote)?;
        let mut reader =
            File::open(&self.temp).map_err(|e| SmartError::from_io("open", local.as_str(), e))?;
        let mut writer = h.backend().open_write(h.path(), &upload_mode)?;
        let bytes = transfer(
            &mut reader,
            &mut writer,
            self.fs.config.block_size,
            None,
            &local,
            &self.remote,
        )?;
        writer
            .flush()
            .map_err(|e| SmartError::from_io("upload", self.remote.as_str(), e))?;
        debug!(remote = %self.remote, bytes, "cached file written back");
        Ok(())
    }
}

impl fmt::Debug for CacheHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheHandle::Passthrough { path } => {
                f.debug_struct("Passthrough").field("path", path).finish()
            }
            CacheHandle::Materialized(m) => f
                .debug_struct("Materialized")
                .field("remote", &m.remote)
                .field("temp", &m.temp)
                .field("mode", &m.mode.to_string())
                .finish(),
        }
    }
}

impl SmartFs {
    /// A local path for `path`, opened with `mode` semantics.
    ///
    /// Local paths pass through. Remote files are copied into a temporary
    /// file (under the configured cache directory, if any) when the mode
    /// needs existing content: `r` requires the file, `a` starts empty when
    /// it is missing. `x` fails up front if the remote already exists.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotFound`] for a missing remote in a read mode
    /// - [`SmartError::AlreadyExists`] for `x` on an existing remote
    /// - [`SmartError::NotSupported`] for stdio
    #[instrument(skip(self))]
    pub fn cache<'a>(&'a self, path: &str, mode: &str) -> Result<CacheHandle<'a>, SmartError> {
        let mode = OpenMode::parse(mode)?;
        let h = self.resolve(path)?;
        match h.kind() {
            BackendKind::Local => {
                return Ok(CacheHandle::Passthrough {
                    path: PathBuf::from(h.path()),
                });
            }
            BackendKind::Stdio => {
                return Err(SmartError::NotSupported {
                    operation: "cache",
                    path: path.to_string(),
                });
            }
            BackendKind::ObjectStore => {}
        }

        if mode.exclusive && h.backend().exists(h.path())? {
            return Err(SmartError::AlreadyExists {
                path: path.to_string(),
                operation: "cache",
            });
        }

        let mut temp = self.temp_file(path)?;
        let local = temp.path().to_string_lossy().into_owned();
        if mode.keeps_content() {
            let reader = match h.backend().open_read(h.path()) {
                Ok(reader) => Some(reader),
                Err(SmartError::NotFound { .. }) if !mode.read => None,
                Err(e) => return Err(e),
            };
            if let Some(mut reader) = reader {
                let bytes = transfer(
                    &mut reader,
                    &mut temp,
                    self.config.block_size,
                    None,
                    path,
                    &local,
                )?;
                temp.flush()
                    .map_err(|e| SmartError::from_io("flush", local.as_str(), e))?;
                debug!(bytes, "remote file materialized");
            }
        }

        Ok(CacheHandle::Materialized(Materialized {
            fs: self,
            remote: path.to_string(),
            temp: temp.into_temp_path(),
            mode,
        }))
    }

    /// Run `f` on a cached local path, writing back only if it succeeds.
    pub fn with_cache<T>(
        &self,
        path: &str,
        mode: &str,
        f: impl FnOnce(&Path) -> Result<T, SmartError>,
    ) -> Result<T, SmartError> {
        let handle = self.cache(path, mode)?;
        let value = f(handle.path())?;
        handle.close()?;
        Ok(value)
    }

    fn temp_file(&self, remote: &str) -> Result<NamedTempFile, SmartError> {
        let suffix = Path::new(basename(remote))
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut builder = Builder::new();
        builder.prefix("smartfs-").suffix(&suffix);
        let result = match &self.config.cache_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        };
        result.map_err(|e| SmartError::from_io("create temp file", remote, e))
    }
}
