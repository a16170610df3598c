//! Local filesystem backend over `std::fs`.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::SystemTime;

use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::transfer::transfer;
use crate::{
    Access, BackendDir, BackendRead, BackendWrite, DuplexStream, EntryIter, FileEntry, OpenMode,
    SmartError, StatResult, DEFAULT_BLOCK_SIZE,
};

/// Backend for bare paths and `file://` URLs.
///
/// Stateless apart from the transfer block size, so a single instance can be
/// shared freely.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    block_size: usize,
}

impl LocalBackend {
    /// Backend that copies in chunks of `block_size` bytes.
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }

    /// Whether `path` is a mount point.
    ///
    /// A directory is a mount point when it lives on a different device than
    /// its parent, or when it is its own parent (`/`). Missing paths, files
    /// and symbolic links are not.
    #[cfg(unix)]
    pub fn is_mount(&self, path: &str) -> Result<bool, SmartError> {
        use std::os::unix::fs::MetadataExt;

        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(SmartError::from_io("ismount", path, e)),
        };
        if !meta.is_dir() {
            return Ok(false);
        }
        let parent = Path::new(path).join("..");
        let parent_meta =
            fs::metadata(&parent).map_err(|e| SmartError::from_io("ismount", path, e))?;
        Ok(meta.dev() != parent_meta.dev() || meta.ino() == parent_meta.ino())
    }

    /// Mount points are not detected on this platform.
    #[cfg(not(unix))]
    pub fn is_mount(&self, _path: &str) -> Result<bool, SmartError> {
        Ok(false)
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_SIZE)
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Stat without requiring the link target to exist.
fn stat_path(path: &Path) -> Result<StatResult, SmartError> {
    let link_meta =
        fs::symlink_metadata(path).map_err(|e| SmartError::from_io("stat", display(path), e))?;
    let is_symlink = link_meta.file_type().is_symlink();
    // A dangling link still stats as the link itself.
    let meta = if is_symlink {
        fs::metadata(path).unwrap_or(link_meta)
    } else {
        link_meta
    };
    let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
    let mut stat = if meta.is_dir() {
        StatResult::dir(mtime)
    } else {
        StatResult::file(meta.len(), mtime)
    };
    stat.is_symlink = is_symlink;
    Ok(stat)
}

fn entry_for(path: &Path) -> Result<FileEntry, SmartError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(FileEntry {
        name,
        path: display(path),
        stat: stat_path(path)?,
    })
}

fn walk_error(error: walkdir::Error, root: &str) -> SmartError {
    let path = error.path().map(display).unwrap_or_else(|| root.to_string());
    match error.into_io_error() {
        Some(io) => SmartError::from_io("scan", path, io),
        None => SmartError::Backend(format!("filesystem loop under {root}")),
    }
}

/// Recreate `src` as a link at `dst`. Returns `false` where links can't be
/// recreated, so the caller copies the target's content instead.
#[cfg(unix)]
fn copy_symlink(src: &str, dst: &str) -> Result<bool, SmartError> {
    let target = fs::read_link(src).map_err(|e| SmartError::from_io("copy", src, e))?;
    match fs::remove_file(dst) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(SmartError::from_io("copy", dst, e)),
    }
    std::os::unix::fs::symlink(&target, dst).map_err(|e| SmartError::from_io("copy", dst, e))?;
    debug!(target = %target.display(), "symlink recreated");
    Ok(true)
}

#[cfg(not(unix))]
fn copy_symlink(_src: &str, _dst: &str) -> Result<bool, SmartError> {
    Ok(false)
}

fn glob_options() -> glob::MatchOptions {
    glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

impl BackendRead for LocalBackend {
    fn stat(&self, path: &str) -> Result<StatResult, SmartError> {
        stat_path(Path::new(path))
    }

    fn exists(&self, path: &str) -> Result<bool, SmartError> {
        Path::new(path)
            .try_exists()
            .map_err(|e| SmartError::from_io("exists", path, e))
    }

    #[instrument(skip(self))]
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, SmartError> {
        let file = File::open(path).map_err(|e| SmartError::from_io("open", path, e))?;
        let meta = file
            .metadata()
            .map_err(|e| SmartError::from_io("open", path, e))?;
        if meta.is_dir() {
            return Err(SmartError::IsADirectory { path: path.into() });
        }
        debug!("file opened for reading");
        Ok(Box::new(file))
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, SmartError> {
        let mut file = File::open(path).map_err(|e| SmartError::from_io("read", path, e))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| SmartError::from_io("seek", path, e))?;
        let mut data = Vec::with_capacity(len);
        file.take(len as u64)
            .read_to_end(&mut data)
            .map_err(|e| SmartError::from_io("read", path, e))?;
        Ok(data)
    }

    fn access(&self, path: &str, mode: Access) -> Result<bool, SmartError> {
        match (mode, fs::metadata(path)) {
            (Access::Read, Ok(_)) => Ok(true),
            (Access::Write, Ok(meta)) => Ok(!meta.permissions().readonly()),
            (_, Err(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            (_, Err(e)) => Err(SmartError::from_io("access", path, e)),
        }
    }
}

impl BackendWrite for LocalBackend {
    #[instrument(skip(self))]
    fn open_write(&self, path: &str, mode: &OpenMode) -> Result<Box<dyn Write + Send>, SmartError> {
        let mut options = OpenOptions::new();
        if mode.write {
            options.write(true).create(true).truncate(true);
        } else if mode.append {
            options.append(true).create(true);
        } else if mode.exclusive {
            options.write(true).create_new(true);
        } else {
            return Err(SmartError::InvalidMode {
                mode: mode.as_str().to_string(),
                reason: format!("cannot open {path} for writing"),
            });
        }
        let file = options
            .open(path)
            .map_err(|e| SmartError::from_io("open", path, e))?;
        debug!("file opened for writing");
        Ok(Box::new(file))
    }

    #[instrument(skip(self))]
    fn open_update(&self, path: &str, mode: &OpenMode) -> Result<Box<dyn DuplexStream>, SmartError> {
        if !mode.plus {
            return Err(SmartError::InvalidMode {
                mode: mode.as_str().to_string(),
                reason: format!("read+write open of {path} needs '+'"),
            });
        }
        let mut options = OpenOptions::new();
        options.read(true);
        if mode.read {
            options.write(true);
        } else if mode.write {
            options.write(true).create(true).truncate(true);
        } else if mode.append {
            options.append(true).create(true);
        } else {
            options.write(true).create_new(true);
        }
        let file = options
            .open(path)
            .map_err(|e| SmartError::from_io("open", path, e))?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self, callback))]
    fn copy(&self, src: &str, dst: &str, callback: Option<&dyn Fn(u64)>) -> Result<(), SmartError> {
        let meta = fs::symlink_metadata(src).map_err(|e| SmartError::from_io("copy", src, e))?;

        if meta.file_type().is_symlink() && copy_symlink(src, dst)? {
            return Ok(());
        }

        if meta.is_dir() {
            return Err(SmartError::IsADirectory { path: src.into() });
        }
        let mut reader = File::open(src).map_err(|e| SmartError::from_io("copy", src, e))?;
        let mut writer = File::create(dst).map_err(|e| SmartError::from_io("copy", dst, e))?;
        let copied = transfer(&mut reader, &mut writer, self.block_size, callback, src, dst)?;
        writer
            .flush()
            .map_err(|e| SmartError::from_io("copy", dst, e))?;
        fs::set_permissions(dst, meta.permissions())
            .map_err(|e| SmartError::from_io("copy", dst, e))?;
        debug!(bytes = copied, "file copied");
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, path: &str, missing_ok: bool) -> Result<(), SmartError> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if missing_ok && e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(SmartError::from_io("remove", path, e)),
        };
        let result = if meta.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        };
        result.map_err(|e| SmartError::from_io("remove", path, e))
    }

    #[instrument(skip(self))]
    fn unlink(&self, path: &str, missing_ok: bool) -> Result<(), SmartError> {
        let meta = match fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if missing_ok && e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(SmartError::from_io("unlink", path, e)),
        };
        if meta.is_dir() {
            return Err(SmartError::IsADirectory { path: path.into() });
        }
        fs::remove_file(path).map_err(|e| SmartError::from_io("unlink", path, e))
    }

    #[instrument(skip(self))]
    fn rename(&self, src: &str, dst: &str) -> Result<(), SmartError> {
        fs::symlink_metadata(src).map_err(|e| SmartError::from_io("rename", src, e))?;
        fs::rename(src, dst).map_err(|e| SmartError::from_io("rename", dst, e))
    }
}

impl BackendDir for LocalBackend {
    fn list(&self, path: &str) -> Result<EntryIter, SmartError> {
        let meta = fs::metadata(path).map_err(|e| SmartError::from_io("list", path, e))?;
        if !meta.is_dir() {
            return Err(SmartError::NotADirectory { path: path.into() });
        }
        let root = path.to_string();
        let iter = fs::read_dir(path)
            .map_err(|e| SmartError::from_io("list", path, e))?
            .map(move |entry| {
                let entry = entry.map_err(|e| SmartError::from_io("list", root.as_str(), e))?;
                entry_for(&entry.path())
            });
        Ok(EntryIter::new(iter))
    }

    #[instrument(skip(self))]
    fn scan(&self, path: &str) -> Result<EntryIter, SmartError> {
        let root = stat_path(Path::new(path))?;
        if root.is_file() {
            return Ok(EntryIter::from_vec(vec![entry_for(Path::new(path))?]));
        }
        let root_path = path.to_string();
        let iter = WalkDir::new(path)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(move |entry| match entry {
                Ok(e) => {
                    let is_dir = e.file_type().is_dir()
                        || (e.path_is_symlink() && e.path().is_dir());
                    (!is_dir).then(|| entry_for(e.path()))
                }
                Err(e) => {
                    debug!(error = %e, "error walking directory");
                    Some(Err(walk_error(e, &root_path)))
                }
            });
        Ok(EntryIter::new(iter))
    }

    #[instrument(skip(self))]
    fn glob(&self, pattern: &str) -> Result<EntryIter, SmartError> {
        let paths = glob::glob_with(pattern, glob_options()).map_err(|e| {
            SmartError::InvalidPattern {
                pattern: pattern.into(),
                reason: e.msg.to_string(),
            }
        })?;
        let iter = paths.map(|found| match found {
            Ok(path) => entry_for(&path),
            Err(e) => {
                let source = std::io::Error::new(e.error().kind(), e.error().to_string());
                Err(SmartError::from_io("glob", display(e.path()), source))
            }
        });
        Ok(EntryIter::new(iter))
    }

    #[instrument(skip(self))]
    fn makedirs(&self, path: &str, exist_ok: bool) -> Result<(), SmartError> {
        if !exist_ok && self.exists(path)? {
            return Err(SmartError::AlreadyExists {
                path: path.into(),
                operation: "makedirs",
            });
        }
        fs::create_dir_all(path).map_err(|e| SmartError::from_io("makedirs", path, e))
    }
}
