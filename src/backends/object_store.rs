//! S3-compatible object store backend.
//!
//! The backend holds no transport of its own. Every request goes through an
//! [`ObjectClient`], which a real SDK wrapper implements; the crate ships
//! [`MemoryObjectClient`](crate::MemoryObjectClient) for tests and embedding.
//!
//! Object stores have no directories. A "directory" is any key prefix ending
//! in `/` that has at least one object under it.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::{self, Read, Write};
use std::ops::Range;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, instrument};

use crate::scheme::split_scheme;
use crate::{
    Access, BackendDir, BackendRead, BackendWrite, EntryIter, FileEntry, OpenMode, SmartError,
    StatResult, DEFAULT_BLOCK_SIZE,
};

/// Metadata of a single stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    /// Full key within the bucket.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: SystemTime,
}

/// Minimal request surface of an S3-compatible service.
///
/// Implementations report a missing bucket or object as
/// [`SmartError::NotFound`] naming the `s3://` URL.
pub trait ObjectClient: Send + Sync + Debug {
    /// Whether the bucket exists and is reachable.
    fn has_bucket(&self, bucket: &str) -> Result<bool, SmartError>;

    /// Metadata of one object, `None` if absent.
    fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectMeta>, SmartError>;

    /// Every object whose key starts with `prefix`, sorted by key.
    fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectMeta>, SmartError>;

    /// Object content, optionally limited to a byte range (clamped to the size).
    fn get_object(
        &self,
        bucket: &str,
        key: &str,
        range: Option<Range<u64>>,
    ) -> Result<Vec<u8>, SmartError>;

    /// Create or replace an object.
    fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<(), SmartError>;

    /// Server-side copy.
    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> Result<(), SmartError>;

    /// Delete an object. Deleting a missing object succeeds.
    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), SmartError>;
}

/// Backend for `s3://bucket/key` URLs.
#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    client: Arc<dyn ObjectClient>,
    block_size: usize,
}

/// Build the canonical URL of a key.
fn url(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

fn dir_prefix(key: &str) -> String {
    let trimmed = key.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

fn basename(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn file_entry(bucket: &str, meta: &ObjectMeta) -> FileEntry {
    FileEntry {
        name: basename(&meta.key).to_string(),
        path: url(bucket, &meta.key),
        stat: StatResult::file(meta.size, meta.last_modified),
    }
}

fn to_io(error: SmartError) -> io::Error {
    match error {
        SmartError::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, error),
        other => io::Error::other(other),
    }
}

impl ObjectStoreBackend {
    /// Backend sending requests through `client`.
    pub fn new(client: Arc<dyn ObjectClient>) -> Self {
        Self::with_block_size(client, DEFAULT_BLOCK_SIZE)
    }

    /// Backend reading objects in ranged requests of `block_size` bytes.
    pub fn with_block_size(client: Arc<dyn ObjectClient>, block_size: usize) -> Self {
        Self {
            client,
            block_size: block_size.max(1),
        }
    }

    /// The client requests go through.
    pub fn client(&self) -> &Arc<dyn ObjectClient> {
        &self.client
    }

    /// Split `s3://bucket/key` into bucket and key.
    pub fn parse<'p>(&self, path: &'p str) -> Result<(&'p str, &'p str), SmartError> {
        let (_, rest) = split_scheme(path);
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(SmartError::InvalidPath {
                path: path.into(),
                reason: "empty bucket name",
            });
        }
        Ok((bucket, key))
    }

    fn require_bucket(&self, bucket: &str) -> Result<(), SmartError> {
        if self.client.has_bucket(bucket)? {
            Ok(())
        } else {
            Err(SmartError::NotFound {
                path: format!("s3://{bucket}"),
            })
        }
    }

    /// Objects under `key` treated as a directory.
    fn children(&self, bucket: &str, key: &str) -> Result<Vec<ObjectMeta>, SmartError> {
        let prefix = dir_prefix(key);
        self.client.list_objects(bucket, &prefix)
    }

    fn is_prefix(&self, bucket: &str, key: &str) -> Result<bool, SmartError> {
        Ok(!self.children(bucket, key)?.is_empty())
    }
}

impl BackendRead for ObjectStoreBackend {
    fn stat(&self, path: &str) -> Result<StatResult, SmartError> {
        let (bucket, key) = self.parse(path)?;
        if key.is_empty() {
            self.require_bucket(bucket)
                .map_err(|_| SmartError::NotFound { path: path.into() })?;
            return Ok(StatResult::dir(SystemTime::UNIX_EPOCH));
        }
        if !key.ends_with('/') {
            if let Some(meta) = self.client.head_object(bucket, key)? {
                return Ok(StatResult::file(meta.size, meta.last_modified));
            }
        }
        let children = self.children(bucket, key)?;
        match children.iter().map(|m| m.last_modified).max() {
            Some(newest) => Ok(StatResult::dir(newest)),
            None => Err(SmartError::NotFound { path: path.into() }),
        }
    }

    fn exists(&self, path: &str) -> Result<bool, SmartError> {
        match self.stat(path) {
            Ok(_) => Ok(true),
            Err(SmartError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self))]
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, SmartError> {
        let (bucket, key) = self.parse(path)?;
        let meta = match self.client.head_object(bucket, key)? {
            Some(meta) => meta,
            None if self.exists(path)? => {
                return Err(SmartError::IsADirectory { path: path.into() });
            }
            None => return Err(SmartError::NotFound { path: path.into() }),
        };
        debug!(size = meta.size, "object opened for reading");
        Ok(Box::new(ObjectReader {
            client: Arc::clone(&self.client),
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: meta.size,
            pos: 0,
            block_size: self.block_size,
            buf: Vec::new(),
            buf_start: 0,
        }))
    }

    fn read_range(&self, path: &str, offset: u64, len: usize) -> Result<Vec<u8>, SmartError> {
        let (bucket, key) = self.parse(path)?;
        let end = offset.saturating_add(len as u64);
        self.client.get_object(bucket, key, Some(offset..end))
    }

    fn access(&self, path: &str, _mode: Access) -> Result<bool, SmartError> {
        let (bucket, _) = self.parse(path)?;
        self.client.has_bucket(bucket)
    }
}

impl BackendWrite for ObjectStoreBackend {
    #[instrument(skip(self))]
    fn open_write(&self, path: &str, mode: &OpenMode) -> Result<Box<dyn Write + Send>, SmartError> {
        if !(mode.write || mode.append || mode.exclusive) {
            return Err(SmartError::InvalidMode {
                mode: mode.as_str().to_string(),
                reason: format!("cannot open {path} for writing"),
            });
        }
        let (bucket, key) = self.parse(path)?;
        self.require_bucket(bucket)?;
        if key.is_empty() || key.ends_with('/') || self.is_prefix(bucket, key)? {
            return Err(SmartError::IsADirectory { path: path.into() });
        }
        let existing = self.client.head_object(bucket, key)?;
        if mode.exclusive && existing.is_some() {
            return Err(SmartError::AlreadyExists {
                path: path.into(),
                operation: "open",
            });
        }
        let buf = match existing {
            Some(_) if mode.append => self.client.get_object(bucket, key, None)?,
            _ => Vec::new(),
        };
        debug!(preloaded = buf.len(), "object opened for writing");
        Ok(Box::new(ObjectWriter {
            client: Arc::clone(&self.client),
            bucket: bucket.to_string(),
            key: key.to_string(),
            buf,
            dirty: true,
        }))
    }

    #[instrument(skip(self, callback))]
    fn copy(&self, src: &str, dst: &str, callback: Option<&dyn Fn(u64)>) -> Result<(), SmartError> {
        let (src_bucket, src_key) = self.parse(src)?;
        let (dst_bucket, dst_key) = self.parse(dst)?;
        let meta = match self.client.head_object(src_bucket, src_key)? {
            Some(meta) => meta,
            None if self.exists(src)? => {
                return Err(SmartError::IsADirectory { path: src.into() });
            }
            None => return Err(SmartError::NotFound { path: src.into() }),
        };
        if dst_key.is_empty() || dst_key.ends_with('/') {
            return Err(SmartError::IsADirectory { path: dst.into() });
        }
        self.client
            .copy_object(src_bucket, src_key, dst_bucket, dst_key)?;
        if let Some(cb) = callback {
            cb(meta.size);
        }
        debug!(bytes = meta.size, "object copied server-side");
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove(&self, path: &str, missing_ok: bool) -> Result<(), SmartError> {
        let (bucket, key) = self.parse(path)?;
        if key.is_empty() {
            return Err(SmartError::NotSupported {
                operation: "remove bucket",
                path: path.into(),
            });
        }
        let mut removed = 0usize;
        if !key.ends_with('/') && self.client.head_object(bucket, key)?.is_some() {
            self.client.delete_object(bucket, key)?;
            removed += 1;
        }
        for meta in self.children(bucket, key)? {
            self.client.delete_object(bucket, &meta.key)?;
            removed += 1;
        }
        debug!(removed, "objects removed");
        if removed == 0 && !missing_ok {
            return Err(SmartError::NotFound { path: path.into() });
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn unlink(&self, path: &str, missing_ok: bool) -> Result<(), SmartError> {
        let (bucket, key) = self.parse(path)?;
        if !key.is_empty() && self.client.head_object(bucket, key)?.is_some() {
            return self.client.delete_object(bucket, key);
        }
        if self.exists(path)? {
            return Err(SmartError::IsADirectory { path: path.into() });
        }
        if missing_ok {
            Ok(())
        } else {
            Err(SmartError::NotFound { path: path.into() })
        }
    }

    /// Copy then delete; not atomic.
    #[instrument(skip(self))]
    fn rename(&self, src: &str, dst: &str) -> Result<(), SmartError> {
        let (src_bucket, src_key) = self.parse(src)?;
        let (dst_bucket, dst_key) = self.parse(dst)?;
        if !src_key.is_empty() && self.client.head_object(src_bucket, src_key)?.is_some() {
            self.client
                .copy_object(src_bucket, src_key, dst_bucket, dst_key)?;
            return self.client.delete_object(src_bucket, src_key);
        }

        let src_prefix = dir_prefix(src_key);
        let dst_prefix = dir_prefix(dst_key);
        let children = self.client.list_objects(src_bucket, &src_prefix)?;
        if children.is_empty() {
            return Err(SmartError::NotFound { path: src.into() });
        }
        for meta in children {
            let target = format!("{dst_prefix}{}", &meta.key[src_prefix.len()..]);
            self.client
                .copy_object(src_bucket, &meta.key, dst_bucket, &target)?;
            self.client.delete_object(src_bucket, &meta.key)?;
        }
        Ok(())
    }
}

impl BackendDir for ObjectStoreBackend {
    fn list(&self, path: &str) -> Result<EntryIter, SmartError> {
        let (bucket, key) = self.parse(path)?;
        self.require_bucket(bucket)?;
        let prefix = dir_prefix(key);
        let objects = self.client.list_objects(bucket, &prefix)?;
        if objects.is_empty() && !key.is_empty() {
            if self.client.head_object(bucket, key)?.is_some() {
                return Err(SmartError::NotADirectory { path: path.into() });
            }
            return Err(SmartError::NotFound { path: path.into() });
        }

        let mut entries: BTreeMap<String, FileEntry> = BTreeMap::new();
        for meta in &objects {
            let rest = &meta.key[prefix.len()..];
            match rest.split_once('/') {
                Some((dir, _)) => {
                    let entry = entries.entry(dir.to_string()).or_insert_with(|| FileEntry {
                        name: dir.to_string(),
                        path: url(bucket, &format!("{prefix}{dir}")),
                        stat: StatResult::dir(meta.last_modified),
                    });
                    entry.stat.mtime = entry.stat.mtime.max(meta.last_modified);
                }
                None if rest.is_empty() => {}
                None => {
                    entries.insert(rest.to_string(), file_entry(bucket, meta));
                }
            }
        }
        Ok(EntryIter::from_vec(entries.into_values().collect()))
    }

    #[instrument(skip(self))]
    fn scan(&self, path: &str) -> Result<EntryIter, SmartError> {
        let (bucket, key) = self.parse(path)?;
        if !key.is_empty() && !key.ends_with('/') {
            if let Some(meta) = self.client.head_object(bucket, key)? {
                return Ok(EntryIter::from_vec(vec![file_entry(bucket, &meta)]));
            }
        }
        if key.is_empty() {
            self.require_bucket(bucket)?;
        }
        let entries: Vec<FileEntry> = self
            .children(bucket, key)?
            .iter()
            .filter(|meta| !meta.key.ends_with('/'))
            .map(|meta| file_entry(bucket, meta))
            .collect();
        if entries.is_empty() {
            return Err(SmartError::NotFound { path: path.into() });
        }
        debug!(count = entries.len(), "objects scanned");
        Ok(EntryIter::from_vec(entries))
    }

    #[instrument(skip(self))]
    fn glob(&self, pattern: &str) -> Result<EntryIter, SmartError> {
        let (bucket, key_pattern) = self.parse(pattern)?;
        if bucket.contains(['*', '?', '[']) {
            return Err(SmartError::InvalidPattern {
                pattern: pattern.into(),
                reason: "wildcards in bucket names are not supported".into(),
            });
        }
        let matcher =
            glob::Pattern::new(key_pattern).map_err(|e| SmartError::InvalidPattern {
                pattern: pattern.into(),
                reason: e.msg.to_string(),
            })?;
        if !self.client.has_bucket(bucket)? {
            return Ok(EntryIter::from_vec(Vec::new()));
        }

        // List only below the deepest directory free of wildcards.
        let literal = key_pattern
            .find(['*', '?', '['])
            .map_or(key_pattern, |idx| &key_pattern[..idx]);
        let prefix = match literal.rfind('/') {
            Some(idx) => &literal[..=idx],
            None => "",
        };

        let mut candidates: BTreeMap<String, StatResult> = BTreeMap::new();
        for meta in self.client.list_objects(bucket, prefix)? {
            for (idx, _) in meta.key.match_indices('/') {
                if idx >= prefix.len() {
                    candidates
                        .entry(meta.key[..idx].to_string())
                        .or_insert_with(|| StatResult::dir(meta.last_modified));
                }
            }
            if !meta.key.ends_with('/') {
                candidates.insert(
                    meta.key.clone(),
                    StatResult::file(meta.size, meta.last_modified),
                );
            }
        }

        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        let bucket = bucket.to_string();
        let matches: Vec<FileEntry> = candidates
            .into_iter()
            .filter(|(key, _)| matcher.matches_with(key, options))
            .map(|(key, stat)| FileEntry {
                name: basename(&key).to_string(),
                path: url(&bucket, &key),
                stat,
            })
            .collect();
        debug!(count = matches.len(), "glob matched");
        Ok(EntryIter::from_vec(matches))
    }

    /// Directories are implicit; only checks that the bucket exists.
    fn makedirs(&self, path: &str, exist_ok: bool) -> Result<(), SmartError> {
        let (bucket, _) = self.parse(path)?;
        self.require_bucket(bucket)?;
        if !exist_ok && self.exists(path)? {
            return Err(SmartError::AlreadyExists {
                path: path.into(),
                operation: "makedirs",
            });
        }
        Ok(())
    }
}

/// Lazily fetches an object in ranged requests.
struct ObjectReader {
    client: Arc<dyn ObjectClient>,
    bucket: String,
    key: String,
    size: u64,
    pos: u64,
    block_size: usize,
    buf: Vec<u8>,
    buf_start: u64,
}

impl Read for ObjectReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.size || out.is_empty() {
            return Ok(0);
        }
        let buf_end = self.buf_start + self.buf.len() as u64;
        if self.pos < self.buf_start || self.pos >= buf_end {
            let end = (self.pos + self.block_size as u64).min(self.size);
            self.buf = self
                .client
                .get_object(&self.bucket, &self.key, Some(self.pos..end))
                .map_err(to_io)?;
            self.buf_start = self.pos;
            if self.buf.is_empty() {
                return Ok(0);
            }
        }
        let offset = (self.pos - self.buf_start) as usize;
        let available = &self.buf[offset..];
        let n = available.len().min(out.len());
        out[..n].copy_from_slice(&available[..n]);
        self.pos += n as u64;
        Ok(n)
    }
}

/// Buffers writes and uploads the whole object on flush.
///
/// Starts dirty so that flushing a writer nobody wrote to still creates an
/// empty object. Nothing is uploaded on drop: an abandoned writer leaves the
/// destination as it was before the last flush.
struct ObjectWriter {
    client: Arc<dyn ObjectClient>,
    bucket: String,
    key: String,
    buf: Vec<u8>,
    dirty: bool,
}

impl ObjectWriter {
    fn upload(&mut self) -> Result<(), SmartError> {
        if self.dirty {
            self.client
                .put_object(&self.bucket, &self.key, self.buf.clone())?;
            self.dirty = false;
            debug!(bucket = %self.bucket, key = %self.key, bytes = self.buf.len(), "object uploaded");
        }
        Ok(())
    }
}

impl Write for ObjectWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        self.dirty = true;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.upload().map_err(to_io)
    }
}
