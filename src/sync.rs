//! Copying, syncing and moving across backends.

use tracing::{debug, instrument, warn};

use crate::copy_registry::stream_copy;
use crate::path::parent;
use crate::{BackendExt, BackendHandle, BackendKind, CopyRequest, SmartError, SmartFs};

impl SmartFs {
    /// Copy one file, possibly between backends.
    ///
    /// The strategy is picked by `(source scheme, destination scheme)` from
    /// the copy registry, falling back to a streamed copy. If the copy fails
    /// because the destination's parent is missing, the parent is created and
    /// the copy retried once. `callback` receives cumulative bytes.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotFound`] if the source is missing
    /// - [`SmartError::NotSupported`] when copying a symlink to another backend
    #[instrument(skip(self, callback))]
    pub fn copy(
        &self,
        src: &str,
        dst: &str,
        callback: Option<&dyn Fn(u64)>,
    ) -> Result<(), SmartError> {
        let src_h = self.resolve(src)?;
        let dst_h = self.resolve(dst)?;
        match self.copy_once(src_h, dst_h, callback) {
            Err(SmartError::NotFound { path })
                if path == dst_h.path() || path == dst_h.original() =>
            {
                let Some(dir) = parent(dst_h.original()) else {
                    return Err(SmartError::NotFound { path });
                };
                debug!(dir = %dir, "creating missing destination parent");
                self.makedirs(&dir, true)?;
                self.copy_once(src_h, dst_h, callback)
            }
            result => result,
        }
    }

    fn copy_once(
        &self,
        src: BackendHandle<'_>,
        dst: BackendHandle<'_>,
        callback: Option<&dyn Fn(u64)>,
    ) -> Result<(), SmartError> {
        if !src.same_backend(&dst)
            && src.kind() == BackendKind::Local
            && src.backend().is_symlink(src.path())?
        {
            return Err(SmartError::NotSupported {
                operation: "copy symlink across backends",
                path: src.original().to_string(),
            });
        }
        let req = CopyRequest {
            src,
            dst,
            callback,
            block_size: self.config.block_size,
        };
        match self.copy_funcs.lookup(src.scheme(), dst.scheme()) {
            Some(func) => func(&req),
            None => {
                debug!(
                    src = src.scheme(),
                    dst = dst.scheme(),
                    "no registered copy function, streaming"
                );
                stream_copy(&req)
            }
        }
    }

    /// Copy a file, or every file under a directory, to `dst`.
    ///
    /// A file source is copied to `dst` itself. For a directory, each file's
    /// path relative to `src` is appended to `dst`. Existing files are
    /// overwritten; nothing at the destination is deleted. `callback`
    /// receives cumulative bytes per file.
    ///
    /// # Errors
    ///
    /// - [`SmartError::NotFound`] if `src` does not exist
    #[instrument(skip(self, callback))]
    pub fn sync(
        &self,
        src: &str,
        dst: &str,
        callback: Option<&dyn Fn(u64)>,
    ) -> Result<(), SmartError> {
        if self.is_file(src)? {
            return self.copy(src, dst, callback);
        }

        let src_h = self.resolve(src)?;
        let root = src_h.path().trim_end_matches('/');
        let base = dst.trim_end_matches('/');
        let mut copied = 0usize;
        for entry in self.scan_stat(src)? {
            let entry = entry?;
            let rel = match entry.path.strip_prefix(root) {
                Some(rel) => rel.trim_start_matches('/'),
                None => {
                    warn!(path = %entry.path, root, "scanned entry outside sync root");
                    entry.name.as_str()
                }
            };
            let target = if rel.is_empty() {
                dst.to_string()
            } else {
                format!("{base}/{rel}")
            };
            self.copy(&entry.path, &target, callback)?;
            copied += 1;
        }
        debug!(files = copied, "sync finished");
        Ok(())
    }

    /// Move a file or directory tree.
    ///
    /// Within one backend this is a rename; across backends the tree is
    /// synced and the source removed afterwards.
    #[instrument(skip(self))]
    pub fn move_path(&self, src: &str, dst: &str) -> Result<(), SmartError> {
        let src_h = self.resolve(src)?;
        let dst_h = self.resolve(dst)?;
        if src_h.same_backend(&dst_h) {
            return src_h.backend().rename(src_h.path(), dst_h.path());
        }
        self.sync(src, dst, None)?;
        self.remove(src, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CopyRegistry, MemoryObjectClient};
    use std::cell::RefCell;
    use std::fs;
    use std::sync::Arc;

    fn fs_with_store() -> SmartFs {
        let client = Arc::new(MemoryObjectClient::new().with_bucket("bucket"));
        SmartFs::builder().object_client(client).build()
    }

    fn local(dir: &tempfile::TempDir, rel: &str) -> String {
        dir.path().join(rel).to_str().unwrap().to_string()
    }

    #[test]
    fn copy_creates_missing_local_parent() {
        let dir = tempfile::tempdir().unwrap();
        let src = local(&dir, "src.txt");
        let dst = local(&dir, "a/b/dst.txt");
        fs::write(&src, b"data").unwrap();

        let fs = SmartFs::new();
        fs.copy(&src, &dst, None).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"data");
    }

    #[test]
    fn copy_missing_source_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let fs = SmartFs::new();
        let err = fs
            .copy(&local(&dir, "missing"), &local(&dir, "sub/dst"), None)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("sub").exists());
    }

    #[test]
    fn copy_between_local_and_object_store() {
        let dir = tempfile::tempdir().unwrap();
        let src = local(&dir, "up.bin");
        fs::write(&src, vec![1u8; 100]).unwrap();
        let fs = fs_with_store();

        let seen = RefCell::new(Vec::new());
        let cb = |n: u64| seen.borrow_mut().push(n);
        fs.copy(&src, "s3://bucket/up.bin", Some(&cb)).unwrap();
        assert_eq!(seen.borrow().last(), Some(&100));

        let back = local(&dir, "down/up.bin");
        fs.copy("s3://bucket/up.bin", &back, None).unwrap();
        assert_eq!(fs::read(&back).unwrap(), vec![1u8; 100]);

        fs.copy("s3://bucket/up.bin", "s3://bucket/copy.bin", None)
            .unwrap();
        assert_eq!(fs.getsize("s3://bucket/copy.bin").unwrap(), 100);
    }

    #[test]
    fn unregistered_pair_streams() {
        let dir = tempfile::tempdir().unwrap();
        let src = local(&dir, "s");
        let dst = local(&dir, "d");
        fs::write(&src, b"streamed").unwrap();
        let fs = SmartFs::builder().copy_funcs(CopyRegistry::new()).build();
        fs.copy(&src, &dst, None).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"streamed");
    }

    #[cfg(unix)]
    #[test]
    fn symlink_cannot_leave_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let target = local(&dir, "target");
        let link = local(&dir, "link");
        fs::write(&target, b"t").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();
        let fs = fs_with_store();
        assert!(matches!(
            fs.copy(&link, "s3://bucket/link", None),
            Err(SmartError::NotSupported { .. })
        ));
    }

    #[test]
    fn sync_directory_to_object_store() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("tree/sub")).unwrap();
        fs::write(dir.path().join("tree/a"), b"a").unwrap();
        fs::write(dir.path().join("tree/sub/b"), b"bb").unwrap();
        let fs = fs_with_store();

        fs.sync(&local(&dir, "tree"), "s3://bucket/out/", None).unwrap();
        let mut synced: Vec<String> = fs.scan("s3://bucket/out").unwrap().collect::<Result<_, _>>().unwrap();
        synced.sort();
        assert_eq!(synced, vec!["s3://bucket/out/a", "s3://bucket/out/sub/b"]);
        assert_eq!(fs.load_content("s3://bucket/out/sub/b", None, None).unwrap(), b"bb");
    }

    #[test]
    fn sync_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fs = SmartFs::new();
        assert!(fs
            .sync(&local(&dir, "nope"), &local(&dir, "out"), None)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn move_across_backends_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("m")).unwrap();
        fs::write(dir.path().join("m/f"), b"f").unwrap();
        let fs = fs_with_store();

        fs.move_path(&local(&dir, "m"), "s3://bucket/m").unwrap();
        assert!(!dir.path().join("m").exists());
        assert!(fs.is_file("s3://bucket/m/f").unwrap());

        fs.move_path("s3://bucket/m", "s3://bucket/n").unwrap();
        assert!(!fs.exists("s3://bucket/m/f").unwrap());
        assert!(fs.is_file("s3://bucket/n/f").unwrap());
    }
}
