//! Scheme-based routing from a path string to its backend.

use tracing::trace;

use crate::scheme::{split_scheme, BackendKind, LOCAL_SCHEME};
use crate::{Backend, LocalBackend, ObjectStoreBackend, SmartError, StdioBackend, STDIO_PATH};

/// A path bound to the backend that owns it.
///
/// Created per call and never cached. `path()` is the form the backend
/// expects; `original()` is what the caller passed in.
#[derive(Clone, Copy)]
pub struct BackendHandle<'a> {
    kind: BackendKind,
    backend: &'a dyn Backend,
    path: &'a str,
    original: &'a str,
}

impl<'a> BackendHandle<'a> {
    /// Which backend this path routes to.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Scheme token of the backend.
    pub fn scheme(&self) -> &'static str {
        self.kind.scheme()
    }

    /// The backend driver.
    pub fn backend(&self) -> &'a dyn Backend {
        self.backend
    }

    /// Normalized path handed to the backend.
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// The path exactly as given.
    pub fn original(&self) -> &'a str {
        self.original
    }

    /// Both handles route to the same backend kind.
    pub fn same_backend(&self, other: &BackendHandle<'_>) -> bool {
        self.kind == other.kind
    }
}

impl std::fmt::Debug for BackendHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("kind", &self.kind)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Owns one driver per backend kind and maps paths onto them.
///
/// The object store is only routable when a client was configured; until
/// then `s3://` paths fail with [`SmartError::UnsupportedScheme`].
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    local: LocalBackend,
    object_store: Option<ObjectStoreBackend>,
    stdio: StdioBackend,
}

impl Resolver {
    /// Resolver over the given drivers.
    pub fn new(local: LocalBackend, object_store: Option<ObjectStoreBackend>) -> Self {
        Self {
            local,
            object_store,
            stdio: StdioBackend,
        }
    }

    /// The local filesystem driver.
    pub fn local(&self) -> &LocalBackend {
        &self.local
    }

    /// The object store driver, if one is configured.
    pub fn object_store(&self) -> Option<&ObjectStoreBackend> {
        self.object_store.as_ref()
    }

    /// Route a path. Pure: no I/O happens here.
    ///
    /// # Errors
    ///
    /// - [`SmartError::UnsupportedScheme`] for schemes without a driver
    /// - [`SmartError::InvalidPath`] for `stdio://` paths other than `-`
    pub fn resolve<'a>(&'a self, path: &'a str) -> Result<BackendHandle<'a>, SmartError> {
        let (scheme, rest) = split_scheme(path);
        let unsupported = || SmartError::UnsupportedScheme {
            scheme: scheme.unwrap_or(LOCAL_SCHEME).to_string(),
            path: path.to_string(),
        };
        let kind = BackendKind::from_scheme(scheme).ok_or_else(unsupported)?;

        let (backend, normalized): (&'a dyn Backend, &'a str) = match kind {
            BackendKind::Local => (&self.local, if scheme.is_some() { rest } else { path }),
            BackendKind::ObjectStore => match &self.object_store {
                Some(store) => (store, path),
                None => return Err(unsupported()),
            },
            BackendKind::Stdio => {
                if rest != STDIO_PATH {
                    return Err(SmartError::InvalidPath {
                        path: path.to_string(),
                        reason: "the only stdio path is '-'",
                    });
                }
                (&self.stdio, rest)
            }
        };
        trace!(path, scheme = kind.scheme(), "path resolved");
        Ok(BackendHandle {
            kind,
            backend,
            path: normalized,
            original: path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryObjectClient;
    use std::sync::Arc;

    fn with_store() -> Resolver {
        let client = Arc::new(MemoryObjectClient::new());
        Resolver::new(LocalBackend::default(), Some(ObjectStoreBackend::new(client)))
    }

    #[test]
    fn bare_and_file_paths_are_local() {
        let resolver = Resolver::default();
        let bare = resolver.resolve("/tmp/a").unwrap();
        assert_eq!(bare.kind(), BackendKind::Local);
        assert_eq!(bare.path(), "/tmp/a");

        let file = resolver.resolve("file:///tmp/a").unwrap();
        assert_eq!(file.kind(), BackendKind::Local);
        assert_eq!(file.path(), "/tmp/a");
        assert_eq!(file.original(), "file:///tmp/a");
        assert!(bare.same_backend(&file));
    }

    #[test]
    fn s3_needs_a_client() {
        match Resolver::default().resolve("s3://bucket/key") {
            Err(SmartError::UnsupportedScheme { scheme, .. }) => assert_eq!(scheme, "s3"),
            other => panic!("unexpected {other:?}"),
        }
        let resolver = with_store();
        let handle = resolver.resolve("s3://bucket/key").unwrap();
        assert_eq!(handle.kind(), BackendKind::ObjectStore);
        assert_eq!(handle.path(), "s3://bucket/key");
    }

    #[test]
    fn stdio_accepts_only_dash() {
        let resolver = Resolver::default();
        assert_eq!(resolver.resolve("stdio://-").unwrap().path(), "-");
        assert!(matches!(
            resolver.resolve("stdio://x"),
            Err(SmartError::InvalidPath { .. })
        ));
    }

    #[test]
    fn unknown_schemes_are_rejected() {
        match with_store().resolve("gs://bucket/key") {
            Err(SmartError::UnsupportedScheme { scheme, path }) => {
                assert_eq!(scheme, "gs");
                assert_eq!(path, "gs://bucket/key");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
