//! Error types for the smart path layer.

use std::io;

/// Error type shared by every backend and by the smart layer itself.
///
/// Every variant carries the path, key or mode string that caused it, so the
/// caller can report a failure without re-deriving context. Uses
/// `#[non_exhaustive]` for forward compatibility.
///
/// # Examples
///
/// ```rust
/// use smartfs::SmartError;
///
/// let err = SmartError::NotFound { path: "s3://bucket/missing".into() };
/// assert_eq!(err.to_string(), "not found: s3://bucket/missing");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SmartError {
    // Dispatch Errors
    /// The path's scheme matches no registered backend.
    #[error("unsupported scheme {scheme:?}: {path}")]
    UnsupportedScheme {
        /// The scheme token found before `://`.
        scheme: String,
        /// The full path that was resolved.
        path: String,
    },

    /// Malformed brace-expansion or glob pattern.
    #[error("invalid pattern: {pattern} ({reason})")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A copy function was registered twice for the same scheme pair.
    #[error("copy function has already existed: {src_scheme}->{dst_scheme}")]
    DuplicateRegistration {
        /// Source scheme of the colliding key.
        src_scheme: String,
        /// Destination scheme of the colliding key.
        dst_scheme: String,
    },

    /// The path is syntactically valid for its scheme but cannot be addressed.
    #[error("invalid path: {path} ({reason})")]
    InvalidPath {
        /// The offending path.
        path: String,
        /// Why the backend rejects it.
        reason: &'static str,
    },

    // Path/File Errors
    /// Path (or an intermediate directory) does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: String,
    },

    /// Expected a file but found a directory.
    #[error("is a directory: {path}")]
    IsADirectory {
        /// The directory path.
        path: String,
    },

    /// Expected a directory but found something else.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: String,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: String,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Open mode is malformed or cannot be satisfied by the backend.
    #[error("invalid mode {mode:?}: {reason}")]
    InvalidMode {
        /// The mode string as given by the caller.
        mode: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A byte range whose start lies after its end.
    #[error("invalid range for {path}: start {start} is greater than stop {stop}")]
    RangeError {
        /// The path being read.
        path: String,
        /// Normalized start offset.
        start: u64,
        /// Normalized stop offset.
        stop: u64,
    },

    // Permission/Capability Errors
    /// Permission denied for operation.
    #[error("{operation}: permission denied: {path}")]
    PermissionDenied {
        /// The path where permission was denied.
        path: String,
        /// The operation that was denied.
        operation: &'static str,
    },

    /// Operation is not supported by the backend that owns the path.
    #[error("operation not supported: {operation} on {path}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
        /// The path it was attempted on.
        path: String,
    },

    // Data Errors
    /// Invalid data encountered.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The path with invalid data.
        path: String,
        /// Details about the invalid data.
        details: String,
    },

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {key}={value:?}")]
    InvalidConfig {
        /// Configuration key.
        key: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    // Backend/Operation Errors
    /// Generic backend error.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl SmartError {
    /// Convert an `io::Error` into the most specific variant, keeping the path.
    pub fn from_io(operation: &'static str, path: impl Into<String>, error: io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            io::ErrorKind::NotFound => SmartError::NotFound { path },
            io::ErrorKind::PermissionDenied => SmartError::PermissionDenied { path, operation },
            io::ErrorKind::AlreadyExists => SmartError::AlreadyExists { path, operation },
            io::ErrorKind::IsADirectory => SmartError::IsADirectory { path },
            io::ErrorKind::NotADirectory => SmartError::NotADirectory { path },
            _ => SmartError::Io {
                operation,
                path,
                source: error,
            },
        }
    }

    /// Returns `true` for [`SmartError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, SmartError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = SmartError::NotFound {
            path: "/missing".into(),
        };
        assert_eq!(err.to_string(), "not found: /missing");
    }

    #[test]
    fn duplicate_registration_names_the_key() {
        let err = SmartError::DuplicateRegistration {
            src_scheme: "a".into(),
            dst_scheme: "b".into(),
        };
        assert_eq!(err.to_string(), "copy function has already existed: a->b");
    }

    #[test]
    fn invalid_mode_contains_mode() {
        let err = SmartError::InvalidMode {
            mode: "wb+".into(),
            reason: "read+write is not supported on s3://bucket/key".into(),
        };
        assert!(err.to_string().contains("wb+"));
    }

    #[test]
    fn unsupported_scheme_display() {
        let err = SmartError::UnsupportedScheme {
            scheme: "gs".into(),
            path: "gs://bucket/key".into(),
        };
        assert_eq!(err.to_string(), "unsupported scheme \"gs\": gs://bucket/key");
    }

    #[test]
    fn from_io_not_found_keeps_path() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "test");
        let err = SmartError::from_io("open", "/a/b", io_err);
        match err {
            SmartError::NotFound { path } => assert_eq!(path, "/a/b"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn from_io_permission_denied() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "test");
        let err = SmartError::from_io("open", "/secret", io_err);
        assert!(matches!(
            err,
            SmartError::PermissionDenied {
                operation: "open",
                ..
            }
        ));
    }

    #[test]
    fn from_io_already_exists() {
        let io_err = io::Error::new(io::ErrorKind::AlreadyExists, "test");
        let err = SmartError::from_io("create", "/exists", io_err);
        assert!(matches!(err, SmartError::AlreadyExists { .. }));
    }

    #[test]
    fn from_io_other() {
        let io_err = io::Error::other("test");
        let err = SmartError::from_io("read", "/file", io_err);
        assert!(matches!(err, SmartError::Io { .. }));
        assert!(!err.is_not_found());
    }
}
