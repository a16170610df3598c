//! Scheme detection and the closed set of backend kinds.

use std::fmt;

/// Scheme of the local filesystem (also the implied scheme of bare paths).
pub const LOCAL_SCHEME: &str = "file";
/// Scheme of the S3-compatible object store.
pub const S3_SCHEME: &str = "s3";
/// Scheme of the standard-stream pseudo backend.
pub const STDIO_SCHEME: &str = "stdio";

/// Split a path into its scheme token and the remainder after `://`.
///
/// A scheme is present only when the path starts with
/// `<alpha>[alnum + - .]*://`; anything else is a bare local path.
///
/// ```rust
/// use smartfs::split_scheme;
///
/// assert_eq!(split_scheme("s3://bucket/key"), (Some("s3"), "bucket/key"));
/// assert_eq!(split_scheme("/tmp/a"), (None, "/tmp/a"));
/// assert_eq!(split_scheme("./weird://name"), (None, "./weird://name"));
/// ```
pub fn split_scheme(path: &str) -> (Option<&str>, &str) {
    let Some(idx) = path.find("://") else {
        return (None, path);
    };
    let scheme = &path[..idx];
    let mut chars = scheme.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    };
    if valid {
        (Some(scheme), &path[idx + 3..])
    } else {
        (None, path)
    }
}

/// The scheme of a path, with bare paths reported as [`LOCAL_SCHEME`].
pub fn scheme_of(path: &str) -> &str {
    split_scheme(path).0.unwrap_or(LOCAL_SCHEME)
}

/// Whether the path addresses something other than the local filesystem.
pub fn is_remote(path: &str) -> bool {
    scheme_of(path) != LOCAL_SCHEME
}

/// The backends the smart layer knows how to route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Local filesystem (bare paths and `file://`).
    Local,
    /// S3-compatible object store (`s3://`).
    ObjectStore,
    /// Standard input/output (`stdio://-`).
    Stdio,
}

impl BackendKind {
    /// Scheme token for this kind.
    pub fn scheme(self) -> &'static str {
        match self {
            BackendKind::Local => LOCAL_SCHEME,
            BackendKind::ObjectStore => S3_SCHEME,
            BackendKind::Stdio => STDIO_SCHEME,
        }
    }

    /// Map a scheme token to a kind; `None` means a bare local path.
    pub fn from_scheme(scheme: Option<&str>) -> Option<Self> {
        match scheme {
            None | Some(LOCAL_SCHEME) => Some(BackendKind::Local),
            Some(S3_SCHEME) => Some(BackendKind::ObjectStore),
            Some(STDIO_SCHEME) => Some(BackendKind::Stdio),
            Some(_) => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_scheme_detects_valid_tokens() {
        assert_eq!(split_scheme("s3://b/k"), (Some("s3"), "b/k"));
        assert_eq!(split_scheme("stdio://-"), (Some("stdio"), "-"));
        assert_eq!(split_scheme("file:///tmp"), (Some("file"), "/tmp"));
        assert_eq!(split_scheme("s3+http://x"), (Some("s3+http"), "x"));
        assert_eq!(split_scheme("s3://"), (Some("s3"), ""));
    }

    #[test]
    fn split_scheme_rejects_non_schemes() {
        assert_eq!(split_scheme("relative/path"), (None, "relative/path"));
        assert_eq!(split_scheme("://nothing"), (None, "://nothing"));
        assert_eq!(split_scheme("1ab://x"), (None, "1ab://x"));
        assert_eq!(split_scheme("/abs/a://b"), (None, "/abs/a://b"));
    }

    #[test]
    fn scheme_of_defaults_to_local() {
        assert_eq!(scheme_of("/tmp/x"), "file");
        assert_eq!(scheme_of("s3://b"), "s3");
        assert!(is_remote("s3://b/k"));
        assert!(!is_remote("file:///tmp"));
        assert!(!is_remote("data.txt"));
    }

    #[test]
    fn backend_kind_round_trips_scheme() {
        for kind in [BackendKind::Local, BackendKind::ObjectStore, BackendKind::Stdio] {
            assert_eq!(BackendKind::from_scheme(Some(kind.scheme())), Some(kind));
        }
        assert_eq!(BackendKind::from_scheme(None), Some(BackendKind::Local));
        assert_eq!(BackendKind::from_scheme(Some("gs")), None);
        assert_eq!(BackendKind::ObjectStore.to_string(), "s3");
    }
}
