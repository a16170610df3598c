//! Path arithmetic that works across schemes.
//!
//! Local paths are normalized lexically, the way a shell would print them.
//! Remote paths are plain strings whose internal structure belongs to the
//! backend, so they are only ever concatenated, never normalized.

use std::path::{Path, PathBuf};

use crate::SmartError;
use crate::scheme::{is_remote, split_scheme};

/// Join path fragments.
///
/// For local paths the result is lexically normalized: `.` segments and
/// repeated slashes disappear, `..` is resolved, a trailing slash is dropped
/// and an absolute fragment restarts the path.
///
/// For scheme paths each fragment loses its leading slashes and is joined
/// with exactly one `/`; slashes inside a fragment and a trailing slash on
/// the last fragment are kept.
///
/// ```rust
/// use smartfs::path_join;
///
/// assert_eq!(path_join("path", &["to//file"]), "path/to/file");
/// assert_eq!(path_join("path", &["to", "/file"]), "/file");
/// assert_eq!(path_join("s3://", &["bucket", "/key"]), "s3://bucket/key");
/// assert_eq!(path_join("s3://", &["bucket//key"]), "s3://bucket//key");
/// ```
pub fn path_join(first: &str, rest: &[&str]) -> String {
    if split_scheme(first).0.is_some() {
        let mut joined = first.to_string();
        for part in rest {
            let part = part.trim_start_matches('/');
            if !joined.ends_with('/') {
                joined.push('/');
            }
            joined.push_str(part);
        }
        return joined;
    }

    let mut joined = first.to_string();
    for part in rest {
        if part.starts_with('/') {
            joined = part.to_string();
        } else if joined.is_empty() || joined.ends_with('/') {
            joined.push_str(part);
        } else {
            joined.push('/');
            joined.push_str(part);
        }
    }
    normalize(&joined)
}

/// Lexically normalize a local path.
pub fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let body = parts.join("/");
    match (absolute, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_string(),
        (false, false) => body,
    }
}

/// Whether a path is absolute. Scheme paths always are.
pub fn is_absolute(path: &str) -> bool {
    is_remote(path) || Path::new(local_part(path)).is_absolute()
}

/// Absolute, normalized form of a local path; scheme paths are unchanged.
pub fn abspath(path: &str) -> Result<String, SmartError> {
    if is_remote(path) {
        return Ok(path.to_string());
    }
    let local = local_part(path);
    let absolute =
        std::path::absolute(local).map_err(|e| SmartError::from_io("abspath", local, e))?;
    Ok(normalize(&path_to_string(absolute)))
}

/// Absolute path with symlinks resolved; falls back to [`abspath`] when the
/// path does not exist. Scheme paths are unchanged.
pub fn realpath(path: &str) -> Result<String, SmartError> {
    if is_remote(path) {
        return Ok(path.to_string());
    }
    match std::fs::canonicalize(local_part(path)) {
        Ok(resolved) => Ok(path_to_string(resolved)),
        Err(_) => abspath(path),
    }
}

/// Path of `path` relative to `start` (the working directory by default).
///
/// Computed lexically on absolute forms. Scheme paths are unchanged.
pub fn relpath(path: &str, start: Option<&str>) -> Result<String, SmartError> {
    if is_remote(path) {
        return Ok(path.to_string());
    }
    let target = abspath(path)?;
    let base = abspath(start.unwrap_or("."))?;

    let target: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    let base: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    let common = target
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts = vec![".."; base.len() - common];
    parts.extend(&target[common..]);
    if parts.is_empty() {
        Ok(".".to_string())
    } else {
        Ok(parts.join("/"))
    }
}

/// Parent of a path in its own scheme, or `None` at a root.
///
/// ```rust
/// use smartfs::parent;
///
/// assert_eq!(parent("s3://bucket/a/b").as_deref(), Some("s3://bucket/a"));
/// assert_eq!(parent("/tmp/x").as_deref(), Some("/tmp"));
/// assert_eq!(parent("/"), None);
/// ```
pub fn parent(path: &str) -> Option<String> {
    let (scheme, rest) = split_scheme(path);
    let trimmed = rest.trim_end_matches('/');
    let idx = trimmed.rfind('/')?;
    let head = if idx == 0 { "/" } else { &trimmed[..idx] };
    Some(match scheme {
        Some(scheme) => format!("{scheme}://{head}"),
        None => head.to_string(),
    })
}

/// Final component of a path, ignoring a trailing slash.
pub fn basename(path: &str) -> &str {
    let (_, rest) = split_scheme(path);
    let trimmed = rest.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Strip an explicit `file://` prefix.
fn local_part(path: &str) -> &str {
    match split_scheme(path) {
        (Some(_), rest) => rest,
        (None, _) => path,
    }
}

pub(crate) fn path_to_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}
