//! Standard stream pseudo backend (`stdio://-`).

use std::io::{self, Read, Write};
use std::time::SystemTime;

use crate::{
    Access, BackendDir, BackendRead, BackendWrite, EntryIter, OpenMode, SmartError, StatResult,
};

/// The only path this backend accepts.
pub const STDIO_PATH: &str = "-";

/// Reads from stdin and writes to stdout. Everything else is unsupported.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioBackend;

fn unsupported(operation: &'static str, path: &str) -> SmartError {
    SmartError::NotSupported {
        operation,
        path: path.into(),
    }
}

fn check(path: &str) -> Result<(), SmartError> {
    if path == STDIO_PATH {
        Ok(())
    } else {
        Err(SmartError::InvalidPath {
            path: path.into(),
            reason: "the only stdio path is '-'",
        })
    }
}

impl BackendRead for StdioBackend {
    fn stat(&self, path: &str) -> Result<StatResult, SmartError> {
        check(path)?;
        Ok(StatResult::file(0, SystemTime::now()))
    }

    fn exists(&self, path: &str) -> Result<bool, SmartError> {
        Ok(path == STDIO_PATH)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, SmartError> {
        check(path)?;
        Ok(Box::new(io::stdin()))
    }

    fn read_range(&self, path: &str, _offset: u64, _len: usize) -> Result<Vec<u8>, SmartError> {
        Err(unsupported("read_range", path))
    }

    fn access(&self, path: &str, _mode: Access) -> Result<bool, SmartError> {
        Ok(path == STDIO_PATH)
    }
}

impl BackendWrite for StdioBackend {
    fn open_write(&self, path: &str, mode: &OpenMode) -> Result<Box<dyn Write + Send>, SmartError> {
        check(path)?;
        if mode.read {
            return Err(SmartError::InvalidMode {
                mode: mode.as_str().to_string(),
                reason: "stdout cannot be read".into(),
            });
        }
        Ok(Box::new(io::stdout()))
    }

    fn copy(&self, src: &str, _dst: &str, _callback: Option<&dyn Fn(u64)>) -> Result<(), SmartError> {
        Err(unsupported("copy", src))
    }

    fn remove(&self, path: &str, _missing_ok: bool) -> Result<(), SmartError> {
        Err(unsupported("remove", path))
    }

    fn unlink(&self, path: &str, _missing_ok: bool) -> Result<(), SmartError> {
        Err(unsupported("unlink", path))
    }

    fn rename(&self, src: &str, _dst: &str) -> Result<(), SmartError> {
        Err(unsupported("rename", src))
    }
}

impl BackendDir for StdioBackend {
    fn list(&self, path: &str) -> Result<EntryIter, SmartError> {
        Err(unsupported("list", path))
    }

    fn scan(&self, path: &str) -> Result<EntryIter, SmartError> {
        Err(unsupported("scan", path))
    }

    fn glob(&self, pattern: &str) -> Result<EntryIter, SmartError> {
        Err(unsupported("glob", pattern))
    }

    fn makedirs(&self, path: &str, _exist_ok: bool) -> Result<(), SmartError> {
        Err(unsupported("makedirs", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_dash_is_valid() {
        let backend = StdioBackend;
        assert!(backend.exists("-").unwrap());
        assert!(!backend.exists("x").unwrap());
        assert!(matches!(
            backend.open_read("x").err().unwrap(),
            SmartError::InvalidPath { .. }
        ));
    }

    #[test]
    fn duplex_mode_is_rejected_with_mode_in_message() {
        let err = StdioBackend
            .open_update("-", &OpenMode::parse("r+").unwrap())
            .err()
            .unwrap();
        assert!(err.to_string().contains("r+"));
    }

    #[test]
    fn tree_operations_are_unsupported() {
        let backend = StdioBackend;
        assert!(matches!(
            backend.scan("-").err().unwrap(),
            SmartError::NotSupported { operation: "scan", .. }
        ));
        assert!(matches!(
            backend.remove("-", true),
            Err(SmartError::NotSupported { .. })
        ));
    }
}
