//! Core types shared by backends and the smart layer.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::time::SystemTime;

use crate::SmartError;

/// Snapshot of a path's metadata at the moment of the call.
///
/// Never cached across calls; staleness is the caller's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatResult {
    /// Size in bytes (0 for directories and prefixes).
    pub size: u64,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub mtime: SystemTime,
    /// The path is a directory (or an object-store prefix).
    pub is_dir: bool,
    /// The path itself is a symbolic link.
    pub is_symlink: bool,
}

impl StatResult {
    /// Stat of a regular file.
    pub fn file(size: u64, mtime: SystemTime) -> Self {
        Self {
            size,
            mtime,
            is_dir: false,
            is_symlink: false,
        }
    }

    /// Stat of a directory.
    pub fn dir(mtime: SystemTime) -> Self {
        Self {
            size: 0,
            mtime,
            is_dir: true,
            is_symlink: false,
        }
    }

    /// Returns `true` if this is not a directory.
    #[inline]
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }
}

impl Default for StatResult {
    fn default() -> Self {
        Self::file(0, SystemTime::UNIX_EPOCH)
    }
}

/// A single entry produced by listing, scanning or globbing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileEntry {
    /// Final path component.
    pub name: String,
    /// Full path, in the same scheme as the listed root.
    pub path: String,
    /// Metadata captured while listing.
    pub stat: StatResult,
}

/// One level of a top-down directory walk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkEntry {
    /// Directory being reported.
    pub root: String,
    /// Names of its subdirectories, sorted.
    pub dirs: Vec<String>,
    /// Names of its files, sorted.
    pub files: Vec<String>,
}

/// Access kind for [`access`](crate::SmartFs::access) checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Access {
    /// The path can be read.
    Read,
    /// The path can be written.
    Write,
}

/// Decoded open mode.
///
/// Mode strings are parsed once at the API boundary; everything past that
/// point branches on these facets.
///
/// Grammar: exactly one of `r`, `w`, `a`, `x`, optionally one of `b`/`t`,
/// optionally `+`, in any order, no repeats. Without `b` the mode is text.
///
/// ```rust
/// use smartfs::OpenMode;
///
/// let mode: OpenMode = "rb+".parse().unwrap();
/// assert!(mode.read && mode.plus && mode.binary);
/// assert_eq!(mode.to_string(), "rb+");
/// assert!("rw".parse::<OpenMode>().is_err());
///
/// let spelled: OpenMode = "+br".parse().unwrap();
/// assert_eq!(spelled, mode);
/// assert_eq!(spelled.as_str(), "+br");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct OpenMode {
    /// `r`: open an existing file for reading.
    pub read: bool,
    /// `w`: create or truncate for writing.
    pub write: bool,
    /// `a`: create or append.
    pub append: bool,
    /// `x`: create, failing if the target exists.
    pub exclusive: bool,
    /// `b`: binary; otherwise text.
    pub binary: bool,
    /// `+`: read and write.
    pub plus: bool,
    spelling: Spelling,
}

/// A valid mode string is at most three ASCII characters.
#[derive(Clone, Copy)]
struct Spelling {
    buf: [u8; 3],
    len: u8,
}

impl Spelling {
    const fn new(mode: &str) -> Self {
        let bytes = mode.as_bytes();
        let mut buf = [0u8; 3];
        let mut len = 0;
        while len < bytes.len() && len < buf.len() {
            buf[len] = bytes[len];
            len += 1;
        }
        Self { buf, len: len as u8 }
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.len as usize]).unwrap_or_default()
    }
}

impl fmt::Debug for Spelling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_str(), f)
    }
}

impl PartialEq for OpenMode {
    fn eq(&self, other: &Self) -> bool {
        self.facets() == other.facets()
    }
}

impl Eq for OpenMode {}

impl Hash for OpenMode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.facets().hash(state);
    }
}

impl OpenMode {
    /// `rb`.
    pub const READ_BINARY: Self = Self {
        read: true,
        write: false,
        append: false,
        exclusive: false,
        binary: true,
        plus: false,
        spelling: Spelling::new("rb"),
    };

    /// `wb`.
    pub const WRITE_BINARY: Self = Self {
        read: false,
        write: true,
        append: false,
        exclusive: false,
        binary: true,
        plus: false,
        spelling: Spelling::new("wb"),
    };

    /// `xb`.
    pub const CREATE_BINARY: Self = Self {
        read: false,
        write: false,
        append: false,
        exclusive: true,
        binary: true,
        plus: false,
        spelling: Spelling::new("xb"),
    };

    /// Parse a mode string such as `"r"`, `"wb"` or `"a+"`.
    pub fn parse(mode: &str) -> Result<Self, SmartError> {
        let invalid = |reason: &str| SmartError::InvalidMode {
            mode: mode.to_string(),
            reason: reason.to_string(),
        };

        let mut parsed = Self {
            read: false,
            write: false,
            append: false,
            exclusive: false,
            binary: false,
            plus: false,
            spelling: Spelling::new(mode),
        };
        let mut primaries = 0;
        let mut text = false;

        for c in mode.chars() {
            let slot = match c {
                'r' => &mut parsed.read,
                'w' => &mut parsed.write,
                'a' => &mut parsed.append,
                'x' => &mut parsed.exclusive,
                'b' => &mut parsed.binary,
                't' => &mut text,
                '+' => &mut parsed.plus,
                _ => return Err(invalid("unknown mode character")),
            };
            if *slot {
                return Err(invalid("repeated mode character"));
            }
            *slot = true;
            if matches!(c, 'r' | 'w' | 'a' | 'x') {
                primaries += 1;
            }
        }

        if primaries != 1 {
            return Err(invalid("must have exactly one of read/write/append/create mode"));
        }
        if parsed.binary && text {
            return Err(invalid("can't have text and binary mode at once"));
        }
        Ok(parsed)
    }

    /// The mode string exactly as the caller wrote it.
    ///
    /// Error messages quote this; [`Display`](fmt::Display) renders the
    /// canonical form instead.
    pub fn as_str(&self) -> &str {
        self.spelling.as_str()
    }

    fn facets(&self) -> [bool; 6] {
        [
            self.read,
            self.write,
            self.append,
            self.exclusive,
            self.binary,
            self.plus,
        ]
    }

    /// Returns `true` unless the mode is binary.
    #[inline]
    pub fn is_text(&self) -> bool {
        !self.binary
    }

    /// The mode reads existing content (`r`, or any `+`).
    #[inline]
    pub fn reads(&self) -> bool {
        self.read || self.plus
    }

    /// The mode writes (`w`, `a`, `x`, or `r+`).
    #[inline]
    pub fn writes(&self) -> bool {
        self.write || self.append || self.exclusive || self.plus
    }

    /// The existing content must be available before writing starts.
    #[inline]
    pub fn keeps_content(&self) -> bool {
        self.read || self.append
    }
}

impl FromStr for OpenMode {
    type Err = SmartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let primary = if self.read {
            'r'
        } else if self.write {
            'w'
        } else if self.append {
            'a'
        } else {
            'x'
        };
        write!(f, "{primary}")?;
        if self.binary {
            f.write_str("b")?;
        }
        if self.plus {
            f.write_str("+")?;
        }
        Ok(())
    }
}

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
pub(crate) mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_result_defaults_to_empty_file() {
        let stat = StatResult::default();
        assert!(stat.is_file());
        assert!(!stat.is_symlink);
        assert_eq!(stat.size, 0);
    }

    #[test]
    fn stat_result_dir() {
        let stat = StatResult::dir(SystemTime::UNIX_EPOCH);
        assert!(stat.is_dir);
        assert!(!stat.is_file());
    }

    #[test]
    fn open_mode_parses_common_tokens() {
        let r = OpenMode::parse("r").unwrap();
        assert!(r.read && r.is_text() && !r.writes());

        let wb = OpenMode::parse("wb").unwrap();
        assert!(wb.write && wb.binary && !wb.reads());

        let a_plus = OpenMode::parse("a+").unwrap();
        assert!(a_plus.append && a_plus.plus && a_plus.reads() && a_plus.writes());

        let xt = OpenMode::parse("xt").unwrap();
        assert!(xt.exclusive && xt.is_text());
    }

    #[test]
    fn open_mode_accepts_any_order() {
        assert_eq!(OpenMode::parse("+br").unwrap(), OpenMode::parse("rb+").unwrap());
    }

    #[test]
    fn open_mode_rejects_bad_combinations() {
        for bad in ["", "rw", "rr", "rbt", "q", "b", "r++"] {
            match OpenMode::parse(bad) {
                Err(SmartError::InvalidMode { mode, .. }) => assert_eq!(mode, bad),
                other => panic!("{bad:?} should be invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn open_mode_display_is_canonical() {
        assert_eq!(OpenMode::parse("wt").unwrap().to_string(), "w");
        assert_eq!(OpenMode::parse("+wb").unwrap().to_string(), "wb+");
        assert_eq!(OpenMode::READ_BINARY.to_string(), "rb");
        assert_eq!(OpenMode::WRITE_BINARY.to_string(), "wb");
        assert_eq!(OpenMode::CREATE_BINARY.to_string(), "xb");
    }

    #[test]
    fn open_mode_remembers_spelling() {
        let mode = OpenMode::parse("w+b").unwrap();
        assert_eq!(mode.as_str(), "w+b");
        assert_eq!(mode.to_string(), "wb+");
        assert_eq!(mode, OpenMode::parse("wb+").unwrap());
        assert_eq!(OpenMode::READ_BINARY.as_str(), "rb");
        assert_eq!(format!("{mode:?}").matches("\"w+b\"").count(), 1);
    }

    #[test]
    fn open_mode_keeps_content() {
        assert!(OpenMode::parse("r+").unwrap().keeps_content());
        assert!(OpenMode::parse("a").unwrap().keeps_content());
        assert!(!OpenMode::parse("w+").unwrap().keeps_content());
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StatResult>();
        assert_send_sync::<FileEntry>();
        assert_send_sync::<WalkEntry>();
        assert_send_sync::<Access>();
        assert_send_sync::<OpenMode>();
    }
}
