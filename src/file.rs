//! File handle returned by [`SmartFs::open`](crate::SmartFs::open).

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::{DuplexStream, OpenMode, SmartError};

pub(crate) enum Stream {
    Reader(Box<dyn Read + Send>),
    Writer(Box<dyn Write + Send>),
    Duplex(Box<dyn DuplexStream>),
}

/// An open file on any backend.
///
/// Implements [`Read`] and [`Write`] according to its mode; the other
/// direction fails with [`io::ErrorKind::Unsupported`]. Writes may be
/// buffered by the backend until [`close`](SmartFile::close) or a flush;
/// a file dropped without either may never reach an object store.
///
/// [`Read`] and [`Write`] always move raw bytes, whatever the mode. The
/// text layer is [`read_text`](SmartFile::read_text) and
/// [`write_text`](SmartFile::write_text): they require a text mode, decode
/// and encode UTF-8, and `read_text` translates `\r\n` and `\r` to `\n`.
pub struct SmartFile {
    path: String,
    mode: OpenMode,
    stream: Stream,
}

fn unsupported(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Unsupported, format!("file not open for {what}"))
}

impl SmartFile {
    pub(crate) fn new(path: &str, mode: OpenMode, stream: Stream) -> Self {
        Self {
            path: path.to_string(),
            mode,
            stream,
        }
    }

    /// Path the file was opened with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded open mode.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Read the rest of the file as text.
    ///
    /// # Errors
    ///
    /// - [`SmartError::InvalidMode`] on a binary-mode file
    /// - [`SmartError::InvalidData`] if the content is not UTF-8
    pub fn read_text(&mut self) -> Result<String, SmartError> {
        self.require_text("read_text")?;
        let mut raw = Vec::new();
        self.read_to_end(&mut raw)
            .map_err(|e| SmartError::from_io("read", self.path.as_str(), e))?;
        let text = String::from_utf8(raw).map_err(|e| SmartError::InvalidData {
            path: self.path.clone(),
            details: e.to_string(),
        })?;
        Ok(universal_newlines(text))
    }

    /// Write text, encoded as UTF-8.
    pub fn write_text(&mut self, text: &str) -> Result<(), SmartError> {
        self.require_text("write_text")?;
        self.write_all(text.as_bytes())
            .map_err(|e| SmartError::from_io("write", self.path.as_str(), e))
    }

    /// Flush and release the file. Remote writes become visible here.
    pub fn close(mut self) -> Result<(), SmartError> {
        self.flush()
            .map_err(|e| SmartError::from_io("close", self.path.as_str(), e))
    }

    fn require_text(&self, operation: &str) -> Result<(), SmartError> {
        if self.mode.is_text() {
            Ok(())
        } else {
            Err(SmartError::InvalidMode {
                mode: self.mode.as_str().to_string(),
                reason: format!("{operation} needs a text mode"),
            })
        }
    }
}

fn universal_newlines(text: String) -> String {
    if !text.contains('\r') {
        return text;
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Raw bytes; see [`SmartFile::read_text`] for newline translation.
impl Read for SmartFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.stream {
            Stream::Reader(r) => r.read(buf),
            Stream::Duplex(d) => d.read(buf),
            Stream::Writer(_) => Err(unsupported("reading")),
        }
    }
}

impl Write for SmartFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut self.stream {
            Stream::Writer(w) => w.write(buf),
            Stream::Duplex(d) => d.write(buf),
            Stream::Reader(_) => Err(unsupported("writing")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.stream {
            Stream::Writer(w) => w.flush(),
            Stream::Duplex(d) => d.flush(),
            Stream::Reader(_) => Ok(()),
        }
    }
}

impl Seek for SmartFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.stream {
            Stream::Duplex(d) => d.seek(pos),
            _ => Err(unsupported("seeking")),
        }
    }
}

impl fmt::Debug for SmartFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartFile")
            .field("path", &self.path)
            .field("mode", &self.mode.to_string())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(data: &[u8], mode: &str) -> SmartFile {
        SmartFile::new(
            "mem",
            OpenMode::parse(mode).unwrap(),
            Stream::Reader(Box::new(Cursor::new(data.to_vec()))),
        )
    }

    #[test]
    fn read_text_translates_newlines() {
        let mut file = reader(b"a\r\nb\rc\n", "r");
        assert_eq!(file.read_text().unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn text_mode_read_is_raw_bytes() {
        let mut raw = Vec::new();
        reader(b"a\r\nb", "r").read_to_end(&mut raw).unwrap();
        assert_eq!(raw, b"a\r\nb");
    }

    #[test]
    fn read_text_rejects_binary_mode_and_bad_utf8() {
        let mut binary = reader(b"abc", "rb");
        assert!(matches!(
            binary.read_text(),
            Err(SmartError::InvalidMode { .. })
        ));
        let mut invalid = reader(&[0xff, 0xfe], "r");
        assert!(matches!(
            invalid.read_text(),
            Err(SmartError::InvalidData { .. })
        ));
    }

    #[test]
    fn wrong_direction_is_unsupported() {
        let mut file = reader(b"abc", "rb");
        let err = file.write(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);
        assert!(file.seek(SeekFrom::Start(0)).is_err());
        file.close().unwrap();
    }

    #[test]
    fn duplex_reads_writes_and_seeks() {
        let mut file = SmartFile::new(
            "mem",
            OpenMode::parse("w+").unwrap(),
            Stream::Duplex(Box::new(Cursor::new(Vec::new()))),
        );
        file.write_text("hello").unwrap();
        file.seek(SeekFrom::Start(1)).unwrap();
        assert_eq!(file.read_text().unwrap(), "ello");
    }
}
