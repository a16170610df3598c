//! Chunked byte transfer between a reader and a writer.

use std::io::{self, Read, Write};

use tracing::trace;

use crate::SmartError;

/// Copy everything from `reader` to `writer` in `block_size` chunks.
///
/// `callback` receives the cumulative byte count after every chunk. Read
/// failures are attributed to `src`, write failures to `dst`. Does not flush.
pub(crate) fn transfer(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    block_size: usize,
    callback: Option<&dyn Fn(u64)>,
    src: &str,
    dst: &str,
) -> Result<u64, SmartError> {
    let mut buf = vec![0u8; block_size.max(1)];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SmartError::from_io("read", src, e)),
        };
        writer
            .write_all(&buf[..n])
            .map_err(|e| SmartError::from_io("write", dst, e))?;
        total += n as u64;
        trace!(src, dst, total, "chunk transferred");
        if let Some(cb) = callback {
            cb(total);
        }
    }
    Ok(total)
}
