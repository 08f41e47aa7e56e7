//! Common utilities and constants.
// Short-transfer-safe I/O shared by the writer and reader paths.

use std::io::{self, Read, Write};

/// Chunk size used to stream file content when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Which side of a copy failed.
#[derive(Debug)]
pub(crate) enum PumpError {
    /// The source failed after `copied` bytes had already reached the sink.
    Read { copied: u64, source: io::Error },
    Write(io::Error),
}

/// Fill `buf` from `reader`, reissuing short reads until it is full or the
/// reader is exhausted. Returns the number of bytes actually placed in `buf`.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Copy up to `len` bytes from `src` to `dst` through `buf`, one chunk at a time.
///
/// Stops early only when `src` runs dry; the returned count tells the caller how
/// much actually moved. `write_all` already retries short writes.
pub(crate) fn pump<R, W>(src: &mut R, dst: &mut W, len: u64, buf: &mut [u8]) -> Result<u64, PumpError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut copied: u64 = 0;
    while copied < len {
        let want = (len - copied).min(buf.len() as u64) as usize;
        let n = read_full(src, &mut buf[..want]).map_err(|source| PumpError::Read { copied, source })?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n]).map_err(PumpError::Write)?;
        copied += n as u64;
        if n < want {
            break;
        }
    }
    Ok(copied)
}

/// Write `len` zero bytes to `dst`.
pub(crate) fn write_zeros<W: Write + ?Sized>(dst: &mut W, len: u64, buf: &mut [u8]) -> io::Result<()> {
    buf.fill(0);
    let mut left = len;
    while left > 0 {
        let n = left.min(buf.len() as u64) as usize;
        dst.write_all(&buf[..n])?;
        left -= n as u64;
    }
    Ok(())
}

/// Readers and writers that move at most one byte per call, for exercising
/// short-transfer handling.
#[cfg(test)]
pub(crate) mod trickle {
    use std::io::{self, Read, Write};

    pub struct TrickleReader<R>(pub R);

    impl<R: Read> Read for TrickleReader<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            self.0.read(&mut buf[..1])
        }
    }

    pub struct TrickleWriter<W>(pub W);

    impl<W: Write> Write for TrickleWriter<W> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if buf.is_empty() {
                return Ok(0);
            }
            self.0.write(&buf[..1])
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.flush()
        }
    }
}
