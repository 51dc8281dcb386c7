//! Byte sources.
//!
//! A [`ByteSource`] hands out the bytes of one item. Every source can be
//! read; seekable ones additionally report their remaining length and skip
//! forward cheaply, which the window logic uses instead of discarding
//! bytes.
//!
//! - [`ReadSource`] - Any [`std::io::Read`], streamed
//! - [`SeekSource`] - Any [`std::io::Read`] + [`std::io::Seek`], e.g. a file

use std::io::{self, Read, Seek, SeekFrom};

/// The bytes of one item.
pub trait ByteSource {
    /// Reads up to `buf.len()` bytes; `Ok(0)` means the source has ended.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Bytes left until the end, if the source knows it.
    fn remaining_len(&mut self) -> Option<u64> {
        None
    }

    /// Skips `n` bytes without reading them.
    ///
    /// Only called when [`ByteSource::remaining_len`] returned a length.
    fn seek_forward(&mut self, _n: u64) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }

    /// Releases the source after it was read completely.
    fn close(self) -> io::Result<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Reads `reader` into `buf`, retrying on [`io::ErrorKind::Interrupted`].
fn read_retrying<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// A non-seekable source over any reader.
///
/// # Example
///
/// ```
/// use md5chk::{ByteSource, ReadSource};
///
/// let mut source = ReadSource::new(&b"hello"[..]);
/// let mut buf = [0u8; 8];
/// assert_eq!(source.read(&mut buf)?, 5);
/// assert_eq!(source.read(&mut buf)?, 0);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct ReadSource<R> {
    reader: R,
}

impl<R: Read> ReadSource<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_retrying(&mut self.reader, buf)
    }
}

/// A seekable source such as a regular file.
///
/// If the underlying stream refuses to seek (a pipe opened by name, a
/// terminal) the source behaves like a [`ReadSource`].
#[derive(Debug)]
pub struct SeekSource<R> {
    inner: R,
}

impl<R: Read + Seek> SeekSource<R> {
    /// Wraps a seekable reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn try_remaining_len(&mut self) -> io::Result<u64> {
        let pos = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        self.inner.seek(SeekFrom::Start(pos))?;
        Ok(end.saturating_sub(pos))
    }
}

impl<R: Read + Seek> ByteSource for SeekSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        read_retrying(&mut self.inner, buf)
    }

    fn remaining_len(&mut self) -> Option<u64> {
        self.try_remaining_len().ok()
    }

    fn seek_forward(&mut self, n: u64) -> io::Result<()> {
        let delta = i64::try_from(n)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "offset too large"))?;
        self.inner.seek(SeekFrom::Current(delta))?;
        Ok(())
    }
}
