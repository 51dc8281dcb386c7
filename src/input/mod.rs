//! Item names and the sources behind them.
//!
//! - [`NameReader`] - Splits a name list into names
//! - [`open_input`] - Opens the source an item name refers to
//!
//! A name consisting only of decimal digits refers to an already open file
//! descriptor (on Unix), `-` is standard input if enabled, anything else is
//! a path. Descriptor 0 is read through standard input at its current
//! position.

use std::fs::File;
use std::io::{self, BufRead, StdinLock};

use crate::error::ChkError;
use crate::source::{ByteSource, ReadSource, SeekSource};

/// Where one name in a name list ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Any ASCII whitespace.
    Whitespace,
    /// The given byte.
    Byte(u8),
}

impl Delimiter {
    /// Returns `true` if `byte` terminates a name. NUL always does.
    pub fn ends_name(&self, byte: u8) -> bool {
        match *self {
            Delimiter::Whitespace => byte == 0 || byte.is_ascii_whitespace(),
            Delimiter::Byte(delimiter) => byte == 0 || byte == delimiter,
        }
    }
}

/// Iterator over the names in a name list. Empty names are skipped.
///
/// # Example
///
/// ```
/// use md5chk::{Delimiter, NameReader};
///
/// let names: Vec<_> = NameReader::new(&b"a b\n\nc"[..], Delimiter::Whitespace)
///     .collect::<Result<_, _>>()?;
/// assert_eq!(names, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct NameReader<R> {
    reader: R,
    delimiter: Delimiter,
}

impl<R: BufRead> NameReader<R> {
    /// Creates a name reader.
    pub fn new(reader: R, delimiter: Delimiter) -> Self {
        Self { reader, delimiter }
    }

    fn next_name(&mut self) -> io::Result<Option<Vec<u8>>> {
        let delimiter = self.delimiter;
        let mut name = Vec::new();
        loop {
            let (done, used) = {
                let available = match self.reader.fill_buf() {
                    Ok(available) => available,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                if available.is_empty() {
                    return Ok((!name.is_empty()).then_some(name));
                }
                match available.iter().position(|&b| delimiter.ends_name(b)) {
                    Some(end) => {
                        name.extend_from_slice(&available[..end]);
                        (true, end + 1)
                    }
                    None => {
                        name.extend_from_slice(available);
                        (false, available.len())
                    }
                }
            };
            self.reader.consume(used);
            if done && !name.is_empty() {
                return Ok(Some(name));
            }
        }
    }
}

impl<R: BufRead> Iterator for NameReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_name().transpose()
    }
}

/// The source behind an item name.
#[derive(Debug)]
pub enum Input {
    /// Standard input.
    Stdin(ReadSource<StdinLock<'static>>),
    /// A file or an inherited file descriptor.
    File(SeekSource<File>),
}

impl ByteSource for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::Stdin(s) => s.read(buf),
            Input::File(s) => s.read(buf),
        }
    }

    fn remaining_len(&mut self) -> Option<u64> {
        match self {
            Input::Stdin(s) => s.remaining_len(),
            Input::File(s) => s.remaining_len(),
        }
    }

    fn seek_forward(&mut self, n: u64) -> io::Result<()> {
        match self {
            Input::Stdin(s) => s.seek_forward(n),
            Input::File(s) => s.seek_forward(n),
        }
    }

    fn close(self) -> io::Result<()> {
        match self {
            Input::Stdin(s) => s.close(),
            Input::File(s) => s.close(),
        }
    }
}

/// Renders a name for messages.
pub fn display_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Opens the source `name` refers to.
///
/// With `stdin_dash`, the name `-` is standard input.
pub fn open_input(name: &[u8], stdin_dash: bool) -> Result<Input, ChkError> {
    if stdin_dash && name == b"-" {
        return Ok(Input::Stdin(ReadSource::new(io::stdin().lock())));
    }

    let path = match descriptor(name) {
        Some(0) => return Ok(Input::Stdin(ReadSource::new(io::stdin().lock()))),
        Some(fd) => descriptor_path(fd),
        None => name_to_path(name),
    };
    File::open(&path)
        .map(|file| Input::File(SeekSource::new(file)))
        .map_err(|e| ChkError::Open {
            name: display_name(name),
            source: e,
        })
}

/// Parses a name made only of decimal digits as a file descriptor.
fn descriptor(name: &[u8]) -> Option<i32> {
    if !cfg!(unix) || name.is_empty() || !name.iter().all(u8::is_ascii_digit) {
        return None;
    }
    std::str::from_utf8(name).ok()?.parse().ok()
}

/// Other inherited descriptors are reopened through the descriptor
/// directory. Pipes are shared with the parent; regular files start over at
/// offset 0 and sockets can't be reopened.
fn descriptor_path(fd: i32) -> std::path::PathBuf {
    std::path::PathBuf::from(format!("/dev/fd/{}", fd))
}

#[cfg(unix)]
fn name_to_path(name: &[u8]) -> std::path::PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    OsStr::from_bytes(name).into()
}

#[cfg(not(unix))]
fn name_to_path(name: &[u8]) -> std::path::PathBuf {
    display_name(name).into()
}
