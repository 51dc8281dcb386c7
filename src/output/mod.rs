//! Output lines.
//!
//! Every item produces one line `<expr> <name>` followed by a newline, or
//! by a NUL in zero-terminated mode. Names are escaped so that a shell can
//! read them back with `eval name="\$'$name'"`.

use std::io::{self, Write};

use crate::digest::{Marker, Term, TermSink};

/// Escapes `name` for `$'...'` quoting.
///
/// Bytes below 33 or above 126 become a backslash and three octal digits,
/// `\` and `'` get a backslash prepended, everything else is kept.
///
/// # Example
///
/// ```
/// use md5chk::escape_name;
///
/// assert_eq!(escape_name(b"my file's\n"), r"my\040file\'s\012");
/// ```
pub fn escape_name(name: &[u8]) -> String {
    let mut escaped = String::with_capacity(name.len());
    for &byte in name {
        match byte {
            b'\\' | b'\'' => {
                escaped.push('\\');
                escaped.push(byte as char);
            }
            33..=126 => escaped.push(byte as char),
            _ => escaped.push_str(&format!("\\{:03o}", byte)),
        }
    }
    escaped
}

/// How lines are laid out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineFormat {
    /// Leave out the names.
    pub quiet: bool,
    /// Terminate lines with NUL and print names unescaped.
    pub zero: bool,
    /// Flush after every term.
    pub unbuffered: bool,
}

/// Writes expressions as they are produced, one line per item.
#[derive(Debug)]
pub struct LineWriter<W: Write> {
    out: W,
    format: LineFormat,
    started: bool,
}

impl<W: Write> LineWriter<W> {
    /// Creates a writer on top of `out`.
    pub fn new(out: W, format: LineFormat) -> Self {
        Self {
            out,
            format,
            started: false,
        }
    }

    /// Returns `true` if the current line already has output.
    pub fn started(&self) -> bool {
        self.started
    }

    /// Appends the name and the terminator to the current line.
    pub fn finish_line(&mut self, name: &[u8]) -> io::Result<()> {
        if !self.format.quiet {
            self.out.write_all(b" ")?;
            if self.format.zero {
                self.out.write_all(name)?;
            } else {
                self.out.write_all(escape_name(name).as_bytes())?;
            }
        }
        self.out
            .write_all(if self.format.zero { b"\0" } else { b"\n" })?;
        self.started = false;
        self.flush_if_unbuffered()
    }

    /// Flushes the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_if_unbuffered(&mut self) -> io::Result<()> {
        if self.format.unbuffered {
            self.out.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> TermSink for LineWriter<W> {
    fn term(&mut self, term: &Term) -> io::Result<()> {
        write!(self.out, "{}", term)?;
        self.started = true;
        self.flush_if_unbuffered()
    }

    fn marker(&mut self, marker: Marker) -> io::Result<()> {
        self.out.write_all(marker.as_str().as_bytes())?;
        self.started = true;
        self.flush_if_unbuffered()
    }
}
