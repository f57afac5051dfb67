// src/readers/loglinesiter.rs

//! Implements a [`LogLinesIter`], the driver of reading decoded text lines
//! from a log file starting at a byte offset.
//!
//! The text encoding is sniffed once from the first two bytes of the data:
//!
//! | first bytes | encoding    | content starts at |
//! |-------------|-------------|-------------------|
//! | `FE FF`     | UTF-16 BE   | 2                 |
//! | `FF FE`     | UTF-16 LE   | 2                 |
//! | other       | UTF-8       | 0                 |
//!
//! Lines are split on the _encoded_ newline so all offset bookkeeping is
//! done on raw bytes, independent of decoding. Decoding is lenient;
//! malformed sequences become `U+FFFD`.
//!
//! The data is read through a [`ByteSource`] so tests may use an in-memory
//! [`Cursor`].
//!
//! _Not a rust "Reader"; does not implement trait [`Read`]._
//!
//! [`Cursor`]: std::io::Cursor
//! [`Read`]: std::io::Read

use crate::common::{Bytes, FPath, FileOffset, FileSz, NLu8, ResultS3};
#[cfg(any(debug_assertions, test))]
use crate::debug::printers::str_to_String_noraw;

use std::fmt;
use std::fs::File;
use std::io::{Error, ErrorKind, Read, Result, Seek, SeekFrom};

use ::encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
#[allow(unused_imports)]
use ::more_asserts::{debug_assert_ge, debug_assert_le};
#[allow(unused_imports)]
use ::si_trace_print::{defn, defo, defx, defñ};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ByteSource
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Seekable bytes of a known current size.
pub trait ByteSource: Read + Seek {
    /// Current size in bytes. May change between calls as a log file grows
    /// or is truncated.
    fn size(&mut self) -> Result<FileSz>;
}

impl ByteSource for File {
    fn size(&mut self) -> Result<FileSz> {
        Ok(self.metadata()?.len())
    }
}

impl<T: AsRef<[u8]>> ByteSource for std::io::Cursor<T> {
    fn size(&mut self) -> Result<FileSz> {
        Ok(self.get_ref().as_ref().len() as FileSz)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LogEncoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// UTF-16 big-endian byte-order mark.
pub const BOM_UTF16_BE: [u8; 2] = [0xFE, 0xFF];
/// UTF-16 little-endian byte-order mark.
pub const BOM_UTF16_LE: [u8; 2] = [0xFF, 0xFE];

const NEWLINE_UTF8: [u8; 1] = [NLu8];
const NEWLINE_UTF16_LE: [u8; 2] = [NLu8, 0x00];
const NEWLINE_UTF16_BE: [u8; 2] = [0x00, NLu8];

/// Text encoding of a log file, fixed for the lifetime of a
/// [`LogLinesIter`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LogEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl LogEncoding {
    /// Choose the encoding from the first bytes of a file.
    pub fn sniff(prefix: &[u8]) -> LogEncoding {
        if prefix.starts_with(&BOM_UTF16_BE) {
            LogEncoding::Utf16Be
        } else if prefix.starts_with(&BOM_UTF16_LE) {
            LogEncoding::Utf16Le
        } else {
            LogEncoding::Utf8
        }
    }

    /// Length of the byte-order mark skipped at the start of the file.
    pub const fn bom_len(&self) -> FileOffset {
        match self {
            LogEncoding::Utf8 => 0,
            LogEncoding::Utf16Le | LogEncoding::Utf16Be => 2,
        }
    }

    /// Bytes per code unit; newlines are only searched at this alignment.
    pub const fn unit_len(&self) -> usize {
        match self {
            LogEncoding::Utf8 => 1,
            LogEncoding::Utf16Le | LogEncoding::Utf16Be => 2,
        }
    }

    /// The encoded newline.
    pub const fn newline(&self) -> &'static [u8] {
        match self {
            LogEncoding::Utf8 => &NEWLINE_UTF8,
            LogEncoding::Utf16Le => &NEWLINE_UTF16_LE,
            LogEncoding::Utf16Be => &NEWLINE_UTF16_BE,
        }
    }

    fn encoding(&self) -> &'static Encoding {
        match self {
            LogEncoding::Utf8 => UTF_8,
            LogEncoding::Utf16Le => UTF_16LE,
            LogEncoding::Utf16Be => UTF_16BE,
        }
    }

    pub fn name(&self) -> &'static str {
        self.encoding().name()
    }

    /// Decode `raw`, replacing malformed sequences.
    pub fn decode(
        &self,
        raw: &[u8],
    ) -> String {
        let (text, _had_errors) = self
            .encoding()
            .decode_without_bom_handling(raw);
        if _had_errors {
            defñ!("malformed {} sequence replaced", self.name());
        }

        text.into_owned()
    }

    /// Length of `text` in this encoding, in bytes.
    pub fn encoded_len(
        &self,
        text: &str,
    ) -> FileSz {
        match self {
            LogEncoding::Utf8 => text.len() as FileSz,
            LogEncoding::Utf16Le | LogEncoding::Utf16Be => {
                (text.encode_utf16().count() * 2) as FileSz
            }
        }
    }

    /// Index of the first byte after the first newline in `data` at or
    /// after `from`. `from` must be aligned to [`unit_len`].
    ///
    /// [`unit_len`]: LogEncoding::unit_len
    pub fn find_newline_end(
        &self,
        data: &[u8],
        from: usize,
    ) -> Option<usize> {
        let unit = self.unit_len();
        debug_assert_eq!(from % unit, 0, "unaligned search from {}", from);
        if unit == 1 {
            return data[from..]
                .iter()
                .position(|b| *b == NLu8)
                .map(|at| from + at + 1);
        }
        let newline = self.newline();
        let mut at = from;
        while at + unit <= data.len() {
            if &data[at..at + unit] == newline {
                return Some(at + unit);
            }
            at += unit;
        }

        None
    }
}

impl fmt::Display for LogEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LogLinesIter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Default read size in bytes.
pub const READSZ_DEF: usize = 0xFFFF;

/// A decoded line and the count of raw bytes it was decoded from.
pub type SizedLine = (String, FileSz);

/// A typed [`ResultS3`] for private function `LogLinesIter::read_line`.
///
/// [`ResultS3`]: crate::common::ResultS3
pub type ResultS3ReadLine = ResultS3<SizedLine, Error>;

/// Reads successive decoded lines from a [`ByteSource`] while tracking the
/// exact byte offset after the last line handed out.
///
/// Returned lines keep their trailing newline (the final line of the data
/// may lack one).
pub struct LogLinesIter<S: ByteSource = File> {
    source: S,
    /// for debugging and messages
    path: FPath,
    encoding: LogEncoding,
    /// raw bytes read from `source`, `buffer[consumed..]` are pending
    buffer: Bytes,
    /// source offset of `buffer[0]`
    buffer_offset: FileOffset,
    /// count of bytes of `buffer` already handed out as lines
    consumed: usize,
    /// `buffer[consumed..consumed + scanned]` holds no newline
    scanned: usize,
    /// a line un-consumed by `push_back_line`
    pushed_back: Option<SizedLine>,
    /// the line last handed out, with its raw length
    last_line: Option<SizedLine>,
    readsz: usize,
}

impl<S: ByteSource> fmt::Debug for LogLinesIter<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LogLinesIter")
            .field("path", &self.path)
            .field("encoding", &self.encoding)
            .field("buffer_offset", &self.buffer_offset)
            .field("consumed", &self.consumed)
            .field("buffered", &self.buffer.len())
            .field("pushed_back", &self.pushed_back)
            .finish()
    }
}

/// Read into `buf` until it is full or the source is exhausted.
fn read_fully<R: Read>(
    source: &mut R,
    buf: &mut [u8],
) -> Result<usize> {
    let mut filled: usize = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    Ok(filled)
}

impl LogLinesIter<File> {
    /// Open the file at `path`.
    pub fn open(path: &FPath) -> Result<LogLinesIter<File>> {
        let file = File::open(path)?;

        LogLinesIter::new(file, path.clone())
    }
}

impl<S: ByteSource> LogLinesIter<S> {
    /// Create a new `LogLinesIter` over `source`; sniffs the encoding and
    /// positions at the start of the content (after any byte-order mark).
    pub fn new(
        mut source: S,
        path: FPath,
    ) -> Result<LogLinesIter<S>> {
        defn!("({:?})", path);
        source.seek(SeekFrom::Start(0))?;
        let mut prefix: [u8; 2] = [0; 2];
        let prefix_len = read_fully(&mut source, &mut prefix)?;
        let encoding = LogEncoding::sniff(&prefix[..prefix_len]);
        let start: FileOffset = encoding.bom_len();
        source.seek(SeekFrom::Start(start))?;
        defx!("encoding {}, start {}", encoding, start);

        Ok(LogLinesIter {
            source,
            path,
            encoding,
            buffer: Bytes::with_capacity(READSZ_DEF),
            buffer_offset: start,
            consumed: 0,
            scanned: 0,
            pushed_back: None,
            last_line: None,
            readsz: READSZ_DEF,
        })
    }

    /// Create a new `LogLinesIter` that reads at most `readsz` bytes at a
    /// time.
    pub fn with_readsz(
        source: S,
        path: FPath,
        readsz: usize,
    ) -> Result<LogLinesIter<S>> {
        if readsz == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "read size must be at least 1"));
        }
        let mut iter = LogLinesIter::new(source, path)?;
        iter.readsz = readsz;

        Ok(iter)
    }

    pub const fn encoding(&self) -> LogEncoding {
        self.encoding
    }

    pub fn path(&self) -> &FPath {
        &self.path
    }

    /// Current size of the underlying data.
    pub fn size(&mut self) -> Result<FileSz> {
        self.source.size()
    }

    /// Byte offset just after the last line handed out.
    pub fn get_position(&self) -> FileOffset {
        let pushed_len: FileSz = match &self.pushed_back {
            Some((_, len)) => *len,
            None => 0,
        };
        let position: FileOffset = self.buffer_offset + self.consumed as FileOffset;
        debug_assert_ge!(position, pushed_len);

        position - pushed_len
    }

    /// Drop buffered data and seek the source to `offset`.
    fn reset_to(
        &mut self,
        offset: FileOffset,
    ) -> Result<()> {
        self.source.seek(SeekFrom::Start(offset))?;
        self.buffer.clear();
        self.buffer_offset = offset;
        self.consumed = 0;
        self.scanned = 0;
        self.pushed_back = None;
        self.last_line = None;

        Ok(())
    }

    /// Continue reading at `offset`.
    ///
    /// An `offset` beyond the current size means the file was truncated or
    /// replaced; reading restarts at the beginning of the content.
    /// An `offset` within the byte-order mark is moved past it.
    pub fn set_position(
        &mut self,
        offset: FileOffset,
    ) -> Result<()> {
        defn!("({})", offset);
        let start: FileOffset = self.encoding.bom_len();
        let size: FileSz = self.source.size()?;
        let offset: FileOffset = if offset > size {
            defo!("offset {} beyond size {}, file truncated, restart at {}", offset, size, start);
            start
        } else {
            std::cmp::max(offset, start)
        };
        self.reset_to(offset)?;
        defx!("position {}", offset);

        Ok(())
    }

    /// Skip to the current end of the data without decoding.
    pub fn skip_remaining(&mut self) -> Result<()> {
        defn!();
        let size: FileSz = self.source.size()?;
        let end: FileOffset = std::cmp::max(size, self.get_position());
        self.reset_to(end)?;
        defx!("position {}", end);

        Ok(())
    }

    /// Compact the buffer then append up to `readsz` bytes from the source.
    /// Returns the count of bytes read, `0` at the end of the data.
    fn fill_buffer(&mut self) -> Result<usize> {
        if self.consumed > 0 {
            self.buffer.drain(..self.consumed);
            self.buffer_offset += self.consumed as FileOffset;
            self.consumed = 0;
        }
        let len_old: usize = self.buffer.len();
        self.buffer.resize(len_old + self.readsz, 0);
        let result = loop {
            match self.source.read(&mut self.buffer[len_old..]) {
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                result => break result,
            }
        };
        let count: usize = match result {
            Ok(val) => val,
            Err(err) => {
                self.buffer.truncate(len_old);
                return Err(err);
            }
        };
        self.buffer.truncate(len_old + count);
        defñ!("read {} bytes at {}", count, self.buffer_offset + len_old as FileOffset);

        Ok(count)
    }

    /// Hand out `len` pending bytes as a line.
    fn take_line(
        &mut self,
        len: usize,
    ) -> SizedLine {
        let raw: &[u8] = &self.buffer[self.consumed..self.consumed + len];
        let text: String = self.encoding.decode(raw);
        self.consumed += len;
        self.scanned = 0;

        (text, len as FileSz)
    }

    /// Find the next line in the pending bytes, reading more data as
    /// needed.
    fn read_line(&mut self) -> ResultS3ReadLine {
        loop {
            let pending: &[u8] = &self.buffer[self.consumed..];
            if let Some(end) = self
                .encoding
                .find_newline_end(pending, self.scanned)
            {
                return ResultS3ReadLine::Found(self.take_line(end));
            }
            let unit = self.encoding.unit_len();
            self.scanned = pending.len() - pending.len() % unit;

            match self.fill_buffer() {
                Ok(0) => {
                    let pending_len: usize = self.buffer.len() - self.consumed;
                    if pending_len == 0 {
                        return ResultS3ReadLine::Done;
                    }
                    // final line without newline
                    return ResultS3ReadLine::Found(self.take_line(pending_len));
                }
                Ok(_) => {}
                Err(err) => return ResultS3ReadLine::Err(err),
            }
        }
    }

    /// Return the next line with the count of raw bytes it consumed, or
    /// `None` at the end of the data.
    pub fn next_line_sized(&mut self) -> Result<Option<SizedLine>> {
        if let Some(sized_line) = self.pushed_back.take() {
            self.last_line = Some(sized_line.clone());
            return Ok(Some(sized_line));
        }
        match self.read_line() {
            ResultS3ReadLine::Found(sized_line) => {
                defñ!("{:?} {} bytes", str_to_String_noraw(&sized_line.0), sized_line.1);
                self.last_line = Some(sized_line.clone());
                Ok(Some(sized_line))
            }
            ResultS3ReadLine::Done => {
                self.last_line = None;
                Ok(None)
            }
            ResultS3ReadLine::Err(err) => Err(err),
        }
    }

    /// Return the next line, or `None` at the end of the data.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.next_line_sized()?.map(|(text, _)| text))
    }

    /// Un-consume one line; the position moves back by the line's length
    /// and the next call to `next_line` returns `line`.
    ///
    /// The line just returned by `next_line` is un-consumed by the exact
    /// count of raw bytes it was decoded from. Any other text is measured
    /// by its encoded length.
    pub fn push_back_line(
        &mut self,
        line: String,
    ) {
        defn!("({:?})", line);
        debug_assert!(self.pushed_back.is_none(), "only one line may be pushed back");
        let len: FileSz = match self.last_line.take() {
            Some((last_text, raw_len)) if last_text == line => raw_len,
            _ => self.encoding.encoded_len(&line),
        };
        let position: FileOffset = self.buffer_offset + self.consumed as FileOffset;
        let len: FileSz = std::cmp::min(len, position);
        self.pushed_back = Some((line, len));
        defx!("position {}", self.get_position());
    }
}
