//! Sequential cursors over positional I/O
//!
//! [`SectionReader`] and [`OffsetWriter`] turn any [`ReadAt`] / [`WriteAt`]
//! into a stream with its own position. They hold no synchronization state;
//! when the source is a [`crate::Patchwork`], the blocking happens inside its
//! `read_at`.
//!
//! Both implement `std::io` and `embedded_io` traits.

use std::fmt;
use std::io::{self, SeekFrom};

use crate::io::{ReadAt, WriteAt};

/// Error type compatible with `embedded_io`
#[derive(Debug)]
pub struct IoError(io::Error);

impl IoError {
    #[must_use]
    pub fn into_inner(self) -> io::Error {
        self.0
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            io::ErrorKind::TimedOut => embedded_io::ErrorKind::TimedOut,
            io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<io::Error> for IoError {
    fn from(e: io::Error) -> Self {
        Self(e)
    }
}

/// Reader over the section `[base, base + size)` of a positional source
///
/// Reads return `Ok(0)` once the cursor reaches the end of the section; a
/// read crossing the end is shortened to stop there.
pub struct SectionReader<R> {
    source: R,
    base: u64,
    size: u64,
    pos: u64,
}

impl<R: ReadAt> SectionReader<R> {
    #[must_use]
    pub fn new(source: R, base: u64, size: u64) -> Self {
        Self {
            source,
            base,
            size,
            pos: 0,
        }
    }

    /// Cursor position relative to the start of the section
    #[must_use]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Length of the section
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    #[must_use]
    pub fn into_inner(self) -> R {
        self.source
    }
}

impl<R: ReadAt> io::Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.size {
            return Ok(0);
        }
        let remaining = self.size - self.pos;
        let len = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));

        let n = self.source.read_at(&mut buf[..len], self.base + self.pos)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: ReadAt> io::Seek for SectionReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
        };
        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            ));
        };
        self.pos = target;
        Ok(target)
    }
}

impl<R: ReadAt> embedded_io::ErrorType for SectionReader<R> {
    type Error = IoError;
}

impl<R: ReadAt> embedded_io::Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        io::Read::read(self, buf).map_err(IoError::from)
    }
}

impl<R> fmt::Debug for SectionReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SectionReader(base={}, size={}, pos={})",
            self.base, self.size, self.pos
        )
    }
}

/// Writer that appends at an advancing offset of a positional sink
pub struct OffsetWriter<W> {
    sink: W,
    offset: u64,
}

impl<W: WriteAt> OffsetWriter<W> {
    #[must_use]
    pub fn new(sink: W, offset: u64) -> Self {
        Self { sink, offset }
    }

    /// Offset the next write lands at
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    #[must_use]
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: WriteAt> io::Write for OffsetWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.sink.write_at(buf, self.offset)?;
        self.offset += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: WriteAt> embedded_io::ErrorType for OffsetWriter<W> {
    type Error = IoError;
}

impl<W: WriteAt> embedded_io::Write for OffsetWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        io::Write::write(self, buf).map_err(IoError::from)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl<W> fmt::Debug for OffsetWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OffsetWriter(offset={})", self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemStore;
    use std::io::{Read, Seek, Write};

    #[test]
    fn test_reader_reads_to_eof() {
        let store = MemStore::from_bytes(b"the lovely llama loves lettuce");
        let mut reader = SectionReader::new(&store, 0, 30);

        let mut buf = vec![0u8; 30];
        assert_eq!(reader.read(&mut buf).unwrap(), 30);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_reader_clamps_to_section() {
        let store = MemStore::from_bytes(b"0123456789");
        let mut reader = SectionReader::new(&store, 2, 5);

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "23456");
    }

    #[test]
    fn test_reader_seek() {
        let store = MemStore::from_bytes(b"0123456789");
        let mut reader = SectionReader::new(&store, 0, 10);
        let mut buf = [0u8; 2];

        assert_eq!(reader.seek(SeekFrom::Start(4)).unwrap(), 4);
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"45");

        assert_eq!(reader.seek(SeekFrom::Current(-3)).unwrap(), 3);
        assert_eq!(reader.seek(SeekFrom::End(-2)).unwrap(), 8);
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"89");

        assert!(reader.seek(SeekFrom::Current(-11)).is_err());
        assert_eq!(reader.position(), 10);
    }

    #[test]
    fn test_writer_advances() {
        let store = MemStore::new(6);
        let mut writer = OffsetWriter::new(&store, 1);

        writer.write_all(b"ab").unwrap();
        writer.write_all(b"cd").unwrap();
        assert_eq!(writer.position(), 5);
        assert_eq!(store.to_vec(), b"\0abcd\0");
    }

    #[test]
    fn test_embedded_io_traits() {
        let store = MemStore::new(4);
        let mut writer = OffsetWriter::new(store.clone(), 0);
        assert_eq!(embedded_io::Write::write(&mut writer, b"wxyz").unwrap(), 4);

        let mut reader = SectionReader::new(store, 0, 4);
        let mut buf = [0u8; 8];
        assert_eq!(embedded_io::Read::read(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"wxyz");
        assert_eq!(embedded_io::Read::read(&mut reader, &mut buf).unwrap(), 0);
    }
}
