//! Byte storage behind a patchwork
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  Patchwork (coordination layer)     │
//! │  - covered-range set                │
//! │  - readers blocking on missing bytes│
//! └─────────────────────────────────────┘
//!          ▲
//!          │ uses ByteStore for storage
//!          ▼
//! ┌─────────────────────────────────────┐
//! │  ByteStore (positional storage)     │
//! │  - read_at / write_at               │
//! │  - fixed capacity                   │
//! │  - optional explicit release        │
//! └─────────────────────────────────────┘
//!      ▲              ▲
//!      │              │
//!   FileStore      MemStore
//! ```
//!
//! Stores do no synchronization of their own beyond what is needed to be
//! `Sync`; the patchwork decides when reads are allowed.

pub mod file;
pub mod mem;

pub use file::FileStore;
pub use mem::MemStore;

use std::io;
use std::sync::Arc;

/// Positional read, the counterpart of `pread`
pub trait ReadAt {
    /// Read into `buf` starting at `offset`, returning the number of bytes read.
    ///
    /// A short count means the end of the data was reached.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize>;
}

/// Positional write, the counterpart of `pwrite`
pub trait WriteAt {
    /// Write `buf` starting at `offset`, returning the number of bytes written.
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize>;
}

/// Random-access storage with a fixed capacity
pub trait ByteStore: ReadAt + WriteAt + Send + Sync {
    /// Size of the resource in bytes
    fn capacity(&self) -> u64;

    /// Release the underlying resource.
    ///
    /// Whether a second call is an error is up to the store.
    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<T: WriteAt + ?Sized> WriteAt for &T {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        (**self).write_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Arc<T> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<T: WriteAt + ?Sized> WriteAt for Arc<T> {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        (**self).write_at(buf, offset)
    }
}

impl<T: ReadAt + ?Sized> ReadAt for Box<T> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        (**self).read_at(buf, offset)
    }
}

impl<T: WriteAt + ?Sized> WriteAt for Box<T> {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        (**self).write_at(buf, offset)
    }
}

/// Fill `buf` completely from `offset`, retrying short reads.
///
/// Fails with `UnexpectedEof` if the source runs out first.
pub fn read_exact_at<R: ReadAt + ?Sized>(
    source: &R,
    mut buf: &mut [u8],
    mut offset: u64,
) -> io::Result<()> {
    while !buf.is_empty() {
        match source.read_at(buf, offset) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ));
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Number of bytes of a `len`-byte transfer at `offset` that fit in `capacity`
pub(crate) fn clamp_to_capacity(offset: u64, len: usize, capacity: u64) -> usize {
    let room = capacity.saturating_sub(offset);
    usize::try_from(room).map_or(len, |room| room.min(len))
}
