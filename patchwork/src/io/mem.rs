//! In-memory byte store
//!
//! Provides a thread-safe, fixed-capacity buffer that can be shared across
//! threads and used as the storage behind a patchwork.

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

use super::{clamp_to_capacity, ByteStore, ReadAt, WriteAt};

/// Fixed-capacity in-memory store
///
/// Backed by `Arc<Mutex<Vec<u8>>>`; clones share the same bytes, so a test
/// can keep a clone to inspect what a patchwork wrote.
///
/// Reads and writes that cross the capacity are clamped and report a short
/// count. [`ByteStore::close`] is a no-op.
///
/// # Example
///
/// ```
/// use patchwork::io::{MemStore, ReadAt, WriteAt};
///
/// let store = MemStore::new(8);
/// store.write_at(b"ab", 3).unwrap();
///
/// let mut buf = [0u8; 2];
/// store.read_at(&mut buf, 3).unwrap();
/// assert_eq!(&buf, b"ab");
/// ```
#[derive(Clone, Debug)]
pub struct MemStore(Arc<Mutex<Vec<u8>>>);

impl MemStore {
    /// Zero-filled store of `capacity` bytes
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self(Arc::new(Mutex::new(vec![0; capacity])))
    }

    /// Store whose capacity and initial content are `data`
    #[must_use]
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(Arc::new(Mutex::new(data.to_vec())))
    }

    /// Copy of the current content
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.lock().clone()
    }
}

impl ReadAt for MemStore {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let data = self.0.lock();
        let n = clamp_to_capacity(offset, buf.len(), data.len() as u64);
        if n == 0 {
            return Ok(0);
        }
        // n > 0 implies offset < data.len()
        #[allow(clippy::cast_possible_truncation)]
        let start = offset as usize;
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }
}

impl WriteAt for MemStore {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        let mut data = self.0.lock();
        let n = clamp_to_capacity(offset, buf.len(), data.len() as u64);
        if n == 0 {
            return Ok(0);
        }
        #[allow(clippy::cast_possible_truncation)]
        let start = offset as usize;
        data[start..start + n].copy_from_slice(&buf[..n]);
        Ok(n)
    }
}

impl ByteStore for MemStore {
    fn capacity(&self) -> u64 {
        self.0.lock().len() as u64
    }
}
