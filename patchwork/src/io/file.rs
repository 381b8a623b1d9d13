//! Temp-file backed byte store

use parking_lot::RwLock;
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::{clamp_to_capacity, ByteStore, ReadAt, WriteAt};

/// Byte store backed by a temporary file truncated to the capacity
///
/// The file is deleted on [`ByteStore::close`] (or on drop) unless
/// [`FileStore::keep_on_close`] was called. Any operation after close fails.
/// Closing twice is allowed and does nothing the second time.
///
/// Positional I/O means readers never contend on a shared cursor; the inner
/// `RwLock` only guards the open/closed transition.
pub struct FileStore {
    file: RwLock<Option<NamedTempFile>>,
    path: PathBuf,
    capacity: u64,
    remove_on_close: bool,
}

impl FileStore {
    /// Create a zero-filled temp file of `capacity` bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be created or resized.
    pub fn new(capacity: u64) -> io::Result<Self> {
        let file = tempfile::Builder::new().prefix("patchwork").tempfile()?;
        file.as_file().set_len(capacity)?;
        let path = file.path().to_path_buf();
        log::debug!("FileStore: created {} ({capacity} bytes)", path.display());

        Ok(Self {
            file: RwLock::new(Some(file)),
            path,
            capacity,
            remove_on_close: true,
        })
    }

    /// Create a temp file holding `data`, sized to fit it exactly
    ///
    /// # Errors
    ///
    /// Returns an error if the temp file cannot be created or written.
    pub fn from_bytes(data: &[u8]) -> io::Result<Self> {
        let store = Self::new(data.len() as u64)?;
        let mut offset = 0;
        while offset < data.len() {
            let n = store.write_at(&data[offset..], offset as u64)?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ));
            }
            offset += n;
        }
        Ok(store)
    }

    /// Leave the file on disk when the store is closed
    #[must_use]
    pub fn keep_on_close(mut self) -> Self {
        self.remove_on_close = false;
        self
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.file.read().is_none()
    }

    fn with_file<T>(&self, op: impl FnOnce(&File) -> io::Result<T>) -> io::Result<T> {
        let guard = self.file.read();
        match guard.as_ref() {
            Some(file) => op(file.as_file()),
            None => Err(io::Error::other("file store is closed")),
        }
    }
}

#[cfg(unix)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, offset)
}

#[cfg(unix)]
fn pwrite(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::write_at(file, buf, offset)
}

#[cfg(windows)]
fn pread(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, offset)
}

#[cfg(windows)]
fn pwrite(file: &File, buf: &[u8], offset: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_write(file, buf, offset)
}

impl ReadAt for FileStore {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let n = clamp_to_capacity(offset, buf.len(), self.capacity);
        if n == 0 {
            return Ok(0);
        }
        self.with_file(|file| pread(file, &mut buf[..n], offset))
    }
}

impl WriteAt for FileStore {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        // The file must not grow past the capacity
        let n = clamp_to_capacity(offset, buf.len(), self.capacity);
        if n == 0 {
            return Ok(0);
        }
        self.with_file(|file| pwrite(file, &buf[..n], offset))
    }
}

impl ByteStore for FileStore {
    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn close(&self) -> io::Result<()> {
        let Some(file) = self.file.write().take() else {
            log::warn!("FileStore::close() called on already closed store: {self:?}");
            return Ok(());
        };

        if self.remove_on_close {
            log::debug!("FileStore: removing {}", self.path.display());
            file.close()
        } else {
            log::debug!("FileStore: keeping {}", self.path.display());
            file.keep().map(drop).map_err(|e| e.error)
        }
    }
}

impl fmt::Debug for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FileStore(path={}, capacity={}, remove_on_close={})",
            self.path.display(),
            self.capacity,
            self.remove_on_close
        )
    }
}
