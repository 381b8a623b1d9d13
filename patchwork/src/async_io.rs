//! Async bridge
//!
//! The patchwork blocks on a condition variable, which must not happen on an
//! async executor thread. These wrappers move each call onto tokio's blocking
//! pool.
//!
//! Dropping one of the returned futures does not stop the blocking call.
//! Pass a [`crate::CancelToken`] through [`ReadOptions`] and cancel it to
//! release the thread.

use std::sync::Arc;

use tracing::debug;

use crate::error::PatchworkError;
use crate::options::ReadOptions;
use crate::patchwork::Patchwork;

async fn run_blocking<T, F>(op: F) -> Result<T, PatchworkError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, PatchworkError> + Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| PatchworkError::Task(e.to_string()))?
}

impl Patchwork {
    /// Read `len` bytes at `offset` once they are written
    ///
    /// # Errors
    ///
    /// As [`Patchwork::read_at`], plus [`PatchworkError::Task`] if the
    /// blocking task panics.
    pub async fn read_at_async(
        self: &Arc<Self>,
        offset: u64,
        len: usize,
    ) -> Result<Vec<u8>, PatchworkError> {
        self.read_at_async_with(offset, len, ReadOptions::default())
            .await
    }

    /// [`Patchwork::read_at_async`] with per-read options
    ///
    /// # Errors
    ///
    /// As [`Patchwork::read_at_with`], plus [`PatchworkError::Task`].
    pub async fn read_at_async_with(
        self: &Arc<Self>,
        offset: u64,
        len: usize,
        opts: ReadOptions,
    ) -> Result<Vec<u8>, PatchworkError> {
        debug!(hint = self.hint(), offset, len, "async read");
        self.check_range(offset, len as u64)?;
        let pw = Arc::clone(self);
        run_blocking(move || {
            let mut buf = vec![0; len];
            pw.read_at_with(&mut buf, offset, &opts)?;
            Ok(buf)
        })
        .await
    }

    /// Write `data` at `offset`
    ///
    /// # Errors
    ///
    /// As [`Patchwork::write_at`], plus [`PatchworkError::Task`].
    pub async fn write_at_async(
        self: &Arc<Self>,
        data: Vec<u8>,
        offset: u64,
    ) -> Result<usize, PatchworkError> {
        debug!(hint = self.hint(), offset, len = data.len(), "async write");
        let pw = Arc::clone(self);
        run_blocking(move || pw.write_at(&data, offset)).await
    }

    /// Wait for the whole resource and return it
    ///
    /// # Errors
    ///
    /// As [`Patchwork::read_at_async`]. A capacity that does not fit in
    /// memory is reported as [`PatchworkError::OutOfRange`].
    pub async fn read_to_end_async(self: &Arc<Self>) -> Result<Vec<u8>, PatchworkError> {
        let capacity = self.capacity();
        let len = usize::try_from(capacity).map_err(|_| PatchworkError::OutOfRange {
            offset: 0,
            len: capacity,
            capacity,
        })?;
        self.read_at_async(0, len).await
    }
}
