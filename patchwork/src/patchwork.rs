//! Coordinator between out-of-order writers and blocking readers
//!
//! # Lock discipline
//!
//! One `parking_lot::Mutex` guards all coordinator state (the covered-range
//! set, the ranges being fetched and the closed flag), and one `Condvar` is
//! paired with it.
//!
//! - Writers take the lock, write through to the store, record the range,
//!   broadcast, release.
//! - Readers take the lock even when the range is already covered, so the
//!   covered set is never observed mid-update. If it is not covered they loop:
//!   check, maybe call the fetch hook (lock released around the call), wait,
//!   check again. The store is read after the lock is released.
//! - Every exit from the wait loop, including a failed fetch, drops the guard
//!   and withdraws the read's in-flight fetch, broadcasting so that readers
//!   which relied on it re-evaluate.
//!
//! Store writes stay under the lock, so writes to disjoint ranges are
//! serialized against the store as well.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::fmt;
use std::io;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use crate::cancel::{CancelToken, Wake};
use crate::error::PatchworkError;
use crate::fetch::Fetcher;
use crate::io::{read_exact_at, ByteStore, ReadAt, WriteAt};
use crate::options::{FetchPolicy, Options, ReadOptions};
use crate::range_set::{Interval, RangeSet};
use crate::stream::{OffsetWriter, SectionReader};

/// State guarded by the coordinator lock
struct State {
    covered: RangeSet,
    /// Ranges of reads that called the fetch hook and are still waiting,
    /// see [`FetchPolicy::OncePerRead`]
    in_flight: Vec<Interval>,
    closed: bool,
}

impl State {
    fn fetch_in_flight(&self, wanted: &Interval) -> bool {
        self.in_flight.iter().any(|iv| iv.contains(wanted))
    }

    fn release_fetch(&mut self, wanted: &Interval) {
        if let Some(pos) = self.in_flight.iter().position(|iv| iv == wanted) {
            self.in_flight.swap_remove(pos);
        }
    }
}

struct Signal {
    state: Mutex<State>,
    cond: Condvar,
}

impl Wake for Signal {
    fn wake_all(&self) {
        let _state = self.state.lock();
        self.cond.notify_all();
    }
}

/// A fixed-size resource assembled from out-of-order writes
///
/// Writes may arrive in any order and from any thread. Reads of a range
/// block until that exact range has been written, calling the optional
/// [`Fetcher`] to ask for it.
///
/// # Thread Safety
///
/// `Patchwork` is `Send + Sync`; share it by reference (scoped threads) or
/// through an `Arc`.
///
/// - **Writes are serialized**: each `write_at` holds the lock for the store
///   write, the range update and the broadcast. Overlapping writes are not
///   rejected; keeping them apart is the caller's job.
/// - **Reads run in parallel** once their range is covered: the store read
///   happens outside the lock.
/// - **The fetch hook runs unlocked** and may call `write_at` itself.
///
/// # Example
///
/// ```
/// use patchwork::{io::MemStore, Patchwork};
/// use std::io::Read;
///
/// let pw = Patchwork::new(MemStore::new(10));
///
/// std::thread::scope(|s| {
///     s.spawn(|| {
///         for offset in [8, 4, 0, 6, 2] {
///             pw.write_at(b"xy", offset).unwrap();
///         }
///     });
///
///     let mut out = Vec::new();
///     pw.reader().read_to_end(&mut out).unwrap();
///     assert_eq!(out, b"xyxyxyxyxy");
/// });
/// ```
pub struct Patchwork {
    signal: Arc<Signal>,
    store: Box<dyn ByteStore>,
    capacity: u64,
    fetcher: Option<Box<dyn Fetcher>>,
    options: Options,
}

impl Patchwork {
    /// Wrap `store`; the capacity is fixed to `store.capacity()`
    #[must_use]
    pub fn new<S: ByteStore + 'static>(store: S) -> Self {
        Self::with_options(store, Options::default())
    }

    #[must_use]
    pub fn with_options<S: ByteStore + 'static>(store: S, options: Options) -> Self {
        let capacity = store.capacity();
        Self {
            signal: Arc::new(Signal {
                state: Mutex::new(State {
                    covered: RangeSet::new(),
                    in_flight: Vec::new(),
                    closed: false,
                }),
                cond: Condvar::new(),
            }),
            store: Box::new(store),
            capacity,
            fetcher: None,
            options,
        }
    }

    /// Install the fetch hook
    ///
    /// Takes `self` by value so the hook is fixed before the patchwork is
    /// shared.
    #[must_use]
    pub fn fetcher<F: Fetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[must_use]
    pub fn hint(&self) -> &str {
        &self.options.hint
    }

    /// Snapshot of the ranges written so far
    #[must_use]
    pub fn covered(&self) -> RangeSet {
        self.signal.state.lock().covered.clone()
    }

    /// True once every byte of the resource has been written
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.capacity == 0
            || self
                .signal
                .state
                .lock()
                .covered
                .contains(&Interval::new(0, self.capacity))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.signal.state.lock().closed
    }

    /// Write `data` at `offset` and wake every blocked reader
    ///
    /// Returns the number of bytes written, which is `data.len()` on success.
    /// Empty writes succeed without waking anyone.
    ///
    /// # Errors
    ///
    /// - [`PatchworkError::Closed`] after [`Patchwork::close`]
    /// - [`PatchworkError::Write`] if the store fails or stops accepting
    ///   bytes (for example at its capacity); the bytes it accepted before
    ///   that are still recorded and reported in `written`
    pub fn write_at(&self, data: &[u8], offset: u64) -> Result<usize, PatchworkError> {
        let mut state = self.signal.state.lock();

        if state.closed {
            log::warn!(
                "{}: write of {} bytes at {offset} after close",
                self.options.hint,
                data.len()
            );
            return Err(PatchworkError::Closed);
        }

        let mut writer = OffsetWriter::new(&*self.store, offset);
        let result = io::Write::write_all(&mut writer, data);
        let end = writer.position();

        if end > offset {
            state.covered.add(Interval::new(offset, end));
            self.signal.cond.notify_all();
            log::trace!(
                "{}: wrote {offset}-{end}, covered {}",
                self.options.hint,
                state.covered
            );
        }
        drop(state);

        // at most data.len()
        #[allow(clippy::cast_possible_truncation)]
        let written = (end - offset) as usize;
        result
            .map(|()| written)
            .map_err(|source| PatchworkError::Write {
                offset,
                written,
                source,
            })
    }

    /// Fill `buf` from `offset`, blocking until the whole range is written
    ///
    /// # Errors
    ///
    /// - [`PatchworkError::OutOfRange`] if the range ends past the capacity
    /// - [`PatchworkError::Fetch`] if the fetch hook fails for this read
    /// - [`PatchworkError::Closed`] if the patchwork is or gets closed
    /// - [`PatchworkError::Read`] if the store read fails
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize, PatchworkError> {
        self.read_at_with(buf, offset, &ReadOptions::default())
    }

    /// [`Patchwork::read_at`] that gives up when `token` is cancelled
    ///
    /// # Errors
    ///
    /// As [`Patchwork::read_at`], plus [`PatchworkError::Cancelled`].
    pub fn read_at_cancellable(
        &self,
        buf: &mut [u8],
        offset: u64,
        token: &CancelToken,
    ) -> Result<usize, PatchworkError> {
        self.read_at_with(buf, offset, &ReadOptions::default().cancel(token))
    }

    /// [`Patchwork::read_at`] that gives up after `timeout`
    ///
    /// # Errors
    ///
    /// As [`Patchwork::read_at`], plus [`PatchworkError::TimedOut`].
    pub fn read_at_timeout(
        &self,
        buf: &mut [u8],
        offset: u64,
        timeout: Duration,
    ) -> Result<usize, PatchworkError> {
        self.read_at_with(buf, offset, &ReadOptions::default().timeout(timeout))
    }

    /// Blocking read with explicit per-read options
    ///
    /// Zero-length reads inside the capacity return `Ok(0)` immediately.
    ///
    /// # Errors
    ///
    /// See [`Patchwork::read_at`], [`PatchworkError::Cancelled`] and
    /// [`PatchworkError::TimedOut`].
    pub fn read_at_with(
        &self,
        buf: &mut [u8],
        offset: u64,
        opts: &ReadOptions,
    ) -> Result<usize, PatchworkError> {
        let end = self.check_range(offset, buf.len() as u64)?;
        if buf.is_empty() {
            return Ok(0);
        }

        self.wait_for(&Interval::new(offset, end), opts)?;

        read_exact_at(&*self.store, buf, offset)
            .map_err(|source| PatchworkError::Read { offset, source })?;
        Ok(buf.len())
    }

    /// End offset of `[offset, offset + len)`, if it fits the capacity
    pub(crate) fn check_range(&self, offset: u64, len: u64) -> Result<u64, PatchworkError> {
        offset
            .checked_add(len)
            .filter(|end| *end <= self.capacity)
            .ok_or(PatchworkError::OutOfRange {
                offset,
                len,
                capacity: self.capacity,
            })
    }

    /// Block until `wanted` is covered
    ///
    /// Returns with the lock released on every path.
    fn wait_for(&self, wanted: &Interval, opts: &ReadOptions) -> Result<(), PatchworkError> {
        if let Some(token) = &opts.cancel {
            let target: Weak<Signal> = Arc::downgrade(&self.signal);
            token.attach(target);
        }

        let mut state = self.signal.state.lock();
        let mut fetching = false;
        let result = self.wait_loop(&mut state, wanted, opts, &mut fetching);

        if fetching {
            state.release_fetch(wanted);
            self.signal.cond.notify_all();
        }
        result
    }

    /// The check-fetch-wait loop of [`Patchwork::wait_for`]
    ///
    /// Sets `fetching` once this read has registered an in-flight fetch.
    fn wait_loop(
        &self,
        state: &mut MutexGuard<'_, State>,
        wanted: &Interval,
        opts: &ReadOptions,
        fetching: &mut bool,
    ) -> Result<(), PatchworkError> {
        let mut fetches = 0usize;
        let mut just_fetched = false;

        loop {
            if state.closed {
                return Err(PatchworkError::Closed);
            }
            if state.covered.contains(wanted) {
                return Ok(());
            }
            if opts.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                log::debug!("{}: read of {wanted} cancelled", self.options.hint);
                return Err(PatchworkError::Cancelled);
            }
            if opts.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                log::debug!("{}: read of {wanted} timed out", self.options.hint);
                return Err(PatchworkError::TimedOut);
            }

            // After a fetch the state is re-checked once before waiting,
            // since wake-ups sent while unlocked are gone.
            if !just_fetched {
                if let Some(fetcher) = self.fetch_due(state, wanted, fetches) {
                    fetches += 1;
                    just_fetched = true;
                    if self.options.fetch_policy == FetchPolicy::OncePerRead && !*fetching {
                        state.in_flight.push(*wanted);
                        *fetching = true;
                    }
                    log::debug!("{}: fetching {wanted}", self.options.hint);

                    let result = MutexGuard::unlocked(state, || {
                        fetcher.fetch(wanted.start(), wanted.end())
                    });
                    if let Err(source) = result {
                        log::debug!("{}: fetch of {wanted} failed: {source}", self.options.hint);
                        return Err(PatchworkError::Fetch {
                            from: wanted.start(),
                            to: wanted.end(),
                            source,
                        });
                    }
                    continue;
                }
            }
            just_fetched = false;

            match opts.deadline {
                Some(deadline) => {
                    let _ = self.signal.cond.wait_until(state, deadline);
                }
                None => self.signal.cond.wait(state),
            }
        }
    }

    /// The fetcher, if this read should call it now
    fn fetch_due(&self, state: &State, wanted: &Interval, fetches: usize) -> Option<&dyn Fetcher> {
        let fetcher = self.fetcher.as_deref()?;
        let due = match self.options.fetch_policy {
            FetchPolicy::OncePerRead => fetches == 0 && !state.fetch_in_flight(wanted),
            FetchPolicy::EveryWake => true,
        };
        due.then_some(fetcher)
    }

    /// Close the patchwork and release the store
    ///
    /// Blocked readers wake up with [`PatchworkError::Closed`]; later reads
    /// and writes fail the same way. The store's `close` is called every time,
    /// so double-close behaves as the store defines.
    ///
    /// # Errors
    ///
    /// Returns [`PatchworkError::Close`] if the store fails to release.
    pub fn close(&self) -> Result<(), PatchworkError> {
        {
            let mut state = self.signal.state.lock();
            if state.closed {
                log::warn!("{}: close() called on already closed patchwork", self.options.hint);
            }
            state.closed = true;
            self.signal.cond.notify_all();
        }
        log::debug!("{}: closed", self.options.hint);
        self.store.close().map_err(PatchworkError::Close)
    }

    /// Sequential reader over the whole resource
    #[must_use]
    pub fn reader(&self) -> SectionReader<&Self> {
        SectionReader::new(self, 0, self.capacity)
    }

    /// Sequential writer starting at offset 0
    #[must_use]
    pub fn writer(&self) -> OffsetWriter<&Self> {
        OffsetWriter::new(self, 0)
    }
}

impl ReadAt for Patchwork {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        Patchwork::read_at(self, buf, offset).map_err(io::Error::from)
    }
}

impl WriteAt for Patchwork {
    fn write_at(&self, buf: &[u8], offset: u64) -> io::Result<usize> {
        match Patchwork::write_at(self, buf, offset) {
            Ok(n) => Ok(n),
            // the failure resurfaces on the next write
            Err(e) if e.written() > 0 => Ok(e.written()),
            Err(e) => Err(e.into()),
        }
    }
}

impl fmt::Debug for Patchwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.signal.state.lock();
        write!(
            f,
            "Patchwork(hint={}, capacity={}, covered={}, closed={}, fetcher={})",
            self.options.hint,
            self.capacity,
            state.covered,
            state.closed,
            self.fetcher.is_some()
        )
    }
}
