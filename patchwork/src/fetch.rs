//! Fetch hook
//!
//! A patchwork never fetches data itself. When a read finds its range
//! uncovered it calls the [`Fetcher`] it was built with, if any, and then
//! waits for writes as usual. What the fetcher does (spawn a download, write
//! synchronously, queue a request) is its own business.

/// Error reported by a [`Fetcher`]
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-supplied hook asked to make `[from, to)` available
///
/// The hook runs with the patchwork lock released, so it may call
/// [`crate::Patchwork::write_at`] directly. Returning an error ends the wait of
/// the read that invoked it, and only that read.
///
/// Closures implement the trait:
///
/// ```
/// use patchwork::{Fetcher, FetchError};
///
/// let fetcher = |from: u64, to: u64| -> Result<(), FetchError> {
///     println!("please fetch {from}-{to}");
///     Ok(())
/// };
/// fetcher.fetch(0, 10).unwrap();
/// ```
pub trait Fetcher: Send + Sync {
    /// Attempt to make the bytes in `[from, to)` available.
    ///
    /// # Errors
    ///
    /// Returns an error if the range cannot be produced.
    fn fetch(&self, from: u64, to: u64) -> Result<(), FetchError>;
}

impl<F> Fetcher for F
where
    F: Fn(u64, u64) -> Result<(), FetchError> + Send + Sync,
{
    fn fetch(&self, from: u64, to: u64) -> Result<(), FetchError> {
        self(from, to)
    }
}
