//! Patchwork: a fixed-size resource assembled from out-of-order writes
//!
//! Writers deliver chunks in any order with [`Patchwork::write_at`]. Readers
//! ask for byte ranges with [`Patchwork::read_at`] and block until exactly
//! those bytes have been written, optionally nudging a [`Fetcher`] to go and
//! get them.

pub mod async_io;
pub mod cancel;
pub mod error;
pub mod fetch;
pub mod io;
pub mod options;
pub mod patchwork;
pub mod range_set;
pub mod stream;

pub use cancel::CancelToken;
pub use error::PatchworkError;
pub use fetch::{FetchError, Fetcher};
pub use io::{ByteStore, FileStore, MemStore, ReadAt, WriteAt};
pub use options::{FetchPolicy, Options, ReadOptions};
pub use patchwork::Patchwork;
pub use range_set::{Interval, RangeSet};
pub use stream::{IoError, OffsetWriter, SectionReader};
