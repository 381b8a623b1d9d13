//! Error type for patchwork operations

use std::io;

use crate::fetch::FetchError;

/// Error type for patchwork operations
///
/// Nothing is retried internally: every store or fetch failure reaches the
/// caller that triggered it.
#[derive(Debug, thiserror::Error)]
pub enum PatchworkError {
    #[error("read of {len} bytes at offset {offset} goes past end of patchwork ({capacity} bytes)")]
    OutOfRange { offset: u64, len: u64, capacity: u64 },

    #[error("store read at offset {offset} failed: {source}")]
    Read {
        offset: u64,
        #[source]
        source: io::Error,
    },

    /// The store failed after accepting `written` bytes; only those are
    /// recorded as covered.
    #[error("store write at offset {offset} failed after {written} bytes: {source}")]
    Write {
        offset: u64,
        written: usize,
        #[source]
        source: io::Error,
    },

    #[error("closing the store failed: {0}")]
    Close(#[source] io::Error),

    #[error("fetching {from}-{to} failed: {source}")]
    Fetch {
        from: u64,
        to: u64,
        #[source]
        source: FetchError,
    },

    #[error("read was cancelled")]
    Cancelled,

    #[error("read timed out")]
    TimedOut,

    #[error("patchwork is closed")]
    Closed,

    #[error("blocking task failed: {0}")]
    Task(String),
}

impl PatchworkError {
    /// Bytes accepted by the store before the error, for write failures
    #[must_use]
    pub fn written(&self) -> usize {
        match self {
            Self::Write { written, .. } => *written,
            _ => 0,
        }
    }
}

impl From<PatchworkError> for io::Error {
    fn from(e: PatchworkError) -> Self {
        let kind = match &e {
            PatchworkError::OutOfRange { .. } => io::ErrorKind::InvalidInput,
            PatchworkError::Read { source, .. } | PatchworkError::Write { source, .. } => {
                source.kind()
            }
            PatchworkError::Close(source) => source.kind(),
            PatchworkError::TimedOut => io::ErrorKind::TimedOut,
            PatchworkError::Closed => io::ErrorKind::BrokenPipe,
            // not Interrupted: std's read_exact and write_all retry that
            PatchworkError::Cancelled
            | PatchworkError::Fetch { .. }
            | PatchworkError::Task(_) => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_kinds() {
        let kind = |e: PatchworkError| io::Error::from(e).kind();

        assert_eq!(kind(PatchworkError::Cancelled), io::ErrorKind::Other);
        assert_eq!(kind(PatchworkError::TimedOut), io::ErrorKind::TimedOut);
        assert_eq!(kind(PatchworkError::Closed), io::ErrorKind::BrokenPipe);
        assert_eq!(
            kind(PatchworkError::OutOfRange {
                offset: 4,
                len: 1,
                capacity: 4
            }),
            io::ErrorKind::InvalidInput
        );
    }

    #[test]
    fn test_cancelled_is_not_retried_by_std_helpers() {
        struct Cancelled;

        impl io::Read for Cancelled {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(PatchworkError::Cancelled.into())
            }
        }

        let mut buf = [0u8; 4];
        let err = io::Read::read_exact(&mut Cancelled, &mut buf).unwrap_err();
        assert!(matches!(
            err.get_ref().and_then(|e| e.downcast_ref::<PatchworkError>()),
            Some(PatchworkError::Cancelled)
        ));
    }
}
