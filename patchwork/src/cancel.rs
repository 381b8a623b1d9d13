//! Cancellation of blocked reads
//!
//! A blocked read sleeps on its patchwork's condition variable, so setting a
//! flag is not enough: the canceller also has to wake it. The workflow is:
//!
//! 10. Reader: register the token with the patchwork (`attach`)
//! 20. Reader: take the patchwork lock, check the flag, wait on the condvar
//!     (the wait releases the lock atomically)
//!
//! 30. Canceller: set the flag
//! 40. Canceller: for every attached patchwork, take its lock and broadcast
//!
//! Step 40 cannot slip in between the check and the wait of step 20 because
//! the reader holds the lock for that whole window. Either the reader sees
//! the flag, or it is already waiting when the broadcast happens.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// Something a cancelled token must wake
pub(crate) trait Wake: Send + Sync {
    /// Take the waiters' lock and wake every one of them
    fn wake_all(&self);
}

struct Inner {
    cancelled: AtomicBool,
    attached: Mutex<Vec<Weak<dyn Wake>>>,
}

/// Shared flag that aborts blocked reads
///
/// Clones share the flag. Once cancelled a token stays cancelled; reads
/// started with it fail with [`crate::PatchworkError::Cancelled`] without
/// waiting.
#[derive(Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                attached: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Cancel every read waiting on this token, now and in the future
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let attached = std::mem::take(&mut *self.inner.attached.lock());
        log::debug!("CancelToken: cancelling, {} patchwork(s) attached", attached.len());
        for waker in attached.iter().filter_map(Weak::upgrade) {
            waker.wake_all();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Make `cancel` wake the waiters of `target`
    pub(crate) fn attach(&self, target: Weak<dyn Wake>) {
        let mut attached = self.inner.attached.lock();
        attached.retain(|w| w.strong_count() > 0);
        if !attached.iter().any(|w| w.ptr_eq(&target)) {
            attached.push(target);
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CancelToken(cancelled={})", self.is_cancelled())
    }
}
