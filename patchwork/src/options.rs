//! Patchwork and per-read configuration

use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

/// How often a blocked read calls the fetch hook
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Call the hook at most once per read, and not at all while another
    /// blocked read that fetched a containing range is still waiting for it.
    /// When that read leaves, waiters relying on it fetch for themselves.
    #[default]
    OncePerRead,
    /// Call the hook before the first wait and again after every wake-up
    EveryWake,
}

/// Patchwork configuration
#[derive(Debug, Clone)]
pub struct Options {
    pub fetch_policy: FetchPolicy,
    /// Label used in log lines and `Debug` output
    pub hint: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            fetch_policy: FetchPolicy::default(),
            hint: "patchwork".to_string(),
        }
    }
}

impl Options {
    #[must_use]
    pub fn fetch_policy(mut self, policy: FetchPolicy) -> Self {
        self.fetch_policy = policy;
        self
    }

    #[must_use]
    pub fn hint(mut self, hint: &str) -> Self {
        self.hint = hint.to_string();
        self
    }
}

/// Settings for a single blocking read
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub cancel: Option<CancelToken>,
    pub deadline: Option<Instant>,
}

impl ReadOptions {
    #[must_use]
    pub fn cancel(mut self, token: &CancelToken) -> Self {
        self.cancel = Some(token.clone());
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline `timeout` from now
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }
}
