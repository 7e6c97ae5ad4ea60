//! Generation tokens for discarding stale responses.
//!
//! Every fetch takes a token when it is issued. When its response arrives it
//! is applied only if no newer token has been issued since.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues increasing generations and remembers the latest.
#[derive(Debug, Default)]
pub struct RequestFence {
    latest: AtomicU64,
}

impl RequestFence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new generation, superseding all earlier ones.
    pub fn issue(&self) -> Generation {
        Generation(self.latest.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// True if `generation` is the most recently issued one.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.latest.load(Ordering::Relaxed) == generation.0
    }

    /// Supersedes whatever is in flight without starting anything new.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::Relaxed);
    }
}
