//! Generation tracking for superseded async work
//!
//! Each new operation of a subsystem takes a fresh [`Generation`] from the
//! subsystem's [`GenerationCounter`]. Callbacks compare the generation they
//! captured against the current one before committing, and drop their result
//! when it no longer matches.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tag identifying one operation of a subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Generation(u64);

impl Generation {
    /// The generation before any operation was started
    pub const INITIAL: Self = Self(0);

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Monotonically increasing generation source
///
/// Cloning shares the underlying counter.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    current: Arc<AtomicU64>,
}

impl GenerationCounter {
    /// Create a counter at [`Generation::INITIAL`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new operation, superseding every earlier generation
    pub fn advance(&self) -> Generation {
        let next = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(generation = next, "advanced generation");
        Generation(next)
    }

    /// The most recently issued generation
    pub fn current(&self) -> Generation {
        Generation(self.current.load(Ordering::Acquire))
    }

    /// Whether `generation` is still the latest one
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current() == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_supersedes_previous() {
        let counter = GenerationCounter::new();
        assert_eq!(counter.current(), Generation::INITIAL);

        let first = counter.advance();
        assert!(counter.is_current(first));

        let second = counter.advance();
        assert!(second > first);
        assert!(!counter.is_current(first));
        assert!(counter.is_current(second));
    }

    #[test]
    fn test_clones_share_state() {
        let counter = GenerationCounter::new();
        let view = counter.clone();
        let generation = counter.advance();
        assert!(view.is_current(generation));
        assert_eq!(generation.to_string(), "gen-1");
    }

    #[tokio::test]
    async fn test_concurrent_advance_is_unique() {
        let counter = GenerationCounter::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let counter = counter.clone();
            handles.push(tokio::spawn(async move { counter.advance() }));
        }

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap().value());
        }
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 8);
        assert_eq!(counter.current().value(), 8);
    }
}
