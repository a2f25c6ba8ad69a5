use std::sync::{Mutex, MutexGuard};

use tracing::trace;

use crate::error::{Result, TransportError};

/// Wrap-around counter allocating ranges of identifiers.
///
/// The counter value always lies in `[0, wrap)`. A fresh counter starts at
/// `wrap - 1`, so the first value handed out by [`increment`](Self::increment)
/// is `0`. Updates happen under a mutex, so concurrent allocations never
/// return the same value (as long as fewer than `wrap` values are in use).
#[derive(Debug)]
pub struct SequenceCounter {
    wrap: u64,
    current: Mutex<u64>,
}

impl SequenceCounter {
    /// Create a counter that wraps at `wrap`.
    pub fn new(wrap: u64) -> Result<Self> {
        if wrap == 0 {
            return Err(TransportError::InvalidWrap(wrap));
        }
        Ok(Self {
            wrap,
            current: Mutex::new(wrap - 1),
        })
    }

    /// Create a counter positioned at `current` (reduced modulo `wrap`).
    pub fn with_current(wrap: u64, current: u64) -> Result<Self> {
        let counter = Self::new(wrap)?;
        *counter.lock() = current % wrap;
        Ok(counter)
    }

    /// The exclusive upper bound of the counter.
    pub fn wrap(&self) -> u64 {
        self.wrap
    }

    /// The most recently allocated value.
    pub fn current(&self) -> u64 {
        *self.lock()
    }

    /// Move the counter by `delta` and return the values it moved over.
    ///
    /// For `delta > 0` the returned iterator yields `delta` values, from
    /// `old + 1` up to and including the new counter value, wrapping at
    /// `wrap`. For `delta <= 0` the counter still moves but nothing is
    /// yielded.
    pub fn increment(&self, delta: i64) -> CounterValues {
        let mut current = self.lock();
        let old = *current;
        let moved = (i128::from(old) + i128::from(delta)).rem_euclid(i128::from(self.wrap));
        // rem_euclid keeps the result in [0, wrap), which fits u64.
        *current = moved as u64;
        trace!(old, new = *current, delta, "counter moved");

        CounterValues {
            next: old,
            remaining: u64::try_from(delta).unwrap_or(0),
            wrap: self.wrap,
        }
    }

    /// Allocate a single value.
    pub fn next_value(&self) -> u64 {
        let mut current = self.lock();
        *current = (*current + 1) % self.wrap;
        *current
    }

    fn lock(&self) -> MutexGuard<'_, u64> {
        // The guarded value is a plain integer that is always left valid.
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Values produced by one [`SequenceCounter::increment`] call.
///
/// The iterator is computed from a snapshot and holds no lock; it is meant
/// to be consumed by the caller that performed the increment.
#[derive(Debug, Clone)]
pub struct CounterValues {
    next: u64,
    remaining: u64,
    wrap: u64,
}

impl Iterator for CounterValues {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        self.next = (self.next + 1) % self.wrap;
        Some(self.next)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}
