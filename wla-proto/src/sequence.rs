//! Frame sequence counter.
//!
//! Every packet placed on the wire carries a sequence number taken when it
//! was built. The counter is shared by producers running on both cores, so
//! the increment is a single atomic read-modify-write.

use portable_atomic::{AtomicU8, Ordering};

/// 8-bit wrapping sequence counter.
pub struct SequenceCounter {
    next: AtomicU8,
}

impl SequenceCounter {
    /// Create a counter whose first value is `start`.
    #[must_use]
    pub const fn new(start: u8) -> Self {
        Self {
            next: AtomicU8::new(start),
        }
    }

    /// Return the current value and advance the counter (wraps at 256).
    #[inline]
    pub fn next(&self) -> u8 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// Value the next call to [`next`](Self::next) will return.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> u8 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Process-wide counter used by the packet builders.
static SEQUENCE: SequenceCounter = SequenceCounter::new(0);

/// Take the next process-wide sequence number.
#[inline]
pub fn next_sequence() -> u8 {
    SEQUENCE.next()
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    #[test]
    fn test_consecutive_values_wrap() {
        let counter = SequenceCounter::new(250);
        let values: Vec<u8> = (0..10).map(|_| counter.next()).collect();
        assert_eq!(values, [250, 251, 252, 253, 254, 255, 0, 1, 2, 3]);
        assert_eq!(counter.peek(), 4);
    }

    #[test]
    fn test_concurrent_callers_never_repeat() {
        let counter = Arc::new(SequenceCounter::new(17));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || (0..64).map(|_| counter.next()).collect::<Vec<u8>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for value in handle.join().unwrap() {
                assert!(seen.insert(value), "sequence {value} handed out twice");
            }
        }

        // 256 calls cover the whole space exactly once
        assert_eq!(seen.len(), 256);
        assert_eq!(counter.peek(), 17);
    }
}
