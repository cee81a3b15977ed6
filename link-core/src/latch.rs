//! Single-shot close latch.
//!
//! A pairing stream may be finished from several execution contexts at once:
//! the event-dispatch path (pairing succeeded, connection dropped) and the
//! background code emitter (codes ran out, consumer fell behind). Only the
//! caller that wins [`CloseLatch::try_close`] may write the terminal value
//! and close the stream.

use std::sync::atomic::{AtomicBool, Ordering};

/// A flag that flips from open to closed exactly once.
#[derive(Debug, Default)]
pub struct CloseLatch {
    closed: AtomicBool,
}

impl CloseLatch {
    /// Create an open latch.
    pub const fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
        }
    }

    /// Attempt the open → closed transition.
    ///
    /// Returns true for exactly one caller over the latch's lifetime.
    pub fn try_close(&self) -> bool {
        self.closed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Check whether the latch has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn first_close_wins() {
        let latch = CloseLatch::new();
        assert!(!latch.is_closed());

        assert!(latch.try_close());
        assert!(latch.is_closed());

        assert!(!latch.try_close());
        assert!(latch.is_closed());
    }

    #[test]
    fn exactly_one_winner_under_contention() {
        const THREADS: usize = 8;

        for _ in 0..50 {
            let latch = Arc::new(CloseLatch::new());
            let winners = Arc::new(AtomicUsize::new(0));
            let barrier = Arc::new(Barrier::new(THREADS));

            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let latch = Arc::clone(&latch);
                    let winners = Arc::clone(&winners);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        if latch.try_close() {
                            winners.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(winners.load(Ordering::SeqCst), 1);
        }
    }
}
