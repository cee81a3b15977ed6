//! Pairing code sequence.
//!
//! A [`CodeSequence`] holds one batch of pairing codes and hands them out
//! strictly front to back. Every code is valid for the same duration; the
//! emitter shows one code per window and stops when the sequence runs out.

use link_types::QrEvent;
use std::collections::VecDeque;
use std::time::Duration;

/// An ordered, finite batch of pairing codes with a per-code validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSequence {
    codes: VecDeque<String>,
    timeout: Duration,
}

impl CodeSequence {
    /// Create a sequence from codes in display order.
    pub fn new<I>(codes: I, timeout: Duration) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            codes: codes.into_iter().collect(),
            timeout,
        }
    }

    /// Remove and return the next code to display.
    pub fn next_code(&mut self) -> Option<String> {
        self.codes.pop_front()
    }

    /// How long each code stays valid.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of codes not yet handed out.
    pub fn remaining(&self) -> usize {
        self.codes.len()
    }
}

impl From<&QrEvent> for CodeSequence {
    fn from(event: &QrEvent) -> Self {
        Self::new(event.codes.iter().cloned(), event.timeout)
    }
}
