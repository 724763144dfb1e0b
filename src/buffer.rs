//! Consumer-side retention of tailed lines.

use crate::model::TailLine;
use std::collections::VecDeque;

/// Keeps the most recent lines received from an engine, dropping the oldest
/// once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct TailBuffer {
    lines: VecDeque<TailLine>,
    capacity: usize,
    dropped: u64,
}

impl TailBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
            dropped: 0,
        }
    }

    /// Append a batch, evicting from the front as needed.
    pub fn extend<I: IntoIterator<Item = TailLine>>(&mut self, batch: I) {
        for line in batch {
            if self.lines.len() == self.capacity {
                self.lines.pop_front();
                self.dropped += 1;
            }
            self.lines.push_back(line);
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &TailLine> {
        self.lines.iter()
    }

    pub fn last(&self) -> Option<&TailLine> {
        self.lines.back()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lines evicted since creation or the last `clear`.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.dropped = 0;
    }
}
