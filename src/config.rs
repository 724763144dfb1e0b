//! Tail engine configuration.

use crate::error::{Error, Result};
use std::time::Duration;

pub const DEFAULT_TAIL_WINDOW: usize = 100;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_BUFFERED_LINES: usize = 10_000;

/// Options recognized by [`TailEngine`](crate::TailEngine).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailConfig {
    /// Number of existing lines emitted by `start`.
    pub tail_window: usize,
    /// Fallback read interval when no change notification arrives.
    pub poll_interval: Duration,
    /// Retention bound for a consumer-side [`TailBuffer`](crate::TailBuffer).
    /// The engine itself never buffers lines.
    pub max_buffered_lines: usize,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            tail_window: DEFAULT_TAIL_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_buffered_lines: DEFAULT_MAX_BUFFERED_LINES,
        }
    }
}

impl TailConfig {
    pub fn with_tail_window(mut self, lines: usize) -> Self {
        self.tail_window = lines;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_buffered_lines(mut self, lines: usize) -> Self {
        self.max_buffered_lines = lines;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::InvalidConfig {
                message: "poll interval must be greater than zero".to_string(),
            });
        }
        if self.max_buffered_lines == 0 {
            return Err(Error::InvalidConfig {
                message: "max buffered lines must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}
