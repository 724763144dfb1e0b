//! Values published by the tail engine.

use crate::error::Error;
use std::fmt;
use std::time::SystemTime;

/// One complete line read from the tailed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailLine {
    content: String,
    line_number: u64,
    observed_at: SystemTime,
}

impl TailLine {
    pub(crate) fn new(content: String, line_number: u64) -> Self {
        Self {
            content,
            line_number,
            observed_at: SystemTime::now(),
        }
    }

    /// Line text without its terminator.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// 1-based line number, strictly increasing for one engine run.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// When the engine read the line.
    pub fn observed_at(&self) -> SystemTime {
        self.observed_at
    }

    pub fn into_content(self) -> String {
        self.content
    }
}

/// Lifecycle state of a tail engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TailState {
    Idle = 0,
    Running = 1,
    Paused = 2,
    Error = 3,
    FileMissing = 4,
}

impl TailState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => TailState::Running,
            2 => TailState::Paused,
            3 => TailState::Error,
            4 => TailState::FileMissing,
            _ => TailState::Idle,
        }
    }

    /// States from which `start` does something.
    pub fn can_start(self) -> bool {
        matches!(
            self,
            TailState::Idle | TailState::Error | TailState::FileMissing
        )
    }

    /// States in which the monitoring loop reads the file.
    pub(crate) fn reads_file(self) -> bool {
        matches!(
            self,
            TailState::Running | TailState::Error | TailState::FileMissing
        )
    }
}

impl fmt::Display for TailState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TailState::Idle => "idle",
            TailState::Running => "running",
            TailState::Paused => "paused",
            TailState::Error => "error",
            TailState::FileMissing => "file missing",
        };
        f.write_str(name)
    }
}

/// A notification from a tail engine.
#[derive(Debug)]
pub enum TailEvent {
    /// Lines produced by one read cycle, in line-number order.
    LinesAdded(Vec<TailLine>),
    /// The engine moved to a new state.
    StateChanged(TailState),
    /// A non-fatal failure; the engine keeps going.
    Error(Error),
}
