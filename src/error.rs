//! Error types for the tail engine.

use thiserror::Error;

/// The main error type for tail operations.
///
/// Errors raised inside the monitoring loop are never returned to a caller;
/// they are published as [`TailEvent::Error`](crate::TailEvent::Error).
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when reading the tailed file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file watcher could not be set up.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// A running file watcher reported a failure.
    #[error("File watcher error: {message}")]
    WatcherEvent { message: String },

    /// File path errors.
    #[error("Invalid file path: {message}")]
    InvalidPath { message: String },

    /// Rejected configuration values.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The tailed file does not exist (never created, deleted or renamed away).
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// The file shrank below the last read position.
    #[error("File was truncated ({path}: length {length} < offset {offset}), restarting from beginning")]
    Truncated {
        path: String,
        offset: u64,
        length: u64,
    },
}

/// A convenient Result type for tail operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// An equivalent error, for publishing one that is also returned.
    /// Source errors that cannot be cloned keep their kind and message.
    pub(crate) fn duplicate(&self) -> Error {
        match self {
            Error::Io(e) => Error::Io(std::io::Error::new(e.kind(), e.to_string())),
            Error::Watcher(e) => Error::WatcherEvent {
                message: e.to_string(),
            },
            Error::WatcherEvent { message } => Error::WatcherEvent {
                message: message.clone(),
            },
            Error::InvalidPath { message } => Error::InvalidPath {
                message: message.clone(),
            },
            Error::InvalidConfig { message } => Error::InvalidConfig {
                message: message.clone(),
            },
            Error::FileNotFound { path } => Error::FileNotFound { path: path.clone() },
            Error::Truncated {
                path,
                offset,
                length,
            } => Error::Truncated {
                path: path.clone(),
                offset: *offset,
                length: *length,
            },
        }
    }
}
